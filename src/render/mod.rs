//! Leaderboard image rendering.
//!
//! Draws the ranked roster as a stack of dark-mode cards, one per player,
//! capped at the top ten. Output is SVG bytes, which Discord renders inline
//! as an attachment; identical input always yields identical bytes.

use std::fmt::Write;

use crate::models::PlayerRecord;

/// How many entries make it onto the artifact.
pub const MAX_RENDERED_ENTRIES: usize = 10;

const CARD_WIDTH: u32 = 2400;
const CARD_HEIGHT: u32 = 150;
const ROW_PADDING: u32 = 35;
const TOP_MARGIN: u32 = 120;
const BOTTOM_MARGIN: u32 = 50;

const CARD_FILL: &str = "#2C2F36";
const CARD_OUTLINE: &str = "#4E5D6A";
const TEXT_COLOR: &str = "#FFFFFF";
const MUTED_TEXT_COLOR: &str = "#A1A1A1";
const WIN_COLOR: &str = "#33CC33";
const LOSS_COLOR: &str = "#CC3333";
const SEPARATOR_COLOR: &str = "#D3D3D3";

/// Renders an ordered roster into image bytes.
pub trait Renderer: Send + Sync {
    fn render(&self, entries: &[PlayerRecord]) -> Vec<u8>;
}

/// Card-style SVG renderer.
#[derive(Debug, Default, Clone)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        Self
    }

    fn rank_color(rank: usize) -> &'static str {
        match rank {
            0 => "#FFD700",
            1 => "#C0C0C0",
            2 => "#CD7F32",
            _ => TEXT_COLOR,
        }
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    fn draw_card(svg: &mut String, rank: usize, player: &PlayerRecord, y: u32) {
        let x1 = 50;
        let x2 = CARD_WIDTH - 50;
        let text_y = y + 75;
        let chars_y = y + 120;

        let _ = write!(
            svg,
            r#"<rect x="{x1}" y="{y}" width="{w}" height="{h}" rx="35" fill="{CARD_FILL}" stroke="{CARD_OUTLINE}" stroke-width="4"/>"#,
            w = x2 - x1,
            h = CARD_HEIGHT,
        );

        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="56" font-weight="bold" fill="{color}">{rank}.</text>"#,
            x = x1 + 40,
            color = Self::rank_color(rank),
            rank = rank + 1,
        );

        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="56" font-weight="bold" fill="{TEXT_COLOR}">{name}</text>"#,
            x = x1 + 180,
            name = Self::escape(&player.username),
        );
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="40" fill="{MUTED_TEXT_COLOR}">{code}</text>"#,
            x = x1 + 700,
            code = Self::escape(&player.code.to_uppercase()),
        );

        // W / L split, colored like the original card
        let wl_x = x2 - 600;
        let _ = write!(
            svg,
            r#"<text x="{wl_x}" y="{text_y}" font-size="56" font-weight="bold" fill="{WIN_COLOR}">{wins}W</text>"#,
            wins = player.wins,
        );
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="56" font-weight="bold" fill="{SEPARATOR_COLOR}"> / </text>"#,
            x = wl_x + 130,
        );
        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="56" font-weight="bold" fill="{LOSS_COLOR}">{losses}L</text>"#,
            x = wl_x + 210,
            losses = player.losses,
        );

        let _ = write!(
            svg,
            r#"<text x="{x}" y="{text_y}" font-size="56" font-weight="bold" fill="{TEXT_COLOR}">{elo:.1}</text>"#,
            x = x2 - 250,
            elo = player.elo,
        );

        let _ = write!(
            svg,
            r#"<text x="{x}" y="{chars_y}" font-size="28" fill="{MUTED_TEXT_COLOR}">Chars: {chars}</text>"#,
            x = x1 + 180,
            chars = Self::escape(&player.characters.join(", ")),
        );
    }
}

impl Renderer for SvgRenderer {
    fn render(&self, entries: &[PlayerRecord]) -> Vec<u8> {
        let shown = &entries[..entries.len().min(MAX_RENDERED_ENTRIES)];
        let total_height =
            TOP_MARGIN + (CARD_HEIGHT + ROW_PADDING) * shown.len() as u32 + BOTTOM_MARGIN;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CARD_WIDTH}" height="{total_height}" font-family="Arial, sans-serif">"#,
        );

        let mut y = TOP_MARGIN;
        for (rank, player) in shown.iter().enumerate() {
            Self::draw_card(&mut svg, rank, player, y);
            y += CARD_HEIGHT + ROW_PADDING;
        }

        svg.push_str("</svg>");
        svg.into_bytes()
    }
}
