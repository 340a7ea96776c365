use crate::{
    core::Canvas,
    model::Theme,
    style::PosterStyle,
};

/// Fully laid-out poster at 1080x1920 logical units, ready for rasterization.
///
/// Layer order, background to foreground: base fill, theme backdrop,
/// darkening overlay, content stack, footer band. The scene carries the style
/// it was composed with so a rasterizer needs no further inputs besides
/// prepared assets.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PosterScene {
    pub canvas: Canvas,
    pub theme: Theme,
    pub content: Vec<ContentBlock>,
    pub footer: Footer,
    pub style: PosterStyle,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Festival title, upper-cased, size already resolved by the sizing policy.
    Title {
        text: String,
        size_px: f32,
        margin_bottom: f64,
    },
    /// Joined per-day date labels, e.g. `"MAR 07  //  MAR 08"`.
    DateStrip {
        text: String,
        size_px: f32,
        margin_bottom: f64,
    },
    /// Placeholder shown when no artist is assigned to any day.
    EmptyNotice {
        text: String,
        size_px: f32,
        margin_top: f64,
    },
    Day(DayBlock),
}

/// One festival day: side labels plus the ranked artist column.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DayBlock {
    /// Upper-cased weekday abbreviation, rendered on the left edge.
    pub day_label: String,
    /// `"{MON} {dd}"` date, rendered on the right edge.
    pub date_label: String,
    /// First assigned artist of the day, upper-cased, gradient-filled.
    pub headliner: Option<String>,
    /// Secondary tiers in rank order; empty when the day has at most one
    /// assigned artist.
    pub tiers: Vec<TierRow>,
    /// Trailing caption for artists past the render cap.
    pub overflow: Option<OverflowCaption>,
}

/// Artists of one size tier, joined with the decorative separator when drawn.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TierRow {
    pub size_px: f32,
    pub names: Vec<String>,
    pub margin_top: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverflowCaption {
    pub text: String,
    pub hidden_count: usize,
}

/// Bottom band pinned over the content: fade-to-dark gradient plus the
/// tagline and brand lines.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Footer {
    pub height: f64,
    pub tagline: String,
    pub brand: String,
    pub brand_accent: String,
}

impl PosterScene {
    pub fn day_blocks(&self) -> impl Iterator<Item = &DayBlock> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::Day(d) => Some(d),
            _ => None,
        })
    }

    pub fn has_empty_notice(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::EmptyNotice { .. }))
    }
}
