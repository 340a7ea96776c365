use crate::core::{Canvas, Rgba8};

/// Visual-tuning constants for the poster.
///
/// The tier boundaries and per-day cap are deliberate tuning choices rather
/// than invariants, so they live here instead of being hard-coded in the
/// layout engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PosterStyle {
    pub canvas: Canvas,

    pub base_color: Rgba8,
    /// Headliner text gradient, top to bottom.
    pub headliner_gradient: (Rgba8, Rgba8),
    /// Accent used for dates, side labels and separator glyphs.
    pub accent: Rgba8,
    pub body_color: Rgba8,
    pub muted_color: Rgba8,

    /// Darkening overlay stops, `(offset, color)` with offsets in `[0, 1]`.
    pub overlay_stops: Vec<(f32, Rgba8)>,
    pub backdrop_opacity: f32,

    pub top_padding: f64,
    pub content_side_padding: f64,
    pub headliner_side_padding: f64,
    pub day_block_gap: f64,
    pub footer_height: f64,
    pub footer_fade: f64,

    /// Title size table as `(max_chars, size_px)` thresholds, ascending by
    /// `max_chars`; titles longer than every threshold get `title_size_floor`.
    pub title_sizes: Vec<(usize, f32)>,
    pub title_size_floor: f32,
    /// A single token at least this long clamps the title size.
    pub long_token_min_chars: usize,
    pub long_token_size_cap: f32,

    pub headliner_size: f32,
    /// Secondary tiers as `(end_index, size_px)`: tier k covers artist
    /// indices `[tiers[k-1].0, tiers[k].0)` (the headliner occupies index 0).
    /// The last `end_index` is the per-day render cap; the rest overflow.
    pub tiers: Vec<(usize, f32)>,

    pub date_strip_size: f32,
    pub side_label_size: f32,
    pub overflow_size: f32,
    pub empty_notice_size: f32,
    pub footer_tagline_size: f32,
    pub footer_brand_size: f32,

    pub separator: String,
    pub empty_notice: String,
    pub footer_tagline: String,
    pub footer_brand: String,
    pub footer_brand_accent: String,

    pub fonts: FontFiles,
}

/// Font files by role, relative to the assets root.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FontFiles {
    /// Festival title.
    pub display: String,
    /// Dates, tier rows, side labels, footer tagline.
    pub body: String,
    /// Headliner and footer brand.
    pub accent: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontRole {
    Display,
    Body,
    Accent,
}

impl FontFiles {
    pub fn path_for(&self, role: FontRole) -> &str {
        match role {
            FontRole::Display => &self.display,
            FontRole::Body => &self.body,
            FontRole::Accent => &self.accent,
        }
    }
}

impl Default for PosterStyle {
    fn default() -> Self {
        Self {
            canvas: Canvas::poster(),

            base_color: Rgba8::opaque(0x05, 0x00, 0x14),
            headliner_gradient: (Rgba8::opaque(0xFF, 0xF5, 0x00), Rgba8::opaque(0xFF, 0x99, 0x00)),
            accent: Rgba8::opaque(0xFF, 0x55, 0xB5),
            body_color: Rgba8::opaque(0xEE, 0xEE, 0xEE),
            muted_color: Rgba8::opaque(0xAA, 0xAA, 0xAA),

            overlay_stops: vec![
                (0.0, Rgba8::new(0, 0, 0, 51)),
                (0.4, Rgba8::new(0, 0, 0, 153)),
                (1.0, Rgba8::new(0, 0, 0, 217)),
            ],
            backdrop_opacity: 0.8,

            top_padding: 70.0,
            content_side_padding: 40.0,
            headliner_side_padding: 100.0,
            day_block_gap: 60.0,
            footer_height: 140.0,
            footer_fade: 40.0,

            title_sizes: vec![(12, 125.0), (18, 115.0), (24, 100.0), (32, 85.0)],
            title_size_floor: 70.0,
            long_token_min_chars: 14,
            long_token_size_cap: 80.0,

            headliner_size: 85.0,
            tiers: vec![(4, 52.0), (9, 44.0), (14, 38.0)],

            date_strip_size: 42.0,
            side_label_size: 40.0,
            overflow_size: 25.0,
            empty_notice_size: 60.0,
            footer_tagline_size: 20.0,
            footer_brand_size: 45.0,

            separator: "•".to_string(),
            empty_notice: "LINEUP VACÍO".to_string(),
            footer_tagline: "CREA TU PROPIO LINEUP EN".to_string(),
            footer_brand: "MIFESTIVAL".to_string(),
            footer_brand_accent: ".WEB.APP".to_string(),

            fonts: FontFiles {
                display: "fonts/display.ttf".to_string(),
                body: "fonts/body.ttf".to_string(),
                accent: "fonts/accent.ttf".to_string(),
            },
        }
    }
}

impl PosterStyle {
    /// Per-day render cap: artists at or past this index are summarized by the
    /// overflow caption.
    pub fn day_render_cap(&self) -> usize {
        self.tiers.last().map(|&(end, _)| end).unwrap_or(1)
    }
}
