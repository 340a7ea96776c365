use crate::{
    core::Rgba8,
    error::{MarqueeError, MarqueeResult},
};

/// One styled run inside a text block. Tier rows use alternating name and
/// separator spans; most blocks are a single span.
#[derive(Clone, Debug)]
pub struct StyledSpan<'a> {
    pub text: &'a str,
    pub brush: Rgba8,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out a sequence of styled spans with one font and size,
    /// breaking lines at `max_width_px`.
    pub fn layout_spans(
        &mut self,
        spans: &[StyledSpan<'_>],
        font_bytes: &[u8],
        size_px: f32,
        max_width_px: Option<f32>,
    ) -> MarqueeResult<parley::Layout<Rgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(MarqueeError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        if spans.is_empty() {
            return Err(MarqueeError::validation("text spans must be non-empty"));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            MarqueeError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| MarqueeError::validation("registered font family has no name"))?
            .to_string();

        let text: String = spans.iter().map(|s| s.text).collect();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, &text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(
            spans.first().map(|s| s.brush).unwrap_or_default(),
        ));

        let mut offset = 0usize;
        for span in spans {
            let end = offset + span.text.len();
            builder.push(parley::style::StyleProperty::Brush(span.brush), offset..end);
            offset = end;
        }

        let mut layout: parley::Layout<Rgba8> = builder.build(&text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }
}

/// Total height of a layout from its line metrics.
pub fn layout_height(layout: &parley::Layout<Rgba8>) -> f64 {
    let mut h = 0.0f64;
    for line in layout.lines() {
        let m = line.metrics();
        h += f64::from(m.ascent + m.descent + m.leading);
    }
    h
}
