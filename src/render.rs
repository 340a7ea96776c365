use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    assets::PosterAssets,
    core::Rgba8,
    error::{MarqueeError, MarqueeResult},
    model::Theme,
    scene::{ContentBlock, DayBlock, PosterScene},
    style::{FontRole, PosterStyle},
    text::{StyledSpan, TextLayoutEngine, layout_height},
};

/// Rasterized poster frame in premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    stops: Vec<(u32, [u8; 4])>, // offset bits + straight RGBA
    w: u32,
    h: u32,
}

/// How a text block is painted: per-span solid colors, or one vertical
/// gradient across the whole block (the headliner treatment).
enum TextFill {
    Spans,
    Gradient(Rgba8, Rgba8),
}

/// CPU poster rasterizer. Holds shaping contexts and paint caches; safe to
/// reuse across renders, and cheap to rebuild.
pub struct CpuRasterizer {
    text: TextLayoutEngine,
    font_cache: HashMap<FontRole, vello_cpu::peniko::FontData>,
    gradient_cache: HashMap<GradientKey, vello_cpu::Image>,
    svg_cache: HashMap<(Theme, u32, u32), vello_cpu::Image>,
}

impl Default for CpuRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuRasterizer {
    pub fn new() -> Self {
        Self {
            text: TextLayoutEngine::new(),
            font_cache: HashMap::new(),
            gradient_cache: HashMap::new(),
            svg_cache: HashMap::new(),
        }
    }

    /// Rasterize a composed scene into a premultiplied RGBA8 frame.
    #[tracing::instrument(skip_all, fields(theme = scene.theme.as_str()))]
    pub fn render(
        &mut self,
        scene: &PosterScene,
        assets: &PosterAssets,
    ) -> MarqueeResult<FrameRGBA> {
        let style = &scene.style;
        let width_u16: u16 = scene
            .canvas
            .width
            .try_into()
            .map_err(|_| MarqueeError::raster("canvas width exceeds u16"))?;
        let height_u16: u16 = scene
            .canvas
            .height
            .try_into()
            .map_err(|_| MarqueeError::raster("canvas height exceeds u16"))?;
        let w = f64::from(scene.canvas.width);
        let h = f64::from(scene.canvas.height);

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        // Base fill under the artwork.
        let base = style.base_color;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            base.r, base.g, base.b, base.a,
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));

        self.draw_backdrop(&mut ctx, scene, assets)?;
        self.draw_overlay(&mut ctx, style, scene.canvas.width, scene.canvas.height)?;
        self.draw_content(&mut ctx, scene, assets)?;
        self.draw_footer(&mut ctx, scene, assets)?;

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: scene.canvas.width,
            height: scene.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_backdrop(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &PosterScene,
        assets: &PosterAssets,
    ) -> MarqueeResult<()> {
        let tree = assets.theme_tree(scene.theme);
        let (rw, rh, dx, dy) = cover_raster_params(
            tree.size().width(),
            tree.size().height(),
            scene.canvas.width,
            scene.canvas.height,
        )?;

        let key = (scene.theme, rw, rh);
        let paint = match self.svg_cache.get(&key) {
            Some(p) => p.clone(),
            None => {
                let rgba8_premul = rasterize_svg_to_premul_rgba8(tree, rw, rh)?;
                let pixmap = premul_bytes_to_pixmap(&rgba8_premul, rw, rh)?;
                let paint = vello_cpu::Image {
                    image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                    sampler: vello_cpu::peniko::ImageSampler::default(),
                };
                self.svg_cache.insert(key, paint.clone());
                paint
            }
        };

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((dx, dy)));
        ctx.set_paint(paint);
        ctx.push_opacity_layer(scene.style.backdrop_opacity);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(rw),
            f64::from(rh),
        ));
        ctx.pop_layer();
        Ok(())
    }

    fn draw_overlay(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        style: &PosterStyle,
        width: u32,
        height: u32,
    ) -> MarqueeResult<()> {
        let paint = self.gradient_paint(&style.overlay_stops, width, height)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));
        Ok(())
    }

    fn draw_content(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &PosterScene,
        assets: &PosterAssets,
    ) -> MarqueeResult<()> {
        let style = &scene.style;
        let w = f64::from(scene.canvas.width);
        let mut y = style.top_padding;
        let mut first_day = true;

        for block in &scene.content {
            match block {
                ContentBlock::Title {
                    text,
                    size_px,
                    margin_bottom,
                } => {
                    let spans = [StyledSpan {
                        text,
                        brush: Rgba8::opaque(255, 255, 255),
                    }];
                    let height = self.draw_text(
                        ctx,
                        assets,
                        &spans,
                        FontRole::Display,
                        *size_px,
                        style.content_side_padding,
                        w - 2.0 * style.content_side_padding,
                        y,
                        TextFill::Spans,
                    )?;
                    y += height + margin_bottom;
                }
                ContentBlock::DateStrip {
                    text,
                    size_px,
                    margin_bottom,
                } => {
                    let spans = [StyledSpan {
                        text,
                        brush: style.accent,
                    }];
                    let height = self.draw_text(
                        ctx,
                        assets,
                        &spans,
                        FontRole::Body,
                        *size_px,
                        style.content_side_padding,
                        w - 2.0 * style.content_side_padding,
                        y,
                        TextFill::Spans,
                    )?;
                    y += height + margin_bottom;
                }
                ContentBlock::EmptyNotice {
                    text,
                    size_px,
                    margin_top,
                } => {
                    y += margin_top;
                    let spans = [StyledSpan {
                        text,
                        brush: style.headliner_gradient.0,
                    }];
                    let height = self.draw_text(
                        ctx,
                        assets,
                        &spans,
                        FontRole::Body,
                        *size_px,
                        style.content_side_padding,
                        w - 2.0 * style.content_side_padding,
                        y,
                        TextFill::Spans,
                    )?;
                    y += height;
                }
                ContentBlock::Day(day) => {
                    if !first_day {
                        y += style.day_block_gap;
                    }
                    first_day = false;
                    y += self.draw_day(ctx, scene, assets, day, y)?;
                }
            }
        }
        Ok(())
    }

    fn draw_day(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &PosterScene,
        assets: &PosterAssets,
        day: &DayBlock,
        top: f64,
    ) -> MarqueeResult<f64> {
        let style = &scene.style;
        let w = f64::from(scene.canvas.width);

        // Side labels sit 20 units below the block top, pinned to the edges.
        let day_spans = [StyledSpan {
            text: &day.day_label,
            brush: style.accent,
        }];
        self.draw_text(
            ctx,
            assets,
            &day_spans,
            FontRole::Body,
            style.side_label_size,
            0.0,
            120.0,
            top + 20.0,
            TextFill::Spans,
        )?;
        let date_spans = [StyledSpan {
            text: &day.date_label,
            brush: style.accent,
        }];
        self.draw_text(
            ctx,
            assets,
            &date_spans,
            FontRole::Body,
            style.side_label_size,
            w - 180.0,
            180.0,
            top + 20.0,
            TextFill::Spans,
        )?;

        let mut height = 0.0f64;

        if let Some(headliner) = &day.headliner {
            let spans = [StyledSpan {
                text: headliner,
                brush: style.headliner_gradient.0,
            }];
            let block_height = self.draw_text(
                ctx,
                assets,
                &spans,
                FontRole::Accent,
                style.headliner_size,
                style.headliner_side_padding,
                w - 2.0 * style.headliner_side_padding,
                top,
                TextFill::Gradient(style.headliner_gradient.0, style.headliner_gradient.1),
            )?;
            height += block_height + 10.0;
        }

        for tier in &day.tiers {
            height += tier.margin_top;
            let mut spans = Vec::with_capacity(tier.names.len() * 2);
            for (i, name) in tier.names.iter().enumerate() {
                if i > 0 {
                    spans.push(StyledSpan {
                        text: &style.separator,
                        brush: style.accent,
                    });
                }
                spans.push(StyledSpan {
                    text: name,
                    brush: style.body_color,
                });
            }
            let block_height = self.draw_text(
                ctx,
                assets,
                &spans,
                FontRole::Body,
                tier.size_px,
                style.content_side_padding,
                w - 2.0 * style.content_side_padding,
                top + height,
                TextFill::Spans,
            )?;
            height += block_height;
        }

        if let Some(overflow) = &day.overflow {
            height += 15.0;
            let spans = [StyledSpan {
                text: &overflow.text,
                brush: style.muted_color,
            }];
            let block_height = self.draw_text(
                ctx,
                assets,
                &spans,
                FontRole::Body,
                style.overflow_size,
                style.content_side_padding,
                w - 2.0 * style.content_side_padding,
                top + height,
                TextFill::Spans,
            )?;
            height += block_height;
        }

        Ok(height)
    }

    fn draw_footer(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &PosterScene,
        assets: &PosterAssets,
    ) -> MarqueeResult<()> {
        let style = &scene.style;
        let w = f64::from(scene.canvas.width);
        let h = f64::from(scene.canvas.height);
        let band_h = scene.footer.height;

        let stops = [
            (0.0, Rgba8::transparent()),
            (0.5, Rgba8::new(0, 0, 0, 153)),
            (1.0, Rgba8::new(0, 0, 0, 230)),
        ];
        let band_w = scene.canvas.width;
        let band_px = band_h.ceil().max(1.0) as u32;
        let paint = self.gradient_paint(&stops, band_w, band_px)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((0.0, h - band_h)));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, band_h));

        // Brand line hugs the bottom padding; the tagline stacks above it.
        let brand_spans = [
            StyledSpan {
                text: &scene.footer.brand,
                brush: Rgba8::opaque(255, 255, 255),
            },
            StyledSpan {
                text: &scene.footer.brand_accent,
                brush: style.accent,
            },
        ];
        let brand_layout = self.text.layout_spans(
            &brand_spans,
            assets.font_bytes(FontRole::Accent),
            style.footer_brand_size,
            Some(w as f32),
        )?;
        let brand_h = layout_height(&brand_layout);
        let brand_top = h - style.footer_fade - brand_h;

        let tagline_spans = [StyledSpan {
            text: &scene.footer.tagline,
            brush: Rgba8::new(255, 255, 255, 230),
        }];
        let tagline_layout = self.text.layout_spans(
            &tagline_spans,
            assets.font_bytes(FontRole::Body),
            style.footer_tagline_size,
            Some(w as f32),
        )?;
        let tagline_h = layout_height(&tagline_layout);
        let tagline_top = brand_top - 5.0 - tagline_h;

        let tagline_font = self.font_for(FontRole::Body, assets);
        draw_layout_centered(ctx, &tagline_layout, &tagline_font, 0.0, tagline_top, w, None);
        let brand_font = self.font_for(FontRole::Accent, assets);
        draw_layout_centered(ctx, &brand_layout, &brand_font, 0.0, brand_top, w, None);
        Ok(())
    }

    /// Lay out, center, and draw one text block; returns its measured height.
    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        assets: &PosterAssets,
        spans: &[StyledSpan<'_>],
        role: FontRole,
        size_px: f32,
        origin_x: f64,
        max_width: f64,
        origin_y: f64,
        fill: TextFill,
    ) -> MarqueeResult<f64> {
        if spans.is_empty() {
            return Ok(0.0);
        }

        let layout = self.text.layout_spans(
            spans,
            assets.font_bytes(role),
            size_px,
            Some(max_width as f32),
        )?;
        let height = layout_height(&layout);

        let gradient = match fill {
            TextFill::Spans => None,
            TextFill::Gradient(start, end) => {
                let stops = [(0.0, start), (1.0, end)];
                let gh = height.ceil().max(1.0) as u32;
                Some(self.gradient_paint(&stops, max_width.ceil().max(1.0) as u32, gh)?)
            }
        };

        let font = self.font_for(role, assets);
        draw_layout_centered(
            ctx,
            &layout,
            &font,
            origin_x,
            origin_y,
            max_width,
            gradient,
        );
        Ok(height)
    }

    fn font_for(&mut self, role: FontRole, assets: &PosterAssets) -> vello_cpu::peniko::FontData {
        if let Some(font) = self.font_cache.get(&role) {
            return font.clone();
        }
        let bytes: Vec<u8> = assets.font_bytes(role).as_ref().clone();
        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        self.font_cache.insert(role, font.clone());
        font
    }

    fn gradient_paint(
        &mut self,
        stops: &[(f32, Rgba8)],
        w: u32,
        h: u32,
    ) -> MarqueeResult<vello_cpu::Image> {
        let key = GradientKey {
            stops: stops
                .iter()
                .map(|&(o, c)| (o.to_bits(), [c.r, c.g, c.b, c.a]))
                .collect(),
            w,
            h,
        };
        if let Some(img) = self.gradient_cache.get(&key).cloned() {
            return Ok(img);
        }
        let bytes = vertical_gradient_premul(stops, w, h)?;
        let pixmap = premul_bytes_to_pixmap(&bytes, w, h)?;
        let img = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.gradient_cache.insert(key, img.clone());
        Ok(img)
    }
}

/// Draw a layout with each line centered inside `max_width`, translated to
/// `(origin_x, origin_y)`. A gradient paint, when given, replaces the per-run
/// brushes.
fn draw_layout_centered(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<Rgba8>,
    font: &vello_cpu::peniko::FontData,
    origin_x: f64,
    origin_y: f64,
    max_width: f64,
    gradient: Option<vello_cpu::Image>,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin_x, origin_y)));
    if let Some(paint) = &gradient {
        ctx.set_paint(paint.clone());
    }

    for line in layout.lines() {
        let advance = f64::from(line.metrics().advance);
        let dx = ((max_width - advance) * 0.5).max(0.0) as f32;
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            if gradient.is_none() {
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
            }

            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x + dx,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

/// Raster size and placement that covers the canvas with the SVG while
/// preserving its aspect ratio, centering the overshoot.
pub fn cover_raster_params(
    tree_w: f32,
    tree_h: f32,
    canvas_w: u32,
    canvas_h: u32,
) -> MarqueeResult<(u32, u32, f64, f64)> {
    if !tree_w.is_finite() || !tree_h.is_finite() || tree_w <= 0.0 || tree_h <= 0.0 {
        return Err(MarqueeError::raster("svg has invalid width/height"));
    }

    let sx = f64::from(canvas_w) / f64::from(tree_w);
    let sy = f64::from(canvas_h) / f64::from(tree_h);

    // The covering axis maps exactly onto the canvas; only the overshooting
    // axis is scaled (and rounded up).
    let (w, h) = if sx >= sy {
        let h = (f64::from(tree_h) * sx).ceil().max(1.0) as u32;
        (canvas_w.max(1), h)
    } else {
        let w = (f64::from(tree_w) * sy).ceil().max(1.0) as u32;
        (w, canvas_h.max(1))
    };

    // Bound allocations; theme artwork is sized for the poster canvas anyway.
    const MAX_DIM: u32 = 16_384;
    if w > MAX_DIM || h > MAX_DIM {
        return Err(MarqueeError::raster(format!(
            "svg raster size too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let dx = (f64::from(canvas_w) - f64::from(w)) * 0.5;
    let dy = (f64::from(canvas_h) - f64::from(h)) * 0.5;
    Ok((w, h, dx, dy))
}

fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> MarqueeResult<Vec<u8>> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| MarqueeError::raster("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}

/// Vertical multi-stop gradient as premultiplied RGBA8 bytes. Stops are
/// `(offset, straight color)` with ascending offsets in `[0, 1]`; colors are
/// interpolated in straight alpha, then premultiplied per row.
pub fn vertical_gradient_premul(
    stops: &[(f32, Rgba8)],
    w: u32,
    h: u32,
) -> MarqueeResult<Vec<u8>> {
    if stops.is_empty() {
        return Err(MarqueeError::raster("gradient needs at least one stop"));
    }

    let mut bytes = vec![0u8; (w as usize).saturating_mul(h as usize).saturating_mul(4)];
    let h1 = (h.max(1) - 1) as f32;
    for y in 0..h {
        let t = if h1 <= 0.0 { 0.0 } else { (y as f32) / h1 };
        let c = sample_stops(stops, t).premultiplied();
        let row = [c.r, c.g, c.b, c.a];
        for x in 0..w {
            let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
            bytes[idx..idx + 4].copy_from_slice(&row);
        }
    }
    Ok(bytes)
}

fn sample_stops(stops: &[(f32, Rgba8)], t: f32) -> Rgba8 {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (o0, c0) = pair[0];
        let (o1, c1) = pair[1];
        if t <= o1 {
            let span = (o1 - o0).max(f32::EPSILON);
            let local = ((t - o0) / span).clamp(0.0, 1.0);
            let lerp = |a: u8, b: u8| -> u8 {
                let af = f32::from(a);
                let bf = f32::from(b);
                (af + (bf - af) * local).round().clamp(0.0, 255.0) as u8
            };
            return Rgba8::new(
                lerp(c0.r, c1.r),
                lerp(c0.g, c1.g),
                lerp(c0.b, c1.b),
                lerp(c0.a, c1.a),
            );
        }
    }
    stops[stops.len() - 1].1
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> MarqueeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MarqueeError::raster("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MarqueeError::raster("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(MarqueeError::raster("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}
