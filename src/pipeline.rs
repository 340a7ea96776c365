use std::io::Cursor;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::{
    assets::PosterAssets,
    error::{MarqueeError, MarqueeResult},
    layout::compose_poster,
    model::{Festival, Theme},
    render::CpuRasterizer,
    style::PosterStyle,
};

/// Compose, rasterize, and PNG-encode a poster in one pass.
///
/// This is the export path: the only failure a caller has to present to the
/// user is the error returned here; festival state is never affected.
#[tracing::instrument(skip_all, fields(festival = %festival.slug))]
pub fn render_poster_png(
    festival: &Festival,
    theme: Theme,
    reference_date: NaiveDate,
    style: &PosterStyle,
    assets: &PosterAssets,
) -> MarqueeResult<Vec<u8>> {
    let scene = compose_poster(festival, theme, reference_date, style);
    let mut rasterizer = CpuRasterizer::new();
    let frame = rasterizer.render(&scene, assets)?;
    encode_png(frame.width, frame.height, frame.data)
}

/// Encode RGBA8 pixels as PNG. The poster is fully opaque, so premultiplied
/// and straight alpha coincide.
pub fn encode_png(width: u32, height: u32, data: Vec<u8>) -> MarqueeResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| MarqueeError::raster("frame byte length mismatch"))?;

    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| MarqueeError::raster(format!("png encode failed: {e}")))?;
    Ok(out.into_inner())
}

/// Suggested download name, mirroring what the web app offers.
pub fn poster_file_name(festival: &Festival) -> String {
    let slug = if festival.slug.is_empty() {
        "mi-festival".to_string()
    } else {
        festival.slug.clone()
    };
    format!("{slug}-poster.png")
}

/// Best-effort delivery of an exported poster (file save, share sheet, ...).
///
/// Sinks are optional capabilities: callers that have none simply skip the
/// delivery step, they do not treat the absence as an error.
pub trait PosterSink {
    fn deliver(&self, png: &[u8], suggested_name: &str) -> MarqueeResult<()>;
}

/// Writes posters into a target directory.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PosterSink for FileSink {
    fn deliver(&self, png: &[u8], suggested_name: &str) -> MarqueeResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            MarqueeError::raster(format!(
                "create output dir '{}': {e}",
                self.dir.display()
            ))
        })?;
        let path = self.dir.join(suggested_name);
        std::fs::write(&path, png)
            .map_err(|e| MarqueeError::raster(format!("write '{}': {e}", path.display())))?;
        Ok(())
    }
}
