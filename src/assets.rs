use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::{MarqueeError, MarqueeResult},
    model::Theme,
    style::{FontRole, PosterStyle},
};

/// Background artwork shipped with the crate, one SVG per theme.
pub fn theme_svg_source(theme: Theme) -> &'static str {
    match theme {
        Theme::City => include_str!("../assets/themes/city.svg"),
        Theme::Beach => include_str!("../assets/themes/beach.svg"),
        Theme::Desert => include_str!("../assets/themes/desert.svg"),
    }
}

/// Fonts and parsed theme trees, loaded once and shared across renders.
#[derive(Debug)]
pub struct PosterAssets {
    fonts: BTreeMap<FontRole, Arc<Vec<u8>>>,
    themes: BTreeMap<Theme, Arc<usvg::Tree>>,
}

impl PosterAssets {
    /// Load font files named by `style` relative to `root` and parse the
    /// embedded theme artwork.
    pub fn prepare(root: impl Into<PathBuf>, style: &PosterStyle) -> MarqueeResult<Self> {
        let root = root.into();

        let mut fonts = BTreeMap::new();
        for role in [FontRole::Display, FontRole::Body, FontRole::Accent] {
            let rel = style.fonts.path_for(role);
            let path = root.join(rel);
            let bytes = read_font(&path)?;
            fonts.insert(role, Arc::new(bytes));
        }

        let mut themes = BTreeMap::new();
        let opts = usvg::Options::default();
        for theme in Theme::ALL {
            let tree = usvg::Tree::from_data(theme_svg_source(theme).as_bytes(), &opts)
                .map_err(|e| {
                    MarqueeError::raster(format!(
                        "failed to parse {} theme artwork: {e}",
                        theme.as_str()
                    ))
                })?;
            themes.insert(theme, Arc::new(tree));
        }

        Ok(Self { fonts, themes })
    }

    pub fn font_bytes(&self, role: FontRole) -> &Arc<Vec<u8>> {
        // All three roles are loaded in `prepare`; the map is total.
        &self.fonts[&role]
    }

    pub fn theme_tree(&self, theme: Theme) -> &Arc<usvg::Tree> {
        &self.themes[&theme]
    }
}

fn read_font(path: &Path) -> MarqueeResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        MarqueeError::validation(format!("failed to read font '{}': {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_artwork_parses() {
        let opts = usvg::Options::default();
        for theme in Theme::ALL {
            let tree = usvg::Tree::from_data(theme_svg_source(theme).as_bytes(), &opts);
            let tree = tree.expect("theme svg must parse");
            assert_eq!(tree.size().width(), 1080.0);
            assert_eq!(tree.size().height(), 1920.0);
        }
    }

    #[test]
    fn prepare_reports_missing_fonts() {
        let err = PosterAssets::prepare("does/not/exist", &PosterStyle::default()).unwrap_err();
        assert!(err.to_string().contains("failed to read font"));
    }
}
