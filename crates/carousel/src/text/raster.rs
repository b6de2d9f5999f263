//! Glyph rasterization with fontdue.

use std::path::Path;

use bytes::Bytes;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle as GlyphRun};
use fontdue::{Font, FontSettings};
use tracing::debug;

use super::{RenderError, RenderedText, TextRenderer, TextStyle};

/// Bitmaps larger than this in either direction are refused
const MAX_DIMENSION: u32 = 8192;

/// [`TextRenderer`] drawing every [`FontFace`](super::FontFace) from one font file
pub struct FontdueRenderer {
    font: Font,
}

impl FontdueRenderer {
    pub fn from_bytes(font_bytes: &[u8]) -> Result<Self, RenderError> {
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let font_bytes = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded font");
        Self::from_bytes(&font_bytes)
    }
}

impl TextRenderer for FontdueRenderer {
    fn render(&self, style: &TextStyle, text: &str) -> Result<RenderedText, RenderError> {
        let px = style.font.point_size() as f32;

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            max_width: (style.wrap > 0).then_some(style.wrap as f32),
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &GlyphRun::new(text, px, 0));

        let glyphs = layout.glyphs();
        let width = glyphs
            .iter()
            .map(|g| g.x + g.width as f32)
            .fold(0.0f32, f32::max)
            .ceil() as u32;
        let height = layout.height().ceil() as u32;

        if width == 0 || height == 0 {
            return Err(RenderError::EmptyText);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RenderError::TooLarge { width, height });
        }

        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        let color = style.color;

        for glyph in glyphs {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, coverage) = self.font.rasterize_config(glyph.key);
            let left = glyph.x.round() as i64;
            let top = glyph.y.round() as i64;

            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let x = left + col as i64;
                    let y = top + row as i64;
                    if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                        continue;
                    }

                    let alpha = coverage[row * metrics.width + col];
                    if alpha == 0 {
                        continue;
                    }

                    let offset = (y as usize * width as usize + x as usize) * 4;
                    let blended = (u16::from(alpha) * u16::from(color.a) / 255) as u8;
                    // Overlapping glyph edges keep the stronger coverage
                    if blended > pixels[offset + 3] {
                        pixels[offset] = color.r;
                        pixels[offset + 1] = color.g;
                        pixels[offset + 2] = color.b;
                        pixels[offset + 3] = blended;
                    }
                }
            }
        }

        Ok(RenderedText {
            width,
            height,
            pixels: Bytes::from(pixels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{FontFace, Rgba};

    #[test]
    fn rejects_invalid_font_data() {
        assert!(matches!(
            FontdueRenderer::from_bytes(b"definitely not a font"),
            Err(RenderError::Font(_))
        ));
    }

    #[test]
    fn missing_font_file() {
        let dir = tempfile::tempdir().unwrap();
        match FontdueRenderer::from_file(dir.path().join("Roboto-Regular.ttf")) {
            Err(RenderError::Font(message)) => assert!(message.contains("Roboto-Regular.ttf")),
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    const TEST_FONT: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/fonts/DejaVuSansMono.ttf"
    ));

    fn renderer() -> FontdueRenderer {
        FontdueRenderer::from_bytes(TEST_FONT).unwrap()
    }

    #[test]
    fn renders_tinted_coverage() {
        let color = Rgba::new(10, 20, 30, 128);
        let style = TextStyle::new(FontFace::Roboto22, color, 480);
        let text = renderer().render(&style, "Walk-off").unwrap();

        assert!(text.width > 0 && text.height > 0);
        assert!(text.height >= 22);
        assert_eq!(text.pixels.len(), (text.width * text.height * 4) as usize);

        let inked: Vec<_> = text.pixels.chunks_exact(4).filter(|p| p[3] > 0).collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|p| p[..3] == [10, 20, 30] && p[3] <= 128));
    }

    #[test]
    fn wraps_at_the_configured_width() {
        let text = "Grand slam in the ninth seals the series";
        let wide = TextStyle::new(FontFace::Roboto20, Rgba::WHITE, 0);
        let narrow = TextStyle::new(FontFace::Roboto20, Rgba::WHITE, 120);

        let single = renderer().render(&wide, text).unwrap();
        let wrapped = renderer().render(&narrow, text).unwrap();

        assert!(single.width > 120);
        assert!(wrapped.height > single.height);
        assert!(wrapped.width < single.width);
    }

    #[test]
    fn empty_text_is_refused() {
        let style = TextStyle::new(FontFace::Roboto20, Rgba::WHITE, 480);
        assert!(matches!(
            renderer().render(&style, ""),
            Err(RenderError::EmptyText)
        ));
    }
}
