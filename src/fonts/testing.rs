use ahash::AHashMap;

use super::{
    FaceRef, FontCollection, FontFace, FontMetrics, FontResolver, FontService, GlyphMask,
};
use crate::styles::{FontStyle, Slant, Weight};

const DEJAVU_MONO: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const DEJAVU_MONO_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");

/// A character only the bold DejaVu face has.
pub const BOLD_ONLY: char = '\u{27bf}';

/// The character none of the regular mock faces can draw.
pub const SNOWMAN: char = '\u{2603}';

/// A face where every glyph advances by `0.6 * size`.
#[derive(Debug)]
pub struct MockFace {
    pub size: f32,
    pub has_snowman: bool,
}

impl MockFace {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            has_snowman: false,
        }
    }

    pub fn width(size: f32) -> f32 {
        size * 0.6
    }
}

impl FontFace for MockFace {
    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.size * 0.8,
            descent: self.size * 0.2,
            height: self.size,
            ch: Self::width(self.size),
        }
    }

    fn advance(&self, ch: char) -> f32 {
        if ch == '\u{301}' {
            0.
        } else {
            Self::width(self.size)
        }
    }

    fn kern(&self, left: char, right: char) -> f32 {
        if (left, right) == ('A', 'V') {
            -0.1 * self.size
        } else {
            0.
        }
    }

    fn has_glyph(&self, ch: char) -> bool {
        ch != SNOWMAN || self.has_snowman
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize(&self, ch: char) -> Option<GlyphMask> {
        if ch.is_whitespace() || ch.is_control() || !self.has_glyph(ch) {
            return None;
        }
        let width = self.advance(ch).ceil().max(1.) as u32;
        let height = (self.size * 0.8).ceil() as u32;
        Some(GlyphMask {
            left: 0,
            top: -(height as i32),
            width,
            height,
            coverage: vec![255; (width * height) as usize],
        })
    }
}

/// Resolves styles to [`MockFace`]s, one shared face per distinct style.
///
/// The family `none` resolves to nothing.
#[derive(Default)]
pub struct MockResolver {
    faces: AHashMap<(u32, bool, bool, String), FaceRef>,
    symbols: AHashMap<u32, FaceRef>,
}

impl FontResolver for MockResolver {
    fn open(&mut self, style: &FontStyle) -> Option<FaceRef> {
        if style.family == "none" {
            return None;
        }
        let key = (
            style.size.to_bits(),
            style.weight.is_bold(),
            style.slant == Slant::Italic,
            style.family.clone(),
        );
        Some(
            self.faces
                .entry(key)
                .or_insert_with(|| FaceRef::new(MockFace::new(style.size)))
                .clone(),
        )
    }

    fn fallback(&mut self, style: &FontStyle, ch: char) -> Option<FaceRef> {
        (ch == SNOWMAN).then(|| {
            self.symbols
                .entry(style.size.to_bits())
                .or_insert_with(|| {
                    FaceRef::new(MockFace {
                        size: style.size,
                        has_snowman: true,
                    })
                })
                .clone()
        })
    }
}

pub fn mock_service() -> FontService {
    FontService::new(MockResolver::default())
}

/// The default style used by tests: 10pt mock text, so each glyph is 6px
/// wide.
pub fn mock_style() -> FontStyle {
    FontStyle::default().with_size(10.)
}

/// DejaVu Sans Mono in regular and bold, reachable as `monospace`.
pub fn dejavu_collection() -> FontCollection {
    FontCollection::default()
        .with_font("DejaVu Sans Mono", DEJAVU_MONO)
        .unwrap()
        .with_face(
            "DejaVu Sans Mono",
            Weight::BOLD,
            Slant::Normal,
            DEJAVU_MONO_BOLD,
        )
        .unwrap()
        .with_generic("monospace", "DejaVu Sans Mono")
}

/// 12pt monospace, 16px at the default resolution.
pub fn dejavu_style() -> FontStyle {
    FontStyle::default().with_family("monospace").with_size(12.)
}
