//! Font faces, font resolution, and the locked service that serializes access
//! to them.
use std::fmt::{self, Debug};
use std::ops::Deref;
use std::sync::Arc;

use ahash::AHashMap;
use fontdue::FontSettings;
use intentional::Cast;
use parking_lot::{Mutex, MutexGuard};

use crate::styles::{FontStyle, Slant, Weight};
use crate::{Error, Result};

#[cfg(test)]
pub(crate) mod testing;

/// Vertical metrics of a sized face, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of the tallest glyphs.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the lowest glyphs. Always
    /// positive.
    pub descent: f32,
    /// The recommended distance between baselines.
    pub height: f32,
    /// The advance of the `0` character, used as a column width for tabs.
    pub ch: f32,
}

/// An 8-bit coverage mask for one glyph.
///
/// The mask's top-left corner is at `(left, top)` relative to the pen
/// position on the baseline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphMask {
    /// Horizontal offset from the pen position.
    pub left: i32,
    /// Vertical offset from the baseline. Negative is above the baseline.
    pub top: i32,
    /// Width of the mask in pixels.
    pub width: u32,
    /// Height of the mask in pixels.
    pub height: u32,
    /// Row-major coverage values.
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    /// Returns the coverage at `x, y`, or 0 outside of the mask.
    #[must_use]
    pub fn coverage_at(&self, x: i32, y: i32) -> u8 {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return 0;
        };
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or_default()
    }
}

/// A font at a specific pixel size.
pub trait FontFace: Send + Sync + Debug {
    /// Returns the vertical metrics of this face.
    fn metrics(&self) -> FontMetrics;
    /// Returns the horizontal advance of `ch`.
    fn advance(&self, ch: char) -> f32;
    /// Returns the kerning adjustment between `left` and `right`.
    fn kern(&self, left: char, right: char) -> f32;
    /// Returns true if this face contains a glyph for `ch`.
    fn has_glyph(&self, ch: char) -> bool;
    /// Rasterizes `ch`. Returns `None` for glyphs without any ink.
    fn rasterize(&self, ch: char) -> Option<GlyphMask>;
}

/// A shared, sized font face.
///
/// Two references are equal when they point to the same face.
#[derive(Clone)]
pub struct FaceRef(Arc<dyn FontFace>);

impl FaceRef {
    /// Wraps `face` in a shared reference.
    pub fn new(face: impl FontFace + 'static) -> Self {
        Self(Arc::new(face))
    }
}

impl Deref for FaceRef {
    type Target = dyn FontFace;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for FaceRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for FaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Turns font styles into sized faces.
pub trait FontResolver: Send {
    /// Returns the face that best matches `style`.
    fn open(&mut self, style: &FontStyle) -> Option<FaceRef>;
    /// Returns a face that can draw `ch` when the face matching `style`
    /// cannot.
    fn fallback(&mut self, style: &FontStyle, ch: char) -> Option<FaceRef>;
}

/// Serialized access to a [`FontResolver`] and the faces it returns.
///
/// Font rasterizers are not assumed to be reentrant, so every face lookup and
/// every metric or glyph query happens while holding a [`FontSession`].
pub struct FontService {
    resolver: Mutex<Box<dyn FontResolver>>,
}

impl FontService {
    /// Returns a service wrapping `resolver`.
    pub fn new(resolver: impl FontResolver + 'static) -> Self {
        Self {
            resolver: Mutex::new(Box::new(resolver)),
        }
    }

    /// Locks the service until the returned session is dropped.
    pub fn session(&self) -> FontSession<'_> {
        FontSession {
            resolver: self.resolver.lock(),
        }
    }
}

impl Debug for FontService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontService").finish_non_exhaustive()
    }
}

/// Exclusive access to a [`FontService`].
pub struct FontSession<'a> {
    resolver: MutexGuard<'a, Box<dyn FontResolver>>,
}

impl FontSession<'_> {
    /// Returns the face that best matches `style`.
    pub fn open(&mut self, style: &FontStyle) -> Option<FaceRef> {
        self.resolver.open(style)
    }

    /// Returns a face that can draw `ch`, if any.
    pub fn fallback(&mut self, style: &FontStyle, ch: char) -> Option<FaceRef> {
        self.resolver.fallback(style, ch)
    }
}

struct RegisteredFace {
    family: String,
    weight: Weight,
    slant: Slant,
    font: Arc<fontdue::Font>,
}

/// A set of fonts loaded from memory, resolved by family, weight and slant.
pub struct FontCollection {
    faces: Vec<RegisteredFace>,
    generic: AHashMap<String, String>,
    fallbacks: Vec<String>,
    dpi: f32,
    sized: AHashMap<(usize, u32), FaceRef>,
}

impl Default for FontCollection {
    fn default() -> Self {
        Self {
            faces: Vec::new(),
            generic: AHashMap::new(),
            fallbacks: Vec::new(),
            dpi: 96.,
            sized: AHashMap::new(),
        }
    }
}

impl FontCollection {
    /// Loads a regular face for `family` and returns self.
    pub fn with_font(mut self, family: impl Into<String>, data: impl AsRef<[u8]>) -> Result<Self> {
        self.load(family, Weight::NORMAL, Slant::Normal, data)?;
        Ok(self)
    }

    /// Loads a face with an explicit weight and slant and returns self.
    pub fn with_face(
        mut self,
        family: impl Into<String>,
        weight: Weight,
        slant: Slant,
        data: impl AsRef<[u8]>,
    ) -> Result<Self> {
        self.load(family, weight, slant, data)?;
        Ok(self)
    }

    /// Maps a generic family such as `monospace` to a loaded family and
    /// returns self.
    #[must_use]
    pub fn with_generic(mut self, generic: impl Into<String>, family: impl Into<String>) -> Self {
        self.generic.insert(
            generic.into().to_ascii_lowercase(),
            family.into().to_ascii_lowercase(),
        );
        self
    }

    /// Adds a family searched for characters the requested face lacks and
    /// returns self.
    #[must_use]
    pub fn with_fallback(mut self, family: impl Into<String>) -> Self {
        self.fallbacks.push(family.into().to_ascii_lowercase());
        self
    }

    /// Sets the resolution used to convert points to pixels and returns self.
    #[must_use]
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self.sized.clear();
        self
    }

    /// Parses `data` and registers it under `family`.
    pub fn load(
        &mut self,
        family: impl Into<String>,
        weight: Weight,
        slant: Slant,
        data: impl AsRef<[u8]>,
    ) -> Result<()> {
        let font = fontdue::Font::from_bytes(data.as_ref(), FontSettings::default())
            .map_err(Error::FontLoad)?;
        let family = family.into().to_ascii_lowercase();
        tracing::debug!(%family, ?weight, ?slant, "loaded font");
        self.faces.push(RegisteredFace {
            family,
            weight,
            slant,
            font: Arc::new(font),
        });
        Ok(())
    }

    /// Returns the number of loaded faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if no faces are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Converts a size in points to pixels.
    #[must_use]
    pub fn points_to_pixels(&self, points: f32) -> f32 {
        points * self.dpi / 72.
    }

    fn best_match(&self, style: &FontStyle) -> Option<usize> {
        let requested = style.family.to_ascii_lowercase();
        let family = self.generic.get(&requested).unwrap_or(&requested);
        let best = self
            .faces
            .iter()
            .enumerate()
            .filter(|(_, face)| &face.family == family)
            .min_by_key(|(_, face)| {
                (
                    face.slant != style.slant,
                    face.weight.0.abs_diff(style.weight.0),
                )
            })
            .map(|(index, _)| index);
        if best.is_none() && !self.faces.is_empty() {
            tracing::debug!(family = %style.family, "no matching family, using first face");
            return Some(0);
        }
        best
    }

    fn sized_face(&mut self, index: usize, style: &FontStyle) -> FaceRef {
        let px = self.points_to_pixels(style.size);
        // Sizes are cached at 1/64 pixel precision.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let key = (index, (px * 64.).round() as u32);
        let font = &self.faces[index].font;
        self.sized
            .entry(key)
            .or_insert_with(|| FaceRef::new(FontdueFace::new(font.clone(), px)))
            .clone()
    }
}

impl FontResolver for FontCollection {
    fn open(&mut self, style: &FontStyle) -> Option<FaceRef> {
        let index = self.best_match(style)?;
        Some(self.sized_face(index, style))
    }

    fn fallback(&mut self, style: &FontStyle, ch: char) -> Option<FaceRef> {
        let by_fallback_family = self.fallbacks.iter().find_map(|family| {
            self.faces
                .iter()
                .position(|face| &face.family == family && face.font.lookup_glyph_index(ch) != 0)
        });
        let index = by_fallback_family.or_else(|| {
            self.faces
                .iter()
                .position(|face| face.font.lookup_glyph_index(ch) != 0)
        })?;
        Some(self.sized_face(index, style))
    }
}

impl Debug for FontCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCollection")
            .field(
                "families",
                &self.faces.iter().map(|face| &face.family).collect::<Vec<_>>(),
            )
            .field("dpi", &self.dpi)
            .finish_non_exhaustive()
    }
}

struct FontdueFace {
    font: Arc<fontdue::Font>,
    px: f32,
    metrics: FontMetrics,
}

impl FontdueFace {
    fn new(font: Arc<fontdue::Font>, px: f32) -> Self {
        let (ascent, descent, height) = match font.horizontal_line_metrics(px) {
            Some(line) => (line.ascent, -line.descent, line.new_line_size),
            None => (px * 0.8, px * 0.2, px),
        };
        let ch = font.metrics('0', px).advance_width;
        Self {
            metrics: FontMetrics {
                ascent,
                descent,
                height,
                ch,
            },
            font,
            px,
        }
    }
}

impl FontFace for FontdueFace {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn advance(&self, ch: char) -> f32 {
        self.font.metrics(ch, self.px).advance_width
    }

    fn kern(&self, left: char, right: char) -> f32 {
        self.font
            .horizontal_kern(left, right, self.px)
            .unwrap_or_default()
    }

    fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }

    fn rasterize(&self, ch: char) -> Option<GlyphMask> {
        if ch.is_whitespace() || !self.has_glyph(ch) {
            return None;
        }
        let (metrics, coverage) = self.font.rasterize(ch, self.px);
        if metrics.width == 0 || metrics.height == 0 {
            return None;
        }
        Some(GlyphMask {
            left: metrics.xmin,
            top: -(metrics.ymin + metrics.height.cast::<i32>()),
            width: metrics.width.cast::<u32>(),
            height: metrics.height.cast::<u32>(),
            coverage,
        })
    }
}

impl Debug for FontdueFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontdueFace")
            .field("px", &self.px)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
