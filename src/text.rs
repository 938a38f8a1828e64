//! Rich text as spans of styled runes.
//!
//! A [`TextBlock`] holds one [`Span`] per visual line. Each span stores its
//! characters alongside a [`RuneRecord`] per character. Records only carry a
//! font or color when it changes from the previous rune, so the first record
//! of every span must set both; [`Span::resolved`] fills the gaps.
use std::f32::consts::FRAC_PI_2;

use figures::{Point, Rect, Size};
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::fonts::{FaceRef, FontService, FontSession};
use crate::styles::{Color, Decorations, FontStyle, TextDirection, TextStyle};

mod layout;
pub mod markup;
mod position;
mod render;
mod wrap;

pub use self::position::Spacing;
pub use self::render::RenderStats;
pub use self::wrap::WrapPoint;

/// A value that is either set explicitly or inherited from the previous rune.
#[derive(Clone, Debug, PartialEq)]
pub enum Inherit<T> {
    /// Use the value of the previous rune that set one.
    Inherit,
    /// Use this value.
    Set(T),
}

impl<T> Default for Inherit<T> {
    fn default() -> Self {
        Self::Inherit
    }
}

impl<T> Inherit<T> {
    /// Returns the value if it is set.
    #[must_use]
    pub const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Inherit => None,
        }
    }

    /// Returns true if this is [`Inherit::Set`].
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// The rendering attributes of one character.
#[derive(Clone, Debug, PartialEq)]
pub struct RuneRecord {
    /// The face to draw with.
    pub font: Inherit<FaceRef>,
    /// The foreground color.
    pub color: Inherit<Color>,
    /// The background color. Unlike font and color this is never inherited:
    /// `None` is transparent.
    pub background: Option<Color>,
    /// Decorations for this rune.
    pub decorations: Decorations,
    /// The pen position on the baseline, relative to the span.
    pub rel_pos: Point<f32>,
    /// The size of the rune's box.
    pub size: Size<f32>,
    /// Rotation around the pen position, in radians.
    pub rotation: f32,
    /// Horizontal scale. 0 means unscaled.
    pub scale_x: f32,
}

impl RuneRecord {
    /// Returns an unpositioned record.
    #[must_use]
    pub fn new(font: Inherit<FaceRef>, color: Inherit<Color>) -> Self {
        Self {
            font,
            color,
            background: None,
            decorations: Decorations::empty(),
            rel_pos: Point::new(0., 0.),
            size: Size::new(0., 0.),
            rotation: 0.,
            scale_x: 0.,
        }
    }

    /// Sets the background and returns self.
    #[must_use]
    pub fn with_background(mut self, background: Option<Color>) -> Self {
        self.background = background;
        self
    }

    /// Sets the decorations and returns self.
    #[must_use]
    pub fn with_decorations(mut self, decorations: Decorations) -> Self {
        self.decorations = decorations;
        self
    }

    /// Returns the horizontal scale, treating 0 as 1.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn effective_scale_x(&self) -> f32 {
        if self.scale_x == 0. {
            1.
        } else {
            self.scale_x
        }
    }
}

/// Why a [`Span`] cannot be positioned or drawn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum SpanError {
    /// The span has no runes.
    #[error("span is empty")]
    Empty,
    /// The number of records differs from the number of characters.
    #[error("span has {text} runes but {records} records")]
    LengthMismatch {
        /// The number of characters.
        text: usize,
        /// The number of records.
        records: usize,
    },
    /// The first record does not set a font.
    #[error("first rune does not set a font")]
    UnresolvedFont,
    /// The first record does not set a color.
    #[error("first rune does not set a color")]
    UnresolvedColor,
}

/// A rune with its inherited font and color filled in.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedRune<'a> {
    /// The rune's index in its span.
    pub index: usize,
    /// The character.
    pub ch: char,
    /// The rune's record.
    pub record: &'a RuneRecord,
    /// The face in effect for this rune.
    pub face: &'a FaceRef,
    /// The color in effect for this rune.
    pub color: Color,
}

/// An iterator over a span's runes with inherited values resolved.
///
/// Returned by [`Span::resolved`].
#[derive(Clone, Debug)]
pub struct Resolved<'a> {
    span: &'a Span,
    index: usize,
    face: Option<&'a FaceRef>,
    color: Option<Color>,
}

impl<'a> Iterator for Resolved<'a> {
    type Item = ResolvedRune<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.index;
            let ch = *self.span.text.get(index)?;
            let record = self.span.records.get(index)?;
            self.index += 1;
            if let Inherit::Set(face) = &record.font {
                self.face = Some(face);
            }
            if let Inherit::Set(color) = record.color {
                self.color = Some(color);
            }
            // Runes before the first set font and color cannot be drawn.
            if let (Some(face), Some(color)) = (self.face, self.color) {
                return Some(ResolvedRune {
                    index,
                    ch,
                    record,
                    face,
                    color,
                });
            }
        }
    }
}

/// One visual line of styled runes.
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    /// The characters.
    pub text: Vec<char>,
    /// One record per character.
    pub records: Vec<RuneRecord>,
    /// The span's origin on the baseline, relative to its block.
    pub rel_pos: Point<f32>,
    /// The pen position after the last rune, relative to the span.
    pub last_pos: Point<f32>,
    /// The direction runes were positioned in.
    pub direction: TextDirection,
    /// Every decoration used by any rune, plus
    /// [`Decorations::BACKGROUND`] if any rune has a background.
    pub decorations: Decorations,
}

impl Default for Span {
    fn default() -> Self {
        Self::new(TextDirection::LeftToRight)
    }
}

impl Span {
    /// Returns an empty span.
    #[must_use]
    pub fn new(direction: TextDirection) -> Self {
        Self {
            text: Vec::new(),
            records: Vec::new(),
            rel_pos: Point::new(0., 0.),
            last_pos: Point::new(0., 0.),
            direction,
            decorations: Decorations::empty(),
        }
    }

    /// Returns the number of runes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if there are no runes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the text as a string.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.text.iter().collect()
    }

    /// Checks that this span can be positioned and drawn.
    pub fn validate(&self) -> Result<(), SpanError> {
        let Some(first) = self.records.first() else {
            return Err(SpanError::Empty);
        };
        if self.text.is_empty() {
            return Err(SpanError::Empty);
        }
        if self.text.len() != self.records.len() {
            return Err(SpanError::LengthMismatch {
                text: self.text.len(),
                records: self.records.len(),
            });
        }
        if !first.font.is_set() {
            return Err(SpanError::UnresolvedFont);
        }
        if !first.color.is_set() {
            return Err(SpanError::UnresolvedColor);
        }
        Ok(())
    }

    /// Iterates over the runes with inherited fonts and colors filled in.
    #[must_use]
    pub fn resolved(&self) -> Resolved<'_> {
        Resolved {
            span: self,
            index: 0,
            face: None,
            color: None,
        }
    }

    /// Returns the last font and color set by any rune.
    #[must_use]
    pub fn last_style(&self) -> Option<(FaceRef, Color)> {
        let face = self
            .records
            .iter()
            .rev()
            .find_map(|record| record.font.as_set())?;
        let color = self
            .records
            .iter()
            .rev()
            .find_map(|record| record.color.as_set())?;
        Some((face.clone(), *color))
    }

    /// Appends one rune.
    pub fn append_rune(&mut self, ch: char, record: RuneRecord) {
        self.include_decorations(&record);
        self.text.push(ch);
        self.records.push(record);
    }

    fn include_decorations(&mut self, record: &RuneRecord) {
        self.decorations |= decoration_mask(record);
    }

    fn refresh_decorations(&mut self) {
        self.decorations = self
            .records
            .iter()
            .fold(Decorations::empty(), |mask, record| mask | decoration_mask(record));
    }

    fn local_end(&self, record: &RuneRecord) -> Point<f32> {
        match self.direction {
            TextDirection::LeftToRight => {
                Point::new(record.rel_pos.x + record.size.width, record.rel_pos.y)
            }
            TextDirection::TopToBottom | TextDirection::TopToBottomRotated => {
                Point::new(record.rel_pos.x, record.rel_pos.y + record.size.height)
            }
        }
    }

    /// Appends `text` drawn in `style`.
    ///
    /// Only records where the face or color changes set them. Characters
    /// the style's face cannot draw use the resolver's fallback face, and
    /// characters no face can draw are recorded as
    /// [`Diagnostic::MissingGlyph`].
    pub fn append_str(
        &mut self,
        text: &str,
        style: &FontStyle,
        session: &mut FontSession<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if text.is_empty() {
            return;
        }
        let Some(face) = session.open(style) else {
            Diagnostic::UnresolvedFont(style.family.clone()).record(diagnostics);
            return;
        };
        let decorations =
            style.decorations - (Decorations::PARAGRAPH_START | Decorations::BACKGROUND);
        let mut last = self.last_style();
        for ch in text.chars() {
            let rune_face = if ch.is_whitespace() || ch.is_control() || face.has_glyph(ch) {
                face.clone()
            } else if let Some(fallback) = session.fallback(style, ch) {
                fallback
            } else {
                Diagnostic::MissingGlyph(ch).record(diagnostics);
                face.clone()
            };
            let font = match &last {
                Some((last_face, _)) if *last_face == rune_face => Inherit::Inherit,
                _ => Inherit::Set(rune_face.clone()),
            };
            let color = match &last {
                Some((_, last_color)) if *last_color == style.color => Inherit::Inherit,
                _ => Inherit::Set(style.color),
            };
            last = Some((rune_face, style.color));
            self.append_rune(
                ch,
                RuneRecord::new(font, color)
                    .with_background(style.background)
                    .with_decorations(decorations),
            );
        }
    }

    /// Replaces the contents with `text` drawn in `style`.
    pub fn set_string(
        &mut self,
        text: &str,
        style: &FontStyle,
        session: &mut FontSession<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        self.text.clear();
        self.records.clear();
        self.decorations = Decorations::empty();
        self.last_pos = Point::new(0., 0.);
        self.append_str(text, style, session, diagnostics);
    }

    /// Applies a rotation and horizontal scale to every rune.
    pub fn set_transform(&mut self, rotation: f32, scale_x: f32) {
        for record in &mut self.records {
            record.rotation = rotation;
            record.scale_x = scale_x;
        }
    }

    /// Returns the extent from the first rune to the end position along the
    /// span's direction. The other dimension is 0.
    #[must_use]
    pub fn size_hv(&self) -> Size<f32> {
        let Some(first) = self.records.first() else {
            return Size::new(0., 0.);
        };
        match self.direction {
            TextDirection::LeftToRight => {
                Size::new((self.last_pos.x - first.rel_pos.x).abs(), 0.)
            }
            TextDirection::TopToBottom | TextDirection::TopToBottomRotated => {
                Size::new(0., (self.last_pos.y - first.rel_pos.y).abs())
            }
        }
    }

    /// Returns true once rune positions have been assigned.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_positioned(&self) -> bool {
        self.last_pos.x != 0. || self.last_pos.y != 0.
    }

    /// Returns the block-relative pen position of the rune at `index`, or the
    /// end position for indexes past the last rune.
    #[must_use]
    pub fn rune_rel_pos(&self, index: usize) -> Point<f32> {
        let local = self
            .records
            .get(index)
            .map_or(self.last_pos, |record| record.rel_pos);
        Point::new(self.rel_pos.x + local.x, self.rel_pos.y + local.y)
    }

    /// Returns the block-relative position where the rune at `index` ends, or
    /// the end position for indexes past the last rune.
    #[must_use]
    pub fn rune_end_pos(&self, index: usize) -> Point<f32> {
        let local = self
            .records
            .get(index)
            .map_or(self.last_pos, |record| self.local_end(record));
        Point::new(self.rel_pos.x + local.x, self.rel_pos.y + local.y)
    }

    /// Returns the size of the rune's box in its own unrotated frame: advance
    /// by line height.
    #[must_use]
    pub(crate) fn glyph_box(&self, record: &RuneRecord) -> Size<f32> {
        if self.direction == TextDirection::TopToBottomRotated {
            Size::new(record.size.height, record.size.width)
        } else {
            record.size
        }
    }

    /// Returns true if this span starts a paragraph.
    #[must_use]
    pub fn is_new_paragraph(&self) -> bool {
        self.records
            .first()
            .is_some_and(|record| record.decorations.contains(Decorations::PARAGRAPH_START))
    }

    /// Marks this span as starting a paragraph. Has no effect on an empty
    /// span.
    pub fn set_new_paragraph(&mut self) {
        if let Some(first) = self.records.first_mut() {
            first.decorations.insert(Decorations::PARAGRAPH_START);
            self.decorations.insert(Decorations::PARAGRAPH_START);
        }
    }

    /// Removes leading whitespace, keeping the first remaining rune's font,
    /// color and paragraph marker resolved. Returns the number of runes
    /// removed.
    pub fn trim_space_left(&mut self) -> usize {
        let count = self
            .text
            .iter()
            .take_while(|ch| ch.is_whitespace())
            .count();
        if count == 0 {
            return 0;
        }
        let removed: Vec<RuneRecord> = self.records.drain(..count.min(self.records.len())).collect();
        self.text.drain(..count);
        if let Some(first) = self.records.first_mut() {
            if !first.font.is_set() {
                if let Some(face) = removed.iter().rev().find_map(|record| record.font.as_set()) {
                    first.font = Inherit::Set(face.clone());
                }
            }
            if !first.color.is_set() {
                if let Some(color) = removed.iter().rev().find_map(|record| record.color.as_set()) {
                    first.color = Inherit::Set(*color);
                }
            }
            if removed
                .first()
                .is_some_and(|record| record.decorations.contains(Decorations::PARAGRAPH_START))
            {
                first.decorations.insert(Decorations::PARAGRAPH_START);
            }
        }
        self.refresh_decorations();
        self.zero_pos();
        count
    }

    /// Removes trailing whitespace. Returns the number of runes removed.
    pub fn trim_space_right(&mut self) -> usize {
        let count = self
            .text
            .iter()
            .rev()
            .take_while(|ch| ch.is_whitespace())
            .count();
        if count == 0 {
            return 0;
        }
        let keep = self.text.len() - count;
        self.text.truncate(keep);
        self.records.truncate(keep);
        self.last_pos = self
            .records
            .last()
            .map_or(Point::new(0., 0.), |last| self.local_end(last));
        self.refresh_decorations();
        count
    }

    /// Removes leading and trailing whitespace. Returns the number of runes
    /// removed from the start.
    pub fn trim_space(&mut self) -> usize {
        let leading = self.trim_space_left();
        self.trim_space_right();
        leading
    }

    /// Shifts positions along the span's direction so the first rune starts
    /// at 0.
    pub fn zero_pos(&mut self) {
        let Some(first) = self.records.first() else {
            return;
        };
        let offset = first.rel_pos;
        let horizontal = self.direction == TextDirection::LeftToRight;
        let shift = |point: &mut Point<f32>| {
            if horizontal {
                point.x -= offset.x;
            } else {
                point.y -= offset.y;
            }
        };
        for record in &mut self.records {
            shift(&mut record.rel_pos);
        }
        shift(&mut self.last_pos);
    }

    /// Splits the span before `index`, returning the tail.
    ///
    /// Returns `None` unless `0 < index < len`. The tail's first record has
    /// the head's last font and color filled in. The head's end position
    /// moves to the end of its last rune; the tail needs repositioning.
    pub fn split_off(&mut self, index: usize) -> Option<Span> {
        if index == 0 || index >= self.text.len() || self.text.len() != self.records.len() {
            return None;
        }
        let text = self.text.split_off(index);
        let mut records = self.records.split_off(index);
        if let Some((face, color)) = self.last_style() {
            let first = &mut records[0];
            if !first.font.is_set() {
                first.font = Inherit::Set(face);
            }
            if !first.color.is_set() {
                first.color = Inherit::Set(color);
            }
        }
        let end = self.local_end(&self.records[index - 1]);
        let mut tail = Span {
            text,
            records,
            rel_pos: self.rel_pos,
            last_pos: self.last_pos,
            direction: self.direction,
            decorations: Decorations::empty(),
        };
        tail.refresh_decorations();
        self.last_pos = end;
        self.refresh_decorations();
        Some(tail)
    }
}

fn decoration_mask(record: &RuneRecord) -> Decorations {
    if record.background.is_some() {
        record.decorations | Decorations::BACKGROUND
    } else {
        record.decorations
    }
}

/// A position within a block: a span index and a rune index in that span.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpanPos {
    /// The span index.
    pub span: usize,
    /// The rune index within the span.
    pub rune: usize,
}

impl SpanPos {
    /// Returns a new position.
    #[must_use]
    pub const fn new(span: usize, rune: usize) -> Self {
        Self { span, rune }
    }
}

/// A hyperlink covering a range of runes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Link {
    /// The text of the link.
    pub label: String,
    /// The link target.
    pub url: String,
    /// Every attribute of the tag that opened the link.
    pub properties: Vec<(String, String)>,
    /// The first rune of the link.
    pub start: SpanPos,
    /// The end of the link. The rune index is exclusive.
    pub end: SpanPos,
}

impl Link {
    /// Returns the rectangle covering the link when `block` is drawn at
    /// `origin`. Only the first line is covered when the link wraps. Empty
    /// links have no bounds.
    #[must_use]
    pub fn bounds(&self, block: &TextBlock, origin: Point<f32>) -> Option<Rect<f32>> {
        if self.start >= self.end {
            return None;
        }
        let span = block.spans.get(self.start.span)?;
        let first = span.records.get(self.start.rune)?;
        let start = span.rune_rel_pos(self.start.rune);
        let last = if self.end.span == self.start.span {
            self.end.rune.saturating_sub(1).max(self.start.rune)
        } else {
            span.len() - 1
        };
        let end = span.rune_end_pos(last.min(span.len() - 1));
        let top = origin.y + start.y - first.size.height;
        let left = (origin.x + start.x).floor();
        let top = top.floor();
        let right = (origin.x + end.x).ceil();
        let bottom = (origin.y + end.y).ceil();
        Some(Rect::new(
            Point::new(left, top),
            Size::new(right - left, bottom - top),
        ))
    }

    /// Returns true if `point` is within [`bounds`](Self::bounds).
    #[must_use]
    pub fn contains(&self, block: &TextBlock, origin: Point<f32>, point: Point<f32>) -> bool {
        self.bounds(block, origin).is_some_and(|rect| {
            point.x >= rect.origin.x
                && point.y >= rect.origin.y
                && point.x < rect.origin.x + rect.size.width
                && point.y < rect.origin.y + rect.size.height
        })
    }
}

/// A block of rich text: spans, their computed size and their links.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    /// The spans, usually one per line.
    pub spans: Vec<Span>,
    /// The size computed by the last layout.
    pub size: Size<f32>,
    /// The dominant direction.
    pub direction: TextDirection,
    /// Hyperlinks within the text.
    pub links: Vec<Link>,
    /// Everything that was skipped or repaired while building and laying out
    /// this block.
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for TextBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBlock {
    /// Returns an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spans: Vec::new(),
            size: Size::new(0., 0.),
            direction: TextDirection::LeftToRight,
            links: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn reset(&mut self, direction: TextDirection) {
        self.spans.clear();
        self.links.clear();
        self.diagnostics.clear();
        self.size = Size::new(0., 0.);
        self.direction = direction;
    }

    /// Replaces the contents with a single span of `text` and positions it
    /// in `style`'s direction.
    pub fn set_string(&mut self, text: &str, font: &FontStyle, style: &TextStyle, fonts: &FontService) {
        self.set_string_transformed(text, font, style, fonts, 0., 0.);
    }

    /// Replaces the contents with a single span of `text` where every rune
    /// is rotated by `rotation` radians and horizontally scaled by `scale_x`
    /// (0 for unscaled).
    pub fn set_string_transformed(
        &mut self,
        text: &str,
        font: &FontStyle,
        style: &TextStyle,
        fonts: &FontService,
        rotation: f32,
        scale_x: f32,
    ) {
        self.set_single_span(text, font, style, fonts, style.direction, rotation, scale_x);
    }

    /// Replaces the contents with a single span of `text` with every rune
    /// rotated a quarter turn and stacked top to bottom.
    pub fn set_string_rot90(
        &mut self,
        text: &str,
        font: &FontStyle,
        style: &TextStyle,
        fonts: &FontService,
    ) {
        self.set_single_span(
            text,
            font,
            style,
            fonts,
            TextDirection::TopToBottomRotated,
            FRAC_PI_2,
            0.,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn set_single_span(
        &mut self,
        text: &str,
        font: &FontStyle,
        style: &TextStyle,
        fonts: &FontService,
        direction: TextDirection,
        rotation: f32,
        scale_x: f32,
    ) {
        self.reset(direction);
        let mut span = Span::new(direction);
        let metrics = {
            let mut session = fonts.session();
            span.set_string(text, font, &mut session, &mut self.diagnostics);
            session.open(font).map(|face| face.metrics())
        };
        span.set_transform(rotation, scale_x);
        let height = metrics.map_or(0., |metrics| metrics.height);
        let spacing = Spacing::new(style, metrics.map_or(0., |metrics| metrics.ch));
        if let Err(error) = span.set_rune_positions(fonts, direction, &spacing) {
            if error != SpanError::Empty {
                Diagnostic::InvalidSpan { span: 0, error }.record(&mut self.diagnostics);
            }
        }
        let extent = span.size_hv();
        self.size = match direction {
            TextDirection::LeftToRight => Size::new(extent.width, height),
            TextDirection::TopToBottom | TextDirection::TopToBottomRotated => {
                Size::new(height, extent.height)
            }
        };
        self.spans.push(span);
    }

    /// Inserts `span` at `index`, or at the end if `index` is past the end.
    pub fn insert_span(&mut self, index: usize, span: Span) {
        let index = index.min(self.spans.len());
        self.spans.insert(index, span);
    }

    /// Returns the total number of runes in all spans.
    #[must_use]
    pub fn rune_count(&self) -> usize {
        self.spans.iter().map(Span::len).sum()
    }

    /// Returns the span and rune index of the `index`th rune of the block.
    #[must_use]
    pub fn rune_span_pos(&self, index: usize) -> Option<SpanPos> {
        let mut remaining = index;
        for (span_index, span) in self.spans.iter().enumerate() {
            if remaining < span.len() {
                return Some(SpanPos::new(span_index, remaining));
            }
            remaining -= span.len();
        }
        None
    }

    /// Returns the block-wide rune index of a span position.
    #[must_use]
    pub fn span_pos_to_rune_index(&self, pos: SpanPos) -> Option<usize> {
        let span = self.spans.get(pos.span)?;
        if pos.rune >= span.len() {
            return None;
        }
        let before: usize = self.spans[..pos.span].iter().map(Span::len).sum();
        Some(before + pos.rune)
    }

    /// Returns the pen position of the `index`th rune. An index equal to the
    /// rune count returns the end of the last span.
    #[must_use]
    pub fn rune_rel_pos(&self, index: usize) -> Option<Point<f32>> {
        match self.rune_span_pos(index) {
            Some(pos) => Some(self.spans[pos.span].rune_rel_pos(pos.rune)),
            None if index == self.rune_count() => {
                self.spans.last().map(|span| span.rune_rel_pos(span.len()))
            }
            None => None,
        }
    }

    /// Returns where the `index`th rune ends. An index equal to the rune
    /// count returns the end of the last span.
    #[must_use]
    pub fn rune_end_pos(&self, index: usize) -> Option<Point<f32>> {
        match self.rune_span_pos(index) {
            Some(pos) => Some(self.spans[pos.span].rune_end_pos(pos.rune)),
            None if index == self.rune_count() => {
                self.spans.last().map(|span| span.rune_end_pos(span.len()))
            }
            None => None,
        }
    }

    /// Returns the link under `point` when the block is drawn at `origin`.
    #[must_use]
    pub fn link_at(&self, origin: Point<f32>, point: Point<f32>) -> Option<&Link> {
        self.links
            .iter()
            .find(|link| link.contains(self, origin, point))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fonts::testing::{mock_service, mock_style, MockFace, SNOWMAN};
    use crate::styles::Decorations;

    fn span_of(text: &str, fonts: &FontService) -> Span {
        let mut span = Span::default();
        let mut diagnostics = Vec::new();
        span.set_string(text, &mock_style(), &mut fonts.session(), &mut diagnostics);
        assert!(diagnostics.is_empty());
        span
    }

    #[test]
    fn records_only_set_changes() {
        let fonts = mock_service();
        let span = span_of("abc", &fonts);
        assert_eq!(span.validate(), Ok(()));
        assert!(span.records[0].font.is_set());
        assert!(span.records[0].color.is_set());
        assert!(!span.records[1].font.is_set());
        assert!(!span.records[2].color.is_set());
        assert_eq!(span.resolved().count(), 3);
    }

    #[test]
    fn missing_glyphs_use_fallback_face() {
        let fonts = mock_service();
        let mut span = Span::default();
        let mut diagnostics = Vec::new();
        let text = format!("a{SNOWMAN}b");
        span.set_string(&text, &mock_style(), &mut fonts.session(), &mut diagnostics);
        assert!(diagnostics.is_empty());
        let faces: Vec<FaceRef> = span.resolved().map(|rune| rune.face.clone()).collect();
        assert_ne!(faces[0], faces[1]);
        assert_eq!(faces[0], faces[2]);
        assert!(faces[1].has_glyph(SNOWMAN));
        assert!(span.records[2].font.is_set());
    }

    #[test]
    fn unresolved_fonts_are_diagnosed() {
        let fonts = mock_service();
        let mut span = Span::default();
        let mut diagnostics = Vec::new();
        span.set_string(
            "abc",
            &mock_style().with_family("none"),
            &mut fonts.session(),
            &mut diagnostics,
        );
        assert!(span.is_empty());
        assert_eq!(span.validate(), Err(SpanError::Empty));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::UnresolvedFont(String::from("none"))]
        );
    }

    #[test]
    fn validate_reports_malformed_spans() {
        let face = FaceRef::new(MockFace::new(10.));
        let mut span = Span::default();
        span.append_rune('a', RuneRecord::new(Inherit::Inherit, Inherit::Set(Color::BLACK)));
        assert_eq!(span.validate(), Err(SpanError::UnresolvedFont));
        span.records[0].font = Inherit::Set(face);
        span.records[0].color = Inherit::Inherit;
        assert_eq!(span.validate(), Err(SpanError::UnresolvedColor));
        span.text.push('b');
        assert_eq!(
            span.validate(),
            Err(SpanError::LengthMismatch {
                text: 2,
                records: 1
            })
        );
    }

    #[test]
    fn split_round_trips_text_and_backfills_style() {
        let fonts = mock_service();
        let original = "hello wide world";
        for index in 1..original.len() {
            let mut head = span_of(original, &fonts);
            let tail = head.split_off(index).unwrap();
            assert_eq!(format!("{}{}", head.to_text(), tail.to_text()), original);
            assert_eq!(tail.validate(), Ok(()));
            assert_eq!(head.validate(), Ok(()));
        }
        let mut span = span_of(original, &fonts);
        assert!(span.split_off(0).is_none());
        assert!(span.split_off(original.len()).is_none());
    }

    #[test]
    fn split_moves_head_end() {
        let fonts = mock_service();
        let mut span = span_of("abcd", &fonts);
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &Spacing::default())
            .unwrap();
        let tail = span.split_off(2).unwrap();
        let width = MockFace::width(10.);
        assert_relative_eq!(span.last_pos.x, width * 2.);
        assert_relative_eq!(span.size_hv().width, width * 2.);
        assert_eq!(tail.to_text(), "cd");
    }

    #[test]
    fn trimming_keeps_the_span_valid() {
        let fonts = mock_service();
        let mut span = span_of("  hi  ", &fonts);
        span.set_new_paragraph();
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &Spacing::default())
            .unwrap();
        assert_eq!(span.trim_space(), 2);
        assert_eq!(span.to_text(), "hi");
        assert_eq!(span.validate(), Ok(()));
        assert!(span.is_new_paragraph());
        assert_relative_eq!(span.records[0].rel_pos.x, 0.);
        assert_relative_eq!(span.last_pos.x, MockFace::width(10.) * 2.);
    }

    #[test]
    fn decoration_mask_tracks_runes() {
        let fonts = mock_service();
        let mut span = Span::default();
        let mut diagnostics = Vec::new();
        let mut session = fonts.session();
        span.append_str("a", &mock_style(), &mut session, &mut diagnostics);
        span.append_str(
            "b",
            &mock_style()
                .with_decorations(Decorations::UNDERLINE)
                .with_background(Some(Color::YELLOW)),
            &mut session,
            &mut diagnostics,
        );
        assert!(span.decorations.contains(Decorations::UNDERLINE));
        assert!(span.decorations.contains(Decorations::BACKGROUND));
        assert_eq!(span.records[0].background, None);
    }

    #[test]
    fn rune_indexes_cross_spans() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.spans.push(span_of("ab", &fonts));
        block.spans.push(span_of("cde", &fonts));
        assert_eq!(block.rune_span_pos(3), Some(SpanPos::new(1, 1)));
        assert_eq!(block.rune_span_pos(5), None);
        assert_eq!(block.span_pos_to_rune_index(SpanPos::new(1, 2)), Some(4));
        assert_eq!(block.span_pos_to_rune_index(SpanPos::new(1, 3)), None);
        assert!(block.rune_rel_pos(5).is_some());
        assert!(block.rune_rel_pos(6).is_none());

        block.insert_span(99, span_of("f", &fonts));
        block.insert_span(0, span_of("z", &fonts));
        let texts: Vec<String> = block.spans.iter().map(Span::to_text).collect();
        assert_eq!(texts, ["z", "ab", "cde", "f"]);
    }

    #[test]
    fn set_string_sizes_the_block() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string("abc", &mock_style(), &TextStyle::default(), &fonts);
        assert_relative_eq!(block.size.width, MockFace::width(10.) * 3.);
        assert_relative_eq!(block.size.height, 10.);

        block.set_string_rot90("abc", &mock_style(), &TextStyle::default(), &fonts);
        assert_eq!(block.direction, TextDirection::TopToBottomRotated);
        assert_relative_eq!(block.size.width, 10.);
        assert_relative_eq!(block.size.height, MockFace::width(10.) * 3.);
        assert_relative_eq!(block.spans[0].records[1].rotation, FRAC_PI_2);
    }
}
