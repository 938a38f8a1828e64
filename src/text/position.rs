use std::f32::consts::FRAC_PI_2;

use figures::{Point, Size};
use intentional::Cast;

use super::{Span, SpanError};
use crate::fonts::{FaceRef, FontService};
use crate::styles::{Decorations, TextDirection, TextStyle};

const SUPERSCRIPT_SHIFT: f32 = -0.45;
const SUBSCRIPT_SHIFT: f32 = 0.15;
/// How far past a column boundary the pen may drift and still count as on
/// it.
const TAB_TOLERANCE: f32 = 1e-3;

/// Extra spacing applied while positioning runes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spacing {
    /// Added after every rune except the last.
    pub letter: f32,
    /// Added after every whitespace rune except the last.
    pub word: f32,
    /// The column width tab stops are measured in. 0 uses each face's own
    /// `ch` width.
    pub ch: f32,
    /// The number of columns between tab stops. 0 uses 4.
    pub tab_size: usize,
}

impl Spacing {
    /// Returns the spacing described by `style`, with tab columns `ch`
    /// pixels wide.
    #[must_use]
    pub fn new(style: &TextStyle, ch: f32) -> Self {
        Self {
            letter: style.letter_spacing,
            word: style.word_spacing,
            ch,
            tab_size: style.effective_tab_size(),
        }
    }

    fn tab_size(&self) -> usize {
        if self.tab_size == 0 {
            4
        } else {
            self.tab_size
        }
    }
}

impl Span {
    /// Assigns a position and box size to every rune, laid out in
    /// `direction`.
    ///
    /// Holds a session on `fonts` for the whole span. Malformed spans are
    /// left untouched and the reason is returned.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_rune_positions(
        &mut self,
        fonts: &FontService,
        direction: TextDirection,
        spacing: &Spacing,
    ) -> Result<(), SpanError> {
        self.validate()?;
        let _session = fonts.session();
        self.direction = direction;

        let tab_size = spacing.tab_size();
        let count = self.text.len();
        let mut pen = 0.;
        let mut column = 0_usize;
        let mut previous: Option<(char, FaceRef)> = None;
        let mut face: Option<FaceRef> = None;
        for (index, (&ch, record)) in self.text.iter().zip(&mut self.records).enumerate() {
            if let Some(set) = record.font.as_set() {
                face = Some(set.clone());
            }
            let Some(face) = &face else {
                continue;
            };
            let metrics = face.metrics();
            let height = metrics.height;

            if direction != TextDirection::TopToBottom {
                if let Some((previous_ch, previous_face)) = &previous {
                    if previous_face == face {
                        pen += face.kern(*previous_ch, ch);
                    }
                }
            }

            let mut advance = face.advance(ch);
            if advance.abs() < f32::EPSILON {
                advance = 0.1 * height;
            }

            let shift = if record.decorations.contains(Decorations::SUPERSCRIPT) {
                SUPERSCRIPT_SHIFT * metrics.ascent
            } else if record.decorations.contains(Decorations::SUBSCRIPT) {
                SUBSCRIPT_SHIFT * metrics.ascent
            } else {
                0.
            };

            match direction {
                TextDirection::LeftToRight => {
                    record.rel_pos = Point::new(pen, shift);
                    record.size = Size::new(advance, height);
                }
                TextDirection::TopToBottom => {
                    record.rel_pos = Point::new(shift, pen);
                    record.size = Size::new(advance, height);
                }
                TextDirection::TopToBottomRotated => {
                    record.rotation = FRAC_PI_2;
                    record.rel_pos = Point::new(shift, pen);
                    record.size = Size::new(height, advance);
                }
            }

            if ch == '\t' {
                let ch_width = if spacing.ch > 0. {
                    spacing.ch
                } else {
                    metrics.ch.max(advance)
                };
                column = match direction {
                    TextDirection::LeftToRight => {
                        (pen / ch_width - TAB_TOLERANCE).ceil().max(0.) as usize
                    }
                    TextDirection::TopToBottom | TextDirection::TopToBottomRotated => column,
                };
                column = (column / tab_size + 1) * tab_size;
                let stop = ch_width * column.cast::<f32>();
                let gap = (stop - pen).max(0.);
                if direction == TextDirection::LeftToRight {
                    record.size.width = gap;
                } else {
                    record.size.height = gap;
                }
                pen = pen.max(stop);
            } else {
                pen += if direction == TextDirection::TopToBottom {
                    height
                } else {
                    advance
                };
                column += 1;
                if index + 1 < count {
                    pen += spacing.letter;
                    if ch.is_whitespace() {
                        pen += spacing.word;
                    }
                }
            }
            previous = Some((ch, face.clone()));
        }

        self.last_pos = match direction {
            TextDirection::LeftToRight => Point::new(pen, 0.),
            TextDirection::TopToBottom | TextDirection::TopToBottomRotated => Point::new(0., pen),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fonts::testing::{mock_service, mock_style, MockFace};
    use crate::styles::FontStyle;

    fn span(text: &str, style: &FontStyle, fonts: &FontService) -> Span {
        let mut span = Span::default();
        span.set_string(text, style, &mut fonts.session(), &mut Vec::new());
        span
    }

    fn xs(span: &Span) -> Vec<f32> {
        span.records.iter().map(|record| record.rel_pos.x).collect()
    }

    #[test]
    fn tab_advances_to_next_stop() {
        let fonts = mock_service();
        let mut span = span("a\tb", &mock_style(), &fonts);
        let width = MockFace::width(10.);
        let spacing = Spacing {
            ch: width,
            tab_size: 4,
            ..Spacing::default()
        };
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &spacing)
            .unwrap();
        assert_relative_eq!(span.records[2].rel_pos.x, 4. * width);
        // The tab's box covers the gap it skipped.
        assert_relative_eq!(span.records[1].size.width, 3. * width);
        assert_relative_eq!(span.last_pos.x, 5. * width);
    }

    #[test]
    fn tab_stops_hold_at_every_size() {
        let fonts = mock_service();
        for size in 5_u8..=40 {
            let size = f32::from(size);
            let mut span = span("abc\td", &mock_style().with_size(size), &fonts);
            let width = MockFace::width(size);
            let spacing = Spacing {
                ch: width,
                tab_size: 4,
                ..Spacing::default()
            };
            span.set_rune_positions(&fonts, TextDirection::LeftToRight, &spacing)
                .unwrap();
            assert_relative_eq!(span.records[4].rel_pos.x, 4. * width, epsilon = 1e-3);
        }
    }

    #[test]
    fn positions_never_regress() {
        let fonts = mock_service();
        let mut span = span("AV a\u{301} b, to", &mock_style(), &fonts);
        let spacing = Spacing {
            letter: 1.,
            word: 3.,
            ..Spacing::default()
        };
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &spacing)
            .unwrap();
        let xs = xs(&span);
        assert_eq!(xs.len(), span.len());
        assert!(xs.windows(2).all(|pair| pair[1] >= pair[0]), "{xs:?}");
        // Kerning pulls V toward A.
        assert_relative_eq!(xs[1], MockFace::width(10.) - 1. + 1.);
        // Zero-width marks still get a box.
        assert_relative_eq!(span.records[4].size.width, 1.);
    }

    #[test]
    fn spacing_skips_the_last_rune() {
        let fonts = mock_service();
        let mut span = span("a b", &mock_style(), &fonts);
        let spacing = Spacing {
            letter: 2.,
            word: 5.,
            ..Spacing::default()
        };
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &spacing)
            .unwrap();
        let width = MockFace::width(10.);
        let expected = [0., width + 2., 2. * width + 4. + 5.];
        for (actual, expected) in xs(&span).into_iter().zip(expected) {
            assert_relative_eq!(actual, expected);
        }
        assert_relative_eq!(span.last_pos.x, 3. * width + 9.);
    }

    #[test]
    fn baseline_shifts() {
        let fonts = mock_service();
        let mut span = Span::default();
        let mut session = fonts.session();
        let mut diagnostics = Vec::new();
        span.append_str("x", &mock_style(), &mut session, &mut diagnostics);
        span.append_str(
            "2",
            &mock_style().with_decorations(Decorations::SUPERSCRIPT),
            &mut session,
            &mut diagnostics,
        );
        span.append_str(
            "i",
            &mock_style().with_decorations(Decorations::SUBSCRIPT),
            &mut session,
            &mut diagnostics,
        );
        drop(session);
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &Spacing::default())
            .unwrap();
        assert_relative_eq!(span.records[0].rel_pos.y, 0.);
        assert_relative_eq!(span.records[1].rel_pos.y, -0.45 * 8.);
        assert_relative_eq!(span.records[2].rel_pos.y, 0.15 * 8.);
    }

    #[test]
    fn vertical_directions() {
        let fonts = mock_service();
        let mut upright = span("ab", &mock_style(), &fonts);
        upright
            .set_rune_positions(&fonts, TextDirection::TopToBottom, &Spacing::default())
            .unwrap();
        assert_relative_eq!(upright.records[1].rel_pos.y, 10.);
        assert_relative_eq!(upright.size_hv().height, 20.);

        let mut rotated = span("ab", &mock_style(), &fonts);
        rotated
            .set_rune_positions(
                &fonts,
                TextDirection::TopToBottomRotated,
                &Spacing::default(),
            )
            .unwrap();
        let width = MockFace::width(10.);
        assert_relative_eq!(rotated.records[1].rel_pos.y, width);
        assert_relative_eq!(rotated.records[1].size.width, 10.);
        assert_relative_eq!(rotated.records[0].rotation, FRAC_PI_2);
    }

    #[test]
    fn malformed_spans_are_untouched() {
        let fonts = mock_service();
        let mut span = Span::default();
        assert_eq!(
            span.set_rune_positions(&fonts, TextDirection::LeftToRight, &Spacing::default()),
            Err(SpanError::Empty)
        );
        assert!(!span.is_positioned());
    }
}
