use super::Span;

/// Where a span should be broken to fit a width.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WrapPoint {
    /// The span's visible text already fits.
    Fits,
    /// Break before this rune index. Always between 1 and `len - 1`.
    At(usize),
    /// The span has no whitespace to break at and must overflow.
    Unbreakable,
}

impl Span {
    /// Returns where the rightmost visible rune ends, including the span's
    /// horizontal offset. Trailing whitespace is ignored.
    #[must_use]
    pub fn ink_width(&self) -> f32 {
        self.text
            .iter()
            .rposition(|ch| !ch.is_whitespace())
            .map_or(self.rel_pos.x, |index| self.end_of(index))
    }

    fn end_of(&self, index: usize) -> f32 {
        self.records.get(index).map_or(self.rel_pos.x, |record| {
            self.rel_pos.x + record.rel_pos.x + record.size.width
        })
    }

    /// Finds where to break this left-to-right span so that the head fits
    /// within `target`, given the span's current width `current`.
    ///
    /// Breaks happen after whitespace, never inside a word. When the first
    /// word alone is wider than `target`, the break comes after it and the
    /// head overflows.
    #[must_use]
    pub fn find_wrap_position(&self, target: f32, current: f32) -> WrapPoint {
        let len = self.text.len();
        if len == 0 || self.records.len() != len || self.ink_width() <= target {
            return WrapPoint::Fits;
        }

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let estimate = if current > 0. {
            ((len as f32) * (target / current)).max(0.) as usize
        } else {
            len
        };
        let mut index = estimate.min(len - 1);
        if self.end_of(index) > target {
            while index > 0 && self.end_of(index) > target {
                index -= 1;
            }
        } else {
            while index + 1 < len && self.end_of(index + 1) <= target {
                index += 1;
            }
        }

        if self.text[index].is_whitespace() {
            return self.after_whitespace(index);
        }
        // A word ending exactly at the limit stays on this line.
        if self.text.get(index + 1).is_some_and(|ch| ch.is_whitespace()) {
            return self.after_whitespace(index + 1);
        }

        while index > 0 && !self.text[index - 1].is_whitespace() {
            index -= 1;
        }
        if index > 0 {
            return WrapPoint::At(index);
        }

        match self.text.iter().position(|ch| ch.is_whitespace()) {
            Some(space) => self.after_whitespace(space),
            None => WrapPoint::Unbreakable,
        }
    }

    fn after_whitespace(&self, start: usize) -> WrapPoint {
        let end = self.text[start..]
            .iter()
            .position(|ch| !ch.is_whitespace())
            .map_or(self.text.len(), |offset| start + offset);
        if end > 0 && end < self.text.len() {
            WrapPoint::At(end)
        } else {
            WrapPoint::Unbreakable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::testing::{mock_service, mock_style, MockFace};
    use crate::fonts::FontService;
    use crate::styles::TextDirection;
    use crate::text::Spacing;

    fn positioned(text: &str, fonts: &FontService) -> Span {
        let mut span = Span::default();
        span.set_string(text, &mock_style(), &mut fonts.session(), &mut Vec::new());
        span.set_rune_positions(fonts, TextDirection::LeftToRight, &Spacing::default())
            .unwrap();
        span
    }

    fn width(runes: f32) -> f32 {
        MockFace::width(10.) * runes
    }

    #[test]
    fn ink_width_tolerates_missing_records() {
        let fonts = mock_service();
        let mut span = positioned("ab", &fonts);
        span.text.push('c');
        assert_eq!(span.ink_width(), span.rel_pos.x);
        assert_eq!(span.find_wrap_position(1., 0.), WrapPoint::Fits);
    }

    #[test]
    fn breaks_after_whitespace() {
        let fonts = mock_service();
        let span = positioned("hello world again", &fonts);
        let current = span.size_hv().width;
        assert_eq!(
            span.find_wrap_position(width(13.5), current),
            WrapPoint::At(12)
        );
        assert_eq!(
            span.find_wrap_position(width(5.5), current),
            WrapPoint::At(6)
        );
        assert_eq!(
            span.find_wrap_position(width(6.), current),
            WrapPoint::At(6)
        );
    }

    #[test]
    fn overlong_first_word_overflows() {
        let fonts = mock_service();
        let span = positioned("extraordinary  word", &fonts);
        assert_eq!(
            span.find_wrap_position(width(3.), span.size_hv().width),
            WrapPoint::At(15)
        );
    }

    #[test]
    fn no_whitespace_is_unbreakable() {
        let fonts = mock_service();
        let span = positioned("unbreakable", &fonts);
        assert_eq!(
            span.find_wrap_position(width(3.), span.size_hv().width),
            WrapPoint::Unbreakable
        );
        let trailing = positioned("word   ", &fonts);
        assert_eq!(
            trailing.find_wrap_position(width(3.), trailing.size_hv().width),
            WrapPoint::Unbreakable
        );
    }

    #[test]
    fn trailing_whitespace_does_not_force_a_wrap() {
        let fonts = mock_service();
        let span = positioned("fits   ", &fonts);
        assert_eq!(
            span.find_wrap_position(width(4.), span.size_hv().width),
            WrapPoint::Fits
        );
    }

    #[test]
    fn wrapped_heads_fit() {
        let fonts = mock_service();
        let text = "the quick brown fox jumps over the lazy dog";
        for target in 4..40 {
            let target = width(target as f32 + 0.5);
            let mut span = positioned(text, &fonts);
            let current = span.size_hv().width;
            let WrapPoint::At(index) = span.find_wrap_position(target, current) else {
                continue;
            };
            let _tail = span.split_off(index).unwrap();
            let current = span.size_hv().width;
            assert!(matches!(
                span.find_wrap_position(target, current),
                WrapPoint::Fits | WrapPoint::Unbreakable
            ));
            // Deterministic for identical inputs.
            assert_eq!(
                span.find_wrap_position(target, current),
                span.find_wrap_position(target, current)
            );
        }
    }
}
