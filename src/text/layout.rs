use figures::Size;
use intentional::Cast;

use super::{Span, SpanError, SpanPos, TextBlock, WrapPoint};
use crate::diagnostics::Diagnostic;
use crate::fonts::{FontMetrics, FontService};
use crate::styles::{Align, FontStyle, TextDirection, TextStyle};
use crate::text::Spacing;

/// Line metrics shared by every span in one layout pass.
struct Lines {
    metrics: FontMetrics,
    spacing: f32,
    pad: f32,
}

impl Lines {
    fn new(metrics: FontMetrics, style: &TextStyle) -> Self {
        let multiplier = if style.line_height > 0. {
            style.line_height
        } else {
            1.
        };
        let spacing = metrics.height * multiplier;
        Self {
            metrics,
            spacing,
            pad: (spacing - metrics.height) / 2.,
        }
    }
}

fn leading_space(align: Align, extra: f32) -> f32 {
    if extra <= 0. {
        return 0.;
    }
    match align {
        Align::Start => 0.,
        Align::Center => extra / 2.,
        Align::End => extra,
    }
}

impl TextBlock {
    /// Positions every span within `size`, wrapping lines when `style` allows
    /// it, and returns the size the block occupies.
    ///
    /// The returned size is at least `size`: a width of 0 disables wrapping,
    /// and lines that cannot be broken grow the width. Spans that were
    /// already positioned keep their rune positions. Invalid spans keep
    /// their line but are otherwise skipped and recorded in
    /// [`diagnostics`](Self::diagnostics).
    pub fn layout(
        &mut self,
        style: &TextStyle,
        font: &FontStyle,
        fonts: &FontService,
        size: Size<f32>,
    ) -> Size<f32> {
        if self.spans.is_empty() {
            self.size = Size::new(0., 0.);
            return self.size;
        }
        let metrics = fonts.session().open(font).map(|face| face.metrics());
        let metrics = metrics.unwrap_or_else(|| {
            Diagnostic::UnresolvedFont(font.family.clone()).record(&mut self.diagnostics);
            FontMetrics::default()
        });
        let lines = Lines::new(metrics, style);
        let spacing = Spacing::new(style, metrics.ch);
        self.direction = style.direction;
        let size = match style.direction {
            TextDirection::LeftToRight => {
                self.layout_horizontal(style, fonts, &lines, &spacing, size)
            }
            TextDirection::TopToBottom | TextDirection::TopToBottomRotated => {
                self.layout_vertical(style, fonts, &lines, &spacing, size)
            }
        };
        tracing::trace!(
            spans = self.spans.len(),
            width = size.width,
            height = size.height,
            "laid out text"
        );
        size
    }

    /// Positions the span at `index` in `direction` unless it already is.
    /// Returns false if the span is invalid.
    fn prepare_span(
        &mut self,
        index: usize,
        fonts: &FontService,
        direction: TextDirection,
        spacing: &Spacing,
    ) -> bool {
        let span = &mut self.spans[index];
        let result = if span.is_positioned() && span.direction == direction {
            span.validate()
        } else {
            span.set_rune_positions(fonts, direction, spacing)
        };
        match result {
            Ok(()) => true,
            // Empty spans are blank lines.
            Err(SpanError::Empty) => false,
            Err(error) => {
                Diagnostic::InvalidSpan { span: index, error }.record(&mut self.diagnostics);
                false
            }
        }
    }

    fn layout_horizontal(
        &mut self,
        style: &TextStyle,
        fonts: &FontService,
        lines: &Lines,
        spacing: &Spacing,
        size: Size<f32>,
    ) -> Size<f32> {
        let wrap = style.has_word_wrap() && size.width > 0.;
        let mut max_width = 0_f32;
        let mut index = 0;
        while index < self.spans.len() {
            if !self.prepare_span(index, fonts, TextDirection::LeftToRight, spacing) {
                self.spans[index].rel_pos.x = 0.;
                index += 1;
                continue;
            }
            let span = &mut self.spans[index];
            span.rel_pos.x = if span.is_new_paragraph() {
                style.indent
            } else {
                0.
            };

            while wrap {
                let span = &mut self.spans[index];
                let current = span.rel_pos.x + span.size_hv().width;
                let WrapPoint::At(at) = span.find_wrap_position(size.width, current) else {
                    break;
                };
                let Some(mut tail) = span.split_off(at) else {
                    break;
                };
                max_width = max_width.max(span.ink_width());
                tail.rel_pos.x = 0.;
                if let Err(error) =
                    tail.set_rune_positions(fonts, TextDirection::LeftToRight, spacing)
                {
                    Diagnostic::InvalidSpan {
                        span: index + 1,
                        error,
                    }
                    .record(&mut self.diagnostics);
                }
                self.spans.insert(index + 1, tail);
                self.shift_links(index, at);
                index += 1;
            }
            max_width = max_width.max(self.spans[index].ink_width());
            index += 1;
        }
        self.clamp_links();

        let width = size.width.max(max_width);
        let paragraphs = self.paragraph_count();
        let content_height = lines.spacing * self.spans.len().cast::<f32>()
            + paragraphs.cast::<f32>() * style.paragraph_spacing;
        let height = size.height.max(content_height);
        self.size = Size::new(max_width, content_height);

        let baseline = lines.spacing - lines.pad - lines.metrics.descent;
        let mut y = leading_space(style.align_v, height - content_height) + baseline;
        for (index, span) in self.spans.iter_mut().enumerate() {
            if index > 0 && span.is_new_paragraph() {
                y += style.paragraph_spacing;
            }
            span.rel_pos.y = y;
            if span.validate().is_ok() {
                span.rel_pos.x += leading_space(style.align, width - span.ink_width());
            }
            y += lines.spacing;
        }
        Size::new(width, height)
    }

    /// Lays spans out as columns from left to right. Vertical text never
    /// wraps.
    fn layout_vertical(
        &mut self,
        style: &TextStyle,
        fonts: &FontService,
        lines: &Lines,
        spacing: &Spacing,
        size: Size<f32>,
    ) -> Size<f32> {
        let direction = style.direction;
        let mut max_height = 0_f32;
        for index in 0..self.spans.len() {
            let valid = self.prepare_span(index, fonts, direction, spacing);
            let span = &mut self.spans[index];
            span.rel_pos.y = if valid && span.is_new_paragraph() {
                style.indent
            } else {
                0.
            };
            max_height = max_height.max(span.rel_pos.y + span.size_hv().height);
        }
        self.clamp_links();

        let paragraphs = self.paragraph_count();
        let content_width = lines.spacing * self.spans.len().cast::<f32>()
            + paragraphs.cast::<f32>() * style.paragraph_spacing;
        let width = size.width.max(content_width);
        let height = size.height.max(max_height);
        self.size = Size::new(content_width, max_height);

        // The pen sits on the left edge of upright glyphs and on the baseline
        // of rotated ones, whose ascent points right.
        let (pen_x, pen_y) = match direction {
            TextDirection::TopToBottomRotated => (lines.pad + lines.metrics.descent, 0.),
            TextDirection::LeftToRight | TextDirection::TopToBottom => {
                (lines.pad, lines.metrics.ascent)
            }
        };
        let mut x = leading_space(style.align, width - content_width);
        for (index, span) in self.spans.iter_mut().enumerate() {
            if index > 0 && span.is_new_paragraph() {
                x += style.paragraph_spacing;
            }
            let extent = span.rel_pos.y + span.size_hv().height;
            span.rel_pos.x = x + pen_x;
            span.rel_pos.y += pen_y + leading_space(style.align_v, height - extent);
            x += lines.spacing;
        }
        Size::new(width, height)
    }

    fn paragraph_count(&self) -> usize {
        self.spans
            .iter()
            .skip(1)
            .filter(|span| span.is_new_paragraph())
            .count()
    }

    /// Moves link boundaries after the span at `split` was split before rune
    /// `at`.
    fn shift_links(&mut self, split: usize, at: usize) {
        fn shift(position: &mut SpanPos, split: usize, at: usize, exclusive: bool) {
            if position.span == split {
                let moves = if exclusive {
                    position.rune > at
                } else {
                    position.rune >= at
                };
                if moves {
                    position.span += 1;
                    position.rune -= at;
                }
            } else if position.span > split {
                position.span += 1;
            }
        }

        for link in &mut self.links {
            shift(&mut link.start, split, at, false);
            shift(&mut link.end, split, at, true);
        }
    }

    /// Keeps every link within the spans that exist.
    fn clamp_links(&mut self) {
        let last_span = self.spans.len().saturating_sub(1);
        for (index, link) in self.links.iter_mut().enumerate() {
            let original = (link.start, link.end);
            link.start.span = link.start.span.min(last_span);
            link.end.span = link.end.span.min(last_span);
            let start_len = self.spans.get(link.start.span).map_or(0, Span::len);
            let end_len = self.spans.get(link.end.span).map_or(0, Span::len);
            link.start.rune = link.start.rune.min(start_len);
            link.end.rune = link.end.rune.min(end_len);
            if link.start > link.end {
                link.start = link.end;
            }
            if (link.start, link.end) != original {
                Diagnostic::ClampedLink(index).record(&mut self.diagnostics);
            }
        }
    }
}
