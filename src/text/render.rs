use figures::{Point, Rect, Size};
use kurbo::Affine;

use super::{ResolvedRune, Span, SpanError, TextBlock};
use crate::diagnostics::Diagnostic;
use crate::fonts::{FontMetrics, FontService, FontSession};
use crate::styles::{Color, Decorations};
use crate::surface::{from_kurbo, to_kurbo, LineDash, Quad, Surface};

const UNDERLINE_WIDTH: f32 = 0.05;
const OVERLINE_ASCENT: f32 = 1.1;
const LINE_THROUGH_ASCENT: f32 = 0.25;

/// Counts of the work done by one render pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Glyph masks drawn.
    pub glyphs: usize,
    /// How many of [`glyphs`](Self::glyphs) were rotated or scaled.
    pub transformed_glyphs: usize,
    /// Printable runes skipped because they were outside the clip.
    pub culled: usize,
    /// Calls to [`Surface::fill_quads`].
    pub fill_calls: usize,
    /// Calls to [`Surface::stroke_polyline`].
    pub stroke_calls: usize,
    /// Spans and glyphs that could not be drawn.
    pub diagnostics: Vec<Diagnostic>,
}

/// A rune mapped to surface coordinates.
struct Placed<'a> {
    rune: ResolvedRune<'a>,
    pen: Point<f32>,
    /// Rotation and horizontal scale, without translation.
    linear: Affine,
    size: Size<f32>,
    metrics: FontMetrics,
    culled: bool,
}

impl Placed<'_> {
    fn point(&self, x: f32, y: f32) -> Point<f32> {
        let offset = from_kurbo(self.linear * to_kurbo(Point::new(x, y)));
        Point::new(self.pen.x + offset.x, self.pen.y + offset.y)
    }

    /// The rune's box: from the descent below the baseline up by the box
    /// height.
    fn box_quad(&self) -> Quad {
        let bottom = self.metrics.descent;
        let top = bottom - self.size.height;
        Quad([
            self.point(0., bottom),
            self.point(0., top),
            self.point(self.size.width, top),
            self.point(self.size.width, bottom),
        ])
    }

    fn line_width(&self) -> f32 {
        UNDERLINE_WIDTH * self.size.height
    }

    fn is_untransformed(&self) -> bool {
        let record = self.rune.record;
        record.rotation.abs() < f32::EPSILON
            && (record.effective_scale_x() - 1.).abs() < f32::EPSILON
    }
}

fn is_printable(ch: char) -> bool {
    !ch.is_control() && (ch == ' ' || !ch.is_whitespace())
}

#[allow(clippy::cast_precision_loss)]
fn is_outside(quad: &Quad, clip: Rect<i32>) -> bool {
    let (min, max) = quad.bounds();
    let left = clip.origin.x as f32;
    let top = clip.origin.y as f32;
    let right = (clip.origin.x + clip.size.width) as f32;
    let bottom = (clip.origin.y + clip.size.height) as f32;
    max.x <= left || min.x >= right || max.y <= top || min.y >= bottom
}

struct LineRun {
    points: Vec<Point<f32>>,
    width: f32,
    color: Color,
    dash: LineDash,
}

impl TextBlock {
    /// Draws every span onto `surface` with the block's top-left corner at
    /// `origin`.
    ///
    /// Each span is drawn in layers: backgrounds, underlines, overlines,
    /// glyphs and finally line-throughs. Adjacent runes sharing a decoration
    /// and color are drawn with a single call. Runes outside the surface's
    /// clip are skipped.
    pub fn render<S: Surface + ?Sized>(
        &self,
        fonts: &FontService,
        surface: &mut S,
        origin: Point<f32>,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        for (index, span) in self.spans.iter().enumerate() {
            match span.validate() {
                Ok(()) => {}
                Err(SpanError::Empty) => continue,
                Err(error) => {
                    Diagnostic::InvalidSpan { span: index, error }.record(&mut stats.diagnostics);
                    continue;
                }
            }
            let _session = fonts.session();
            let span_origin = Point::new(origin.x + span.rel_pos.x, origin.y + span.rel_pos.y);
            let placed = place_runes(span, span_origin, surface.clip());

            if span.decorations.contains(Decorations::BACKGROUND) {
                render_backgrounds(&placed, surface, &mut stats);
            }
            if span.decorations.intersects(Decorations::ANY_UNDERLINE) {
                render_lines(&placed, surface, &mut stats, |rune| {
                    let decorations = rune.rune.record.decorations;
                    let dash = if decorations.contains(Decorations::DOTTED_UNDERLINE) {
                        LineDash::Dotted
                    } else if decorations.contains(Decorations::UNDERLINE) {
                        LineDash::Solid
                    } else {
                        return None;
                    };
                    Some((dash, 2. * rune.line_width()))
                });
            }
            if span.decorations.contains(Decorations::OVERLINE) {
                render_lines(&placed, surface, &mut stats, |rune| {
                    rune.rune
                        .record
                        .decorations
                        .contains(Decorations::OVERLINE)
                        .then_some((LineDash::Solid, -OVERLINE_ASCENT * rune.metrics.ascent))
                });
            }
            render_glyphs(&placed, surface, &mut stats);
            if span.decorations.contains(Decorations::LINE_THROUGH) {
                render_lines(&placed, surface, &mut stats, |rune| {
                    rune.rune
                        .record
                        .decorations
                        .contains(Decorations::LINE_THROUGH)
                        .then_some((LineDash::Solid, -LINE_THROUGH_ASCENT * rune.metrics.ascent))
                });
            }
        }
        stats
    }

    /// Draws the block with `origin` as the top of the first line rather
    /// than its baseline. Meant for blocks made with
    /// [`set_string`](Self::set_string) that were never laid out.
    pub fn render_top_pos<S: Surface + ?Sized>(
        &self,
        fonts: &FontService,
        surface: &mut S,
        origin: Point<f32>,
    ) -> RenderStats {
        let ascent = self.first_ascent(&fonts.session());
        let Some(ascent) = ascent else {
            return RenderStats::default();
        };
        self.render(fonts, surface, Point::new(origin.x, origin.y + ascent))
    }

    /// Returns the ascent of the first rune's face, read while `_session`
    /// holds the font service.
    fn first_ascent(&self, _session: &FontSession<'_>) -> Option<f32> {
        self.spans
            .first()
            .filter(|span| span.validate().is_ok())
            .and_then(|span| span.resolved().next())
            .map(|rune| rune.face.metrics().ascent)
    }
}

fn place_runes(span: &Span, origin: Point<f32>, clip: Rect<i32>) -> Vec<Placed<'_>> {
    span.resolved()
        .map(|rune| {
            let record = rune.record;
            let mut placed = Placed {
                pen: Point::new(origin.x + record.rel_pos.x, origin.y + record.rel_pos.y),
                linear: Affine::rotate(f64::from(record.rotation))
                    * Affine::scale_non_uniform(f64::from(record.effective_scale_x()), 1.),
                size: span.glyph_box(record),
                metrics: rune.face.metrics(),
                culled: false,
                rune,
            };
            placed.culled = is_outside(&placed.box_quad(), clip);
            placed
        })
        .collect()
}

fn render_backgrounds<S: Surface + ?Sized>(
    placed: &[Placed<'_>],
    surface: &mut S,
    stats: &mut RenderStats,
) {
    let mut quads = Vec::new();
    let mut current: Option<Color> = None;
    for rune in placed {
        let background = if rune.culled {
            None
        } else {
            rune.rune.record.background
        };
        if background != current {
            if let Some(color) = current {
                flush_quads(&mut quads, color, surface, stats);
            }
            current = background;
        }
        if background.is_some() {
            quads.push(rune.box_quad());
        }
    }
    if let Some(color) = current {
        flush_quads(&mut quads, color, surface, stats);
    }
}

fn flush_quads<S: Surface + ?Sized>(
    quads: &mut Vec<Quad>,
    color: Color,
    surface: &mut S,
    stats: &mut RenderStats,
) {
    if !quads.is_empty() {
        surface.fill_quads(quads, color);
        stats.fill_calls += 1;
        quads.clear();
    }
}

/// Strokes one line per run of runes that `select` picks. `select` returns
/// the dash and the line's offset below the baseline.
fn render_lines<S: Surface + ?Sized>(
    placed: &[Placed<'_>],
    surface: &mut S,
    stats: &mut RenderStats,
    select: impl Fn(&Placed<'_>) -> Option<(LineDash, f32)>,
) {
    let mut run: Option<LineRun> = None;
    for rune in placed {
        if !is_printable(rune.rune.ch) {
            continue;
        }
        let selected = if rune.culled { None } else { select(rune) };
        let Some((dash, offset)) = selected else {
            flush_line(&mut run, surface, stats);
            continue;
        };
        let color = rune.rune.color;
        if run
            .as_ref()
            .is_some_and(|run| run.color != color || run.dash != dash)
        {
            flush_line(&mut run, surface, stats);
        }
        let start = rune.point(0., offset);
        let end = rune.point(rune.size.width, offset);
        match &mut run {
            Some(run) => run.points.extend([start, end]),
            None => {
                run = Some(LineRun {
                    points: vec![start, end],
                    width: rune.line_width(),
                    color,
                    dash,
                });
            }
        }
    }
    flush_line(&mut run, surface, stats);
}

fn flush_line<S: Surface + ?Sized>(
    run: &mut Option<LineRun>,
    surface: &mut S,
    stats: &mut RenderStats,
) {
    if let Some(run) = run.take() {
        surface.stroke_polyline(&run.points, run.width, run.color, run.dash);
        stats.stroke_calls += 1;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn render_glyphs<S: Surface + ?Sized>(
    placed: &[Placed<'_>],
    surface: &mut S,
    stats: &mut RenderStats,
) {
    for rune in placed {
        let ch = rune.rune.ch;
        if !is_printable(ch) {
            continue;
        }
        if rune.culled {
            stats.culled += 1;
            continue;
        }
        let face = rune.rune.face;
        let Some(mask) = face.rasterize(ch) else {
            if !ch.is_whitespace() && !face.has_glyph(ch) {
                Diagnostic::MissingGlyph(ch).record(&mut stats.diagnostics);
            }
            continue;
        };
        if rune.is_untransformed() {
            let origin = Point::new(
                rune.pen.x.round() as i32 + mask.left,
                rune.pen.y.round() as i32 + mask.top,
            );
            surface.draw_mask(origin, &mask, rune.rune.color);
        } else {
            let transform = Affine::translate(to_kurbo(rune.pen).to_vec2())
                * rune.linear
                * Affine::translate((f64::from(mask.left), f64::from(mask.top)));
            surface.draw_mask_transformed(&transform, &mask, rune.rune.color);
            stats.transformed_glyphs += 1;
        }
        stats.glyphs += 1;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fonts::testing::{mock_service, mock_style, MockFace, SNOWMAN};
    use crate::fonts::FaceRef;
    use crate::styles::{TextDirection, TextStyle};
    use crate::surface::ImageSurface;
    use crate::text::markup::MarkupOptions;
    use crate::text::{Inherit, RuneRecord, Spacing};

    #[derive(Debug, PartialEq)]
    enum Call {
        Fill(usize, Color),
        Stroke(Vec<Point<f32>>, f32, Color, LineDash),
        Mask(Point<i32>),
        Transformed,
    }

    struct Recorder {
        clip: Rect<i32>,
        calls: Vec<Call>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                clip: Rect::new(Point::new(0, 0), Size::new(1000, 1000)),
                calls: Vec::new(),
            }
        }

        fn strokes(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Stroke(..)))
                .collect()
        }
    }

    impl Surface for Recorder {
        fn clip(&self) -> Rect<i32> {
            self.clip
        }

        fn fill_quads(&mut self, quads: &[Quad], color: Color) {
            self.calls.push(Call::Fill(quads.len(), color));
        }

        fn stroke_polyline(&mut self, points: &[Point<f32>], width: f32, color: Color, dash: LineDash) {
            self.calls
                .push(Call::Stroke(points.to_vec(), width, color, dash));
        }

        fn draw_mask(&mut self, origin: Point<i32>, _mask: &crate::fonts::GlyphMask, _color: Color) {
            self.calls.push(Call::Mask(origin));
        }

        fn draw_mask_transformed(
            &mut self,
            _transform: &Affine,
            _mask: &crate::fonts::GlyphMask,
            _color: Color,
        ) {
            self.calls.push(Call::Transformed);
        }
    }

    fn laid_out(markup: &str, fonts: &FontService) -> TextBlock {
        let style = TextStyle::default();
        let mut block = TextBlock::new();
        block.set_markup(markup, &mock_style(), &style, fonts, &MarkupOptions::default());
        block.layout(&style, &mock_style(), fonts, Size::new(0., 0.));
        block
    }

    #[test]
    fn draws_glyphs_onto_images() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string("ab", &mock_style(), &TextStyle::default(), &fonts);
        let mut surface = ImageSurface::new(20, 12);
        let stats = block.render_top_pos(&fonts, &mut surface, Point::new(0., 0.));
        assert_eq!(stats.glyphs, 2);
        assert_eq!(stats.transformed_glyphs, 0);
        assert!(stats.diagnostics.is_empty());
        assert_eq!(surface.image().get_pixel(1, 1).0[3], 255);
        assert_eq!(surface.image().get_pixel(7, 7).0[3], 255);
        assert_eq!(surface.image().get_pixel(13, 1).0[3], 0);
        assert_eq!(surface.image().get_pixel(1, 9).0[3], 0);
    }

    #[test]
    fn top_position_reads_the_first_face() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        assert_eq!(block.first_ascent(&fonts.session()), None);
        block.set_string("ab", &mock_style(), &TextStyle::default(), &fonts);
        assert_eq!(block.first_ascent(&fonts.session()), Some(8.));
        let mut recorder = Recorder::new();
        block.render_top_pos(&fonts, &mut recorder, Point::new(10., 20.));
        assert_eq!(
            recorder.calls,
            [Call::Mask(Point::new(10, 20)), Call::Mask(Point::new(16, 20))]
        );
    }

    #[test]
    fn glyphs_land_at_the_pen() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string("ab", &mock_style(), &TextStyle::default(), &fonts);
        let mut recorder = Recorder::new();
        block.render(&fonts, &mut recorder, Point::new(10., 20.));
        assert_eq!(
            recorder.calls,
            [Call::Mask(Point::new(10, 12)), Call::Mask(Point::new(16, 12))]
        );
    }

    #[test]
    fn runes_outside_the_clip_are_culled() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string("abcdefghij", &mock_style(), &TextStyle::default(), &fonts);
        let mut surface = ImageSurface::new(12, 10);
        let stats = block.render_top_pos(&fonts, &mut surface, Point::new(0., 0.));
        assert_eq!(stats.glyphs, 2);
        assert_eq!(stats.culled, 8);
    }

    #[test]
    fn decorations_are_batched() {
        let fonts = mock_service();
        let block = laid_out("<mark>ab</mark>c<u>de</u><s>f</s>", &fonts);
        let mut recorder = Recorder::new();
        let stats = block.render(&fonts, &mut recorder, Point::new(0., 0.));
        assert_eq!(stats.fill_calls, 1);
        assert_eq!(stats.stroke_calls, 2);
        assert_eq!(stats.glyphs, 6);
        assert_eq!(recorder.calls[0], Call::Fill(2, Color::YELLOW));

        // The underline runs under "de", 2 line widths below the baseline.
        let baseline = block.spans[0].rel_pos.y;
        let Call::Stroke(points, width, color, dash) = &recorder.calls[1] else {
            unreachable!("expected the underline, got {:?}", recorder.calls[1]);
        };
        assert_eq!(points.len(), 4);
        assert_relative_eq!(points[0].x, MockFace::width(10.) * 3.);
        assert_relative_eq!(points[3].x, MockFace::width(10.) * 5.);
        assert_relative_eq!(points[0].y, baseline + 1.);
        assert_relative_eq!(*width, 0.5);
        assert_eq!(*color, mock_style().color);
        assert_eq!(*dash, LineDash::Solid);

        // Line-throughs come after every glyph.
        let Some(Call::Stroke(points, ..)) = recorder.calls.last() else {
            unreachable!("expected the line-through last");
        };
        assert_relative_eq!(points[0].y, baseline - 2.);
    }

    #[test]
    fn line_runs_break_on_color_and_style() {
        let fonts = mock_service();
        let block = laid_out(
            "<u>a<span style='color: red'>b</span></u> <abbr>cd</abbr><span style='text-decoration: overline'>e</span>",
            &fonts,
        );
        let mut recorder = Recorder::new();
        let stats = block.render(&fonts, &mut recorder, Point::new(0., 0.));
        assert_eq!(stats.stroke_calls, 4);
        let strokes = recorder.strokes();
        let Call::Stroke(_, _, color, _) = strokes[1] else {
            unreachable!();
        };
        assert_eq!(*color, Color::RED);
        let Call::Stroke(points, _, _, dash) = strokes[2] else {
            unreachable!();
        };
        assert_eq!(*dash, LineDash::Dotted);
        assert_eq!(points.len(), 4);
        let Call::Stroke(points, ..) = strokes[3] else {
            unreachable!();
        };
        assert_relative_eq!(points[0].y, block.spans[0].rel_pos.y - 1.1 * 8.);
    }

    #[test]
    fn rotated_runes_are_transformed() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string_rot90("ab", &mock_style(), &TextStyle::default(), &fonts);
        assert_eq!(block.direction, TextDirection::TopToBottomRotated);
        let mut surface = ImageSurface::new(30, 30);
        let stats = block.render(&fonts, &mut surface, Point::new(10., 2.));
        assert_eq!(stats.glyphs, 2);
        assert_eq!(stats.transformed_glyphs, 2);
        // The quarter turn lays the first glyph's ink to the right of the pen.
        assert_eq!(surface.image().get_pixel(12, 4).0[3], 255);
        assert_eq!(surface.image().get_pixel(5, 4).0[3], 0);
    }

    #[test]
    fn scaled_runes_are_transformed() {
        let fonts = mock_service();
        let mut block = TextBlock::new();
        block.set_string_transformed("a", &mock_style(), &TextStyle::default(), &fonts, 0., 2.);
        let mut recorder = Recorder::new();
        let stats = block.render_top_pos(&fonts, &mut recorder, Point::new(0., 0.));
        assert_eq!(stats.transformed_glyphs, 1);
        assert_eq!(recorder.calls, [Call::Transformed]);
    }

    #[test]
    fn unprintable_and_missing_glyphs() {
        let fonts = mock_service();
        let mut span = Span::default();
        span.append_rune(
            'a',
            RuneRecord::new(
                Inherit::Set(FaceRef::new(MockFace::new(10.))),
                Inherit::Set(Color::BLACK),
            ),
        );
        for ch in ['\t', '\u{7}', SNOWMAN] {
            span.append_rune(ch, RuneRecord::new(Inherit::Inherit, Inherit::Inherit));
        }
        span.set_rune_positions(&fonts, TextDirection::LeftToRight, &Spacing::default())
            .unwrap();
        let mut block = TextBlock::new();
        block.spans.push(span);
        let mut broken = Span::default();
        broken.append_rune(
            'x',
            RuneRecord::new(
                Inherit::Set(FaceRef::new(MockFace::new(10.))),
                Inherit::Set(Color::BLACK),
            ),
        );
        broken.text.push('y');
        block.spans.push(broken);

        let mut recorder = Recorder::new();
        let stats = block.render(&fonts, &mut recorder, Point::new(0., 20.));
        assert_eq!(stats.glyphs, 1);
        assert_eq!(
            stats.diagnostics,
            [
                Diagnostic::MissingGlyph(SNOWMAN),
                Diagnostic::InvalidSpan {
                    span: 1,
                    error: SpanError::LengthMismatch {
                        text: 2,
                        records: 1
                    }
                },
            ]
        );
    }
}
