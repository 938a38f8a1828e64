//! Drawing targets for rendered text.
use std::path::Path;

use figures::{Point, Rect, Size};
use image::RgbaImage;
use intentional::Cast;
use kurbo::Affine;

use crate::fonts::GlyphMask;
use crate::styles::Color;
use crate::Result;

/// Converts a point into `kurbo`'s double precision space.
pub(crate) fn to_kurbo(point: Point<f32>) -> kurbo::Point {
    kurbo::Point::new(f64::from(point.x), f64::from(point.y))
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn from_kurbo(point: kurbo::Point) -> Point<f32> {
    Point::new(point.x as f32, point.y as f32)
}

/// A convex quadrilateral, corners in drawing order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad(pub [Point<f32>; 4]);

impl Quad {
    /// Returns the axis-aligned rectangle from `top_left` spanning `size`.
    #[must_use]
    pub fn rect(top_left: Point<f32>, size: Size<f32>) -> Self {
        let right = top_left.x + size.width;
        let bottom = top_left.y + size.height;
        Self([
            top_left,
            Point::new(right, top_left.y),
            Point::new(right, bottom),
            Point::new(top_left.x, bottom),
        ])
    }

    fn contains(&self, point: Point<f32>) -> bool {
        let mut positive = false;
        let mut negative = false;
        for index in 0..4 {
            let a = self.0[index];
            let b = self.0[(index + 1) % 4];
            let cross = (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x);
            positive |= cross > 0.;
            negative |= cross < 0.;
        }
        !(positive && negative)
    }

    pub(crate) fn bounds(&self) -> (Point<f32>, Point<f32>) {
        self.0.iter().fold(
            (
                Point::new(f32::INFINITY, f32::INFINITY),
                Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
            ),
            |(min, max), corner| {
                (
                    Point::new(min.x.min(corner.x), min.y.min(corner.y)),
                    Point::new(max.x.max(corner.x), max.y.max(corner.y)),
                )
            },
        )
    }
}

/// The dash pattern of a stroked line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineDash {
    /// A continuous line.
    #[default]
    Solid,
    /// Alternating 2 pixel dashes and 2 pixel gaps.
    Dotted,
}

/// Something text can be drawn onto.
///
/// Callers batch their work: a run of adjacent decorated runes is one
/// [`fill_quads`](Self::fill_quads) or
/// [`stroke_polyline`](Self::stroke_polyline) call.
pub trait Surface {
    /// Returns the rectangle drawing is limited to.
    fn clip(&self) -> Rect<i32>;
    /// Fills every quad with `color`.
    fn fill_quads(&mut self, quads: &[Quad], color: Color);
    /// Strokes a connected line through `points`.
    fn stroke_polyline(&mut self, points: &[Point<f32>], width: f32, color: Color, dash: LineDash);
    /// Blends `mask` tinted with `color` with its top-left corner at
    /// `origin`.
    fn draw_mask(&mut self, origin: Point<i32>, mask: &GlyphMask, color: Color);
    /// Blends `mask` tinted with `color`, mapping mask pixel coordinates
    /// through `transform` and resampling bilinearly.
    fn draw_mask_transformed(&mut self, transform: &Affine, mask: &GlyphMask, color: Color);
}

/// A [`Surface`] backed by an in-memory RGBA image.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: RgbaImage,
    clip: Rect<i32>,
}

impl ImageSurface {
    /// Returns a transparent surface of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    /// Returns a surface drawing onto `image`.
    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        let clip = Rect::new(
            Point::new(0, 0),
            Size::new(image.width().cast::<i32>(), image.height().cast::<i32>()),
        );
        Self { image, clip }
    }

    /// Limits drawing to `clip` and returns self.
    #[must_use]
    pub fn with_clip(mut self, clip: Rect<i32>) -> Self {
        let left = clip.origin.x.max(0);
        let top = clip.origin.y.max(0);
        let right = (clip.origin.x + clip.size.width).min(self.image.width().cast::<i32>());
        let bottom = (clip.origin.y + clip.size.height).min(self.image.height().cast::<i32>());
        self.clip = Rect::new(
            Point::new(left, top),
            Size::new((right - left).max(0), (bottom - top).max(0)),
        );
        self
    }

    /// Returns the image drawn so far.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Returns the underlying image.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Writes the image to `path`, in the format implied by its extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result {
        self.image.save(path)?;
        Ok(())
    }

    fn clip_contains(&self, x: i32, y: i32) -> bool {
        x >= self.clip.origin.x
            && y >= self.clip.origin.y
            && x < self.clip.origin.x + self.clip.size.width
            && y < self.clip.origin.y + self.clip.size.height
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn blend(&mut self, x: i32, y: i32, color: Color, coverage: u8) {
        if coverage == 0 || !self.clip_contains(x, y) {
            return;
        }
        let source_alpha = f32::from(color.alpha) * f32::from(coverage) / (255. * 255.);
        if source_alpha <= 0. {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let [red, green, blue, alpha] = pixel.0;
        let dest_alpha = f32::from(alpha) / 255.;
        let out_alpha = source_alpha + dest_alpha * (1. - source_alpha);
        let channel = |source: u8, dest: u8| -> u8 {
            let value = (f32::from(source) * source_alpha
                + f32::from(dest) * dest_alpha * (1. - source_alpha))
                / out_alpha;
            value.round().clamp(0., 255.) as u8
        };
        pixel.0 = [
            channel(color.red, red),
            channel(color.green, green),
            channel(color.blue, blue),
            (out_alpha * 255.).round().clamp(0., 255.) as u8,
        ];
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pixel_range(&self, min: Point<f32>, max: Point<f32>) -> (Point<i32>, Point<i32>) {
        let start = Point::new(
            (min.x.floor() as i32).max(self.clip.origin.x),
            (min.y.floor() as i32).max(self.clip.origin.y),
        );
        let end = Point::new(
            (max.x.ceil() as i32).min(self.clip.origin.x + self.clip.size.width),
            (max.y.ceil() as i32).min(self.clip.origin.y + self.clip.size.height),
        );
        (start, end)
    }

    fn fill_quad(&mut self, quad: &Quad, color: Color) {
        let (min, max) = quad.bounds();
        let (start, end) = self.pixel_range(min, max);
        for y in start.y..end.y {
            for x in start.x..end.x {
                let center = Point::new(x.cast::<f32>() + 0.5, y.cast::<f32>() + 0.5);
                if quad.contains(center) {
                    self.blend(x, y, color, 255);
                }
            }
        }
    }

    fn stroke_segment(&mut self, from: Point<f32>, to: Point<f32>, width: f32, color: Color) {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            return;
        }
        let half = width.max(1.) / 2.;
        let normal = Point::new(-dy / length * half, dx / length * half);
        self.fill_quad(
            &Quad([
                Point::new(from.x + normal.x, from.y + normal.y),
                Point::new(to.x + normal.x, to.y + normal.y),
                Point::new(to.x - normal.x, to.y - normal.y),
                Point::new(from.x - normal.x, from.y - normal.y),
            ]),
            color,
        );
    }
}

const DASH_ON: f32 = 2.;
const DASH_PERIOD: f32 = 4.;

impl Surface for ImageSurface {
    fn clip(&self) -> Rect<i32> {
        self.clip
    }

    fn fill_quads(&mut self, quads: &[Quad], color: Color) {
        for quad in quads {
            self.fill_quad(quad, color);
        }
    }

    fn stroke_polyline(&mut self, points: &[Point<f32>], width: f32, color: Color, dash: LineDash) {
        let mut phase = 0.;
        for segment in points.windows(2) {
            let (from, to) = (segment[0], segment[1]);
            if dash == LineDash::Solid {
                self.stroke_segment(from, to, width, color);
                continue;
            }
            let length = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
            let at = |distance: f32| {
                let t = distance / length;
                Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
            };
            let mut traveled = 0.;
            while traveled < length {
                let on = phase < DASH_ON;
                let remaining_in_phase = if on { DASH_ON - phase } else { DASH_PERIOD - phase };
                let step = remaining_in_phase.min(length - traveled);
                if on {
                    self.stroke_segment(at(traveled), at(traveled + step), width, color);
                }
                traveled += step;
                phase = (phase + step) % DASH_PERIOD;
            }
        }
    }

    fn draw_mask(&mut self, origin: Point<i32>, mask: &GlyphMask, color: Color) {
        for my in 0..mask.height.cast::<i32>() {
            for mx in 0..mask.width.cast::<i32>() {
                self.blend(origin.x + mx, origin.y + my, color, mask.coverage_at(mx, my));
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn draw_mask_transformed(&mut self, transform: &Affine, mask: &GlyphMask, color: Color) {
        if !transform.is_finite() || transform.determinant().abs() < f64::EPSILON {
            tracing::trace!("skipping glyph with a degenerate transform");
            return;
        }
        let inverse = transform.inverse();
        let width = f64::from(mask.width);
        let height = f64::from(mask.height);
        let corner = |x: f64, y: f64| from_kurbo(*transform * kurbo::Point::new(x, y));
        let (min, max) = Quad([
            corner(0., 0.),
            corner(width, 0.),
            corner(width, height),
            corner(0., height),
        ])
        .bounds();
        let (start, end) = self.pixel_range(min, max);
        for y in start.y..end.y {
            for x in start.x..end.x {
                let source =
                    inverse * kurbo::Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let sx = source.x - 0.5;
                let sy = source.y - 0.5;
                let left = sx.floor();
                let top = sy.floor();
                let fx = sx - left;
                let fy = sy - top;
                let (left, top) = (left as i32, top as i32);
                let sample = |dx: i32, dy: i32| f64::from(mask.coverage_at(left + dx, top + dy));
                let coverage = (sample(0, 0) * (1. - fx) + sample(1, 0) * fx) * (1. - fy)
                    + (sample(0, 1) * (1. - fx) + sample(1, 1) * fx) * fy;
                self.blend(x, y, color, coverage.round().clamp(0., 255.) as u8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    fn alpha_at(surface: &ImageSurface, x: u32, y: u32) -> u8 {
        surface.image().get_pixel(x, y).0[3]
    }

    #[test]
    fn fills_rectangles() {
        let mut surface = ImageSurface::new(10, 10);
        surface.fill_quads(
            &[Quad::rect(Point::new(2., 2.), Size::new(3., 2.))],
            Color::RED,
        );
        assert_eq!(surface.image().get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(alpha_at(&surface, 4, 3), 255);
        assert_eq!(alpha_at(&surface, 5, 3), 0);
        assert_eq!(alpha_at(&surface, 2, 4), 0);
    }

    #[test]
    fn clip_limits_drawing() {
        let mut surface = ImageSurface::new(10, 10).with_clip(Rect::new(
            Point::new(0, 0),
            Size::new(3, 20),
        ));
        assert_eq!(surface.clip().size, Size::new(3, 10));
        surface.fill_quads(
            &[Quad::rect(Point::new(0., 0.), Size::new(10., 1.))],
            Color::BLACK,
        );
        assert_eq!(alpha_at(&surface, 2, 0), 255);
        assert_eq!(alpha_at(&surface, 3, 0), 0);
    }

    #[test]
    fn dotted_lines_have_gaps() {
        let mut surface = ImageSurface::new(12, 3);
        surface.stroke_polyline(
            &[Point::new(0., 1.5), Point::new(12., 1.5)],
            1.,
            Color::BLACK,
            LineDash::Dotted,
        );
        let row: Vec<u8> = (0..12).map(|x| alpha_at(&surface, x, 1)).collect();
        assert_eq!(row, [255, 255, 0, 0, 255, 255, 0, 0, 255, 255, 0, 0]);
    }

    #[test]
    fn masks_blend_over() {
        let mut surface = ImageSurface::new(4, 4);
        let mask = GlyphMask {
            left: 0,
            top: 0,
            width: 2,
            height: 1,
            coverage: vec![255, 0],
        };
        surface.draw_mask(Point::new(1, 1), &mask, Color::BLUE);
        assert_eq!(surface.image().get_pixel(1, 1).0, [0, 0, 255, 255]);
        assert_eq!(alpha_at(&surface, 2, 1), 0);

        let mut transformed = ImageSurface::new(4, 4);
        transformed.draw_mask_transformed(&Affine::translate((1., 1.)), &mask, Color::BLUE);
        assert_eq!(transformed.image().get_pixel(1, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn quarter_turn_stands_a_mask_up() {
        let mut surface = ImageSurface::new(4, 4);
        let mask = GlyphMask {
            left: 0,
            top: 0,
            width: 3,
            height: 1,
            coverage: vec![255; 3],
        };
        let transform = Affine::translate((2., 0.)) * Affine::rotate(FRAC_PI_2);
        surface.draw_mask_transformed(&transform, &mask, Color::BLACK);
        for y in 0..3 {
            assert_eq!(alpha_at(&surface, 1, y), 255);
        }
        assert_eq!(alpha_at(&surface, 1, 3), 0);
        assert_eq!(alpha_at(&surface, 0, 1), 0);
        assert_eq!(alpha_at(&surface, 2, 1), 0);
    }

    #[test]
    fn scale_applies_before_translation() {
        let mut surface = ImageSurface::new(8, 2);
        let mask = GlyphMask {
            left: 0,
            top: 0,
            width: 1,
            height: 1,
            coverage: vec![255],
        };
        let transform = Affine::translate((4., 0.)) * Affine::scale_non_uniform(2., 1.);
        surface.draw_mask_transformed(&transform, &mask, Color::BLACK);
        let row: Vec<u8> = (0..8).map(|x| alpha_at(&surface, x, 0)).collect();
        // Each source pixel is stretched over two, so both are sampled
        // three quarters of the way toward the covered pixel.
        assert_eq!(row, [0, 0, 0, 0, 191, 191, 0, 0]);
    }

    #[test]
    fn degenerate_transforms_draw_nothing() {
        let mut surface = ImageSurface::new(4, 4);
        let mask = GlyphMask {
            left: 0,
            top: 0,
            width: 2,
            height: 2,
            coverage: vec![255; 4],
        };
        surface.draw_mask_transformed(
            &Affine::scale_non_uniform(0., 1.),
            &mask,
            Color::BLACK,
        );
        assert!(surface.image().pixels().all(|pixel| pixel.0[3] == 0));
    }
}
