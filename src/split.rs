//! Proportional space distribution for resizable panes.
//!
//! A [`SplitConfig`] holds one proportion per pane. Proportions always sum to
//! 1, and a proportion of 0 collapses its pane. [`SplitDrag`] turns pointer
//! events on the handles between panes into calls to
//! [`SplitConfig::set_split_action`].
use figures::{Point, Rect, Size};
use intentional::Cast;

/// The direction panes are stacked in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Panes are displayed as rows, one above the other.
    Row,
    /// Panes are displayed as columns, side by side.
    Column,
}

impl Orientation {
    /// Splits a size into its measured and other parts.
    #[must_use]
    pub fn split_size<U>(self, s: Size<U>) -> (U, U) {
        match self {
            Orientation::Row => (s.height, s.width),
            Orientation::Column => (s.width, s.height),
        }
    }

    /// Returns the coordinate of `point` along the measured axis.
    #[must_use]
    pub fn measured<U>(self, point: Point<U>) -> U {
        match self {
            Orientation::Row => point.y,
            Orientation::Column => point.x,
        }
    }

    /// Combines split values into a [`Size`].
    #[must_use]
    pub fn make_size<U>(self, measured: U, other: U) -> Size<U> {
        match self {
            Orientation::Row => Size::new(other, measured),
            Orientation::Column => Size::new(measured, other),
        }
    }

    /// Combines split values into a [`Point`].
    #[must_use]
    pub fn make_point<U>(self, measured: U, other: U) -> Point<U> {
        match self {
            Orientation::Row => Point::new(other, measured),
            Orientation::Column => Point::new(measured, other),
        }
    }
}

/// The space given to one pane along the measured axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Distance from the start of the container.
    pub offset: f32,
    /// Length along the measured axis.
    pub size: f32,
    /// True if the pane's proportion is 0.
    pub collapsed: bool,
}

impl Region {
    /// Returns the pane's rectangle in a container `cross` wide on the other
    /// axis.
    #[must_use]
    pub fn rect(&self, orientation: Orientation, cross: f32) -> Rect<f32> {
        Rect::new(
            orientation.make_point(self.offset, 0.),
            orientation.make_size(self.size, cross),
        )
    }
}

/// The proportions of a row or column of resizable panes.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitConfig {
    splits: Vec<f32>,
    saved: Option<Vec<f32>>,
}

impl SplitConfig {
    /// Returns `count` evenly sized panes.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let mut config = Self::default();
        config.update(count);
        config
    }

    /// Returns panes sized by `proportions`, normalized to sum to 1.
    /// Negative and non-finite values are treated as 0.
    #[must_use]
    pub fn from_proportions(proportions: &[f32]) -> Self {
        let mut config = Self {
            splits: proportions.iter().copied().map(sanitize).collect(),
            saved: None,
        };
        config.normalize();
        config
    }

    /// Returns the number of panes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    /// Returns true if there are no panes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Returns each pane's proportion.
    #[must_use]
    pub fn proportions(&self) -> &[f32] {
        &self.splits
    }

    /// Returns the saved proportions, if any.
    #[must_use]
    pub fn saved(&self) -> Option<&[f32]> {
        self.saved.as_deref()
    }

    /// Resizes to `count` panes and normalizes. Changing the number of panes
    /// resets every pane to an even share.
    pub fn update(&mut self, count: usize) {
        if self.splits.len() != count {
            self.splits = vec![0.; count];
        }
        self.normalize();
    }

    /// Replaces the leading proportions with `splits` and normalizes. Extra
    /// values are ignored.
    pub fn set_splits(&mut self, splits: &[f32]) {
        for (split, value) in self.splits.iter_mut().zip(splits) {
            *split = sanitize(*value);
        }
        self.normalize();
    }

    /// Remembers the current proportions for [`restore_splits`](Self::restore_splits).
    pub fn save_splits(&mut self) {
        if !self.splits.is_empty() {
            self.saved = Some(self.splits.clone());
        }
    }

    /// Returns to the proportions remembered by the last
    /// [`save_splits`](Self::save_splits).
    pub fn restore_splits(&mut self) {
        let Some(saved) = &self.saved else {
            return;
        };
        if saved.len() == self.splits.len() {
            self.splits.clone_from(saved);
        } else {
            let saved = saved.clone();
            self.set_splits(&saved);
        }
    }

    /// Collapses the panes at `indices`, optionally saving the current
    /// proportions first. Out of range indices are ignored. Collapsing
    /// every pane restores an even split.
    pub fn collapse(&mut self, save: bool, indices: &[usize]) {
        if save {
            self.save_splits();
        }
        for &index in indices {
            if let Some(split) = self.splits.get_mut(index) {
                *split = 0.;
            }
        }
        self.normalize();
    }

    /// Moves the handle after pane `index` so that the panes up to and
    /// including it take up `value` of the space.
    ///
    /// `value` is clamped to `0..=1`, and pane `index` never shrinks below 0.
    /// The panes after the handle share what remains in the same ratio they
    /// had before. If they had no space, they share it evenly. Handles are
    /// numbered `0..len - 1`; other indices do nothing.
    pub fn set_split_action(&mut self, index: usize, value: f32) {
        let count = self.splits.len();
        if index + 1 >= count || value.is_nan() {
            tracing::trace!(index, count, "ignoring split for missing handle");
            return;
        }
        let mut value = value.clamp(0., 1.);
        let old_sum: f32 = self.splits[..=index].iter().sum();
        let old_value = self.splits[index];
        let mut new_value = old_value + value - old_sum;
        if new_value < 0. {
            new_value = 0.;
            value = old_sum - old_value;
        }

        let remainder = 1. - value;
        let following = &mut self.splits[index + 1..];
        let old_remainder: f32 = following.iter().sum();
        if old_remainder <= 0. {
            if remainder > 0. {
                let share = remainder / following.len().cast::<f32>();
                following.fill(share);
            }
        } else {
            for split in following {
                *split = remainder * (*split / old_remainder);
            }
        }
        self.splits[index] = new_value;
        self.normalize();
    }

    /// Returns the position of every handle as a fraction of the space.
    #[must_use]
    pub fn handle_positions(&self) -> Vec<f32> {
        let handles = self.splits.len().saturating_sub(1);
        self.splits[..handles]
            .iter()
            .scan(0., |sum, split| {
                *sum += split;
                Some(*sum)
            })
            .collect()
    }

    /// Divides `total` between the panes, leaving `handle_size` between
    /// each pair of neighbors.
    #[must_use]
    pub fn layout(&self, total: f32, handle_size: f32) -> Vec<Region> {
        let handles = self.splits.len().saturating_sub(1).cast::<f32>();
        let available = (total - handle_size * handles).max(0.);
        let mut offset = 0.;
        self.splits
            .iter()
            .map(|&split| {
                let size = split * available;
                let region = Region {
                    offset,
                    size,
                    collapsed: split <= 0.,
                };
                offset += size + handle_size;
                region
            })
            .collect()
    }

    /// Returns each pane's rectangle in `container`, with panes stacked along
    /// `orientation`.
    #[must_use]
    pub fn pane_rects(
        &self,
        orientation: Orientation,
        container: Size<f32>,
        handle_size: f32,
    ) -> Vec<Rect<f32>> {
        let (total, cross) = orientation.split_size(container);
        self.layout(total, handle_size)
            .iter()
            .map(|region| region.rect(orientation, cross))
            .collect()
    }

    /// Returns the handle whose hit area contains `position` along the
    /// measured axis.
    #[must_use]
    pub fn handle_at(&self, total: f32, handle_size: f32, position: f32) -> Option<usize> {
        let regions = self.layout(total, handle_size);
        let handles = regions.len().saturating_sub(1);
        regions[..handles].iter().position(|region| {
            let start = region.offset + region.size;
            (start..=start + handle_size).contains(&position)
        })
    }

    fn normalize(&mut self) {
        if self.splits.is_empty() {
            return;
        }
        let sum: f32 = self.splits.iter().sum();
        if sum <= 0. {
            let even = 1. / self.splits.len().cast::<f32>();
            self.splits.fill(even);
        } else if (sum - 1.).abs() > f32::EPSILON {
            let scale = 1. / sum;
            for split in &mut self.splits {
                *split *= scale;
            }
        }
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.)
    } else {
        0.
    }
}

/// An in-progress drag of one handle of a [`SplitConfig`].
///
/// Created by [`SplitDrag::press`]. The configuration is only changed on
/// [`release`](Self::release); until then [`value`](Self::value) previews
/// where the handle would land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitDrag {
    orientation: Orientation,
    handle: usize,
    grab: f32,
    handle_offset: f32,
    available: f32,
    value: f32,
}

impl SplitDrag {
    /// Starts dragging the handle under `pointer`, if any, in a container
    /// whose measured length is `total`.
    #[must_use]
    pub fn press(
        config: &SplitConfig,
        orientation: Orientation,
        total: f32,
        handle_size: f32,
        pointer: Point<f32>,
    ) -> Option<Self> {
        let position = orientation.measured(pointer);
        let handle = config.handle_at(total, handle_size, position)?;
        let handles = config.len().saturating_sub(1).cast::<f32>();
        let available = (total - handle_size * handles).max(0.);
        let handle_offset = handle.cast::<f32>() * handle_size;
        let value = config.handle_positions()[handle];
        let grab = position - (value * available + handle_offset);
        tracing::trace!(handle, value, "split drag started");
        Some(Self {
            orientation,
            handle,
            grab,
            handle_offset,
            available,
            value,
        })
    }

    /// Returns the index of the handle being dragged.
    #[must_use]
    pub const fn handle(&self) -> usize {
        self.handle
    }

    /// Returns where the handle would land if released now.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Follows the pointer and returns the new preview value.
    pub fn move_to(&mut self, pointer: Point<f32>) -> f32 {
        if self.available > 0. {
            let position = self.orientation.measured(pointer) - self.grab;
            self.value = ((position - self.handle_offset) / self.available).clamp(0., 1.);
        }
        self.value
    }

    /// Ends the drag, applying the last preview value to `config`.
    pub fn release(self, config: &mut SplitConfig) {
        tracing::trace!(handle = self.handle, value = self.value, "split drag released");
        config.set_split_action(self.handle, self.value);
    }
}
