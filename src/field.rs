//! Field addressing: integer cell coordinates on an unbounded plane, inclusive
//! rectangles over them, and the storage value types the accessors move around.

use std::cmp::Ordering;

/// Raw height that maps to zero world elevation.
pub const HEIGHT_NEUTRAL: u16 = 32768;

/// World height units per raw height unit at a vertical scale of 1.
pub const HEIGHT_ZSCALE: f32 = 1.0 / 128.0;

/// Inverse of [`HEIGHT_ZSCALE`].
pub const HEIGHT_INV_ZSCALE: f32 = 128.0;

/// One sample position on a field.
///
/// Ordered row-major (`y` first, then `x`) so ordered collections iterate the
/// same way dense windows are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FieldCoord {
    pub x: i32,
    pub y: i32,
}

impl FieldCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Pack both components into one 64-bit key.
    pub fn pack(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.y as u32 as u64)
    }

    pub fn unpack(key: u64) -> Self {
        Self {
            x: (key >> 32) as u32 as i32,
            y: key as u32 as i32,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl PartialOrd for FieldCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

/// Inclusive cell rectangle `[x1, x2] x [y1, y2]`.
///
/// A rectangle with `x1 > x2` or `y1 > y2` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Default for FieldRect {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl FieldRect {
    pub const EMPTY: FieldRect = FieldRect {
        x1: i32::MAX,
        y1: i32::MAX,
        x2: i32::MIN,
        y2: i32::MIN,
    };

    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn point(coord: FieldCoord) -> Self {
        Self::new(coord.x, coord.y, coord.x, coord.y)
    }

    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.x2 - self.x1 + 1) as usize
        }
    }

    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.y2 - self.y1 + 1) as usize
        }
    }

    /// Number of cells a dense row-major buffer over this rectangle holds.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, coord: FieldCoord) -> bool {
        coord.x >= self.x1 && coord.x <= self.x2 && coord.y >= self.y1 && coord.y <= self.y2
    }

    pub fn contains_rect(&self, other: &FieldRect) -> bool {
        other.is_empty()
            || (other.x1 >= self.x1
                && other.x2 <= self.x2
                && other.y1 >= self.y1
                && other.y2 <= self.y2)
    }

    /// Grow by `n` cells on every side.
    pub fn expand(&self, n: i32) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.x1 - n, self.y1 - n, self.x2 + n, self.y2 + n)
    }

    pub fn union(&self, other: &FieldRect) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    pub fn include(&mut self, coord: FieldCoord) {
        *self = self.union(&FieldRect::point(coord));
    }

    /// Row-major index of `coord` in a dense buffer over this rectangle.
    pub fn index_of(&self, coord: FieldCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        Some((coord.y - self.y1) as usize * self.width() + (coord.x - self.x1) as usize)
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = FieldCoord> {
        let rect = *self;
        let (y_range, x_range) = if rect.is_empty() {
            (1..=0, 1..=0)
        } else {
            (rect.y1..=rect.y2, rect.x1..=rect.x2)
        };
        y_range.flat_map(move |y| x_range.clone().map(move |x| FieldCoord::new(x, y)))
    }
}

/// Scalar storage types a field can hold.
pub trait FieldValue: Copy + Default + PartialEq + std::fmt::Debug {
    const MAX: f32;

    fn to_f32(self) -> f32;

    /// Round and clamp into the storage range.
    fn from_f32(value: f32) -> Self;
}

impl FieldValue for u16 {
    const MAX: f32 = u16::MAX as f32;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, <Self as FieldValue>::MAX) as u16
    }
}

impl FieldValue for u8 {
    const MAX: f32 = u8::MAX as f32;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, <Self as FieldValue>::MAX) as u8
    }
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_roundtrip_negative() {
        let coord = FieldCoord::new(-7, 12);
        assert_eq!(FieldCoord::unpack(coord.pack()), coord);
        assert_ne!(
            FieldCoord::new(1, 0).pack(),
            FieldCoord::new(0, 1).pack(),
            "swapped components must not collide"
        );
    }

    #[test]
    fn test_coord_order_is_row_major() {
        let mut coords = vec![
            FieldCoord::new(1, 1),
            FieldCoord::new(0, 2),
            FieldCoord::new(2, 0),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                FieldCoord::new(2, 0),
                FieldCoord::new(1, 1),
                FieldCoord::new(0, 2)
            ]
        );
    }

    #[test]
    fn test_rect_dimensions() {
        let rect = FieldRect::new(-1, 2, 3, 4);
        assert_eq!(rect.width(), 5);
        assert_eq!(rect.height(), 3);
        assert_eq!(rect.area(), 15);
        assert!(FieldRect::EMPTY.is_empty());
        assert_eq!(FieldRect::EMPTY.area(), 0);
    }

    #[test]
    fn test_rect_index_and_iter_agree() {
        let rect = FieldRect::new(2, 3, 4, 5);
        for (i, coord) in rect.iter().enumerate() {
            assert_eq!(rect.index_of(coord), Some(i));
        }
        assert_eq!(rect.iter().count(), rect.area());
        assert_eq!(rect.index_of(FieldCoord::new(5, 3)), None);
    }

    #[test]
    fn test_rect_union_with_empty() {
        let rect = FieldRect::new(0, 0, 1, 1);
        assert_eq!(rect.union(&FieldRect::EMPTY), rect);
        assert_eq!(FieldRect::EMPTY.union(&rect), rect);
        let mut grown = FieldRect::EMPTY;
        grown.include(FieldCoord::new(3, -2));
        assert_eq!(grown, FieldRect::new(3, -2, 3, -2));
    }

    #[test]
    fn test_value_clamping() {
        assert_eq!(u16::from_f32(70000.0), u16::MAX);
        assert_eq!(u16::from_f32(-5.0), 0);
        assert_eq!(u8::from_f32(254.6), 255);
        assert_eq!(u8::from_f32(f32::NAN), 0);
        assert_eq!(u8::from_f32(300.0), u8::MAX);
        assert_eq!(<u16 as FieldValue>::MAX, 65535.0);
        assert_eq!(<u8 as FieldValue>::MAX, 255.0);
    }
}
