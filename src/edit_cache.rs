//! Stroke-scoped window cache over a field accessor.
//!
//! Keeps the current (`live`) and first-seen (`original`) value of every
//! cached cell. Growing the cached rectangle only fetches the newly uncovered
//! strips, so edits already applied to cached cells are never overwritten by
//! a re-fetch.

use std::collections::HashMap;

use glam::Vec3;

use crate::accessor::{bilerp_sparse, FieldAccessor};
use crate::debug_log::debug_log;
use crate::field::{FieldCoord, FieldRect, FieldValue};

pub struct EditCache<A: FieldAccessor> {
    accessor: A,
    live: HashMap<FieldCoord, A::Value>,
    original: HashMap<FieldCoord, A::Value>,
    bounds: FieldRect,
}

impl<A: FieldAccessor> EditCache<A> {
    pub fn new(accessor: A) -> Self {
        Self {
            accessor,
            live: HashMap::new(),
            original: HashMap::new(),
            bounds: FieldRect::EMPTY,
        }
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Rectangle fetched so far this stroke.
    pub fn cached_rect(&self) -> FieldRect {
        self.bounds
    }

    /// Number of cells present in the cache.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Make every stored cell of `rect` available, fetching only what is new.
    pub fn cache_window(&mut self, rect: FieldRect) {
        if rect.is_empty() {
            return;
        }
        if self.bounds.is_empty() {
            self.fetch_into(rect);
            self.bounds = rect;
            return;
        }

        let mut b = self.bounds;
        if rect.x1 < b.x1 {
            self.fetch_into(FieldRect::new(rect.x1, b.y1, b.x1 - 1, b.y2));
            b.x1 = rect.x1;
        }
        if rect.x2 > b.x2 {
            self.fetch_into(FieldRect::new(b.x2 + 1, b.y1, rect.x2, b.y2));
            b.x2 = rect.x2;
        }
        if rect.y1 < b.y1 {
            self.fetch_into(FieldRect::new(b.x1, rect.y1, b.x2, b.y1 - 1));
            b.y1 = rect.y1;
        }
        if rect.y2 > b.y2 {
            self.fetch_into(FieldRect::new(b.x1, b.y2 + 1, b.x2, rect.y2));
            b.y2 = rect.y2;
        }
        self.bounds = b;
    }

    fn fetch_into(&mut self, rect: FieldRect) {
        for (coord, value) in self.accessor.fetch(rect) {
            self.original.entry(coord).or_insert_with(|| value.clone());
            self.live.entry(coord).or_insert(value);
        }
    }

    /// Live values, row-major; uncached cells read as the default value.
    pub fn read_window(&self, rect: FieldRect) -> Vec<A::Value> {
        Self::dense(&self.live, rect)
    }

    /// Values as first seen this stroke, row-major.
    pub fn read_original_window(&self, rect: FieldRect) -> Vec<A::Value> {
        Self::dense(&self.original, rect)
    }

    fn dense(map: &HashMap<FieldCoord, A::Value>, rect: FieldRect) -> Vec<A::Value> {
        rect.iter()
            .map(|c| map.get(&c).cloned().unwrap_or_default())
            .collect()
    }

    /// Update live values from a dense buffer and push them to storage.
    pub fn write_window(&mut self, rect: FieldRect, values: &[A::Value]) {
        if rect.is_empty() {
            return;
        }
        if values.len() < rect.area() {
            debug_log(&format!(
                "[cache] write skipped: {} values for {} cells",
                values.len(),
                rect.area()
            ));
            return;
        }
        for (coord, value) in rect.iter().zip(values) {
            if let Some(slot) = self.live.get_mut(&coord) {
                *slot = value.clone();
            }
        }
        self.accessor.store(rect, &values[..rect.area()]);
        self.accessor.flush();
    }

    pub fn value(&self, coord: FieldCoord) -> Option<&A::Value> {
        self.live.get(&coord)
    }

    pub fn original_value(&self, coord: FieldCoord) -> Option<&A::Value> {
        self.original.get(&coord)
    }
}

impl<A> EditCache<A>
where
    A: FieldAccessor,
    A::Value: FieldValue,
{
    fn live_f32(&self, x: i32, y: i32) -> Option<f32> {
        self.live.get(&FieldCoord::new(x, y)).map(|v| v.to_f32())
    }

    pub fn read_window_f32(&self, rect: FieldRect) -> Vec<f32> {
        self.read_window(rect).into_iter().map(FieldValue::to_f32).collect()
    }

    pub fn read_original_window_f32(&self, rect: FieldRect) -> Vec<f32> {
        self.read_original_window(rect)
            .into_iter()
            .map(FieldValue::to_f32)
            .collect()
    }

    /// Round, clamp to the storage range and write.
    pub fn write_window_f32(&mut self, rect: FieldRect, values: &[f32]) {
        let converted: Vec<A::Value> = values.iter().map(|&v| A::Value::from_f32(v)).collect();
        self.write_window(rect, &converted);
    }

    /// Bilinear sample of live data, 0 when no neighbour is cached.
    pub fn point_value(&self, x: f32, y: f32) -> f32 {
        let cx = x.floor() as i32;
        let cy = y.floor() as i32;
        bilerp_sparse(
            self.live_f32(cx, cy),
            self.live_f32(cx + 1, cy),
            self.live_f32(cx, cy + 1),
            self.live_f32(cx + 1, cy + 1),
            x - cx as f32,
            y - cy as f32,
        )
        .unwrap_or(0.0)
    }

    /// Surface normal of the cell quad at `(x, y)`, averaged over its two triangles.
    pub fn point_normal(&self, x: i32, y: i32) -> Vec3 {
        let p00 = self.live_f32(x, y);
        let p10 = self.live_f32(x + 1, y);
        let p01 = self.live_f32(x, y + 1);
        let p11 = self.live_f32(x + 1, y + 1);

        let h00 = p00.or(p10).or(p01).or(p11).unwrap_or(0.0);
        let h10 = p10.or(p00).or(p11).or(p01).unwrap_or(0.0);
        let h01 = p01.or(p00).or(p11).or(p10).unwrap_or(0.0);
        let h11 = p11.or(p10).or(p01).or(p00).unwrap_or(0.0);

        let v00 = Vec3::new(0.0, 0.0, h00);
        let v01 = Vec3::new(0.0, 1.0, h01);
        let v10 = Vec3::new(1.0, 0.0, h10);
        let v11 = Vec3::new(1.0, 1.0, h11);

        let face1 = (v00 - v10).cross(v10 - v11).normalize_or_zero();
        let face2 = (v11 - v01).cross(v01 - v00).normalize_or_zero();
        (face1 + face2).normalize_or_zero()
    }
}

impl<A> EditCache<A>
where
    A: FieldAccessor<Value = Vec<u8>>,
{
    /// Packed weights as `area * layers` bytes, layer-minor.
    pub fn read_packed_window(&self, rect: FieldRect, layers: usize) -> Vec<u8> {
        Self::flatten(self.read_window(rect), layers)
    }

    pub fn read_original_packed_window(&self, rect: FieldRect, layers: usize) -> Vec<u8> {
        Self::flatten(self.read_original_window(rect), layers)
    }

    fn flatten(cells: Vec<Vec<u8>>, layers: usize) -> Vec<u8> {
        let mut flat = vec![0u8; cells.len() * layers];
        for (i, cell) in cells.iter().enumerate() {
            for (l, &w) in cell.iter().take(layers).enumerate() {
                flat[i * layers + l] = w;
            }
        }
        flat
    }

    pub fn write_packed_window(&mut self, rect: FieldRect, layers: usize, flat: &[u8]) {
        if layers == 0 || flat.len() < rect.area() * layers {
            return;
        }
        // Cells the store does not hold stay empty so the accessor skips them.
        let cells: Vec<Vec<u8>> = rect
            .iter()
            .enumerate()
            .map(|(i, coord)| {
                if self.live.contains_key(&coord) {
                    flat[i * layers..(i + 1) * layers].to_vec()
                } else {
                    Vec::new()
                }
            })
            .collect();
        self.write_window(rect, &cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Dense in-memory field that records every fetched rectangle.
    struct RecordingAccessor {
        extent: FieldRect,
        data: Rc<RefCell<HashMap<FieldCoord, u16>>>,
        fetches: Rc<RefCell<Vec<FieldRect>>>,
    }

    impl RecordingAccessor {
        fn new(extent: FieldRect, f: impl Fn(FieldCoord) -> u16) -> Self {
            let data = extent.iter().map(|c| (c, f(c))).collect();
            Self {
                extent,
                data: Rc::new(RefCell::new(data)),
                fetches: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl FieldAccessor for RecordingAccessor {
        type Value = u16;

        fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, u16> {
            self.fetches.borrow_mut().push(rect);
            let data = self.data.borrow();
            rect.iter()
                .filter(|c| self.extent.contains(*c))
                .map(|c| (c, data[&c]))
                .collect()
        }

        fn store(&mut self, rect: FieldRect, values: &[u16]) {
            let mut data = self.data.borrow_mut();
            for (c, &v) in rect.iter().zip(values) {
                if self.extent.contains(c) {
                    data.insert(c, v);
                }
            }
        }
    }

    fn ramp(c: FieldCoord) -> u16 {
        (c.x * 100 + c.y) as u16
    }

    #[test]
    fn test_growing_windows_match_single_fetch() {
        let extent = FieldRect::new(0, 0, 15, 15);
        let mut grown = EditCache::new(RecordingAccessor::new(extent, ramp));
        grown.cache_window(FieldRect::new(5, 5, 7, 7));
        grown.cache_window(FieldRect::new(3, 6, 9, 8));
        grown.cache_window(FieldRect::new(2, 2, 12, 4));

        let union = FieldRect::new(2, 2, 12, 8);
        let mut single = EditCache::new(RecordingAccessor::new(extent, ramp));
        single.cache_window(union);

        assert_eq!(grown.cached_rect(), union);
        assert_eq!(grown.read_window(union), single.read_window(union));
        assert_eq!(grown.len(), union.area());
    }

    #[test]
    fn test_expansion_fetches_only_new_strips() {
        let extent = FieldRect::new(0, 0, 15, 15);
        let accessor = RecordingAccessor::new(extent, ramp);
        let fetches = accessor.fetches.clone();
        let mut cache = EditCache::new(accessor);

        cache.cache_window(FieldRect::new(4, 4, 6, 6));
        cache.cache_window(FieldRect::new(2, 4, 8, 7));

        let log = fetches.borrow();
        assert_eq!(
            *log,
            vec![
                FieldRect::new(4, 4, 6, 6),
                FieldRect::new(2, 4, 3, 6),
                FieldRect::new(7, 4, 8, 6),
                FieldRect::new(2, 7, 8, 7),
            ]
        );
        let total: usize = log.iter().map(|r| r.area()).sum();
        assert_eq!(total, FieldRect::new(2, 4, 8, 7).area(), "no cell fetched twice");
    }

    #[test]
    fn test_edits_survive_expansion() {
        let extent = FieldRect::new(0, 0, 15, 15);
        let mut cache = EditCache::new(RecordingAccessor::new(extent, |_| 1));
        let rect = FieldRect::new(4, 4, 5, 5);
        cache.cache_window(rect);
        cache.write_window(rect, &[9, 9, 9, 9]);
        cache.cache_window(FieldRect::new(0, 0, 10, 10));
        assert_eq!(cache.value(FieldCoord::new(4, 4)), Some(&9));
        assert_eq!(cache.value(FieldCoord::new(0, 0)), Some(&1));
    }

    #[test]
    fn test_original_is_stable_across_writes() {
        let extent = FieldRect::new(0, 0, 9, 9);
        let mut cache = EditCache::new(RecordingAccessor::new(extent, ramp));
        let rect = FieldRect::new(1, 1, 6, 6);
        cache.cache_window(rect);
        let before = cache.read_original_window(rect);

        let inner = FieldRect::new(2, 2, 4, 4);
        for pass in 0..3u16 {
            cache.write_window(inner, &vec![1000 + pass; inner.area()]);
        }
        assert_eq!(cache.read_original_window(rect), before);
        assert_eq!(cache.value(FieldCoord::new(3, 3)), Some(&1002));
    }

    #[test]
    fn test_write_reaches_accessor() {
        let extent = FieldRect::new(0, 0, 3, 3);
        let accessor = RecordingAccessor::new(extent, |_| 0);
        let data = accessor.data.clone();
        let mut cache = EditCache::new(accessor);
        let rect = FieldRect::new(0, 0, 1, 0);
        cache.cache_window(rect);
        cache.write_window_f32(rect, &[70000.0, -3.0]);
        assert_eq!(data.borrow()[&FieldCoord::new(0, 0)], u16::MAX, "clamped high");
        assert_eq!(data.borrow()[&FieldCoord::new(1, 0)], 0, "clamped low");
    }

    #[test]
    fn test_partial_coverage_reads_default() {
        let extent = FieldRect::new(0, 0, 3, 3);
        let mut cache = EditCache::new(RecordingAccessor::new(extent, |_| 5));
        let rect = FieldRect::new(-1, -1, 0, 0);
        cache.cache_window(rect);
        assert_eq!(cache.read_window(rect), vec![0, 0, 0, 5]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_point_value_interpolates() {
        let extent = FieldRect::new(0, 0, 3, 3);
        let mut cache = EditCache::new(RecordingAccessor::new(extent, |c| (c.y * 10) as u16));
        cache.cache_window(extent);
        assert!((cache.point_value(1.0, 1.5) - 15.0).abs() < 1e-4);
        assert_eq!(cache.point_value(20.0, 20.0), 0.0);
    }

    #[test]
    fn test_point_normal_flat_and_sloped() {
        let extent = FieldRect::new(0, 0, 3, 3);
        let mut flat = EditCache::new(RecordingAccessor::new(extent, |_| 7));
        flat.cache_window(extent);
        let n = flat.point_normal(1, 1);
        assert!((n - Vec3::Z).length() < 1e-5, "flat ground faces up: {n:?}");

        let mut slope = EditCache::new(RecordingAccessor::new(extent, |c| c.x as u16));
        slope.cache_window(extent);
        let n = slope.point_normal(1, 1);
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!((n - expected).length() < 1e-5, "rising in +x tilts toward -x: {n:?}");
    }
}
