//! Field accessors: adapters that move rectangular windows of one field
//! variant between a [`TerrainBackend`] and an edit cache.

use std::collections::HashMap;

use crate::backend::{FieldPlane, SharedBackend};
use crate::field::{lerp, FieldCoord, FieldRect};

/// Window-level access to one field variant.
pub trait FieldAccessor {
    type Value: Clone + Default;

    /// Every stored value inside `rect`. Missing cells are absent, not zero.
    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, Self::Value>;

    /// Write a dense row-major buffer of exactly `rect.area()` values.
    fn store(&mut self, rect: FieldRect, values: &[Self::Value]);

    /// Hook run after each cache write.
    fn flush(&mut self) {}
}

/// Accessors that can sample between cells.
pub trait InterpolatingAccessor: FieldAccessor {
    /// Bilinear sample at a fractional position, `None` when no neighbour exists.
    fn sample(&self, x: f32, y: f32) -> Option<f32>;
}

/// Bilinear interpolation over four optional corners.
///
/// A missing corner borrows from its nearest present neighbour, horizontal
/// first, so sparse edges blend toward whatever data exists.
pub fn bilerp_sparse(
    p00: Option<f32>,
    p10: Option<f32>,
    p01: Option<f32>,
    p11: Option<f32>,
    frac_x: f32,
    frac_y: f32,
) -> Option<f32> {
    if p00.is_none() && p10.is_none() && p01.is_none() && p11.is_none() {
        return None;
    }
    let v00 = p00.or(p10).or(p01).or(p11).unwrap_or(0.0);
    let v10 = p10.or(p00).or(p11).or(p01).unwrap_or(0.0);
    let v01 = p01.or(p00).or(p11).or(p10).unwrap_or(0.0);
    let v11 = p11.or(p10).or(p01).or(p00).unwrap_or(0.0);
    Some(lerp(
        lerp(v00, v10, frac_x),
        lerp(v01, v11, frac_x),
        frac_y,
    ))
}

fn sample_with(x: f32, y: f32, get: impl Fn(FieldCoord) -> Option<f32>) -> Option<f32> {
    let cx = x.floor() as i32;
    let cy = y.floor() as i32;
    bilerp_sparse(
        get(FieldCoord::new(cx, cy)),
        get(FieldCoord::new(cx + 1, cy)),
        get(FieldCoord::new(cx, cy + 1)),
        get(FieldCoord::new(cx + 1, cy + 1)),
        x - cx as f32,
        y - cy as f32,
    )
}

/// Raw 16-bit heights.
pub struct HeightAccessor {
    backend: SharedBackend,
}

impl HeightAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }
}

impl FieldAccessor for HeightAccessor {
    type Value = u16;

    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, u16> {
        let backend = self.backend.borrow();
        rect.iter()
            .filter_map(|c| backend.height(c).map(|v| (c, v)))
            .collect()
    }

    fn store(&mut self, rect: FieldRect, values: &[u16]) {
        let mut backend = self.backend.borrow_mut();
        for (coord, &value) in rect.iter().zip(values) {
            backend.set_height(coord, value);
        }
        backend.notify_changed(rect, FieldPlane::Height);
    }
}

impl InterpolatingAccessor for HeightAccessor {
    fn sample(&self, x: f32, y: f32) -> Option<f32> {
        let backend = self.backend.borrow();
        sample_with(x, y, |c| backend.height(c).map(f32::from))
    }
}

/// One named weight layer.
pub struct WeightAccessor {
    backend: SharedBackend,
    layer: usize,
    blend: bool,
}

impl WeightAccessor {
    /// `None` when the backend has no layer of that name.
    pub fn new(backend: SharedBackend, layer_name: &str) -> Option<Self> {
        let (layer, blend) = {
            let b = backend.borrow();
            let layer = b.layer_index(layer_name)?;
            let blend = !b.layers()[layer].no_weight_blend;
            (layer, blend)
        };
        Some(Self {
            backend,
            layer,
            blend,
        })
    }

    pub fn layer_index(&self) -> usize {
        self.layer
    }
}

impl FieldAccessor for WeightAccessor {
    type Value = u8;

    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, u8> {
        let backend = self.backend.borrow();
        rect.iter()
            .filter_map(|c| backend.weight(self.layer, c).map(|v| (c, v)))
            .collect()
    }

    fn store(&mut self, rect: FieldRect, values: &[u8]) {
        let mut backend = self.backend.borrow_mut();
        for (coord, &value) in rect.iter().zip(values) {
            backend.set_weight(self.layer, coord, value, self.blend);
        }
        backend.notify_changed(rect, FieldPlane::Weight);
    }
}

impl InterpolatingAccessor for WeightAccessor {
    fn sample(&self, x: f32, y: f32) -> Option<f32> {
        let backend = self.backend.borrow();
        sample_with(x, y, |c| backend.weight(self.layer, c).map(f32::from))
    }
}

/// Every layer's weight packed per cell, written without renormalising.
pub struct FullWeightAccessor {
    backend: SharedBackend,
}

impl FullWeightAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn layer_count(&self) -> usize {
        self.backend.borrow().layers().len()
    }
}

impl FieldAccessor for FullWeightAccessor {
    type Value = Vec<u8>;

    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, Vec<u8>> {
        let backend = self.backend.borrow();
        rect.iter()
            .filter_map(|c| backend.weights(c).map(|v| (c, v)))
            .collect()
    }

    fn store(&mut self, rect: FieldRect, values: &[Vec<u8>]) {
        let mut backend = self.backend.borrow_mut();
        for (coord, packed) in rect.iter().zip(values) {
            if !packed.is_empty() {
                backend.set_weights(coord, packed);
            }
        }
        backend.notify_changed(rect, FieldPlane::Weight);
    }
}

/// The 0..255 selection strength mask.
pub struct SelectionMaskAccessor {
    backend: SharedBackend,
}

impl SelectionMaskAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }
}

impl FieldAccessor for SelectionMaskAccessor {
    type Value = u8;

    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, u8> {
        let backend = self.backend.borrow();
        rect.iter()
            .filter_map(|c| backend.selection_mask(c).map(|v| (c, v)))
            .collect()
    }

    fn store(&mut self, rect: FieldRect, values: &[u8]) {
        let mut backend = self.backend.borrow_mut();
        for (coord, &value) in rect.iter().zip(values) {
            backend.set_selection_mask(coord, value);
        }
        backend.notify_changed(rect, FieldPlane::Selection);
    }
}

/// The visibility (hole) flag, 0 visible and 255 hidden.
pub struct VisibilityAccessor {
    backend: SharedBackend,
}

impl VisibilityAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }
}

impl FieldAccessor for VisibilityAccessor {
    type Value = u8;

    fn fetch(&self, rect: FieldRect) -> HashMap<FieldCoord, u8> {
        let backend = self.backend.borrow();
        rect.iter()
            .filter_map(|c| backend.visibility(c).map(|v| (c, v)))
            .collect()
    }

    fn store(&mut self, rect: FieldRect, values: &[u8]) {
        let mut backend = self.backend.borrow_mut();
        for (coord, &value) in rect.iter().zip(values) {
            backend.set_visibility(coord, value);
        }
        backend.notify_changed(rect, FieldPlane::Visibility);
    }
}
