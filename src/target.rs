//! Edit targets: the field variant a stroke edits, and the small interface
//! through which tools read and write it without knowing the value type.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::accessor::{HeightAccessor, WeightAccessor};
use crate::backend::{SharedBackend, TerrainScale};
use crate::edit_cache::EditCache;
use crate::field::{FieldCoord, FieldRect, FieldValue, HEIGHT_INV_ZSCALE, HEIGHT_NEUTRAL, HEIGHT_ZSCALE};

/// Handle of a field registered with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetKind {
    #[default]
    Heightmap,
    Weightmap,
}

/// What the host wants the next stroke to edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTarget {
    pub field: FieldId,
    pub kind: TargetKind,
    /// Weight layer name; required for weightmap targets.
    pub layer: Option<String>,
}

impl EditTarget {
    pub fn heightmap(field: FieldId) -> Self {
        Self {
            field,
            kind: TargetKind::Heightmap,
            layer: None,
        }
    }

    pub fn weightmap(field: FieldId, layer: impl Into<String>) -> Self {
        Self {
            field,
            kind: TargetKind::Weightmap,
            layer: Some(layer.into()),
        }
    }
}

/// Stroke-scoped access to the edited field in `f32` storage units.
pub trait ToolTarget {
    fn kind(&self) -> TargetKind;

    /// Largest storable value.
    fn max_value(&self) -> f32;

    /// Storage units that strength 1 moves a cell.
    fn strength_multiplier(&self, brush_radius: f32) -> f32;

    /// Storage position to world position.
    fn to_world(&self, x: f32, y: f32, value: f32) -> Vec3;

    /// World position to storage position.
    fn from_world(&self, world: Vec3) -> Vec3;

    fn cache_window(&mut self, rect: FieldRect);
    fn read_window(&self, rect: FieldRect) -> Vec<f32>;
    fn read_original_window(&self, rect: FieldRect) -> Vec<f32>;

    /// Clamp, round and write back through the accessor.
    fn write_window(&mut self, rect: FieldRect, values: &[f32]);

    /// Whether the cell was found in storage when cached.
    fn has_value(&self, coord: FieldCoord) -> bool;

    fn point_value(&self, x: f32, y: f32) -> f32;
    fn point_normal(&self, x: i32, y: i32) -> Vec3;

    /// Layer name for weight targets.
    fn layer_name(&self) -> Option<&str> {
        None
    }
}

/// Raw 16-bit heights.
pub struct HeightTarget {
    cache: EditCache<HeightAccessor>,
    scale: TerrainScale,
}

impl HeightTarget {
    pub fn new(backend: SharedBackend) -> Self {
        let scale = backend.borrow().scale();
        Self {
            cache: EditCache::new(HeightAccessor::new(backend)),
            scale,
        }
    }
}

impl ToolTarget for HeightTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::Heightmap
    }

    fn max_value(&self) -> f32 {
        <u16 as FieldValue>::MAX
    }

    fn strength_multiplier(&self, brush_radius: f32) -> f32 {
        if self.scale.z > 0.0 {
            brush_radius * HEIGHT_INV_ZSCALE / self.scale.z
        } else {
            5.0 * HEIGHT_INV_ZSCALE
        }
    }

    fn to_world(&self, x: f32, y: f32, value: f32) -> Vec3 {
        Vec3::new(
            x * self.scale.xy,
            y * self.scale.xy,
            (value - HEIGHT_NEUTRAL as f32) * HEIGHT_ZSCALE * self.scale.z,
        )
    }

    fn from_world(&self, world: Vec3) -> Vec3 {
        let xy = if self.scale.xy != 0.0 { self.scale.xy } else { 1.0 };
        let z = if self.scale.z != 0.0 { self.scale.z } else { 1.0 };
        Vec3::new(
            world.x / xy,
            world.y / xy,
            world.z * HEIGHT_INV_ZSCALE / z + HEIGHT_NEUTRAL as f32,
        )
    }

    fn cache_window(&mut self, rect: FieldRect) {
        self.cache.cache_window(rect);
    }

    fn read_window(&self, rect: FieldRect) -> Vec<f32> {
        self.cache.read_window_f32(rect)
    }

    fn read_original_window(&self, rect: FieldRect) -> Vec<f32> {
        self.cache.read_original_window_f32(rect)
    }

    fn write_window(&mut self, rect: FieldRect, values: &[f32]) {
        self.cache.write_window_f32(rect, values);
    }

    fn has_value(&self, coord: FieldCoord) -> bool {
        self.cache.value(coord).is_some()
    }

    fn point_value(&self, x: f32, y: f32) -> f32 {
        self.cache.point_value(x, y)
    }

    fn point_normal(&self, x: i32, y: i32) -> Vec3 {
        self.cache.point_normal(x, y)
    }
}

/// One 8-bit weight layer.
pub struct WeightTarget {
    cache: EditCache<WeightAccessor>,
    layer: String,
}

impl WeightTarget {
    /// `None` when the backend has no layer called `layer`.
    pub fn new(backend: SharedBackend, layer: &str) -> Option<Self> {
        let accessor = WeightAccessor::new(backend, layer)?;
        Some(Self {
            cache: EditCache::new(accessor),
            layer: layer.to_string(),
        })
    }
}

impl ToolTarget for WeightTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::Weightmap
    }

    fn max_value(&self) -> f32 {
        <u8 as FieldValue>::MAX
    }

    fn strength_multiplier(&self, _brush_radius: f32) -> f32 {
        255.0
    }

    fn to_world(&self, x: f32, y: f32, value: f32) -> Vec3 {
        Vec3::new(x, y, value)
    }

    fn from_world(&self, world: Vec3) -> Vec3 {
        world
    }

    fn cache_window(&mut self, rect: FieldRect) {
        self.cache.cache_window(rect);
    }

    fn read_window(&self, rect: FieldRect) -> Vec<f32> {
        self.cache.read_window_f32(rect)
    }

    fn read_original_window(&self, rect: FieldRect) -> Vec<f32> {
        self.cache.read_original_window_f32(rect)
    }

    fn write_window(&mut self, rect: FieldRect, values: &[f32]) {
        self.cache.write_window_f32(rect, values);
    }

    fn has_value(&self, coord: FieldCoord) -> bool {
        self.cache.value(coord).is_some()
    }

    fn point_value(&self, x: f32, y: f32) -> f32 {
        self.cache.point_value(x, y)
    }

    fn point_normal(&self, x: i32, y: i32) -> Vec3 {
        self.cache.point_normal(x, y)
    }

    fn layer_name(&self) -> Option<&str> {
        Some(&self.layer)
    }
}

/// Open the stroke target for `target` on `backend`.
pub fn open_target(backend: SharedBackend, target: &EditTarget) -> Option<Box<dyn ToolTarget>> {
    match target.kind {
        TargetKind::Heightmap => Some(Box::new(HeightTarget::new(backend))),
        TargetKind::Weightmap => {
            let layer = target.layer.as_deref()?;
            WeightTarget::new(backend, layer).map(|t| Box::new(t) as Box<dyn ToolTarget>)
        }
    }
}
