//! Transfer gizmo: a movable, rotatable rectangle that carries a resampled
//! copy of terrain data between field locations.
//!
//! Coordinates:
//! - field space: cell units of the terrain, `location.xy` is the gizmo centre
//! - gizmo local space: raster units of the sampled buffer, `(0, 0)` at the
//!   first sample of the copied rectangle
//!
//! Heights are kept relative to `location.z` so lifting the gizmo lifts the
//! pasted surface.

use std::collections::{BTreeMap, HashMap};

use glam::{Mat2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::field::{FieldCoord, FieldRect};

/// What a gizmo buffer holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GizmoDataKind {
    #[default]
    None,
    Height,
    Weight,
    HeightAndWeight,
}

impl GizmoDataKind {
    pub fn has_height(self) -> bool {
        matches!(self, GizmoDataKind::Height | GizmoDataKind::HeightAndWeight)
    }

    pub fn has_weight(self) -> bool {
        matches!(self, GizmoDataKind::Weight | GizmoDataKind::HeightAndWeight)
    }

    pub fn with_height(self) -> Self {
        if self.has_weight() {
            GizmoDataKind::HeightAndWeight
        } else {
            GizmoDataKind::Height
        }
    }

    pub fn with_weight(self) -> Self {
        if self.has_height() {
            GizmoDataKind::HeightAndWeight
        } else {
            GizmoDataKind::Weight
        }
    }
}

/// One resampled cell of the gizmo buffer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GizmoSample {
    /// Selection strength captured with the sample.
    pub ratio: f32,
    /// Height relative to the gizmo's reference height.
    pub height: f32,
    pub weights: BTreeMap<String, f32>,
}

/// Serialized form of a gizmo buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct GizmoClipboard {
    width: f32,
    height: f32,
    scale_xy: f32,
    size_x: usize,
    size_y: usize,
    kind: GizmoDataKind,
    layer_names: Vec<String>,
    samples: Vec<(i32, i32, GizmoSample)>,
}

#[derive(Clone, Debug)]
pub struct Gizmo {
    /// Centre in field cells; `z` is the reference height in raw height units.
    pub location: Vec3,
    /// Rotation about the vertical axis, degrees.
    pub yaw: f32,
    /// Extent in world units.
    pub width: f32,
    pub height: f32,
    pub flip_x: bool,
    pub flip_y: bool,

    cached_width: f32,
    cached_height: f32,
    cached_scale_xy: f32,
    size_x: usize,
    size_y: usize,
    kind: GizmoDataKind,
    layer_names: Vec<String>,
    samples: HashMap<FieldCoord, GizmoSample>,
}

impl Default for Gizmo {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 8.0, 8.0)
    }
}

impl Gizmo {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            location: center.extend(0.0),
            yaw: 0.0,
            width,
            height,
            flip_x: false,
            flip_y: false,
            cached_width: width,
            cached_height: height,
            cached_scale_xy: 1.0,
            size_x: 0,
            size_y: 0,
            kind: GizmoDataKind::None,
            layer_names: Vec::new(),
            samples: HashMap::new(),
        }
    }

    fn rotation(&self) -> Mat2 {
        Mat2::from_angle(self.yaw.to_radians())
    }

    fn center(&self) -> Vec2 {
        self.location.truncate()
    }

    /// Raster size of the buffer a copy at `scale_xy` produces.
    pub fn raster_size(&self, scale_xy: f32) -> (usize, usize) {
        (
            (self.width / scale_xy).ceil().max(0.0) as usize,
            (self.height / scale_xy).ceil().max(0.0) as usize,
        )
    }

    /// Field position of raster sample `(x, y)` for a copy at `scale_xy`.
    pub fn raster_to_field(&self, x: f32, y: f32, scale_xy: f32) -> Vec2 {
        let half_w = (self.width - scale_xy) / (2.0 * scale_xy);
        let half_h = (self.height - scale_xy) / (2.0 * scale_xy);
        self.rotation() * Vec2::new(x - half_w, y - half_h) + self.center()
    }

    /// Buffer position that a field cell pastes from, following any resize
    /// of the gizmo since the copy.
    pub fn field_to_raster(&self, field: Vec2, scale_xy: f32) -> Vec2 {
        let half_w = self.width / (2.0 * scale_xy);
        let half_h = self.height / (2.0 * scale_xy);
        let mut rel = self.rotation().transpose() * (field - self.center());
        if self.flip_x {
            rel.x = -rel.x;
        }
        if self.flip_y {
            rel.y = -rel.y;
        }
        let scale = self.paste_scale(scale_xy);
        Vec2::new(rel.x + half_w - 0.5, rel.y + half_h - 0.5) * scale
    }

    fn paste_scale(&self, scale_xy: f32) -> Vec2 {
        let sx = if self.width > 0.0 {
            self.cached_width / self.width
        } else {
            1.0
        };
        let sy = if self.height > 0.0 {
            self.cached_height / self.height
        } else {
            1.0
        };
        Vec2::new(sx, sy) * (scale_xy / self.cached_scale_xy)
    }

    /// Position inside the gizmo footprint, `[0, w] x [0, h]` cell units when inside.
    pub fn footprint_local(&self, field: Vec2, scale_xy: f32) -> Vec2 {
        let w = self.width / scale_xy;
        let h = self.height / scale_xy;
        let rel = self.rotation().transpose() * (field - self.center());
        rel + Vec2::new(w * 0.5 - 0.5, h * 0.5 - 0.5)
    }

    /// Footprint extent in cells.
    pub fn footprint_size(&self, scale_xy: f32) -> Vec2 {
        Vec2::new(self.width / scale_xy, self.height / scale_xy)
    }

    /// Field cells that bound the rotated rectangle.
    pub fn field_rect(&self, scale_xy: f32) -> FieldRect {
        let half = self.footprint_size(scale_xy) * 0.5;
        let rot = self.rotation();
        let center = self.center();
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for corner in [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(-half.x, half.y),
            Vec2::new(half.x, half.y),
        ] {
            let p = rot * corner + center;
            min = min.min(p);
            max = max.max(p);
        }
        // Rotation leaves tiny residues on exact corners.
        const EPS: f32 = 1e-4;
        FieldRect::new(
            (min.x + EPS).floor() as i32,
            (min.y + EPS).floor() as i32,
            (max.x - EPS).ceil() as i32,
            (max.y - EPS).ceil() as i32,
        )
    }

    /// Drop the buffer and remember the dimensions of the next copy.
    pub fn begin_capture(&mut self, scale_xy: f32) {
        self.samples.clear();
        self.layer_names.clear();
        self.kind = GizmoDataKind::None;
        self.cached_width = self.width;
        self.cached_height = self.height;
        self.cached_scale_xy = scale_xy;
        let (sx, sy) = self.raster_size(scale_xy);
        self.size_x = sx;
        self.size_y = sy;
    }

    pub fn set_kind(&mut self, kind: GizmoDataKind) {
        self.kind = kind;
    }

    pub fn kind(&self) -> GizmoDataKind {
        self.kind
    }

    pub fn set_layer_names(&mut self, names: Vec<String>) {
        self.layer_names = names;
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    pub fn has_data(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn raster_dimensions(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    pub fn sample(&self, x: i32, y: i32) -> Option<&GizmoSample> {
        self.samples.get(&FieldCoord::new(x, y))
    }

    pub fn insert_sample(&mut self, x: i32, y: i32, sample: GizmoSample) {
        self.samples.insert(FieldCoord::new(x, y), sample);
    }

    pub fn clear_data(&mut self) {
        self.samples.clear();
        self.kind = GizmoDataKind::None;
    }

    /// Serialise the buffer so another session or field can paste it.
    pub fn export_clipboard(&self) -> Result<String, serde_json::Error> {
        let mut samples: Vec<(i32, i32, GizmoSample)> = self
            .samples
            .iter()
            .map(|(c, s)| (c.x, c.y, s.clone()))
            .collect();
        samples.sort_by_key(|(x, y, _)| FieldCoord::new(*x, *y));
        let clip = GizmoClipboard {
            width: self.cached_width,
            height: self.cached_height,
            scale_xy: self.cached_scale_xy,
            size_x: self.size_x,
            size_y: self.size_y,
            kind: self.kind,
            layer_names: self.layer_names.clone(),
            samples,
        };
        serde_json::to_string(&clip)
    }

    /// Replace the buffer with clipboard text; the gizmo takes the copied size.
    pub fn import_clipboard(&mut self, text: &str) -> Result<(), serde_json::Error> {
        let clip: GizmoClipboard = serde_json::from_str(text)?;
        self.width = clip.width;
        self.height = clip.height;
        self.cached_width = clip.width;
        self.cached_height = clip.height;
        self.cached_scale_xy = clip.scale_xy;
        self.size_x = clip.size_x;
        self.size_y = clip.size_y;
        self.kind = clip.kind;
        self.layer_names = clip.layer_names;
        self.samples = clip
            .samples
            .into_iter()
            .map(|(x, y, s)| (FieldCoord::new(x, y), s))
            .collect();
        Ok(())
    }
}
