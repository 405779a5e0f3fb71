//! Paint: raise or lower heights, or add and remove layer weight.

use std::collections::HashMap;

use glam::Vec3;

use crate::field::{lerp, FieldCoord, FieldRect};
use crate::target::{TargetKind, ToolTarget};

use super::ApplyParams;

pub struct PaintTool {
    target: Box<dyn ToolTarget>,
    /// Influence each cell has received this stroke, for weight relaxation.
    total_influence: HashMap<FieldCoord, f32>,
}

impl PaintTool {
    pub fn new(target: Box<dyn ToolTarget>) -> Self {
        Self {
            target,
            total_influence: HashMap::new(),
        }
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        self.target.cache_window(window);
        let mut data = self.target.read_window(window);

        let is_height = self.target.kind() == TargetKind::Heightmap;
        let use_clay = p.settings.use_clay_brush && is_height;
        let use_target_value = p.settings.use_weight_target_value && !is_height;

        // Heights paint from the stroke-start surface so a stroke never stacks.
        // Weights without a target drift from original toward live the longer
        // a cell has been painted.
        let source = if is_height {
            self.target.read_original_window(window)
        } else if !use_target_value {
            let mut source = self.target.read_original_window(window);
            let rate = p.settings.weight_relax_rate;
            for (i, coord) in window.iter().enumerate() {
                if let Some(&total) = self.total_influence.get(&coord) {
                    source[i] = lerp(source[i], data[i], (total * rate).min(1.0));
                }
            }
            source
        } else {
            data.clone()
        };

        let adjusted = self.target.strength_multiplier(p.settings.brush_radius);
        let dest_value = (255.0 * p.settings.weight_target_value).clamp(0.0, 255.0);
        let clay = if use_clay {
            self.clay_plane(p, window, &source, adjusted)
        } else {
            None
        };

        for (coord, influence) in p.influence.iter() {
            let Some(i) = window.index_of(coord) else {
                continue;
            };
            *self.total_influence.entry(coord).or_insert(0.0) += influence;

            let amount = influence * p.strength() * adjusted;
            let current = data[i];
            data[i] = if use_target_value {
                lerp(current, dest_value, amount / adjusted)
            } else if let Some((normal, w)) = clay {
                let world = self.target.to_world(coord.x as f32, coord.y as f32, source[i]);
                let plane_z = (w - normal.x * world.x - normal.y * world.y) / normal.z;
                let plane = self
                    .target
                    .from_world(Vec3::new(world.x, world.y, plane_z))
                    .z;
                let value = lerp(source[i], plane, influence).round();
                if p.invert {
                    value.min(current)
                } else {
                    value.max(current)
                }
            } else if p.invert {
                (source[i] - amount.round()).min(current)
            } else {
                (source[i] + amount.round()).max(current)
            };
        }

        self.target.write_window(window, &data);
    }

    /// Plane through the brush's weighted mean point, pushed along its mean
    /// normal by the paint amount: `(normal, normal . point)` in world space.
    fn clay_plane(
        &self,
        p: &ApplyParams,
        window: FieldRect,
        source: &[f32],
        adjusted: f32,
    ) -> Option<(Vec3, f32)> {
        let width = window.width();
        let mut normals = vec![Vec3::ZERO; source.len()];
        let world = |i: usize| {
            let x = window.x1 + (i % width) as i32;
            let y = window.y1 + (i / width) as i32;
            self.target.to_world(x as f32, y as f32, source[i])
        };
        for row in 0..window.height().saturating_sub(1) {
            for col in 0..width.saturating_sub(1) {
                let i00 = row * width + col;
                let i10 = i00 + 1;
                let i01 = i00 + width;
                let i11 = i01 + 1;
                let (v00, v10, v01, v11) = (world(i00), world(i10), world(i01), world(i11));
                let face1 = (v00 - v10).cross(v10 - v11).normalize_or_zero();
                let face2 = (v11 - v01).cross(v01 - v00).normalize_or_zero();
                normals[i00] += face1 + face2;
                normals[i10] += face1;
                normals[i01] += face2;
                normals[i11] += face1 + face2;
            }
        }

        let mut point = Vec3::ZERO;
        let mut normal = Vec3::ZERO;
        let mut total = 0.0;
        for (coord, influence) in p.influence.iter() {
            let Some(i) = window.index_of(coord) else {
                continue;
            };
            point += Vec3::new(coord.x as f32, coord.y as f32, source[i]) * influence;
            normal += normals[i].normalize_or_zero() * influence;
            total += influence;
        }
        if total <= 0.0 {
            return None;
        }
        let normal = normal.normalize_or_zero();
        if normal.z.abs() < 1e-6 {
            return None;
        }
        point /= total;
        let origin = self.target.to_world(point.x, point.y, point.z);

        let strength = p.strength() * adjusted;
        let lift = self.target.to_world(0.0, 0.0, strength).z - self.target.to_world(0.0, 0.0, 0.0).z;
        let lift = if p.invert { -lift } else { lift };
        let on_plane = origin + normal * lift;
        Some((normal, normal.dot(on_plane)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LayerInfo, TerrainBackend};
    use crate::field::HEIGHT_NEUTRAL;
    use crate::settings::ToolSettings;
    use crate::storage::TerrainStore;
    use crate::target::{HeightTarget, WeightTarget};
    use crate::tools::test_support::{coord, disc_influence};
    use glam::Vec2;

    const N: u16 = HEIGHT_NEUTRAL;

    fn settings() -> ToolSettings {
        ToolSettings {
            brush_radius: 4.0,
            tool_strength: 1.0,
            ..Default::default()
        }
    }

    fn params<'a>(
        settings: &'a ToolSettings,
        influence: &'a crate::brush::BrushInfluence,
        invert: bool,
    ) -> ApplyParams<'a> {
        ApplyParams {
            settings,
            influence,
            pressure: 1.0,
            invert,
            position: Vec2::new(8.0, 8.0),
        }
    }

    #[test]
    fn test_raise_center_by_full_amount() {
        let store = TerrainStore::flat(16, 1, 1, N).into_shared();
        let mut tool = PaintTool::new(Box::new(HeightTarget::new(store.clone())));
        let settings = settings();
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, false));

        let store = store.borrow();
        // radius 4 * 128 / scale.z 1
        assert_eq!(store.height(coord(8, 8)), Some(N + 512));
        assert!(store.height(coord(9, 8)) < store.height(coord(8, 8)));
        assert_eq!(store.height(coord(0, 0)), Some(N));
    }

    #[test]
    fn test_repeated_apply_does_not_stack() {
        let store = TerrainStore::flat(16, 1, 1, N).into_shared();
        let mut tool = PaintTool::new(Box::new(HeightTarget::new(store.clone())));
        let settings = settings();
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, false));
        let once = store.borrow().height(coord(8, 8));
        tool.apply(&params(&settings, &inf, false));
        assert_eq!(store.borrow().height(coord(8, 8)), once);
    }

    #[test]
    fn test_invert_lowers() {
        let store = TerrainStore::flat(16, 1, 1, N).into_shared();
        let mut tool = PaintTool::new(Box::new(HeightTarget::new(store.clone())));
        let settings = settings();
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, true));
        assert_eq!(store.borrow().height(coord(8, 8)), Some(N - 512));
    }

    #[test]
    fn test_clay_on_flat_ground_lifts_like_paint() {
        let store = TerrainStore::flat(16, 1, 1, N).into_shared();
        let mut tool = PaintTool::new(Box::new(HeightTarget::new(store.clone())));
        let settings = ToolSettings {
            use_clay_brush: true,
            ..settings()
        };
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, false));
        let center = store.borrow().height(coord(8, 8)).unwrap();
        assert!((center as i32 - (N as i32 + 512)).abs() <= 1, "got {center}");
        assert_eq!(store.borrow().height(coord(0, 0)), Some(N));
    }

    #[test]
    fn test_weight_target_value() {
        let mut store = TerrainStore::flat(16, 1, 1, N);
        store.add_layer(LayerInfo::new("grass"));
        let store = store.into_shared();
        let target = WeightTarget::new(store.clone(), "grass").unwrap();
        let mut tool = PaintTool::new(Box::new(target));
        let settings = ToolSettings {
            use_weight_target_value: true,
            weight_target_value: 0.5,
            ..settings()
        };
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, false));
        let w = store.borrow().weight(0, coord(8, 8)).unwrap();
        assert!((127..=128).contains(&w), "got {w}");
    }

    #[test]
    fn test_weight_paint_adds_layer() {
        let mut store = TerrainStore::flat(16, 1, 1, N);
        store.add_layer(LayerInfo::new("grass"));
        let store = store.into_shared();
        let target = WeightTarget::new(store.clone(), "grass").unwrap();
        let mut tool = PaintTool::new(Box::new(target));
        let settings = ToolSettings {
            tool_strength: 0.2,
            ..settings()
        };
        let inf = disc_influence(8, 8, 3.0);
        tool.apply(&params(&settings, &inf, false));
        // 0.2 * 255
        assert_eq!(store.borrow().weight(0, coord(8, 8)), Some(51));
        assert_eq!(store.borrow().weight(0, coord(0, 0)), Some(0));
    }
}
