//! Gizmo transfer: Copy resamples the field under the gizmo into its raster
//! buffer; Paste resamples the buffer back onto whatever cells the gizmo
//! covers now, following any move, rotation, resize or flip in between.

use glam::Vec2;

use crate::accessor::{bilerp_sparse, FullWeightAccessor, HeightAccessor};
use crate::backend::SharedBackend;
use crate::edit_cache::EditCache;
use crate::field::{lerp, FieldCoord, FieldRect, FieldValue};
use crate::gizmo::{Gizmo, GizmoDataKind, GizmoSample};
use crate::selection::SelectionState;
use crate::settings::PasteMode;
use crate::target::{TargetKind, ToolTarget};

use super::ApplyParams;

/// Caches shared by both directions: every plane when `apply_to_all_targets`
/// is set, otherwise only the stroke target.
struct TransferCaches {
    heights: EditCache<HeightAccessor>,
    weights: EditCache<FullWeightAccessor>,
    layer_names: Vec<String>,
    target: Box<dyn ToolTarget>,
}

impl TransferCaches {
    fn new(backend: SharedBackend, target: Box<dyn ToolTarget>) -> Self {
        let layer_names = backend
            .borrow()
            .layers()
            .into_iter()
            .map(|l| l.name)
            .collect();
        Self {
            heights: EditCache::new(HeightAccessor::new(backend.clone())),
            weights: EditCache::new(FullWeightAccessor::new(backend)),
            layer_names,
            target,
        }
    }

    fn layer_count(&self) -> usize {
        self.layer_names.len()
    }
}

fn clamp_to(rect: FieldRect, x: i32, y: i32) -> FieldCoord {
    FieldCoord::new(x.clamp(rect.x1, rect.x2), y.clamp(rect.y1, rect.y2))
}

/// The four cells around `p`, clamped into `rect`, and the fractional offsets.
fn corners(rect: FieldRect, p: Vec2) -> ([FieldCoord; 4], f32, f32) {
    let lx = p.x.floor() as i32;
    let ly = p.y.floor() as i32;
    (
        [
            clamp_to(rect, lx, ly),
            clamp_to(rect, lx + 1, ly),
            clamp_to(rect, lx, ly + 1),
            clamp_to(rect, lx + 1, ly + 1),
        ],
        p.x - lx as f32,
        p.y - ly as f32,
    )
}

fn bilerp4(c: [Option<f32>; 4], fx: f32, fy: f32) -> Option<f32> {
    bilerp_sparse(c[0], c[1], c[2], c[3], fx, fy)
}

pub struct CopyTool {
    caches: TransferCaches,
}

impl CopyTool {
    pub fn new(backend: SharedBackend, target: Box<dyn ToolTarget>) -> Self {
        Self {
            caches: TransferCaches::new(backend, target),
        }
    }

    /// Capture the field under `gizmo`. Returns whether any sample carries a
    /// non-zero selection ratio; when none does the buffer is cleared.
    pub fn apply(
        &mut self,
        p: &ApplyParams,
        gizmo: &mut Gizmo,
        selection: Option<&SelectionState>,
        scale_xy: f32,
    ) -> bool {
        let window = p.window();
        let all = p.settings.apply_to_all_targets;
        let caches = &mut self.caches;
        let layers = caches.layer_count();

        let (heights, weights) = if all {
            caches.heights.cache_window(window);
            caches.weights.cache_window(window);
            let weights: Vec<f32> = caches
                .weights
                .read_packed_window(window, layers)
                .into_iter()
                .map(f32::from)
                .collect();
            (caches.heights.read_window_f32(window), weights)
        } else {
            caches.target.cache_window(window);
            (caches.target.read_window(window), Vec::new())
        };
        let present = |c: FieldCoord| {
            if all {
                caches.heights.value(c).is_some()
            } else {
                caches.target.has_value(c)
            }
        };

        let full_copy = !p.settings.use_selected_region
            || selection.map_or(true, |s| !s.has_region());
        let target_kind = caches.target.kind();
        let copy_height = all || target_kind == TargetKind::Heightmap;

        gizmo.begin_capture(scale_xy);
        let (size_x, size_y) = gizmo.raster_dimensions();
        let reference = gizmo.location.z;
        let mut did_copy = false;

        for y in 0..size_y {
            for x in 0..size_x {
                let field = gizmo.raster_to_field(x as f32, y as f32, scale_xy);
                let (cells, fx, fy) = corners(window, field);
                let found = cells.map(|c| present(c).then(|| window.index_of(c)).flatten());
                if found.iter().all(Option::is_none) {
                    continue;
                }
                let ratio = if full_copy {
                    1.0
                } else {
                    let region = cells.map(|c| {
                        Some(selection.and_then(|s| s.region_value(c)).unwrap_or(0.0))
                    });
                    bilerp4(region, fx, fy).unwrap_or(0.0)
                };

                let mut sample = GizmoSample {
                    ratio,
                    ..Default::default()
                };
                if all {
                    let h = bilerp4(found.map(|i| i.map(|i| heights[i])), fx, fy);
                    sample.height = h.unwrap_or(0.0) - reference;
                    for (l, name) in caches.layer_names.iter().enumerate() {
                        let w = bilerp4(found.map(|i| i.map(|i| weights[i * layers + l])), fx, fy);
                        sample.weights.insert(name.clone(), w.unwrap_or(0.0));
                    }
                } else {
                    let v = bilerp4(found.map(|i| i.map(|i| heights[i])), fx, fy).unwrap_or(0.0);
                    if copy_height {
                        sample.height = v - reference;
                    } else if let Some(name) = caches.target.layer_name() {
                        sample.weights.insert(name.to_string(), v);
                    }
                }
                if ratio > 0.0 {
                    did_copy = true;
                }
                gizmo.insert_sample(x as i32, y as i32, sample);
            }
        }

        let mut kind = GizmoDataKind::None;
        let mut names = Vec::new();
        if copy_height {
            kind = kind.with_height();
        }
        if all && layers > 0 {
            kind = kind.with_weight();
            names = caches.layer_names.clone();
        } else if !all && target_kind == TargetKind::Weightmap {
            kind = kind.with_weight();
            names.extend(caches.target.layer_name().map(str::to_string));
        }
        gizmo.set_kind(kind);
        gizmo.set_layer_names(names);

        if !did_copy {
            gizmo.clear_data();
        }
        did_copy
    }
}

pub struct PasteTool {
    caches: TransferCaches,
}

impl PasteTool {
    pub fn new(backend: SharedBackend, target: Box<dyn ToolTarget>) -> Self {
        Self {
            caches: TransferCaches::new(backend, target),
        }
    }

    /// Write the gizmo buffer over the brushed cells. With `gizmo_amount` the
    /// brush influence is used as-is instead of scaled by strength.
    pub fn apply(&mut self, p: &ApplyParams, gizmo: &Gizmo, gizmo_amount: bool, scale_xy: f32) {
        if !gizmo.has_data() {
            return;
        }
        let window = p.window();
        let all = p.settings.apply_to_all_targets;
        let mode = p.settings.paste_mode;
        let caches = &mut self.caches;
        let layers = caches.layer_count();
        let kind = gizmo.kind();
        let reference = gizmo.location.z;

        let paint = |influence: f32| {
            if gizmo_amount {
                influence
            } else {
                influence * p.strength()
            }
        };
        let cell_samples = |coord: FieldCoord| {
            let g = gizmo.field_to_raster(Vec2::new(coord.x as f32, coord.y as f32), scale_xy);
            let lx = g.x.floor() as i32;
            let ly = g.y.floor() as i32;
            (
                [
                    gizmo.sample(lx, ly),
                    gizmo.sample(lx + 1, ly),
                    gizmo.sample(lx, ly + 1),
                    gizmo.sample(lx + 1, ly + 1),
                ],
                g.x - lx as f32,
                g.y - ly as f32,
            )
        };

        if all {
            caches.heights.cache_window(window);
            caches.weights.cache_window(window);
            if kind.has_height() {
                let mut heights = caches.heights.read_window_f32(window);
                for (coord, influence) in p.influence.iter() {
                    let Some(i) = window.index_of(coord) else {
                        continue;
                    };
                    let (samples, fx, fy) = cell_samples(coord);
                    heights[i] = blend(mode, heights[i], &samples, fx, fy, paint(influence), |s| {
                        s.height + reference
                    });
                }
                caches.heights.write_window_f32(window, &heights);
            }
            if kind.has_weight() && layers > 0 {
                let mut weights: Vec<f32> = caches
                    .weights
                    .read_packed_window(window, layers)
                    .into_iter()
                    .map(f32::from)
                    .collect();
                for (coord, influence) in p.influence.iter() {
                    let Some(i) = window.index_of(coord) else {
                        continue;
                    };
                    let (samples, fx, fy) = cell_samples(coord);
                    for (l, name) in caches.layer_names.iter().enumerate() {
                        if !gizmo.layer_names().contains(name) {
                            continue;
                        }
                        let slot = i * layers + l;
                        weights[slot] = blend(mode, weights[slot], &samples, fx, fy, paint(influence), |s| {
                            s.weights.get(name).copied().unwrap_or(0.0)
                        });
                    }
                }
                let packed: Vec<u8> = weights.into_iter().map(u8::from_f32).collect();
                caches.weights.write_packed_window(window, layers, &packed);
            }
        } else {
            let target = &mut caches.target;
            let layer = target.layer_name().map(str::to_string);
            let pastes = match target.kind() {
                TargetKind::Heightmap => kind.has_height(),
                TargetKind::Weightmap => {
                    kind.has_weight()
                        && layer
                            .as_ref()
                            .is_some_and(|name| gizmo.layer_names().contains(name))
                }
            };
            if !pastes {
                return;
            }
            target.cache_window(window);
            let mut data = target.read_window(window);
            for (coord, influence) in p.influence.iter() {
                let Some(i) = window.index_of(coord) else {
                    continue;
                };
                let (samples, fx, fy) = cell_samples(coord);
                data[i] = blend(mode, data[i], &samples, fx, fy, paint(influence), |s| {
                    match &layer {
                        Some(name) => s.weights.get(name).copied().unwrap_or(0.0),
                        None => s.height + reference,
                    }
                });
            }
            target.write_window(window, &data);
        }
    }
}

/// Blend one cell toward the buffer. Each corner sample is first faded
/// toward the current value by its selection ratio; missing corners keep
/// the current value.
fn blend(
    mode: PasteMode,
    current: f32,
    samples: &[Option<&GizmoSample>; 4],
    fx: f32,
    fy: f32,
    paint: f32,
    value: impl Fn(&GizmoSample) -> f32,
) -> f32 {
    let corner = |s: Option<&GizmoSample>| match s {
        Some(s) => lerp(current, value(s), s.ratio),
        None => current,
    };
    let dest = lerp(
        lerp(corner(samples[0]), corner(samples[1]), fx),
        lerp(corner(samples[2]), corner(samples[3]), fx),
        fy,
    );
    let allowed = match mode {
        PasteMode::Both => true,
        PasteMode::Add => current < dest,
        PasteMode::Sub => current > dest,
    };
    if allowed {
        lerp(current, dest, paint)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LayerInfo, TerrainBackend};
    use crate::brush::{gizmo_influence, BrushContext, BrushInfluence, BrushParams};
    use crate::field::HEIGHT_NEUTRAL;
    use crate::settings::ToolSettings;
    use crate::storage::TerrainStore;
    use crate::target::{HeightTarget, WeightTarget};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ramp(c: FieldCoord) -> u16 {
        HEIGHT_NEUTRAL + (c.x * 10 + c.y * 3) as u16
    }

    fn ramp_store() -> Rc<RefCell<TerrainStore>> {
        let mut store = TerrainStore::flat(32, 1, 1, 0);
        store.fill_heights(ramp);
        store.into_shared()
    }

    fn influence(store: &Rc<RefCell<TerrainStore>>, gizmo: &Gizmo) -> BrushInfluence {
        let backend = store.borrow();
        let ctx = BrushContext {
            params: BrushParams::default(),
            backend: &*backend,
            gizmo,
            mask: None,
        };
        gizmo_influence(&ctx)
    }

    fn params<'a>(settings: &'a ToolSettings, influence: &'a BrushInfluence) -> ApplyParams<'a> {
        ApplyParams {
            settings,
            influence,
            pressure: 1.0,
            invert: false,
            position: Vec2::ZERO,
        }
    }

    fn copy(store: &Rc<RefCell<TerrainStore>>, gizmo: &mut Gizmo, settings: &ToolSettings) -> bool {
        let inf = influence(store, gizmo);
        let mut tool = CopyTool::new(store.clone(), Box::new(HeightTarget::new(store.clone())));
        tool.apply(&params(settings, &inf), gizmo, None, 1.0)
    }

    fn paste(store: &Rc<RefCell<TerrainStore>>, gizmo: &Gizmo, settings: &ToolSettings) {
        let inf = influence(store, gizmo);
        let mut tool = PasteTool::new(store.clone(), Box::new(HeightTarget::new(store.clone())));
        tool.apply(&params(settings, &inf), gizmo, true, 1.0);
    }

    #[test]
    fn test_copy_fills_raster() {
        let store = ramp_store();
        let mut gizmo = Gizmo::new(Vec2::new(10.5, 10.5), 8.0, 8.0);
        assert!(copy(&store, &mut gizmo, &ToolSettings::default()));
        assert_eq!(gizmo.raster_dimensions(), (8, 8));
        assert_eq!(gizmo.sample_count(), 64);
        assert_eq!(gizmo.kind(), GizmoDataKind::Height);
        let first = gizmo.sample(0, 0).unwrap();
        assert_eq!(first.height, ramp(FieldCoord::new(7, 7)) as f32);
        assert_eq!(first.ratio, 1.0);
    }

    #[test]
    fn test_paste_at_offset_reproduces_source() {
        let store = ramp_store();
        let settings = ToolSettings::default();
        let mut gizmo = Gizmo::new(Vec2::new(10.5, 10.5), 8.0, 8.0);
        copy(&store, &mut gizmo, &settings);

        gizmo.location.x = 20.5;
        paste(&store, &gizmo, &settings);

        let store = store.borrow();
        for y in 7..=14 {
            for x in 17..=24 {
                assert_eq!(
                    store.height(FieldCoord::new(x, y)),
                    Some(ramp(FieldCoord::new(x - 10, y))),
                    "cell ({x}, {y})"
                );
            }
        }
        assert_eq!(store.height(FieldCoord::new(25, 10)), Some(ramp(FieldCoord::new(25, 10))));
    }

    #[test]
    fn test_reference_height_lifts_paste() {
        let store = ramp_store();
        let settings = ToolSettings::default();
        let mut gizmo = Gizmo::new(Vec2::new(10.5, 10.5), 8.0, 8.0);
        copy(&store, &mut gizmo, &settings);
        gizmo.location.z = 100.0;
        paste(&store, &gizmo, &settings);
        let expected = ramp(FieldCoord::new(12, 12)) + 100;
        assert_eq!(store.borrow().height(FieldCoord::new(12, 12)), Some(expected));
    }

    #[test]
    fn test_unselected_copy_is_discarded() {
        let store = ramp_store();
        let settings = ToolSettings::default();
        let mut gizmo = Gizmo::new(Vec2::new(10.5, 10.5), 8.0, 8.0);
        let mut selection = SelectionState::new();
        selection.set_region_value(FieldCoord::new(30, 30), 1.0);
        let inf = influence(&store, &gizmo);
        let mut tool = CopyTool::new(store.clone(), Box::new(HeightTarget::new(store.clone())));
        let copied = tool.apply(&params(&settings, &inf), &mut gizmo, Some(&selection), 1.0);
        assert!(!copied);
        assert!(!gizmo.has_data());
    }

    #[test]
    fn test_add_mode_never_lowers() {
        let store = ramp_store();
        let settings = ToolSettings {
            paste_mode: PasteMode::Add,
            ..Default::default()
        };
        let mut gizmo = Gizmo::new(Vec2::new(10.5, 10.5), 8.0, 8.0);
        copy(&store, &mut gizmo, &settings);
        // Source is 100 lower than the destination everywhere.
        gizmo.location.x = 20.5;
        paste(&store, &gizmo, &settings);
        assert_eq!(store.borrow().height(FieldCoord::new(20, 10)), Some(ramp(FieldCoord::new(20, 10))));
    }

    #[test]
    fn test_weight_layer_transfer() {
        let mut store = TerrainStore::flat(32, 1, 1, HEIGHT_NEUTRAL);
        store.add_layer(LayerInfo::new("grass"));
        for y in 0..32 {
            for x in 0..16 {
                store.set_weights(FieldCoord::new(x, y), &[200]);
            }
        }
        let store = store.into_shared();
        let settings = ToolSettings {
            apply_to_all_targets: false,
            ..Default::default()
        };
        let mut gizmo = Gizmo::new(Vec2::new(8.5, 8.5), 4.0, 4.0);
        let inf = influence(&store, &gizmo);
        let target = WeightTarget::new(store.clone(), "grass").unwrap();
        let mut copy_tool = CopyTool::new(store.clone(), Box::new(target));
        assert!(copy_tool.apply(&params(&settings, &inf), &mut gizmo, None, 1.0));
        assert_eq!(gizmo.kind(), GizmoDataKind::Weight);
        assert_eq!(gizmo.layer_names(), ["grass".to_string()]);

        gizmo.location.x = 24.5;
        let inf = influence(&store, &gizmo);
        let target = WeightTarget::new(store.clone(), "grass").unwrap();
        let mut paste_tool = PasteTool::new(store.clone(), Box::new(target));
        paste_tool.apply(&params(&settings, &inf), &gizmo, true, 1.0);
        assert_eq!(store.borrow().weight(0, FieldCoord::new(24, 8)), Some(200));
        assert_eq!(store.borrow().height(FieldCoord::new(24, 8)), Some(HEIGHT_NEUTRAL));
    }
}
