//! Thermal erosion: material slides from each cell to lower 4-neighbours
//! wherever the slope exceeds the threshold. On weightmap targets the layer
//! weights travel with the material, resisted by each layer's hardness.

use crate::accessor::{FullWeightAccessor, HeightAccessor};
use crate::backend::SharedBackend;
use crate::debug_log::debug_log;
use crate::edit_cache::EditCache;
use crate::field::FieldCoord;
use crate::noise_field::NoiseParameter;
use crate::target::TargetKind;

use super::ApplyParams;

const NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub struct ErosionTool {
    heights: EditCache<HeightAccessor>,
    weights: EditCache<FullWeightAccessor>,
    hardness: Vec<f32>,
    transfer_weights: bool,
}

impl ErosionTool {
    pub fn new(backend: SharedBackend, kind: TargetKind) -> Self {
        let hardness = backend
            .borrow()
            .layers()
            .iter()
            .map(|l| l.hardness)
            .collect();
        Self {
            heights: EditCache::new(HeightAccessor::new(backend.clone())),
            weights: EditCache::new(FullWeightAccessor::new(backend)),
            hardness,
            transfer_weights: kind == TargetKind::Weightmap,
        }
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        let layers = self.hardness.len();
        self.heights.cache_window(window);
        self.weights.cache_window(window);
        let mut heights = self.heights.read_window_f32(window);
        let mut weights: Vec<f32> = self
            .weights
            .read_packed_window(window, layers)
            .into_iter()
            .map(f32::from)
            .collect();

        let settings = p.settings;
        let thresh = settings.erode_thresh.max(0) as f32;
        let thickness = settings.erode_surface_thickness.max(0);
        let move_thresh = ((thickness >> 2) as f32).max(thresh).min((thickness >> 1) as f32);
        let thickness = thickness as f32;
        let invert = p.invert;

        // Lower 4-neighbours that exist, by window index.
        let present = |c: FieldCoord| self.heights.value(c).is_some();
        let cells: Vec<(usize, f32, Vec<usize>)> = p
            .influence
            .iter()
            .filter_map(|(coord, influence)| {
                let center = window.index_of(coord)?;
                if !present(coord) {
                    return None;
                }
                let neighbours = NEIGHBOURS
                    .iter()
                    .filter_map(|&(dx, dy)| {
                        let n = coord.offset(dx, dy);
                        if present(n) {
                            window.index_of(n)
                        } else {
                            None
                        }
                    })
                    .collect();
                Some((center, influence, neighbours))
            })
            .collect();

        let mut neighbour_weight = vec![0.0f32; layers];
        let mut passes = 0;
        for _ in 0..settings.erode_iteration_num.max(0) {
            passes += 1;
            let mut changed = false;
            for (center, influence, neighbours) in &cells {
                let (center, influence) = (*center, *influence);
                let mut slope_total = 0.0;
                let mut slope_max = if invert { 0.0 } else { thresh };
                for &n in neighbours {
                    if heights[center] > heights[n] {
                        let slope = heights[center] - heights[n];
                        if invert ^ (slope * influence > thresh) {
                            slope_total += slope;
                            slope_max = f32::max(slope_max, slope);
                        }
                    }
                }
                if slope_total <= 0.0 {
                    continue;
                }

                let mut softness = 1.0;
                for (l, hardness) in self.hardness.iter().enumerate() {
                    softness -= weights[center * layers + l] / 255.0 * hardness;
                }
                if softness <= 0.0 {
                    continue;
                }

                let excess = if invert {
                    thresh - slope_max
                } else {
                    slope_max - thresh
                };
                let transfer = move_thresh.min(excess);
                let mut moved = 0.0;
                for &n in neighbours {
                    if heights[center] <= heights[n] {
                        continue;
                    }
                    let slope = heights[center] - heights[n];
                    if !(invert ^ (slope > thresh)) {
                        continue;
                    }
                    let share = softness * p.strength() * (slope / slope_total) * influence;
                    let diff = excess * share;
                    heights[n] += diff;
                    moved += diff;

                    if self.transfer_weights && layers > 0 {
                        let mut total = 0.0;
                        for l in 0..layers {
                            let center_w = weights[center * layers + l] / 255.0;
                            let w = weights[n * layers + l] / 255.0;
                            neighbour_weight[l] = w * thickness + center_w * share * transfer;
                            total += neighbour_weight[l];
                        }
                        if total > 0.0 {
                            for l in 0..layers {
                                weights[n * layers + l] = 255.0 * neighbour_weight[l] / total;
                            }
                        }
                    }
                }
                heights[center] -= moved;

                if self.transfer_weights && layers > 0 {
                    let share = softness * p.strength() * influence;
                    let mut total = 0.0;
                    for l in 0..layers {
                        let w = weights[center * layers + l] / 255.0;
                        neighbour_weight[l] = w * thickness - w * share * transfer;
                        total += neighbour_weight[l];
                    }
                    if total > 0.0 {
                        for l in 0..layers {
                            weights[center * layers + l] = 255.0 * neighbour_weight[l] / total;
                        }
                    }
                }
                changed = true;
            }
            if !changed {
                break;
            }
        }
        debug_log(&format!(
            "[erosion] {passes} passes over {} cells, weights {}",
            cells.len(),
            if self.transfer_weights { "moved" } else { "kept" }
        ));

        let adjust = p.brush_size_adjust();
        for (coord, influence) in p.influence.iter() {
            let Some(i) = window.index_of(coord) else {
                continue;
            };
            let noise = NoiseParameter::new(
                0.0,
                settings.erosion_noise_scale,
                influence * thresh * settings.tool_strength * adjust,
                settings.noise_seed,
            );
            heights[i] += noise.delta(coord.x, coord.y, settings.erosion_noise_mode);
        }

        self.heights.write_window_f32(window, &heights);
        if self.transfer_weights && layers > 0 {
            let packed: Vec<u8> = weights
                .iter()
                .map(|w| w.round().clamp(0.0, 255.0) as u8)
                .collect();
            self.weights.write_packed_window(window, layers, &packed);
        }
    }
}
