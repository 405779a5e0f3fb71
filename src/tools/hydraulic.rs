//! Hydraulic erosion: rain falls once, then water carries dissolved height
//! downhill to lower 8-neighbours until it evaporates, dropping sediment the
//! shrinking water can no longer hold.

use crate::accessor::HeightAccessor;
use crate::backend::SharedBackend;
use crate::edit_cache::EditCache;
use crate::lowpass::low_pass_filter;
use crate::noise_field::NoiseParameter;

use super::ApplyParams;

const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
];

const DISSOLVE_RATE: f32 = 0.07;
const EVAPORATE_RATE: f32 = 0.5;
const CAPACITY_SCALE: f32 = 0.1;

pub struct HydraulicTool {
    heights: EditCache<HeightAccessor>,
}

impl HydraulicTool {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            heights: EditCache::new(HeightAccessor::new(backend)),
        }
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        self.heights.cache_window(window);
        let mut height = self.heights.read_window_f32(window);
        let mut water = vec![0.0f32; height.len()];
        let mut sediment = vec![0.0f32; height.len()];

        let settings = p.settings;
        let dissolve = DISSOLVE_RATE * p.strength();
        let capacity = CAPACITY_SCALE * settings.sediment_capacity;
        let damping = 1.0 - settings.hydraulic_damping * p.strength();

        let cells: Vec<(usize, f32, Vec<usize>)> = p
            .influence
            .iter()
            .filter_map(|(coord, influence)| {
                let center = window.index_of(coord)?;
                self.heights.value(coord)?;
                let neighbours = NEIGHBOURS
                    .iter()
                    .filter_map(|&(dx, dy)| {
                        let n = coord.offset(dx, dy);
                        self.heights.value(n)?;
                        window.index_of(n)
                    })
                    .collect();
                Some((center, influence, neighbours))
            })
            .collect();

        // Rain only on full-strength cells.
        let rain = NoiseParameter::new(
            0.0,
            settings.rain_dist_scale,
            settings.rain_amount.max(0) as f32,
            settings.noise_seed,
        );
        for (coord, influence) in p.influence.iter() {
            if influence < 1.0 {
                continue;
            }
            let Some(i) = window.index_of(coord) else {
                continue;
            };
            let amount = rain.delta(coord.x, coord.y, settings.rain_dist_mode);
            if amount > 0.0 {
                water[i] += amount;
            }
        }

        let mut diffs = [0.0f32; NEIGHBOURS.len()];
        for _ in 0..settings.h_erode_iteration_num.max(0) {
            let mut wet = false;
            for (center, influence, neighbours) in &cells {
                let (c, influence) = (*center, *influence);

                let dissolved = dissolve * water[c] * influence;
                if dissolved > 0.0 && height[c] >= dissolved {
                    height[c] -= dissolved;
                    sediment[c] += dissolved;
                }

                let altitude = height[c] + water[c];
                let mut total_altitude_diff = 0.0;
                let mut total_height_diff = 0.0;
                let mut average = 0.0;
                let mut lower = 0;
                for (k, &n) in neighbours.iter().enumerate() {
                    let neighbour_altitude = height[n] + water[n];
                    if altitude > neighbour_altitude {
                        diffs[k] = altitude - neighbour_altitude;
                        total_altitude_diff += diffs[k];
                        average += neighbour_altitude;
                        lower += 1;
                        if height[c] > height[n] {
                            total_height_diff += height[c] - height[n];
                        }
                    } else {
                        diffs[k] = 0.0;
                    }
                }

                if lower > 0 {
                    average /= lower as f32;
                    if total_height_diff > 0.0 {
                        average *= damping;
                    }
                    let transfer = water[c].min(altitude - average).max(0.0) * influence;
                    let source_water = water[c];
                    let mut water_moved = 0.0;
                    let mut sediment_moved = 0.0;
                    for (k, &n) in neighbours.iter().enumerate() {
                        if diffs[k] <= 0.0 {
                            continue;
                        }
                        let water_diff = transfer * diffs[k] / total_altitude_diff;
                        water[n] += water_diff;
                        water_moved += water_diff;
                        if source_water > 0.0 {
                            let sediment_diff = sediment[c] * water_diff / source_water;
                            sediment[n] += sediment_diff;
                            sediment_moved += sediment_diff;
                        }
                    }
                    water[c] -= water_moved;
                    sediment[c] -= sediment_moved;
                }

                if water[c] > 0.0 {
                    wet = true;
                    // Whole units only, so the water eventually dries up.
                    water[c] = (water[c] * (1.0 - EVAPORATE_RATE)).floor();
                    let excess = sediment[c] - capacity * water[c];
                    if excess > 0.0 {
                        sediment[c] -= excess;
                        height[c] = (height[c] + excess).clamp(0.0, u16::MAX as f32);
                    }
                }
            }
            if !wet {
                break;
            }
        }

        low_pass_filter(
            window,
            &mut height,
            p.influence,
            settings.h_erosion_detail_scale,
            1.0,
        );

        self.heights.write_window_f32(window, &height);
    }
}
