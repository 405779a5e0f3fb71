//! Noise: perturb cells with coherent fBm noise.

use crate::field::lerp;
use crate::noise_field::{NoiseMode, NoiseParameter};
use crate::target::{TargetKind, ToolTarget};

use super::ApplyParams;

/// Centre of a weight noise sample before it is scaled to the target value.
const WEIGHT_NOISE_AMOUNT: f32 = 127.5;

pub struct NoiseTool {
    target: Box<dyn ToolTarget>,
}

impl NoiseTool {
    pub fn new(target: Box<dyn ToolTarget>) -> Self {
        Self { target }
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        self.target.cache_window(window);
        let mut data = self.target.read_window(window);
        let settings = p.settings;
        let is_weight = self.target.kind() == TargetKind::Weightmap;

        if is_weight && settings.use_weight_target_value {
            let target_value = settings.weight_target_value;
            let noise = NoiseParameter::new(
                0.0,
                settings.noise_scale,
                WEIGHT_NOISE_AMOUNT,
                settings.noise_seed,
            );
            for (coord, influence) in p.influence.iter() {
                let Some(i) = window.index_of(coord) else {
                    continue;
                };
                let original = data[i];
                let mut dest = NoiseMode::Add
                    .convert(WEIGHT_NOISE_AMOUNT, noise.sample(coord.x, coord.y))
                    * target_value;
                match settings.noise_mode {
                    NoiseMode::Add if original >= dest => continue,
                    NoiseMode::Sub => {
                        dest += (1.0 - target_value) * WEIGHT_NOISE_AMOUNT;
                        if original <= dest {
                            continue;
                        }
                    }
                    _ => {}
                }
                data[i] = lerp(original, dest, influence * p.strength()).round();
            }
        } else {
            let adjust = if is_weight { 1.0 } else { p.brush_size_adjust() };
            let multiplier = self.target.strength_multiplier(settings.brush_radius);
            for (coord, influence) in p.influence.iter() {
                let Some(i) = window.index_of(coord) else {
                    continue;
                };
                let total = influence * p.strength() * multiplier;
                let noise =
                    NoiseParameter::new(0.0, settings.noise_scale, total * adjust, settings.noise_seed);
                data[i] += noise.delta(coord.x, coord.y, settings.noise_mode);
            }
        }

        self.target.write_window(window, &data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LayerInfo, TerrainBackend};
    use crate::field::{FieldRect, HEIGHT_NEUTRAL};
    use crate::settings::ToolSettings;
    use crate::storage::TerrainStore;
    use crate::target::{HeightTarget, WeightTarget};
    use crate::tools::test_support::uniform_influence;
    use glam::Vec2;

    fn run(target: Box<dyn ToolTarget>, settings: &ToolSettings, rect: FieldRect) {
        let mut tool = NoiseTool::new(target);
        let inf = uniform_influence(rect, 1.0);
        tool.apply(&ApplyParams {
            settings,
            influence: &inf,
            pressure: 1.0,
            invert: false,
            position: Vec2::ZERO,
        });
    }

    #[test]
    fn test_add_mode_only_raises() {
        let store = TerrainStore::flat(32, 1, 1, HEIGHT_NEUTRAL).into_shared();
        let settings = ToolSettings {
            noise_mode: NoiseMode::Add,
            noise_scale: 8.0,
            tool_strength: 1.0,
            maximum_value_radius: 0.0,
            ..Default::default()
        };
        let rect = FieldRect::new(2, 2, 29, 29);
        run(Box::new(HeightTarget::new(store.clone())), &settings, rect);
        let store = store.borrow();
        let heights: Vec<u16> = rect.iter().filter_map(|c| store.height(c)).collect();
        assert!(heights.iter().all(|&h| h >= HEIGHT_NEUTRAL));
        assert!(heights.iter().any(|&h| h > HEIGHT_NEUTRAL));
    }

    #[test]
    fn test_sub_mode_only_lowers() {
        let store = TerrainStore::flat(32, 1, 1, HEIGHT_NEUTRAL).into_shared();
        let settings = ToolSettings {
            noise_mode: NoiseMode::Sub,
            noise_scale: 8.0,
            tool_strength: 1.0,
            maximum_value_radius: 0.0,
            ..Default::default()
        };
        let rect = FieldRect::new(2, 2, 29, 29);
        run(Box::new(HeightTarget::new(store.clone())), &settings, rect);
        let store = store.borrow();
        assert!(rect.iter().all(|c| store.height(c) <= Some(HEIGHT_NEUTRAL)));
        assert!(rect.iter().any(|c| store.height(c) < Some(HEIGHT_NEUTRAL)));
    }

    #[test]
    fn test_weight_target_value_bounds() {
        let mut store = TerrainStore::flat(32, 1, 1, HEIGHT_NEUTRAL);
        store.add_layer(LayerInfo::new("grass"));
        let store = store.into_shared();
        let settings = ToolSettings {
            noise_mode: NoiseMode::Add,
            noise_scale: 8.0,
            tool_strength: 1.0,
            use_weight_target_value: true,
            weight_target_value: 1.0,
            ..Default::default()
        };
        let rect = FieldRect::new(2, 2, 29, 29);
        let target = WeightTarget::new(store.clone(), "grass").unwrap();
        run(Box::new(target), &settings, rect);
        let store = store.borrow();
        let weights: Vec<u8> = rect.iter().filter_map(|c| store.weight(0, c)).collect();
        assert!(weights.iter().all(|&w| w <= 128));
        assert!(weights.iter().any(|&w| w > 0));
    }
}
