//! Flatten: pull cells toward the height under the stroke start, or toward
//! the tangent plane there when slope flattening is on.

use glam::{Vec2, Vec3};

use crate::field::{lerp, FieldRect};
use crate::settings::FlattenMode;
use crate::target::ToolTarget;

use super::ApplyParams;

pub struct FlattenTool {
    target: Box<dyn ToolTarget>,
    /// Field position the stroke started at.
    origin: Vec2,
    picked: bool,
    height: f32,
    normal: Vec3,
    plane_dist: f32,
}

impl FlattenTool {
    pub fn new(target: Box<dyn ToolTarget>, origin: Vec2) -> Self {
        Self {
            target,
            origin,
            picked: false,
            height: 0.0,
            normal: Vec3::Z,
            plane_dist: 0.0,
        }
    }

    /// Reference height picked so far, `None` before the first apply.
    pub fn reference_height(&self) -> Option<f32> {
        self.picked.then_some(self.height)
    }

    fn pick(&mut self, at: Vec2, slope: bool) {
        let x = at.x.floor() as i32;
        let y = at.y.floor() as i32;
        self.target.cache_window(FieldRect::new(x, y, x + 1, y + 1));
        self.height = self.target.point_value(at.x, at.y);
        if slope {
            self.normal = self.target.point_normal(x, y);
            self.plane_dist = -self.normal.dot(Vec3::new(at.x, at.y, self.height));
        }
        self.picked = true;
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let slope = p.settings.use_slope_flatten;
        if !self.picked {
            self.pick(self.origin, slope);
        } else if p.settings.pick_value_per_apply {
            // Same point, so edits under the stroke start are picked up.
            self.pick(self.origin, slope);
        }

        let window = p.window();
        self.target.cache_window(window);
        let mut data = self.target.read_window(window);
        let mode = p.settings.flatten_mode;

        if slope {
            let n = self.normal;
            if n.z.abs() < 1e-6 {
                return;
            }
            for (coord, influence) in p.influence.iter() {
                let Some(i) = window.index_of(coord) else {
                    continue;
                };
                let dest = -(n.x * coord.x as f32 + n.y * coord.y as f32 + self.plane_dist) / n.z;
                let offset = data[i] - dest;
                let allowed = match mode {
                    FlattenMode::Both => true,
                    FlattenMode::Raise => offset < 0.0,
                    FlattenMode::Lower => offset > 0.0,
                };
                if allowed {
                    data[i] = lerp(data[i], dest, influence * p.strength());
                }
            }
        } else {
            let flat = self.height;
            match mode {
                FlattenMode::Both => {
                    for (coord, influence) in p.influence.iter() {
                        if let Some(i) = window.index_of(coord) {
                            data[i] = lerp(data[i], flat, influence * p.strength());
                        }
                    }
                }
                FlattenMode::Raise | FlattenMode::Lower => {
                    // Scale every move by the largest offset so the farthest
                    // cell moves at full strength and nearer ones proportionally.
                    let raise = mode == FlattenMode::Raise;
                    let mut moves = Vec::new();
                    let mut extreme = 0.0f32;
                    for (coord, influence) in p.influence.iter() {
                        let Some(i) = window.index_of(coord) else {
                            continue;
                        };
                        let delta = data[i] - flat;
                        if (raise && delta < 0.0) || (!raise && delta > 0.0) {
                            moves.push((i, influence * p.strength() * delta));
                            extreme = if raise { extreme.min(delta) } else { extreme.max(delta) };
                        }
                    }
                    if extreme != 0.0 {
                        for (i, weighted) in moves {
                            data[i] = lerp(data[i], flat, weighted / extreme);
                        }
                    }
                }
            }
        }

        self.target.write_window(window, &data);
    }
}
