//! Smooth: average out local detail, either with a 3x3 box filter or with
//! the frequency-domain low-pass when detail smoothing is on.

use crate::field::{lerp, FieldCoord};
use crate::lowpass::low_pass_filter;
use crate::target::ToolTarget;

use super::ApplyParams;

pub struct SmoothTool {
    target: Box<dyn ToolTarget>,
}

impl SmoothTool {
    pub fn new(target: Box<dyn ToolTarget>) -> Self {
        Self { target }
    }

    pub fn apply(&mut self, p: &ApplyParams) {
        let window = p.window();
        self.target.cache_window(window);
        let mut data = self.target.read_window(window);

        if p.settings.detail_smooth {
            low_pass_filter(
                window,
                &mut data,
                p.influence,
                p.settings.detail_scale,
                p.strength(),
            );
        } else {
            let snapshot = data.clone();
            for (coord, influence) in p.influence.iter() {
                let Some(i) = window.index_of(coord) else {
                    continue;
                };
                if !self.target.has_value(coord) {
                    continue;
                }
                // Missing neighbours are left out of the average.
                let mut sum = 0.0;
                let mut count = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let n = FieldCoord::new(coord.x + dx, coord.y + dy);
                        if let Some(j) = window.index_of(n) {
                            if self.target.has_value(n) {
                                sum += snapshot[j];
                                count += 1;
                            }
                        }
                    }
                }
                if count > 0 {
                    let average = sum / count as f32;
                    data[i] = lerp(data[i], average, influence * p.strength());
                }
            }
        }

        self.target.write_window(window, &data);
    }
}
