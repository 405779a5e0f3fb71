use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Below this frequency scale the noise collapses to its base value.
const MIN_NOISE_SCALE: f32 = 1e-5;

/// Sign policy for noise deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseMode {
    /// Centred on zero: `[-amount/2, amount/2]`.
    #[default]
    Both,
    /// Raise only: `[0, amount]`.
    Add,
    /// Lower only: `[-amount, 0]`.
    Sub,
}

impl NoiseMode {
    /// Shift a sample in `[0, amount]` into this mode's range.
    pub fn convert(self, amount: f32, sample: f32) -> f32 {
        match self {
            NoiseMode::Add => sample,
            NoiseMode::Sub => sample - amount,
            NoiseMode::Both => sample - amount * 0.5,
        }
    }
}

/// Four-octave coherent noise sampled on integer cells:
/// `base + noise(x, y) * amount` with `noise` in [0, 1].
pub struct NoiseParameter {
    pub base: f32,
    pub scale: f32,
    pub amount: f32,
    fbm: Fbm<Perlin>,
}

impl NoiseParameter {
    pub fn new(base: f32, scale: f32, amount: f32, seed: u32) -> Self {
        let frequency = if scale > MIN_NOISE_SCALE {
            1.0 / scale as f64
        } else {
            0.0
        };
        let fbm = Fbm::<Perlin>::new(seed)
            .set_octaves(4)
            .set_frequency(frequency)
            .set_lacunarity(2.0)
            .set_persistence(0.5);
        Self {
            base,
            scale,
            amount,
            fbm,
        }
    }

    /// Sample at a cell; mirrored about the axes like the terrain generator.
    pub fn sample(&self, x: i32, y: i32) -> f32 {
        if self.scale <= MIN_NOISE_SCALE {
            return self.base;
        }
        // Offset off the lattice, where gradient noise is always zero.
        let px = x.unsigned_abs() as f64 + 0.5;
        let py = y.unsigned_abs() as f64 + 0.5;
        let raw = self.fbm.get([px, py]) as f32;
        let unit = (raw * 0.5 + 0.5).clamp(0.0, 1.0);
        self.base + unit * self.amount
    }

    /// Signed delta for `mode`.
    pub fn delta(&self, x: i32, y: i32, mode: NoiseMode) -> f32 {
        mode.convert(self.amount, self.sample(x, y) - self.base)
    }
}
