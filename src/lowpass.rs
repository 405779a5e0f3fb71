//! Frequency-domain smoothing used by detail-preserving Smooth and by
//! hydraulic erosion's final pass.
//!
//! The window is the brush rectangle grown by one cell on each side; the
//! transform covers the inner brush rectangle rounded down to even
//! dimensions.

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::brush::BrushInfluence;
use crate::field::{lerp, FieldRect};

/// Low-pass `data` (dense over `window`) and blend the result into every
/// brush cell by `influence * apply_ratio`.
///
/// `detail_scale` in [0, 1): higher keeps more detail.
pub fn low_pass_filter(
    window: FieldRect,
    data: &mut [f32],
    influence: &BrushInfluence,
    detail_scale: f32,
    apply_ratio: f32,
) {
    if window.is_empty() || data.len() < window.area() {
        return;
    }
    let inner_w = window.width().saturating_sub(2);
    let inner_h = window.height().saturating_sub(2);
    let w = inner_w - inner_w % 2;
    let h = inner_h - inner_h % 2;
    if w == 0 || h == 0 {
        return;
    }
    let stride = window.width();
    let ox = window.x1 + 1;
    let oy = window.y1 + 1;

    let mut buf: Vec<Complex<f32>> = Vec::with_capacity(w * h);
    for y in 0..h {
        let row = (y + 1) * stride + 1;
        buf.extend(data[row..row + w].iter().map(|&v| Complex::new(v, 0.0)));
    }

    let mut planner = FftPlanner::<f32>::new();
    let row_fwd = planner.plan_fft_forward(w);
    let col_fwd = planner.plan_fft_forward(h);
    let row_inv = planner.plan_fft_inverse(w);
    let col_inv = planner.plan_fft_inverse(h);

    transform_rows(&mut buf, w, &row_fwd);
    let mut cols = transpose(&buf, w, h);
    transform_rows(&mut cols, h, &col_fwd);

    // `cols` is laid out column-major: index = x * h + y.
    let ratio = 1.0 - detail_scale.clamp(0.0, 1.0);
    let cutoff = ((h as f32 * ratio).powi(2)).min((w as f32 * ratio).powi(2));
    cols.par_chunks_mut(h).enumerate().for_each(|(x, column)| {
        let fx = wrapped_frequency(x, w);
        for (y, bin) in column.iter_mut().enumerate() {
            let fy = wrapped_frequency(y, h);
            let dist = fx * fx + fy * fy;
            let filter = if cutoff > 0.0 {
                1.0 / (1.0 + dist / cutoff)
            } else if dist == 0.0 {
                1.0
            } else {
                0.0
            };
            *bin *= filter;
        }
    });

    transform_rows(&mut cols, h, &col_inv);
    let mut filtered = transpose(&cols, h, w);
    transform_rows(&mut filtered, w, &row_inv);

    let norm = 1.0 / (w * h) as f32;
    for (coord, value) in influence.iter() {
        let lx = coord.x - ox;
        let ly = coord.y - oy;
        if lx < 0 || ly < 0 || lx as usize >= w || ly as usize >= h {
            continue;
        }
        let smoothed = filtered[ly as usize * w + lx as usize].re * norm;
        let Some(index) = window.index_of(coord) else {
            continue;
        };
        data[index] = lerp(data[index], smoothed, value * apply_ratio);
    }
}

fn wrapped_frequency(i: usize, n: usize) -> f32 {
    if i < n / 2 {
        i as f32
    } else {
        i as f32 - n as f32
    }
}

fn transform_rows(buf: &mut [Complex<f32>], len: usize, fft: &Arc<dyn Fft<f32>>) {
    buf.par_chunks_mut(len).for_each(|row| fft.process(row));
}

/// Transpose a `w` by `h` row-major buffer into `h` by `w`.
fn transpose(buf: &[Complex<f32>], w: usize, h: usize) -> Vec<Complex<f32>> {
    let mut out = vec![Complex::new(0.0, 0.0); w * h];
    for y in 0..h {
        for x in 0..w {
            out[x * h + y] = buf[y * w + x];
        }
    }
    out
}
