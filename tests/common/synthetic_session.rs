#![allow(dead_code)]

use refraction_engine::AstigmaticPrescription;

/// Deterministic zero-mean jitter in `[-amplitude, amplitude]`.
pub fn jitter(index: usize, amplitude: f32) -> f32 {
    // Low-discrepancy sequence keeps the noise spread without an RNG.
    let phase = (index as f32 * 0.618_034).fract();
    amplitude * (2.0 * phase - 1.0)
}

/// Readings over `[0, 180)` in `count` evenly spaced meridians.
pub fn sweep(truth: &AstigmaticPrescription, count: usize, noise: f32) -> Vec<(f32, f32)> {
    (0..count)
        .map(|i| {
            let angle = i as f32 * 180.0 / count as f32;
            (angle, truth.power_at(angle) + jitter(i, noise))
        })
        .collect()
}

/// Same as [`sweep`] but with `repeats` readings per meridian, each nudged by
/// a fraction of a degree the way a hand-held device wobbles.
pub fn repeated_sweep(
    truth: &AstigmaticPrescription,
    count: usize,
    repeats: usize,
    noise: f32,
) -> Vec<(f32, f32)> {
    let mut out = Vec::with_capacity(count * repeats);
    let mut k = 0usize;
    for i in 0..count {
        let base = i as f32 * 180.0 / count as f32;
        for r in 0..repeats {
            let angle = base + 0.4 * r as f32;
            out.push((angle, truth.power_at(angle) + jitter(k, noise)));
            k += 1;
        }
    }
    out
}

pub fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

/// True when `value` is a multiple of `step` (within float tolerance).
pub fn on_grid(value: f32, step: f32) -> bool {
    let q = value / step;
    (q - q.round()).abs() < 1e-3
}
