// THEORY:
// The `quantizer` collapses a frame onto a handful of representative colours before
// thresholding. Sensor noise and uneven lighting scatter a note's pixels around its
// true colour; k-means pulls them back onto one centre, so the HSV band sees a flat
// patch instead of a speckled one.
//
// It is the single most expensive stage of a cycle and is therefore optional
// (`QuantizationConfig::clusters == 0` skips it entirely).
//
// Determinism matters more than the last bit of cluster quality: centres are seeded
// with k-means++ driven by a fixed-seed RNG and refined with plain Lloyd iterations.
// Several restarts are run from that one stream and the most compact palette (lowest
// summed squared distance to the nearest centre) wins, so running the same frame
// twice yields the same palette and the same mask.

use crate::config::QuantizationConfig;
use image::{Rgb, RgbImage};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Color = [f32; 3];

#[inline]
fn distance_sq(a: &Color, b: &Color) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

#[inline]
fn nearest(palette: &[Color], color: &Color) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (index, centre) in palette.iter().enumerate() {
        let dist = distance_sq(centre, color);
        if dist < best_dist {
            best_dist = dist;
            best = index;
        }
    }
    best
}

/// k-means++ seeding: each new centre is drawn with probability proportional to its
/// squared distance from the centres picked so far.
fn seed_centres(samples: &[Color], k: usize, rng: &mut StdRng) -> Vec<Color> {
    let mut centres = Vec::with_capacity(k);
    centres.push(samples[rng.gen_range(0..samples.len())]);

    let mut nearest_dist: Vec<f32> = samples
        .iter()
        .map(|s| distance_sq(s, &centres[0]))
        .collect();

    while centres.len() < k {
        let total: f64 = nearest_dist.iter().map(|&d| d as f64).sum();
        if total <= 0.0 {
            // Fewer distinct colours than clusters.
            break;
        }
        let target = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut chosen = samples.len() - 1;
        for (index, &dist) in nearest_dist.iter().enumerate() {
            cumulative += dist as f64;
            if cumulative > target {
                chosen = index;
                break;
            }
        }
        let centre = samples[chosen];
        for (dist, sample) in nearest_dist.iter_mut().zip(samples) {
            *dist = dist.min(distance_sq(sample, &centre));
        }
        centres.push(centre);
    }
    centres
}

/// Sum of squared distances from each sample to its nearest centre.
fn compactness(samples: &[Color], centres: &[Color]) -> f64 {
    samples
        .iter()
        .map(|sample| distance_sq(sample, &centres[nearest(centres, sample)]) as f64)
        .sum()
}

/// One k-means++ seeding followed by Lloyd iterations. Returns the centres and the
/// number of iterations run.
fn lloyd(
    samples: &[Color],
    k: usize,
    config: &QuantizationConfig,
    rng: &mut StdRng,
) -> (Vec<Color>, u32) {
    let mut centres = seed_centres(samples, k, rng);
    let mut sums = vec![[0.0f64; 3]; centres.len()];
    let mut counts = vec![0usize; centres.len()];
    let mut iterations = 0;

    for _ in 0..config.max_iterations {
        iterations += 1;
        sums.iter_mut().for_each(|s| *s = [0.0; 3]);
        counts.iter_mut().for_each(|c| *c = 0);

        for sample in samples {
            let index = nearest(&centres, sample);
            counts[index] += 1;
            for channel in 0..3 {
                sums[index][channel] += sample[channel] as f64;
            }
        }

        let mut max_shift = 0.0f32;
        for (index, centre) in centres.iter_mut().enumerate() {
            // An emptied cluster keeps its previous centre.
            if counts[index] == 0 {
                continue;
            }
            let n = counts[index] as f64;
            let updated = [
                (sums[index][0] / n) as f32,
                (sums[index][1] / n) as f32,
                (sums[index][2] / n) as f32,
            ];
            max_shift = max_shift.max(distance_sq(centre, &updated).sqrt());
            *centre = updated;
        }

        if (max_shift as f64) <= config.epsilon {
            break;
        }
    }
    (centres, iterations)
}

/// Runs `config.attempts` seeded k-means passes and keeps the most compact one.
/// Every attempt draws from the same seeded stream, so the first attempt is always
/// the single-attempt result.
fn fit(samples: &[Color], config: &QuantizationConfig) -> Option<(Vec<Color>, f64)> {
    if samples.is_empty() || config.clusters == 0 {
        return None;
    }

    let k = config.clusters.min(samples.len());
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Vec<Color>, f64)> = None;

    for attempt in 0..config.attempts.max(1) {
        let (centres, iterations) = lloyd(samples, k, config, &mut rng);
        let score = compactness(samples, &centres);
        debug!(
            "k-means attempt {}: {} centres, {} samples, {} iterations, compactness {:.1}",
            attempt,
            centres.len(),
            samples.len(),
            iterations,
            score
        );
        match &best {
            Some((_, best_score)) if score >= *best_score => {}
            _ => best = Some((centres, score)),
        }
    }
    best
}

fn samples(frame: &RgbImage, config: &QuantizationConfig) -> Vec<Color> {
    frame
        .pixels()
        .step_by(config.sample_stride.max(1))
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect()
}

/// Fits `config.clusters` representative colours to the sampled pixels of `frame`.
pub fn fit_palette(frame: &RgbImage, config: &QuantizationConfig) -> Vec<Rgb<u8>> {
    match fit(&samples(frame, config), config) {
        Some((centres, _)) => centres
            .iter()
            .map(|c| Rgb([c[0] as u8, c[1] as u8, c[2] as u8]))
            .collect(),
        None => Vec::new(),
    }
}

/// Replaces every pixel of `frame` with its nearest palette colour.
///
/// Returns an unchanged copy when quantization is disabled.
pub fn quantize(frame: &RgbImage, config: &QuantizationConfig) -> RgbImage {
    let palette = fit_palette(frame, config);
    if palette.is_empty() {
        return frame.clone();
    }
    let centres: Vec<Color> = palette
        .iter()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    let mut output = frame.clone();
    for pixel in output.pixels_mut() {
        let color = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
        *pixel = palette[nearest(&centres, &color)];
    }
    output
}
