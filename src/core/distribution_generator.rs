//! Statistical helpers used to pick per-slice CPU usage and to spread VM arrivals over slices.

use log::warn;
use rand_distr::{Normal, Weibull};

use crate::random::Random;

/// Size of the lookup table returned by `truncated_gaussian`.
pub const GAUSSIAN_SAMPLE_SIZE: usize = 1000;
/// Standard deviation decrement applied while the sample 95th percentile is too high.
pub const STDDEV_DECREMENT: f64 = 0.25;
/// Smallest standard deviation tried before giving up on the percentile bound.
pub const MIN_STDDEV: f64 = 0.25;
/// Relative tolerance on the sum of a heavy tail spread.
pub const SPREAD_TOLERANCE: f64 = 0.1;
pub const SPREAD_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_WEIBULL_SHAPE: f64 = 1.0;

/// Returns `GAUSSIAN_SAMPLE_SIZE` absolute values drawn from a normal distribution of mean `avg`
/// whose 95th percentile does not exceed `pct95`.
///
/// The standard deviation starts at `pct95` and shrinks until the percentile bound holds. If it
/// reaches `MIN_STDDEV` first, a sample with the smallest deviation is returned as is.
pub fn truncated_gaussian(random: &mut Random, avg: f64, pct95: f64) -> Vec<f64> {
    let mean = if avg <= 0.0 { 1.0 } else { avg };
    let mut stddev = f64::max(pct95, MIN_STDDEV);
    let mut scratch = Vec::with_capacity(GAUSSIAN_SAMPLE_SIZE);

    loop {
        let sample = absolute_normal_sample(random, mean, stddev);
        scratch.clear();
        scratch.extend_from_slice(&sample);
        if percentile_in_place(&mut scratch, 95.0) <= pct95 {
            return sample;
        }
        stddev -= STDDEV_DECREMENT;
        if stddev < MIN_STDDEV {
            warn!(
                "95th percentile {} unreachable around average {}, keeping smallest deviation",
                pct95, mean
            );
            return absolute_normal_sample(random, mean, MIN_STDDEV);
        }
    }
}

fn absolute_normal_sample(random: &mut Random, mean: f64, stddev: f64) -> Vec<f64> {
    match Normal::new(mean, stddev) {
        Ok(normal) => random
            .sample_many(&normal, GAUSSIAN_SAMPLE_SIZE)
            .into_iter()
            .map(f64::abs)
            .collect(),
        Err(_) => vec![mean.abs(); GAUSSIAN_SAMPLE_SIZE],
    }
}

/// Spreads roughly `total` items over `buckets` buckets following a heavy tail (Weibull) shape.
///
/// The largest bucket initially receives `total` items, the others proportionally. The scale is
/// then adjusted by 10% steps until the rounded sum lands within 10% of `total`. When that does not
/// happen within `SPREAD_MAX_ITERATIONS` the closest spread found is returned.
pub fn heavy_tail_spread(random: &mut Random, total: usize, buckets: usize) -> Vec<usize> {
    heavy_tail_spread_with_shape(random, total, buckets, DEFAULT_WEIBULL_SHAPE)
}

pub fn heavy_tail_spread_with_shape(
    random: &mut Random,
    total: usize,
    buckets: usize,
    shape: f64,
) -> Vec<usize> {
    if buckets == 0 {
        return vec![];
    }
    if total == 0 {
        return vec![0; buckets];
    }

    let weibull = match Weibull::new(1.0, shape) {
        Ok(weibull) => weibull,
        Err(_) => {
            warn!("Invalid Weibull shape {}, spreading evenly", shape);
            return even_spread(total, buckets);
        }
    };
    let normalised = random.sample_many(&weibull, buckets);
    let max = normalised.iter().cloned().fold(f64::MIN, f64::max);
    if max <= 0.0 {
        // degenerate draw, every bucket at zero: put everything at the start
        let mut spread = vec![0; buckets];
        spread[0] = total;
        return spread;
    }

    let target = total as f64;
    let mut max_burst = target;
    let mut best: Option<(f64, Vec<usize>)> = None;

    for _ in 0..SPREAD_MAX_ITERATIONS {
        let ratio = max_burst / max;
        let spread: Vec<usize> = normalised
            .iter()
            .map(|value| (value * ratio).round() as usize)
            .collect();
        let sum = spread.iter().sum::<usize>() as f64;

        let distance = (sum - target).abs();
        if best.as_ref().map_or(true, |(d, _)| distance < *d) {
            best = Some((distance, spread.clone()));
        }

        if sum < target * (1.0 - SPREAD_TOLERANCE) {
            max_burst *= 1.0 + SPREAD_TOLERANCE;
        } else if sum > target * (1.0 + SPREAD_TOLERANCE) {
            max_burst *= 1.0 - SPREAD_TOLERANCE;
        } else {
            return spread;
        }
    }

    warn!(
        "Heavy tail spread of {} over {} buckets did not converge, keeping closest spread",
        total, buckets
    );
    best.map(|(_, spread)| spread).unwrap_or_else(|| vec![0; buckets])
}

fn even_spread(total: usize, buckets: usize) -> Vec<usize> {
    (0..buckets)
        .map(|idx| total / buckets + usize::from(idx < total % buckets))
        .collect()
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    percentile_in_place(&mut values.to_vec(), q)
}

/// Same as `percentile`, reordering `values` instead of copying them.
pub fn percentile_in_place(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = q / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;

    let (_, lower_value, above) = values.select_nth_unstable_by(lower, |a, b| a.total_cmp(b));
    let lower_value = *lower_value;
    if above.is_empty() || fraction == 0.0 {
        return lower_value;
    }
    let upper_value = above.iter().cloned().fold(f64::INFINITY, f64::min);
    lower_value + (upper_value - lower_value) * fraction
}
