//! The statistics computed over sampled row sizes
//!
//! Every function here returns `None` for an empty sample list instead of
//! dividing by zero. Sorting always happens on a copy so callers keep their
//! samples in the order they were discovered.

use std::cmp::Ordering;

/// Get the arithmetic mean of some samples
///
/// # Arguments
///
/// * `samples` - The samples to average
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Get the mean of some samples where later samples are weighted more heavily
///
/// The sample at position `i` gets a weight of `i + 1` and the weights are
/// normalized to sum to 1. Unlike [`mean`] this depends on sample order.
///
/// # Arguments
///
/// * `samples` - The samples to average in discovery order
pub fn weighted_mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    // the weights are 1..=n so they sum to n(n+1)/2
    let len = samples.len() as f64;
    let total_weight = len * (len + 1.0) / 2.0;
    // sum our weighted samples before normalizing to keep uniform inputs exact
    let weighted: f64 = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| (i + 1) as f64 * sample)
        .sum();
    Some(weighted / total_weight)
}

/// Get a sorted copy of some samples
fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Get the median of some samples
///
/// Even length sample lists return the average of the two middle samples.
///
/// # Arguments
///
/// * `samples` - The samples to get the median of
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sorted = sorted(samples);
    let mid = (sorted.len() - 1) / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid] + sorted[mid + 1]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Get the sample at a specific quantile
///
/// This is an order statistic and is never interpolated: the sample at index
/// `floor(q * len)` of the sorted samples is returned, with the index clamped
/// to the last sample.
///
/// # Arguments
///
/// * `samples` - The samples to pick from
/// * `q` - The quantile to get between 0 and 1
pub fn quantile(samples: &[f64], q: f64) -> Option<f64> {
    if samples.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let sorted = sorted(samples);
    let index = ((q * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    Some(sorted[index])
}

/// The full set of statistics for some sampled row sizes
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// The number of samples summarized
    pub count: usize,
    /// The mean size
    pub mean: f64,
    /// The mean size weighted towards later samples
    pub weighted_mean: f64,
    /// The median size
    pub median: f64,
    /// The smallest size
    pub min: u64,
    /// The largest size
    pub max: u64,
    /// The 10th percentile
    pub p10: f64,
    /// The 50th percentile
    pub p50: f64,
    /// The 90th percentile
    pub p90: f64,
}

impl Summary {
    /// Summarize some sampled sizes
    ///
    /// Returns `None` if there are no samples.
    ///
    /// # Arguments
    ///
    /// * `samples` - The sampled sizes in discovery order
    pub fn new(samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        // cast our samples to floats once
        let floats = samples.iter().map(|sample| *sample as f64).collect::<Vec<f64>>();
        Some(Summary {
            count: samples.len(),
            mean: mean(&floats)?,
            weighted_mean: weighted_mean(&floats)?,
            median: median(&floats)?,
            min,
            max,
            p10: quantile(&floats, 0.1)?,
            p50: quantile(&floats, 0.5)?,
            p90: quantile(&floats, 0.9)?,
        })
    }

    /// Get the summary of these samples if every sample grew by a constant
    ///
    /// Every statistic here shifts linearly so nothing has to be recomputed.
    ///
    /// # Arguments
    ///
    /// * `offset` - The amount to add to every sample
    #[must_use]
    pub fn shifted(&self, offset: u64) -> Self {
        let shift = offset as f64;
        Summary {
            count: self.count,
            mean: self.mean + shift,
            weighted_mean: self.weighted_mean + shift,
            median: self.median + shift,
            min: self.min + offset,
            max: self.max + offset,
            p10: self.p10 + shift,
            p50: self.p50 + shift,
            p90: self.p90 + shift,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_sample() {
        let samples = [42.0];
        assert_eq!(mean(&samples), Some(42.0));
        assert_eq!(median(&samples), Some(42.0));
        assert_eq!(weighted_mean(&samples), Some(42.0));
        assert_eq!(quantile(&samples, 0.5), Some(42.0));
    }

    #[test]
    fn empty_samples() {
        assert_eq!(mean(&[]), None);
        assert_eq!(weighted_mean(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(Summary::new(&[]), None);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn median_does_not_reorder() {
        let samples = vec![5.0, 1.0, 3.0];
        median(&samples);
        quantile(&samples, 0.9);
        assert_eq!(samples, vec![5.0, 1.0, 3.0]);
    }

    #[test]
    fn quantile_floors_index() {
        let samples = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile(&samples, 0.5), Some(30.0));
        assert_eq!(quantile(&samples, 0.1), Some(10.0));
        assert_eq!(quantile(&samples, 0.9), Some(50.0));
        assert_eq!(quantile(&samples, 0.0), Some(10.0));
        // q = 1 would index past the end so it clamps to the largest sample
        assert_eq!(quantile(&samples, 1.0), Some(50.0));
    }

    #[test]
    fn quantile_rejects_bad_q() {
        let samples = [1.0, 2.0];
        assert_eq!(quantile(&samples, -0.1), None);
        assert_eq!(quantile(&samples, 1.5), None);
        assert_eq!(quantile(&samples, f64::NAN), None);
    }

    #[test]
    fn weighted_mean_uniform() {
        assert_eq!(weighted_mean(&[1.0, 1.0, 1.0]), Some(1.0));
    }

    #[test]
    fn weighted_mean_is_order_sensitive() {
        // 1*1 + 2*100 over 3 vs 1*100 + 2*1 over 3
        assert_eq!(weighted_mean(&[1.0, 100.0]), Some(67.0));
        assert_eq!(weighted_mean(&[100.0, 1.0]), Some(34.0));
        assert_ne!(weighted_mean(&[1.0, 100.0]), weighted_mean(&[100.0, 1.0]));
    }

    #[test]
    fn mean_and_median_ignore_order() {
        let forward = [3.0, 9.0, 1.0, 7.0];
        let backward = [7.0, 1.0, 9.0, 3.0];
        assert_eq!(mean(&forward), mean(&backward));
        assert_eq!(median(&forward), median(&backward));
    }

    #[test]
    fn summary() {
        let summary = Summary::new(&[22]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.min, 22);
        assert_eq!(summary.max, 22);
        assert_eq!(summary.p90, 22.0);
        // shifting by our column names matches summarizing the shifted samples
        let shifted = summary.shifted(2);
        assert_eq!(shifted, Summary::new(&[24]).unwrap());
    }

    #[test]
    fn shifted_matches_recomputed() {
        let samples = [4, 18, 7, 30, 12];
        let recomputed = Summary::new(&samples.map(|sample| sample + 5)).unwrap();
        let shifted = Summary::new(&samples).unwrap().shifted(5);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert_eq!(shifted.count, recomputed.count);
        assert_eq!(shifted.min, recomputed.min);
        assert_eq!(shifted.max, recomputed.max);
        assert!(close(shifted.mean, recomputed.mean));
        assert!(close(shifted.weighted_mean, recomputed.weighted_mean));
        assert!(close(shifted.median, recomputed.median));
        assert!(close(shifted.p10, recomputed.p10));
        assert!(close(shifted.p50, recomputed.p50));
        assert!(close(shifted.p90, recomputed.p90));
    }
}
