//! Fixed-length sliding window sums over residue weights
//!
//! For a weight slice `w` of length `n` and a window length `k`, position
//! `i` holds the sum of the window *ending* at `i`, i.e. `w[i+1-k..=i]`.
//! Positions `i < k - 1` have no complete window and are zero-filled, so
//! the output always has length `n`.

use crate::mass::round2;

/// Compensated running sum, so that adding and removing thousands of
/// residues does not accumulate error in the low decimals
#[derive(Copy, Clone, Default, Debug)]
struct RollingSum {
    sum: f64,
    compensation: f64,
}

impl RollingSum {
    #[inline]
    fn add(&mut self, x: f64) {
        let y = x - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    #[inline]
    fn remove(&mut self, x: f64) {
        self.add(-x)
    }
}

/// Unrounded window sums, zero-filled where the window is incomplete.
/// Runs in O(n) regardless of `k`.
pub fn rolling_sums(weights: &[f64], k: usize) -> Vec<f64> {
    debug_assert!(k > 0, "window length must be positive");
    let mut sums = vec![0.0; weights.len()];
    if k == 0 || weights.len() < k {
        return sums;
    }

    let mut running = RollingSum::default();
    for (i, &weight) in weights.iter().enumerate() {
        running.add(weight);
        if i >= k {
            running.remove(weights[i - k]);
        }
        if i + 1 >= k {
            sums[i] = running.sum;
        }
    }
    sums
}

/// Window sums rounded to two decimal places, zero-filled where the window
/// is incomplete
pub fn window_sums(weights: &[f64], k: usize) -> Vec<f64> {
    let mut sums = rolling_sums(weights, k);
    for sum in sums.iter_mut().skip(k.saturating_sub(1)) {
        *sum = round2(*sum);
    }
    sums
}

/// Complete windows only, as `(start_index, rounded_weight)` pairs.
///
/// Yields `n - k + 1` items when `n >= k` and nothing otherwise.
pub fn complete_windows(weights: &[f64], k: usize) -> impl Iterator<Item = (usize, f64)> {
    let skip = match k {
        0 => weights.len(),
        k => k - 1,
    };
    window_sums(weights, k)
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(move |(end, sum)| (end + 1 - k, sum))
}
