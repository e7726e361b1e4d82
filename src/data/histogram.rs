//! Raw per-channel histogram and the binning engine that folds it into display bins.
//!
//! The raw [`Histogram`] is the canonical state owned by the session. Everything shown on
//! screen is derived from it on every render tick via [`aggregate`], which also drives the
//! count-rate readout ([`Rate`]) and the tick labels ([`si_format`]).

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

/// Fixed-length sequence of event counts, indexed by channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// All-zero histogram with `channels` channels.
    pub fn zeros(channels: usize) -> Self {
        Self::filled(channels, 0)
    }

    /// Histogram with every channel set to `value` (used as a placeholder until the
    /// instrument sends its history).
    pub fn filled(channels: usize, value: u64) -> Self {
        Self {
            counts: vec![value; channels],
        }
    }

    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    /// Number of channels. Never changes after construction.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn get(&self, channel: usize) -> Option<u64> {
        self.counts.get(channel).copied()
    }

    /// Add one event to `channel`.
    pub fn increment(&mut self, channel: u64) -> Result<()> {
        let channels = self.counts.len();
        let slot = usize::try_from(channel)
            .ok()
            .and_then(|i| self.counts.get_mut(i))
            .ok_or(SpectrumError::ChannelOutOfRange { channel, channels })?;
        *slot = slot.saturating_add(1);
        Ok(())
    }

    /// Replace every count at once. The channel count must stay the same.
    pub fn replace(&mut self, counts: Vec<u64>) -> Result<()> {
        if counts.len() != self.counts.len() {
            return Err(SpectrumError::HistogramLength {
                expected: self.counts.len(),
                actual: counts.len(),
            });
        }
        self.counts = counts;
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0, |acc, &c| acc.saturating_add(c))
    }
}

/// How raw channels are folded into display bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinningParams {
    bin_size: usize,
    /// Channels with an index `<= threshold` are ignored entirely.
    pub threshold: i64,
}

impl BinningParams {
    pub fn new(bin_size: usize, threshold: i64) -> Result<Self> {
        if bin_size == 0 {
            return Err(SpectrumError::InvalidBinSize(bin_size));
        }
        Ok(Self {
            bin_size,
            threshold,
        })
    }

    pub fn bin_size(&self) -> usize {
        self.bin_size
    }

    pub fn set_bin_size(&mut self, bin_size: usize) -> Result<()> {
        if bin_size == 0 {
            return Err(SpectrumError::InvalidBinSize(bin_size));
        }
        self.bin_size = bin_size;
        Ok(())
    }

    /// Number of display bins for a histogram of `channels` channels. Trailing channels
    /// that do not fill a whole bin are not displayed.
    pub fn binned_len(&self, channels: usize) -> usize {
        channels / self.bin_size
    }

    fn includes(&self, channel: usize) -> bool {
        i64::try_from(channel).map_or(true, |c| c > self.threshold)
    }
}

impl Default for BinningParams {
    fn default() -> Self {
        Self {
            bin_size: 1,
            threshold: 10,
        }
    }
}

/// Fold `counts` into `floor(len / bin_size)` bins, skipping channels at or below the
/// threshold.
pub fn aggregate(counts: &[u64], params: &BinningParams) -> Vec<u64> {
    let mut binned = vec![0u64; params.binned_len(counts.len())];
    for (channel, &count) in counts.iter().enumerate() {
        if !params.includes(channel) {
            continue;
        }
        if let Some(bin) = binned.get_mut(channel / params.bin_size) {
            *bin = bin.saturating_add(count);
        }
    }
    binned
}

/// Acquisition rate in counts per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    PerMinute(f64),
    /// Elapsed time was not positive, so no finite rate exists.
    Undefined,
}

impl Rate {
    pub fn from_counts(total: u64, elapsed_secs: f64) -> Self {
        if !(elapsed_secs > 0.0) || !elapsed_secs.is_finite() {
            return Rate::Undefined;
        }
        let cpm = total as f64 / elapsed_secs * 60.0;
        if cpm.is_finite() {
            Rate::PerMinute(cpm)
        } else {
            Rate::Undefined
        }
    }

    /// Rate over the sum of an already binned view.
    pub fn from_binned(binned: &[u64], elapsed_secs: f64) -> Self {
        let total = binned.iter().fold(0, |acc: u64, &c| acc.saturating_add(c));
        Self::from_counts(total, elapsed_secs)
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rate::PerMinute(cpm) => write!(f, "{cpm:.2} CPM"),
            Rate::Undefined => write!(f, "--- CPM"),
        }
    }
}

const SI_PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

/// Compact magnitude label: `1500.0 -> "1.5k"`, `999.0 -> "999"`.
///
/// Leading zeros are stripped, so zero itself renders as an empty label.
pub fn si_format(value: f64) -> String {
    let mut x = value.round();
    let mut prefix = 0;
    while prefix + 1 < SI_PREFIXES.len() && x > 1000.0 {
        x /= 1000.0;
        prefix += 1;
    }
    let label = if prefix == 0 {
        format!("{x}")
    } else {
        format!("{x:.1}{}", SI_PREFIXES[prefix])
    };
    label.trim_start_matches('0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_and_bin_size_scenario() {
        let params = BinningParams::new(2, 3).unwrap();
        let binned = aggregate(&[0, 0, 0, 0, 0, 2, 0, 1], &params);
        assert_eq!(binned, vec![0, 0, 2, 1]);
        assert_eq!(binned.iter().sum::<u64>(), 3);
    }

    #[test]
    fn huge_counts_saturate() {
        let counts = [0, 1 << 63, 1 << 63, 0];
        let params = BinningParams::new(2, -1).unwrap();
        assert_eq!(aggregate(&counts, &params), vec![u64::MAX, 0]);
        assert_eq!(Histogram::from_counts(counts.to_vec()).total(), u64::MAX);
        assert!(matches!(
            Rate::from_binned(&[u64::MAX, u64::MAX], 60.0),
            Rate::PerMinute(cpm) if cpm > 1.8e19
        ));
    }

    #[test]
    fn aggregation_conserves_counts_above_threshold() {
        let counts: Vec<u64> = (0..64).map(|i| (i * 7 % 13) as u64).collect();
        for bin_size in [1, 2, 4, 8, 16, 32, 64] {
            for threshold in [-1, 0, 5, 31, 63] {
                let params = BinningParams::new(bin_size, threshold).unwrap();
                let expected: u64 = counts
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i as i64 > threshold)
                    .map(|(_, c)| *c)
                    .sum();
                assert_eq!(aggregate(&counts, &params).iter().sum::<u64>(), expected);
            }
        }
    }

    #[test]
    fn trailing_channels_are_truncated() {
        let params = BinningParams::new(3, -1).unwrap();
        let binned = aggregate(&[1, 1, 1, 1, 1, 1, 1, 5], &params);
        assert_eq!(binned, vec![3, 3]);
    }

    #[test]
    fn zero_bin_size_rejected() {
        assert!(matches!(
            BinningParams::new(0, 0),
            Err(SpectrumError::InvalidBinSize(0))
        ));
    }

    #[test]
    fn increment_and_replace_keep_length() {
        let mut h = Histogram::zeros(8);
        h.increment(5).unwrap();
        h.increment(5).unwrap();
        assert_eq!(h.counts(), &[0, 0, 0, 0, 0, 2, 0, 0]);
        assert!(h.increment(8).is_err());
        assert!(h.replace(vec![1; 7]).is_err());
        h.replace(vec![1; 8]).unwrap();
        assert_eq!(h.total(), 8);
    }

    #[test]
    fn rate_is_undefined_without_elapsed_time() {
        assert_eq!(Rate::from_counts(10, 0.0), Rate::Undefined);
        assert_eq!(Rate::from_counts(10, -3.0), Rate::Undefined);
        assert_eq!(Rate::from_counts(10, f64::NAN), Rate::Undefined);
        assert_eq!(Rate::Undefined.to_string(), "--- CPM");
        assert_eq!(Rate::from_counts(30, 60.0).to_string(), "30.00 CPM");
    }

    #[test]
    fn si_format_scales_large_values() {
        assert_eq!(si_format(0.0), "");
        assert_eq!(si_format(999.4), "999");
        assert_eq!(si_format(1000.0), "1000");
        assert_eq!(si_format(1500.0), "1.5k");
        assert_eq!(si_format(2_000_000.0), "2.0M");
        assert_eq!(si_format(3.2e9), "3.2G");
        assert_eq!(si_format(5e15), "5000.0T");
    }
}
