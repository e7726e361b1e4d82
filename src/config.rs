//! Configuration for the spectrum viewer.

use std::path::PathBuf;
use std::time::Duration;

use crate::data::histogram::BinningParams;
use crate::data::timing::{RENDER_INTERVAL, TIMER_INTERVAL};
use crate::error::Result;

/// Top-level configuration.
///
/// | Field             | Purpose |
/// |-------------------|---------|
/// | `render_interval` | Histogram redraw cadence |
/// | `timer_interval`  | Elapsed-time readout cadence |
/// | `bin_sizes`       | Widths offered by the bin size selector |
/// | `autosave_secs`   | Periodic export-then-clear, off when `None` |
/// | `export_dir`      | Where autosave writes its files |
pub struct LiveSpectrumConfig {
    // ── Window / chrome ──────────────────────────────────────────────────────
    /// Native window title.
    pub title: String,
    /// Optional eframe native-window options.
    pub native_options: Option<eframe::NativeOptions>,

    // ── Cadence ──────────────────────────────────────────────────────────────
    pub render_interval: Duration,
    pub timer_interval: Duration,

    // ── Binning ──────────────────────────────────────────────────────────────
    pub bin_sizes: Vec<usize>,
    /// Initial bin width.
    pub bin_size: usize,
    /// Initial threshold; channels at or below this index are left out of binning and
    /// the rate.
    pub threshold: i64,

    // ── Export ───────────────────────────────────────────────────────────────
    pub autosave_secs: Option<u64>,
    pub export_dir: PathBuf,
}

impl LiveSpectrumConfig {
    /// Binning parameters for the initial view.
    pub fn binning(&self) -> Result<BinningParams> {
        BinningParams::new(self.bin_size, self.threshold)
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        self.autosave_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

impl Clone for LiveSpectrumConfig {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            native_options: self.native_options.clone(),
            render_interval: self.render_interval,
            timer_interval: self.timer_interval,
            bin_sizes: self.bin_sizes.clone(),
            bin_size: self.bin_size,
            threshold: self.threshold,
            autosave_secs: self.autosave_secs,
            export_dir: self.export_dir.clone(),
        }
    }
}

impl Default for LiveSpectrumConfig {
    fn default() -> Self {
        Self {
            title: "Live Spectrum".to_string(),
            native_options: None,

            render_interval: RENDER_INTERVAL,
            timer_interval: TIMER_INTERVAL,

            bin_sizes: vec![1, 2, 4, 8, 16, 32, 64],
            bin_size: 1,
            threshold: 10,

            autosave_secs: None,
            export_dir: PathBuf::from("."),
        }
    }
}
