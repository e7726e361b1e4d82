//! One render pass: bin the histogram, resolve scales, derive ticks and the bar diff.

use super::bars::{compute_bars, y_ticks, BarDiff, BarSet};
use super::histogram::{aggregate, si_format, BinningParams, Histogram, Rate};
use super::viewport::{Scales, Viewport, ViewportSize, ViewportSizeProvider};
use crate::error::Result;

/// Everything a painter needs for one tick.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub binned: Vec<u64>,
    pub rate: Rate,
    /// Count-axis tick values with their labels.
    pub y_ticks: Vec<(f64, String)>,
    pub scales: Scales,
    pub diff: BarDiff,
}

/// Owns the binning parameters, the zoom/pan transform and the live bar handles.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    params: BinningParams,
    viewport: Viewport,
    bars: BarSet,
    pending: BarDiff,
    channels: usize,
    last_size: ViewportSize,
}

impl RenderPipeline {
    pub fn new(params: BinningParams) -> Self {
        Self {
            params,
            viewport: Viewport::new(),
            bars: BarSet::new(),
            pending: BarDiff::default(),
            channels: 0,
            last_size: ViewportSize::default(),
        }
    }

    pub fn params(&self) -> &BinningParams {
        &self.params
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn bars(&self) -> &BarSet {
        &self.bars
    }

    /// Change the bin width. Existing handles are dropped because bin indices now refer to
    /// different channel ranges; the removals are emitted with the next frame.
    pub fn set_bin_size(&mut self, bin_size: usize) -> Result<()> {
        if bin_size == self.params.bin_size() {
            return Ok(());
        }
        self.params.set_bin_size(bin_size)?;
        let removed = self.bars.reset();
        self.pending.extend(removed);
        self.viewport
            .clamp(self.last_size, self.channels, self.params.bin_size());
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: i64) {
        self.params.threshold = threshold;
    }

    /// Zoom around a pixel position, using the surface size seen by the last render.
    pub fn zoom_at(&mut self, factor: f64, focus_x: f64) {
        self.viewport.zoom_at(
            factor,
            focus_x,
            self.last_size,
            self.channels,
            self.params.bin_size(),
        );
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport
            .pan_by(dx, dy, self.last_size, self.channels, self.params.bin_size());
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn render(
        &mut self,
        histogram: &Histogram,
        elapsed_secs: f64,
        surface: &impl ViewportSizeProvider,
    ) -> RenderFrame {
        self.channels = histogram.len();
        self.last_size = surface.viewport_size();

        let bin_size = self.params.bin_size();
        let binned = aggregate(histogram.counts(), &self.params);
        let rate = Rate::from_binned(&binned, elapsed_secs);
        let scales = self
            .viewport
            .scales(surface, self.channels, bin_size, &binned);

        let max = binned.iter().copied().max().unwrap_or(0);
        let y_ticks = y_ticks(max)
            .into_iter()
            .map(|t| (t, si_format(t)))
            .collect();

        let mut diff = std::mem::take(&mut self.pending);
        diff.extend(self.bars.reconcile(compute_bars(&binned, bin_size, &scales)));

        RenderFrame {
            binned,
            rate,
            y_ticks,
            scales,
            diff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> ViewportSize {
        ViewportSize::new(640.0, 480.0)
    }

    #[test]
    fn frame_reports_rate_and_ticks() {
        let mut p = RenderPipeline::new(BinningParams::new(2, 3).unwrap());
        let h = Histogram::from_counts(vec![0, 0, 0, 0, 0, 2, 0, 1]);
        let frame = p.render(&h, 60.0, &surface());
        assert_eq!(frame.binned.iter().sum::<u64>(), 3);
        assert_eq!(frame.rate, Rate::PerMinute(3.0));
        assert_eq!(frame.y_ticks.len(), 10);
        assert_eq!(frame.y_ticks[0].1, "");
        assert_eq!(frame.diff.create.len(), 2);
    }

    #[test]
    fn bin_size_change_resets_handles() {
        let mut p = RenderPipeline::new(BinningParams::new(1, -1).unwrap());
        let h = Histogram::filled(16, 1);
        let first = p.render(&h, 1.0, &surface());
        assert_eq!(first.diff.create.len(), 16);

        p.set_bin_size(4).unwrap();
        let second = p.render(&h, 1.0, &surface());
        assert_eq!(second.diff.remove.len(), 16);
        assert_eq!(second.diff.create.len(), 4);
        assert_eq!(p.bars().len(), 4);
        assert!(p.set_bin_size(0).is_err());
    }

    #[test]
    fn zoom_hides_bars_outside_view() {
        let mut p = RenderPipeline::new(BinningParams::new(1, -1).unwrap());
        let h = Histogram::filled(64, 2);
        p.render(&h, 1.0, &surface());
        p.zoom_at(8.0, 0.0);
        let frame = p.render(&h, 1.0, &surface());
        // 80 px per bar at 8x zoom: bins 0..=8 start inside the 640 px surface
        assert_eq!(p.bars().len(), 9);
        assert!(!frame.diff.remove.is_empty());
        p.reset_view();
        p.render(&h, 1.0, &surface());
        assert_eq!(p.bars().len(), 64);
    }

    #[test]
    fn oversized_history_still_renders() {
        let mut p = RenderPipeline::new(BinningParams::new(1, -1).unwrap());
        let h = Histogram::from_counts(vec![0, 1 << 63, 1 << 63, 0]);
        let frame = p.render(&h, 60.0, &surface());
        assert_eq!(frame.binned, vec![0, 1 << 63, 1 << 63, 0]);
        assert!(matches!(frame.rate, Rate::PerMinute(cpm) if cpm.is_finite()));
        assert_eq!(frame.y_ticks.len(), 10);
    }

    #[test]
    fn degenerate_elapsed_gives_undefined_rate() {
        let mut p = RenderPipeline::new(BinningParams::default());
        let h = Histogram::filled(32, 1);
        let frame = p.render(&h, 0.0, &surface());
        assert_eq!(frame.rate, Rate::Undefined);
    }
}
