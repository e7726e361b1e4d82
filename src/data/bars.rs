//! Bar geometry and the reconciliation of bar handles between render passes.
//!
//! A bar exists for a bin only while its binned count is positive and at least part of it
//! lies inside the visible horizontal extent. [`BarSet`] remembers which bins currently own
//! a handle and turns each new target geometry map into a [`BarDiff`], which a
//! [`BarPainter`] applies without knowing anything about binning or scales.

use std::collections::BTreeMap;

use super::viewport::Scales;

/// Fraction of a bar's width left empty as a gap to the next bar.
pub const BAR_GUTTER: f64 = 0.15;
/// Number of labelled ticks on the count axis.
pub const Y_TICK_COUNT: usize = 10;

/// Pixel rectangle of one bar. `y` is the top edge; bars grow down to the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Geometry of `bin`, or `None` when it should have no handle.
///
/// Only the left edge is clipped; bars running past the right border are left as is
/// because nothing is drawn over that border.
pub fn bar_geometry(bin: usize, count: u64, bin_size: usize, scales: &Scales) -> Option<BarGeometry> {
    if count == 0 {
        return None;
    }
    let mut x = scales.channel_to_px((bin * bin_size) as f64);
    let zoomed = scales.zoomed_bar_width();
    let mut w = zoomed - (zoomed * BAR_GUTTER).floor();

    if x + w < 0.0 || x > scales.size.width {
        return None;
    }
    if x < 0.0 {
        w += x;
        x = 0.0;
    }

    Some(BarGeometry {
        x,
        y: scales.y.apply(count as f64).floor(),
        w,
        h: (count as f64 * scales.pixels_per_count).floor(),
    })
}

/// Target geometry for every bin that should currently be drawn.
pub fn compute_bars(binned: &[u64], bin_size: usize, scales: &Scales) -> BTreeMap<usize, BarGeometry> {
    binned
        .iter()
        .enumerate()
        .filter_map(|(bin, &count)| bar_geometry(bin, count, bin_size, scales).map(|g| (bin, g)))
        .collect()
}

/// Evenly spaced count-axis ticks: `0, step, .., 9 * step` with `step = max / 10`.
pub fn y_ticks(max: u64) -> Vec<f64> {
    let step = max as f64 / Y_TICK_COUNT as f64;
    (0..Y_TICK_COUNT).map(|i| i as f64 * step).collect()
}

/// Receiver of bar handle changes (a canvas, an SVG writer, a test recorder).
pub trait BarPainter {
    fn create_bar(&mut self, bin: usize, geometry: BarGeometry);
    fn update_bar(&mut self, bin: usize, geometry: BarGeometry);
    fn remove_bar(&mut self, bin: usize);
}

/// Minimal set of handle operations that turns the previous bar set into the new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarDiff {
    pub create: Vec<(usize, BarGeometry)>,
    pub update: Vec<(usize, BarGeometry)>,
    pub remove: Vec<usize>,
}

impl BarDiff {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Removals go first so a painter never holds two handles for one bin.
    pub fn apply<P: BarPainter + ?Sized>(&self, painter: &mut P) {
        for &bin in &self.remove {
            painter.remove_bar(bin);
        }
        for &(bin, g) in &self.update {
            painter.update_bar(bin, g);
        }
        for &(bin, g) in &self.create {
            painter.create_bar(bin, g);
        }
    }

    /// Append `other` after `self`.
    pub fn extend(&mut self, other: BarDiff) {
        self.create.extend(other.create);
        self.update.extend(other.update);
        self.remove.extend(other.remove);
    }
}

/// Bins that currently own a drawable handle, with the geometry last sent for each.
#[derive(Debug, Clone, Default)]
pub struct BarSet {
    handles: BTreeMap<usize, BarGeometry>,
}

impl BarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, bin: usize) -> bool {
        self.handles.contains_key(&bin)
    }

    pub fn geometry(&self, bin: usize) -> Option<BarGeometry> {
        self.handles.get(&bin).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, BarGeometry)> + '_ {
        self.handles.iter().map(|(&bin, &g)| (bin, g))
    }

    /// Bring the handle set in line with `target`. Unchanged bars are not reported.
    pub fn reconcile(&mut self, target: BTreeMap<usize, BarGeometry>) -> BarDiff {
        let mut diff = BarDiff::default();
        for &bin in self.handles.keys() {
            if !target.contains_key(&bin) {
                diff.remove.push(bin);
            }
        }
        for (&bin, &g) in &target {
            match self.handles.get(&bin) {
                None => diff.create.push((bin, g)),
                Some(old) if *old != g => diff.update.push((bin, g)),
                Some(_) => {}
            }
        }
        self.handles = target;
        diff
    }

    /// Drop every handle, e.g. after the bin size changed and bin indices lost their meaning.
    pub fn reset(&mut self) -> BarDiff {
        let remove = std::mem::take(&mut self.handles).into_keys().collect();
        BarDiff {
            remove,
            ..BarDiff::default()
        }
    }
}
