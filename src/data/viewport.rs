//! Channel/count to pixel mapping plus the constrained zoom/pan transform.
//!
//! Widths are recomputed on every call because both the container size and the bin size
//! can change between render ticks. The display surface is only ever queried through
//! [`ViewportSizeProvider`], which keeps the math testable without a window.

/// Smallest allowed zoom factor (whole spectrum visible).
pub const MIN_ZOOM: f64 = 1.0;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 100.0;
/// Vertical pixels per count used when there is nothing to scale against.
pub const MIN_PIXELS_PER_UNIT: f64 = 10.0;

/// Drawable area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: sanitize(width),
            height: sanitize(height),
        }
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Anything that can report the current size of the drawing surface.
pub trait ViewportSizeProvider {
    fn viewport_size(&self) -> ViewportSize;
}

impl ViewportSizeProvider for ViewportSize {
    fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }
}

/// Linear map from a domain interval onto a range interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map a domain value to the range. A degenerate domain maps everything to the start
    /// of the range.
    pub fn apply(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }
}

/// Scales resolved for one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub size: ViewportSize,
    /// Unzoomed channel -> pixel scale.
    pub x: LinearScale,
    /// Count -> pixel scale, inverted so larger counts sit higher.
    pub y: LinearScale,
    /// Unzoomed pixel width of one display bin.
    pub bar_width: f64,
    pub pixels_per_count: f64,
    pub zoom: f64,
    pub translate_x: f64,
}

impl Scales {
    /// Pixel position of a channel boundary with the zoom transform applied.
    pub fn channel_to_px(&self, channel: f64) -> f64 {
        self.translate_x + self.zoom * self.x.apply(channel)
    }

    /// Channel under a pixel position with the zoom transform applied.
    pub fn px_to_channel(&self, px: f64) -> f64 {
        self.x.invert((px - self.translate_x) / self.zoom)
    }

    /// Bar width after zooming.
    pub fn zoomed_bar_width(&self) -> f64 {
        self.bar_width * self.zoom
    }

    /// Visible channel interval.
    pub fn visible_channels(&self) -> (f64, f64) {
        (self.px_to_channel(0.0), self.px_to_channel(self.size.width))
    }
}

/// Zoom factor plus translation, kept within the content bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale: f64,
    translate: [f64; 2],
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: MIN_ZOOM,
            translate: [0.0, 0.0],
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate_x(&self) -> f64 {
        self.translate[0]
    }

    /// Vertical translation is tracked but never applied to the count axis.
    pub fn translate_y(&self) -> f64 {
        self.translate[1]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Unzoomed width of one display bin.
    pub fn bar_width(size: ViewportSize, channels: usize, bin_size: usize) -> f64 {
        if channels == 0 {
            return 0.0;
        }
        size.width / channels as f64 * bin_size as f64
    }

    fn content_width(size: ViewportSize, channels: usize, bin_size: usize) -> f64 {
        if bin_size == 0 {
            return 0.0;
        }
        Self::bar_width(size, channels, bin_size) * channels as f64 / bin_size as f64
    }

    /// Pull the horizontal translation back inside `[content - width * scale, 0]`.
    pub fn clamp(&mut self, size: ViewportSize, channels: usize, bin_size: usize) {
        let lower = Self::content_width(size, channels, bin_size) - size.width * self.scale;
        self.translate[0] = clamp(self.translate[0], lower.min(0.0), 0.0);
    }

    /// Multiply the zoom by `factor`, keeping the content under `focus_x` in place.
    pub fn zoom_at(
        &mut self,
        factor: f64,
        focus_x: f64,
        size: ViewportSize,
        channels: usize,
        bin_size: usize,
    ) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let new_scale = clamp(self.scale * factor, MIN_ZOOM, MAX_ZOOM);
        let focus_x = if focus_x.is_finite() { focus_x } else { 0.0 };
        self.translate[0] = focus_x - (focus_x - self.translate[0]) * new_scale / self.scale;
        self.scale = new_scale;
        self.clamp(size, channels, bin_size);
    }

    pub fn pan_by(
        &mut self,
        dx: f64,
        dy: f64,
        size: ViewportSize,
        channels: usize,
        bin_size: usize,
    ) {
        if dx.is_finite() {
            self.translate[0] += dx;
        }
        if dy.is_finite() {
            self.translate[1] += dy;
        }
        self.clamp(size, channels, bin_size);
    }

    /// Resolve scales for the current surface and binned data.
    pub fn scales(
        &mut self,
        surface: &impl ViewportSizeProvider,
        channels: usize,
        bin_size: usize,
        binned: &[u64],
    ) -> Scales {
        let size = surface.viewport_size();
        self.clamp(size, channels, bin_size);

        let bar_width = Self::bar_width(size, channels, bin_size);
        let x = LinearScale::new(
            (0.0, channels as f64),
            (0.0, bar_width * binned.len() as f64),
        );

        let max = binned.iter().copied().max().unwrap_or(0) as f64;
        let y = LinearScale::new((max, 0.0), (0.0, size.height));
        let pixels_per_count = if max == 0.0 {
            MIN_PIXELS_PER_UNIT
        } else {
            size.height / max
        };

        Scales {
            size,
            x,
            y,
            bar_width,
            pixels_per_count,
            zoom: self.scale,
            translate_x: self.translate[0],
        }
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const SIZE: ViewportSize = ViewportSize {
        width: 800.0,
        height: 400.0,
    };

    #[test]
    fn horizontal_scale_spans_width() {
        let mut vp = Viewport::new();
        let binned = vec![1u64; 256];
        let s = vp.scales(&SIZE, 1024, 4, &binned);
        assert_eq!(s.bar_width, 800.0 / 1024.0 * 4.0);
        assert!((s.channel_to_px(1024.0) - 800.0).abs() < 1e-9);
        assert_eq!(s.channel_to_px(0.0), 0.0);
    }

    #[test]
    fn vertical_scale_is_inverted() {
        let mut vp = Viewport::new();
        let s = vp.scales(&SIZE, 4, 1, &[0, 5, 10, 2]);
        assert_eq!(s.y.apply(10.0), 0.0);
        assert_eq!(s.y.apply(0.0), 400.0);
        assert_eq!(s.pixels_per_count, 40.0);
    }

    #[test]
    fn empty_data_uses_minimal_pixels_per_unit() {
        let mut vp = Viewport::new();
        let s = vp.scales(&SIZE, 4, 1, &[0, 0, 0, 0]);
        assert_eq!(s.pixels_per_count, MIN_PIXELS_PER_UNIT);
        let s = vp.scales(&ViewportSize::new(0.0, 0.0), 0, 1, &[]);
        assert_eq!(s.bar_width, 0.0);
        assert!(s.channel_to_px(10.0).is_finite());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::new();
        vp.zoom_at(1000.0, 400.0, SIZE, 1024, 1);
        assert_eq!(vp.scale(), MAX_ZOOM);
        vp.zoom_at(1e-6, 400.0, SIZE, 1024, 1);
        assert_eq!(vp.scale(), MIN_ZOOM);
        assert_eq!(vp.translate_x(), 0.0);
    }

    #[test]
    fn zoom_keeps_focus_in_place() {
        let mut vp = Viewport::new();
        vp.zoom_at(2.0, 400.0, SIZE, 1024, 1);
        let s = vp.scales(&SIZE, 1024, 1, &[1; 1024]);
        assert!((s.px_to_channel(400.0) - 512.0).abs() < 1e-9);
    }

    #[test]
    fn translate_never_exposes_outside_content() {
        let mut vp = Viewport::new();
        let mut rng = StdRng::seed_from_u64(0x2545_f491);
        for _ in 0..2000 {
            if rng.gen_bool(1.0 / 3.0) {
                vp.zoom_at(rng.gen_range(0.25..4.25), rng.gen_range(0.0..800.0), SIZE, 1024, 8);
            } else {
                vp.pan_by(rng.gen_range(-1500.0..1500.0), rng.gen_range(-25.0..25.0), SIZE, 1024, 8);
            }
            assert!(vp.scale() >= MIN_ZOOM && vp.scale() <= MAX_ZOOM);
            assert!(vp.translate_x() <= 0.0);
            assert!(vp.translate_x() >= 800.0 - 800.0 * vp.scale() - 1e-9);
        }
    }

    #[test]
    fn pan_at_unit_zoom_is_pinned() {
        let mut vp = Viewport::new();
        vp.pan_by(-250.0, 30.0, SIZE, 1024, 1);
        assert_eq!(vp.translate_x(), 0.0);
        assert_eq!(vp.translate_y(), 30.0);
    }
}
