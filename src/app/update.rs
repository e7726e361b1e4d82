//! Per-frame update logic for [`SpectrumPanel`].
//!
//! * **[`update`](SpectrumPanel::update)** – top-level entry point called every frame.
//! * **[`update_data`](SpectrumPanel::update_data)** – the data-only pass: drain the
//!   instrument link, run the timer and autosave ticks, flush queued commands.
//! * **[`render_now`](SpectrumPanel::render_now)** – one render pipeline pass, applied to
//!   the canvas.

use std::time::Instant;

use eframe::egui;

use crate::data::bars::BarPainter;
use crate::data::timing::{format_elapsed, unix_now};
use crate::data::viewport::{ViewportSize, ViewportSizeProvider};

use super::SpectrumPanel;

/// Scroll-wheel sensitivity, in zoom factor per scroll point.
const WHEEL_ZOOM_RATE: f64 = 0.001;

impl ViewportSizeProvider for egui::Rect {
    fn viewport_size(&self) -> ViewportSize {
        ViewportSize::new(self.width() as f64, self.height() as f64)
    }
}

impl SpectrumPanel {
    /// Main per-frame update: ingest data, draw the control bar, then the spectrum.
    pub fn update(&mut self, ui: &mut egui::Ui) {
        let now = Instant::now();
        self.update_data(now);

        let mut view_changed = self.controls_ui(ui);
        ui.separator();

        let size = ui.available_size_before_wrap().max(egui::vec2(64.0, 64.0));
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;

        view_changed |= self.apply_gestures(ui, &response);
        if self.render_ticker.due(now) || view_changed || self.last_frame.is_none() {
            self.render_now(&rect);
        }
        self.canvas.paint(&painter, rect, self.last_frame.as_ref());

        if let Some(link) = &self.link {
            link.flush(&mut self.session);
        }

        let next = self
            .render_ticker
            .remaining(now)
            .min(self.timer_ticker.remaining(now));
        ui.ctx().request_repaint_after(next);
    }

    /// Data-only pass; safe to call without drawing anything.
    pub fn update_data(&mut self, now: Instant) {
        if let Some(link) = &mut self.link {
            link.pump(&mut self.session);
        }

        let wall_now = unix_now();
        if self.timer_ticker.due(now) {
            self.elapsed_label = format_elapsed(self.session.elapsed(wall_now));
        }

        if let Some(written) = self.session.autosave_into(&self.export_dir, now, wall_now) {
            match written {
                Ok(path) => {
                    log::info!("autosaved {}", path.display());
                    self.status = None;
                }
                Err(e) => {
                    log::error!("autosave failed, counts kept: {e}");
                    self.status = Some(format!("Autosave failed: {e}"));
                }
            }
        }
    }

    /// Run the render pipeline against `surface` and hand the diff to `painter`.
    pub fn render_into<P: BarPainter>(&mut self, surface: &impl ViewportSizeProvider, painter: &mut P) {
        let elapsed = self.session.elapsed(unix_now());
        let frame = self
            .pipeline
            .render(self.session.histogram(), elapsed, surface);
        frame.diff.apply(painter);
        self.last_frame = Some(frame);
    }

    pub(crate) fn render_now(&mut self, surface: &impl ViewportSizeProvider) {
        let mut canvas = std::mem::take(&mut self.canvas);
        self.render_into(surface, &mut canvas);
        self.canvas = canvas;
    }

    /// Wheel/pinch zoom around the pointer, primary-drag pan, double click resets.
    /// Everything that happened during this UI frame collapses into one view change.
    fn apply_gestures(&mut self, ui: &egui::Ui, response: &egui::Response) -> bool {
        let mut changed = false;

        if let Some(pos) = response.hover_pos() {
            let (scroll, pinch) = ui.input(|i| (i.raw_scroll_delta, i.zoom_delta()));
            let mut factor = pinch as f64;
            if scroll.y != 0.0 {
                factor *= 1.0 + scroll.y as f64 * WHEEL_ZOOM_RATE;
            }
            if factor != 1.0 && factor > 0.0 {
                let focus_x = (pos.x - response.rect.left()) as f64;
                self.pipeline.zoom_at(factor, focus_x);
                changed = true;
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                self.pipeline.pan_by(delta.x as f64, delta.y as f64);
                changed = true;
            }
        }

        if response.double_clicked() {
            self.pipeline.reset_view();
            changed = true;
        }
        changed
    }
}
