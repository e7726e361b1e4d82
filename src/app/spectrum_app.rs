//! Standalone application wrapper.
//!
//! [`SpectrumApp`] wraps a [`SpectrumPanel`] and implements [`eframe::App`] so the
//! viewer can run in its own native window.

use eframe::egui;

use super::SpectrumPanel;

/// Standalone spectrum viewer implementing [`eframe::App`].
pub struct SpectrumApp {
    /// The inner panel widget that owns all data and UI state.
    pub panel: SpectrumPanel,
    /// Optional heading text shown at the top of the window.
    pub headline: Option<String>,
}

impl SpectrumApp {
    pub fn new(panel: SpectrumPanel) -> Self {
        Self {
            panel,
            headline: None,
        }
    }

    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }
}

impl eframe::App for SpectrumApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(h) = &self.headline {
            egui::TopBottomPanel::top("spectrum_headline").show(ctx, |ui| {
                ui.heading(h);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.panel.update(ui);
        });
    }
}
