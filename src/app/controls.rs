//! Control bar: binning, threshold, export, autosave, acquisition commands and the
//! instrument's configuration properties.

use std::time::Instant;

use eframe::egui;
use egui_phosphor::regular::{
    ARROWS_COUNTER_CLOCKWISE, BROOM, FILE_HTML, FILE_TEXT, FLOPPY_DISK, PLUGS,
};

use crate::data::timing::unix_now;
use crate::persistence::{write_html_snapshot, write_text_export};
use crate::protocol::PropKind;
use crate::session::{Autosave, SessionMode};

use super::SpectrumPanel;

impl SpectrumPanel {
    /// Draw the control bar. Returns `true` when the view needs an immediate re-render.
    pub(crate) fn controls_ui(&mut self, ui: &mut egui::Ui) -> bool {
        let mut view_changed = false;

        ui.horizontal_wrapped(|ui| {
            view_changed |= self.binning_ui(ui);
            ui.separator();
            self.export_ui(ui);
            ui.separator();
            let _ = self.acquisition_ui(ui);
            ui.separator();
            if ui
                .button(format!("{ARROWS_COUNTER_CLOCKWISE} Reset view"))
                .on_hover_text("Zoom 1:1 (double click the plot)")
                .clicked()
            {
                self.pipeline.reset_view();
                view_changed = true;
            }
        });

        ui.horizontal_wrapped(|ui| {
            let rate = self
                .last_frame
                .as_ref()
                .map(|f| f.rate.to_string())
                .unwrap_or_else(|| crate::data::histogram::Rate::Undefined.to_string());
            ui.strong(rate);
            ui.separator();
            ui.monospace(&self.elapsed_label);
            match self.session.mode() {
                SessionMode::Frozen => {
                    ui.separator();
                    ui.label("snapshot");
                }
                SessionMode::Live if self.session.connection_lost() => {
                    ui.separator();
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, format!("{PLUGS} disconnected"));
                }
                _ => {}
            }
            if let Some(status) = &self.status {
                ui.separator();
                let color = ui.visuals().warn_fg_color;
                ui.colored_label(color, status);
            }
        });

        if self.session.mode() == SessionMode::Live && !self.session.controls().is_empty() {
            self.config_props_ui(ui);
        }
        view_changed
    }

    fn binning_ui(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;

        let mut bin_size = self.pipeline.params().bin_size();
        ui.label("Bin size:");
        egui::ComboBox::from_id_salt("spectrum_bin_size")
            .selected_text(bin_size.to_string())
            .show_ui(ui, |ui| {
                for &size in &self.bin_sizes {
                    ui.selectable_value(&mut bin_size, size, size.to_string());
                }
            });
        if bin_size != self.pipeline.params().bin_size() {
            match self.pipeline.set_bin_size(bin_size) {
                Ok(()) => changed = true,
                Err(e) => log::warn!("{e}"),
            }
        }

        let mut threshold = self.pipeline.params().threshold;
        ui.label("Threshold:");
        if ui
            .add(egui::DragValue::new(&mut threshold).speed(1.0))
            .on_hover_text("Channels at or below this index are excluded")
            .changed()
        {
            self.pipeline.set_threshold(threshold);
            changed = true;
        }
        changed
    }

    fn export_ui(&mut self, ui: &mut egui::Ui) {
        let now = unix_now();

        if ui.button(format!("{FILE_TEXT} Export TXT")).clicked() {
            let export = self.session.text_export(now);
            if let Some(path) = rfd::FileDialog::new()
                .set_file_name(export.file_name())
                .add_filter("Text", &["txt"])
                .save_file()
            {
                self.report_export(&path, write_text_export(&path, &export));
            }
        }

        if ui.button(format!("{FILE_HTML} Export HTML")).clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .set_file_name("spectrum.html")
                .add_filter("HTML", &["html", "htm"])
                .save_file()
            {
                let state = self
                    .session
                    .snapshot(now)
                    .with_view(self.pipeline.params());
                self.report_export(&path, write_html_snapshot(&path, &state, &self.title));
            }
        }
    }

    fn report_export(&mut self, path: &std::path::Path, result: crate::error::Result<()>) {
        match result {
            Ok(()) => {
                log::info!("exported {}", path.display());
                self.status = None;
            }
            Err(e) => {
                log::error!("failed to export {}: {e}", path.display());
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    /// Clear button and autosave input. Both are greyed out unless the session is live and
    /// connected. Returns the clear button's response.
    fn acquisition_ui(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let enabled = self.session.acquisition_enabled();

        let clear = ui.add_enabled(enabled, egui::Button::new(format!("{BROOM} Clear")));
        if clear.clicked() {
            if let Err(e) = self.session.clear() {
                log::warn!("clear rejected: {e}");
            }
        }

        ui.label(format!("{FLOPPY_DISK} Autosave [s]:"));
        let response = ui.add_enabled(
            enabled,
            egui::TextEdit::singleline(&mut self.autosave_input)
                .desired_width(48.0)
                .hint_text("off"),
        );
        if response.changed() {
            let interval = Autosave::parse_interval(&self.autosave_input);
            if interval != self.session.autosave().interval() {
                self.session.set_autosave(interval, Instant::now());
            }
        }
        clear
    }

    /// One widget per configuration property. Values coming from the instrument only
    /// update the widget; a command is sent only when the user edits it.
    fn config_props_ui(&mut self, ui: &mut egui::Ui) {
        let enabled = self.session.acquisition_enabled();
        let mut edits = Vec::new();

        ui.horizontal_wrapped(|ui| {
            ui.add_enabled_ui(enabled, |ui| {
                for control in self.session.controls().iter() {
                    match control.kind() {
                        PropKind::Toggle => {
                            let mut checked = control.checked();
                            if ui.checkbox(&mut checked, &control.prop.name).changed() {
                                edits.push((control.prop.id.clone(), i64::from(checked)));
                            }
                        }
                        PropKind::Numeric => {
                            ui.label(&control.prop.name);
                            let mut value = control.value;
                            let lo = control.prop.from.min(control.prop.to);
                            let hi = control.prop.from.max(control.prop.to);
                            if ui
                                .add(egui::DragValue::new(&mut value).range(lo..=hi))
                                .changed()
                            {
                                edits.push((control.prop.id.clone(), value));
                            }
                        }
                    }
                }
            });
        });

        for (id, value) in edits {
            if let Err(e) = self.session.set_property(&id, value) {
                log::warn!("set {id} rejected: {e}");
            }
        }
    }
}
