//! Top-level entry points for running the viewer as a native window.
//!
//! [`run_live`] drives a live session from an [`InstrumentLink`]; [`run_snapshot`]
//! shows a stored snapshot read-only. Both block until the window is closed.

use eframe::egui;

use crate::config::LiveSpectrumConfig;
use crate::persistence::SnapshotState;
use crate::protocol::Metadata;
use crate::sink::InstrumentLink;

use super::{SpectrumApp, SpectrumPanel};

/// Launch a live viewer for the instrument described by `metadata`.
pub fn run_live(
    metadata: Metadata,
    link: InstrumentLink,
    mut cfg: LiveSpectrumConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let panel = SpectrumPanel::live(metadata, link, &cfg)?;
    let opts = native_options(&mut cfg);
    run_panel(&cfg.title, opts, panel)
}

/// Launch a read-only viewer for `snapshot`.
pub fn run_snapshot(
    snapshot: SnapshotState,
    mut cfg: LiveSpectrumConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let panel = SpectrumPanel::frozen(snapshot, &cfg)?;
    let opts = native_options(&mut cfg);
    run_panel(&cfg.title, opts, panel)
}

fn run_panel(
    title: &str,
    opts: eframe::NativeOptions,
    panel: SpectrumPanel,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = SpectrumApp::new(panel);
    eframe::run_native(
        title,
        opts,
        Box::new(|cc| {
            // Install Phosphor icon font before creating the app.
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| format!("viewer window failed: {e}"))?;
    Ok(())
}

fn native_options(cfg: &mut LiveSpectrumConfig) -> eframe::NativeOptions {
    let mut opts = cfg.native_options.take().unwrap_or_default();

    if opts.viewport.icon.is_none() {
        if let Some(icon) = load_app_icon_svg() {
            opts.viewport = opts.viewport.clone().with_icon(icon);
        }
    }
    if opts.viewport.inner_size.is_none() {
        opts.viewport = opts
            .viewport
            .clone()
            .with_inner_size(egui::vec2(1200.0, 600.0));
    }
    opts
}

/// Rasterize the bundled `icon.svg` into an [`egui::IconData`].
fn load_app_icon_svg() -> Option<egui::IconData> {
    let data = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/icon.svg"));
    rasterize_svg(data)
}

fn rasterize_svg(data: &[u8]) -> Option<egui::IconData> {
    let opt = usvg::Options::default();
    let tree = match usvg::Tree::from_data(data, &opt) {
        Ok(tree) => tree,
        Err(e) => {
            log::warn!("could not parse window icon: {e}");
            return None;
        }
    };
    let size = tree.size().to_int_size();
    if size.width() == 0 || size.height() == 0 {
        return None;
    }
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())?;
    let mut canvas = pixmap.as_mut();
    resvg::render(&tree, tiny_skia::Transform::default(), &mut canvas);
    Some(egui::IconData {
        rgba: pixmap.take(),
        width: size.width(),
        height: size.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_icon_rasterizes() {
        let icon = load_app_icon_svg().unwrap();
        assert_eq!(icon.width, 64);
        assert_eq!(icon.rgba.len(), 64 * 64 * 4);
    }
}
