//! Spectrum viewer GUI.
//!
//! | Sub-module       | Responsibility |
//! | ---------------- | -------------- |
//! | [`update`]       | Per-frame link draining, ticks, autosave, gestures and drawing |
//! | [`painter`]      | [`BarCanvas`], the egui implementation of [`BarPainter`](crate::data::bars::BarPainter) |
//! | [`controls`]     | Control bar: binning, threshold, export, autosave, config properties |
//! | [`spectrum_app`] | Standalone [`SpectrumApp`] (eframe) wrapper |
//! | [`run`]          | [`run_live()`] / [`run_snapshot()`] entry points and icon loading |

mod controls;
mod painter;
mod run;
mod spectrum_app;
mod update;

pub use painter::BarCanvas;
pub use run::{run_live, run_snapshot};
pub use spectrum_app::SpectrumApp;

use std::path::PathBuf;
use std::time::Instant;

use crate::config::LiveSpectrumConfig;
use crate::data::render::{RenderFrame, RenderPipeline};
use crate::data::timing::Ticker;
use crate::error::Result;
use crate::persistence::SnapshotState;
use crate::protocol::Metadata;
use crate::session::LiveSession;
use crate::sink::InstrumentLink;

/// The central widget: one session, its render pipeline and the bar canvas.
///
/// Can be embedded in a host egui application through [`SpectrumPanel::update`], or run
/// standalone through [`SpectrumApp`].
pub struct SpectrumPanel {
    // ── Data ─────────────────────────────────────────────────────────────────
    pub(crate) session: LiveSession,
    /// `None` for frozen sessions.
    pub(crate) link: Option<InstrumentLink>,

    // ── Rendering ────────────────────────────────────────────────────────────
    pub(crate) pipeline: RenderPipeline,
    pub(crate) canvas: BarCanvas,
    pub(crate) last_frame: Option<RenderFrame>,
    pub(crate) render_ticker: Ticker,
    pub(crate) timer_ticker: Ticker,
    /// `HH:MM:SS`, refreshed by the timer tick.
    pub(crate) elapsed_label: String,

    // ── Controls ─────────────────────────────────────────────────────────────
    pub(crate) bin_sizes: Vec<usize>,
    pub(crate) autosave_input: String,
    pub(crate) export_dir: PathBuf,
    pub(crate) title: String,
    /// Last export or send failure, shown in the control bar.
    pub(crate) status: Option<String>,
}

impl SpectrumPanel {
    fn with_session(
        session: LiveSession,
        link: Option<InstrumentLink>,
        cfg: &LiveSpectrumConfig,
    ) -> Result<Self> {
        let params = cfg.binning()?;
        let mut bin_sizes = cfg.bin_sizes.clone();
        if !bin_sizes.contains(&params.bin_size()) {
            bin_sizes.push(params.bin_size());
            bin_sizes.sort_unstable();
        }
        Ok(Self {
            session,
            link,
            pipeline: RenderPipeline::new(params),
            canvas: BarCanvas::default(),
            last_frame: None,
            render_ticker: Ticker::new(cfg.render_interval),
            timer_ticker: Ticker::new(cfg.timer_interval),
            elapsed_label: crate::data::timing::format_elapsed(0.0),
            bin_sizes,
            autosave_input: cfg
                .autosave_interval()
                .map(|d| d.as_secs().to_string())
                .unwrap_or_default(),
            export_dir: cfg.export_dir.clone(),
            title: cfg.title.clone(),
            status: None,
        })
    }

    /// Live panel fed by `link`.
    pub fn live(
        metadata: Metadata,
        link: InstrumentLink,
        cfg: &LiveSpectrumConfig,
    ) -> Result<Self> {
        let session = LiveSession::live(metadata, crate::data::timing::unix_now());
        let mut panel = Self::with_session(session, Some(link), cfg)?;
        if let Some(interval) = cfg.autosave_interval() {
            panel.session.set_autosave(Some(interval), Instant::now());
        }
        Ok(panel)
    }

    /// Read-only panel showing a stored snapshot.
    pub fn frozen(snapshot: SnapshotState, cfg: &LiveSpectrumConfig) -> Result<Self> {
        let binning = snapshot.binning();
        let mut cfg = cfg.clone();
        cfg.bin_size = binning.bin_size();
        cfg.threshold = binning.threshold;
        cfg.autosave_secs = None;
        Self::with_session(LiveSession::frozen(snapshot), None, &cfg)
    }

    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }
}
