//! LiveSpectrum crate root: re-exports and module wiring.
//!
//! A realtime viewer for pulse-height spectra streamed by a spectrometer, built on
//! egui/eframe. The crate is split into cohesive modules:
//! - `data`: binning, viewport mapping, bar reconciliation and timing
//! - `protocol`: the JSON frame contract with the instrument
//! - `session`: the live/frozen session state machine
//! - `persistence`: HTML snapshots and plain-text exports
//! - `sink`: the channel between a transport thread and the UI
//! - `demo`: a simulated instrument
//! - `config`: viewer configuration
//! - `app`: the egui panel and native window entry points

pub mod app;
pub mod config;
pub mod data;
pub mod demo;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod session;
pub mod sink;

// Public re-exports for a compact external API
pub use app::{run_live, run_snapshot, SpectrumApp, SpectrumPanel};
pub use config::LiveSpectrumConfig;
pub use data::histogram::{aggregate, si_format, BinningParams, Histogram, Rate};
pub use data::render::{RenderFrame, RenderPipeline};
pub use data::viewport::{ViewportSize, ViewportSizeProvider};
pub use error::{Result, SpectrumError};
pub use persistence::{SnapshotState, TextExport};
pub use protocol::{Command, InboundFrame, Metadata, OutboundFrame};
pub use session::{LiveSession, SessionMode, StateDelta};
pub use sink::{channel_link, InstrumentLink, LinkEvent, TransportEnd};
