//! Live session state machine.
//!
//! A [`LiveSession`] owns the canonical histogram and acquisition timing. It starts
//! [`SessionMode::Uninitialized`] and moves exactly once, either to
//! [`SessionMode::Live`] (driven by inbound frames from the instrument) or to
//! [`SessionMode::Frozen`] (restored from a snapshot, acquisition disabled).
//!
//! Only the session mutates the histogram or queues frames for the instrument; renderers
//! read it between ticks.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::data::histogram::Histogram;
use crate::data::timing::SessionTiming;
use crate::error::{Result, SpectrumError};
use crate::persistence::{save_text_export, SnapshotState, TextExport};
use crate::protocol::{decode_frame, Command, ConfigProp, InboundFrame, Metadata, OutboundFrame, PropKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Uninitialized,
    Live,
    Frozen,
}

/// What an inbound frame changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    Incremented { channel: usize },
    HistoryReplaced { since: f64 },
    /// Displayed values were updated for these property ids.
    PropsSynced { ids: Vec<String> },
    ConfigAcknowledged,
    /// Nothing changed.
    Ignored,
}

/// Displayed value of one remotely adjustable property.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigControl {
    pub prop: ConfigProp,
    pub value: i64,
}

impl ConfigControl {
    pub fn kind(&self) -> PropKind {
        self.prop.kind()
    }

    pub fn checked(&self) -> bool {
        self.value != 0
    }
}

/// Controls generated from the metadata, in metadata order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigControls {
    controls: Vec<ConfigControl>,
}

impl ConfigControls {
    pub fn from_props(props: Vec<ConfigProp>) -> Self {
        let controls = props
            .into_iter()
            .map(|prop| ConfigControl {
                value: prop.from,
                prop,
            })
            .collect();
        Self { controls }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigControl> {
        self.controls.iter()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ConfigControl> {
        self.controls.iter().find(|c| c.prop.id == id)
    }

    /// Show `value` in the control for `id` without producing a change command.
    fn sync(&mut self, id: &str, value: i64) -> bool {
        match self.controls.iter_mut().find(|c| c.prop.id == id) {
            Some(control) => {
                control.value = value;
                true
            }
            None => false,
        }
    }
}

/// Periodic export-then-clear schedule.
#[derive(Debug, Clone, Default)]
pub struct Autosave {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl Autosave {
    /// Interval in whole seconds; empty, non-numeric or zero input disables autosave.
    pub fn parse_interval(input: &str) -> Option<Duration> {
        match input.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    fn configure(&mut self, interval: Option<Duration>, now: Instant) {
        self.interval = interval;
        self.next_due = interval.map(|i| now + i);
    }

    fn fire(&mut self, now: Instant) -> bool {
        match (self.interval, self.next_due) {
            (Some(interval), Some(due)) if now >= due => {
                self.next_due = Some(now + interval);
                true
            }
            _ => false,
        }
    }
}

/// Canonical histogram plus the protocol state around it.
#[derive(Debug, Clone)]
pub struct LiveSession {
    mode: SessionMode,
    histogram: Histogram,
    timing: SessionTiming,
    controls: ConfigControls,
    csrf: Option<String>,
    authenticated: bool,
    connection_lost: bool,
    outbox: VecDeque<OutboundFrame>,
    autosave: Autosave,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveSession {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Uninitialized,
            histogram: Histogram::zeros(0),
            timing: SessionTiming::default(),
            controls: ConfigControls::default(),
            csrf: None,
            authenticated: false,
            connection_lost: false,
            outbox: VecDeque::new(),
            autosave: Autosave::default(),
        }
    }

    /// Session started from instrument metadata, waiting for the channel to open.
    pub fn live(metadata: Metadata, now: f64) -> Self {
        let mut session = Self::new();
        session.enter_live(metadata, now);
        session
    }

    /// Session restored from a snapshot.
    pub fn frozen(snapshot: SnapshotState) -> Self {
        let mut session = Self::new();
        session.enter_frozen(snapshot);
        session
    }

    /// `Uninitialized -> Live`. Every channel holds one count until the history arrives.
    pub fn start_live(&mut self, metadata: Metadata, now: f64) -> Result<()> {
        self.transition(SessionMode::Live)?;
        self.enter_live(metadata, now);
        Ok(())
    }

    /// `Uninitialized -> Frozen`.
    pub fn freeze(&mut self, snapshot: SnapshotState) -> Result<()> {
        self.transition(SessionMode::Frozen)?;
        self.enter_frozen(snapshot);
        Ok(())
    }

    fn transition(&self, to: SessionMode) -> Result<()> {
        if self.mode != SessionMode::Uninitialized {
            return Err(SpectrumError::InvalidTransition {
                from: self.mode,
                to,
            });
        }
        Ok(())
    }

    fn enter_live(&mut self, metadata: Metadata, now: f64) {
        log::info!(
            "live session: {} channels, {} config properties",
            metadata.channels,
            metadata.configprops.len()
        );
        self.mode = SessionMode::Live;
        self.histogram = Histogram::filled(metadata.channels, 1);
        self.timing = SessionTiming::live(now);
        self.controls = ConfigControls::from_props(metadata.configprops);
        self.csrf = Some(metadata.csrf);
    }

    fn enter_frozen(&mut self, snapshot: SnapshotState) {
        log::info!(
            "frozen session: {} channels, {:.0} s of data",
            snapshot.hist.len(),
            snapshot.end_time() - snapshot.since
        );
        self.mode = SessionMode::Frozen;
        self.timing = SessionTiming::frozen(snapshot.since, snapshot.end_time());
        self.histogram = snapshot.hist;
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    pub fn controls(&self) -> &ConfigControls {
        &self.controls
    }

    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    /// Clear, set and autosave are only available on a connected live session.
    pub fn acquisition_enabled(&self) -> bool {
        self.mode == SessionMode::Live && !self.connection_lost
    }

    pub fn connection_lost(&self) -> bool {
        self.connection_lost
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        self.timing.elapsed(now)
    }

    /// Queue the one-time authentication frame.
    pub fn on_channel_open(&mut self) -> Result<()> {
        if self.mode != SessionMode::Live {
            return Err(SpectrumError::AcquisitionDisabled);
        }
        if self.authenticated {
            log::warn!("channel reported open twice; token already sent");
            return Ok(());
        }
        if let Some(csrf) = self.csrf.clone() {
            self.outbox.push_back(OutboundFrame::Auth { csrf });
            self.authenticated = true;
            log::info!("channel open, authenticating");
        }
        Ok(())
    }

    /// The channel went away. Live updates stop; the session keeps rendering what it has.
    pub fn on_channel_closed(&mut self) {
        if self.mode == SessionMode::Live && !self.connection_lost {
            log::error!("instrument channel closed; live updates stopped");
        }
        self.connection_lost = true;
        self.outbox.clear();
    }

    /// Decode and apply one text frame.
    pub fn handle_text(&mut self, text: &str) -> StateDelta {
        match decode_frame(text) {
            Ok(frame) => self.handle(frame),
            Err(e) => {
                log::warn!("dropping malformed frame {text:?}: {e}");
                StateDelta::Ignored
            }
        }
    }

    /// Apply one inbound frame. Never fails; rejected frames are logged and ignored.
    pub fn handle(&mut self, frame: InboundFrame) -> StateDelta {
        if self.mode != SessionMode::Live {
            log::debug!("{:?} session ignores inbound frame", self.mode);
            return StateDelta::Ignored;
        }
        match frame {
            InboundFrame::Increment { channel } => match self.histogram.increment(channel) {
                Ok(()) => StateDelta::Incremented {
                    channel: channel as usize,
                },
                Err(e) => {
                    log::warn!("dropping increment: {e}");
                    StateDelta::Ignored
                }
            },
            InboundFrame::ConfigAck(_) => {
                log::info!("configuration acknowledged");
                StateDelta::ConfigAcknowledged
            }
            InboundFrame::History { counts, since } => match self.histogram.replace(counts) {
                Ok(()) => {
                    log::info!("history received");
                    self.timing.since = since;
                    StateDelta::HistoryReplaced { since }
                }
                Err(e) => {
                    log::warn!("dropping history: {e}");
                    StateDelta::Ignored
                }
            },
            InboundFrame::Props(values) => {
                log::info!("configuration properties received");
                let mut ids = Vec::new();
                for (id, value) in values {
                    if self.controls.sync(&id, value) {
                        ids.push(id);
                    } else {
                        log::warn!("instrument reported unknown property {id:?}");
                    }
                }
                StateDelta::PropsSynced { ids }
            }
            InboundFrame::Unknown(value) => {
                log::warn!("unrecognized frame: {value}");
                StateDelta::Ignored
            }
        }
    }

    fn ensure_acquisition(&self) -> Result<()> {
        if self.mode != SessionMode::Live {
            return Err(SpectrumError::AcquisitionDisabled);
        }
        if self.connection_lost {
            return Err(SpectrumError::LinkClosed);
        }
        Ok(())
    }

    /// Ask the instrument to reset the acquisition.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_acquisition()?;
        self.outbox.push_back(Command::Clear.into());
        Ok(())
    }

    /// User changed property `id`. The value is clamped to the property's range and the
    /// clamped value is returned.
    pub fn set_property(&mut self, id: &str, value: i64) -> Result<i64> {
        self.ensure_acquisition()?;
        let control = self
            .controls
            .get(id)
            .ok_or_else(|| SpectrumError::UnknownProperty(id.to_string()))?;
        let value = match control.kind() {
            PropKind::Toggle => i64::from(value != 0),
            PropKind::Numeric => control.prop.clamp(value),
        };
        self.controls.sync(id, value);
        self.outbox.push_back(
            Command::Set {
                id: id.to_string(),
                value,
            }
            .into(),
        );
        Ok(value)
    }

    /// Frames waiting to be sent, oldest first.
    pub fn drain_outbound(&mut self) -> Vec<OutboundFrame> {
        self.outbox.drain(..).collect()
    }

    pub fn snapshot(&self, now: f64) -> SnapshotState {
        SnapshotState::new(
            self.histogram.clone(),
            self.timing.since,
            self.timing.end_time(now),
        )
    }

    pub fn text_export(&self, now: f64) -> TextExport {
        TextExport::new(&self.histogram, self.timing.since, self.timing.end_time(now))
    }

    /// Enable (`Some`) or disable (`None`) autosave. Counting starts at `now`.
    pub fn set_autosave(&mut self, interval: Option<Duration>, now: Instant) {
        self.autosave.configure(interval, now);
        match interval {
            Some(i) => log::info!("autosave every {} s", i.as_secs()),
            None => log::info!("autosave disabled"),
        }
    }

    /// When autosave is due, export the histogram as it is now. Nothing is queued; call
    /// [`confirm_autosave`](Self::confirm_autosave) once the export is on disk.
    pub fn poll_autosave(&mut self, now: Instant, wall_now: f64) -> Option<TextExport> {
        if !self.autosave.fire(now) {
            return None;
        }
        if let Err(e) = self.ensure_acquisition() {
            log::warn!("autosave skipped: {e}");
            return None;
        }
        Some(self.text_export(wall_now))
    }

    /// The autosave export was written; reset the acquisition.
    pub fn confirm_autosave(&mut self) -> Result<()> {
        self.clear()?;
        log::info!("autosave: exported {} channels, clearing", self.histogram.len());
        Ok(())
    }

    /// Poll autosave and, when due, write the export into `dir`. `clear` is queued only
    /// after the file was written; a failed write leaves the counts alone.
    pub fn autosave_into(
        &mut self,
        dir: &Path,
        now: Instant,
        wall_now: f64,
    ) -> Option<Result<PathBuf>> {
        let export = self.poll_autosave(now, wall_now)?;
        let written = save_text_export(dir, &export).and_then(|path| {
            self.confirm_autosave()?;
            Ok(path)
        });
        Some(written)
    }
}
