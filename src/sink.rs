//! Message channel between the instrument transport and the UI.
//!
//! The transport side (a socket reader, or the simulated instrument) owns a
//! [`TransportEnd`] and pushes [`LinkEvent`]s into it. The UI owns the matching
//! [`InstrumentLink`], drains those events once per frame and hands queued outbound
//! frames back. Both halves are plain `std::sync::mpsc` channels.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use crate::error::{Result, SpectrumError};
use crate::protocol::OutboundFrame;
use crate::session::{LiveSession, StateDelta};

/// Connection lifecycle as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    /// One text frame, undecoded.
    Frame(String),
    Closed,
}

/// Instrument side of the link.
pub struct TransportEnd {
    tx: Sender<LinkEvent>,
    rx: Receiver<String>,
}

impl TransportEnd {
    pub fn open(&self) -> Result<()> {
        self.push(LinkEvent::Opened)
    }

    /// Send one text frame to the UI.
    pub fn send_frame(&self, text: impl Into<String>) -> Result<()> {
        self.push(LinkEvent::Frame(text.into()))
    }

    /// Serialize `value` and send it as one frame.
    pub fn send_json(&self, value: &serde_json::Value) -> Result<()> {
        self.send_frame(serde_json::to_string(value)?)
    }

    /// Report the connection as closed. Dropping the end has the same effect.
    pub fn close(self) {
        let _ = self.tx.send(LinkEvent::Closed);
    }

    /// Next frame from the UI, waiting at most `timeout`. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<String>> {
        match self.rx.recv_timeout(timeout) {
            Ok(text) => Ok(Some(text)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SpectrumError::LinkClosed),
        }
    }

    fn push(&self, event: LinkEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| SpectrumError::LinkClosed)
    }
}

/// UI side of the link.
pub struct InstrumentLink {
    rx: Receiver<LinkEvent>,
    tx: Sender<String>,
    closed: bool,
}

impl InstrumentLink {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Everything received since the last call. A dropped transport yields one
    /// trailing [`LinkEvent::Closed`].
    pub fn poll(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }
        loop {
            match self.rx.try_recv() {
                Ok(LinkEvent::Closed) => {
                    self.closed = true;
                    events.push(LinkEvent::Closed);
                    break;
                }
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    events.push(LinkEvent::Closed);
                    break;
                }
            }
        }
        events
    }

    pub fn send(&self, frame: &OutboundFrame) -> Result<()> {
        if self.closed {
            return Err(SpectrumError::LinkClosed);
        }
        let text = frame.to_text()?;
        self.tx.send(text).map_err(|_| SpectrumError::LinkClosed)
    }

    /// Feed received events into `session`, then flush its queued outbound frames.
    pub fn pump(&mut self, session: &mut LiveSession) -> Vec<StateDelta> {
        let mut deltas = Vec::new();
        for event in self.poll() {
            match event {
                LinkEvent::Opened => {
                    if let Err(e) = session.on_channel_open() {
                        log::warn!("ignoring channel open: {e}");
                    }
                }
                LinkEvent::Frame(text) => deltas.push(session.handle_text(&text)),
                LinkEvent::Closed => session.on_channel_closed(),
            }
        }
        self.flush(session);
        deltas
    }

    /// Send every frame `session` has queued, oldest first.
    pub fn flush(&self, session: &mut LiveSession) {
        for frame in session.drain_outbound() {
            if let Err(e) = self.send(&frame) {
                log::warn!("could not send {frame:?}: {e}");
            }
        }
    }
}

/// Create a connected pair of link ends.
pub fn channel_link() -> (TransportEnd, InstrumentLink) {
    let (event_tx, event_rx) = std::sync::mpsc::channel();
    let (frame_tx, frame_rx) = std::sync::mpsc::channel();
    (
        TransportEnd {
            tx: event_tx,
            rx: frame_rx,
        },
        InstrumentLink {
            rx: event_rx,
            tx: frame_tx,
            closed: false,
        },
    )
}
