//! Simulated spectrometer.
//!
//! Produces one event per period, drawn from a two-peak spectrum, and speaks the same
//! frame protocol as a real instrument server: it checks the `csrf` token, sends the
//! accumulated history, and answers `clear` and `set` commands.

use std::collections::BTreeMap;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::data::timing::unix_now;
use crate::error::{Result, SpectrumError};
use crate::protocol::{Command, ConfigProp, Metadata, OutboundFrame};
use crate::sink::{channel_link, InstrumentLink, TransportEnd};

/// Simulated instrument parameters.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub channels: usize,
    /// Time between events.
    pub period: Duration,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            channels: 1024,
            period: Duration::from_millis(10),
            seed: None,
        }
    }
}

impl DemoOptions {
    /// Properties of the acquisition board the demo pretends to be.
    pub fn config_props() -> Vec<ConfigProp> {
        vec![
            ConfigProp::new("2", "Threshold", 0, 4096),
            ConfigProp::new("5", "Ratio Thresh", 0, 100),
            ConfigProp::new("3", "Bias", 0, 1),
            ConfigProp::new("4", "Amp", 0, 1),
        ]
    }

    pub fn metadata(&self, csrf: impl Into<String>) -> Metadata {
        Metadata {
            channels: self.channels,
            configprops: Self::config_props(),
            csrf: csrf.into(),
        }
    }
}

/// Instrument state, independent of any thread or channel.
pub struct DemoInstrument {
    channels: usize,
    csrf: String,
    authenticated: bool,
    hist: Vec<u64>,
    since: f64,
    props: BTreeMap<String, i64>,
    rng: StdRng,
}

impl DemoInstrument {
    pub fn new(options: &DemoOptions, csrf: impl Into<String>) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let props = DemoOptions::config_props()
            .into_iter()
            .map(|p| (p.id, p.from))
            .collect();
        Self {
            channels: options.channels,
            csrf: csrf.into(),
            authenticated: false,
            hist: vec![0; options.channels],
            since: unix_now(),
            props,
            rng,
        }
    }

    pub fn histogram(&self) -> &[u64] {
        &self.hist
    }

    pub fn props(&self) -> &BTreeMap<String, i64> {
        &self.props
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn history_frame(&self) -> Value {
        json!({ "h": self.hist, "since": self.since })
    }

    fn props_frame(&self) -> Value {
        json!({ "props": self.props })
    }

    /// Sample one event, record it and return the `{v}` frame. `None` before
    /// authentication or without channels.
    pub fn next_event(&mut self) -> Option<Value> {
        if !self.authenticated || self.channels < 2 {
            return None;
        }
        let channel = self.sample_channel();
        self.hist[channel] += 1;
        Some(json!({ "v": channel }))
    }

    /// Channel in `1..channels`: 20 % near 5 % of the range, 80 % near the middle.
    fn sample_channel(&mut self) -> usize {
        let channels = self.channels as f64;
        loop {
            let (mean, sd) = if self.rng.gen::<f64>() < 0.2 {
                (0.05, 0.025)
            } else {
                (0.5, 0.075)
            };
            let value = ((mean + sd * self.gaussian()) * channels).floor();
            if value > 0.0 && value < channels {
                return value as usize;
            }
        }
    }

    /// Standard normal sample (Box-Muller).
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// React to one frame from the UI and return the frames to send back.
    pub fn handle_frame(&mut self, text: &str) -> Result<Vec<Value>> {
        let frame = OutboundFrame::from_text(text)?;
        if !self.authenticated {
            return match frame {
                OutboundFrame::Auth { csrf } if csrf == self.csrf => {
                    self.authenticated = true;
                    log::info!("demo instrument: client authenticated");
                    Ok(vec![self.history_frame(), self.props_frame()])
                }
                _ => Err(SpectrumError::AcquisitionDisabled),
            };
        }
        match frame {
            OutboundFrame::Auth { .. } => Ok(Vec::new()),
            OutboundFrame::Command(Command::Clear) => {
                self.hist.iter_mut().for_each(|c| *c = 0);
                self.since = unix_now();
                log::info!("demo instrument: histogram cleared");
                Ok(vec![self.history_frame()])
            }
            OutboundFrame::Command(Command::Set { id, value }) => {
                let prop = DemoOptions::config_props()
                    .into_iter()
                    .find(|p| p.id == id)
                    .ok_or_else(|| SpectrumError::UnknownProperty(id.clone()))?;
                let value = prop.clamp(value);
                self.props.insert(id.clone(), value);
                Ok(vec![json!({ "c": { "id": id, "value": value } }), self.props_frame()])
            }
        }
    }
}

/// Random token the demo expects back on connect.
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(28)
        .map(char::from)
        .collect()
}

/// Start the simulated instrument on its own thread. Returns the metadata a client
/// needs, the UI end of the link and the thread handle. The thread ends when the UI
/// end is dropped or authentication fails.
pub fn spawn_demo(options: DemoOptions) -> (Metadata, InstrumentLink, JoinHandle<()>) {
    let csrf = random_token();
    let metadata = options.metadata(csrf.clone());
    let (transport, link) = channel_link();
    let handle = std::thread::spawn(move || {
        let mut instrument = DemoInstrument::new(&options, csrf);
        match run_instrument(&mut instrument, &transport, options.period) {
            Ok(()) => log::info!("demo instrument stopped"),
            Err(SpectrumError::LinkClosed) => log::info!("demo instrument: client went away"),
            Err(e) => log::error!("demo instrument failed: {e}"),
        }
        transport.close();
    });
    (metadata, link, handle)
}

fn run_instrument(
    instrument: &mut DemoInstrument,
    transport: &TransportEnd,
    period: Duration,
) -> Result<()> {
    transport.open()?;
    let mut next_event = Instant::now() + period;
    loop {
        let wait = next_event.saturating_duration_since(Instant::now());
        if let Some(text) = transport.recv_timeout(wait)? {
            match instrument.handle_frame(&text) {
                Ok(replies) => {
                    for reply in &replies {
                        transport.send_json(reply)?;
                    }
                }
                Err(SpectrumError::AcquisitionDisabled) => {
                    log::error!("demo instrument: bad csrf token, closing");
                    return Ok(());
                }
                Err(e) => log::warn!("demo instrument: rejected {text:?}: {e}"),
            }
            continue;
        }
        next_event += period;
        if let Some(event) = instrument.next_event() {
            transport.send_json(&event)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(channels: usize) -> DemoInstrument {
        let options = DemoOptions {
            channels,
            period: Duration::from_millis(1),
            seed: Some(7),
        };
        DemoInstrument::new(&options, "tok")
    }

    fn auth(i: &mut DemoInstrument) -> Vec<Value> {
        i.handle_frame(r#"{"csrf":"tok"}"#).unwrap()
    }

    #[test]
    fn events_wait_for_authentication() {
        let mut i = instrument(64);
        assert!(i.next_event().is_none());
        assert!(i.handle_frame(r#"{"csrf":"wrong"}"#).is_err());
        assert!(i.handle_frame(r#"{"command":"clear"}"#).is_err());
        let replies = auth(&mut i);
        assert_eq!(replies[0]["h"].as_array().unwrap().len(), 64);
        assert!(replies[1]["props"].is_object());
        assert!(i.next_event().is_some());
    }

    #[test]
    fn events_stay_inside_the_channel_range() {
        let mut i = instrument(128);
        auth(&mut i);
        for _ in 0..2_000 {
            let ev = i.next_event().unwrap();
            let v = ev["v"].as_u64().unwrap();
            assert!(v > 0 && v < 128);
        }
        assert_eq!(i.histogram().iter().sum::<u64>(), 2_000);
        // most of the mass sits in the central peak
        let centre: u64 = i.histogram()[32..96].iter().sum();
        assert!(centre > 1_200);
    }

    #[test]
    fn clear_resets_and_resends_history() {
        let mut i = instrument(16);
        auth(&mut i);
        for _ in 0..10 {
            i.next_event();
        }
        let replies = i.handle_frame(r#"{"command":"clear"}"#).unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0]["h"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c.as_u64() == Some(0)));
        assert_eq!(i.histogram().iter().sum::<u64>(), 0);
    }

    #[test]
    fn set_clamps_and_echoes_props() {
        let mut i = instrument(16);
        auth(&mut i);
        let replies = i
            .handle_frame(r#"{"command":"set","id":"2","value":5000}"#)
            .unwrap();
        assert_eq!(replies[1]["props"]["2"], 4096);
        assert_eq!(i.props()["2"], 4096);
        assert!(matches!(
            i.handle_frame(r#"{"command":"set","id":"9","value":1}"#),
            Err(SpectrumError::UnknownProperty(_))
        ));
    }

    #[test]
    fn metadata_lists_board_properties() {
        let meta = DemoOptions::default().metadata("x");
        assert_eq!(meta.channels, 1024);
        let names: Vec<_> = meta.configprops.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Threshold", "Ratio Thresh", "Bias", "Amp"]);
        assert_eq!(random_token().len(), 28);
    }
}
