use std::time::{Duration, Instant};

use livespectrum::demo::{spawn_demo, DemoOptions};
use livespectrum::protocol::{Command, InboundFrame, OutboundFrame};
use livespectrum::session::{LiveSession, SessionMode, StateDelta};
use livespectrum::sink::channel_link;
use livespectrum::{Metadata, SpectrumError};

fn metadata(channels: usize) -> Metadata {
    Metadata::from_json(&format!(
        r#"{{"channels": {channels}, "csrf": "tok",
             "configprops": [{{"id": 2, "name": "Threshold", "from": 0, "to": 4096}},
                             {{"id": 3, "name": "Bias", "from": 0, "to": 1}}]}}"#
    ))
    .unwrap()
}

#[test]
fn increments_arrive_through_the_dispatcher() {
    let mut session = LiveSession::live(metadata(8), 100.0);
    session.handle(InboundFrame::History {
        counts: vec![0; 8],
        since: 100.0,
    });
    for _ in 0..2 {
        assert_eq!(
            session.handle(InboundFrame::Increment { channel: 5 }),
            StateDelta::Incremented { channel: 5 }
        );
    }
    assert_eq!(session.histogram().counts(), &[0, 0, 0, 0, 0, 2, 0, 0]);
}

#[test]
fn scripted_transport_drives_a_live_session() {
    let (transport, mut link) = channel_link();
    let mut session = LiveSession::live(metadata(4), 0.0);

    transport.open().unwrap();
    transport
        .send_frame(r#"{"h": [1, 2, 3, 4], "since": 50.5}"#)
        .unwrap();
    transport.send_frame(r#"{"props": {"2": 120, "3": 1}}"#).unwrap();
    transport.send_frame("not json").unwrap();
    transport.send_frame(r#"{"c": {"ok": true}}"#).unwrap();
    transport.send_frame(r#"{"v": 0}"#).unwrap();

    let deltas = link.pump(&mut session);
    assert_eq!(
        deltas,
        vec![
            StateDelta::HistoryReplaced { since: 50.5 },
            StateDelta::PropsSynced {
                ids: vec!["2".into(), "3".into()]
            },
            StateDelta::Ignored,
            StateDelta::ConfigAcknowledged,
            StateDelta::Incremented { channel: 0 },
        ]
    );
    assert_eq!(session.histogram().counts(), &[2, 2, 3, 4]);
    assert_eq!(session.controls().get("2").unwrap().value, 120);

    // the only frame sent so far is the token
    let first = transport.recv_timeout(Duration::from_millis(50)).unwrap();
    assert_eq!(first.as_deref(), Some(r#"{"csrf":"tok"}"#));
    assert_eq!(transport.recv_timeout(Duration::from_millis(10)).unwrap(), None);

    assert_eq!(session.set_property("2", -5).unwrap(), 0);
    link.pump(&mut session);
    let sent = transport.recv_timeout(Duration::from_millis(50)).unwrap().unwrap();
    assert_eq!(
        OutboundFrame::from_text(&sent).unwrap(),
        OutboundFrame::Command(Command::Set {
            id: "2".into(),
            value: 0
        })
    );

    drop(transport);
    link.pump(&mut session);
    assert!(session.connection_lost());
    assert!(matches!(session.clear(), Err(SpectrumError::LinkClosed)));
    assert_eq!(session.mode(), SessionMode::Live);
}

#[test]
fn autosave_exports_then_clears() {
    let mut session = LiveSession::live(metadata(4), 0.0);
    session.handle_text(r#"{"h": [0, 5, 5, 0], "since": 0}"#);

    let t0 = Instant::now();
    session.set_autosave(Some(Duration::from_secs(30)), t0);
    assert!(session.poll_autosave(t0 + Duration::from_secs(10), 10.0).is_none());

    let export = session
        .poll_autosave(t0 + Duration::from_secs(30), 30.0)
        .unwrap();
    assert_eq!(export.counts, vec![0, 5, 5, 0]);
    assert_eq!((export.from, export.to), (0.0, 30.0));
    assert!(session.drain_outbound().is_empty());
    session.confirm_autosave().unwrap();
    assert_eq!(session.drain_outbound(), vec![OutboundFrame::from(Command::Clear)]);
}

/// Runs the simulated instrument on its own thread and waits until events arrive.
#[test]
fn demo_instrument_feeds_the_session() {
    let (metadata, mut link, instrument) = spawn_demo(DemoOptions {
        channels: 64,
        period: Duration::from_millis(1),
        seed: Some(3),
    });
    assert_eq!(metadata.configprops.len(), 4);
    let mut session = LiveSession::live(metadata, livespectrum::data::timing::unix_now());

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut history_seen = false;
    while Instant::now() < deadline {
        for delta in link.pump(&mut session) {
            if matches!(delta, StateDelta::HistoryReplaced { .. }) {
                history_seen = true;
            }
        }
        if history_seen && session.histogram().total() >= 20 {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(history_seen);
    assert!(session.histogram().total() >= 20);
    assert_eq!(session.histogram().get(0), Some(0));

    // a clear round-trips into a fresh history frame
    session.clear().unwrap();
    link.pump(&mut session);
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut cleared = false;
    while Instant::now() < deadline && !cleared {
        cleared = link
            .pump(&mut session)
            .iter()
            .any(|d| matches!(d, StateDelta::HistoryReplaced { .. }));
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(cleared);

    drop(link);
    instrument.join().unwrap();
}
