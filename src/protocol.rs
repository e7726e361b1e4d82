//! Wire contract with the instrument: one JSON object per text frame.
//!
//! Inbound frames are classified by the first recognised key, checked in the order
//! `v`, `c`, `h`, `props`. Anything else decodes to [`InboundFrame::Unknown`] so the
//! session can log and ignore it. Outbound frames are the one-time `csrf` echo and the
//! `clear`/`set` commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `{v: channel}`: one event in `channel`.
    Increment { channel: u64 },
    /// `{c: ...}`: the instrument acknowledged a configuration change.
    ConfigAck(Value),
    /// `{h: [...], since: t}`: full histogram and acquisition start.
    History { counts: Vec<u64>, since: f64 },
    /// `{props: {id: value}}`: current values of configuration properties.
    Props(BTreeMap<String, i64>),
    /// Valid JSON of an unrecognised shape.
    Unknown(Value),
}

/// Parse one text frame. Only invalid JSON is an error; unknown shapes decode to
/// [`InboundFrame::Unknown`].
pub fn decode_frame(text: &str) -> Result<InboundFrame> {
    let value: Value = serde_json::from_str(text)?;
    Ok(InboundFrame::from_value(value))
}

impl InboundFrame {
    pub fn from_value(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => return InboundFrame::Unknown(other),
        };

        if let Some(channel) = map.get("v").map(Value::as_u64) {
            return match channel {
                Some(channel) => InboundFrame::Increment { channel },
                None => InboundFrame::Unknown(Value::Object(map)),
            };
        }
        if let Some(ack) = map.get("c") {
            return InboundFrame::ConfigAck(ack.clone());
        }
        if let Some(history) = map.get("h") {
            let counts = serde_json::from_value::<Vec<u64>>(history.clone()).ok();
            let since = map.get("since").and_then(Value::as_f64);
            return match (counts, since) {
                (Some(counts), Some(since)) => InboundFrame::History { counts, since },
                _ => InboundFrame::Unknown(Value::Object(map)),
            };
        }
        if let Some(Value::Object(props)) = map.get("props") {
            let values = props
                .iter()
                .filter_map(|(id, v)| prop_value(v).map(|v| (id.clone(), v)))
                .collect();
            return InboundFrame::Props(values);
        }
        InboundFrame::Unknown(Value::Object(map))
    }
}

fn prop_value(v: &Value) -> Option<i64> {
    match v {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        _ => None,
    }
}

/// Commands understood by the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    /// Reset the acquisition.
    Clear,
    /// Change one configuration property.
    Set { id: String, value: i64 },
}

/// Frame sent to the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Sent once, right after the channel opens.
    Auth { csrf: String },
    Command(Command),
}

impl OutboundFrame {
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl From<Command> for OutboundFrame {
    fn from(cmd: Command) -> Self {
        OutboundFrame::Command(cmd)
    }
}

/// Instrument description fetched once before the live session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub channels: usize,
    #[serde(default)]
    pub configprops: Vec<ConfigProp>,
    pub csrf: String,
}

impl Metadata {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Remotely adjustable acquisition parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProp {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    pub from: i64,
    pub to: i64,
}

/// How a property is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Toggle,
    Numeric,
}

impl ConfigProp {
    pub fn new(id: impl Into<String>, name: impl Into<String>, from: i64, to: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            from,
            to,
        }
    }

    /// A `0..=1` range is a toggle; everything else is a bounded number.
    pub fn kind(&self) -> PropKind {
        if self.from == 0 && self.to == 1 {
            PropKind::Toggle
        } else {
            PropKind::Numeric
        }
    }

    pub fn clamp(&self, value: i64) -> i64 {
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        value.clamp(lo, hi)
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognises_each_shape() {
        assert_eq!(
            decode_frame(r#"{"v": 5}"#).unwrap(),
            InboundFrame::Increment { channel: 5 }
        );
        assert_eq!(
            decode_frame(r#"{"v": 0}"#).unwrap(),
            InboundFrame::Increment { channel: 0 }
        );
        assert_eq!(
            decode_frame(r#"{"c": {"id": 2}}"#).unwrap(),
            InboundFrame::ConfigAck(json!({"id": 2}))
        );
        assert_eq!(
            decode_frame(r#"{"h": [1, 2, 3], "since": 17.5}"#).unwrap(),
            InboundFrame::History {
                counts: vec![1, 2, 3],
                since: 17.5
            }
        );
        let props = decode_frame(r#"{"props": {"2": 120, "3": true, "4": 0.6, "5": "x"}}"#).unwrap();
        let expected: BTreeMap<String, i64> =
            [("2".to_string(), 120), ("3".to_string(), 1), ("4".to_string(), 1)]
                .into_iter()
                .collect();
        assert_eq!(props, InboundFrame::Props(expected));
    }

    #[test]
    fn first_matching_key_wins() {
        assert_eq!(
            decode_frame(r#"{"h": [1], "since": 1, "v": 3}"#).unwrap(),
            InboundFrame::Increment { channel: 3 }
        );
        assert!(matches!(
            decode_frame(r#"{"c": 1, "props": {}}"#).unwrap(),
            InboundFrame::ConfigAck(_)
        ));
    }

    #[test]
    fn unknown_and_malformed_frames() {
        assert!(matches!(
            decode_frame(r#"{"hello": 1}"#).unwrap(),
            InboundFrame::Unknown(_)
        ));
        assert!(matches!(decode_frame("[1, 2]").unwrap(), InboundFrame::Unknown(_)));
        assert!(matches!(
            decode_frame(r#"{"v": -4}"#).unwrap(),
            InboundFrame::Unknown(_)
        ));
        assert!(matches!(
            decode_frame(r#"{"h": [1, 2]}"#).unwrap(),
            InboundFrame::Unknown(_)
        ));
        assert!(decode_frame("{not json").is_err());
    }

    #[test]
    fn outbound_frames_on_the_wire() {
        let auth = OutboundFrame::Auth {
            csrf: "tok".into(),
        };
        assert_eq!(auth.to_text().unwrap(), r#"{"csrf":"tok"}"#);
        assert_eq!(
            OutboundFrame::from(Command::Clear).to_text().unwrap(),
            r#"{"command":"clear"}"#
        );
        let set = OutboundFrame::from(Command::Set {
            id: "2".into(),
            value: 40,
        });
        assert_eq!(
            set.to_text().unwrap(),
            r#"{"command":"set","id":"2","value":40}"#
        );
        assert_eq!(OutboundFrame::from_text(&set.to_text().unwrap()).unwrap(), set);
        assert_eq!(OutboundFrame::from_text(r#"{"csrf":"tok"}"#).unwrap(), auth);
    }

    #[test]
    fn metadata_accepts_numeric_ids() {
        let meta = Metadata::from_json(
            r#"{"channels": 4096, "csrf": "abc",
                "configprops": [{"id": 2, "name": "Threshold", "from": 0, "to": 4096},
                                {"id": "bias", "name": "Bias", "from": 0, "to": 1}]}"#,
        )
        .unwrap();
        assert_eq!(meta.channels, 4096);
        assert_eq!(meta.configprops[0].id, "2");
        assert_eq!(meta.configprops[0].kind(), PropKind::Numeric);
        assert_eq!(meta.configprops[1].kind(), PropKind::Toggle);
        assert_eq!(meta.configprops[0].clamp(9000), 4096);
    }
}
