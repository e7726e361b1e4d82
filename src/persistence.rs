//! Snapshot codec: self-contained HTML snapshots and the plain-text channel dump.
//!
//! An HTML snapshot is viewable on its own (an inline SVG of the spectrum as it looked when
//! exported) and carries the full session state in a hidden `<div id="stored">` element
//! holding `{"hist": [...], "since": t0, "finished": t1}`. Loading a document with that
//! element yields a frozen session; the plain-text dump is meant for external analysis tools
//! but can be re-opened the same way.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::data::histogram::{BinningParams, Histogram};
use crate::data::render::RenderPipeline;
use crate::data::timing::format_elapsed;
use crate::data::viewport::ViewportSize;
use crate::error::{Result, SpectrumError};

const STORED_ID: &str = "stored";
const TEXT_MAGIC: &str = "-_-";
const TEXT_SEPARATOR: &str = "---";
/// Surface used for the SVG embedded in HTML snapshots.
const SNAPSHOT_VIEW: ViewportSize = ViewportSize {
    width: 1000.0,
    height: 400.0,
};

/// Everything needed to restore a frozen session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotState {
    pub hist: Histogram,
    pub since: f64,
    /// End of acquisition. Older documents may carry `null` here.
    pub finished: Option<f64>,
    /// Bin size selected when the snapshot was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binsize: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
}

impl SnapshotState {
    pub fn new(hist: Histogram, since: f64, finished: f64) -> Self {
        Self {
            hist,
            since,
            finished: Some(finished),
            binsize: None,
            threshold: None,
        }
    }

    pub fn with_view(mut self, params: &BinningParams) -> Self {
        self.binsize = Some(params.bin_size());
        self.threshold = Some(params.threshold);
        self
    }

    /// End time of the frozen session; a missing value collapses the session to zero length.
    pub fn end_time(&self) -> f64 {
        self.finished.unwrap_or(self.since)
    }

    /// Binning to restore, falling back to defaults for anything missing or invalid.
    pub fn binning(&self) -> BinningParams {
        let defaults = BinningParams::default();
        BinningParams::new(
            self.binsize.unwrap_or(defaults.bin_size()),
            self.threshold.unwrap_or(defaults.threshold),
        )
        .unwrap_or(defaults)
    }
}

/// Render a self-contained HTML document for `state`.
pub fn encode_html(state: &SnapshotState, title: &str) -> Result<String> {
    let blob = serde_json::to_string(state)?;

    let mut pipeline = RenderPipeline::new(state.binning());
    let elapsed = state.end_time() - state.since;
    let frame = pipeline.render(&state.hist, elapsed, &SNAPSHOT_VIEW);

    let mut svg = String::new();
    for (bin, g) in pipeline.bars().iter() {
        let _ = writeln!(
            svg,
            r#"<rect class="bar" data-bin="{bin}" x="{}" y="{}" width="{}" height="{}"/>"#,
            g.x, g.y, g.w, g.h
        );
    }
    for (value, label) in &frame.y_ticks {
        let y = frame.scales.y.apply(*value);
        let _ = writeln!(
            svg,
            r#"<text class="tick" x="4" y="{y}">{}</text>"#,
            escape_html(label)
        );
    }

    let title = escape_html(title);
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; background: #fff; }}
.bar {{ fill: #3b78c4; }}
.tick {{ font-size: 11px; fill: #555; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p><span id="cpm">{rate}</span> &middot; <span id="timer">{timer}</span> &middot; {from} &ndash; {to}</p>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">
{svg}</svg>
<div id="{STORED_ID}" style="display:none">{stored}</div>
</body>
</html>
"#,
        rate = frame.rate,
        timer = format_elapsed(elapsed),
        from = iso8601(state.since),
        to = iso8601(state.end_time()),
        w = SNAPSHOT_VIEW.width,
        h = SNAPSHOT_VIEW.height,
        stored = escape_html(&blob),
    ))
}

/// `true` if `document` carries a stored snapshot.
pub fn has_stored_snapshot(document: &str) -> bool {
    stored_element(document).is_some()
}

/// Extract the stored session state from an HTML snapshot.
pub fn decode_html(document: &str) -> Result<SnapshotState> {
    let inner = stored_element(document).ok_or(SpectrumError::MissingSnapshot)?;
    Ok(serde_json::from_str(&unescape_html(inner))?)
}

fn stored_element(document: &str) -> Option<&str> {
    let marker = format!(r#"id="{STORED_ID}""#);
    let at = document.find(&marker)?;
    let open_end = at + document[at..].find('>')? + 1;
    let close = open_end + document[open_end..].find("</div>")?;
    Some(&document[open_end..close])
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// `2024-01-15T13:45:30.000Z` for a UNIX timestamp in seconds.
pub fn iso8601(secs: f64) -> String {
    to_datetime(secs).to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_datetime(secs: f64) -> DateTime<Utc> {
    let millis = if secs.is_finite() {
        (secs * 1000.0).round() as i64
    } else {
        0
    };
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

fn parse_iso8601(value: &str) -> Result<f64> {
    let dt = DateTime::parse_from_rfc3339(value).map_err(|source| SpectrumError::Timestamp {
        value: value.to_string(),
        source,
    })?;
    Ok(dt.timestamp_millis() as f64 / 1000.0)
}

/// Plain-text dump: a small header followed by one raw count per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TextExport {
    pub counts: Vec<u64>,
    pub from: f64,
    pub to: f64,
}

impl TextExport {
    pub fn new(hist: &Histogram, from: f64, to: f64) -> Self {
        Self {
            counts: hist.counts().to_vec(),
            from,
            to,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(32 + self.counts.len() * 4);
        let _ = writeln!(out, "{TEXT_MAGIC}");
        let _ = writeln!(out, "from: {}", iso8601(self.from));
        let _ = writeln!(out, "to: {}", iso8601(self.to));
        let _ = writeln!(out, "{TEXT_SEPARATOR}");
        for c in &self.counts {
            let _ = writeln!(out, "{c}");
        }
        out
    }

    /// `data-<start, to the minute>.txt`. Colons are replaced so the name is valid on
    /// every platform.
    pub fn file_name(&self) -> String {
        format!("data-{}.txt", to_datetime(self.from).format("%Y-%m-%dT%H-%M"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        if next_line(&mut lines, "header")? != TEXT_MAGIC {
            return Err(SpectrumError::MalformedTextExport("bad header".into()));
        }
        let from = header_value(next_line(&mut lines, "from")?, "from:")?;
        let to = header_value(next_line(&mut lines, "to")?, "to:")?;
        if next_line(&mut lines, "separator")? != TEXT_SEPARATOR {
            return Err(SpectrumError::MalformedTextExport("missing separator".into()));
        }

        let counts = lines
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                l.parse::<u64>()
                    .map_err(|_| SpectrumError::MalformedTextExport(format!("bad count {l:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            counts,
            from: parse_iso8601(from)?,
            to: parse_iso8601(to)?,
        })
    }

    pub fn into_snapshot(self) -> SnapshotState {
        SnapshotState::new(Histogram::from_counts(self.counts), self.from, self.to)
    }
}

fn next_line<'a>(lines: &mut std::str::Lines<'a>, what: &str) -> Result<&'a str> {
    lines
        .next()
        .map(str::trim)
        .ok_or_else(|| SpectrumError::MalformedTextExport(format!("missing {what}")))
}

fn header_value<'a>(line: &'a str, key: &str) -> Result<&'a str> {
    line.strip_prefix(key)
        .map(str::trim)
        .ok_or_else(|| SpectrumError::MalformedTextExport(format!("expected {key:?}")))
}

pub fn write_text_export(path: impl AsRef<Path>, export: &TextExport) -> Result<()> {
    std::fs::write(path, export.render())?;
    Ok(())
}

/// Write `export` into `dir` under its derived file name, adding `-1`, `-2`, ... when a
/// file of that name already exists.
pub fn save_text_export(dir: impl AsRef<Path>, export: &TextExport) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let name = export.file_name();
    let stem = name.trim_end_matches(".txt");
    let mut path = dir.join(&name);
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.txt"));
        n += 1;
    }
    write_text_export(&path, export)?;
    Ok(path)
}

pub fn write_html_snapshot(path: impl AsRef<Path>, state: &SnapshotState, title: &str) -> Result<()> {
    std::fs::write(path, encode_html(state, title)?)?;
    Ok(())
}

/// Load either an HTML snapshot or a plain-text export.
pub fn load_snapshot_file(path: impl AsRef<Path>) -> Result<SnapshotState> {
    let text = std::fs::read_to_string(path)?;
    if has_stored_snapshot(&text) {
        decode_html(&text)
    } else if text.trim_start().starts_with(TEXT_MAGIC) {
        Ok(TextExport::parse(&text)?.into_snapshot())
    } else {
        Err(SpectrumError::MissingSnapshot)
    }
}
