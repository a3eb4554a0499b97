//! WebVMT metadata timeline parsing.
//!
//! Extracts timestamped cues from a WebVMT-style text file and turns
//! them into `(duration, payload)` samples for a timed raw-metadata
//! track. The companion track uses a fixed timescale of 1000 (sample
//! durations are milliseconds) and carries a `description` reference
//! back to the visual track it annotates.
//!
//! In binary mode each cue body line is hex-decoded (non-hex characters
//! ignored) and concatenated. In text mode the body is scanned for
//! `{"sync": {"type": "...", "data": "..."}}` fragments; the payload is
//! hex-decoded when the type ends in `.hex`, base64-decoded for
//! `.base64`, and passed through as raw bytes otherwise.

use regex::Regex;
use tracing::warn;

use crate::errors::UncError;

/// Sentinel for a cue timestamp that could not be parsed.
pub const BAD_VMT_TIMESTAMP: u32 = 0xFFFF_FFFE;

/// Timescale of the emitted metadata track (milliseconds).
pub const WEBVMT_TIMESCALE: u32 = 1000;

/// One emitted metadata sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebVmtSample {
    pub duration_ms: u32,
    pub payload: Vec<u8>,
}

fn nibble_to_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Converts hex text to raw binary, ignoring any non-hex characters.
fn hex_to_binary(line: &str) -> Vec<u8> {
    let mut data = Vec::new();
    let mut current_value = 0u8;
    let mut high_nibble = true;

    for c in line.bytes() {
        if let Some(v) = nibble_to_val(c) {
            if high_nibble {
                current_value = v << 4;
                high_nibble = false;
            } else {
                current_value |= v;
                data.push(current_value);
                high_nibble = true;
            }
        }
    }

    data
}

/// Converts base64 text to raw binary. Truncates trailing input that
/// does not form a full quartet.
fn decode_base64(line: &str) -> Vec<u8> {
    const TABLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let bytes = line.as_bytes();
    let len = bytes.len() - bytes.len() % 4;
    let mut data = Vec::with_capacity(len / 4 * 3);

    for chunk in bytes[..len].chunks_exact(4) {
        let mut buf = [0u8; 4];
        for (i, c) in chunk.iter().enumerate() {
            buf[i] = TABLE.iter().position(|t| t == c).unwrap_or(TABLE.len()) as u8;
        }

        data.push((buf[0] << 2) | (buf[1] >> 4));
        if chunk[2] != b'=' {
            data.push((buf[1] & 0x0f) << 4 | (buf[2] >> 2));
        }
        if chunk[3] != b'=' {
            data.push((buf[2] & 0x03) << 6 | buf[3]);
        }
    }

    data
}

/// Parses a WebVMT timestamp `(-?)((H*):)?MM:SS(.fff)?` into
/// milliseconds. Negative or malformed timestamps yield
/// [`BAD_VMT_TIMESTAMP`]; milliseconds must be exactly three digits
/// when present.
fn parse_vmt_timestamp(vmt_time: &str, pattern: &Regex) -> u32 {
    let Some(caps) = pattern.captures(vmt_time) else {
        return BAD_VMT_TIMESTAMP;
    };

    if vmt_time.contains('-') {
        return BAD_VMT_TIMESTAMP;
    }

    let hh = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let mm = &caps[3];
    let ss = &caps[4];
    let fs = caps.get(6).map(|m| m.as_str()).unwrap_or("");

    let ms = if fs.is_empty() {
        0
    } else if fs.len() == 3 {
        match fs.parse::<u64>() {
            Ok(v) => v,
            Err(_) => return BAD_VMT_TIMESTAMP,
        }
    } else {
        return BAD_VMT_TIMESTAMP;
    };

    let hours = if hh.is_empty() {
        0
    } else {
        match hh.parse::<u64>() {
            Ok(v) => v,
            Err(_) => return BAD_VMT_TIMESTAMP,
        }
    };
    let minutes: u64 = match mm.parse() {
        Ok(v) => v,
        Err(_) => return BAD_VMT_TIMESTAMP,
    };
    let seconds: u64 = match ss.parse() {
        Ok(v) => v,
        Err(_) => return BAD_VMT_TIMESTAMP,
    };

    let ts = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + ms;
    u32::try_from(ts).unwrap_or(BAD_VMT_TIMESTAMP)
}

/// WebVMT cue parser.
///
/// Feed the file content with [`parse_str`](Self::parse_str), then call
/// [`finish`](Self::finish) to flush the terminal sample. Cue state
/// lives in the parser; a new file needs a new parser.
#[derive(Debug)]
pub struct WebVmtParser {
    binary: bool,
    prev_ts: Option<u32>,
    prev_payload: Vec<u8>,
    samples: Vec<WebVmtSample>,
    pattern_cue: Regex,
    pattern_note: Regex,
    pattern_timestamp: Regex,
    pattern_sync: Regex,
    pattern_type: Regex,
    pattern_data: Regex,
}

impl WebVmtParser {
    /// `binary` selects hex-decoded cue bodies instead of sync-command
    /// extraction.
    pub fn new(binary: bool) -> Result<Self, UncError> {
        let build = |re: &str| {
            Regex::new(re)
                .map_err(|e| UncError::Internal(format!("invalid WebVMT pattern: {e}")))
        };
        Ok(Self {
            binary,
            prev_ts: None,
            prev_payload: Vec::new(),
            samples: Vec::new(),
            pattern_cue: build(r"^\s*(-?[\d:.]*)\s*-->\s*(-?[\d:.]*)?.*")?,
            pattern_note: build(r"^\s*NOTE.*")?,
            pattern_timestamp: build(r"^-?((\d*):)?(\d\d):(\d\d)(\.(\d*))?$")?,
            pattern_sync: build(r#"\{\s*"sync"\s*:\s*\{(.*?)\}\s*\}"#)?,
            pattern_type: build(r#""type"\s*:\s*"(.*?)""#)?,
            pattern_data: build(r#""data"\s*:\s*"(.*?)""#)?,
        })
    }

    /// Parses the full text of a WebVMT file.
    pub fn parse_str(&mut self, content: &str) {
        let mut lines = content.lines();

        while let Some(line) = lines.next() {
            if self.pattern_note.is_match(line) {
                // NOTE block: skip until the next blank line.
                for skipped in lines.by_ref() {
                    if skipped.is_empty() {
                        break;
                    }
                }
                continue;
            }

            let Some(caps) = self.pattern_cue.captures(line) else {
                continue;
            };
            let cue_start = caps[1].to_string();

            // Cue body: lines up to the next blank line.
            let mut body: Vec<&str> = Vec::new();
            for body_line in lines.by_ref() {
                if body_line.is_empty() {
                    break;
                }
                body.push(body_line);
            }

            let payload = if self.binary {
                let mut concat = Vec::new();
                for body_line in &body {
                    concat.extend_from_slice(&hex_to_binary(body_line));
                }
                concat
            } else {
                let mut content = String::new();
                for body_line in &body {
                    content.push_str(body_line);
                    content.push('\n');
                }
                self.parse_sync_data(&content)
            };

            let ts = parse_vmt_timestamp(&cue_start, &self.pattern_timestamp);
            if ts == BAD_VMT_TIMESTAMP {
                warn!("Bad WebVMT timestamp: {cue_start}");
                continue;
            }

            self.push_cue(ts, payload);
        }
    }

    /// Extracts payload bytes from the sync commands of a cue body.
    fn parse_sync_data(&self, content: &str) -> Vec<u8> {
        let mut data = Vec::new();

        for caps in self.pattern_sync.captures_iter(content) {
            let sync = &caps[1];

            let Some(type_caps) = self.pattern_type.captures(sync) else {
                continue;
            };
            let sync_type = &type_caps[1];

            let text_data = self
                .pattern_data
                .captures(sync)
                .map(|c| c[1].to_string())
                .unwrap_or_default();

            if sync_type.ends_with(".hex") {
                data.extend_from_slice(&hex_to_binary(&text_data));
            } else if sync_type.ends_with(".base64") {
                data.extend_from_slice(&decode_base64(&text_data));
            } else {
                data.extend_from_slice(text_data.as_bytes());
            }
        }

        data
    }

    fn push_cue(&mut self, ts: u32, payload: Vec<u8>) {
        match self.prev_ts {
            // The first valid cue initializes the state; emission
            // starts with the second cue.
            None => {
                self.prev_ts = Some(ts);
                self.prev_payload = payload;
            }
            Some(prev) if ts > prev => {
                let prev_payload = std::mem::replace(&mut self.prev_payload, payload);
                self.samples.push(WebVmtSample {
                    duration_ms: ts - prev,
                    payload: prev_payload,
                });
                self.prev_ts = Some(ts);
            }
            Some(prev) if ts == prev => {
                // Same timestamp: merge, existing payload first.
                self.prev_payload.extend_from_slice(&payload);
            }
            Some(_) => {
                warn!("Bad WebVMT timestamp order: {ts}");
            }
        }
    }

    /// Emits the terminal sample (duration 1) and returns all samples.
    pub fn finish(mut self) -> Vec<WebVmtSample> {
        self.samples.push(WebVmtSample {
            duration_ms: 1,
            payload: std::mem::take(&mut self.prev_payload),
        });
        self.samples
    }
}
