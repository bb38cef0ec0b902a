//! The on-disk session format.
//!
//! One event per line: the key as a decimal byte value, whitespace, and the
//! delay in nanoseconds, terminated by a newline:
//!
//! ```text
//! 97 0
//! 98 5000000
//! 99 2000000
//! ```
//!
//! There is no header, footer or event count, so a truncated file reads as
//! a shorter complete one.

use std::io::{BufRead, Write};
use std::time::Duration;

use crate::error::{CmdplayError, DecodeReason, Result};

use super::event::{EventLog, InputEvent};

/// Serialize `events` to `destination`.
///
/// Write failures are reported as [`CmdplayError::Write`]; lines already
/// written stay written.
pub fn write_events<W: Write>(events: &EventLog, mut destination: W) -> Result<()> {
    for event in events {
        writeln!(destination, "{} {}", event.key, event.delay.as_nanos())
            .map_err(CmdplayError::Write)?;
    }
    destination.flush().map_err(CmdplayError::Write)
}

/// Parse a session from `source`.
///
/// Stops at the first malformed record. Blank lines are accepted only at
/// the end of the input.
pub fn read_events<R: BufRead>(source: R) -> Result<EventLog> {
    let mut events = EventLog::new();
    let mut first_blank: Option<usize> = None;

    for (index, line) in source.split(b'\n').enumerate() {
        let line = line?;
        let line_no = index + 1;
        let text = String::from_utf8_lossy(&line);

        if text.trim_ascii().is_empty() {
            first_blank.get_or_insert(line_no);
            continue;
        }
        if let Some(blank) = first_blank {
            return Err(CmdplayError::decode(blank, DecodeReason::FieldCount { found: 0 }));
        }

        events.push(parse_record(&text, line_no)?);
    }

    Ok(events)
}

fn parse_record(text: &str, line_no: usize) -> Result<InputEvent> {
    let fields: Vec<&str> = text.split_ascii_whitespace().collect();
    let [key, delay] = fields.as_slice() else {
        return Err(CmdplayError::decode(
            line_no,
            DecodeReason::FieldCount {
                found: fields.len(),
            },
        ));
    };

    let key: u8 = key
        .parse()
        .map_err(|_| CmdplayError::decode(line_no, DecodeReason::InvalidKey((*key).to_string())))?;
    let nanos: u64 = delay.parse().map_err(|_| {
        CmdplayError::decode(line_no, DecodeReason::InvalidDelay((*delay).to_string()))
    })?;

    Ok(InputEvent::new(key, Duration::from_nanos(nanos)))
}
