//! Line-level encoding and decoding of requests and responses.
//!
//! A read from the engine's stdout may contain several concatenated request
//! lines; [`split_lines`] separates them so each can be decoded
//! independently. Decoding is total: malformed input yields an [`Error`],
//! never a panic. Callers drop malformed lines without emitting a response
//! (the engine's own timeout then resolves the starved request).

use std::fmt::Write as _;

use thiserror::Error;

use crate::{Aux, Decision, DeviceClass, InputEvent, Transition};

/// Errors from decoding protocol lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The line was empty or had fewer fields than the minimum.
    #[error("truncated line: {0:?}")]
    Truncated(String),
    /// The device class token was not KEYBOARD or MOUSE.
    #[error("unknown device class: {0:?}")]
    Device(String),
    /// The transition token was not DOWN or UP.
    #[error("unknown transition: {0:?}")]
    Transition(String),
    /// A numeric field failed to parse.
    #[error("bad numeric field: {0:?}")]
    Number(String),
    /// The field count did not match the device class.
    #[error("wrong field count for {device}: {count}")]
    FieldCount {
        /// Device class token of the offending line.
        device: &'static str,
        /// Number of comma-separated fields seen.
        count: usize,
    },
    /// The response decision token was not "0" or "1".
    #[error("unknown decision: {0:?}")]
    Decision(String),
}

/// Split a read buffer into complete lines, tolerating `\r\n` endings.
///
/// Empty lines are skipped. A trailing fragment without a line break is not
/// returned; with the line-buffered writers on both ends of this protocol a
/// read boundary always falls on a newline, so partial trailing data only
/// occurs on torn final reads at process exit.
pub fn split_lines(buf: &str) -> impl Iterator<Item = &str> {
    buf.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty())
}

/// Encode a request line for `event`, including the trailing newline.
pub(crate) fn encode_request(event: &InputEvent) -> String {
    let mut line = String::with_capacity(32);
    let _ = write!(
        line,
        "{},{},{}",
        event.device.token(),
        event.transition.token(),
        event.code
    );
    match event.aux {
        Aux::None => {}
        Aux::Scan(scan) => {
            let _ = write!(line, ",{scan}");
        }
        Aux::Pointer { x, y } => {
            let _ = write!(line, ",{x},{y}");
        }
    }
    let _ = writeln!(line, ",{}", event.event_id);
    line
}

/// Parse one request line (no trailing newline).
pub(crate) fn parse_request(line: &str) -> Result<InputEvent, Error> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        return Err(Error::Truncated(line.to_string()));
    }

    let device = match fields[0] {
        "KEYBOARD" => DeviceClass::Keyboard,
        "MOUSE" => DeviceClass::Mouse,
        other => return Err(Error::Device(other.to_string())),
    };
    let transition = match fields[1] {
        "DOWN" => Transition::Down,
        "UP" => Transition::Up,
        other => return Err(Error::Transition(other.to_string())),
    };
    let code = parse_u32(fields[2])?;
    let event_id = parse_u64(fields[fields.len() - 1])?;

    // Everything between the code and the id is auxiliary data whose shape
    // depends on the device class.
    let aux_fields = &fields[3..fields.len() - 1];
    let aux = match (device, aux_fields) {
        (DeviceClass::Keyboard, []) => Aux::None,
        (DeviceClass::Keyboard, [scan]) => Aux::Scan(parse_u32(scan)?),
        (DeviceClass::Mouse, [x, y]) => Aux::Pointer {
            x: parse_f64(x)?,
            y: parse_f64(y)?,
        },
        _ => {
            return Err(Error::FieldCount {
                device: device.token(),
                count: fields.len(),
            });
        }
    };

    Ok(InputEvent {
        device,
        transition,
        code,
        aux,
        event_id,
    })
}

/// Encode a response line, including the trailing newline.
pub(crate) fn encode_response(decision: Decision, event_id: u64) -> String {
    format!("{},{event_id}\n", decision.token())
}

/// Parse one response line (no trailing newline).
pub(crate) fn parse_response(line: &str) -> Result<(Decision, u64), Error> {
    let (code, id) = line
        .split_once(',')
        .ok_or_else(|| Error::Truncated(line.to_string()))?;
    let decision = match code {
        "0" => Decision::Propagate,
        "1" => Decision::Block,
        other => return Err(Error::Decision(other.to_string())),
    };
    Ok((decision, parse_u64(id)?))
}

/// Parse a `u32` field.
fn parse_u32(s: &str) -> Result<u32, Error> {
    s.parse().map_err(|_| Error::Number(s.to_string()))
}

/// Parse a `u64` field.
fn parse_u64(s: &str) -> Result<u64, Error> {
    s.parse().map_err(|_| Error::Number(s.to_string()))
}

/// Parse an `f64` field, rejecting the non-finite spellings `f64::parse`
/// would otherwise accept.
fn parse_f64(s: &str) -> Result<f64, Error> {
    let v: f64 = s.parse().map_err(|_| Error::Number(s.to_string()))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(Error::Number(s.to_string()))
    }
}
