// MIT License - Copyright (c) 2026 Peter Wright

//! Wire grammar of the bridge's line protocol.
//!
//! The bridge emits one asynchronous notification per line:
//!
//! ```text
//! ~MODE,ID,ACTION,VALUE\r\n      e.g. ~OUTPUT,2,1,75.00
//! ```
//!
//! and accepts command and query lines:
//!
//! ```text
//! #MODE,ID,ACTION[,ARG]...\r\n   e.g. #OUTPUT,2,1,75.00
//! ?MODE,ID,ACTION\r\n            e.g. ?OUTPUT,2,1
//! ```
//!
//! There are no request IDs; a query's answer arrives later as a normal
//! notification and is correlated by mode/ID/action content.

use std::fmt;

/// Mode tag for zone-level devices (lights, switches, fans, shades).
pub const OUTPUT: &str = "OUTPUT";
/// Mode tag for button, keypad and scene events.
pub const DEVICE: &str = "DEVICE";

/// Keepalive query. The bridge's reply (if any) never matches the
/// notification grammar; the line exists to keep the TCP session alive.
pub(crate) const PING_LINE: &str = "?SYSTEM,10";

/// Action numbers used with `OUTPUT` commands and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Action {
    /// Set (or report) the output level
    Set = 1,
    /// Level is being raised
    Raising = 2,
    /// Level is being lowered
    Lowering = 3,
    /// Stop an in-progress raise/lower
    Stop = 4,
}

impl Action {
    /// Parse from the numeric wire value.
    pub fn from_value(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::Set),
            2 => Some(Self::Raising),
            3 => Some(Self::Lowering),
            4 => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Button state carried in the last field of a `DEVICE` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Button {
    Press = 3,
    Release = 4,
}

impl Button {
    /// Parse from the numeric wire value.
    pub fn from_value(v: u32) -> Option<Self> {
        match v {
            3 => Some(Self::Press),
            4 => Some(Self::Release),
            _ => None,
        }
    }
}

/// One decoded inbound notification.
///
/// For `OUTPUT` frames, `action` is an [`Action`] number and `value` the
/// level. For `DEVICE` frames, `action` is a button number and `value` a
/// [`Button`] code.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub mode: String,
    pub integration_id: u32,
    pub action: u32,
    pub value: f64,
}

/// A trailing argument on an outbound command line.
///
/// Levels are written with two decimals (the form the bridge echoes back);
/// text carries preformatted values such as fade times.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Integer(i64),
    Level(f64),
    Text(String),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Level(v) => write!(f, "{v:.2}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Build a `#MODE,ID,ACTION[,ARG]...` command line (without CRLF).
pub fn command_line(mode: &str, integration_id: u32, action: u32, args: &[Argument]) -> String {
    use fmt::Write;

    let mut line = format!("#{mode},{integration_id},{action}");
    for arg in args {
        let _ = write!(line, ",{arg}");
    }
    line
}

/// Build a `?MODE,ID,ACTION` query line (without CRLF).
pub fn query_line(mode: &str, integration_id: u32, action: u32) -> String {
    format!("?{mode},{integration_id},{action}")
}

/// Scan the read buffer for the next complete notification frame.
///
/// Every complete line is consumed from the front of the buffer whether or
/// not it decodes: prompt echoes and malformed frames are dropped silently.
/// `scanned` persists the newline search position across calls so a
/// long-lived buffer is never rescanned from the start.
pub(crate) fn scan_frame(buffer: &mut Vec<u8>, scanned: &mut usize) -> Option<Frame> {
    loop {
        let newline = match buffer[*scanned..].iter().position(|&b| b == b'\n') {
            Some(pos) => *scanned + pos,
            None => {
                *scanned = buffer.len();
                return None;
            }
        };
        let line: Vec<u8> = buffer.drain(..=newline).collect();
        *scanned = 0;
        if let Some(frame) = parse_line(&line) {
            return Some(frame);
        }
    }
}

/// Decode one line against the notification grammar.
///
/// The frame may be preceded by prompt text on the same line (the bridge
/// prints `GNET> ` before notifications); everything up to the `~` is
/// ignored. Fields that match the `[0-9.]+` character class but fail
/// numeric parsing (e.g. an ID of `2.5`) drop the frame.
fn parse_line(line: &[u8]) -> Option<Frame> {
    let end = line
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(line.len());
    let tilde = line[..end].iter().position(|&b| b == b'~')?;
    let body = std::str::from_utf8(&line[tilde + 1..end]).ok()?;

    let mut fields = body.split(',');
    let mode = fields.next()?;
    let id = fields.next()?;
    let action = fields.next()?;
    let value = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if mode.is_empty() || !mode.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    for field in [id, action, value] {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return None;
        }
    }

    Some(Frame {
        mode: mode.to_string(),
        integration_id: id.parse().ok()?,
        action: action.parse().ok()?,
        value: value.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &[u8]) -> Vec<Frame> {
        let mut buffer = input.to_vec();
        let mut scanned = 0;
        let mut frames = Vec::new();
        while let Some(frame) = scan_frame(&mut buffer, &mut scanned) {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            command_line(OUTPUT, 2, Action::Set as u32, &[Argument::Level(75.0)]),
            "#OUTPUT,2,1,75.00"
        );
        assert_eq!(
            command_line(
                OUTPUT,
                2,
                Action::Set as u32,
                &[Argument::Level(50.0), Argument::Text("00:01:30".to_string())]
            ),
            "#OUTPUT,2,1,50.00,00:01:30"
        );
        assert_eq!(
            command_line(DEVICE, 1, 5, &[Argument::Integer(Button::Press as i64)]),
            "#DEVICE,1,5,3"
        );
        assert_eq!(command_line(OUTPUT, 9, Action::Stop as u32, &[]), "#OUTPUT,9,4");
    }

    #[test]
    fn test_query_line() {
        assert_eq!(query_line(OUTPUT, 2, Action::Set as u32), "?OUTPUT,2,1");
        assert_eq!(PING_LINE, "?SYSTEM,10");
    }

    #[test]
    fn test_scan_single_frame() {
        let frames = scan_all(b"~OUTPUT,2,1,75.00\r\n");
        assert_eq!(
            frames,
            vec![Frame {
                mode: "OUTPUT".to_string(),
                integration_id: 2,
                action: 1,
                value: 75.0,
            }]
        );
    }

    #[test]
    fn test_scan_frame_after_prompt_junk() {
        let frames = scan_all(b"GNET> ~DEVICE,4,2,3\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].mode, "DEVICE");
        assert_eq!(frames[0].integration_id, 4);
        assert_eq!(frames[0].action, 2);
        assert_eq!(frames[0].value, 3.0);
    }

    #[test]
    fn test_scan_incremental_chunks() {
        let mut buffer = Vec::new();
        let mut scanned = 0;

        buffer.extend_from_slice(b"~OUTPUT,5,1,4");
        assert!(scan_frame(&mut buffer, &mut scanned).is_none());
        buffer.extend_from_slice(b"2.50\r");
        assert!(scan_frame(&mut buffer, &mut scanned).is_none());
        buffer.extend_from_slice(b"\n~OUT");
        let frame = scan_frame(&mut buffer, &mut scanned).expect("first frame complete");
        assert_eq!((frame.integration_id, frame.value), (5, 42.5));

        buffer.extend_from_slice(b"PUT,6,1,0.00\r\n");
        let frame = scan_frame(&mut buffer, &mut scanned).expect("second frame complete");
        assert_eq!((frame.integration_id, frame.value), (6, 0.0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_scan_preserves_order() {
        let frames = scan_all(b"~OUTPUT,1,1,10.00\r\n~OUTPUT,2,1,20.00\r\n~OUTPUT,3,1,30.00\r\n");
        let ids: Vec<u32> = frames.iter().map(|f| f.integration_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_boundary_values() {
        let frames = scan_all(b"~OUTPUT,2,1,0.00\r\n~OUTPUT,2,1,100.00\r\n");
        assert_eq!(frames[0].value, 0.0);
        assert_eq!(frames[1].value, 100.0);
    }

    #[test]
    fn test_malformed_frames_dropped() {
        // Non-numeric field, dotted integer, lowercase mode, too many fields:
        // all dropped without aborting the scan.
        let frames = scan_all(
            b"~OUTPUT,abc,1,50.00\r\n\
              ~OUTPUT,2.5,1,50.00\r\n\
              ~output,2,1,50.00\r\n\
              ~OUTPUT,2,1,50.00,9\r\n\
              ~OUTPUT,7,1,50.00\r\n",
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].integration_id, 7);
    }

    #[test]
    fn test_non_frame_lines_consumed() {
        let mut buffer = b"some banner text\r\n~OUTPUT,2,1,1.00\r\n".to_vec();
        let mut scanned = 0;
        let frame = scan_frame(&mut buffer, &mut scanned).expect("frame after banner");
        assert_eq!(frame.integration_id, 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_action_from_value() {
        assert_eq!(Action::from_value(1), Some(Action::Set));
        assert_eq!(Action::from_value(2), Some(Action::Raising));
        assert_eq!(Action::from_value(3), Some(Action::Lowering));
        assert_eq!(Action::from_value(4), Some(Action::Stop));
        assert_eq!(Action::from_value(5), None);
    }

    #[test]
    fn test_button_from_value() {
        assert_eq!(Button::from_value(3), Some(Button::Press));
        assert_eq!(Button::from_value(4), Some(Button::Release));
        assert_eq!(Button::from_value(0), None);
    }
}
