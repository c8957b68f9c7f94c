//! Command parsing and encoding
//!
//! `CommandParser` is a byte-fed state machine. Bytes outside a frame are
//! ignored until a sentinel arrives; a parse error resets the parser to
//! sentinel scanning, so a corrupted frame never desynchronizes the link
//! permanently. Read timeouts are the caller's concern: on a timed-out byte
//! the caller resets the parser and goes back to scanning.

use heapless::Vec;

use crate::wire::{
    DELIMITER, MAX_ARG_DIGITS, OP_BACKLASH, OP_HANDSHAKE, OP_IMAGE_HEIGHT, OP_LINE_PITCH,
    OP_OUTPUT_WIDTH, OP_PIXEL_WIDTH, OP_RAMP_STEPS, OP_START_JOB, OP_VELOCITY, SENTINEL,
};

/// Maximum encoded command length: sentinel + opcode + digits + delimiter
pub const MAX_COMMAND_LEN: usize = 2 + MAX_ARG_DIGITS as usize + 1;

/// A complete command received from the host
///
/// `OutputWidth` is the legacy spelling of the scanline width used by older
/// host revisions; the device treats it exactly like `PixelWidth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `##` — two-sentinel handshake
    Handshake,
    /// `#X<n>;` — scanline width, legacy spelling
    OutputWidth(u16),
    /// `#P<n>;` — scanline width in pixels
    PixelWidth(u16),
    /// `#Y<n>;` — image height in lines
    ImageHeight(u16),
    /// `#B<n>;` — backlash compensation steps
    Backlash(u16),
    /// `#S<n>;` — scanline advance pitch in steps
    LinePitch(u16),
    /// `#R<n>;` — ramp pad length in steps
    RampSteps(u16),
    /// `#V<n>;` — cruise velocity as inter-step delay in timer ticks
    Velocity(u16),
    /// `#!` — start the raster job
    StartJob,
}

/// Errors raised while parsing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Opcode byte is not a recognized command
    UnknownCommand,
    /// Byte inside a numeric argument that is neither a digit nor the
    /// delimiter
    BadDigit,
    /// More than five digits, or a value that does not fit 16 bits
    ArgOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Scanning for the sentinel byte
    AwaitSentinel,
    /// Got the sentinel, waiting for the opcode
    AwaitOpcode,
    /// Accumulating ASCII digits of a numeric argument
    ReadingArg { op: u8, value: u32, digits: u8 },
}

/// State machine for parsing host commands byte by byte
#[derive(Debug, Clone)]
pub struct CommandParser {
    state: ParseState,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    /// Create a new parser in the sentinel-scanning state
    pub const fn new() -> Self {
        Self {
            state: ParseState::AwaitSentinel,
        }
    }

    /// Reset to sentinel scanning, abandoning any in-progress frame
    pub fn reset(&mut self) {
        self.state = ParseState::AwaitSentinel;
    }

    /// Whether a frame is currently in progress
    pub fn mid_frame(&self) -> bool {
        self.state != ParseState::AwaitSentinel
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(command))` when a complete command is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on a malformed
    /// frame. After either a command or an error the parser is back in the
    /// sentinel-scanning state.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Command>, ParseError> {
        match self.state {
            ParseState::AwaitSentinel => {
                if byte == SENTINEL {
                    self.state = ParseState::AwaitOpcode;
                }
                // Anything else is line noise between frames
                Ok(None)
            }
            ParseState::AwaitOpcode => match byte {
                OP_HANDSHAKE => {
                    self.reset();
                    Ok(Some(Command::Handshake))
                }
                OP_START_JOB => {
                    self.reset();
                    Ok(Some(Command::StartJob))
                }
                OP_OUTPUT_WIDTH | OP_PIXEL_WIDTH | OP_IMAGE_HEIGHT | OP_BACKLASH
                | OP_LINE_PITCH | OP_RAMP_STEPS | OP_VELOCITY => {
                    self.state = ParseState::ReadingArg {
                        op: byte,
                        value: 0,
                        digits: 0,
                    };
                    Ok(None)
                }
                _ => {
                    self.reset();
                    Err(ParseError::UnknownCommand)
                }
            },
            ParseState::ReadingArg { op, value, digits } => {
                if byte.is_ascii_digit() {
                    if digits == MAX_ARG_DIGITS {
                        self.reset();
                        return Err(ParseError::ArgOverflow);
                    }
                    self.state = ParseState::ReadingArg {
                        op,
                        value: value * 10 + u32::from(byte - b'0'),
                        digits: digits + 1,
                    };
                    Ok(None)
                } else if byte == DELIMITER {
                    self.reset();
                    match u16::try_from(value) {
                        Ok(v) => Self::numeric(op, v)
                            .map(Some)
                            .ok_or(ParseError::UnknownCommand),
                        Err(_) => Err(ParseError::ArgOverflow),
                    }
                } else {
                    self.reset();
                    Err(ParseError::BadDigit)
                }
            }
        }
    }

    // ReadingArg is only entered for the opcodes below
    fn numeric(op: u8, value: u16) -> Option<Command> {
        match op {
            OP_OUTPUT_WIDTH => Some(Command::OutputWidth(value)),
            OP_PIXEL_WIDTH => Some(Command::PixelWidth(value)),
            OP_IMAGE_HEIGHT => Some(Command::ImageHeight(value)),
            OP_BACKLASH => Some(Command::Backlash(value)),
            OP_LINE_PITCH => Some(Command::LinePitch(value)),
            OP_RAMP_STEPS => Some(Command::RampSteps(value)),
            OP_VELOCITY => Some(Command::Velocity(value)),
            _ => None,
        }
    }
}

impl Command {
    /// Encode this command into its wire form (for the host sender and for
    /// tests)
    pub fn encode(&self) -> Vec<u8, MAX_COMMAND_LEN> {
        let mut out = Vec::new();
        match *self {
            Command::Handshake => Self::bare(&mut out, OP_HANDSHAKE),
            Command::StartJob => Self::bare(&mut out, OP_START_JOB),
            Command::OutputWidth(v) => Self::numeric_frame(&mut out, OP_OUTPUT_WIDTH, v),
            Command::PixelWidth(v) => Self::numeric_frame(&mut out, OP_PIXEL_WIDTH, v),
            Command::ImageHeight(v) => Self::numeric_frame(&mut out, OP_IMAGE_HEIGHT, v),
            Command::Backlash(v) => Self::numeric_frame(&mut out, OP_BACKLASH, v),
            Command::LinePitch(v) => Self::numeric_frame(&mut out, OP_LINE_PITCH, v),
            Command::RampSteps(v) => Self::numeric_frame(&mut out, OP_RAMP_STEPS, v),
            Command::Velocity(v) => Self::numeric_frame(&mut out, OP_VELOCITY, v),
        }
        out
    }

    fn bare(out: &mut Vec<u8, MAX_COMMAND_LEN>, op: u8) {
        // MAX_COMMAND_LEN bounds every encoding; pushes cannot fail
        let _ = out.push(SENTINEL);
        let _ = out.push(op);
    }

    fn numeric_frame(out: &mut Vec<u8, MAX_COMMAND_LEN>, op: u8, value: u16) {
        Self::bare(out, op);
        let mut digits = [0u8; MAX_ARG_DIGITS as usize];
        let mut n = value;
        let mut i = digits.len();
        loop {
            i -= 1;
            digits[i] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        let _ = out.extend_from_slice(&digits[i..]);
        let _ = out.push(DELIMITER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut CommandParser, bytes: &[u8]) -> Vec<Command, 8> {
        let mut out = Vec::new();
        for &b in bytes {
            if let Ok(Some(cmd)) = parser.feed(b) {
                out.push(cmd).unwrap();
            }
        }
        out
    }

    #[test]
    fn test_handshake() {
        let mut parser = CommandParser::new();
        assert_eq!(parser.feed(b'#'), Ok(None));
        assert_eq!(parser.feed(b'#'), Ok(Some(Command::Handshake)));
        assert!(!parser.mid_frame());
    }

    #[test]
    fn test_numeric_commands() {
        let mut parser = CommandParser::new();
        let cmds = feed_all(&mut parser, b"#P1000;#Y100;#V120;#!");
        assert_eq!(
            &cmds[..],
            &[
                Command::PixelWidth(1000),
                Command::ImageHeight(100),
                Command::Velocity(120),
                Command::StartJob,
            ]
        );
    }

    #[test]
    fn test_legacy_width_spelling() {
        let mut parser = CommandParser::new();
        let cmds = feed_all(&mut parser, b"#X800;");
        assert_eq!(&cmds[..], &[Command::OutputWidth(800)]);
    }

    #[test]
    fn test_noise_between_frames_is_ignored() {
        let mut parser = CommandParser::new();
        let cmds = feed_all(&mut parser, b"\x00\xffjunk#B12;garbage#S3;");
        assert_eq!(&cmds[..], &[Command::Backlash(12), Command::LinePitch(3)]);
    }

    #[test]
    fn test_bad_digit_invalidates_argument() {
        let mut parser = CommandParser::new();
        assert_eq!(parser.feed(b'#'), Ok(None));
        assert_eq!(parser.feed(b'X'), Ok(None));
        assert_eq!(parser.feed(b'a'), Err(ParseError::BadDigit));
        assert!(!parser.mid_frame());
        // Parser recovers for the next frame
        assert_eq!(parser.feed(b'#'), Ok(None));
        assert_eq!(parser.feed(b'!'), Ok(Some(Command::StartJob)));
    }

    #[test]
    fn test_unknown_opcode() {
        let mut parser = CommandParser::new();
        assert_eq!(parser.feed(b'#'), Ok(None));
        assert_eq!(parser.feed(b'Q'), Err(ParseError::UnknownCommand));
    }

    #[test]
    fn test_too_many_digits() {
        let mut parser = CommandParser::new();
        for &b in b"#V12345" {
            assert_eq!(parser.feed(b), Ok(None));
        }
        assert_eq!(parser.feed(b'6'), Err(ParseError::ArgOverflow));
    }

    #[test]
    fn test_value_exceeding_16_bits() {
        let mut parser = CommandParser::new();
        let mut last = Ok(None);
        for &b in b"#P99999;" {
            last = parser.feed(b);
        }
        assert_eq!(last, Err(ParseError::ArgOverflow));
    }

    #[test]
    fn test_encode_parses_back() {
        let mut parser = CommandParser::new();
        for cmd in [
            Command::Handshake,
            Command::PixelWidth(1000),
            Command::Velocity(65535),
            Command::Backlash(0),
            Command::StartJob,
        ] {
            let encoded = cmd.encode();
            let parsed = feed_all(&mut parser, &encoded);
            assert_eq!(&parsed[..], &[cmd]);
        }
    }

    #[test]
    fn test_reply_bytes() {
        use crate::wire::Reply;
        assert_eq!(&Reply::Accept.as_bytes(), b"#Y");
        assert_eq!(&Reply::Reject.as_bytes(), b"#N");
        assert_eq!(&Reply::LineReady.as_bytes(), b"#D");
        assert_eq!(&Reply::Unknown.as_bytes(), b"#?");
        assert_eq!(&Reply::Handshake.as_bytes(), b"##");
        assert_eq!(Reply::from_opcode(b'D'), Some(Reply::LineReady));
        assert_eq!(Reply::from_opcode(b'z'), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Arbitrary byte streams never panic the parser, and it always
            /// ends up able to parse a clean frame afterwards.
            #[test]
            fn parser_survives_garbage(noise in proptest::collection::vec(any::<u8>(), 0..256)) {
                let mut parser = CommandParser::new();
                for b in noise {
                    let _ = parser.feed(b);
                }
                parser.reset();
                let mut got = None;
                for &b in b"#R42;" {
                    if let Ok(Some(cmd)) = parser.feed(b) {
                        got = Some(cmd);
                    }
                }
                prop_assert_eq!(got, Some(Command::RampSteps(42)));
            }

            /// Every encodable command round-trips through the parser.
            #[test]
            fn encode_roundtrip(value in 0u16..=65535) {
                let mut parser = CommandParser::new();
                let mut got = None;
                for &b in Command::ImageHeight(value).encode().iter() {
                    if let Ok(Some(cmd)) = parser.feed(b) {
                        got = Some(cmd);
                    }
                }
                prop_assert_eq!(got, Some(Command::ImageHeight(value)));
            }
        }
    }
}
