//! Serial link to the engraver
//!
//! Speaks the `#`-framed command protocol: handshake with bounded retries
//! (the device may be mid-reset), one acknowledged command per parameter,
//! then per-scanline flow control — wait for `#D`, write exactly `width`
//! raw bytes. The first rejection, unexpected byte, or silence aborts the
//! whole job; the raw bytes are kept for the operator's diagnostic dump.

use std::io::{ErrorKind, Read, Write};

use tracing::{debug, info, warn};

use pyrograph_protocol::{Command, Reply, SENTINEL};

use crate::error::SenderError;
use crate::image::ScanlineImage;

/// Handshake attempts before giving up
pub const HANDSHAKE_ATTEMPTS: u32 = 5;

/// Optional job parameters; unset ones keep the device defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOptions {
    pub velocity: Option<u16>,
    pub ramp_steps: Option<u16>,
    pub backlash: Option<u16>,
    pub pitch: Option<u16>,
}

enum Poll {
    Timeout,
    Reply(Reply),
    Garbage(Vec<u8>),
}

/// Command/streaming session over an open serial stream
pub struct EngraverLink<S: Read + Write> {
    stream: S,
}

impl<S: Read + Write> EngraverLink<S> {
    /// Wrap an opened, configured stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Exchange the two-byte handshake, retrying while the device boots
    pub fn handshake(&mut self) -> Result<(), SenderError> {
        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            self.stream.write_all(&Command::Handshake.encode())?;
            self.stream.flush()?;
            match self.poll_reply()? {
                Poll::Reply(Reply::Handshake) => {
                    debug!("handshake ok on attempt {attempt}");
                    return Ok(());
                }
                Poll::Timeout => debug!("handshake attempt {attempt}: no reply"),
                Poll::Reply(other) => warn!("handshake attempt {attempt}: got {other:?}"),
                Poll::Garbage(raw) => warn!("handshake attempt {attempt}: noise {raw:02x?}"),
            }
        }
        Err(SenderError::HandshakeFailed {
            attempts: HANDSHAKE_ATTEMPTS,
        })
    }

    /// Send one command and require the device to accept it
    pub fn send_command(&mut self, command: Command) -> Result<(), SenderError> {
        self.stream.write_all(&command.encode())?;
        self.stream.flush()?;
        match self.poll_reply()? {
            Poll::Reply(Reply::Accept) => Ok(()),
            Poll::Reply(Reply::Reject) => Err(SenderError::Rejected { command }),
            Poll::Reply(other) => Err(SenderError::UnexpectedReply {
                expected: Reply::Accept,
                got: Some(other),
                raw: Vec::new(),
            }),
            Poll::Timeout => Err(SenderError::UnexpectedReply {
                expected: Reply::Accept,
                got: None,
                raw: Vec::new(),
            }),
            Poll::Garbage(raw) => Err(SenderError::UnexpectedReply {
                expected: Reply::Accept,
                got: None,
                raw,
            }),
        }
    }

    /// Negotiate parameters and stream every scanline
    pub fn run_job(&mut self, image: &ScanlineImage, opts: &JobOptions) -> Result<(), SenderError> {
        self.send_command(Command::PixelWidth(image.width()))?;
        self.send_command(Command::ImageHeight(image.height()))?;
        if let Some(v) = opts.velocity {
            self.send_command(Command::Velocity(v))?;
        }
        if let Some(r) = opts.ramp_steps {
            self.send_command(Command::RampSteps(r))?;
        }
        if let Some(b) = opts.backlash {
            self.send_command(Command::Backlash(b))?;
        }
        if let Some(p) = opts.pitch {
            self.send_command(Command::LinePitch(p))?;
        }
        self.send_command(Command::StartJob)?;
        info!("job accepted: {}x{} px", image.width(), image.height());

        for (line, row) in image.rows().enumerate() {
            self.await_line_ready(line as u32)?;
            self.stream.write_all(row)?;
            self.stream.flush()?;
            debug!("line {line} sent");
        }
        info!("all {} lines streamed", image.height());
        Ok(())
    }

    /// Block until the device requests the next scanline
    fn await_line_ready(&mut self, line: u32) -> Result<(), SenderError> {
        match self.poll_reply()? {
            Poll::Reply(Reply::LineReady) => Ok(()),
            Poll::Timeout => Err(SenderError::LineTimeout { line }),
            Poll::Reply(other) => Err(SenderError::UnexpectedReply {
                expected: Reply::LineReady,
                got: Some(other),
                raw: Vec::new(),
            }),
            Poll::Garbage(raw) => Err(SenderError::UnexpectedReply {
                expected: Reply::LineReady,
                got: None,
                raw,
            }),
        }
    }

    /// Read one two-byte reply; a read timeout is a `Poll::Timeout`, any
    /// non-sentinel traffic is collected for the diagnostic dump
    fn poll_reply(&mut self) -> Result<Poll, SenderError> {
        let first = match self.read_one()? {
            Some(b) => b,
            None => return Ok(Poll::Timeout),
        };
        if first != SENTINEL {
            let mut raw = vec![first];
            let mut rest = [0u8; 16];
            if let Ok(n) = self.stream.read(&mut rest) {
                raw.extend_from_slice(&rest[..n]);
            }
            return Ok(Poll::Garbage(raw));
        }
        let opcode = match self.read_one()? {
            Some(b) => b,
            None => return Ok(Poll::Timeout),
        };
        match Reply::from_opcode(opcode) {
            Some(reply) => Ok(Poll::Reply(reply)),
            None => Ok(Poll::Garbage(vec![first, opcode])),
        }
    }

    fn read_one(&mut self) -> Result<Option<u8>, SenderError> {
        let mut buf = [0u8; 1];
        match self.stream.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
