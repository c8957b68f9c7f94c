//! Device command controller
//!
//! Reads framed commands from the serial link, maintains the job
//! parameters, and runs the raster job sequence. Every accepted command is
//! acknowledged; malformed input is answered with `#?` and never crashes
//! or hangs the control loop. A read timeout mid-frame abandons the parse
//! and returns to sentinel scanning.

use heapless::Vec;
use pyrograph_protocol::{Command, CommandParser, Reply};

use crate::job::{JobParameters, ParamError};
use crate::motion::{Axis, Direction, MoveCommand};
use crate::ramp;
use crate::raster;
use crate::scanline::SCANLINE_CAPACITY;
use crate::table::AccelTable;
use crate::traits::{CommandPort, EngraveBackend, ReadTimeout};

/// Bounded wait for each byte inside a command frame
pub const FRAME_BYTE_TIMEOUT_MS: u32 = 250;

/// Bounded wait for each scanline payload byte
pub const LINE_BYTE_TIMEOUT_MS: u32 = 1000;

/// What one `service` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceOutcome {
    /// No complete frame arrived within the timeout
    Idle,
    /// A command was dispatched (acknowledged or rejected)
    Handled(Command),
    /// A malformed or unknown frame was answered with `#?`
    BadFrame,
    /// A raster job ran to completion
    JobCompleted,
    /// The host stopped streaming mid-job; the job was abandoned
    JobAborted,
}

/// Command dispatcher and job sequencer
#[derive(Debug, Default)]
pub struct Controller {
    parser: CommandParser,
    params: JobParameters,
}

impl Controller {
    /// Create a controller with default job parameters
    pub fn new() -> Self {
        Self {
            parser: CommandParser::new(),
            params: JobParameters::default(),
        }
    }

    /// Current job parameters
    pub fn params(&self) -> &JobParameters {
        &self.params
    }

    /// Read and dispatch at most one command
    ///
    /// Returns on a handled command, a bad frame, or a timeout; the
    /// firmware control loop calls this forever.
    pub fn service<P, B>(
        &mut self,
        port: &mut P,
        backend: &mut B,
        table: &AccelTable,
    ) -> ServiceOutcome
    where
        P: CommandPort,
        B: EngraveBackend,
    {
        loop {
            let byte = match port.read_byte(FRAME_BYTE_TIMEOUT_MS) {
                Ok(b) => b,
                Err(ReadTimeout) => {
                    // A timed-out frame is abandoned silently; idle timeouts
                    // just hand control back to the caller.
                    self.parser.reset();
                    return ServiceOutcome::Idle;
                }
            };
            match self.parser.feed(byte) {
                Ok(Some(cmd)) => return self.dispatch(cmd, port, backend, table),
                Ok(None) => {}
                Err(_) => {
                    port.send(&Reply::Unknown.as_bytes());
                    return ServiceOutcome::BadFrame;
                }
            }
        }
    }

    fn dispatch<P, B>(
        &mut self,
        cmd: Command,
        port: &mut P,
        backend: &mut B,
        table: &AccelTable,
    ) -> ServiceOutcome
    where
        P: CommandPort,
        B: EngraveBackend,
    {
        match cmd {
            Command::Handshake => {
                port.send(&Reply::Handshake.as_bytes());
                ServiceOutcome::Handled(cmd)
            }
            // `#X` is the legacy spelling of the scanline width
            Command::OutputWidth(v) | Command::PixelWidth(v) => {
                let result = self.params.set_width(v);
                self.acknowledge(port, result, cmd)
            }
            Command::ImageHeight(v) => {
                let result = self.params.set_height(v);
                self.acknowledge(port, result, cmd)
            }
            Command::Backlash(v) => {
                let result = self.params.set_backlash(v);
                self.acknowledge(port, result, cmd)
            }
            Command::LinePitch(v) => {
                let result = self.params.set_pitch(v);
                self.acknowledge(port, result, cmd)
            }
            Command::RampSteps(v) => {
                let result = self.params.set_ramp_steps(v);
                self.acknowledge(port, result, cmd)
            }
            Command::Velocity(v) => {
                let result = self.params.set_velocity(v);
                self.acknowledge(port, result, cmd)
            }
            Command::StartJob => {
                if !self.params.ready() {
                    port.send(&Reply::Reject.as_bytes());
                    return ServiceOutcome::Handled(cmd);
                }
                port.send(&Reply::Accept.as_bytes());
                match run_job(&self.params, port, backend, table) {
                    Ok(()) => ServiceOutcome::JobCompleted,
                    Err(ReadTimeout) => ServiceOutcome::JobAborted,
                }
            }
        }
    }

    // A rejected value never reaches the parameters; the setters assign
    // only on success.
    fn acknowledge<P: CommandPort>(
        &mut self,
        port: &mut P,
        result: Result<(), ParamError>,
        cmd: Command,
    ) -> ServiceOutcome {
        match result {
            Ok(()) => port.send(&Reply::Accept.as_bytes()),
            Err(_) => port.send(&Reply::Reject.as_bytes()),
        }
        ServiceOutcome::Handled(cmd)
    }
}

/// Run one raster job: for each scanline, request the line, stream it in,
/// sweep it with the laser, and advance the feed axis. Serpentine order:
/// even lines scan Forward, odd lines Reverse.
fn run_job<P, B>(
    params: &JobParameters,
    port: &mut P,
    backend: &mut B,
    table: &AccelTable,
) -> Result<(), ReadTimeout>
where
    P: CommandPort,
    B: EngraveBackend,
{
    let rate = params.velocity;
    let mut line = Vec::<u8, SCANLINE_CAPACITY>::new();

    for line_no in 0..params.height {
        port.send(&Reply::LineReady.as_bytes());

        line.clear();
        for _ in 0..params.width {
            let byte = port.read_byte(LINE_BYTE_TIMEOUT_MS)?;
            // Width is capped at the buffer capacity, so this never fails
            let _ = line.push(byte);
        }
        // Capacity was validated when the width was set
        let _ = backend.load_line(&line);

        let direction = if line_no % 2 == 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        backend.set_direction(Axis::Scan, direction);

        // Take up mechanical slack before sweeping back the other way
        if line_no > 0 && params.backlash > 0 {
            backend.run_move(Axis::Scan, MoveCommand::constant(params.backlash), rate);
        }

        ramp::accelerate(backend, Axis::Scan, table, rate, params.ramp_steps);

        let first_index = raster::first_pixel_index(0, params.width, direction);
        backend.laser_on(line[usize::from(first_index)]);
        backend.run_move(
            Axis::Scan,
            MoveCommand::raster(params.width, direction, 0),
            rate,
        );
        backend.laser_off();

        ramp::decelerate(backend, Axis::Scan, table, rate, params.ramp_steps);

        if params.pitch > 0 {
            backend.set_direction(Axis::Feed, Direction::Forward);
            backend.run_move(Axis::Feed, MoveCommand::constant(params.pitch), rate);
        }
    }
    Ok(())
}
