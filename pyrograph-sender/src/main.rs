//! Pyrograph sender
//!
//! Streams a grayscale image to the engraver over a serial link:
//!
//! ```text
//! pyrograph-sender -d /dev/ttyUSB0 --velocity 500 image.png
//! ```

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use getopts::Options;
use serial::prelude::*;
use tracing::{error, info};

mod error;
mod image;
mod link;

use crate::error::SenderError;
use crate::image::ScanlineImage;
use crate::link::{EngraverLink, JobOptions};

/// Per-read timeout on the serial port; moves between line requests can be
/// slow, so this errs on the patient side
const READ_TIMEOUT_MS: u64 = 5000;

fn usage(prg: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] FILE", prg);
    print!("{}", opts.usage(&brief));
}

fn parse_u16(matches: &getopts::Matches, name: &str) -> Option<u16> {
    matches
        .opt_str(name)
        .and_then(|s| s.parse().map_err(|_| error!("invalid --{name} value: {s}")).ok())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("d", "device", "serial device", "DEV");
    opts.optopt("", "velocity", "cruise delay (timer ticks per step)", "TICKS");
    opts.optopt("", "ramp", "ramp pad length (steps)", "STEPS");
    opts.optopt("", "backlash", "backlash compensation (steps)", "STEPS");
    opts.optopt("", "pitch", "scanline advance (steps)", "STEPS");
    opts.optflag("v", "verbose", "debug logging");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if matches.opt_present("h") {
        usage(&program, &opts);
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_max_level(if matches.opt_present("v") {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let Some(file_name) = matches.free.first() else {
        usage(&program, &opts);
        return ExitCode::FAILURE;
    };
    let device = matches
        .opt_str("d")
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let job = JobOptions {
        velocity: parse_u16(&matches, "velocity"),
        ramp_steps: parse_u16(&matches, "ramp"),
        backlash: parse_u16(&matches, "backlash"),
        pitch: parse_u16(&matches, "pitch"),
    };

    match run(Path::new(file_name), &device, &job) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(file: &Path, device: &str, job: &JobOptions) -> Result<(), SenderError> {
    let image = ScanlineImage::load(file)?;
    info!(
        "{}: {}x{} px",
        file.display(),
        image.width(),
        image.height()
    );

    // 57600 8N1, no flow control; the line parameters are fixed
    let mut port = serial::open(device)?;
    port.reconfigure(&|settings| {
        settings.set_baud_rate(serial::Baud57600)?;
        settings.set_char_size(serial::Bits8);
        settings.set_parity(serial::ParityNone);
        settings.set_stop_bits(serial::Stop1);
        settings.set_flow_control(serial::FlowNone);
        Ok(())
    })?;
    port.set_timeout(Duration::from_millis(READ_TIMEOUT_MS))?;

    let mut link = EngraverLink::new(port);
    link.handshake()?;
    info!("device ready on {device}");
    link.run_job(&image, job)
}
