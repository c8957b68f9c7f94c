//! Pyrograph - Laser Raster Engraver Firmware
//!
//! Main firmware binary for RP2040-based engraver controllers. A host
//! program streams grayscale scanlines over serial; the firmware sweeps
//! them onto the work surface, modulating the laser once per step.
//!
//! Named after the Greek "pyrographia", "writing with fire".

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use pyrograph_core::table::{generate, AccelTable};
use pyrograph_drivers::{CommandUart, EngraveDriver, RasterLaser, SharedMotion};

mod board;
mod tasks;

/// Acceleration constant: from ~316 steps/s to ~14300 steps/s (140 ticks)
/// over the length of the table
const ACCEL: u32 = 40_000_000;

/// Acceleration table length; bounds the longest usable ramp
const RAMP_TABLE_LEN: usize = 512;

/// Acceleration table, baked into flash at compile time
static ACCEL_TABLE: [u16; RAMP_TABLE_LEN] = generate(ACCEL);

/// State shared between the control task and the step-pulse interrupt
static MOTION: SharedMotion<board::StepSlices, board::LaserSlice> = SharedMotion::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pyrograph firmware starting...");

    let p = embassy_rp::init(Default::default());
    board::init(p);
    info!("Board initialized");

    MOTION.init(
        board::StepSlices::new(),
        board::LaserSlice,
        AccelTable::new(&ACCEL_TABLE),
    );
    board::enable_step_interrupt();

    let laser = RasterLaser::new(board::LaserSlice, board::LaserGate);
    let driver = EngraveDriver::new(&MOTION, laser, board::ScanDir, board::FeedDir);
    let port = CommandUart::new(board::HostUartRx, board::HostUartTx);

    unwrap!(spawner.spawn(tasks::control::control_task(port, driver)));
    unwrap!(spawner.spawn(tasks::status::status_task()));

    info!("Awaiting host at 57600 8N1");
}
