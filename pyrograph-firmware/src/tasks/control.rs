//! Host command task
//!
//! Runs the blocking controller: parse a command, acknowledge it, and on
//! start-job execute the whole raster sequence. Moves busy-poll the
//! running flag, so this task owns the CPU for the duration of a job;
//! serial input in the meantime sits in the UART FIFO, and nothing else on
//! the device needs to run faster than the status LED.

use defmt::*;
use embassy_futures::yield_now;

use pyrograph_core::controller::{Controller, ServiceOutcome};
use pyrograph_core::table::AccelTable;
use pyrograph_drivers::{CommandUart, EngraveDriver};

use crate::board;

pub type HostPort = CommandUart<board::HostUartRx, board::HostUartTx>;
pub type Driver = EngraveDriver<
    'static,
    board::StepSlices,
    board::LaserSlice,
    board::LaserSlice,
    board::LaserGate,
    board::ScanDir,
    board::FeedDir,
>;

#[embassy_executor::task]
pub async fn control_task(mut port: HostPort, mut driver: Driver) {
    info!("Control task started");

    let table = AccelTable::new(&crate::ACCEL_TABLE);
    let mut controller = Controller::new();

    loop {
        match controller.service(&mut port, &mut driver, &table) {
            ServiceOutcome::Idle => yield_now().await,
            ServiceOutcome::Handled(cmd) => debug!("Command: {:?}", cmd),
            ServiceOutcome::BadFrame => warn!("Malformed command"),
            ServiceOutcome::JobCompleted => {
                let p = controller.params();
                info!("Job done: {}x{} px", p.width, p.height);
            }
            ServiceOutcome::JobAborted => warn!("Host stopped streaming, job abandoned"),
        }
    }
}
