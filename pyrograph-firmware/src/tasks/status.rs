//! Status LED task
//!
//! Slow heartbeat while idle, fast blink while a move is running.

use embassy_time::{Duration, Ticker};

use pyrograph_hal::OutputPin;

use crate::board::StatusLed;

const TICK_MS: u64 = 100;

#[embassy_executor::task]
pub async fn status_task() {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    let mut led = StatusLed;
    let mut on = false;
    let mut elapsed = 0u32;

    loop {
        ticker.next().await;
        let period = if crate::MOTION.running() { 1 } else { 5 };
        elapsed += 1;
        if elapsed >= period {
            elapsed = 0;
            on = !on;
            led.set_state(on);
        }
    }
}
