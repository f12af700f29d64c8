// Blocking delay used for settle polling cadence

use std::time::Duration;

pub trait Delay {
    fn delay(&mut self, period: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, period: Duration) {
        std::thread::sleep(period);
    }
}
