use super::concurrent::{self, Event};
use embedded_hal::delay::DelayNs;
use std::time::Duration;

/// Returns immediately, recording how long it was asked to wait.
#[derive(Debug)]
pub struct Delay {
    name: &'static str,
}

impl Delay {
    /// Records into the same log as the pin with this name.
    pub fn new(name: &'static str) -> Delay {
        Delay { name }
    }
}

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        concurrent::record(self.name, Event::Delay(Duration::from_nanos(ns as u64)));
    }

    fn delay_us(&mut self, us: u32) {
        concurrent::record(self.name, Event::Delay(Duration::from_micros(us as u64)));
    }

    fn delay_ms(&mut self, ms: u32) {
        concurrent::record(self.name, Event::Delay(Duration::from_millis(ms as u64)));
    }
}
