use climate_logger::storage::CalendarTime;
use std::cell::Cell;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::time::Duration;

const MINUTES_PER_DAY: u64 = 24 * 60;
const START_MINUTE: u64 = 8 * 60;

/// A moment on the fake clock. Time zero is 08:00 on 7 March 2024.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FakeTime {
    pub at: Duration,
}

impl FakeTime {
    fn minutes(&self) -> u64 {
        START_MINUTE + self.at.as_secs() / 60
    }
}

impl CalendarTime for FakeTime {
    fn year(&self) -> u16 {
        2024
    }

    fn month(&self) -> u8 {
        3
    }

    fn day(&self) -> u8 {
        (7 + self.minutes() / MINUTES_PER_DAY) as u8
    }

    fn hour(&self) -> u8 {
        (self.minutes() % MINUTES_PER_DAY / 60) as u8
    }

    fn minute(&self) -> u8 {
        (self.minutes() % 60) as u8
    }
}

/// A clock that only moves when something waits on it.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    now: Rc<Cell<Duration>>,
}

impl FakeClock {
    pub fn new() -> FakeClock {
        FakeClock::default()
    }

    pub fn now(&self) -> FakeTime {
        FakeTime {
            at: self.now.get(),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn time_fn(&self) -> impl Fn() -> FakeTime {
        let clock = self.clone();
        move || clock.now()
    }

    pub fn elapsed_since_fn(&self) -> impl Fn(FakeTime) -> Duration {
        let clock = self.clone();
        move |then: FakeTime| clock.now().at - then.at
    }

    /// An async delay that moves the clock forward instead of sleeping.
    pub fn delay_fn(&self) -> impl Fn(Duration) -> Ready<()> {
        let clock = self.clone();
        move |duration| {
            clock.advance(duration);
            ready(())
        }
    }
}
