use alloc::format;
use alloc::string::String;
use core::time::Duration;
use embedded_hal::delay::DelayNs;

use crate::dht11::{self, DecodeOutcome, IoPin, Reading, SensorFrameReader, MIN_READ_INTERVAL};
use crate::lcd1602::{self, TextDisplay};
use crate::storage::{self, CalendarTime, DayLog, Row, Store};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error<TIoError, TDisplayError, TStoreError> {
    /// The sensor's pin failed.
    #[error("sensor: {0:?}")]
    Sensor(dht11::Error<TIoError>),
    /// The display failed.
    #[error("display: {0:?}")]
    Screen(TDisplayError),
    /// The database failed. Nothing was stored for this reading.
    #[error("storage: {0:?}")]
    Storage(storage::Error<TStoreError>),
    /// Invalid argument was provided.
    #[error("invalid argument")]
    InvalidArgument,
}

/// Options to modify the behavior of the collector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// The time between two collected readings. Cannot be below [`MIN_READ_INTERVAL`].
    pub min_read_interval: Duration,
    /// The maximum number of read attempts for any call to [`Collector::collect`].
    ///
    /// Retries wait only [`MIN_READ_INTERVAL`] after the failed attempt.
    pub max_attempts: u8,
}

pub const DEFAULT_OPTIONS: Options = Options {
    min_read_interval: Duration::from_secs(30),
    max_attempts: 1,
};

const STARTUP_MESSAGE: &str = "Now collecting data:";
const INVALID_DATA_MESSAGE: &str = "Invalid Data!";
const STORAGE_ERROR_MESSAGE: &str = "Storage error";
const VALUE_COLUMN: u8 = 5;

/// Reads the sensor at a fixed interval, stores good readings, and reports each result on the
/// display.
#[derive(Debug)]
pub struct Collector<TPin, TDelay, TimeFn, ElapsedFn, TTime, TDisplay, TStore>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    reader: SensorFrameReader<TPin, TDelay, TimeFn, TTime>,
    display: TDisplay,
    log: DayLog<TStore>,
    elapsed_since_fn: ElapsedFn,
    last_attempt: Option<TTime>,
    current_day: Option<String>,
    options: Options,
}

impl<TPin, TIoError, TDelay, TimeFn, ElapsedFn, TTime, TDisplay, TDisplayError, TStore, TStoreError>
    Collector<TPin, TDelay, TimeFn, ElapsedFn, TTime, TDisplay, TStore>
where
    TPin: IoPin<Error = TIoError>,
    TDelay: DelayNs,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy + CalendarTime,
    TDisplay: TextDisplay<Error = TDisplayError>,
    TStore: Store<Error = TStoreError>,
{
    /// Constructs a collector. If `options` is `None`, [`DEFAULT_OPTIONS`] is used.
    ///
    /// The provided `elapsed_since_fn` must tell how much time has passed since an instant given
    /// by the reader's clock, with millisecond precision or better.
    pub fn new(
        reader: SensorFrameReader<TPin, TDelay, TimeFn, TTime>,
        display: TDisplay,
        store: TStore,
        elapsed_since_fn: ElapsedFn,
        options: Option<Options>,
    ) -> Result<
        Collector<TPin, TDelay, TimeFn, ElapsedFn, TTime, TDisplay, TStore>,
        Error<TIoError, TDisplayError, TStoreError>,
    > {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if options.min_read_interval < MIN_READ_INTERVAL || options.max_attempts < 1 {
            return Err(Error::InvalidArgument);
        }
        Ok(Collector {
            reader,
            display,
            log: DayLog::new(store),
            elapsed_since_fn,
            last_attempt: None,
            current_day: None,
            options,
        })
    }

    /// Announces the start of collection and makes sure today's table exists.
    pub fn start(&mut self) -> Result<(), Error<TIoError, TDisplayError, TStoreError>> {
        let days = self.log.list_days().map_err(Error::Storage)?;
        log::info!("collector: {} day tables in the database", days.len());
        lcd1602::scroll_text(
            &mut self.display,
            self.reader.delay_mut(),
            STARTUP_MESSAGE,
            lcd1602::DEFAULT_SCROLL_STEP_MS,
        )
        .map_err(Error::Screen)?;
        let today = storage::day_table_name(&self.reader.now());
        self.open_day(today)?;
        Ok(())
    }

    /// Reads the sensor once, retrying bad frames up to [`Options::max_attempts`] times.
    ///
    /// This will asynchronously sleep using the provided `delay_fn` until the minimum read
    /// interval has passed since the previous attempt. A successful reading is stored in its
    /// day's table and shown on the display; any other outcome only shows an error message.
    pub async fn collect<DelayFn, EmptyFuture>(
        &mut self,
        delay_fn: DelayFn,
    ) -> Result<DecodeOutcome<TTime>, Error<TIoError, TDisplayError, TStoreError>>
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        let mut outcome = DecodeOutcome::Timeout;
        for attempt in 0..self.options.max_attempts {
            let interval = if attempt == 0 {
                self.options.min_read_interval
            } else {
                MIN_READ_INTERVAL
            };
            self.wait_for(interval, &delay_fn).await;

            let result = self.reader.acquire();
            self.last_attempt = Some(self.reader.now());
            outcome = result.map_err(Error::Sensor)?;
            log::debug!(
                "collector: attempt {} of {}: {}",
                attempt + 1,
                self.options.max_attempts,
                describe(&outcome)
            );
            if !should_retry(&outcome) {
                break;
            }
        }

        match outcome.reading() {
            Some(reading) => {
                log::info!("collector: {}", reading);
                self.record(reading)?;
                self.show_reading(reading)?;
            }
            None => {
                log::warn!("collector: no reading ({})", describe(&outcome));
                self.show_message(INVALID_DATA_MESSAGE)?;
            }
        }
        Ok(outcome)
    }

    async fn wait_for<DelayFn, EmptyFuture>(&self, interval: Duration, delay_fn: &DelayFn)
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        if let Some(last_attempt) = self.last_attempt {
            let elapsed = (self.elapsed_since_fn)(last_attempt);
            if elapsed < interval {
                delay_fn(interval - elapsed).await;
            }
        }
    }

    fn record(
        &mut self,
        reading: &Reading<TTime>,
    ) -> Result<(), Error<TIoError, TDisplayError, TStoreError>> {
        let day = storage::day_table_name(reading.captured_at());
        let row = Row::from_reading(reading);
        let result = self
            .open_day(day)
            .and_then(|table| self.log.append(&table, &row).map_err(Error::Storage));
        if let Err(err) = result {
            log::error!("collector: failed to store reading at {}", row.time);
            // The storage failure is the one reported to the caller.
            if self.show_message(STORAGE_ERROR_MESSAGE).is_err() {
                log::warn!("collector: could not show the storage error");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Creates the table for `day` the first time it is seen, and returns its name.
    fn open_day(
        &mut self,
        day: String,
    ) -> Result<String, Error<TIoError, TDisplayError, TStoreError>> {
        if self.current_day.as_deref() != Some(day.as_str()) {
            self.log.ensure_day(&day).map_err(Error::Storage)?;
            log::info!("collector: writing to {}", day);
            self.current_day = Some(day.clone());
        }
        Ok(day)
    }

    fn show_reading(
        &mut self,
        reading: &Reading<TTime>,
    ) -> Result<(), Error<TIoError, TDisplayError, TStoreError>> {
        let temperature = format!("{:.1}", reading.temperature_c());
        let humidity = format!("{:.1}", reading.humidity_pct());
        self.display.clear().map_err(Error::Screen)?;
        self.display
            .write_at(0, 0, "Temp: ")
            .map_err(Error::Screen)?;
        self.display
            .write_at(VALUE_COLUMN, 0, &temperature)
            .map_err(Error::Screen)?;
        self.display
            .write_at(0, 1, "Humi: ")
            .map_err(Error::Screen)?;
        self.display
            .write_at(VALUE_COLUMN, 1, &humidity)
            .map_err(Error::Screen)
    }

    fn show_message(
        &mut self,
        message: &str,
    ) -> Result<(), Error<TIoError, TDisplayError, TStoreError>> {
        self.display.clear().map_err(Error::Screen)?;
        self.display.write_at(0, 0, message).map_err(Error::Screen)
    }

    pub fn display(&self) -> &TDisplay {
        &self.display
    }

    pub fn log(&self) -> &DayLog<TStore> {
        &self.log
    }

    pub fn options(&self) -> Options {
        self.options
    }
}

// A timeout means nothing answered, so trying again right away will not help.
fn should_retry<TTime>(outcome: &DecodeOutcome<TTime>) -> bool {
    match outcome {
        DecodeOutcome::InsufficientBits
        | DecodeOutcome::ChecksumMismatch
        | DecodeOutcome::Implausible => true,
        DecodeOutcome::Success(_) | DecodeOutcome::Timeout => false,
    }
}

fn describe<TTime>(outcome: &DecodeOutcome<TTime>) -> &'static str {
    match outcome {
        DecodeOutcome::Success(_) => "success",
        DecodeOutcome::Timeout => "timeout",
        DecodeOutcome::InsufficientBits => "insufficient bits",
        DecodeOutcome::ChecksumMismatch => "checksum mismatch",
        DecodeOutcome::Implausible => "implausible frame",
    }
}
