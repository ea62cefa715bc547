use core::fmt;
use core::time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    #[error("IO error: {0:?}")]
    Wrapped(TIoError),
    /// Invalid argument was provided.
    #[error("invalid argument")]
    InvalidArgument,
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

/// A single GPIO line that can be switched between driving and listening.
///
/// embedded-hal has no trait for reconfigurable pins, so platforms implement this one on top of
/// their own pin type. The line is expected to have a pull-up so that it reads high while
/// released.
pub trait IoPin: InputPin + OutputPin {
    /// Stops driving the line and switches it to input mode.
    fn set_input(&mut self) -> Result<(), <Self as ErrorType>::Error>;

    /// Switches the line to output mode, driving it at `state`.
    fn set_output(&mut self, state: PinState) -> Result<(), <Self as ErrorType>::Error>;
}

/// How long the host holds the line low to wake the sensor.
///
/// This is a lower bound from the sensor's power-up response time. Shorter pulses are the most
/// common cause of [`DecodeOutcome::Timeout`].
pub const START_LOW_DURATION_MS: u32 = 18;
/// How long the host drives the line high after the wake pulse, before listening.
pub const START_RELEASE_DURATION_US: u32 = 40;

/// The maximum number of level transitions sampled for one frame.
pub const MAX_TRANSITIONS: usize = 85;
/// The number of 1µs ticks to wait for a single transition before giving up on the line.
pub const MAX_TICKS: u8 = 255;
/// Leading transitions that belong to the sensor's acknowledgement rather than to the data.
pub const ACK_WINDOWS: usize = 4;
/// The number of data bits in one frame.
pub const FRAME_BITS: usize = 40;

/// Ticks a data bit must be held high for to read as a 1.
///
/// Tuned on a Raspberry Pi, where every tick includes the cost of a GPIO read as well as the 1µs
/// delay. Other hosts need to recalibrate this through [`Options::bit_threshold`].
pub const DEFAULT_BIT_THRESHOLD: u8 = 14;

/// The minimum time that must pass between two reads of the DHT11.
///
/// Note that this can vary a bit by device, so check your device's datasheet to be sure. Try
/// doubling this value if you are encountering problems.
pub const MIN_READ_INTERVAL: Duration = Duration::from_millis(1000);

/// Options to modify the behavior of the frame reader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// A data bit is a 1 if its high phase lasted strictly more ticks than this, and a 0
    /// otherwise. Must be below [`MAX_TICKS`].
    pub bit_threshold: u8,
}

pub const DEFAULT_OPTIONS: Options = Options {
    bit_threshold: DEFAULT_BIT_THRESHOLD,
};

/// The five bytes of one DHT11 frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub humidity_int: u8,
    pub humidity_frac: u8,
    pub temp_int: u8,
    pub temp_frac: u8,
    pub checksum: u8,
}

impl RawFrame {
    pub fn from_bytes(bytes: [u8; 5]) -> RawFrame {
        RawFrame {
            humidity_int: bytes[0],
            humidity_frac: bytes[1],
            temp_int: bytes[2],
            temp_frac: bytes[3],
            checksum: bytes[4],
        }
    }

    /// The low byte of the sum of the four data bytes.
    pub fn expected_checksum(&self) -> u8 {
        self.humidity_int
            .wrapping_add(self.humidity_frac)
            .wrapping_add(self.temp_int)
            .wrapping_add(self.temp_frac)
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.checksum == self.expected_checksum()
    }

    // The sensor occasionally sends a well-formed frame of zeros.
    fn is_implausible(&self) -> bool {
        self.humidity_int == 0 && self.temp_int == 0
    }
}

/// A validated reading from the DHT11.
///
/// Only [`decode`] creates these, and only from frames that passed the checksum and the
/// all-zero filter.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading<TTime> {
    temperature_c: f32,
    humidity_pct: f32,
    captured_at: TTime,
    frame: RawFrame,
}

impl<TTime> Reading<TTime> {
    fn from_frame(frame: RawFrame, captured_at: TTime) -> Reading<TTime> {
        Reading {
            temperature_c: frame.temp_int as f32 + frame.temp_frac as f32 / 10.0,
            humidity_pct: frame.humidity_int as f32 + frame.humidity_frac as f32 / 10.0,
            captured_at,
            frame,
        }
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn humidity_pct(&self) -> f32 {
        self.humidity_pct
    }

    pub fn captured_at(&self) -> &TTime {
        &self.captured_at
    }

    /// The frame this reading was decoded from.
    pub fn frame(&self) -> RawFrame {
        self.frame
    }
}

impl<TTime> fmt::Display for Reading<TTime> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RH: {:.1}%, T: {:.1}\u{00B0}C",
            self.humidity_pct, self.temperature_c
        )
    }
}

/// The result of one acquisition attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome<TTime> {
    /// A full, valid frame was read.
    Success(Reading<TTime>),
    /// No window was recorded: the line stayed at the released high level after the start
    /// sequence. A line stuck low records one window and reads as [`Self::InsufficientBits`].
    Timeout,
    /// The line stopped changing level before all 40 data bits were seen.
    InsufficientBits,
    /// All 40 bits were read, but the checksum byte does not match the data.
    ChecksumMismatch,
    /// The checksum matched, but both integer parts were zero. Not a real measurement.
    Implausible,
}

impl<TTime> DecodeOutcome<TTime> {
    pub fn is_success(&self) -> bool {
        matches!(self, DecodeOutcome::Success(_))
    }

    pub fn reading(&self) -> Option<&Reading<TTime>> {
        match self {
            DecodeOutcome::Success(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Tick counts for each level the line held during one acquisition, in order.
///
/// Window 0 is the remainder of the host's release, windows 1-3 are the sensor's
/// acknowledgement and the first separator, and from window 4 on the even windows are the high
/// phases that carry data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeTrace {
    windows: [u8; MAX_TRANSITIONS],
    len: usize,
    stalled: bool,
}

impl EdgeTrace {
    fn new() -> EdgeTrace {
        EdgeTrace {
            windows: [0u8; MAX_TRANSITIONS],
            len: 0,
            stalled: false,
        }
    }

    /// Builds a trace from already measured tick counts, e.g. to replay a recorded read.
    ///
    /// Anything past [`MAX_TRANSITIONS`] is dropped. A trace shorter than that is marked as
    /// stalled.
    pub fn from_windows(ticks: &[u8]) -> EdgeTrace {
        let mut trace = EdgeTrace::new();
        for count in ticks.iter().take(MAX_TRANSITIONS) {
            trace.push(*count);
        }
        trace.stalled = trace.len < MAX_TRANSITIONS;
        trace
    }

    fn push(&mut self, ticks: u8) {
        self.windows[self.len] = ticks;
        self.len += 1;
    }

    fn is_full(&self) -> bool {
        self.len == MAX_TRANSITIONS
    }

    pub fn windows(&self) -> &[u8] {
        &self.windows[..self.len]
    }

    /// Whether sampling ended because the line stopped changing level.
    pub fn stalled(&self) -> bool {
        self.stalled
    }
}

/// Samples the line after the start sequence, recording how long it holds each level.
///
/// Each tick is one read plus a 1µs delay. A level held for [`MAX_TICKS`] ticks ends the
/// capture, so this always returns within roughly `MAX_TRANSITIONS * MAX_TICKS` ticks.
pub fn capture<TPin, TDelay>(pin: &mut TPin, delay: &mut TDelay) -> Result<EdgeTrace, TPin::Error>
where
    TPin: InputPin,
    TDelay: DelayNs,
{
    let mut trace = EdgeTrace::new();
    // The host leaves the line high at the end of the start sequence.
    let mut level = PinState::High;
    while !trace.is_full() {
        match measure_window(pin, delay, level)? {
            Some(ticks) => {
                trace.push(ticks);
                level = !level;
            }
            None => {
                trace.stalled = true;
                break;
            }
        }
    }
    Ok(trace)
}

#[inline]
fn measure_window<TPin, TDelay>(
    pin: &mut TPin,
    delay: &mut TDelay,
    level: PinState,
) -> Result<Option<u8>, TPin::Error>
where
    TPin: InputPin,
    TDelay: DelayNs,
{
    let mut ticks = 0u8;
    while read_level(pin)? == level {
        ticks += 1;
        delay.delay_us(1);
        if ticks == MAX_TICKS {
            return Ok(None);
        }
    }
    Ok(Some(ticks))
}

#[inline]
fn read_level<TPin>(pin: &mut TPin) -> Result<PinState, TPin::Error>
where
    TPin: InputPin,
{
    Ok(PinState::from(pin.is_high()?))
}

/// Turns a captured trace into an outcome. `now` is called only if the frame is valid.
///
/// This does no I/O, so decoding the same trace always gives the same outcome.
pub fn decode<TTime, NowFn>(trace: &EdgeTrace, bit_threshold: u8, now: NowFn) -> DecodeOutcome<TTime>
where
    NowFn: FnOnce() -> TTime,
{
    if trace.windows().is_empty() {
        return DecodeOutcome::Timeout;
    }

    let mut bytes = [0u8; 5];
    let mut bits = 0usize;
    let data_windows = trace
        .windows()
        .iter()
        .skip(ACK_WINDOWS)
        .step_by(2)
        .take(FRAME_BITS);
    for ticks in data_windows {
        let byte = &mut bytes[bits / 8];
        *byte <<= 1;
        if *ticks > bit_threshold {
            *byte |= 1;
        }
        bits += 1;
    }
    if bits < FRAME_BITS {
        return DecodeOutcome::InsufficientBits;
    }

    let frame = RawFrame::from_bytes(bytes);
    if !frame.is_checksum_valid() {
        return DecodeOutcome::ChecksumMismatch;
    }
    if frame.is_implausible() {
        return DecodeOutcome::Implausible;
    }
    DecodeOutcome::Success(Reading::from_frame(frame, now()))
}

/// Reads frames from a DHT11 on a single GPIO line.
///
/// The reader never retries and never waits out the sensor's minimum read interval itself;
/// callers must space calls to [`acquire`](SensorFrameReader::acquire) at least
/// [`MIN_READ_INTERVAL`] apart.
#[derive(Debug)]
pub struct SensorFrameReader<TPin, TDelay, TimeFn, TTime>
where
    TimeFn: Fn() -> TTime,
{
    pin: TPin,
    delay: TDelay,
    time_fn: TimeFn,
    options: Options,
}

impl<TPin, TError, TDelay, TimeFn, TTime> SensorFrameReader<TPin, TDelay, TimeFn, TTime>
where
    TPin: IoPin<Error = TError>,
    TDelay: DelayNs,
    TimeFn: Fn() -> TTime,
{
    /// Constructs a reader on the given pin, and drives the line high so the sensor is idle.
    ///
    /// The provided `time_fn` stamps each successful reading. If `options` is `None`,
    /// [`DEFAULT_OPTIONS`] is used.
    pub fn new(
        mut pin: TPin,
        delay: TDelay,
        time_fn: TimeFn,
        options: Option<Options>,
    ) -> Result<SensorFrameReader<TPin, TDelay, TimeFn, TTime>, Error<TError>> {
        let options = options.unwrap_or(DEFAULT_OPTIONS);
        if options.bit_threshold >= MAX_TICKS {
            return Err(Error::InvalidArgument);
        }
        pin.set_output(PinState::High).map_err(Error::Wrapped)?;
        Ok(SensorFrameReader {
            pin,
            delay,
            time_fn,
            options,
        })
    }

    /// Wakes the sensor and reads one frame from it.
    ///
    /// This blocks for the whole exchange: 18ms of start signal followed by about 4ms of
    /// sampling, and never more than [`MAX_TRANSITIONS`] * [`MAX_TICKS`] ticks of sampling.
    /// Interrupts or preemption during sampling will corrupt the frame.
    ///
    /// Errors are only returned for failures of the pin itself. Every protocol failure is a
    /// [`DecodeOutcome`].
    pub fn acquire(&mut self) -> Result<DecodeOutcome<TTime>, Error<TError>> {
        self.send_start_signal()?;
        let trace = capture(&mut self.pin, &mut self.delay);
        // Hand the line back to idle even if sampling failed.
        self.pin
            .set_output(PinState::High)
            .map_err(Error::Wrapped)?;
        let trace = trace.map_err(Error::Wrapped)?;
        Ok(decode(&trace, self.options.bit_threshold, &self.time_fn))
    }

    fn send_start_signal(&mut self) -> Result<(), Error<TError>> {
        self.pin
            .set_output(PinState::Low)
            .map_err(Error::Wrapped)?;
        self.delay.delay_ms(START_LOW_DURATION_MS);
        self.pin.set_high().map_err(Error::Wrapped)?;
        self.delay.delay_us(START_RELEASE_DURATION_US);
        self.pin.set_input().map_err(Error::Wrapped)?;
        Ok(())
    }

    /// The current time according to this reader's clock.
    pub fn now(&self) -> TTime {
        (self.time_fn)()
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub(crate) fn delay_mut(&mut self) -> &mut TDelay {
        &mut self.delay
    }

    /// Gives back the pin and delay.
    pub fn release(self) -> (TPin, TDelay) {
        (self.pin, self.delay)
    }
}
