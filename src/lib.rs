#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

/// Polling loop that ties the sensor to the display and the database.
pub mod collector;
/// Bit-banged reads of the DHT11 single-wire humidity and temperature sensor.
pub mod dht11;
/// Driver for 16x2 HD44780 character displays behind a PCF8574 I2C backpack.
///
/// Refer to [this datasheet](https://www.sparkfun.com/datasheets/LCD/HD44780.pdf) for the
/// command set.
pub mod lcd1602;
/// Statistics over the stored readings of one or more days.
pub mod report;
/// Per-day tables of readings in a relational database.
pub mod storage;
