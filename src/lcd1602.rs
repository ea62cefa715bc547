use alloc::string::String;
use alloc::vec::Vec;
use core::iter;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// The usual address of a PCF8574 backpack with no address jumpers set.
pub const DEFAULT_ADDRESS: u8 = 0x27;
/// Characters per row.
pub const COLUMNS: u8 = 16;
/// Rows on the display.
pub const ROWS: u8 = 2;
/// Delay between frames when scrolling text.
pub const DEFAULT_SCROLL_STEP_MS: u32 = 230;

const CLEAR_DISPLAY: u8 = 0x01;
const SET_DDRAM_ADDRESS: u8 = 0x80;
const ROW_OFFSET: u8 = 0x40;
// Reset twice in 8-bit mode and drop to 4-bit, then 2 lines of 5x8 font, then display on with
// no cursor.
const INIT_SEQUENCE: [u8; 4] = [0x33, 0x32, 0x28, 0x0C];

// PCF8574 bits wired to the HD44780 control lines.
const REGISTER_SELECT: u8 = 0x01;
const ENABLE: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const ENABLE_PULSE_MS: u32 = 2;
const INIT_STEP_MS: u32 = 5;

/// Something that can show short lines of text on a character grid.
pub trait TextDisplay {
    type Error;

    /// Blanks the whole display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Writes `text` starting at the given column and row.
    fn write_at(&mut self, column: u8, row: u8, text: &str) -> Result<(), Self::Error>;
}

/// A 16x2 HD44780 display driven in 4-bit mode through a PCF8574 I2C expander.
#[derive(Debug)]
pub struct Lcd<TI2c, TDelay> {
    i2c: TI2c,
    delay: TDelay,
    address: u8,
    backlight: bool,
}

impl<TI2c, TDelay> Lcd<TI2c, TDelay>
where
    TI2c: I2c,
    TDelay: DelayNs,
{
    /// Constructs and initializes the display at `address`, with the backlight on.
    pub fn new(i2c: TI2c, delay: TDelay, address: u8) -> Result<Lcd<TI2c, TDelay>, TI2c::Error> {
        let mut lcd = Lcd {
            i2c,
            delay,
            address,
            backlight: true,
        };
        lcd.init()?;
        log::debug!("lcd1602: initialized at {:#04x}", address);
        Ok(lcd)
    }

    fn init(&mut self) -> Result<(), TI2c::Error> {
        for command in INIT_SEQUENCE.iter() {
            self.send_command(*command)?;
            self.delay.delay_ms(INIT_STEP_MS);
        }
        self.send_command(CLEAR_DISPLAY)?;
        self.write_word(0x00)
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), TI2c::Error> {
        self.backlight = on;
        self.write_word(0x00)
    }

    pub fn send_command(&mut self, command: u8) -> Result<(), TI2c::Error> {
        self.send(command, 0)
    }

    fn send_data(&mut self, data: u8) -> Result<(), TI2c::Error> {
        self.send(data, REGISTER_SELECT)
    }

    /// Sends a byte as two nibbles, high first, each latched by pulsing the enable line.
    fn send(&mut self, value: u8, mode: u8) -> Result<(), TI2c::Error> {
        for nibble in [value & 0xF0, (value & 0x0F) << 4] {
            let word = nibble | ENABLE | mode;
            self.write_word(word)?;
            self.delay.delay_ms(ENABLE_PULSE_MS);
            self.write_word(word & !ENABLE)?;
        }
        Ok(())
    }

    fn write_word(&mut self, word: u8) -> Result<(), TI2c::Error> {
        let word = if self.backlight {
            word | BACKLIGHT
        } else {
            word & !BACKLIGHT
        };
        self.i2c.write(self.address, &[word])
    }

    /// Gives back the bus and delay.
    pub fn release(self) -> (TI2c, TDelay) {
        (self.i2c, self.delay)
    }
}

impl<TI2c, TDelay> TextDisplay for Lcd<TI2c, TDelay>
where
    TI2c: I2c,
    TDelay: DelayNs,
{
    type Error = TI2c::Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.send_command(CLEAR_DISPLAY)
    }

    /// Out of range positions are clamped to the nearest cell. Characters outside ASCII are shown
    /// as `?`.
    fn write_at(&mut self, column: u8, row: u8, text: &str) -> Result<(), Self::Error> {
        let column = column.min(COLUMNS - 1);
        let row = row.min(ROWS - 1);
        self.send_command(SET_DDRAM_ADDRESS + ROW_OFFSET * row + column)?;
        for c in text.chars() {
            self.send_data(if c.is_ascii() { c as u8 } else { b'?' })?;
        }
        Ok(())
    }
}

/// Splits `message` into the display-wide frames of a right-to-left scroll.
///
/// The message enters from the right edge of an empty row and leaves on the left, one character
/// per frame.
pub fn scroll_frames(message: &str) -> Vec<String> {
    let width = COLUMNS as usize;
    let padded: Vec<char> = iter::repeat(' ')
        .take(width)
        .chain(message.chars())
        .chain(iter::repeat(' ').take(width))
        .collect();
    padded
        .windows(width)
        .map(|frame| frame.iter().collect())
        .collect()
}

/// Scrolls `message` across the top row, waiting `step_ms` between frames.
pub fn scroll_text<TDisplay, TDelay>(
    display: &mut TDisplay,
    delay: &mut TDelay,
    message: &str,
    step_ms: u32,
) -> Result<(), TDisplay::Error>
where
    TDisplay: TextDisplay,
    TDelay: DelayNs,
{
    for frame in scroll_frames(message) {
        display.clear()?;
        display.write_at(0, 0, &frame)?;
        delay.delay_ms(step_ms);
    }
    Ok(())
}
