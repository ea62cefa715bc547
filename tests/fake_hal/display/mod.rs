use climate_logger::lcd1602::TextDisplay;

#[derive(Debug, PartialEq)]
pub enum Error {
    Unplugged,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenEvent {
    Clear,
    Write(u8, u8, String),
}

/// A display that remembers everything written to it.
#[derive(Debug, Default)]
pub struct Screen {
    events: Vec<ScreenEvent>,
    fail: bool,
}

impl Screen {
    pub fn new() -> Screen {
        Screen::default()
    }

    pub fn set_fail(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn events(&self) -> &[ScreenEvent] {
        &self.events
    }

    /// Everything since the last clear.
    pub fn shown(&self) -> &[ScreenEvent] {
        match self.events.iter().rposition(|e| *e == ScreenEvent::Clear) {
            Some(index) => &self.events[index + 1..],
            None => &self.events,
        }
    }
}

impl TextDisplay for Screen {
    type Error = Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(Error::Unplugged);
        }
        self.events.push(ScreenEvent::Clear);
        Ok(())
    }

    fn write_at(&mut self, column: u8, row: u8, text: &str) -> Result<(), Self::Error> {
        if self.fail {
            return Err(Error::Unplugged);
        }
        self.events
            .push(ScreenEvent::Write(column, row, text.to_owned()));
        Ok(())
    }
}
