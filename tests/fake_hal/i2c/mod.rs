use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

#[derive(Debug, PartialEq)]
pub struct BusError();

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// An I2C bus that records every written byte and reads zeros.
#[derive(Debug, Default)]
pub struct Bus {
    writes: Vec<(u8, Vec<u8>)>,
    fail: bool,
}

impl Bus {
    pub fn new() -> Bus {
        Bus::default()
    }

    pub fn failing() -> Bus {
        Bus {
            writes: Vec::new(),
            fail: true,
        }
    }

    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Every written byte in order, regardless of address.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes
            .iter()
            .flat_map(|(_, bytes)| bytes.iter().copied())
            .collect()
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl ErrorType for Bus {
    type Error = BusError;
}

impl I2c for Bus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(BusError());
        }
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}
