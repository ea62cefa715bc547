#![allow(dead_code)]

pub mod clock;
pub mod concurrent;
pub mod delay;
pub mod display;
pub mod i2c;
pub mod store;
