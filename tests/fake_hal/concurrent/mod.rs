use embedded_hal::digital::PinState;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Something a fake did to the line, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Output(PinState),
    Input,
    Delay(Duration),
}

lazy_static! {
    static ref EVENT_LOGS: Mutex<HashMap<&'static str, Vec<Event>>> = Mutex::new(HashMap::new());
}

pub fn reset(name: &'static str) {
    let mut map = EVENT_LOGS.lock().unwrap();
    map.insert(name, Vec::new());
}

pub fn record(name: &'static str, event: Event) {
    let mut map = EVENT_LOGS.lock().unwrap();
    map.entry(name).or_insert_with(Vec::new).push(event);
}

pub fn events(name: &str) -> Vec<Event> {
    let map = EVENT_LOGS.lock().unwrap();
    map.get(name).cloned().unwrap_or_default()
}

pub fn total_delay(name: &str) -> Duration {
    events(name)
        .iter()
        .filter_map(|event| match event {
            Event::Delay(duration) => Some(*duration),
            _ => None,
        })
        .sum()
}
