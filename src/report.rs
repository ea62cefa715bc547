use alloc::format;
use alloc::string::String;

use crate::storage::{DayLog, Error, Row, Store};

/// Mean temperature and humidity of a day.
#[derive(Clone, Debug, PartialEq)]
pub struct Average {
    pub temperature: f32,
    pub humidity: f32,
}

/// An extreme value and the time it was recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct Extreme {
    pub value: f32,
    pub time: String,
}

/// The extreme temperature and humidity of a day. The two need not come from the same row.
#[derive(Clone, Debug, PartialEq)]
pub struct Extremes {
    pub temperature: Extreme,
    pub humidity: Extreme,
}

/// The most extreme temperature across all stored days.
#[derive(Clone, Debug, PartialEq)]
pub struct DayExtreme {
    pub day: String,
    pub time: String,
    pub temperature: f32,
}

pub fn average(rows: &[Row]) -> Option<Average> {
    if rows.is_empty() {
        return None;
    }
    let (temperature, humidity) = rows.iter().fold((0f64, 0f64), |(t, h), row| {
        (t + row.temperature as f64, h + row.humidity as f64)
    });
    let count = rows.len() as f64;
    Some(Average {
        temperature: (temperature / count) as f32,
        humidity: (humidity / count) as f32,
    })
}

/// The coldest temperature and the lowest humidity. Ties go to the earliest row.
pub fn minimum(rows: &[Row]) -> Option<Extremes> {
    extremes(rows, lower)
}

/// The hottest temperature and the highest humidity. Ties go to the earliest row.
pub fn maximum(rows: &[Row]) -> Option<Extremes> {
    extremes(rows, higher)
}

fn lower(candidate: f32, best: f32) -> bool {
    candidate < best
}

fn higher(candidate: f32, best: f32) -> bool {
    candidate > best
}

fn extremes(rows: &[Row], beats: fn(f32, f32) -> bool) -> Option<Extremes> {
    let first = rows.first()?;
    let mut temperature = first;
    let mut humidity = first;
    for row in rows.iter().skip(1) {
        if beats(row.temperature, temperature.temperature) {
            temperature = row;
        }
        if beats(row.humidity, humidity.humidity) {
            humidity = row;
        }
    }
    Some(Extremes {
        temperature: Extreme {
            value: temperature.temperature,
            time: temperature.time.clone(),
        },
        humidity: Extreme {
            value: humidity.humidity,
            time: humidity.time.clone(),
        },
    })
}

/// The hottest moment across every stored day. Ties go to the day listed first.
pub fn hottest<TStore, TStoreError>(
    log: &mut DayLog<TStore>,
) -> Result<Option<DayExtreme>, Error<TStoreError>>
where
    TStore: Store<Error = TStoreError>,
{
    day_extreme(log, higher)
}

/// The coldest moment across every stored day. Ties go to the day listed first.
pub fn coldest<TStore, TStoreError>(
    log: &mut DayLog<TStore>,
) -> Result<Option<DayExtreme>, Error<TStoreError>>
where
    TStore: Store<Error = TStoreError>,
{
    day_extreme(log, lower)
}

fn day_extreme<TStore, TStoreError>(
    log: &mut DayLog<TStore>,
    beats: fn(f32, f32) -> bool,
) -> Result<Option<DayExtreme>, Error<TStoreError>>
where
    TStore: Store<Error = TStoreError>,
{
    let mut best: Option<DayExtreme> = None;
    for day in log.list_days()? {
        let rows = log.rows(&day)?;
        let extreme = match extremes(&rows, beats) {
            Some(extremes) => extremes.temperature,
            None => continue,
        };
        let is_better = match &best {
            Some(current) => beats(extreme.value, current.temperature),
            None => true,
        };
        if is_better {
            best = Some(DayExtreme {
                day,
                time: extreme.time,
                temperature: extreme.value,
            });
        }
    }
    Ok(best)
}

/// `T: 23.5C`
pub fn temperature_line(temperature: f32) -> String {
    format!("T: {:.1}C", temperature)
}

/// `H: 45.0%`
pub fn humidity_line(humidity: f32) -> String {
    format!("H: {:.1}%", humidity)
}

/// The two display lines for a day's average.
pub fn average_lines(average: &Average) -> [String; 2] {
    [
        temperature_line(average.temperature),
        humidity_line(average.humidity),
    ]
}

/// The two display lines for a day's extremes, e.g. `T: 23.5C (12:30)`.
pub fn extremes_lines(extremes: &Extremes) -> [String; 2] {
    [
        format!(
            "{} ({})",
            temperature_line(extremes.temperature.value),
            extremes.temperature.time
        ),
        format!(
            "{} ({})",
            humidity_line(extremes.humidity.value),
            extremes.humidity.time
        ),
    ]
}

/// `23.5C (12:30)`
pub fn day_extreme_line(extreme: &DayExtreme) -> String {
    format!("{:.1}C ({})", extreme.temperature, extreme.time)
}
