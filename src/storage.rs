use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::dht11::Reading;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error<TStoreError> {
    /// Wrapped error from the database client.
    #[error("store error: {0:?}")]
    Wrapped(TStoreError),
    /// The table name could be used to inject SQL.
    #[error("invalid table name")]
    InvalidTableName,
    /// A stored row does not have the time, temperature, humidity layout.
    #[error("bad row")]
    BadRow,
}

impl<TStoreError> From<TStoreError> for Error<TStoreError> {
    fn from(error: TStoreError) -> Error<TStoreError> {
        Error::Wrapped(error)
    }
}

/// Lists every table in the database, one per row.
pub const SHOW_TABLES: &str = "show tables";

const MAX_TABLE_NAME_LEN: usize = 64;

/// The calendar fields of a local timestamp.
pub trait CalendarTime {
    fn year(&self) -> u16;
    /// 1-12.
    fn month(&self) -> u8;
    /// 1-31.
    fn day(&self) -> u8;
    fn hour(&self) -> u8;
    fn minute(&self) -> u8;
}

/// The table holding the given day's readings.
///
/// The format is `day`, the two-digit month, then the day of the month and the year within the
/// century without padding. 7 March 2024 is `day03724`.
pub fn day_table_name<T: CalendarTime>(time: &T) -> String {
    format!("day{:02}{}{}", time.month(), time.day(), time.year() % 100)
}

/// `HH:MM`.
pub fn time_of_day<T: CalendarTime>(time: &T) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// One stored reading.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub time: String,
    pub temperature: f32,
    pub humidity: f32,
}

impl Row {
    pub fn from_reading<TTime: CalendarTime>(reading: &Reading<TTime>) -> Row {
        Row {
            time: time_of_day(reading.captured_at()),
            temperature: reading.temperature_c(),
            humidity: reading.humidity_pct(),
        }
    }

    fn parse(columns: &[String]) -> Option<Row> {
        match columns {
            [time, temperature, humidity, ..] => Some(Row {
                time: time.clone(),
                temperature: temperature.trim().parse().ok()?,
                humidity: humidity.trim().parse().ok()?,
            }),
            _ => None,
        }
    }
}

/// Accepts names that are safe to splice into a statement unquoted.
pub fn validate_table_name<TStoreError>(table: &str) -> Result<(), Error<TStoreError>> {
    let mut chars = table.chars();
    let starts_well = match chars.next() {
        Some(first) => first.is_ascii_alphabetic() || first == '_',
        None => false,
    };
    if !starts_well
        || table.len() > MAX_TABLE_NAME_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::InvalidTableName);
    }
    Ok(())
}

pub fn create_day_table_sql<TStoreError>(table: &str) -> Result<String, Error<TStoreError>> {
    validate_table_name(table)?;
    Ok(format!(
        "create table if not exists {} (time varchar(50), temperature float, humidity float)",
        table
    ))
}

pub fn insert_sql<TStoreError>(table: &str, row: &Row) -> Result<String, Error<TStoreError>> {
    validate_table_name(table)?;
    if row.time.contains('\'') {
        return Err(Error::BadRow);
    }
    Ok(format!(
        "insert into {} values ('{}', {:.1}, {:.1})",
        table, row.time, row.temperature, row.humidity
    ))
}

pub fn select_day_sql<TStoreError>(table: &str) -> Result<String, Error<TStoreError>> {
    validate_table_name(table)?;
    Ok(format!("select * from {}", table))
}

/// A connection to a relational database.
///
/// Implementations own the connection and its credentials.
pub trait Store {
    type Error;

    /// Runs a statement that returns no rows.
    fn execute(&mut self, statement: &str) -> Result<(), Self::Error>;

    /// Runs a query and fetches every row of the result, each as its text columns.
    fn query(&mut self, statement: &str) -> Result<Vec<Vec<String>>, Self::Error>;
}

/// Readings stored as one table per day.
#[derive(Debug)]
pub struct DayLog<TStore> {
    store: TStore,
}

impl<TStore, TStoreError> DayLog<TStore>
where
    TStore: Store<Error = TStoreError>,
{
    pub fn new(store: TStore) -> DayLog<TStore> {
        DayLog { store }
    }

    /// The names of every day table, in the order the database lists them.
    pub fn list_days(&mut self) -> Result<Vec<String>, Error<TStoreError>> {
        let rows = self.store.query(SHOW_TABLES).map_err(Error::Wrapped)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// Creates the table for a day if it does not exist yet.
    pub fn ensure_day(&mut self, table: &str) -> Result<(), Error<TStoreError>> {
        let statement = create_day_table_sql(table)?;
        self.store.execute(&statement).map_err(Error::Wrapped)
    }

    pub fn append(&mut self, table: &str, row: &Row) -> Result<(), Error<TStoreError>> {
        let statement = insert_sql(table, row)?;
        self.store.execute(&statement).map_err(Error::Wrapped)
    }

    /// Every row stored for a day.
    pub fn rows(&mut self, table: &str) -> Result<Vec<Row>, Error<TStoreError>> {
        let statement = select_day_sql(table)?;
        let rows = self.store.query(&statement).map_err(Error::Wrapped)?;
        rows.iter()
            .map(|columns| Row::parse(columns).ok_or(Error::BadRow))
            .collect()
    }

    pub fn store(&self) -> &TStore {
        &self.store
    }

    pub fn into_inner(self) -> TStore {
        self.store
    }
}
