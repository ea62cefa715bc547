use climate_logger::storage::Store;

#[derive(Debug, PartialEq)]
pub enum Error {
    NoSuchTable,
    Rejected,
    Unsupported,
}

/// An in-memory stand-in for the database, understanding only the statements the logger sends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Vec<(String, Vec<Vec<String>>)>,
    statements: Vec<String>,
    reject_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_table(mut self, name: &str, rows: &[(&str, &str, &str)]) -> MemoryStore {
        let rows = rows
            .iter()
            .map(|(time, temperature, humidity)| {
                vec![time.to_string(), temperature.to_string(), humidity.to_string()]
            })
            .collect();
        self.tables.push((name.to_owned(), rows));
        self
    }

    pub fn set_reject_inserts(&mut self, reject: bool) {
        self.reject_inserts = reject;
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn table(&self, name: &str) -> Option<&Vec<Vec<String>>> {
        self.tables
            .iter()
            .find(|(table, _)| table == name)
            .map(|(_, rows)| rows)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Vec<Vec<String>>, Error> {
        self.tables
            .iter_mut()
            .find(|(table, _)| table == name)
            .map(|(_, rows)| rows)
            .ok_or(Error::NoSuchTable)
    }
}

impl Store for MemoryStore {
    type Error = Error;

    fn execute(&mut self, statement: &str) -> Result<(), Self::Error> {
        self.statements.push(statement.to_owned());
        if let Some(rest) = statement.strip_prefix("create table if not exists ") {
            let name = rest.split(' ').next().ok_or(Error::Unsupported)?;
            if self.table(name).is_none() {
                self.tables.push((name.to_owned(), Vec::new()));
            }
            return Ok(());
        }
        if let Some(rest) = statement.strip_prefix("insert into ") {
            if self.reject_inserts {
                return Err(Error::Rejected);
            }
            let (name, values) = rest.split_once(" values (").ok_or(Error::Unsupported)?;
            let row = values
                .trim_end_matches(')')
                .split(", ")
                .map(|value| value.trim_matches('\'').to_owned())
                .collect();
            self.table_mut(name)?.push(row);
            return Ok(());
        }
        Err(Error::Unsupported)
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Vec<String>>, Self::Error> {
        self.statements.push(statement.to_owned());
        if statement == "show tables" {
            return Ok(self
                .tables
                .iter()
                .map(|(name, _)| vec![name.clone()])
                .collect());
        }
        if let Some(name) = statement.strip_prefix("select * from ") {
            return self.table(name).cloned().ok_or(Error::NoSuchTable);
        }
        Err(Error::Unsupported)
    }
}
