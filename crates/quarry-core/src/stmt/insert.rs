use super::{Entry, Select, Statement, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// Qualified entity name
    pub into: String,

    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// Flat or nested row documents
    Entries(Vec<Entry>),

    /// Column list with positional rows
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },

    /// Insert-as-select; select columns map to target columns by name
    Select(Box<Select>),
}

impl Insert {
    pub fn into(entity: impl Into<String>) -> Insert {
        Insert {
            into: entity.into(),
            source: InsertSource::Entries(vec![]),
        }
    }

    pub fn entry(mut self, entry: Entry) -> Insert {
        match &mut self.source {
            InsertSource::Entries(entries) => entries.push(entry),
            source => *source = InsertSource::Entries(vec![entry]),
        }
        self
    }

    pub fn entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Insert {
        for entry in entries {
            self = self.entry(entry);
        }
        self
    }

    pub fn rows<C, S>(mut self, columns: C, rows: Vec<Vec<Value>>) -> Insert
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = InsertSource::Rows {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        };
        self
    }

    pub fn select(mut self, select: Select) -> Insert {
        self.source = InsertSource::Select(Box::new(select));
        self
    }

    /// Wraps the insert into an upsert statement.
    pub fn upsert(self) -> Statement {
        Statement::Upsert(self)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}
