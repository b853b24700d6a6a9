use std::fmt;

/// The backend SQL dialects quarry compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Embedded engine
    Sqlite,

    /// Server-based relational engine
    Postgresql,

    /// Enterprise analytical engine
    Hana,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Hana => "hana",
        }
    }

    pub fn is_sqlite(self) -> bool {
        matches!(self, Dialect::Sqlite)
    }

    pub fn is_postgresql(self) -> bool {
        matches!(self, Dialect::Postgresql)
    }

    pub fn is_hana(self) -> bool {
        matches!(self, Dialect::Hana)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
