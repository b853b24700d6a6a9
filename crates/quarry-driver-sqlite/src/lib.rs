mod value;
pub(crate) use value::Value;

use quarry_core::{
    async_trait,
    driver::{
        operation::{Operation, QuerySql},
        Capability, Driver, Response, TransactionManager,
    },
    stmt::{self, ValueStream},
    Dialect, Error, Result, Schema,
};
use quarry_sql as sql;
use rusqlite::{ffi, Connection as RusqliteConnection, ErrorCode};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Creates a driver from a `sqlite:` URL. `sqlite::memory:` opens an
    /// in-memory database.
    pub fn new(url: &Url) -> Result<Self> {
        if url.scheme() != "sqlite" {
            quarry_core::bail!("connection URL does not have a `sqlite` scheme; url={url}");
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn quarry_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every connection to `:memory:` is a separate database.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
    transactions: TransactionManager,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(driver_error)?;
        Ok(Self::new(connection))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(driver_error)?;
        Ok(Self::new(connection))
    }

    fn new(connection: RusqliteConnection) -> Self {
        Self {
            connection,
            transactions: TransactionManager::sqlite(),
        }
    }

    fn query(&mut self, query: QuerySql) -> Result<Response> {
        let mut stmt = self.connection.prepare_cached(&query.sql).map_err(driver_error)?;

        let params = query.params.into_iter().map(Value::from).collect::<Vec<_>>();

        if !query.ret {
            let count = stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(driver_error)?;

            return Ok(Response::count(count as u64));
        }

        let width = stmt.column_count();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(driver_error)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(driver_error)? {
            let items = (0..width)
                .map(|index| Value::from_sql(row, index).map(Value::into_inner))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(driver_error)?;

            ret.push(stmt::Value::List(items));
        }

        Ok(Response::value_stream(ValueStream::from_vec(ret)))
    }
}

#[async_trait]
impl quarry_core::driver::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::Transaction(op) => {
                let sql = self.transactions.apply(op)?;

                if let Err(err) = self.connection.execute_batch(&sql) {
                    // `BEGIN` never took effect, so the depth it claimed is released
                    if matches!(op, quarry_core::driver::operation::Transaction::Start) {
                        self.transactions.rollback();
                    }
                    return Err(driver_error(err));
                }

                Ok(Response::count(0))
            }
            Operation::QuerySql(query) => self.query(query),
        }
    }

    fn in_transaction(&self) -> bool {
        self.transactions.in_transaction()
    }

    async fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        let serializer = sql::Serializer::sqlite();

        for entity in schema.tables() {
            let compiled = serializer.serialize(&sql::Statement::create_table(entity));
            tracing::debug!(sql = %compiled.sql, "creating table");
            self.connection.execute(&compiled.sql, []).map_err(driver_error)?;
        }

        Ok(())
    }
}

/// Translates a SQLite failure into the error taxonomy where a stable mapping
/// exists.
fn driver_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let message = message.clone().unwrap_or_else(|| failure.to_string());

        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return Error::entity_already_exists(message)
            }
            _ => {}
        }

        if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return Error::lock_conflict(Dialect::Sqlite, message);
        }
    }

    Error::driver(Dialect::Sqlite, err)
}
