use std::collections::HashMap;

use tokio_postgres::{Client, Error, Statement};

/// Prepared statements of one connection, keyed by SQL text. Parameter types
/// are inferred by the server on first prepare.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatementCache {
    map: HashMap<String, Statement>,
}

impl StatementCache {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn prepare(&mut self, client: &Client, query: &str) -> Result<Statement, Error> {
        if let Some(statement) = self.map.get(query) {
            return Ok(statement.clone());
        }

        let statement = client.prepare(query).await?;
        self.map.insert(query.to_string(), statement.clone());
        Ok(statement)
    }
}
