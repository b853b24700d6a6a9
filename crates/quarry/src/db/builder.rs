use super::{Connect, Db, PoolConfig, Shared};
use crate::{engine::Engine, Config, Context, Result};

use quarry_core::{driver::Driver, Schema};

use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Reject payload fields that name no column.
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.config.strict = strict;
        self
    }

    /// Fractional-second digits kept when reading timestamps, 0 to 7.
    pub fn timestamp_precision(&mut self, precision: u8) -> &mut Self {
        self.config.timestamp_precision = precision;
        self
    }

    pub fn default_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.config.default_locale = Some(locale.into());
        self
    }

    pub fn pool(&mut self, pool: PoolConfig) -> &mut Self {
        self.config.pool = pool;
        self
    }

    pub fn plan_cache(&mut self, enabled: bool) -> &mut Self {
        self.config.plan_cache = enabled;
        self
    }

    /// Replaces every setting at once.
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Connects to the backend named by the scheme of `url`.
    pub async fn connect(&mut self, url: &str, schema: Schema) -> Result<Db> {
        self.build(Connect::new(url)?, schema).await
    }

    pub async fn build(&mut self, driver: impl Driver, schema: Schema) -> Result<Db> {
        // Settings are checked before the first connection is opened
        let engine = Engine::new(schema, self.config.clone(), driver.dialect(), driver.capability())?;
        let pool = super::Pool::new(driver, &self.config.pool).await?;

        tracing::debug!(dialect = %engine.dialect(), "database ready");

        Ok(Db {
            shared: Arc::new(Shared { engine, pool }),
            cx: Context::default(),
        })
    }
}
