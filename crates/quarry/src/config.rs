use crate::db::PoolConfig;

use quarry_core::convert::DEFAULT_TIMESTAMP_PRECISION;

/// Settings read once per logical operation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reject payload fields that name no column instead of dropping them.
    /// All offending fields of one operation are reported together.
    pub strict: bool,

    /// Fractional-second digits kept when reading timestamps, 0 to 7
    pub timestamp_precision: u8,

    /// Locale used when the caller's [`Context`](crate::Context) has none
    pub default_locale: Option<String>,

    pub pool: PoolConfig,

    /// Reuse compiled selects across executions with different literals
    pub plan_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict: false,
            timestamp_precision: DEFAULT_TIMESTAMP_PRECISION,
            default_locale: None,
            pool: PoolConfig::default(),
            plan_cache: true,
        }
    }
}
