use super::Args;
use crate::engine::{cache, Engine};
use crate::{Context, Result};

use quarry_core::{
    driver::{operation::QuerySql, Connection},
    stmt::{self, ValueStream},
    Schema,
};

impl Engine {
    pub(in crate::engine) async fn exec_select(
        &self,
        connection: &mut dyn Connection,
        cx: &Context,
        schema: &Schema,
        select: stmt::Select,
    ) -> Result<ValueStream> {
        let locale = cx.effective_locale(self.config.default_locale.as_deref());

        if select.lock.is_some() && !self.capability.select_for_update {
            tracing::warn!(
                dialect = %self.dialect(),
                "row locks are not supported; reading without one"
            );
        }

        let normalized = cache::normalize(select);
        let compiled = self
            .cache
            .get_or_compile(schema, self.dialect(), locale.is_some(), &normalized)
            .await?;

        let params = self.bind(
            &compiled.compiled.binds,
            Args::Typed {
                values: &normalized.args,
                types: &compiled.arg_types,
            },
            locale,
        )?;

        for sql in &compiled.compiled.preamble {
            tracing::debug!(sql = %sql, "executing preamble");
            connection.exec(QuerySql::new(sql, vec![], false).into()).await?;
        }

        tracing::debug!(sql = %compiled.compiled.sql, params = params.len(), "executing select");

        let response = connection
            .exec(
                QuerySql {
                    sql: compiled.compiled.sql.clone(),
                    params,
                    ret: true,
                    lock: normalized.select.lock.as_ref().map(|lock| lock.wait),
                }
                .into(),
            )
            .await?;

        let registry = self.registry.clone();

        Ok(response
            .rows
            .into_values()?
            .map(move |row| compiled.shape.decode(&registry, row)))
    }
}
