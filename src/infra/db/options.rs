use async_trait::async_trait;
use sqlx::types::Json;
use tracing::warn;

use crate::{
    application::repos::{NetworkOptionStore, RepoError, SiteOptionStore},
    domain::{
        options::{OptionTable, OptionValue},
        sites::{NetworkId, SiteId},
    },
};

use super::{PostgresRepositories, map_sqlx_error, util::to_db_id};

/// Column layout of one scoped key/value table.
struct Layout {
    table: &'static str,
    scope: &'static str,
    name: &'static str,
    value: &'static str,
}

const SITE_OPTIONS: Layout = Layout {
    table: "site_options",
    scope: "site_id",
    name: "option_name",
    value: "option_value",
};

const NETWORK_OPTIONS: Layout = Layout {
    table: "network_options",
    scope: "network_id",
    name: "meta_key",
    value: "meta_value",
};

impl Layout {
    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {t} ({s}, {n}, {v}) VALUES ($1, $2, $3) ON CONFLICT ({s}, {n}) DO NOTHING",
            t = self.table,
            s = self.scope,
            n = self.name,
            v = self.value,
        )
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {t} ({s}, {n}, {v}) VALUES ($1, $2, $3) \
             ON CONFLICT ({s}, {n}) DO UPDATE SET {v} = EXCLUDED.{v} \
             WHERE {t}.{v} IS DISTINCT FROM EXCLUDED.{v}",
            t = self.table,
            s = self.scope,
            n = self.name,
            v = self.value,
        )
    }

    fn select_one_sql(&self) -> String {
        format!(
            "SELECT {v} FROM {t} WHERE {s} = $1 AND {n} = $2",
            t = self.table,
            s = self.scope,
            n = self.name,
            v = self.value,
        )
    }

    fn select_many_sql(&self) -> String {
        format!(
            "SELECT {n}, {v} FROM {t} WHERE {s} = $1 AND {n} = ANY($2)",
            t = self.table,
            s = self.scope,
            n = self.name,
            v = self.value,
        )
    }

    fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {t} WHERE {s} = $1 AND {n} = $2",
            t = self.table,
            s = self.scope,
            n = self.name,
        )
    }
}

/// Scalars written by the host as numbers read back as text.
fn decode(name: &str, raw: serde_json::Value) -> Result<OptionValue, RepoError> {
    match raw {
        serde_json::Value::Number(number) => Ok(OptionValue::Text(number.to_string())),
        other => serde_json::from_value(other).map_err(|err| RepoError::decode(name, err)),
    }
}

/// Rows that fail to decode are logged and left out of the batch.
fn decode_rows(scope: u64, rows: Vec<(String, serde_json::Value)>) -> OptionTable {
    rows.into_iter()
        .filter_map(|(name, raw)| match decode(&name, raw) {
            Ok(value) => Some((name, value)),
            Err(err) => {
                warn!(
                    target = "infra::db::options",
                    scope,
                    option = %name,
                    error = %err,
                    "skipping undecodable option row"
                );
                None
            }
        })
        .collect()
}

impl PostgresRepositories {
    async fn insert_option(
        &self,
        layout: &Layout,
        scope: u64,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        let sql = layout.insert_sql();
        let result = sqlx::query(&sql)
            .bind(to_db_id(scope)?)
            .bind(name)
            .bind(Json(value))
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_option(
        &self,
        layout: &Layout,
        scope: u64,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        let sql = layout.upsert_sql();
        let result = sqlx::query(&sql)
            .bind(to_db_id(scope)?)
            .bind(name)
            .bind(Json(value))
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_option(
        &self,
        layout: &Layout,
        scope: u64,
        name: &str,
    ) -> Result<Option<OptionValue>, RepoError> {
        let sql = layout.select_one_sql();
        let row: Option<(serde_json::Value,)> = sqlx::query_as(&sql)
            .bind(to_db_id(scope)?)
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(|(raw,)| decode(name, raw)).transpose()
    }

    async fn select_options(
        &self,
        layout: &Layout,
        scope: u64,
        names: &[String],
    ) -> Result<OptionTable, RepoError> {
        if names.is_empty() {
            return Ok(OptionTable::new());
        }

        let sql = layout.select_many_sql();
        let rows: Vec<(String, serde_json::Value)> = sqlx::query_as(&sql)
            .bind(to_db_id(scope)?)
            .bind(names)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(decode_rows(scope, rows))
    }

    async fn delete_option(
        &self,
        layout: &Layout,
        scope: u64,
        name: &str,
    ) -> Result<bool, RepoError> {
        let sql = layout.delete_sql();
        let result = sqlx::query(&sql)
            .bind(to_db_id(scope)?)
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SiteOptionStore for PostgresRepositories {
    async fn add(&self, site: SiteId, name: &str, value: &OptionValue) -> Result<bool, RepoError> {
        self.insert_option(&SITE_OPTIONS, site.0, name, value).await
    }

    async fn get(&self, site: SiteId, name: &str) -> Result<Option<OptionValue>, RepoError> {
        self.select_option(&SITE_OPTIONS, site.0, name).await
    }

    async fn update(
        &self,
        site: SiteId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        self.upsert_option(&SITE_OPTIONS, site.0, name, value).await
    }

    async fn delete(&self, site: SiteId, name: &str) -> Result<bool, RepoError> {
        self.delete_option(&SITE_OPTIONS, site.0, name).await
    }

    async fn get_many(&self, site: SiteId, names: &[String]) -> Result<OptionTable, RepoError> {
        self.select_options(&SITE_OPTIONS, site.0, names).await
    }
}

#[async_trait]
impl NetworkOptionStore for PostgresRepositories {
    async fn add(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        self.insert_option(&NETWORK_OPTIONS, network.0, name, value)
            .await
    }

    async fn get(
        &self,
        network: NetworkId,
        name: &str,
    ) -> Result<Option<OptionValue>, RepoError> {
        self.select_option(&NETWORK_OPTIONS, network.0, name).await
    }

    async fn update(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        self.upsert_option(&NETWORK_OPTIONS, network.0, name, value)
            .await
    }

    async fn delete(&self, network: NetworkId, name: &str) -> Result<bool, RepoError> {
        self.delete_option(&NETWORK_OPTIONS, network.0, name).await
    }

    async fn get_many(
        &self,
        network: NetworkId,
        names: &[String],
    ) -> Result<OptionTable, RepoError> {
        self.select_options(&NETWORK_OPTIONS, network.0, names)
            .await
    }
}
