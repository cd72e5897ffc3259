//! Settings repository implementation
//!
//! Reads key/value pairs of one module from `mlite_settings`.

use sqlx::{FromRow, MySqlPool};
use std::collections::HashMap;

use crate::error::DatabaseError;

/// Module holding the queue service settings
pub const QUEUE_MODULE: &str = "jkn_mobile";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: MySqlPool,
}

impl SettingsRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Retrieves the requested fields of a module
    ///
    /// # Arguments
    ///
    /// * `module` - Module name, e.g. `jkn_mobile`
    /// * `fields` - Field names to read; missing ones are simply absent
    ///
    /// # Returns
    ///
    /// A map from field name to value
    pub async fn module_values(&self, module: &str, fields: &[&str]) -> Result<HashMap<String, String>, DatabaseError> {
        if fields.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; fields.len()].join(", ");
        let sql = format!(
            r#"
            SELECT field, COALESCE(value, '') AS value
            FROM mlite_settings
            WHERE module = ? AND field IN ({placeholders})
            "#
        );

        let mut query = sqlx::query_as::<_, SettingRow>(&sql).bind(module);
        for field in fields {
            query = query.bind(*field);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(|row| (row.field, row.value)).collect())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SettingRow {
    pub field: String,
    pub value: String,
}
