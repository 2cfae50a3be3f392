use rusqlite::{Connection, params};

use kom_api::error::PluginError;
use kom_api::settings::Settings;

use crate::args::quote_identifier;

/// Settings stored in a host table with `key` and `value` columns.
pub struct TableSettings<'c> {
    conn: &'c Connection,
    table: String,
    quoted: String,
}

impl<'c> TableSettings<'c> {
    /// Check that `table` exists with the expected columns.
    pub fn open(conn: &'c Connection, table: &str) -> Result<Self, PluginError> {
        let quoted = quote_identifier(table);
        conn.prepare(&format!("SELECT key, value FROM {quoted} LIMIT 1"))
            .map_err(|e| {
                PluginError::settings(format!(
                    "settings table {table} does not exist or has wrong schema: {e}"
                ))
            })?;
        Ok(Self {
            conn,
            table: table.to_string(),
            quoted,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn sql_err(&self, e: rusqlite::Error) -> PluginError {
        PluginError::settings(format!("settings table {}: {e}", self.table))
    }
}

impl Settings for TableSettings<'_> {
    fn find_setting(&self, key: &str) -> Result<Option<String>, PluginError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT value FROM {} WHERE key = ?1 LIMIT 2", self.quoted))
            .map_err(|e| self.sql_err(e))?;
        let values = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| self.sql_err(e))?;

        match values.as_slice() {
            [value] => Ok(Some(value.clone())),
            [] => Ok(None),
            _ => Err(PluginError::settings(format!(
                "multiple settings found in {} for {key}",
                self.table
            ))),
        }
    }

    fn read_setting(&self, key: &str) -> Result<String, PluginError> {
        self.find_setting(key)?.ok_or_else(|| {
            PluginError::settings(format!("no setting found in {} for {key}", self.table))
        })
    }

    fn write_setting(&self, key: &str, value: &str) -> Result<(), PluginError> {
        self.conn
            .execute(
                &format!("INSERT INTO {} (key, value) VALUES (?1, ?2)", self.quoted),
                params![key, value],
            )
            .map(|_| ())
            .map_err(|e| self.sql_err(e))
    }

    fn delete_setting(&self, key: &str) -> Result<(), PluginError> {
        self.conn
            .execute(&format!("DELETE FROM {} WHERE key = ?1", self.quoted), params![key])
            .map(|_| ())
            .map_err(|e| self.sql_err(e))
    }
}
