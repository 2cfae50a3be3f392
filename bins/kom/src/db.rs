use std::io::Write;
use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use kom_api::plugin::PluginRegistry;
use kom_api::settings::Settings;
use kom_vtab::TableSettings;
use kom_vtab::args::quote_identifier;

use crate::error::CliError;

/// Every plugin this binary ships with.
pub fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    kom_inventree::register(&mut registry);
    registry
}

/// Open a database with the `kom` module registered.
pub fn open(path: &str) -> Result<Connection, CliError> {
    let conn = Connection::open(path)?;
    kom_vtab::register_module(&conn, Arc::new(registry()))?;
    tracing::debug!(%path, "database opened");
    Ok(conn)
}

/// Replace `entries` in settings table `table`, creating the table if needed.
pub fn import_settings(
    conn: &mut Connection,
    table: &str,
    entries: &[(String, String)],
) -> Result<usize, CliError> {
    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (key TEXT, value TEXT)",
        quote_identifier(table)
    ))?;
    {
        let settings = TableSettings::open(&tx, table)?;
        for (key, value) in entries {
            settings.delete_setting(key)?;
            settings.write_setting(key, value)?;
        }
    }
    tx.commit()?;
    Ok(entries.len())
}

/// Run one statement and write its rows tab separated. Returns the number of
/// rows written, or of rows changed for statements without result columns.
pub fn run_query(
    conn: &Connection,
    sql: &str,
    header: bool,
    out: &mut impl Write,
) -> Result<usize, CliError> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        return Ok(stmt.execute([])?);
    }

    let columns = stmt.column_count();
    if header {
        writeln!(out, "{}", stmt.column_names().join("\t"))?;
    }
    let mut rows = stmt.query([])?;
    let mut count = 0;
    while let Some(row) = rows.next()? {
        let cells = (0..columns)
            .map(|i| row.get_ref(i).map(render))
            .collect::<Result<Vec<_>, _>>()?;
        writeln!(out, "{}", cells.join("\t"))?;
        count += 1;
    }
    Ok(count)
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_replaces_existing_keys() {
        let mut conn = open(":memory:").unwrap();
        let first = [("server".to_string(), "http://a".to_string())];
        import_settings(&mut conn, "kom_settings", &first).unwrap();
        let second = [
            ("server".to_string(), "http://b".to_string()),
            ("username".to_string(), "admin".to_string()),
        ];
        assert_eq!(import_settings(&mut conn, "kom_settings", &second).unwrap(), 2);

        let mut out = Vec::new();
        let rows = run_query(
            &conn,
            "SELECT key, value FROM kom_settings ORDER BY key",
            true,
            &mut out,
        )
        .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "key\tvalue\nserver\thttp://b\nusername\tadmin\n"
        );
    }

    #[test]
    fn statements_without_rows_report_changes() {
        let conn = open(":memory:").unwrap();
        let mut out = Vec::new();
        run_query(&conn, "CREATE TABLE t (a, b)", false, &mut out).unwrap();
        let changed = run_query(&conn, "INSERT INTO t VALUES (1, NULL), (2.5, x'00ff')", false, &mut out).unwrap();
        assert_eq!(changed, 2);

        run_query(&conn, "SELECT a, b FROM t", false, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\t\n2.5\t<2 bytes>\n");
    }

    #[test]
    fn inventree_plugin_is_available() {
        let conn = open(":memory:").unwrap();
        let err = conn
            .execute_batch("CREATE VIRTUAL TABLE parts USING kom(plugin=inventree, settings=missing)")
            .unwrap_err();
        assert!(err.to_string().contains("does not exist or has wrong schema"), "{err}");

        let err = conn
            .execute_batch("CREATE VIRTUAL TABLE parts USING kom(plugin=other, settings=missing)")
            .unwrap_err();
        assert!(err.to_string().contains("available: inventree"), "{err}");
    }
}
