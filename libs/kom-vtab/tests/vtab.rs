use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use rusqlite::Connection;

use kom_api::config::PluginArguments;
use kom_api::error::PluginError;
use kom_api::plugin::{Filter, KomPlugin, Part, Parts, PluginRegistry};
use kom_api::settings::Settings;
use kom_api::value::Value;

type Calls = Arc<Mutex<Vec<Option<Filter>>>>;

/// In-memory parts list that records every fetch it receives.
struct Fixture {
    calls: Calls,
    parts: Parts,
    fail: Option<String>,
}

fn part(pk: i64, ipn: &str, name: &str) -> Part {
    let mut part = IndexMap::new();
    part.insert("PK".to_string(), Value::Text(pk.to_string()));
    part.insert("IPN".to_string(), Value::from(ipn));
    part.insert("Name".to_string(), Value::from(name));
    part.insert("Stock".to_string(), Value::Int(pk * 10));
    part
}

impl KomPlugin for Fixture {
    fn init<'a>(
        &'a mut self,
        settings: &'a dyn Settings,
        args: &'a PluginArguments,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + 'a>> {
        Box::pin(async move {
            settings.read_setting("server")?;
            if let Some(message) = args.get("fail") {
                self.fail = Some(message.to_string());
            }
            args.require("categories")?;
            Ok(())
        })
    }

    fn column_names(&self) -> Vec<String> {
        ["PK", "IPN", "Name", "Stock"].iter().map(|c| c.to_string()).collect()
    }

    fn can_filter(&self, column: &str) -> bool {
        column == "PK" || column == "IPN"
    }

    fn parts<'a>(
        &'a self,
        filter: Option<&'a Filter>,
    ) -> Pin<Box<dyn Future<Output = Result<Parts, PluginError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(filter.cloned());
            if let Some(message) = &self.fail {
                return Err(PluginError::transport(message.clone()));
            }
            let rows = self
                .parts
                .iter()
                .filter(|p| match filter {
                    Some(f) => p.get(&f.column) == Some(&f.value),
                    None => true,
                })
                .cloned()
                .collect();
            Ok(rows)
        })
    }
}

fn setup() -> (Connection, Calls) {
    let calls: Calls = Arc::default();
    let registry = {
        let calls = calls.clone();
        PluginRegistry::new().with("fixture", move || {
            Box::new(Fixture {
                calls: calls.clone(),
                parts: vec![part(1, "R-001", "10k"), part(2, "R-002", "4k7"), part(3, "C-001", "100n")],
                fail: None,
            })
        })
    };

    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE kom_settings (key TEXT, value TEXT);
         INSERT INTO kom_settings VALUES ('server', 'http://inventree.local');",
    )
    .unwrap();
    kom_vtab::register_module(&conn, Arc::new(registry)).unwrap();
    (conn, calls)
}

fn create(conn: &Connection, extra: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE parts USING kom(plugin=fixture, settings=kom_settings, categories='Resistors'{extra})"
    ))
}

#[test]
fn declares_plugin_columns_in_order() {
    let (conn, _) = setup();
    create(&conn, "").unwrap();

    let mut stmt = conn.prepare("SELECT * FROM parts").unwrap();
    let names: Vec<&str> = stmt.column_names();
    assert_eq!(names, ["PK", "IPN", "Name", "Stock"]);
}

#[test]
fn full_scan_passes_no_filter() {
    let (conn, calls) = setup();
    create(&conn, "").unwrap();

    let mut stmt = conn.prepare("SELECT IPN, Stock FROM parts ORDER BY IPN").unwrap();
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        rows,
        [("C-001".to_string(), 30), ("R-001".to_string(), 10), ("R-002".to_string(), 20)]
    );
    assert_eq!(*calls.lock().unwrap(), [None]);
}

#[test]
fn equality_on_filterable_column_is_pushed_down() {
    let (conn, calls) = setup();
    create(&conn, "").unwrap();

    let name: String = conn
        .query_row("SELECT Name FROM parts WHERE IPN = 'R-002'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "4k7");

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        [Some(Filter {
            column: "IPN".to_string(),
            value: Value::from("R-002"),
        })]
    );
}

#[test]
fn non_filterable_column_scans_and_host_filters() {
    let (conn, calls) = setup();
    create(&conn, "").unwrap();

    let ipn: String = conn
        .query_row("SELECT IPN FROM parts WHERE Name = '100n'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(ipn, "C-001");
    assert_eq!(*calls.lock().unwrap(), [None]);
}

#[test]
fn fetch_errors_fail_the_statement() {
    let (conn, _) = setup();
    create(&conn, ", fail='connection refused'").unwrap();

    let err = conn
        .query_row("SELECT count(*) FROM parts", [], |row| row.get::<_, i64>(0))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("connection refused"), "{message}");
}

#[test]
fn missing_plugin_argument_fails_creation() {
    let (conn, _) = setup();
    let err = conn
        .execute_batch("CREATE VIRTUAL TABLE parts USING kom(plugin=fixture, settings=kom_settings)")
        .unwrap_err();
    assert!(err.to_string().contains("categories is a required argument"), "{err}");
}

#[test]
fn unknown_plugin_fails_creation() {
    let (conn, _) = setup();
    let err = conn
        .execute_batch("CREATE VIRTUAL TABLE parts USING kom(plugin=nope, settings=kom_settings)")
        .unwrap_err();
    assert!(err.to_string().contains("unknown plugin `nope`"), "{err}");
}

#[test]
fn missing_settings_table_fails_creation() {
    let (conn, _) = setup();
    let err = conn
        .execute_batch("CREATE VIRTUAL TABLE parts USING kom(plugin=fixture, settings=absent, categories=x)")
        .unwrap_err();
    assert!(err.to_string().contains("does not exist or has wrong schema"), "{err}");
}
