use std::os::raw::c_int;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexConstraintOp, IndexInfo, VTab, VTabConnection, VTabCursor,
    VTabKind, read_only_module,
};
use rusqlite::{Connection, ffi};
use tokio::runtime::Runtime;

use kom_api::plugin::{Filter, KomPlugin, Parts, PluginRegistry};
use kom_api::value::Value;

use crate::args::{ModuleArgs, unquote};
use crate::error::VtabError;
use crate::plan::{self, Constraint, ConstraintOp};
use crate::settings::TableSettings;

/// Module name used in `CREATE VIRTUAL TABLE ... USING kom(...)`.
pub const MODULE_NAME: &str = "kom";

const FETCH_WORKERS: usize = 2;

/// Register the `kom` module on `conn`. Every table created through it looks
/// its plugin up in `registry`.
pub fn register_module(conn: &Connection, registry: Arc<PluginRegistry>) -> rusqlite::Result<()> {
    conn.create_module(MODULE_NAME, read_only_module::<KomTab>(), Some(registry))
}

// ═══════════════════════════════════════════════════════════════
// Table
// ═══════════════════════════════════════════════════════════════

/// One virtual table instance, bound to an initialized plugin.
#[repr(C)]
pub struct KomTab {
    base: ffi::sqlite3_vtab,
    name: String,
    columns: Vec<String>,
    plugin: Box<dyn KomPlugin>,
    runtime: Runtime,
}

impl KomTab {
    fn build(
        db: &mut VTabConnection,
        registry: &PluginRegistry,
        args: &[&[u8]],
    ) -> Result<(String, Self), VtabError> {
        let args = args
            .iter()
            .map(|a| std::str::from_utf8(a))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| VtabError::Config(format!("module arguments are not UTF-8: {e}")))?;
        let name = args.get(2).map(|n| unquote(n)).unwrap_or_default();
        let module_args = ModuleArgs::parse(args.get(3..).unwrap_or_default())
            .map_err(|e| e.with_context(format!("table {name}")))?;

        let mut plugin = registry
            .create(&module_args.plugin)
            .map_err(|e| VtabError::from(e).with_context(format!("table {name}")))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(FETCH_WORKERS)
            .thread_name("kom-fetch")
            .enable_all()
            .build()?;

        // The handle stays owned by SQLite; `from_handle` does not close it.
        let conn = unsafe { Connection::from_handle(db.handle()) }?;
        let settings = TableSettings::open(&conn, &module_args.settings)
            .map_err(|e| VtabError::from(e).with_context(format!("table {name}")))?;
        runtime
            .block_on(plugin.init(&settings, &module_args.plugin_args))
            .map_err(|e| VtabError::from(e).with_context(format!("table {name}")))?;
        drop(settings);
        drop(conn);

        let columns = plugin.column_names();
        if columns.is_empty() {
            return Err(VtabError::Config(format!("table {name}: plugin declared no columns")));
        }
        let schema = schema_for(&columns);

        tracing::info!(
            table = %name,
            plugin = %module_args.plugin,
            columns = columns.len(),
            "virtual table connected"
        );
        tracing::debug!(table = %name, %schema, "declared schema");

        Ok((
            schema,
            Self {
                base: ffi::sqlite3_vtab::default(),
                name,
                columns,
                plugin,
                runtime,
            },
        ))
    }

    fn fetch(&self, filter: Option<&Filter>) -> Result<Parts, VtabError> {
        self.runtime
            .block_on(self.plugin.parts(filter))
            .map_err(|e| VtabError::from(e).with_context(format!("table {}", self.name)))
    }
}

/// `CREATE TABLE` statement declared to SQLite. The table name is ignored by
/// SQLite, so a placeholder is used.
fn schema_for(columns: &[String]) -> String {
    let columns = columns
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE x({columns})")
}

unsafe impl<'vtab> VTab<'vtab> for KomTab {
    type Aux = Arc<PluginRegistry>;
    type Cursor = KomCursor<'vtab>;

    fn connect(
        db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let registry = aux.ok_or_else(|| {
            rusqlite::Error::ModuleError("kom module registered without a plugin registry".into())
        })?;
        Ok(Self::build(db, registry, args)?)
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let constraints = info
            .constraints()
            .map(|c| Constraint {
                column: c.column(),
                op: match c.operator() {
                    IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ => ConstraintOp::Eq,
                    _ => ConstraintOp::Other,
                },
                usable: c.is_usable(),
            })
            .collect::<Vec<_>>();

        let choice = plan::choose(&constraints, &self.columns, |c| self.plugin.can_filter(c));
        if let Some(i) = choice.constraint {
            let mut usage = info.constraint_usage(i);
            usage.set_argv_index(1);
            usage.set_omit(false);
        }
        info.set_idx_num(choice.idx_num());
        info.set_estimated_cost(choice.estimated_cost);
        if let Some(rows) = choice.estimated_rows {
            info.set_estimated_rows(rows);
        }

        tracing::trace!(
            table = %self.name,
            column = ?choice.column.map(|c| &self.columns[c]),
            cost = choice.estimated_cost,
            "plan chosen"
        );
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<KomCursor<'vtab>> {
        Ok(KomCursor::new(self))
    }
}

impl CreateVTab<'_> for KomTab {
    const KIND: VTabKind = VTabKind::Default;

    fn destroy(&self) -> rusqlite::Result<()> {
        tracing::info!(table = %self.name, "virtual table dropped");
        Ok(())
    }
}

impl Drop for KomTab {
    fn drop(&mut self) {
        tracing::debug!(table = %self.name, "virtual table disconnected");
    }
}

// ═══════════════════════════════════════════════════════════════
// Cursor
// ═══════════════════════════════════════════════════════════════

/// Scan over the rows fetched by one `filter` call.
#[repr(C)]
pub struct KomCursor<'vtab> {
    base: ffi::sqlite3_vtab_cursor,
    table: &'vtab KomTab,
    rows: Parts,
    position: usize,
}

impl<'vtab> KomCursor<'vtab> {
    fn new(table: &'vtab KomTab) -> Self {
        Self {
            base: ffi::sqlite3_vtab_cursor::default(),
            table,
            rows: Vec::new(),
            position: 0,
        }
    }

    fn pushed_filter(&self, idx_num: c_int, args: &Filters<'_>) -> Result<Option<Filter>, VtabError> {
        let Ok(column) = usize::try_from(idx_num) else {
            return Ok(None);
        };
        let name = self.table.columns.get(column).ok_or_else(|| {
            VtabError::Config(format!("plan refers to unknown column index {column}"))
        })?;
        if args.is_empty() {
            return Ok(None);
        }
        let value = args.get::<SqlValue>(0)?;
        Ok(Some(Filter {
            column: name.clone(),
            value: from_sql(value),
        }))
    }
}

unsafe impl VTabCursor for KomCursor<'_> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        let filter = self.pushed_filter(idx_num, args)?;
        tracing::debug!(table = %self.table.name, ?filter, "fetching rows");
        self.rows = self.table.fetch(filter.as_ref())?;
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.position += 1;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.position >= self.rows.len()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let name = usize::try_from(i)
            .ok()
            .and_then(|i| self.table.columns.get(i))
            .ok_or_else(|| rusqlite::Error::ModuleError(format!("no column with index {i}")))?;
        let value = self
            .rows
            .get(self.position)
            .and_then(|row| row.get(name))
            .unwrap_or(&Value::Null);
        let value = to_sql(value).map_err(|e| {
            VtabError::Config(format!("column {name}: {e}")).with_context(format!("table {}", self.table.name))
        })?;
        ctx.set_result(&value)
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.position as i64)
    }
}

// ═══════════════════════════════════════════════════════════════
// Value mapping
// ═══════════════════════════════════════════════════════════════

/// Host value bound to a pushed-down constraint. Blobs are read as text.
pub(crate) fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Int(i),
        SqlValue::Real(f) => Value::Float(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

/// Cell value returned to the host. Booleans become 0/1; nested values are
/// not representable.
pub(crate) fn to_sql(value: &Value) -> Result<SqlValue, String> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(format!("{} value cannot be stored in a column", value.kind()));
        }
    })
}
