//! Constraint pushdown for `xBestIndex`.
//!
//! Only a single equality constraint on a column the plugin can filter is
//! pushed down. Pushdown only narrows what the plugin fetches: the constraint
//! is never marked omittable, so the host re-checks every returned row.

/// Estimated cost when a filterable equality constraint was found.
pub const FILTERED_COST: f64 = 100.0;
/// Estimated cost of a full listing.
pub const FULL_SCAN_COST: f64 = 1_000_000.0;

/// Operator of an offered constraint, reduced to what planning cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Other,
}

/// Constraint offered by the host for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    /// Column index; negative for the rowid.
    pub column: i32,
    pub op: ConstraintOp,
    pub usable: bool,
}

/// Chosen plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanChoice {
    /// Position in the constraint list of the pushed-down constraint.
    pub constraint: Option<usize>,
    /// Column index whose value is delivered to `filter`.
    pub column: Option<usize>,
    pub estimated_cost: f64,
    pub estimated_rows: Option<i64>,
}

impl PlanChoice {
    /// `idx_num` passed from `xBestIndex` to `xFilter`; `-1` for a full scan.
    pub fn idx_num(&self) -> i32 {
        self.column
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or(-1)
    }
}

/// Pick the first usable equality constraint on a filterable column.
///
/// `columns` are the declared column names, `can_filter` asks the plugin.
/// No cost comparison happens between candidates; the first one wins.
pub fn choose<F>(constraints: &[Constraint], columns: &[String], can_filter: F) -> PlanChoice
where
    F: Fn(&str) -> bool,
{
    for (i, constraint) in constraints.iter().enumerate() {
        if !constraint.usable || constraint.op != ConstraintOp::Eq {
            continue;
        }
        let Some(column) = usize::try_from(constraint.column)
            .ok()
            .filter(|&c| c < columns.len())
        else {
            continue;
        };
        if can_filter(&columns[column]) {
            return PlanChoice {
                constraint: Some(i),
                column: Some(column),
                estimated_cost: FILTERED_COST,
                estimated_rows: Some(1),
            };
        }
    }

    PlanChoice {
        constraint: None,
        column: None,
        estimated_cost: FULL_SCAN_COST,
        estimated_rows: None,
    }
}
