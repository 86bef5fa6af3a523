//! Macro Interpolation
//!
//! Rewrites `$__name` placeholders in query templates before execution.
//!
//! # Architecture
//!
//! The macros are data: a `MacroTable` of `(name, evaluator)` entries kept
//! longest-name first, so `$__interval_raw_ms` is consumed before
//! `$__interval` can match its prefix. Each evaluator is a pure function of
//! the query, the datasource defaults and the interpolation clock, and is
//! only invoked when its token occurs in the text. Unknown `$__` tokens are
//! left in place.
//!
//! # Example
//!
//! ```rust
//! use timestream_datasource::macros::interpolate;
//! use timestream_datasource::models::{DatasourceSettings, QueryModel};
//!
//! let settings = DatasourceSettings {
//!     default_database: "metrics".to_string(),
//!     ..Default::default()
//! };
//! let query = QueryModel::new("SELECT * FROM $__database.cpu");
//! assert_eq!(interpolate(&query, &settings).unwrap(), "SELECT * FROM metrics.cpu");
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{DatasourceSettings, QueryModel};

/// Prefix shared by every macro token
pub const MACRO_PREFIX: &str = "$__";

/// Substituted for `$__interval` and `$__interval_ms` when the interval is zero
pub const ZERO_INTERVAL_MARKER: &str = "<INVALID: interval is 0>";

const REMOVED_INTERVAL_STR: &str = "$__intervalStr";

/// Interpolation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MacroError {
    /// The query still uses a macro that no longer exists
    #[error("{0} has been removed, use $__interval instead and rebuild the query")]
    Removed(&'static str),

    /// A macro needs a non-zero interval
    #[error("$__{0} requires a non-zero interval")]
    ZeroInterval(&'static str),
}

/// Inputs available to macro evaluators
pub struct MacroContext<'a> {
    pub query: &'a QueryModel,
    pub settings: &'a DatasourceSettings,
    pub now: DateTime<Utc>,
}

impl MacroContext<'_> {
    fn interval_ms(&self) -> u128 {
        self.query.interval.as_millis()
    }
}

pub type MacroFn = fn(&MacroContext<'_>) -> Result<String, MacroError>;

/// One named macro
#[derive(Clone, Copy)]
pub struct Macro {
    pub name: &'static str,
    pub eval: MacroFn,
}

/// Ordered macro set
#[derive(Clone)]
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl Default for MacroTable {
    fn default() -> Self {
        Self::new(vec![
            Macro { name: "timeFilter", eval: time_filter },
            Macro { name: "timeFrom", eval: |ctx| Ok(ctx.query.time_range.from_ms().to_string()) },
            Macro { name: "timeTo", eval: |ctx| Ok(ctx.query.time_range.to_ms().to_string()) },
            Macro { name: "interval", eval: interval },
            Macro { name: "interval_ms", eval: interval },
            Macro { name: "interval_raw_ms", eval: interval_raw_ms },
            Macro { name: "now_ms", eval: |ctx| Ok(ctx.now.timestamp_millis().to_string()) },
            Macro { name: "database", eval: database },
            Macro { name: "table", eval: table },
            Macro { name: "measure", eval: measure },
        ])
    }
}

impl MacroTable {
    /// Build a table; entries are reordered longest name first
    pub fn new(mut macros: Vec<Macro>) -> Self {
        macros.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(b.name)));
        Self { macros }
    }

    /// Macro names in matching order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.macros.iter().map(|m| m.name)
    }

    /// Replace every known macro token in the query text
    pub fn interpolate(
        &self,
        query: &QueryModel,
        settings: &DatasourceSettings,
        now: DateTime<Utc>,
    ) -> Result<String, MacroError> {
        if query.raw_query.contains(REMOVED_INTERVAL_STR) {
            return Err(MacroError::Removed(REMOVED_INTERVAL_STR));
        }

        let ctx = MacroContext {
            query,
            settings,
            now,
        };
        let mut text = query.raw_query.clone();
        for m in &self.macros {
            let token = format!("{}{}", MACRO_PREFIX, m.name);
            if text.contains(&token) {
                let replacement = (m.eval)(&ctx)?;
                text = text.replace(&token, &replacement);
            }
        }
        Ok(text)
    }
}

/// Interpolate with the built-in macros and the current time
pub fn interpolate(query: &QueryModel, settings: &DatasourceSettings) -> Result<String, MacroError> {
    MacroTable::default().interpolate(query, settings, Utc::now())
}

fn time_filter(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    Ok(format!(
        "time BETWEEN from_milliseconds({}) AND from_milliseconds({})",
        ctx.query.time_range.from_ms(),
        ctx.query.time_range.to_ms()
    ))
}

fn interval(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    match ctx.interval_ms() {
        0 => Ok(ZERO_INTERVAL_MARKER.to_string()),
        ms => Ok(format!("{}ms", ms)),
    }
}

fn interval_raw_ms(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    match ctx.interval_ms() {
        0 => Err(MacroError::ZeroInterval("interval_raw_ms")),
        ms => Ok(ms.to_string()),
    }
}

/// Query value unless unset or an unresolved template variable
fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() || value.starts_with("${") {
        default
    } else {
        value
    }
}

fn database(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    Ok(or_default(&ctx.query.database, &ctx.settings.default_database).to_string())
}

fn table(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    Ok(or_default(&ctx.query.table, &ctx.settings.default_table).to_string())
}

fn measure(ctx: &MacroContext<'_>) -> Result<String, MacroError> {
    Ok(or_default(&ctx.query.measure, &ctx.settings.default_measure).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeRange;
    use chrono::TimeZone;
    use std::time::Duration;

    fn query(text: &str) -> QueryModel {
        let from = Utc.timestamp_millis_opt(1_500_376_552_001).unwrap();
        let to = Utc.timestamp_millis_opt(1_500_376_552_002).unwrap();
        QueryModel::new(text)
            .with_time_range(TimeRange::new(from, to))
            .with_interval(Duration::from_secs(60))
    }

    fn settings() -> DatasourceSettings {
        DatasourceSettings {
            default_database: "ddb".to_string(),
            default_table: "dtable".to_string(),
            default_measure: "dmeasure".to_string(),
            ..Default::default()
        }
    }

    fn run(q: &QueryModel) -> Result<String, MacroError> {
        let now = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        MacroTable::default().interpolate(q, &settings(), now)
    }

    #[test]
    fn test_time_filter() {
        let out = run(&query("SELECT * WHERE $__timeFilter")).unwrap();
        assert_eq!(
            out,
            "SELECT * WHERE time BETWEEN from_milliseconds(1500376552001) AND from_milliseconds(1500376552002)"
        );
    }

    #[test]
    fn test_time_from_to_and_now() {
        let out = run(&query("$__timeFrom $__timeTo $__now_ms")).unwrap();
        assert_eq!(out, "1500376552001 1500376552002 1600000000000");
    }

    #[test]
    fn test_intervals() {
        assert_eq!(run(&query("GROUP BY $__interval_ms TIMESERIES")).unwrap(), "GROUP BY 60000ms TIMESERIES");
        assert_eq!(run(&query("GROUP BY $__interval TIMESERIES")).unwrap(), "GROUP BY 60000ms TIMESERIES");
        assert_eq!(run(&query("rate(input) * $__interval_raw_ms")).unwrap(), "rate(input) * 60000");
    }

    #[test]
    fn test_longest_macro_wins() {
        let out = run(&query("$__interval_raw_ms|$__interval_ms|$__interval")).unwrap();
        assert_eq!(out, "60000|60000ms|60000ms");

        let names: Vec<&str> = MacroTable::default().names().collect();
        let raw = names.iter().position(|n| *n == "interval_raw_ms").unwrap();
        let short = names.iter().position(|n| *n == "interval").unwrap();
        assert!(raw < short);
    }

    #[test]
    fn test_zero_interval() {
        let q = query("bin(time, $__interval)").with_interval(Duration::ZERO);
        let out = run(&q).unwrap();
        assert_eq!(out, format!("bin(time, {})", ZERO_INTERVAL_MARKER));
        assert!(!out.contains(MACRO_PREFIX));

        let q = query("x * $__interval_raw_ms").with_interval(Duration::ZERO);
        assert_eq!(run(&q), Err(MacroError::ZeroInterval("interval_raw_ms")));
    }

    #[test]
    fn test_removed_macro() {
        let err = run(&query("GROUP BY $__intervalStr")).unwrap_err();
        assert_eq!(err, MacroError::Removed("$__intervalStr"));
    }

    #[test]
    fn test_template_fallback() {
        let mut q = query("$__database.$__table.$__measure");
        assert_eq!(run(&q).unwrap(), "ddb.dtable.dmeasure");

        q.database = "${db}".to_string();
        q.table = "${table}".to_string();
        assert_eq!(run(&q).unwrap(), "ddb.dtable.dmeasure");

        q.database = "explicit".to_string();
        q.measure = "m".to_string();
        assert_eq!(run(&q).unwrap(), "explicit.dtable.m");
    }

    #[test]
    fn test_no_macros_unchanged() {
        let text = "SELECT \"$not_a_macro\", '$__' FROM t WHERE x = '${var}'";
        assert_eq!(run(&query(text)).unwrap(), text);
    }

    #[test]
    fn test_unknown_macro_left_alone() {
        let out = run(&query("$__future($__timeTo)")).unwrap();
        assert_eq!(out, "$__future(1500376552002)");
    }
}
