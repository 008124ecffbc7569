//! Caller-supplied filter values and their normalization
//!
//! Everything here is lenient: malformed input is dropped (and logged at
//! debug) rather than failing the request.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Query parameter carrying the lower date bound
pub const DATE_START_PARAM: &str = "fecha_inicio";
/// Query parameter carrying the upper date bound
pub const DATE_END_PARAM: &str = "fecha_fin";

/// Month names as stored by the warehouse error log, January first
pub const MONTH_NAMES: [&str; 12] = [
    "ENERO",
    "FEBRERO",
    "MARZO",
    "ABRIL",
    "MAYO",
    "JUNIO",
    "JULIO",
    "AGOSTO",
    "SEPTIEMBRE",
    "OCTUBRE",
    "NOVIEMBRE",
    "DICIEMBRE",
];

/// Raw filter input for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterValues {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    /// List parameters keyed by parameter name, already split and trimmed
    pub lists: HashMap<String, Vec<String>>,
}

impl FilterValues {
    /// Build from a query-string map. Unknown keys are kept; the dataset
    /// schema decides which ones it reads.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let mut values = FilterValues::default();
        for (key, value) in params {
            match key.as_str() {
                DATE_START_PARAM => values.date_start = non_blank(value),
                DATE_END_PARAM => values.date_end = non_blank(value),
                _ => {
                    values.lists.insert(key.clone(), split_list(value));
                }
            }
        }
        values
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.date_start = start.and_then(non_blank);
        self.date_end = end.and_then(non_blank);
        self
    }

    /// Set a list parameter from a comma-delimited string
    pub fn with_list(mut self, param: &str, raw: &str) -> Self {
        self.lists.insert(param.to_string(), split_list(raw));
        self
    }

    /// Set a list parameter from individual items; items are trimmed and
    /// blanks dropped, but commas inside an item are kept.
    pub fn with_items(mut self, param: &str, items: &[String]) -> Self {
        let cleaned = items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        self.lists.insert(param.to_string(), cleaned);
        self
    }

    /// Parsed list for `param`; empty when absent or blank.
    pub fn list(&self, param: &str) -> &[String] {
        self.lists.get(param).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.date_start
            .as_deref()
            .and_then(|raw| parse_date_bound(raw, BoundSide::Start))
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.date_end
            .as_deref()
            .and_then(|raw| parse_date_bound(raw, BoundSide::End))
    }
}

/// Body of the dashboard-wide POST endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilters {
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub processes: Option<Vec<String>>,
    pub suppliers: Option<Vec<String>>,
    pub states: Option<Vec<String>>,
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split a comma-delimited list: trim each item, drop empties, keep order.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Start,
    End,
}

/// Parse `YYYY-MM-DD` or `YYYY-MM`. A bare month widens to its first day
/// (start) or last day (end) so month ranges are inclusive.
pub fn parse_date_bound(raw: &str, side: BoundSide) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let parsed = raw.split_once('-').and_then(|(y, m)| {
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        match side {
            BoundSide::Start => Some(first),
            BoundSide::End => last_day_of_month(first),
        }
    });

    if parsed.is_none() {
        debug!(value = raw, "ignoring unparseable date filter");
    }
    parsed
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Month names covered by `[start, end]`, walking across year boundaries.
/// A missing bound opens the range to the edge of the other bound's year.
/// Both missing, or start after end, yields nothing.
pub fn month_names_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<String> {
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        (Some(s), None) => (s, NaiveDate::from_ymd_opt(s.year(), 12, 31).unwrap_or(s)),
        (None, Some(e)) => (NaiveDate::from_ymd_opt(e.year(), 1, 1).unwrap_or(e), e),
        (None, None) => return Vec::new(),
    };

    let first = start.year() * 12 + start.month0() as i32;
    let last = end.year() * 12 + end.month0() as i32;
    if last < first {
        return Vec::new();
    }

    let mut names: Vec<String> = Vec::new();
    for index in first..=last {
        let name = MONTH_NAMES[index.rem_euclid(12) as usize];
        if names.iter().any(|n| n == name) {
            break;
        }
        names.push(name.to_string());
    }
    names
}
