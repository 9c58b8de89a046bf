use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use estatedesk_core::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ListRecord;

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    #[serde(default, deserialize_with = "date_bound")]
    pub from: Option<NaiveDate>,
    /// Last day included.
    #[serde(default, deserialize_with = "date_bound")]
    pub to: Option<NaiveDate>,
}

/// Reads a stored bound; blank text is an open bound.
fn date_bound<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(text) => parse_date_input(&text).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl DateRange {
    /// Creates a range from explicit bounds.
    #[must_use]
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Parses `YYYY-MM-DD` inputs; blank inputs leave the bound open.
    pub fn parse(from: &str, to: &str) -> AppResult<Self> {
        let range = Self {
            from: parse_date_input(from)?,
            to: parse_date_input(to)?,
        };

        if let (Some(from), Some(to)) = (range.from, range.to)
            && from > to
        {
            return Err(AppError::Validation(format!(
                "date range start {from} is after end {to}"
            )));
        }

        Ok(range)
    }

    /// Returns whether both bounds are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Returns whether the day falls inside the range.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

fn parse_date_input(value: &str) -> AppResult<Option<NaiveDate>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|error| AppError::Validation(format!("invalid date '{trimmed}': {error}")))
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Value held for one filter column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Free text or a single selected option.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Multi-select values.
    Many(Vec<String>),
    /// Date range.
    Range(DateRange),
}

impl FilterValue {
    /// Returns whether the value counts as "no filter".
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            Self::Number(value) => value.is_nan(),
            Self::Many(values) => values.iter().all(|value| value.trim().is_empty()),
            Self::Range(range) => range.is_empty(),
        }
    }

    fn push_query_pairs(&self, key: &str, pairs: &mut Vec<(String, String)>) {
        match self {
            Self::Text(value) => pairs.push((key.to_owned(), value.trim().to_owned())),
            Self::Number(value) => pairs.push((key.to_owned(), value.to_string())),
            Self::Many(values) => {
                let joined = values
                    .iter()
                    .map(|value| value.trim())
                    .filter(|value| !value.is_empty())
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.push((key.to_owned(), joined));
            }
            Self::Range(range) => {
                if let Some(from) = range.from {
                    pairs.push((format!("{key}From"), from.format(DATE_FORMAT).to_string()));
                }
                if let Some(to) = range.to {
                    pairs.push((format!("{key}To"), to.format(DATE_FORMAT).to_string()));
                }
            }
        }
    }

    fn matches(&self, field: &Value) -> bool {
        match self {
            Self::Text(expected) => value_as_text(field)
                .is_some_and(|text| text.to_lowercase().contains(&expected.trim().to_lowercase())),
            Self::Number(expected) => match field {
                Value::Number(number) => number.as_f64() == Some(*expected),
                Value::String(text) => text.trim().parse::<f64>().ok() == Some(*expected),
                _ => false,
            },
            Self::Many(expected) => value_as_text(field).is_some_and(|text| {
                expected
                    .iter()
                    .any(|candidate| candidate.trim().eq_ignore_ascii_case(text.trim()))
            }),
            Self::Range(range) => field
                .as_str()
                .and_then(|text| text.get(..10))
                .and_then(|day| NaiveDate::parse_from_str(day, DATE_FORMAT).ok())
                .is_some_and(|day| range.contains(day)),
        }
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Present filter values keyed by column.
///
/// Absent values are never stored, so two sets with the same effective
/// filters compare equal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet(BTreeMap<String, FilterValue>);

impl FilterSet {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one column; absent values remove the column.
    pub fn set(&mut self, key: impl Into<String>, value: FilterValue) {
        let key = key.into();
        if value.is_absent() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Removes one column.
    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.0.remove(key)
    }

    /// Returns one column value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    /// Returns the number of active filters.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no filter is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over active filters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Compiles active filters into server query parameters.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            value.push_query_pairs(key, &mut pairs);
        }
        pairs
    }

    /// Evaluates active filters against one row; missing fields never match.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.0
            .iter()
            .all(|(key, value)| row.get(key).is_some_and(|field| value.matches(field)))
    }
}

/// Input widget type of a filter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    /// Free text input.
    Text,
    /// Single choice.
    Select,
    /// Multiple choices.
    MultiSelect,
    /// From/to date inputs.
    DateRange,
}

impl FilterKind {
    fn accepts(&self, value: &FilterValue) -> bool {
        matches!(
            (self, value),
            (Self::Text | Self::Select, FilterValue::Text(_) | FilterValue::Number(_))
                | (Self::MultiSelect, FilterValue::Many(_))
                | (Self::DateRange, FilterValue::Range(_))
        )
    }
}

/// Declarative description of one filter column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Row field the filter applies to.
    pub key: String,
    /// Label shown next to the input.
    pub label: String,
    /// Input type.
    pub kind: FilterKind,
    /// Explicit options for select inputs.
    pub options: Option<Vec<String>>,
}

impl FilterDescriptor {
    /// Creates a descriptor without explicit options.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            options: None,
        }
    }

    /// Sets explicit options.
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// Filter inputs with a pending buffer committed by an explicit apply.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPanel {
    descriptors: Vec<FilterDescriptor>,
    pending: FilterSet,
    applied: FilterSet,
}

impl FilterPanel {
    /// Creates a panel for the given columns.
    pub fn new(descriptors: Vec<FilterDescriptor>) -> AppResult<Self> {
        let mut seen = BTreeSet::new();
        for descriptor in &descriptors {
            if descriptor.key.trim().is_empty() {
                return Err(AppError::Validation(
                    "filter descriptors require a key".to_owned(),
                ));
            }
            if !seen.insert(descriptor.key.as_str()) {
                return Err(AppError::Validation(format!(
                    "duplicate filter descriptor '{}'",
                    descriptor.key
                )));
            }
        }

        Ok(Self {
            descriptors,
            pending: FilterSet::new(),
            applied: FilterSet::new(),
        })
    }

    /// Returns the column descriptors.
    #[must_use]
    pub fn descriptors(&self) -> &[FilterDescriptor] {
        &self.descriptors
    }

    /// Returns the pending (not yet applied) values.
    #[must_use]
    pub fn pending(&self) -> &FilterSet {
        &self.pending
    }

    /// Returns the applied values.
    #[must_use]
    pub fn applied(&self) -> &FilterSet {
        &self.applied
    }

    /// Stages a value for one column without applying it.
    pub fn set_pending(&mut self, key: &str, value: FilterValue) -> AppResult<()> {
        let descriptor = self.descriptor(key)?;
        if !value.is_absent() && !descriptor.kind.accepts(&value) {
            return Err(AppError::Validation(format!(
                "filter '{key}' does not accept value {value:?}"
            )));
        }

        self.pending.set(key, value);
        Ok(())
    }

    /// Commits the pending buffer; returns whether the applied set changed.
    pub fn apply(&mut self) -> bool {
        if self.applied == self.pending {
            return false;
        }

        self.applied = self.pending.clone();
        true
    }

    /// Clears pending and applied values.
    pub fn clear(&mut self) {
        self.pending = FilterSet::new();
        self.applied = FilterSet::new();
    }

    /// Removes one column from both buffers immediately.
    pub fn clear_one(&mut self, key: &str) -> bool {
        self.pending.remove(key);
        self.applied.remove(key).is_some()
    }

    /// Returns select options for a column.
    ///
    /// Without explicit options the distinct non-empty values of the loaded
    /// rows are used, so values that only exist on other pages are not offered.
    pub fn options_for(&self, key: &str, rows: &[ListRecord]) -> AppResult<Vec<String>> {
        let descriptor = self.descriptor(key)?;
        if let Some(options) = &descriptor.options {
            return Ok(options.clone());
        }

        let distinct: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.field(key).and_then(value_as_text))
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .collect();

        Ok(distinct.into_iter().collect())
    }

    fn descriptor(&self, key: &str) -> AppResult<&FilterDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.key == key)
            .ok_or_else(|| AppError::Validation(format!("unknown filter column '{key}'")))
    }
}
