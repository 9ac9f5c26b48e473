//! Sort values extracted from records
//!
//! Records handed to the in-memory sorter are heterogeneous (documents,
//! maps, positional rows), so every column value is lifted into a
//! [`SortValue`] and compared under a [`ComparisonMode`].

use super::direction::ComparisonMode;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Dynamically typed scalar taken from one column of a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SortValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SortValue::Null)
    }

    /// Numeric view of the value, if it has one without coercion.
    fn as_number(&self) -> Option<Number> {
        match self {
            SortValue::Int(v) => Some(Number::Int(*v)),
            SortValue::Float(v) => Some(Number::Float(*v)),
            SortValue::Bool(v) => Some(Number::Int(i64::from(*v))),
            SortValue::Text(s) => parse_numeric_str(s),
            SortValue::Null => None,
        }
    }

    /// Forced numeric view: anything without a numeric reading counts as 0.
    fn coerce_number(&self) -> Number {
        match self {
            SortValue::Text(s) => {
                parse_numeric_str(s).unwrap_or_else(|| leading_number(s))
            }
            other => other.as_number().unwrap_or(Number::Int(0)),
        }
    }

    /// String view used by lexicographic comparison.
    pub fn to_text(&self) -> String {
        match self {
            SortValue::Null => String::new(),
            SortValue::Bool(true) => "1".to_string(),
            SortValue::Bool(false) => String::new(),
            SortValue::Int(v) => v.to_string(),
            SortValue::Float(v) => v.to_string(),
            SortValue::Text(s) => s.clone(),
        }
    }

    /// Compare two values under `mode`, ascending.
    pub fn compare(&self, other: &Self, mode: ComparisonMode) -> Ordering {
        match mode {
            ComparisonMode::Natural => compare_natural(self, other),
            ComparisonMode::Numeric => {
                self.coerce_number().cmp_number(&other.coerce_number())
            }
            ComparisonMode::Lexicographic => {
                self.to_text().cmp(&other.to_text())
            }
        }
    }
}

impl fmt::Display for SortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortValue::Null => f.write_str("null"),
            SortValue::Bool(v) => write!(f, "{v}"),
            SortValue::Int(v) => write!(f, "{v}"),
            SortValue::Float(v) => write!(f, "{v}"),
            SortValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn cmp_number(&self, other: &Number) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            (Number::Float(a), Number::Float(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(*a, *b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(*b, *a).reverse(),
        }
    }
}

/// Exact `i64` against `f64`; a cast to `f64` would round integers past
/// 2^53 and make mixed columns intransitive. NaN sorts last, as with
/// [`OrderedFloat`].
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float above every i64.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() || float >= I64_END {
        return Ordering::Less;
    }
    if float < -I64_END {
        return Ordering::Greater;
    }
    let floor = float.floor();
    match int.cmp(&(floor as i64)) {
        Ordering::Equal if float > floor => Ordering::Less,
        ordering => ordering,
    }
}

fn parse_numeric_str(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(Number::Int(v));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Number::Float)
}

/// Longest numeric prefix of `raw`, 0 when there is none.
fn leading_number(raw: &str) -> Number {
    let trimmed = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }
    if !seen_digit {
        return Number::Int(0);
    }
    parse_numeric_str(&trimmed[..end]).unwrap_or(Number::Int(0))
}

/// Nulls first, then anything with a numeric reading (compared as numbers),
/// then remaining text (compared bytewise). Keeps the order total so mixed
/// columns cannot produce a cyclic comparison.
fn compare_natural(a: &SortValue, b: &SortValue) -> Ordering {
    fn class(value: &SortValue) -> u8 {
        match value {
            SortValue::Null => 0,
            SortValue::Text(s) if parse_numeric_str(s).is_none() => 2,
            _ => 1,
        }
    }

    class(a).cmp(&class(b)).then_with(|| {
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.cmp_number(&y),
            _ => match (a, b) {
                (SortValue::Text(x), SortValue::Text(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
        }
    })
}

macro_rules! sort_value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for SortValue {
            fn from(value: $ty) -> Self {
                SortValue::Int(i64::from(value))
            }
        })*
    };
}

sort_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for SortValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(SortValue::Int)
            .unwrap_or(SortValue::Float(value as f64))
    }
}

impl From<usize> for SortValue {
    fn from(value: usize) -> Self {
        SortValue::from(value as u64)
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Float(value)
    }
}

impl From<f32> for SortValue {
    fn from(value: f32) -> Self {
        SortValue::Float(f64::from(value))
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        SortValue::Bool(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        SortValue::Text(value)
    }
}

impl<T: Into<SortValue>> From<Option<T>> for SortValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SortValue::Null)
    }
}

impl From<&serde_json::Value> for SortValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => SortValue::Null,
            Value::Bool(b) => SortValue::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(SortValue::Int)
                .or_else(|| n.as_f64().map(SortValue::Float))
                .unwrap_or(SortValue::Null),
            Value::String(s) => SortValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                SortValue::Text(value.to_string())
            }
        }
    }
}

/// Address of a value inside a record: a named field or a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Name(String),
    Position(usize),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Name(name) => f.write_str(name),
            Column::Position(pos) => write!(f, "#{pos}"),
        }
    }
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        Column::Name(value.to_string())
    }
}

impl From<String> for Column {
    fn from(value: String) -> Self {
        Column::Name(value)
    }
}

impl From<usize> for Column {
    fn from(value: usize) -> Self {
        Column::Position(value)
    }
}

/// Anything the engine can read sort and key values from.
///
/// Missing columns read as [`SortValue::Null`].
pub trait Record {
    fn value(&self, column: &Column) -> SortValue;
}

impl Record for serde_json::Value {
    fn value(&self, column: &Column) -> SortValue {
        let found = match column {
            Column::Name(name) => self.get(name.as_str()),
            Column::Position(pos) => self.get(*pos),
        };
        found.map(SortValue::from).unwrap_or_default()
    }
}

impl Record for BTreeMap<String, SortValue> {
    fn value(&self, column: &Column) -> SortValue {
        match column {
            Column::Name(name) => self.get(name).cloned().unwrap_or_default(),
            Column::Position(_) => SortValue::Null,
        }
    }
}

impl<S: std::hash::BuildHasher> Record for HashMap<String, SortValue, S> {
    fn value(&self, column: &Column) -> SortValue {
        match column {
            Column::Name(name) => self.get(name).cloned().unwrap_or_default(),
            Column::Position(_) => SortValue::Null,
        }
    }
}

impl Record for Vec<SortValue> {
    fn value(&self, column: &Column) -> SortValue {
        match column {
            Column::Position(pos) => self.get(*pos).cloned().unwrap_or_default(),
            Column::Name(_) => SortValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn natural_compares_numbers_numerically() {
        let two = SortValue::Int(2);
        let ten = SortValue::Float(10.0);
        assert_eq!(two.compare(&ten, ComparisonMode::Natural), Ordering::Less);
    }

    #[test]
    fn natural_treats_numeric_strings_as_numbers() {
        let a = SortValue::from("9");
        let b = SortValue::from("10");
        assert_eq!(a.compare(&b, ComparisonMode::Natural), Ordering::Less);
        assert_eq!(
            a.compare(&b, ComparisonMode::Lexicographic),
            Ordering::Greater
        );
    }

    #[test]
    fn natural_puts_null_first() {
        let null = SortValue::Null;
        let text = SortValue::from("a");
        assert_eq!(null.compare(&text, ComparisonMode::Natural), Ordering::Less);
        assert_eq!(text.compare(&null, ComparisonMode::Natural), Ordering::Greater);
    }

    #[test]
    fn natural_orders_numbers_before_plain_text() {
        let mut values = vec![
            SortValue::from("1a"),
            SortValue::from("10"),
            SortValue::Int(2),
            SortValue::Null,
        ];
        values.sort_by(|a, b| a.compare(b, ComparisonMode::Natural));
        assert_eq!(
            values,
            vec![
                SortValue::Null,
                SortValue::Int(2),
                SortValue::from("10"),
                SortValue::from("1a"),
            ]
        );
    }

    #[test]
    fn numeric_coerces_leading_digits() {
        let a = SortValue::from("12abc");
        let b = SortValue::Int(3);
        assert_eq!(a.compare(&b, ComparisonMode::Numeric), Ordering::Greater);
        let junk = SortValue::from("abc");
        assert_eq!(
            junk.compare(&SortValue::Int(0), ComparisonMode::Numeric),
            Ordering::Equal
        );
    }

    #[test]
    fn json_records_read_fields_and_positions() {
        let doc = json!({ "title": "Dune", "year": 1965 });
        assert_eq!(doc.value(&"title".into()), SortValue::from("Dune"));
        assert_eq!(doc.value(&"year".into()), SortValue::Int(1965));
        assert_eq!(doc.value(&"missing".into()), SortValue::Null);

        let row = json!(["a", 2]);
        assert_eq!(row.value(&Column::Position(1)), SortValue::Int(2));
    }

    #[test]
    fn mixed_int_float_order_is_exact_past_f64_precision() {
        let big = 1_i64 << 53;
        let int = SortValue::Int(big);
        let next = SortValue::Int(big + 1);
        let float = SortValue::Float(big as f64);

        for mode in [ComparisonMode::Natural, ComparisonMode::Numeric] {
            assert_eq!(int.compare(&float, mode), Ordering::Equal);
            assert_eq!(float.compare(&next, mode), Ordering::Less);
            assert_eq!(next.compare(&float, mode), Ordering::Greater);
            assert_eq!(int.compare(&next, mode), Ordering::Less);
        }

        assert_eq!(
            SortValue::Int(3).compare(&SortValue::Float(3.5), ComparisonMode::Numeric),
            Ordering::Less
        );
        assert_eq!(
            SortValue::Int(-4).compare(&SortValue::Float(-3.5), ComparisonMode::Numeric),
            Ordering::Less
        );
        assert_eq!(
            SortValue::Int(i64::MAX).compare(&SortValue::Float(1e19), ComparisonMode::Numeric),
            Ordering::Less
        );
        assert_eq!(
            SortValue::Int(i64::MIN).compare(&SortValue::Float(-1e19), ComparisonMode::Numeric),
            Ordering::Greater
        );
    }

    #[test]
    fn large_u64_falls_back_to_float() {
        assert!(matches!(SortValue::from(u64::MAX), SortValue::Float(_)));
        assert_eq!(SortValue::from(7u64), SortValue::Int(7));
    }
}
