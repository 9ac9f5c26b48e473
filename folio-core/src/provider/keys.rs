use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::query::{Column, Record, SortValue};

/// Identifier of one record on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordKey {
    Single(SortValue),
    /// `(field, value)` pairs in selector order.
    Composite(Vec<(String, SortValue)>),
    /// Index of the record, used when nothing better is known.
    Position(usize),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Single(value) => write!(f, "{value}"),
            RecordKey::Composite(parts) => {
                for (idx, (field, value)) in parts.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{field}={value}")?;
                }
                Ok(())
            }
            RecordKey::Position(idx) => write!(f, "{idx}"),
        }
    }
}

/// How a provider derives [`RecordKey`]s from its records.
pub enum KeySelector<T> {
    Field(String),
    Fields(Vec<String>),
    With(Arc<dyn Fn(&T) -> RecordKey + Send + Sync>),
}

impl<T> KeySelector<T> {
    pub fn field(name: impl Into<String>) -> Self {
        KeySelector::Field(name.into())
    }

    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeySelector::Fields(names.into_iter().map(Into::into).collect())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&T) -> RecordKey + Send + Sync + 'static,
    {
        KeySelector::With(Arc::new(f))
    }
}

impl<T: Record> KeySelector<T> {
    pub fn key_of(&self, record: &T) -> RecordKey {
        match self {
            KeySelector::Field(name) => {
                RecordKey::Single(record.value(&Column::Name(name.clone())))
            }
            KeySelector::Fields(names) => RecordKey::Composite(
                names
                    .iter()
                    .map(|name| {
                        (name.clone(), record.value(&Column::Name(name.clone())))
                    })
                    .collect(),
            ),
            KeySelector::With(f) => f(record),
        }
    }
}

impl<T> Clone for KeySelector<T> {
    fn clone(&self) -> Self {
        match self {
            KeySelector::Field(name) => KeySelector::Field(name.clone()),
            KeySelector::Fields(names) => KeySelector::Fields(names.clone()),
            KeySelector::With(f) => KeySelector::With(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for KeySelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Field(name) => f.debug_tuple("Field").field(name).finish(),
            KeySelector::Fields(names) => f.debug_tuple("Fields").field(names).finish(),
            KeySelector::With(_) => f.write_str("With(<fn>)"),
        }
    }
}
