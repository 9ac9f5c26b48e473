//! Shared fakes for provider integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use folio_core::adapter::BackendAdapter;
use folio_core::query::{
    Column, ComparisonMode, MultiKeySort, OrderTuple, PageWindow,
};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
#[error("fake backend unavailable")]
pub struct FakeBackendError;

/// What the provider pushed into the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeQuery {
    pub orders: Vec<OrderTuple>,
    pub window: Option<PageWindow>,
}

/// In-memory backend that counts calls and can be told to fail.
#[derive(Debug)]
pub struct FakeAdapter {
    rows: Vec<Value>,
    latency: Duration,
    primary_key: Option<String>,
    attributes: Vec<String>,
    pub count_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    failing_counts: AtomicUsize,
    failing_fetches: AtomicUsize,
    pub last_query: Mutex<Option<FakeQuery>>,
}

impl FakeAdapter {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            latency: Duration::from_millis(5),
            primary_key: None,
            attributes: Vec::new(),
            count_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            failing_counts: AtomicUsize::new(0),
            failing_fetches: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn with_primary_key(mut self, field: &str) -> Self {
        self.primary_key = Some(field.to_string());
        self
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes = names.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Fail the next `n` count calls.
    pub fn fail_counts(&self, n: usize) {
        self.failing_counts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` fetch calls.
    pub fn fail_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    pub fn counts(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<FakeQuery> {
        self.last_query.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BackendAdapter for FakeAdapter {
    type Query = FakeQuery;
    type Record = Value;
    type Error = FakeBackendError;

    async fn find_page(&self, query: &FakeQuery) -> Result<Vec<Value>, FakeBackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if Self::take_failure(&self.failing_fetches) {
            return Err(FakeBackendError);
        }
        *self.last_query.lock().unwrap() = Some(query.clone());

        let sorter = MultiKeySort::new(
            query.orders.iter().map(|o| Column::from(o.field.as_str())).collect(),
            query.orders.iter().map(|o| o.direction).collect(),
            vec![ComparisonMode::Natural; query.orders.len()],
        )
        .unwrap();
        let mut rows = self.rows.clone();
        sorter.sort(&mut rows).unwrap();

        let range = query.window.unwrap_or(PageWindow::UNBOUNDED).range(rows.len());
        Ok(rows[range].to_vec())
    }

    async fn count(&self, _query: &FakeQuery) -> Result<u64, FakeBackendError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if Self::take_failure(&self.failing_counts) {
            return Err(FakeBackendError);
        }
        Ok(self.rows.len() as u64)
    }

    fn apply_sort(&self, mut query: FakeQuery, orders: &[OrderTuple]) -> FakeQuery {
        query.orders = orders.to_vec();
        query
    }

    fn apply_pagination(&self, mut query: FakeQuery, window: PageWindow) -> FakeQuery {
        query.window = Some(window);
        query
    }

    fn primary_key_field(&self) -> Option<String> {
        self.primary_key.clone()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.clone()
    }
}

/// `count` books titled `Book 000`, `Book 001`, ... with ids from 1.
pub fn numbered_books(count: usize) -> Vec<Value> {
    (0..count)
        .map(|idx| {
            json!({
                "id": idx + 1,
                "title": format!("Book {idx:03}"),
                "year": 1950 + (idx % 7),
            })
        })
        .collect()
}
