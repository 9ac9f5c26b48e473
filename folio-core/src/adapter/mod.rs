//! The seam between providers and a concrete data store

use async_trait::async_trait;
use std::error::Error as StdError;

use crate::query::{OrderTuple, PageWindow, Record};

#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres;

/// Operations a store must support to back a
/// [`QueryDataProvider`](crate::provider::QueryDataProvider).
///
/// `apply_sort` and `apply_pagination` are pure: they return a new query and
/// leave the caller's copy untouched, so one base query can serve counting
/// and fetching.
#[async_trait]
pub trait BackendAdapter: Send + Sync + 'static {
    /// Backend-specific query description.
    type Query: Clone + Send + Sync + 'static;
    /// One result row.
    type Record: Record + Clone + Send + Sync + 'static;
    type Error: StdError + Send + Sync + 'static;

    async fn find_page(
        &self,
        query: &Self::Query,
    ) -> Result<Vec<Self::Record>, Self::Error>;

    /// Total matching records, ignoring any ordering and windowing on `query`.
    async fn count(&self, query: &Self::Query) -> Result<u64, Self::Error>;

    fn apply_sort(&self, query: Self::Query, orders: &[OrderTuple]) -> Self::Query;

    fn apply_pagination(&self, query: Self::Query, window: PageWindow) -> Self::Query;

    /// Field that uniquely identifies a record, if the store has one.
    fn primary_key_field(&self) -> Option<String> {
        None
    }

    /// Fields that may be sorted on.
    fn attribute_names(&self) -> Vec<String> {
        Vec::new()
    }
}
