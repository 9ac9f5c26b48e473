use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    DataProvider, KeySelector, ProviderCore, ProviderOptions, ProviderPage, ProviderState,
    RecordKey,
};
use crate::error::Result;
use crate::query::{
    Column, ComparisonMode, MultiKeySort, OrderTuple, PageWindow, Pagination, Record,
    SortModel,
};

/// Provider over records already in memory.
///
/// Sorting runs through [`MultiKeySort`] and paging slices the sorted
/// records. Without a key selector a record's key is its index in the
/// original collection.
pub struct CollectionDataProvider<T> {
    inner: Arc<CollectionInner<T>>,
}

struct CollectionInner<T> {
    records: Arc<Vec<T>>,
    key: Option<KeySelector<T>>,
    mode: ComparisonMode,
    core: ProviderCore<T>,
}

impl<T> Clone for CollectionDataProvider<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for CollectionDataProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDataProvider")
            .field("id", &self.inner.core.id())
            .field("state", &self.inner.core.state())
            .field("records", &self.inner.records.len())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

impl<T> CollectionDataProvider<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    pub fn builder(records: impl Into<Arc<Vec<T>>>) -> CollectionDataProviderBuilder<T> {
        CollectionDataProviderBuilder {
            records: records.into(),
            key: None,
            mode: ComparisonMode::Natural,
            options: ProviderOptions::default(),
        }
    }

    pub fn records(&self) -> &[T] {
        &self.inner.records
    }

    /// Change the sort model in place. The prepared page is discarded.
    pub fn with_sort_mut<R>(&self, f: impl FnOnce(&mut SortModel) -> R) -> Option<R> {
        self.inner.core.update_sort(f)
    }

    /// Change the pagination model in place. The prepared page is discarded.
    pub fn with_pagination_mut<R>(&self, f: impl FnOnce(&mut Pagination) -> R) -> Option<R> {
        self.inner.core.update_pagination(f)
    }
}

impl<T> CollectionInner<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    fn total(&self) -> u64 {
        self.records.len() as u64
    }

    async fn counted_total(self: &Arc<Self>) -> Result<u64> {
        let total = self.total();
        let total = self
            .core
            .total
            .get_or_try_init(move || async move { Ok(total) })
            .await?;
        self.core.record_total(total);
        Ok(total)
    }

    async fn page(self: &Arc<Self>) -> Result<Arc<ProviderPage<T>>> {
        let inner = Arc::clone(self);
        self.core
            .page
            .get_or_try_init(move || async move { inner.load_page().await.map(Arc::new) })
            .await
    }

    async fn load_page(self: Arc<Self>) -> Result<ProviderPage<T>> {
        let orders = self.core.orders()?;

        let window = if self.core.is_paginated() {
            let total = self.counted_total().await?;
            let window = self.core.window(total);
            if total == 0 {
                return Ok(ProviderPage::empty());
            }
            window
        } else {
            PageWindow::UNBOUNDED
        };

        let order = self.sorted_indices(&orders)?;
        let selected = &order[window.range(order.len())];

        let models: Vec<T> = selected
            .iter()
            .map(|&idx| self.records[idx].clone())
            .collect();
        let keys = match &self.key {
            Some(selector) => models.iter().map(|model| selector.key_of(model)).collect(),
            None => selected.iter().copied().map(RecordKey::Position).collect(),
        };

        debug!(
            provider = ?self.core.id(),
            models = models.len(),
            offset = window.offset,
            "prepared in-memory page"
        );
        Ok(ProviderPage::new(models, keys))
    }

    /// Original indices in sorted order.
    fn sorted_indices(&self, orders: &[OrderTuple]) -> Result<Vec<usize>> {
        if orders.is_empty() {
            return Ok((0..self.records.len()).collect());
        }
        let sorter = MultiKeySort::new(
            orders
                .iter()
                .map(|order| Column::Name(order.field.clone()))
                .collect(),
            orders.iter().map(|order| order.direction).collect(),
            vec![self.mode; orders.len()],
        )?;
        sorter.permutation(&self.records)
    }
}

#[async_trait]
impl<T> DataProvider for CollectionDataProvider<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    type Model = T;

    fn id(&self) -> Option<&str> {
        self.inner.core.id()
    }

    fn state(&self) -> ProviderState {
        self.inner.core.state()
    }

    async fn prepare(&self, force: bool) -> Result<()> {
        if force {
            self.inner.core.page.reset();
        }
        self.inner.page().await.map(drop)
    }

    async fn page(&self) -> Result<Arc<ProviderPage<T>>> {
        self.inner.page().await
    }

    async fn total_count(&self) -> Result<u64> {
        if self.inner.core.is_paginated() {
            self.inner.counted_total().await
        } else {
            Ok(self.inner.page().await?.len() as u64)
        }
    }

    fn set_total_count(&self, total_count: u64) {
        self.inner.core.set_total_count(total_count);
    }

    fn refresh(&self) {
        self.inner.core.refresh();
    }

    fn pagination(&self) -> Option<Pagination> {
        self.inner.core.pagination_snapshot()
    }

    fn sort(&self) -> Option<SortModel> {
        self.inner.core.sort_snapshot()
    }
}

pub struct CollectionDataProviderBuilder<T> {
    records: Arc<Vec<T>>,
    key: Option<KeySelector<T>>,
    mode: ComparisonMode,
    options: ProviderOptions,
}

impl<T> fmt::Debug for CollectionDataProviderBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDataProviderBuilder")
            .field("records", &self.records.len())
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}

impl<T> CollectionDataProviderBuilder<T>
where
    T: Record + Clone + Send + Sync + 'static,
{
    super::provider_builder_methods!();

    pub fn key(mut self, key: KeySelector<T>) -> Self {
        self.key = Some(key);
        self
    }

    /// How sort values are compared; natural by default.
    pub fn comparison_mode(mut self, mode: ComparisonMode) -> Self {
        self.mode = mode;
        self
    }

    /// An empty order spec is left empty: the collection has no schema to
    /// read attribute names from.
    pub fn build(self) -> CollectionDataProvider<T> {
        CollectionDataProvider {
            inner: Arc::new(CollectionInner {
                records: self.records,
                key: self.key,
                mode: self.mode,
                core: self.options.into_core(Vec::new),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{AttributeOrder, OrderSpec, PaginationSettings, RequestQuery};
    use serde_json::{Value, json};

    fn books() -> Vec<Value> {
        vec![
            json!({"id": 10, "title": "Hyperion", "year": 1989}),
            json!({"id": 11, "title": "Dune", "year": 1965}),
            json!({"id": 12, "title": "Neuromancer", "year": 1984}),
            json!({"id": 13, "title": "Foundation", "year": 1951}),
            json!({"id": 14, "title": "Solaris", "year": 1961}),
        ]
    }

    fn titles(page: &ProviderPage<Value>) -> Vec<&str> {
        page.models()
            .iter()
            .map(|book| book["title"].as_str().unwrap_or_default())
            .collect()
    }

    fn spec() -> OrderSpec {
        ["title", "year"].into_iter().collect()
    }

    #[tokio::test]
    async fn sorts_and_pages_in_memory() {
        let provider = CollectionDataProvider::builder(books())
            .request(RequestQuery::from_target("/books?sort=-year&page=2&per-page=2"))
            .order_spec(spec())
            .build();

        let page = provider.page().await.unwrap();
        assert_eq!(titles(&page), vec!["Dune", "Solaris"]);
        assert_eq!(page.keys(), &[RecordKey::Position(1), RecordKey::Position(4)]);
        assert_eq!(provider.total_count().await.unwrap(), 5);
        assert_eq!(provider.count().await.unwrap(), 2);
        assert_eq!(provider.state(), ProviderState::Prepared);
    }

    #[tokio::test]
    async fn key_selector_overrides_positions() {
        let provider = CollectionDataProvider::builder(books())
            .order_spec(spec())
            .default_order(vec![AttributeOrder::asc("title")])
            .key(KeySelector::field("id"))
            .build();

        let keys = provider.keys().await.unwrap();
        assert_eq!(keys[0].to_string(), "11");
        assert_eq!(keys.len(), 5);
    }

    #[tokio::test]
    async fn unpaginated_total_is_page_size() {
        let provider = CollectionDataProvider::builder(books())
            .without_pagination()
            .without_sort()
            .build();
        assert_eq!(provider.total_count().await.unwrap(), 5);
        assert_eq!(titles(&provider.page().await.unwrap())[0], "Hyperion");
        assert!(provider.pagination().is_none());
        assert!(provider.sort().is_none());
    }

    #[tokio::test]
    async fn empty_collection_yields_empty_page() {
        let provider = CollectionDataProvider::builder(Vec::<Value>::new()).build();
        let page = provider.page().await.unwrap();
        assert!(page.is_empty());
        assert_eq!(provider.total_count().await.unwrap(), 0);
        assert_eq!(provider.pagination().unwrap().page_count(), 0);
    }

    #[tokio::test]
    async fn sort_changes_discard_prepared_page() {
        let provider = CollectionDataProvider::builder(books())
            .order_spec(spec())
            .default_order(vec![AttributeOrder::asc("year")])
            .build();
        assert_eq!(titles(&provider.page().await.unwrap())[0], "Foundation");

        provider.with_sort_mut(|sort| {
            sort.set_attribute_orders(vec![AttributeOrder::desc("title")], true)
        });
        assert_eq!(provider.state(), ProviderState::Unprepared);
        assert_eq!(titles(&provider.page().await.unwrap())[0], "Solaris");
    }

    #[tokio::test]
    async fn prefixed_parameters_with_id() {
        let request = RequestQuery::from_target("/books?page=2&grid-page=3&per-page=1");
        let provider = CollectionDataProvider::builder(books())
            .id("grid")
            .request(request)
            .pagination_settings(PaginationSettings {
                default_page_size: 2,
                ..PaginationSettings::default()
            })
            .build();

        let page = provider.page().await.unwrap();
        assert_eq!(titles(&page), vec!["Solaris"]);
        let pagination = provider.pagination().unwrap();
        assert_eq!(pagination.settings().page_param, "grid-page");
    }

    #[tokio::test]
    async fn lexicographic_mode_compares_as_text() {
        let records = vec![
            json!({"code": 10}),
            json!({"code": 9}),
            json!({"code": 100}),
        ];
        let provider = CollectionDataProvider::builder(records)
            .order_spec(OrderSpec::new().column("code"))
            .default_order(vec![AttributeOrder::asc("code")])
            .comparison_mode(ComparisonMode::Lexicographic)
            .build();

        let codes: Vec<i64> = provider
            .models()
            .await
            .unwrap()
            .iter()
            .filter_map(|row| row["code"].as_i64())
            .collect();
        assert_eq!(codes, vec![10, 100, 9]);
    }
}
