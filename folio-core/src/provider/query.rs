use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    DataProvider, KeySelector, ProviderCore, ProviderOptions, ProviderPage, ProviderState,
    RecordKey,
};
use crate::adapter::BackendAdapter;
use crate::error::{EngineError, Result};
use crate::query::{Pagination, SortModel};

/// Provider that pushes sorting and paging into a [`BackendAdapter`].
pub struct QueryDataProvider<A: BackendAdapter> {
    inner: Arc<QueryInner<A>>,
}

struct QueryInner<A: BackendAdapter> {
    adapter: Arc<A>,
    query: A::Query,
    key: Option<KeySelector<A::Record>>,
    core: ProviderCore<A::Record>,
}

impl<A: BackendAdapter> Clone for QueryDataProvider<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: BackendAdapter> fmt::Debug for QueryDataProvider<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDataProvider")
            .field("id", &self.inner.core.id())
            .field("state", &self.inner.core.state())
            .field("key", &self.inner.key)
            .finish()
    }
}

impl<A: BackendAdapter> QueryDataProvider<A> {
    /// Provider over `query`, the unsorted and unpaged base query.
    pub fn builder(adapter: Arc<A>, query: A::Query) -> QueryDataProviderBuilder<A> {
        QueryDataProviderBuilder {
            adapter,
            query,
            key: None,
            options: ProviderOptions::default(),
        }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.inner.adapter
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

impl<A: BackendAdapter> QueryInner<A> {
    async fn backend_count(&self) -> Result<u64> {
        debug!(provider = ?self.core.id(), "counting records");
        self.adapter.count(&self.query).await.map_err(|err| {
            warn!(provider = ?self.core.id(), error = %err, "backend count failed");
            EngineError::backend(err)
        })
    }

    /// Memoized backend count.
    async fn counted_total(self: &Arc<Self>) -> Result<u64> {
        let inner = Arc::clone(self);
        let total = self
            .core
            .total
            .get_or_try_init(move || async move { inner.backend_count().await })
            .await?;
        self.core.record_total(total);
        Ok(total)
    }

    async fn page(self: &Arc<Self>) -> Result<Arc<ProviderPage<A::Record>>> {
        let inner = Arc::clone(self);
        self.core
            .page
            .get_or_try_init(move || async move { inner.load_page().await.map(Arc::new) })
            .await
    }

    async fn load_page(self: Arc<Self>) -> Result<ProviderPage<A::Record>> {
        let orders = self.core.orders()?;
        let mut query = self.query.clone();

        if self.core.is_paginated() {
            let total = self.counted_total().await?;
            let window = self.core.window(total);
            if total == 0 {
                debug!(provider = ?self.core.id(), "no records; skipping fetch");
                return Ok(ProviderPage::empty());
            }
            query = self.adapter.apply_pagination(query, window);
        }
        if !orders.is_empty() {
            query = self.adapter.apply_sort(query, &orders);
        }

        let models = self.adapter.find_page(&query).await.map_err(|err| {
            warn!(provider = ?self.core.id(), error = %err, "backend fetch failed");
            EngineError::backend(err)
        })?;
        let keys = self.keys_for(&models);
        debug!(
            provider = ?self.core.id(),
            models = models.len(),
            orders = orders.len(),
            "prepared page"
        );
        Ok(ProviderPage::new(models, keys))
    }

    /// Configured selector, else the adapter's primary key, else position.
    fn keys_for(&self, models: &[A::Record]) -> Vec<RecordKey> {
        let selector = self
            .key
            .clone()
            .or_else(|| self.adapter.primary_key_field().map(KeySelector::Field));
        match selector {
            Some(selector) => models.iter().map(|model| selector.key_of(model)).collect(),
            None => (0..models.len()).map(RecordKey::Position).collect(),
        }
    }
}

#[async_trait]
impl<A: BackendAdapter> DataProvider for QueryDataProvider<A> {
    type Model = A::Record;

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

    async fn page(&self) -> Result<Arc<ProviderPage<A::Record>>> {
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

pub struct QueryDataProviderBuilder<A: BackendAdapter> {
    adapter: Arc<A>,
    query: A::Query,
    key: Option<KeySelector<A::Record>>,
    options: ProviderOptions,
}

impl<A: BackendAdapter> fmt::Debug for QueryDataProviderBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDataProviderBuilder")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<A: BackendAdapter> QueryDataProviderBuilder<A> {
    super::provider_builder_methods!();

    pub fn key(mut self, key: KeySelector<A::Record>) -> Self {
        self.key = Some(key);
        self
    }

    /// An empty order spec is filled with the adapter's attribute names.
    pub fn build(self) -> QueryDataProvider<A> {
        let adapter = self.adapter;
        let core = self.options.into_core(|| adapter.attribute_names());
        QueryDataProvider {
            inner: Arc::new(QueryInner {
                adapter,
                query: self.query,
                key: self.key,
                core,
            }),
        }
    }
}
