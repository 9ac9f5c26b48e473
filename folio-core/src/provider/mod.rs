//! Data providers: a sorted, paginated page of records plus its total count
//!
//! A provider prepares its page lazily, the first time anything asks for it,
//! and keeps it until [`DataProvider::refresh`]. Concurrent callers that
//! arrive while the page or the total count is being computed await the
//! same in-flight computation instead of starting their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::query::{
    AttributeOrder, OrderSpec, OrderTuple, PageWindow, Pagination, PaginationSettings,
    RequestQuery, SortModel, SortSettings,
};

pub mod collection;
pub mod ids;
pub mod keys;
pub mod memo;
pub mod query;

pub use collection::{CollectionDataProvider, CollectionDataProviderBuilder};
pub use ids::ProviderIds;
pub use keys::{KeySelector, RecordKey};
pub use memo::{Memo, MemoState};
pub use query::{QueryDataProvider, QueryDataProviderBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Unprepared,
    Preparing,
    Prepared,
}

/// One prepared page. `keys()[i]` identifies `models()[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderPage<T> {
    models: Vec<T>,
    keys: Vec<RecordKey>,
}

impl<T> ProviderPage<T> {
    pub(crate) fn new(models: Vec<T>, keys: Vec<RecordKey>) -> Self {
        debug_assert_eq!(models.len(), keys.len());
        Self { models, keys }
    }

    pub fn empty() -> Self {
        Self {
            models: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn models(&self) -> &[T] {
        &self.models
    }

    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// `(key, model)` pairs in page order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &T)> {
        self.keys.iter().zip(self.models.iter())
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<RecordKey>) {
        (self.models, self.keys)
    }
}

#[async_trait]
pub trait DataProvider: Send + Sync {
    type Model: Clone + Send + Sync + 'static;

    /// Identifier used to prefix this provider's request parameters.
    fn id(&self) -> Option<&str>;

    fn state(&self) -> ProviderState;

    /// Prepare the page unless it is already prepared. `force` discards a
    /// prepared page and fetches it again; the total count is kept.
    async fn prepare(&self, force: bool) -> Result<()>;

    /// The prepared page, preparing it first if needed.
    async fn page(&self) -> Result<Arc<ProviderPage<Self::Model>>>;

    /// Number of records across all pages. Without pagination this is the
    /// size of the single page.
    async fn total_count(&self) -> Result<u64>;

    /// Seed the total count, skipping the backend count. Discards the
    /// prepared page since its window may have moved.
    fn set_total_count(&self, total_count: u64);

    /// Forget the page and the total count.
    fn refresh(&self);

    /// Snapshot of the pagination model, `None` when paging is disabled.
    fn pagination(&self) -> Option<Pagination>;

    /// Snapshot of the sort model, `None` when sorting is disabled.
    fn sort(&self) -> Option<SortModel>;

    async fn models(&self) -> Result<Vec<Self::Model>> {
        Ok(self.page().await?.models().to_vec())
    }

    async fn keys(&self) -> Result<Vec<RecordKey>> {
        Ok(self.page().await?.keys().to_vec())
    }

    /// Number of records on the current page.
    async fn count(&self) -> Result<usize> {
        Ok(self.page().await?.len())
    }
}

#[derive(Debug, Clone, Default)]
struct SortOptions {
    spec: OrderSpec,
    settings: SortSettings,
    default_order: Vec<AttributeOrder>,
}

/// Builder state shared by the provider builders.
#[derive(Debug, Clone)]
struct ProviderOptions {
    id: Option<String>,
    request: RequestQuery,
    sort: Option<SortOptions>,
    pagination: Option<PaginationSettings>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            id: None,
            request: RequestQuery::default(),
            sort: Some(SortOptions::default()),
            pagination: Some(PaginationSettings::default()),
        }
    }
}

impl ProviderOptions {
    fn sort_mut(&mut self) -> &mut SortOptions {
        self.sort.get_or_insert_with(SortOptions::default)
    }

    /// Build the models. Parameter names get the id as prefix; an empty
    /// order spec is filled from `attribute_names`.
    fn into_core<T>(self, attribute_names: impl FnOnce() -> Vec<String>) -> ProviderCore<T> {
        let ProviderOptions {
            id,
            request,
            sort,
            pagination,
        } = self;

        let sort = sort.map(|options| {
            let settings = match &id {
                Some(id) => options.settings.prefixed(id),
                None => options.settings,
            };
            let spec = if options.spec.is_empty() {
                attribute_names().into_iter().collect()
            } else {
                options.spec
            };
            Mutex::new(
                SortModel::new(spec, settings, request.clone())
                    .with_default_order(options.default_order),
            )
        });

        let pagination = pagination.map(|settings| {
            let settings = match &id {
                Some(id) => settings.prefixed(id),
                None => settings,
            };
            Mutex::new(Pagination::new(settings, request.clone()))
        });

        ProviderCore {
            id,
            sort,
            pagination,
            total: Memo::new(),
            page: Memo::new(),
        }
    }
}

/// Builder methods every provider builder forwards to its [`ProviderOptions`].
macro_rules! provider_builder_methods {
    () => {
        pub fn id(mut self, id: impl Into<String>) -> Self {
            self.options.id = Some(id.into());
            self
        }

        /// Take the next identifier from `ids`.
        pub fn ids(mut self, ids: &$crate::provider::ProviderIds) -> Self {
            self.options.id = ids.allocate();
            self
        }

        pub fn request(mut self, request: $crate::query::RequestQuery) -> Self {
            self.options.request = request;
            self
        }

        pub fn order_spec(mut self, spec: $crate::query::OrderSpec) -> Self {
            self.options.sort_mut().spec = spec;
            self
        }

        pub fn sort_settings(mut self, settings: $crate::query::SortSettings) -> Self {
            self.options.sort_mut().settings = settings;
            self
        }

        pub fn default_order(
            mut self,
            default_order: Vec<$crate::query::AttributeOrder>,
        ) -> Self {
            self.options.sort_mut().default_order = default_order;
            self
        }

        pub fn without_sort(mut self) -> Self {
            self.options.sort = None;
            self
        }

        pub fn pagination_settings(
            mut self,
            settings: $crate::query::PaginationSettings,
        ) -> Self {
            self.options.pagination = Some(settings);
            self
        }

        pub fn without_pagination(mut self) -> Self {
            self.options.pagination = None;
            self
        }
    };
}
pub(crate) use provider_builder_methods;

/// State shared by both provider kinds.
#[derive(Debug)]
struct ProviderCore<T> {
    id: Option<String>,
    sort: Option<Mutex<SortModel>>,
    pagination: Option<Mutex<Pagination>>,
    total: Memo<u64>,
    page: Memo<Arc<ProviderPage<T>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> ProviderCore<T> {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn state(&self) -> ProviderState {
        match (self.page.state(), self.total.state()) {
            (MemoState::Done, _) => ProviderState::Prepared,
            (MemoState::Pending, _) | (_, MemoState::Pending) => ProviderState::Preparing,
            _ => ProviderState::Unprepared,
        }
    }

    fn is_paginated(&self) -> bool {
        self.pagination.is_some()
    }

    fn refresh(&self) {
        self.total.reset();
        self.page.reset();
    }

    fn set_total_count(&self, total_count: u64) {
        self.total.set(total_count);
        self.page.reset();
        self.record_total(total_count);
    }

    /// Hand a resolved total count to the pagination model.
    fn record_total(&self, total_count: u64) {
        if let Some(pagination) = &self.pagination {
            lock(pagination).set_total_count(total_count);
        }
    }

    fn sort_snapshot(&self) -> Option<SortModel> {
        self.sort.as_ref().map(|sort| lock(sort).clone())
    }

    fn pagination_snapshot(&self) -> Option<Pagination> {
        self.pagination.as_ref().map(|pagination| lock(pagination).clone())
    }

    /// Mutate the sort model; the prepared page is discarded.
    fn update_sort<R>(&self, f: impl FnOnce(&mut SortModel) -> R) -> Option<R> {
        let result = self.sort.as_ref().map(|sort| f(&mut lock(sort)));
        self.page.reset();
        result
    }

    /// Mutate the pagination model; the prepared page is discarded.
    fn update_pagination<R>(&self, f: impl FnOnce(&mut Pagination) -> R) -> Option<R> {
        let result = self
            .pagination
            .as_ref()
            .map(|pagination| f(&mut lock(pagination)));
        self.page.reset();
        result
    }

    /// Physical orders for the current sort state.
    fn orders(&self) -> Result<Vec<OrderTuple>> {
        match &self.sort {
            Some(sort) => lock(sort).orders(false),
            None => Ok(Vec::new()),
        }
    }

    /// Feed the total count to the pagination model and read its window.
    fn window(&self, total_count: u64) -> PageWindow {
        match &self.pagination {
            Some(pagination) => {
                let mut pagination = lock(pagination);
                pagination.set_total_count(total_count);
                pagination.window()
            }
            None => PageWindow::UNBOUNDED,
        }
    }
}
