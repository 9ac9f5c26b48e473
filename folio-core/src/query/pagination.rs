//! Page/page-size state and the offsets and links derived from it
//!
//! The page and page size are read lazily from the request the first time
//! they are needed. The page is 1-based on the wire and 0-based here. A page
//! size of `0` means a single unbounded page.
//!
//! Anything derived from the total count (page count, page clamping, links)
//! is only meaningful after [`Pagination::set_total_count`] has been called
//! with the backend's count.

use super::request::{QueryParams, RequestQuery, find_param, remove_param, set_param};
use super::settings::PaginationSettings;
use serde::Serialize;
use tracing::debug;

/// Offset/limit window handed to backend adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub offset: u64,
    /// `None` when the page is unbounded.
    pub limit: Option<u64>,
}

impl PageWindow {
    pub const UNBOUNDED: PageWindow = PageWindow {
        offset: 0,
        limit: None,
    };

    /// Index range of this window inside a sequence of `len` items.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX).min(len);
        let end = match self.limit {
            Some(limit) => start
                .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
                .min(len),
            None => len,
        };
        start..end
    }
}

/// Navigation links for the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    #[serde(rename = "self")]
    pub current: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl PageLinks {
    /// `(rel, url)` pairs in `self, first, last, prev, next` order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        std::iter::once(("self", self.current.as_str())).chain(
            [
                ("first", &self.first),
                ("last", &self.last),
                ("prev", &self.prev),
                ("next", &self.next),
            ]
            .into_iter()
            .filter_map(|(rel, url)| url.as_deref().map(|url| (rel, url))),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageSource {
    Request,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    settings: PaginationSettings,
    request: RequestQuery,
    params: Option<QueryParams>,
    total_count: u64,
    page: Option<(u64, PageSource)>,
    page_size: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(PaginationSettings::default(), RequestQuery::default())
    }
}

impl Pagination {
    pub fn new(settings: PaginationSettings, request: RequestQuery) -> Self {
        Self {
            settings,
            request,
            params: None,
            total_count: 0,
            page: None,
            page_size: None,
        }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    pub fn request(&self) -> &RequestQuery {
        &self.request
    }

    /// Replace the settings; lazily derived page and page size are
    /// recomputed on next access.
    pub fn set_settings(&mut self, settings: PaginationSettings) {
        self.settings = settings;
        self.invalidate();
    }

    /// Use `params` instead of the request's own query string.
    pub fn set_params(&mut self, params: QueryParams) {
        self.params = Some(params);
        self.invalidate();
    }

    pub fn set_request(&mut self, request: RequestQuery) {
        self.request = request;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.page = None;
        self.page_size = None;
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Record the backend's total. A page derived from the request is
    /// re-validated against the new count on next access.
    pub fn set_total_count(&mut self, total_count: u64) {
        if self.total_count != total_count
            && matches!(self.page, Some((_, PageSource::Request)))
        {
            self.page = None;
        }
        self.total_count = total_count;
    }

    pub fn page_count(&mut self) -> u64 {
        let page_size = self.page_size();
        if page_size < 1 {
            if self.total_count > 0 { 1 } else { 0 }
        } else {
            self.total_count.div_ceil(page_size)
        }
    }

    /// Zero-based current page.
    pub fn page(&mut self, recalculate: bool) -> u64 {
        if recalculate || self.page.is_none() {
            let wire = self.int_param(&self.settings.page_param).unwrap_or(1);
            self.set_page_value(wire.saturating_sub(1), true);
            if let Some((page, _)) = self.page {
                self.page = Some((page, PageSource::Request));
            }
        }
        self.page.map(|(page, _)| page).unwrap_or(0)
    }

    /// Set the zero-based page. With `validate` (and validation enabled in
    /// the settings) the page is clamped to the last available page; it is
    /// never negative.
    pub fn set_page(&mut self, value: i64, validate: bool) {
        self.set_page_value(value, validate);
    }

    fn set_page_value(&mut self, mut value: i64, validate: bool) {
        if validate && self.settings.validate_page {
            let page_count =
                i64::try_from(self.page_count()).unwrap_or(i64::MAX);
            if value >= page_count {
                value = page_count - 1;
            }
        }
        let page = u64::try_from(value).unwrap_or(0);
        self.page = Some((page, PageSource::Explicit));
    }

    /// Items per page; `0` means everything on one page.
    pub fn page_size(&mut self) -> u64 {
        if let Some(size) = self.page_size {
            return size;
        }

        match self.settings.page_size_limit {
            Some(_) => {
                let requested = self
                    .int_param(&self.settings.page_size_param)
                    .unwrap_or(self.default_page_size_i64());
                self.set_page_size(requested, true);
            }
            None => {
                let default = self.default_page_size_i64();
                self.set_page_size(default, false);
            }
        }
        self.page_size.unwrap_or(self.settings.default_page_size)
    }

    /// Set the page size. With `validate` it is clamped into the configured
    /// limit; negative values mean unbounded.
    pub fn set_page_size(&mut self, value: i64, validate: bool) {
        let mut size = u64::try_from(value).unwrap_or(0);
        if validate && let Some((min, max)) = self.settings.page_size_limit {
            size = size.clamp(min, max.max(min));
        }
        self.page_size = Some(size);
    }

    fn default_page_size_i64(&self) -> i64 {
        i64::try_from(self.settings.default_page_size).unwrap_or(i64::MAX)
    }

    pub fn offset(&mut self) -> u64 {
        let page_size = self.page_size();
        if page_size < 1 {
            0
        } else {
            self.page(false).saturating_mul(page_size)
        }
    }

    /// `None` when unbounded.
    pub fn limit(&mut self) -> Option<u64> {
        let page_size = self.page_size();
        (page_size >= 1).then_some(page_size)
    }

    pub fn window(&mut self) -> PageWindow {
        PageWindow {
            offset: self.offset(),
            limit: self.limit(),
        }
    }

    /// URL for the zero-based `page`. The page size parameter is written
    /// only when it differs from the default.
    pub fn create_url(
        &mut self,
        page: u64,
        page_size: Option<u64>,
        absolute: bool,
    ) -> String {
        let mut params = self.current_params();

        if page > 0 || self.settings.force_page_param {
            set_param(&mut params, &self.settings.page_param, (page + 1).to_string());
        } else {
            remove_param(&mut params, &self.settings.page_param);
        }

        let page_size = page_size.unwrap_or_else(|| self.page_size());
        if page_size != self.settings.default_page_size {
            set_param(
                &mut params,
                &self.settings.page_size_param,
                page_size.to_string(),
            );
        } else {
            remove_param(&mut params, &self.settings.page_size_param);
        }

        self.request.url_with(&params, absolute)
    }

    /// `self`, plus `first`/`last` when there is at least one page, plus
    /// `prev`/`next` when not already at that boundary.
    pub fn links(&mut self, absolute: bool) -> PageLinks {
        let current = self.page(false);
        let page_count = self.page_count();

        let mut links = PageLinks {
            current: self.create_url(current, None, absolute),
            first: None,
            last: None,
            prev: None,
            next: None,
        };

        if page_count > 0 {
            links.first = Some(self.create_url(0, None, absolute));
            links.last = Some(self.create_url(page_count - 1, None, absolute));
            if current > 0 {
                links.prev = Some(self.create_url(current - 1, None, absolute));
            }
            if current < page_count - 1 {
                links.next = Some(self.create_url(current + 1, None, absolute));
            }
        }
        links
    }

    fn current_params(&self) -> QueryParams {
        self.params
            .clone()
            .unwrap_or_else(|| self.request.params().to_vec())
    }

    /// Integer query parameter; malformed values are logged and ignored.
    fn int_param(&self, name: &str) -> Option<i64> {
        let raw = match &self.params {
            Some(params) => find_param(params, name),
            None => self.request.param(name),
        }?;
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(
                    param = name,
                    value = raw,
                    "malformed pagination parameter, using default"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(target: &str, total: u64) -> Pagination {
        let mut pagination = Pagination::new(
            PaginationSettings::default(),
            RequestQuery::from_target(target),
        );
        pagination.set_total_count(total);
        pagination
    }

    #[test]
    fn zero_total_has_no_pages_and_zero_offset() {
        for target in ["/items", "/items?page=7", "/items?page=-3"] {
            let mut pagination = paged(target, 0);
            assert_eq!(pagination.page_count(), 0);
            assert_eq!(pagination.offset(), 0);
            assert_eq!(pagination.page(false), 0);
        }
    }

    #[test]
    fn offset_and_page_count_follow_page_size() {
        let mut pagination = paged("/items?page=3&per-page=20", 95);
        assert_eq!(pagination.page(false), 2);
        assert_eq!(pagination.page_size(), 20);
        assert_eq!(pagination.page_count(), 5);
        assert_eq!(pagination.offset(), 40);
        assert_eq!(pagination.limit(), Some(20));
        assert_eq!(
            pagination.window(),
            PageWindow {
                offset: 40,
                limit: Some(20)
            }
        );
    }

    #[test]
    fn requested_page_is_clamped_to_last_page() {
        let mut pagination = paged("/items?page=99", 45);
        assert_eq!(pagination.page(false), 2);
        assert_eq!(pagination.offset(), 40);
    }

    #[test]
    fn page_is_not_clamped_when_validation_disabled() {
        let settings = PaginationSettings {
            validate_page: false,
            ..PaginationSettings::default()
        };
        let mut pagination =
            Pagination::new(settings, RequestQuery::from_target("/i?page=99"));
        pagination.set_total_count(45);
        assert_eq!(pagination.page(false), 98);
    }

    #[test]
    fn malformed_params_fall_back_to_defaults() {
        let mut pagination = paged("/items?page=abc&per-page=lots", 100);
        assert_eq!(pagination.page(false), 0);
        assert_eq!(pagination.page_size(), 20);
    }

    #[test]
    fn page_size_is_clamped_to_limits() {
        let mut pagination = paged("/items?per-page=500", 1000);
        assert_eq!(pagination.page_size(), 50);

        let mut pagination = paged("/items?per-page=0", 1000);
        assert_eq!(pagination.page_size(), 1);
    }

    #[test]
    fn page_size_param_ignored_without_limits() {
        let settings = PaginationSettings {
            page_size_limit: None,
            ..PaginationSettings::default()
        };
        let mut pagination = Pagination::new(
            settings,
            RequestQuery::from_target("/items?per-page=5"),
        );
        assert_eq!(pagination.page_size(), 20);
    }

    #[test]
    fn unbounded_page_size_is_single_page() {
        let mut pagination = paged("/items", 37);
        pagination.set_page_size(0, false);
        assert_eq!(pagination.page_count(), 1);
        assert_eq!(pagination.offset(), 0);
        assert_eq!(pagination.limit(), None);

        pagination.set_total_count(0);
        assert_eq!(pagination.page_count(), 0);
    }

    #[test]
    fn page_rederived_when_total_changes() {
        let mut pagination = paged("/items?page=4", 0);
        assert_eq!(pagination.page(false), 0);
        pagination.set_total_count(100);
        assert_eq!(pagination.page(false), 3);
    }

    #[test]
    fn explicit_page_survives_total_change() {
        let mut pagination = paged("/items", 0);
        pagination.set_page(2, false);
        pagination.set_total_count(100);
        assert_eq!(pagination.page(false), 2);
    }

    #[test]
    fn links_in_middle_page() {
        let mut pagination = paged("/items?page=3", 95);
        let links = pagination.links(false);
        assert_eq!(links.current, "/items?page=3");
        assert_eq!(links.first.as_deref(), Some("/items?page=1"));
        assert_eq!(links.last.as_deref(), Some("/items?page=5"));
        assert_eq!(links.prev.as_deref(), Some("/items?page=2"));
        assert_eq!(links.next.as_deref(), Some("/items?page=4"));
    }

    #[test]
    fn links_at_boundaries() {
        let mut first = paged("/items", 95);
        let links = first.links(false);
        assert!(links.prev.is_none());
        assert!(links.next.is_some());

        let mut last = paged("/items?page=5", 95);
        let links = last.links(false);
        assert!(links.prev.is_some());
        assert!(links.next.is_none());
    }

    #[test]
    fn no_pages_yields_only_self() {
        let mut pagination = paged("/items", 0);
        let links = pagination.links(false);
        assert_eq!(links.iter().count(), 1);
        assert_eq!(links.iter().next().map(|(rel, _)| rel), Some("self"));
    }

    #[test]
    fn create_url_omits_defaults() {
        let settings = PaginationSettings {
            force_page_param: false,
            ..PaginationSettings::default()
        };
        let mut pagination = Pagination::new(
            settings,
            RequestQuery::from_target("/items?q=rust&page=2"),
        );
        pagination.set_total_count(100);

        assert_eq!(pagination.create_url(0, None, false), "/items?q=rust");
        assert_eq!(
            pagination.create_url(1, Some(10), false),
            "/items?q=rust&page=2&per-page=10"
        );
    }

    #[test]
    fn explicit_params_override_request() {
        let mut pagination = paged("/items?page=3", 95);
        pagination.set_params(vec![("page".into(), "2".into())]);
        assert_eq!(pagination.page(false), 1);
    }

    #[test]
    fn window_range_clamps_to_length() {
        let window = PageWindow {
            offset: 8,
            limit: Some(5),
        };
        assert_eq!(window.range(10), 8..10);
        assert_eq!(window.range(3), 3..3);
        assert_eq!(PageWindow::UNBOUNDED.range(4), 0..4);
    }

    #[test]
    fn links_serialize_with_rel_names() {
        let mut pagination = paged("/items?page=2", 30);
        let json = serde_json::to_value(pagination.links(false)).unwrap();
        assert_eq!(json["self"], "/items?page=2");
        assert!(json.get("next").is_none());
    }
}
