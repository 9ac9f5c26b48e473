use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_PARAM: &str = "page";
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "per-page";
pub const DEFAULT_SORT_PARAM: &str = "sort";
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const DEFAULT_PAGE_SIZE_LIMIT: (u64, u64) = (1, 50);

/// Tunables for [`Pagination`](super::Pagination).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    /// Query parameter carrying the 1-based page number.
    pub page_param: String,
    /// Query parameter carrying the requested page size.
    pub page_size_param: String,
    /// Page size used when the request does not ask for one. `0` disables
    /// paging altogether.
    pub default_page_size: u64,
    /// Inclusive bounds applied to a requested page size. Without limits the
    /// page size parameter is ignored and `default_page_size` always applies.
    pub page_size_limit: Option<(u64, u64)>,
    /// Emit the page parameter even for the first page.
    pub force_page_param: bool,
    /// Clamp requested pages into the available range.
    pub validate_page: bool,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            page_size_param: DEFAULT_PAGE_SIZE_PARAM.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_limit: Some(DEFAULT_PAGE_SIZE_LIMIT),
            force_page_param: true,
            validate_page: true,
        }
    }
}

impl PaginationSettings {
    /// Prefix both parameter names, e.g. `page` becomes `books-page`.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.page_param = format!("{prefix}-{}", self.page_param);
        self.page_size_param = format!("{prefix}-{}", self.page_size_param);
        self
    }
}

/// Tunables for [`SortModel`](super::SortModel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    /// Query parameter carrying the sort token.
    pub sort_param: String,
    /// Separator between attribute names in the sort token.
    pub separator: String,
    /// Allow more than one attribute in the sort token.
    pub enable_multi_sort: bool,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            sort_param: DEFAULT_SORT_PARAM.to_string(),
            separator: ",".to_string(),
            enable_multi_sort: false,
        }
    }
}

impl SortSettings {
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.sort_param = format!("{prefix}-{}", self.sort_param);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: PaginationSettings =
            serde_json::from_str(r#"{"default_page_size": 10}"#).unwrap();
        assert_eq!(settings.default_page_size, 10);
        assert_eq!(settings.page_param, "page");
        assert_eq!(settings.page_size_limit, Some((1, 50)));
    }

    #[test]
    fn limit_can_be_disabled() {
        let settings: PaginationSettings =
            serde_json::from_str(r#"{"page_size_limit": null}"#).unwrap();
        assert_eq!(settings.page_size_limit, None);
    }

    #[test]
    fn prefixes_parameter_names() {
        let pagination = PaginationSettings::default().prefixed("dp-1");
        assert_eq!(pagination.page_param, "dp-1-page");
        assert_eq!(pagination.page_size_param, "dp-1-per-page");
        assert_eq!(SortSettings::default().prefixed("dp-1").sort_param, "dp-1-sort");
    }
}
