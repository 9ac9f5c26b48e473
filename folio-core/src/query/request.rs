//! The current request's path and query string
//!
//! Sort and pagination models read their parameters from a [`RequestQuery`]
//! and rewrite a copy of its parameters when they build navigation links.

use tracing::debug;
use url::{Url, form_urlencoded};

/// Ordered query parameters; a name may repeat but the helpers below keep at
/// most one entry per name they touch.
pub type QueryParams = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestQuery {
    base: Option<Url>,
    path: String,
    params: QueryParams,
}

impl RequestQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            base: None,
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Parse a relative request target such as `/books?page=2&sort=-title`.
    pub fn from_target(target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            base: None,
            path: path.to_string(),
            params: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Take path and query from an absolute URL and keep its origin for
    /// absolute links.
    pub fn from_url(url: &Url) -> Self {
        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.set_path("/");
        Self {
            base: Some(base),
            path: url.path().to_string(),
            params: url.query_pairs().into_owned().collect(),
        }
    }

    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_param(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value for `name` in the request's own query.
    pub fn param(&self, name: &str) -> Option<&str> {
        find_param(&self.params, name)
    }

    /// Render this request's path with `params` as the query string.
    ///
    /// Absolute URLs need a base; without one a relative URL is returned.
    pub fn url_with(&self, params: &[(String, String)], absolute: bool) -> String {
        let query = encode_params(params);

        if absolute {
            match self.absolute_url(&query) {
                Some(url) => return url,
                None => debug!(
                    path = %self.path,
                    "no base URL configured; falling back to a relative link"
                ),
            }
        }

        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }

    fn absolute_url(&self, query: &str) -> Option<String> {
        let base = self.base.as_ref()?;
        let mut url = base.join(&self.path).ok()?;
        url.set_query((!query.is_empty()).then_some(query));
        Some(url.to_string())
    }
}

pub fn find_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Set `name` to `value`, replacing the first occurrence in place and
/// dropping any others.
pub fn set_param(params: &mut QueryParams, name: &str, value: String) {
    match params.iter().position(|(key, _)| key == name) {
        Some(pos) => {
            params[pos].1 = value;
            let mut idx = 0;
            params.retain(|(key, _)| {
                let keep = key != name || idx == pos;
                idx += 1;
                keep
            });
        }
        None => params.push((name.to_string(), value)),
    }
}

pub fn remove_param(params: &mut QueryParams, name: &str) {
    params.retain(|(key, _)| key != name);
}

fn encode_params(params: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
