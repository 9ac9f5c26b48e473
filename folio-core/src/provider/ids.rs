use std::sync::atomic::{AtomicUsize, Ordering};

pub const DEFAULT_ID_PREFIX: &str = "dp";

/// Hands out provider identifiers within one request.
///
/// The first provider gets no identifier, so a page with a single provider
/// keeps plain `page`/`sort` parameters. Later providers get `dp-1`, `dp-2`
/// and so on, which keeps their parameters apart.
#[derive(Debug)]
pub struct ProviderIds {
    prefix: String,
    next: AtomicUsize,
}

impl Default for ProviderIds {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX)
    }
}

impl ProviderIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn allocate(&self) -> Option<String> {
        match self.next.fetch_add(1, Ordering::Relaxed) {
            0 => None,
            n => Some(format!("{}-{n}", self.prefix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_provider_is_anonymous() {
        let ids = ProviderIds::default();
        assert_eq!(ids.allocate(), None);
        assert_eq!(ids.allocate().as_deref(), Some("dp-1"));
        assert_eq!(ids.allocate().as_deref(), Some("dp-2"));
    }

    #[test]
    fn allocators_are_independent() {
        let a = ProviderIds::new("grid");
        let b = ProviderIds::new("grid");
        a.allocate();
        assert_eq!(a.allocate().as_deref(), Some("grid-1"));
        assert_eq!(b.allocate(), None);
    }
}
