//! # Folio Core
//!
//! Data access and presentation engine: turns request parameters into sort
//! orders and page windows, pushes them into a backend, and serves the
//! resulting page of records.
//!
//! ## Overview
//!
//! - **Sorting**: [`OrderSpec`](query::OrderSpec) maps logical attributes to
//!   physical field orders; [`SortModel`](query::SortModel) parses sort
//!   tokens and builds toggle links
//! - **Pagination**: [`Pagination`](query::Pagination) derives offsets,
//!   limits and navigation links from the request and a total count
//! - **Multi-key sorting**: [`MultiKeySort`](query::MultiKeySort) sorts
//!   records by several columns with per-column direction and comparison
//! - **Backends**: [`BackendAdapter`](adapter::BackendAdapter) is the seam to
//!   a concrete store
//! - **Providers**: [`QueryDataProvider`](provider::QueryDataProvider) and
//!   [`CollectionDataProvider`](provider::CollectionDataProvider) prepare a
//!   page once and share it between concurrent callers
//!
//! ## Feature Flags
//!
//! - `postgres`: PostgreSQL table adapter built on SQLx
//!
//! ## Examples
//!
//! ```no_run
//! use folio_core::provider::{CollectionDataProvider, DataProvider};
//! use folio_core::query::{OrderSpec, RequestQuery};
//! use serde_json::json;
//!
//! async fn first_page() -> folio_core::Result<()> {
//!     let books = vec![
//!         json!({"title": "Dune", "year": 1965}),
//!         json!({"title": "Hyperion", "year": 1989}),
//!     ];
//!     let provider = CollectionDataProvider::builder(books)
//!         .request(RequestQuery::from_target("/books?sort=-year"))
//!         .order_spec(["title", "year"].into_iter().collect::<OrderSpec>())
//!         .build();
//!
//!     let page = provider.page().await?;
//!     println!("{} of {}", page.len(), provider.total_count().await?);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Backend adapter seam and built-in adapters
pub mod adapter;

/// Error types and error handling utilities
pub mod error;

/// Lazily prepared data providers
pub mod provider;

/// Sort models, pagination and in-memory multi-key sorting
pub mod query;

pub use error::{EngineError, Result};
