//! Sorting for data presentation
//!
//! This module provides:
//! - Declarative attribute to field mappings ([`OrderSpec`])
//! - Sort token parsing, toggle links and physical order expansion
//! - Typed sort values and record access for in-memory sorting
//! - A stable multi-key sort over parallel columns

pub mod direction;
pub mod keys;
pub mod multisort;
pub mod order_spec;
pub mod sort_model;
pub mod utils;

pub use direction::*;
pub use keys::*;
pub use multisort::*;
pub use order_spec::*;
pub use sort_model::{
    AttributeOrder, SortLink, SortModel, SortState, orders_for, resolve, toggle_token,
};
