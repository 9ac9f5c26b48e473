pub mod pagination;
pub mod request;
pub mod settings;
pub mod sorting;

pub use pagination::{PageLinks, PageWindow, Pagination};
pub use request::{QueryParams, RequestQuery};
pub use settings::{PaginationSettings, SortSettings};
pub use sorting::*;
