//! List query handling shared by every resource: query-string parsing,
//! quick-filter expansion and the provider filter for one page.

pub mod params;
pub mod plan;
pub mod status;

pub use params::{parse_list_params, serialize_filters, ListParams, ListQuery};
pub use plan::build_list_filter;
pub use status::{quick_params_to_where, status_to_query};
