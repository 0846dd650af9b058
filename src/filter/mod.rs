pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod filter_match;
pub mod error;

pub use error::FilterError;
pub use filter::{validate_identifier, Filter};
pub use filter_match::FilterMatch;
pub use filter_order::FilterOrder;
pub use filter_where::WhereNode;
pub use types::*;
