//! Resource registry: which table backs each API resource key and how its
//! rows are filtered, scoped and shaped.

pub mod projection;
pub mod registry;
pub mod resolver;
pub mod transforms;

pub use registry::{QuickFilter, QuickFilterKind, Registry, ResourceConfig, RowScope, SortSpec};
pub use resolver::{canonical_key, resolve_resource, validate_resource_key, ResolveError, ResolvedResource};
