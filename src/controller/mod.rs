//! Watch lifecycle core: cancellation scopes, the per-key registry, the
//! reconciler driving it and the root supervisor owning the scope tree.

#[allow(clippy::module_inception)]
mod controller;
mod reconciler;
mod registry;
mod scope;

pub use controller::*;
pub use reconciler::*;
pub use registry::*;
pub use scope::*;
