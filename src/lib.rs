//! Reconciliation core of a scaled-object controller.
//!
//! Keeps exactly one cancellable watch task per scaled object: an upsert
//! installs a fresh scope and cancels the one it replaces, a delete cancels
//! and forgets it, and shutting the controller down cancels the whole scope
//! tree.

mod config;
mod controller;
mod errors;
mod event;
pub mod metrics;
mod object;
pub mod runtime;
mod source;
mod watch;

pub use crate::config::*;
pub use controller::*;
pub use errors::*;
pub use event::*;
pub use object::*;
pub use source::*;
pub use watch::*;
