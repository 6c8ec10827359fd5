//! core-keymap: key binding registry and sequence resolution.
//!
//! A `Registry` stores bindings (key sequence, handler, predicates) for a
//! context type `C` and a handler type `H`. Resolution is pure: it depends
//! only on the pressed keys and the context passed in. Handlers are opaque
//! here; the dispatcher in `core-actions` decides how to run them.
//!
//! Matching rules:
//! - A binding matches when it has the same length as the pressed keys and
//!   every position is equal or `Key::Any`.
//! - Fewer wildcards win. Among equally specific bindings the last
//!   registered wins.
//! - If an active eager binding matches, longer candidates are ignored.
//! - When nothing matches the whole sequence, the longest matching prefix
//!   fires and the remaining keys are processed again.

mod filter;
mod registry;

pub use filter::Filter;
pub use registry::{BindingId, KeyBinding, KeySeq, Registry, RegistryError, Resolution, Step};
