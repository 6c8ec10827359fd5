//! core-model: turns session state into a [`core_render::Screen`].
//!
//! Controls produce screens for a given width. Windows place a control in
//! a rectangle and keep its cursor visible by scrolling. Containers divide
//! space among windows using [`Dimension`] constraints. [`EditorModel`]
//! owns the default prompt layout and is what the event loop renders.

pub mod control;
pub mod layout;
pub mod modal;
pub mod model;

pub use control::{BufferControl, CompletionMenuControl, Control, FillControl, TextControl};
pub use layout::{Dimension, Float, FloatAnchor, FloatContainer, Layout, Node, NodeId, Window, divide};
pub use modal::{ModalId, ModalStack};
pub use model::{EditorModel, toolbar};
