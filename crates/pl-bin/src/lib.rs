//! promptline: a line-editing REPL built on the core crates.
//!
//! The binary wires configuration, logging and the terminal to [`app::Prompt`],
//! which owns the event loop. The library half exists so the loop can be
//! driven from integration tests with a recorded output and a fake terminal.

pub mod app;
pub mod demo;
pub mod editor;
pub mod logging;
pub mod settings;

pub use app::{ExternalEditor, LoopOptions, Prompt};
pub use settings::{Overrides, Settings};
