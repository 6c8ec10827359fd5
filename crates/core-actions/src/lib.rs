//! core-actions: key bindings and the key processor.
//!
//! Handlers are plain closures over a [`KeyEvent`]. They never see the
//! registry: the [`Dispatcher`] resolves pressed keys, saves undo checkpoints,
//! records macros and runs handlers, so the binding tables only describe
//! what a key does.
//!
//! The default table is composed from independent sets, each gated by its
//! mode filter:
//! - `basic`: keys shared by both modes (arrows, Enter, Ctrl-C, paste)
//! - `emacs`: readline bindings, active in Emacs mode
//! - `vi`: operators, motions, text objects, macros and digraphs
//! - `completion` and `search`: menu cycling and incremental search

use std::rc::Rc;

use core_events::parse_key_sequence;
use core_keymap::{KeyBinding, Registry, RegistryError};
use core_state::{EditReadOnlyBuffer, SessionState};
use tracing::error;

mod basic;
mod completion;
pub mod dispatcher;
mod emacs;
mod event;
pub mod filters;
pub mod named_commands;
mod search;
pub mod vi;

pub use dispatcher::Dispatcher;
pub use event::KeyEvent;

pub type HandlerResult = Result<(), EditReadOnlyBuffer>;
pub type Handler = Rc<dyn Fn(&mut KeyEvent<'_>) -> HandlerResult>;
pub type Binding = KeyBinding<SessionState, Handler>;
pub type Bindings = Registry<SessionState, Handler>;

/// Build a binding from a key-name sequence (`"c-x c-e"`, `"g u"`).
///
/// An unknown key name is logged and produces an empty sequence, which the
/// registry rejects when the binding is added.
pub fn binding<F>(keys: &str, handler: F) -> Binding
where
    F: Fn(&mut KeyEvent<'_>) -> HandlerResult + 'static,
{
    handler_binding(keys, Rc::new(handler))
}

pub fn handler_binding(keys: &str, handler: Handler) -> Binding {
    let seq = parse_key_sequence(keys).unwrap_or_else(|e| {
        error!(target: "keymap.registry", keys, %e, "bad_key_sequence");
        Vec::new()
    });
    KeyBinding::new(seq, handler)
}

/// Collects bindings and keeps the first registration error.
#[derive(Default)]
pub struct BindingSet {
    registry: Bindings,
    error: Option<RegistryError>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, binding: Binding) {
        if let Err(e) = self.registry.add(binding)
            && self.error.is_none()
        {
            self.error = Some(e);
        }
    }

    pub fn finish(self) -> Result<Bindings, RegistryError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registry),
        }
    }
}

/// The full default table for both editing modes.
pub fn default_bindings() -> Result<Bindings, RegistryError> {
    let not_searching = filters::is_searching().not();
    let mut registry = basic::bindings()?.with_condition(not_searching.clone());
    registry.merge(
        emacs::bindings()?
            .with_condition(filters::emacs_mode())
            .with_condition(not_searching.clone()),
    );
    registry.merge(
        vi::bindings()?
            .with_condition(filters::vi_mode())
            .with_condition(not_searching.clone()),
    );
    registry.merge(completion::bindings()?.with_condition(not_searching));
    registry.merge(search::bindings()?.with_condition(filters::is_searching()));
    Ok(registry)
}

/// Add `[keys]` overrides: each entry maps a key sequence to a named command.
pub fn install_key_overrides<'a, I>(registry: &mut Bindings, overrides: I) -> Result<usize, RegistryError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut installed = 0;
    for (keys, name) in overrides {
        let Some(handler) = named_commands::get(name) else {
            error!(target: "keymap.registry", keys, command = name, "unknown_command");
            return Err(RegistryError::UnknownName(name.to_string()));
        };
        registry.add(
            handler_binding(keys, handler)
                .filter(filters::is_searching().not())
                .named(name),
        )?;
        installed += 1;
    }
    Ok(installed)
}
