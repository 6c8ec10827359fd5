//! Terminal backend: raw mode, the crossterm output sink, and suspension for
//! running blocking commands (an external editor) in the terminal.

use anyhow::Result;
use core_render::{Output, Renderer};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

pub mod output;
pub use output::CrosstermOutput;

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
}

/// Raw-mode switch. Screen modes (alternate screen, mouse, bracketed paste)
/// belong to the renderer.
pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if caller early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalGuard<'_> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        self.backend
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            self.entered = true;
            debug!(target: "runtime", "raw_mode_on");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            disable_raw_mode()?;
            self.entered = false;
            debug!(target: "runtime", "raw_mode_off");
        }
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}

/// Hand the terminal to `f`: erase the rendered prompt, restore cooked
/// mode, run `f`, then re-enter raw mode. The next render redraws from
/// scratch.
pub fn run_in_terminal<B, O, F, T>(backend: &mut B, renderer: &mut Renderer, out: &mut O, f: F) -> Result<T>
where
    B: TerminalBackend + ?Sized,
    O: Output + ?Sized,
    F: FnOnce() -> T,
{
    renderer.erase(out)?;
    backend.leave()?;
    debug!(target: "runtime", "suspended");
    let result = f();
    backend.enter()?;
    debug!(target: "runtime", "resumed");
    Ok(result)
}
