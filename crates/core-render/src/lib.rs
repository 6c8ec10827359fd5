//! core-render: the screen model and the diff renderer.
//!
//! A frame is built as a [`Screen`], a sparse grid of styled [`Char`]
//! cells. The [`Renderer`] compares it with the frame it wrote last and
//! emits only the [`Command`]s needed to update the terminal, through any
//! [`Output`] sink. [`WindowScroll`] keeps the cursor of a tall window
//! inside its scroll margins.

pub mod output;
pub mod renderer;
pub mod screen;
pub mod scroll;
pub mod style;

pub use output::{Command, Output, VecOutput};
pub use renderer::{RenderStats, Renderer};
pub use screen::{Char, Point, Rect, Screen};
pub use scroll::{ScrollMargins, WindowScroll};
pub use style::{Attrs, Style, StyledText};
