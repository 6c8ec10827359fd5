//! core-state: the editable buffer and the session state key handlers act on.
//!
//! `Buffer` wraps an immutable `Document` snapshot with undo/redo, the
//! working copy of history, completion cycling, incremental search and
//! validation. Every mutation swaps in a new `Document`; listeners registered
//! with `Buffer::subscribe` see each swap.
//!
//! `SessionState` bundles the buffer with mode state (`ViState`,
//! `EmacsState`), the kill ring, the pending numeric argument and the
//! session result. It is the explicit context passed to every filter and
//! handler.
//!
//! Completion may run on a `CompletionWorker` tokio task. Results carry the
//! request they were computed for and are applied only if the buffer still
//! shows its document.

pub mod buffer;
pub mod clipboard;
pub mod completion;
pub mod history;
pub mod modes;
pub mod search;
pub mod session;
pub mod undo;
pub mod validation;
pub mod worker;

pub use buffer::{AsyncApply, Buffer, BufferChange, CompletionSelect, EditReadOnlyBuffer};
pub use clipboard::{Clipboard, KILL_RING_MAX};
pub use completion::{CompleteEvent, Completer, Completion, CompletionState};
pub use history::{History, InMemoryHistory};
pub use modes::{CharacterFind, EditingMode, EmacsState, InputMode, PendingOperator, ViState};
pub use search::{IsearchState, SearchDirection, SearchState};
pub use session::{AbortPolicy, DispatchInfo, SessionError, SessionRequest, SessionState};
pub use undo::{UNDO_HISTORY_MAX, UndoStack};
pub use validation::{ValidationError, Validator};
pub use worker::{CompletionRequest, CompletionResult, CompletionWorker};
