//! Key processor: turns key presses into handler calls.
//!
//! Keys are queued in `input` and moved one at a time into `pending`, the
//! keys typed so far for the binding being resolved. After each key the
//! registry decides:
//! * `Fire`    - run the binding on the first `consumed` pending keys, then
//!               process whatever remains (longest-prefix fallback)
//! * `Wait`    - a longer binding may still match; take the next key
//! * `Discard` - nothing matches; drop the first pending key
//!
//! A prefix that is still ambiguous when input runs dry stays pending until
//! [`Dispatcher::flush`] is called (the runtime does so after `timeoutlen`).
//!
//! Around every handler call the dispatcher takes care of the shared
//! concerns: numeric argument hand-off, undo checkpoints (`save_before`),
//! one-shot Emacs prefix flags, the Vi cursor-at-end-of-line fix, leaving
//! Vi temporary navigation mode, and macro recording.
//!
//! Replayed keys are capped at [`MAX_REPLAYED_KEYS`] per burst so a macro
//! that invokes itself ends with a bell instead of spinning forever.

use std::collections::VecDeque;

use core_events::{Key, KeyPress};
use core_keymap::{BindingId, Filter, RegistryError, Step};
use core_state::{InputMode, SessionState};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::event::KeyEvent;
use crate::filters::vi_navigation_mode;
use crate::{Bindings, default_bindings};

/// Replayed keys handled back to back before the rest of a replay is dropped.
pub const MAX_REPLAYED_KEYS: usize = 10_000;

/// Counters for the status line and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchMetrics {
    pub handlers_called: u64,
    pub keys_discarded: u64,
    pub read_only_refusals: u64,
    pub replays_cancelled: u64,
}

/// A queued key press; `replayed` marks keys fed back by a macro.
#[derive(Debug, Clone)]
struct Queued {
    press: KeyPress,
    replayed: bool,
}

pub struct Dispatcher {
    registry: Bindings,
    input: VecDeque<Queued>,
    pending: Vec<Queued>,
    previous: Option<BindingId>,
    metrics: DispatchMetrics,
    replay_run: usize,
}

impl Dispatcher {
    pub fn new(registry: Bindings) -> Self {
        Self {
            registry,
            input: VecDeque::new(),
            pending: Vec::new(),
            previous: None,
            metrics: DispatchMetrics::default(),
            replay_run: 0,
        }
    }

    /// Dispatcher over the default Emacs + Vi table.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Ok(Self::new(default_bindings()?))
    }

    pub fn registry(&self) -> &Bindings {
        &self.registry
    }

    /// Mutable access for installing user bindings; the registry drops its
    /// resolution cache on every change.
    pub fn registry_mut(&mut self) -> &mut Bindings {
        &mut self.registry
    }

    pub fn metrics(&self) -> DispatchMetrics {
        self.metrics
    }

    /// Keys waiting for a longer binding (or unprocessed input).
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.input.is_empty()
    }

    /// Queue one key and process as far as possible.
    pub fn feed(&mut self, press: KeyPress, state: &mut SessionState) {
        self.input.push_back(Queued {
            press,
            replayed: false,
        });
        self.process(state);
    }

    pub fn feed_all<I>(&mut self, presses: I, state: &mut SessionState)
    where
        I: IntoIterator<Item = KeyPress>,
    {
        self.input.extend(presses.into_iter().map(|press| Queued {
            press,
            replayed: false,
        }));
        self.process(state);
    }

    /// Process queued keys, stopping at an ambiguous prefix.
    pub fn process(&mut self, state: &mut SessionState) {
        self.run(state, false);
    }

    /// Resolve pending prefixes without waiting for longer bindings.
    pub fn flush(&mut self, state: &mut SessionState) {
        self.run(state, true);
    }

    /// Drop all queued and pending keys (a prompt finished or was reset).
    pub fn reset(&mut self) {
        self.input.clear();
        self.pending.clear();
        self.previous = None;
        self.replay_run = 0;
    }

    fn run(&mut self, state: &mut SessionState, flush: bool) {
        loop {
            if state.is_done() {
                // Typeahead stays queued for the next prompt.
                break;
            }
            let step = if self.pending.is_empty() {
                Step::Wait
            } else {
                let keys: SmallVec<[Key; 4]> = self.pending.iter().map(|q| q.press.key).collect();
                let flush_now = flush && self.input.is_empty();
                self.registry.next_step(&keys, state, flush_now)
            };
            match step {
                Step::Wait => match self.input.pop_front() {
                    Some(next) => {
                        if next.replayed {
                            self.replay_run += 1;
                            if self.replay_run > MAX_REPLAYED_KEYS {
                                self.cancel_replay(state);
                                continue;
                            }
                        } else {
                            self.replay_run = 0;
                        }
                        self.pending.push(next);
                    }
                    None => break,
                },
                Step::Fire { id, consumed } => {
                    let fired: Vec<Queued> = self.pending.drain(..consumed).collect();
                    self.call_handler(id, &fired, state);
                }
                Step::Discard => {
                    let dropped = self.pending.remove(0);
                    self.metrics.keys_discarded += 1;
                    state.emacs.clear_prefix();
                    state.vi.operator = None;
                    state.vi.operator_arg = None;
                    state.arg = None;
                    trace!(target: "actions.dispatch", key = %dropped.press.key, "unbound_key");
                }
            }
        }
    }

    /// Drop every replayed key still queued or pending.
    fn cancel_replay(&mut self, state: &mut SessionState) {
        let before = self.input.len() + self.pending.len();
        self.input.retain(|q| !q.replayed);
        self.pending.retain(|q| !q.replayed);
        let dropped = before - self.input.len() - self.pending.len() + 1;
        self.replay_run = 0;
        self.metrics.replays_cancelled += 1;
        warn!(target: "actions.macro", dropped, "replay_limit");
        state.ring_bell();
    }

    fn call_handler(&mut self, id: BindingId, fired: &[Queued], state: &mut SessionState) {
        let Some(binding) = self.registry.get(id) else {
            return;
        };
        let handler = binding.handler.clone();
        let save_before = binding.save_before.clone();
        let record_in_macro = binding.record_in_macro.clone();
        let name = binding.name.clone();

        let keys: Vec<KeyPress> = fired.iter().map(|q| q.press.clone()).collect();
        let replaying = fired.iter().any(|q| q.replayed);
        let is_repeat = self.previous == Some(id);
        let was_recording_emacs = state.emacs.is_recording();
        let was_recording_vi = state.vi.is_recording();
        let was_temporary_navigation = state.vi.temporary_navigation_mode;
        let had_prefix = state.emacs.has_prefix();
        let prefix_keys = if had_prefix {
            state.emacs.prefix_keys.clone()
        } else {
            Vec::new()
        };

        state.dispatch.is_repeat = is_repeat;
        state.dispatch.replaying = replaying;
        let arg = state.arg.take();

        if !replaying && save_before.eval(state) {
            state.buffer.save_to_undo_stack(true);
        }

        trace!(
            target: "actions.dispatch",
            keys = keys.len(),
            name = name.as_deref().unwrap_or(""),
            is_repeat,
            replaying,
            "call_handler"
        );
        let mut event = KeyEvent::new(state, &keys, arg, is_repeat);
        let outcome = handler(&mut event);
        self.metrics.handlers_called += 1;
        match outcome {
            Ok(()) => fix_vi_cursor_position(state),
            Err(e) => {
                self.metrics.read_only_refusals += 1;
                debug!(target: "actions.dispatch", %e, "read_only_refused");
                state.ring_bell();
            }
        }

        if was_temporary_navigation
            && state.is_vi()
            && state.vi.operator.is_none()
            && state.arg.is_none()
        {
            state.vi.temporary_navigation_mode = false;
        }

        if had_prefix {
            state.emacs.clear_prefix();
        }

        if record_in_macro.eval(state) {
            if was_recording_emacs
                && let Some(recording) = state.emacs.current_recording.as_mut()
            {
                recording.extend(prefix_keys);
                recording.extend(keys.iter().cloned());
            }
            // Keys fed back by `@x` are already represented by the `@x` itself.
            if was_recording_vi && !replaying && state.vi.is_recording() {
                state.vi.current_recording.extend(keys.iter().cloned());
            }
        }

        // A prefix key is transparent for repeat detection (`M-d M-d`).
        if !state.emacs.has_prefix() {
            self.previous = Some(id);
        }
        state.dispatch = Default::default();

        // Macro replay: the keys run before any further typed input.
        if !state.pending_feed.is_empty() {
            let feed: Vec<KeyPress> = state.pending_feed.drain(..).collect();
            debug!(target: "actions.macro", keys = feed.len(), "replay");
            for press in feed.into_iter().rev() {
                self.input.push_front(Queued {
                    press,
                    replayed: true,
                });
            }
        }
    }
}

/// In Vi navigation the cursor never rests after the last char of a line.
fn fix_vi_cursor_position(state: &mut SessionState) {
    let nav: Filter<SessionState> = vi_navigation_mode();
    if !nav.eval(state) || state.buffer.isearch().is_some() {
        return;
    }
    let doc = state.buffer.document();
    if doc.is_cursor_at_the_end_of_line() && !doc.current_line().is_empty() {
        let preferred = state.buffer.preferred_column();
        state.buffer.cursor_left(1);
        state.buffer.set_preferred_column(preferred);
    }
}

/// Whether `state` is in Vi navigation without anything pending; used by the
/// runtime for the cursor shape.
pub fn shows_block_cursor(state: &SessionState) -> bool {
    state.vi_input_mode() == Some(InputMode::Navigation) || state.vi.temporary_navigation_mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingSet, binding};
    use core_state::{Buffer, EditingMode};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn state() -> SessionState {
        SessionState::new(Buffer::default(), EditingMode::Emacs)
    }

    fn typed(s: &str) -> Vec<KeyPress> {
        s.chars().map(KeyPress::char).collect()
    }

    #[test]
    fn prefix_waits_then_fires_longer_binding() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set = BindingSet::new();
        let l = log.clone();
        set.add(binding("a", move |_| {
            l.borrow_mut().push("a");
            Ok(())
        }));
        let l = log.clone();
        set.add(binding("a b", move |_| {
            l.borrow_mut().push("ab");
            Ok(())
        }));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = state();
        d.feed(KeyPress::char('a'), &mut s);
        assert!(d.has_pending());
        assert!(log.borrow().is_empty());
        d.feed(KeyPress::char('b'), &mut s);
        assert_eq!(*log.borrow(), ["ab"]);
        d.feed(KeyPress::char('a'), &mut s);
        d.flush(&mut s);
        assert_eq!(*log.borrow(), ["ab", "a"]);
        assert!(!d.has_pending());
    }

    #[test]
    fn unmatched_suffix_is_reprocessed() {
        let log = Rc::new(RefCell::new(String::new()));
        let mut set = BindingSet::new();
        let l = log.clone();
        set.add(binding("a", move |_| {
            l.borrow_mut().push('A');
            Ok(())
        }));
        set.add(binding("a b c", |_| Ok(())));
        let l = log.clone();
        set.add(binding("<any>", move |e| {
            l.borrow_mut().push_str(e.data());
            Ok(())
        }));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = state();
        d.feed_all(typed("abx"), &mut s);
        assert_eq!(*log.borrow(), "Abx");
    }

    #[test]
    fn repeat_flag_and_argument_hand_off() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut set = BindingSet::new();
        set.add(binding("c-u", |e| {
            e.append_to_arg_count("4");
            Ok(())
        }));
        let l = seen.clone();
        set.add(binding("x", move |e| {
            l.borrow_mut().push((e.arg(), e.is_repeat));
            Ok(())
        }));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = state();
        d.feed(KeyPress::key(Key::Control('u')), &mut s);
        d.feed_all(typed("xx"), &mut s);
        assert_eq!(*seen.borrow(), [(4, false), (1, true)]);
    }

    #[test]
    fn read_only_error_rings_bell() {
        let mut set = BindingSet::new();
        set.add(binding("x", |e| e.buffer().insert_text("x", false, true).map(|_| ())));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = SessionState::new(Buffer::default().with_read_only(true), EditingMode::Emacs);
        d.feed(KeyPress::char('x'), &mut s);
        assert!(s.take_bell());
        assert_eq!(d.metrics().read_only_refusals, 1);
        assert_eq!(s.buffer.text(), "");
    }

    #[test]
    fn pending_feed_runs_before_queued_input() {
        let log = Rc::new(RefCell::new(String::new()));
        let mut set = BindingSet::new();
        set.add(binding("r", |e| {
            e.state.pending_feed.extend(typed("ab"));
            Ok(())
        }));
        let l = log.clone();
        set.add(binding("<any>", move |e| {
            l.borrow_mut().push_str(e.data());
            Ok(())
        }));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = state();
        d.feed_all(typed("rz"), &mut s);
        assert_eq!(*log.borrow(), "abz");
    }

    #[test]
    fn self_feeding_replay_stops_at_limit() {
        let calls = Rc::new(RefCell::new(0usize));
        let mut set = BindingSet::new();
        let c = calls.clone();
        set.add(binding("r", move |e| {
            *c.borrow_mut() += 1;
            e.state.pending_feed.extend(typed("r"));
            Ok(())
        }));
        let mut d = Dispatcher::new(set.finish().unwrap());
        let mut s = state();
        d.feed_all(typed("r"), &mut s);
        assert_eq!(*calls.borrow(), MAX_REPLAYED_KEYS + 1);
        assert_eq!(d.metrics().replays_cancelled, 1);
        assert!(s.take_bell());
        assert!(!d.has_pending());

        // Typed keys after the cancelled burst still run.
        d.feed_all(typed("r"), &mut s);
        assert_eq!(d.metrics().replays_cancelled, 2);
    }
}
