//! Binding storage and sequence resolution.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use core_events::Key;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

use crate::filter::Filter;

pub type KeySeq = SmallVec<[Key; 4]>;

/// Stable identity of a stored binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("binding has an empty key sequence")]
    EmptySequence,
    #[error("binding {0:?} is not registered")]
    NotFound(BindingId),
    #[error("no binding named `{0}`")]
    UnknownName(String),
}

/// One key binding: a key sequence, a handler and the predicates governing it.
pub struct KeyBinding<C, H> {
    pub keys: SmallVec<[Key; 2]>,
    pub handler: H,
    pub filter: Filter<C>,
    /// Fire as soon as the sequence matches, even if a longer binding could.
    pub eager: Filter<C>,
    /// Push an undo checkpoint before running the handler.
    pub save_before: Filter<C>,
    pub record_in_macro: Filter<C>,
    pub name: Option<String>,
}

impl<C, H> KeyBinding<C, H> {
    pub fn new(keys: impl IntoIterator<Item = Key>, handler: H) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            handler,
            filter: Filter::Always,
            eager: Filter::Never,
            save_before: Filter::Always,
            record_in_macro: Filter::Always,
            name: None,
        }
    }

    pub fn filter(mut self, filter: Filter<C>) -> Self {
        self.filter = filter;
        self
    }

    pub fn eager(mut self, eager: impl Into<Filter<C>>) -> Self {
        self.eager = eager.into();
        self
    }

    pub fn save_before(mut self, save_before: Filter<C>) -> Self {
        self.save_before = save_before;
        self
    }

    pub fn record_in_macro(mut self, record: impl Into<Filter<C>>) -> Self {
        self.record_in_macro = record.into();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn any_count(&self) -> usize {
        self.keys.iter().filter(|k| **k == Key::Any).count()
    }

    fn matches_exact(&self, pressed: &[Key]) -> bool {
        self.keys.len() == pressed.len() && key_positions_match(&self.keys, pressed)
    }

    fn starts_with(&self, pressed: &[Key]) -> bool {
        self.keys.len() > pressed.len() && key_positions_match(&self.keys[..pressed.len()], pressed)
    }
}

fn key_positions_match(binding: &[Key], pressed: &[Key]) -> bool {
    binding
        .iter()
        .zip(pressed)
        .all(|(b, p)| *b == Key::Any || b == p)
}

pub(crate) fn fmt_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of resolving a whole pressed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NoMatch,
    /// Longer active bindings start with the pressed keys.
    Partial,
    Match(BindingId),
}

/// What the key processor should do with its pending keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run `id` on the first `consumed` pending keys.
    Fire { id: BindingId, consumed: usize },
    /// Keep the keys; a longer binding may still match.
    Wait,
    /// Nothing matches any prefix; drop the first pending key.
    Discard,
}

struct Entry<C, H> {
    id: BindingId,
    binding: KeyBinding<C, H>,
}

/// Ordered collection of bindings with a resolution cache.
///
/// Later registrations win ties so user bindings override defaults. The
/// caches only depend on key sequences (filters are evaluated per lookup)
/// and are dropped whenever the binding set changes.
pub struct Registry<C, H> {
    entries: Vec<Entry<C, H>>,
    next_id: u64,
    exact_cache: RefCell<AHashMap<KeySeq, Rc<[usize]>>>,
    prefix_cache: RefCell<AHashMap<KeySeq, Rc<[usize]>>>,
}

impl<C, H> Default for Registry<C, H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            exact_cache: RefCell::new(AHashMap::new()),
            prefix_cache: RefCell::new(AHashMap::new()),
        }
    }
}

impl<C, H> Registry<C, H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a binding. Bindings whose filter is `Never` are accepted but not
    /// stored; the returned id then resolves to nothing.
    pub fn add(&mut self, binding: KeyBinding<C, H>) -> Result<BindingId, RegistryError> {
        if binding.keys.is_empty() {
            return Err(RegistryError::EmptySequence);
        }
        let id = BindingId(self.next_id);
        self.next_id += 1;
        if binding.filter.is_never() {
            trace!(target: "keymap.registry", keys = %fmt_keys(&binding.keys), "binding_disabled_skipped");
            return Ok(id);
        }
        debug!(
            target: "keymap.registry",
            id = id.0,
            keys = %fmt_keys(&binding.keys),
            name = binding.name.as_deref().unwrap_or(""),
            "binding_added"
        );
        self.entries.push(Entry { id, binding });
        self.invalidate();
        Ok(id)
    }

    pub fn remove(&mut self, id: BindingId) -> Result<KeyBinding<C, H>, RegistryError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        let entry = self.entries.remove(pos);
        debug!(target: "keymap.registry", id = id.0, keys = %fmt_keys(&entry.binding.keys), "binding_removed");
        self.invalidate();
        Ok(entry.binding)
    }

    /// Remove every binding carrying `name`, returning how many were removed.
    pub fn remove_by_name(&mut self, name: &str) -> Result<usize, RegistryError> {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.binding.name.as_deref() != Some(name));
        let removed = before - self.entries.len();
        if removed == 0 {
            return Err(RegistryError::UnknownName(name.to_string()));
        }
        debug!(target: "keymap.registry", name, removed, "bindings_removed_by_name");
        self.invalidate();
        Ok(removed)
    }

    pub fn get(&self, id: BindingId) -> Option<&KeyBinding<C, H>> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &KeyBinding<C, H>)> {
        self.entries.iter().map(|e| (e.id, &e.binding))
    }

    /// Append every binding of `other` after the existing ones.
    pub fn merge(&mut self, other: Registry<C, H>) {
        for entry in other.entries {
            let id = BindingId(self.next_id);
            self.next_id += 1;
            self.entries.push(Entry {
                id,
                binding: entry.binding,
            });
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        self.exact_cache.borrow_mut().clear();
        self.prefix_cache.borrow_mut().clear();
        trace!(target: "keymap.registry", "cache_invalidated");
    }

    /// Indices of bindings matching `pressed` exactly, least specific first
    /// (most wildcards), registration order within equal specificity.
    fn exact_candidates(&self, pressed: &[Key]) -> Rc<[usize]> {
        if let Some(hit) = self.exact_cache.borrow().get(pressed) {
            return Rc::clone(hit);
        }
        let mut found: Vec<(usize, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.binding.matches_exact(pressed))
            .map(|(idx, e)| (e.binding.any_count(), idx))
            .collect();
        // Stable: keeps registration order within the same wildcard count.
        found.sort_by(|a, b| b.0.cmp(&a.0));
        let list: Rc<[usize]> = found.into_iter().map(|(_, idx)| idx).collect();
        self.exact_cache
            .borrow_mut()
            .insert(pressed.iter().copied().collect(), Rc::clone(&list));
        list
    }

    fn longer_candidates(&self, pressed: &[Key]) -> Rc<[usize]> {
        if let Some(hit) = self.prefix_cache.borrow().get(pressed) {
            return Rc::clone(hit);
        }
        let list: Rc<[usize]> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.binding.starts_with(pressed))
            .map(|(idx, _)| idx)
            .collect();
        self.prefix_cache
            .borrow_mut()
            .insert(pressed.iter().copied().collect(), Rc::clone(&list));
        list
    }

    /// Active exact matches, in preference order (best last).
    fn active_matches(&self, pressed: &[Key], ctx: &C) -> Vec<usize> {
        self.exact_candidates(pressed)
            .iter()
            .copied()
            .filter(|&idx| self.entries[idx].binding.filter.eval(ctx))
            .collect()
    }

    fn is_prefix_of_active(&self, pressed: &[Key], ctx: &C) -> bool {
        self.longer_candidates(pressed)
            .iter()
            .any(|&idx| self.entries[idx].binding.filter.eval(ctx))
    }

    /// Resolve the whole pressed sequence against active bindings.
    pub fn resolve(&self, pressed: &[Key], ctx: &C) -> Resolution {
        if pressed.is_empty() {
            return Resolution::NoMatch;
        }
        let mut matches = self.active_matches(pressed, ctx);
        let mut longer = self.is_prefix_of_active(pressed, ctx);
        let eager: Vec<usize> = matches
            .iter()
            .copied()
            .filter(|&idx| self.entries[idx].binding.eager.eval(ctx))
            .collect();
        if !eager.is_empty() {
            matches = eager;
            longer = false;
        }
        let resolution = match (matches.last(), longer) {
            (_, true) => Resolution::Partial,
            (Some(&idx), false) => Resolution::Match(self.entries[idx].id),
            (None, false) => Resolution::NoMatch,
        };
        trace!(target: "keymap.resolve", keys = %fmt_keys(pressed), ?resolution, "resolve");
        resolution
    }

    /// Decide what to do with the pending `buffer`. With `flush` set, a
    /// pending prefix no longer waits for longer bindings.
    pub fn next_step(&self, buffer: &[Key], ctx: &C, flush: bool) -> Step {
        if buffer.is_empty() {
            return Step::Wait;
        }
        match self.resolve(buffer, ctx) {
            Resolution::Match(id) => {
                return Step::Fire {
                    id,
                    consumed: buffer.len(),
                };
            }
            Resolution::Partial if !flush => return Step::Wait,
            Resolution::Partial | Resolution::NoMatch => {}
        }
        // Longest prefix with an active match wins; the rest is re-processed.
        for len in (1..=buffer.len()).rev() {
            if let Some(&idx) = self.active_matches(&buffer[..len], ctx).last() {
                let id = self.entries[idx].id;
                debug!(target: "keymap.resolve", keys = %fmt_keys(&buffer[..len]), consumed = len, "prefix_fire");
                return Step::Fire { id, consumed: len };
            }
        }
        trace!(target: "keymap.resolve", key = %buffer[0], "discard");
        Step::Discard
    }
}

impl<C: 'static, H> Registry<C, H> {
    /// Gate every binding on `condition` in addition to its own filter.
    pub fn with_condition(mut self, condition: Filter<C>) -> Self {
        for entry in &mut self.entries {
            let filter = std::mem::take(&mut entry.binding.filter);
            entry.binding.filter = filter.and(condition.clone());
        }
        self.entries.retain(|e| !e.binding.filter.is_never());
        self.invalidate();
        self
    }
}
