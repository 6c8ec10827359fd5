//! Binding activation predicates over an explicit context value.

use std::fmt;
use std::rc::Rc;

/// Predicate deciding whether a binding is active for context `C`.
///
/// `Always` and `Never` are kept as distinct variants so the registry can
/// refuse to store permanently disabled bindings and skip evaluating
/// unconditional ones.
pub enum Filter<C> {
    Always,
    Never,
    Condition(Rc<dyn Fn(&C) -> bool>),
}

impl<C> Filter<C> {
    pub fn new(f: impl Fn(&C) -> bool + 'static) -> Self {
        Filter::Condition(Rc::new(f))
    }

    pub fn from_bool(value: bool) -> Self {
        if value { Filter::Always } else { Filter::Never }
    }

    pub fn eval(&self, ctx: &C) -> bool {
        match self {
            Filter::Always => true,
            Filter::Never => false,
            Filter::Condition(f) => f(ctx),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Filter::Never)
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Filter::Always)
    }
}

impl<C: 'static> Filter<C> {
    pub fn and(self, other: Filter<C>) -> Filter<C> {
        match (self, other) {
            (Filter::Never, _) | (_, Filter::Never) => Filter::Never,
            (Filter::Always, f) | (f, Filter::Always) => f,
            (Filter::Condition(a), Filter::Condition(b)) => {
                Filter::Condition(Rc::new(move |ctx| a(ctx) && b(ctx)))
            }
        }
    }

    pub fn or(self, other: Filter<C>) -> Filter<C> {
        match (self, other) {
            (Filter::Always, _) | (_, Filter::Always) => Filter::Always,
            (Filter::Never, f) | (f, Filter::Never) => f,
            (Filter::Condition(a), Filter::Condition(b)) => {
                Filter::Condition(Rc::new(move |ctx| a(ctx) || b(ctx)))
            }
        }
    }

    pub fn not(self) -> Filter<C> {
        match self {
            Filter::Always => Filter::Never,
            Filter::Never => Filter::Always,
            Filter::Condition(a) => Filter::Condition(Rc::new(move |ctx| !a(ctx))),
        }
    }
}

impl<C> Clone for Filter<C> {
    fn clone(&self) -> Self {
        match self {
            Filter::Always => Filter::Always,
            Filter::Never => Filter::Never,
            Filter::Condition(f) => Filter::Condition(Rc::clone(f)),
        }
    }
}

impl<C> Default for Filter<C> {
    fn default() -> Self {
        Filter::Always
    }
}

impl<C> From<bool> for Filter<C> {
    fn from(value: bool) -> Self {
        Filter::from_bool(value)
    }
}

impl<C> fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Always => f.write_str("Always"),
            Filter::Never => f.write_str("Never"),
            Filter::Condition(_) => f.write_str("Condition(..)"),
        }
    }
}
