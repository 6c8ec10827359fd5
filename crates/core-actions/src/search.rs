//! Keys while an incremental search is active.
//!
//! Printable keys extend the query. Any other unbound key accepts the
//! search and is then handled as if typed normally.

use core_keymap::RegistryError;
use core_state::SearchDirection;
use tracing::trace;

use crate::{BindingSet, Bindings, HandlerResult, KeyEvent, binding};

fn accept(e: &mut KeyEvent<'_>) -> HandlerResult {
    e.buffer().exit_isearch(true);
    Ok(())
}

fn abort(e: &mut KeyEvent<'_>) -> HandlerResult {
    e.buffer().exit_isearch(false);
    Ok(())
}

fn search_next(e: &mut KeyEvent<'_>, direction: SearchDirection) -> HandlerResult {
    let count = e.count();
    let buffer = e.buffer();
    buffer.search_next(direction, count);
    if buffer.isearch().is_some_and(|s| s.failing()) {
        e.state.ring_bell();
    }
    Ok(())
}

pub fn bindings() -> Result<Bindings, RegistryError> {
    let mut set = BindingSet::new();
    set.add(
        binding("<any>", |e| {
            let Some(press) = e.keys.last().cloned() else {
                return Ok(());
            };
            if press.key.is_printable() {
                e.buffer().extend_search_text(&press.data);
                return Ok(());
            }
            trace!(target: "actions.dispatch", key = %press.key, "search_accept_and_refeed");
            e.buffer().exit_isearch(true);
            e.state.pending_feed.push_front(press);
            Ok(())
        })
        .save_before(false.into()),
    );
    set.add(
        binding("backspace", |e| {
            e.buffer().shrink_search_text();
            Ok(())
        })
        .save_before(false.into()),
    );
    set.add(binding("enter", accept));
    for keys in ["c-g", "c-c", "escape"] {
        set.add(binding(keys, abort).save_before(false.into()));
    }
    set.add(binding("c-r", |e| search_next(e, SearchDirection::Backward)).save_before(false.into()));
    set.add(binding("c-s", |e| search_next(e, SearchDirection::Forward)).save_before(false.into()));
    set.finish()
}
