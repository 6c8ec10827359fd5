//! Keys that act on an open completion menu.

use core_keymap::RegistryError;
use core_state::{CompleteEvent, CompletionSelect};

use crate::filters::{completion_selected, has_completions, insert_mode, vi_insert_mode};
use crate::{BindingSet, Bindings, binding};

pub fn bindings() -> Result<Bindings, RegistryError> {
    let mut set = BindingSet::new();

    // Enter keeps the selected candidate instead of accepting the line.
    set.add(
        binding("enter", |e| {
            e.buffer().close_completion();
            Ok(())
        })
        .filter(completion_selected().and(insert_mode())),
    );

    let vi_menu = vi_insert_mode().and(has_completions());
    for keys in ["c-g", "c-y"] {
        set.add(
            binding(keys, |e| {
                e.buffer().close_completion();
                Ok(())
            })
            .filter(vi_menu.clone()),
        );
    }
    set.add(binding("c-e", |e| e.buffer().cancel_completion()).filter(vi_menu));

    set.add(
        binding("c-space", |e| {
            e.buffer()
                .start_completion(CompletionSelect::None, true, CompleteEvent::requested())
                .map(|_| ())
        })
        .filter(vi_insert_mode()),
    );
    set.finish()
}
