//! Bindings shared by Emacs and Vi: arrows, editing keys, Enter, Ctrl-C/D,
//! bracketed paste and quoted insert.

use core_events::{Key, KeyPress};
use core_keymap::RegistryError;
use core_text::ClipboardData;

use crate::filters::{
    buffer_empty, has_selection, insert_mode, is_multiline, is_repeat, quoted_insert,
};
use crate::named_commands as nc;
use crate::{BindingSet, Bindings, binding};

/// Keys that do nothing unless a mode binds them. Registering them first
/// keeps them from reaching self-insert.
const IGNORED: &[&str] = &[
    "c-a", "c-b", "c-c", "c-d", "c-e", "c-f", "c-g", "c-h", "c-i", "c-j", "c-k", "c-l", "c-m",
    "c-n", "c-o", "c-p", "c-q", "c-r", "c-s", "c-t", "c-u", "c-v", "c-w", "c-x", "c-y", "c-z",
    "c-@", "c-\\", "c-]", "c-^", "c-_", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9",
    "f10", "f11", "f12", "c-left", "c-right", "c-up", "c-down", "s-left", "s-right", "s-up",
    "s-down", "c-home", "c-end", "home", "end", "left", "right", "up", "down", "delete",
    "s-delete", "c-delete", "pageup", "pagedown", "s-tab", "insert", "<cpr>", "<mouse>",
    "<ignore>",
];

pub fn bindings() -> Result<Bindings, RegistryError> {
    let mut set = BindingSet::new();
    for keys in IGNORED {
        set.add(binding(keys, |_| Ok(())).save_before(false.into()));
    }

    set.add(binding("home", nc::beginning_of_line).named("beginning-of-line"));
    set.add(binding("end", nc::end_of_line).named("end-of-line"));
    set.add(binding("left", nc::backward_char).named("backward-char"));
    set.add(binding("right", nc::forward_char).named("forward-char"));
    set.add(binding("c-up", nc::previous_history));
    set.add(binding("c-down", nc::next_history));
    set.add(binding("c-l", nc::clear_screen));

    set.add(binding("c-k", nc::kill_line).filter(insert_mode()));
    set.add(binding("c-u", nc::unix_line_discard).filter(insert_mode()));
    set.add(binding("c-w", nc::unix_word_rubout).filter(insert_mode()));
    set.add(binding("c-t", nc::transpose_chars).filter(insert_mode()));
    set.add(
        binding("backspace", nc::backward_delete_char)
            .filter(insert_mode())
            .save_before(is_repeat().not()),
    );
    for keys in ["delete", "c-delete"] {
        set.add(
            binding(keys, nc::delete_char)
                .filter(insert_mode())
                .save_before(is_repeat().not()),
        );
    }
    set.add(
        binding("<any>", nc::self_insert)
            .filter(insert_mode())
            .save_before(is_repeat().not())
            .named("self-insert"),
    );
    set.add(binding("tab", nc::complete).filter(insert_mode()));
    set.add(binding("s-tab", nc::menu_complete_backward).filter(insert_mode()));
    set.add(binding("pageup", nc::previous_history).filter(has_selection().not()));
    set.add(binding("pagedown", nc::next_history).filter(has_selection().not()));

    set.add(binding("up", |e| {
        let count = e.count();
        e.buffer().auto_up(count, false)
    }));
    set.add(binding("down", |e| {
        let count = e.count();
        e.buffer().auto_down(count, false)
    }));
    set.add(
        binding("delete", |e| {
            let data = e.buffer().cut_selection(false)?;
            e.state.clipboard.set_data(data);
            Ok(())
        })
        .filter(has_selection()),
    );

    // Enter inserts a newline in multi-line buffers and accepts otherwise.
    set.add(
        binding("enter", |e| e.buffer().newline(true))
            .filter(insert_mode().and(is_multiline())),
    );
    set.add(
        binding("enter", nc::accept_line)
            .filter(is_multiline().not())
            .named("accept-line"),
    );
    set.add(binding("c-j", |e| {
        e.keep_arg();
        e.state.pending_feed.push_front(KeyPress::new(Key::ENTER, "\r"));
        Ok(())
    }));

    set.add(binding("c-c", |e| {
        e.state.abort();
        Ok(())
    }));
    set.add(
        binding("c-d", nc::delete_char).filter(insert_mode().and(buffer_empty().not())),
    );
    set.add(binding("c-d", nc::end_of_file).filter(buffer_empty()));

    set.add(binding("<paste>", |e| {
        let data = e.data().replace("\r\n", "\n").replace('\r', "\n");
        e.buffer().insert_text(&data, false, true)
    }));
    for (keys, target) in [("<scroll-up>", Key::Up), ("<scroll-down>", Key::Down)] {
        set.add(
            binding(keys, move |e| {
                e.state.pending_feed.push_front(KeyPress::key(target));
                Ok(())
            })
            .save_before(false.into()),
        );
    }

    set.add(
        binding("<any>", |e| {
            let data = e.data().to_string();
            e.state.quoted_insert = false;
            e.buffer().insert_text(&data, false, true)
        })
        .filter(quoted_insert())
        .eager(true),
    );
    set.finish()
}

/// Cut selection helper shared by Emacs and Vi.
pub(crate) fn cut_to_clipboard(
    e: &mut crate::KeyEvent<'_>,
    inclusive: bool,
) -> Result<ClipboardData, core_state::EditReadOnlyBuffer> {
    let data = e.buffer().cut_selection(inclusive)?;
    e.state.clipboard.set_data(data.clone());
    Ok(data)
}
