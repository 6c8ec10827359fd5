//! Escape sequence table and the prefix trie built from it.
//!
//! Every sequence maps to one or more logical keys (Alt+arrow arrives as a
//! single sequence but is dispatched as `Escape` followed by the arrow).
//! CPR responses and mouse reports have open-ended payloads and are matched
//! by regex instead of the table.

use std::sync::LazyLock;

use core_events::Key;
use regex::Regex;
use smallvec::SmallVec;
use tracing::trace;

use Key::*;

static ANSI_SEQUENCES: &[(&str, &[Key])] = &[
    ("\x00", &[Control('@')]),
    ("\x01", &[Control('a')]),
    ("\x02", &[Control('b')]),
    ("\x03", &[Control('c')]),
    ("\x04", &[Control('d')]),
    ("\x05", &[Control('e')]),
    ("\x06", &[Control('f')]),
    ("\x07", &[Control('g')]),
    ("\x08", &[Control('h')]),
    ("\x09", &[Control('i')]),
    ("\x0a", &[Control('j')]),
    ("\x0b", &[Control('k')]),
    ("\x0c", &[Control('l')]),
    ("\x0d", &[Control('m')]),
    ("\x0e", &[Control('n')]),
    ("\x0f", &[Control('o')]),
    ("\x10", &[Control('p')]),
    ("\x11", &[Control('q')]),
    ("\x12", &[Control('r')]),
    ("\x13", &[Control('s')]),
    ("\x14", &[Control('t')]),
    ("\x15", &[Control('u')]),
    ("\x16", &[Control('v')]),
    ("\x17", &[Control('w')]),
    ("\x18", &[Control('x')]),
    ("\x19", &[Control('y')]),
    ("\x1a", &[Control('z')]),
    ("\x1b", &[Escape]),
    ("\x1c", &[Control('\\')]),
    ("\x1d", &[Control(']')]),
    ("\x1e", &[Control('^')]),
    ("\x1f", &[Control('_')]),
    ("\x7f", &[Control('h')]),
    // Cursor keys, normal and application mode.
    ("\x1b[A", &[Up]),
    ("\x1b[B", &[Down]),
    ("\x1b[C", &[Right]),
    ("\x1b[D", &[Left]),
    ("\x1bOA", &[Up]),
    ("\x1bOB", &[Down]),
    ("\x1bOC", &[Right]),
    ("\x1bOD", &[Left]),
    ("\x1b[H", &[Home]),
    ("\x1b[F", &[End]),
    ("\x1bOH", &[Home]),
    ("\x1bOF", &[End]),
    ("\x1b[1~", &[Home]),
    ("\x1b[4~", &[End]),
    ("\x1b[7~", &[Home]),
    ("\x1b[8~", &[End]),
    ("\x1b[2~", &[Insert]),
    ("\x1b[3~", &[Delete]),
    ("\x1b[3;2~", &[ShiftDelete]),
    ("\x1b[3;5~", &[ControlDelete]),
    ("\x1b[5~", &[PageUp]),
    ("\x1b[6~", &[PageDown]),
    ("\x1b[Z", &[BackTab]),
    // Modified cursor keys (xterm).
    ("\x1b[1;5A", &[ControlUp]),
    ("\x1b[1;5B", &[ControlDown]),
    ("\x1b[1;5C", &[ControlRight]),
    ("\x1b[1;5D", &[ControlLeft]),
    ("\x1b[1;2A", &[ShiftUp]),
    ("\x1b[1;2B", &[ShiftDown]),
    ("\x1b[1;2C", &[ShiftRight]),
    ("\x1b[1;2D", &[ShiftLeft]),
    ("\x1b[1;3A", &[Escape, Up]),
    ("\x1b[1;3B", &[Escape, Down]),
    ("\x1b[1;3C", &[Escape, Right]),
    ("\x1b[1;3D", &[Escape, Left]),
    ("\x1b[1;5H", &[ControlHome]),
    ("\x1b[1;5F", &[ControlEnd]),
    ("\x1b[5A", &[ControlUp]),
    ("\x1b[5B", &[ControlDown]),
    ("\x1b[5C", &[ControlRight]),
    ("\x1b[5D", &[ControlLeft]),
    ("\x1bOc", &[ControlRight]),
    ("\x1bOd", &[ControlLeft]),
    // Function keys.
    ("\x1bOP", &[F(1)]),
    ("\x1bOQ", &[F(2)]),
    ("\x1bOR", &[F(3)]),
    ("\x1bOS", &[F(4)]),
    ("\x1b[[A", &[F(1)]),
    ("\x1b[[B", &[F(2)]),
    ("\x1b[[C", &[F(3)]),
    ("\x1b[[D", &[F(4)]),
    ("\x1b[[E", &[F(5)]),
    ("\x1b[11~", &[F(1)]),
    ("\x1b[12~", &[F(2)]),
    ("\x1b[13~", &[F(3)]),
    ("\x1b[14~", &[F(4)]),
    ("\x1b[15~", &[F(5)]),
    ("\x1b[17~", &[F(6)]),
    ("\x1b[18~", &[F(7)]),
    ("\x1b[19~", &[F(8)]),
    ("\x1b[20~", &[F(9)]),
    ("\x1b[21~", &[F(10)]),
    ("\x1b[23~", &[F(11)]),
    ("\x1b[24~", &[F(12)]),
    ("\x1b[25~", &[F(13)]),
    ("\x1b[26~", &[F(14)]),
    ("\x1b[28~", &[F(15)]),
    ("\x1b[29~", &[F(16)]),
    ("\x1b[31~", &[F(17)]),
    ("\x1b[32~", &[F(18)]),
    ("\x1b[33~", &[F(19)]),
    ("\x1b[34~", &[F(20)]),
    // Keypad centre and focus reports are swallowed.
    ("\x1b[E", &[Ignore]),
    ("\x1b[G", &[Ignore]),
    ("\x1b[I", &[Ignore]),
    ("\x1b[O", &[Ignore]),
    (PASTE_START, &[BracketedPaste]),
];

pub(crate) const PASTE_START: &str = "\x1b[200~";
pub(crate) const PASTE_END: &str = "\x1b[201~";

static CPR_RESPONSE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\x1b\[\d+;\d+R\z"));
static CPR_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"^\x1b\[[\d;]*\z"));
static MOUSE_EVENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)^\x1b\[(<?[\d;]+[mM]|M.{3})\z"));
static MOUSE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)^\x1b\[(<?[\d;]*|M.{0,2})\z"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are literals checked by the unit tests below.
        Err(err) => unreachable!("invalid escape pattern {pattern}: {err}"),
    }
}

#[derive(Default)]
struct TrieNode {
    edges: SmallVec<[(char, u32); 4]>,
    keys: Option<&'static [Key]>,
}

/// Prefix trie over `ANSI_SEQUENCES`.
pub(crate) struct SequenceTrie {
    nodes: Vec<TrieNode>,
}

/// Result of looking a buffered prefix up in the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lookup {
    pub exact: Option<&'static [Key]>,
    pub is_prefix_of_longer: bool,
}

impl SequenceTrie {
    fn build() -> Self {
        let mut trie = SequenceTrie {
            nodes: vec![TrieNode::default()],
        };
        for (seq, keys) in ANSI_SEQUENCES {
            let mut node = 0usize;
            for c in seq.chars() {
                let next = trie.nodes[node]
                    .edges
                    .iter()
                    .find(|(edge, _)| *edge == c)
                    .map(|(_, idx)| *idx as usize);
                node = match next {
                    Some(idx) => idx,
                    None => {
                        trie.nodes.push(TrieNode::default());
                        let idx = trie.nodes.len() - 1;
                        trie.nodes[node].edges.push((c, idx as u32));
                        idx
                    }
                };
            }
            trie.nodes[node].keys = Some(keys);
        }
        trace!(target: "input.parser", nodes = trie.nodes.len(), "sequence_trie_built");
        trie
    }

    pub(crate) fn lookup(&self, prefix: &str) -> Lookup {
        let mut node = 0usize;
        for c in prefix.chars() {
            match self.nodes[node].edges.iter().find(|(edge, _)| *edge == c) {
                Some((_, idx)) => node = *idx as usize,
                None => {
                    return Lookup {
                        exact: None,
                        is_prefix_of_longer: false,
                    };
                }
            }
        }
        Lookup {
            exact: self.nodes[node].keys,
            is_prefix_of_longer: !self.nodes[node].edges.is_empty(),
        }
    }
}

static TRIE: LazyLock<SequenceTrie> = LazyLock::new(SequenceTrie::build);

/// Logical keys for a complete buffered sequence, if it is one.
pub(crate) fn get_match(prefix: &str) -> Option<&'static [Key]> {
    if let Some(keys) = TRIE.lookup(prefix).exact {
        return Some(keys);
    }
    if CPR_RESPONSE.is_match(prefix) {
        return Some(&[CprResponse]);
    }
    if MOUSE_EVENT.is_match(prefix) {
        return Some(&[Mouse]);
    }
    None
}

/// Whether more input could still turn `prefix` into a longer sequence.
pub(crate) fn is_prefix_of_longer_match(prefix: &str) -> bool {
    CPR_PREFIX.is_match(prefix)
        || MOUSE_PREFIX.is_match(prefix)
        || TRIE.lookup(prefix).is_prefix_of_longer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_lookup() {
        assert_eq!(get_match("\x1b[A"), Some(&[Up][..]));
        assert!(is_prefix_of_longer_match("\x1b"));
        assert!(is_prefix_of_longer_match("\x1b[1;5"));
        assert!(!is_prefix_of_longer_match("\x1b[A"));
        assert!(!is_prefix_of_longer_match("a"));
        assert_eq!(get_match("a"), None);
    }

    #[test]
    fn cpr_and_mouse_patterns() {
        assert_eq!(get_match("\x1b[12;40R"), Some(&[CprResponse][..]));
        assert!(is_prefix_of_longer_match("\x1b[12;4"));
        assert_eq!(get_match("\x1b[<0;3;4M"), Some(&[Mouse][..]));
        assert_eq!(get_match("\x1b[M !!"), Some(&[Mouse][..]));
        assert!(is_prefix_of_longer_match("\x1b[M "));
    }

    #[test]
    fn every_sequence_resolves_to_its_keys() {
        for (seq, keys) in ANSI_SEQUENCES {
            assert_eq!(get_match(seq), Some(*keys), "sequence {seq:?}");
        }
    }
}
