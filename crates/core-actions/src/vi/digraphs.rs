//! RFC 1345 digraphs for Vi `C-k {char1} {char2}`.

use std::sync::LazyLock;

use ahash::AHashMap;

const TABLE: &[(char, char, char)] = &[
    // Latin-1 punctuation and symbols
    ('N', 'S', '\u{a0}'),
    ('!', 'I', '¡'),
    ('C', 't', '¢'),
    ('P', 'd', '£'),
    ('C', 'u', '¤'),
    ('Y', 'e', '¥'),
    ('B', 'B', '¦'),
    ('S', 'E', '§'),
    ('\'', ':', '¨'),
    ('C', 'o', '©'),
    ('-', 'a', 'ª'),
    ('<', '<', '«'),
    ('N', 'O', '¬'),
    ('-', '-', '\u{ad}'),
    ('R', 'g', '®'),
    ('\'', 'm', '¯'),
    ('D', 'G', '°'),
    ('+', '-', '±'),
    ('2', 'S', '²'),
    ('3', 'S', '³'),
    ('\'', '\'', '´'),
    ('M', 'y', 'µ'),
    ('P', 'I', '¶'),
    ('.', 'M', '·'),
    ('\'', ',', '¸'),
    ('1', 'S', '¹'),
    ('-', 'o', 'º'),
    ('>', '>', '»'),
    ('1', '4', '¼'),
    ('1', '2', '½'),
    ('3', '4', '¾'),
    ('?', 'I', '¿'),
    ('*', 'X', '×'),
    ('-', ':', '÷'),
    // Latin-1 letters
    ('A', '!', 'À'),
    ('A', '\'', 'Á'),
    ('A', '>', 'Â'),
    ('A', '?', 'Ã'),
    ('A', ':', 'Ä'),
    ('A', 'A', 'Å'),
    ('A', 'E', 'Æ'),
    ('C', ',', 'Ç'),
    ('E', '!', 'È'),
    ('E', '\'', 'É'),
    ('E', '>', 'Ê'),
    ('E', ':', 'Ë'),
    ('I', '!', 'Ì'),
    ('I', '\'', 'Í'),
    ('I', '>', 'Î'),
    ('I', ':', 'Ï'),
    ('D', '-', 'Ð'),
    ('N', '?', 'Ñ'),
    ('O', '!', 'Ò'),
    ('O', '\'', 'Ó'),
    ('O', '>', 'Ô'),
    ('O', '?', 'Õ'),
    ('O', ':', 'Ö'),
    ('O', '/', 'Ø'),
    ('U', '!', 'Ù'),
    ('U', '\'', 'Ú'),
    ('U', '>', 'Û'),
    ('U', ':', 'Ü'),
    ('Y', '\'', 'Ý'),
    ('T', 'H', 'Þ'),
    ('s', 's', 'ß'),
    ('a', '!', 'à'),
    ('a', '\'', 'á'),
    ('a', '>', 'â'),
    ('a', '?', 'ã'),
    ('a', ':', 'ä'),
    ('a', 'a', 'å'),
    ('a', 'e', 'æ'),
    ('c', ',', 'ç'),
    ('e', '!', 'è'),
    ('e', '\'', 'é'),
    ('e', '>', 'ê'),
    ('e', ':', 'ë'),
    ('i', '!', 'ì'),
    ('i', '\'', 'í'),
    ('i', '>', 'î'),
    ('i', ':', 'ï'),
    ('d', '-', 'ð'),
    ('n', '?', 'ñ'),
    ('o', '!', 'ò'),
    ('o', '\'', 'ó'),
    ('o', '>', 'ô'),
    ('o', '?', 'õ'),
    ('o', ':', 'ö'),
    ('o', '/', 'ø'),
    ('u', '!', 'ù'),
    ('u', '\'', 'ú'),
    ('u', '>', 'û'),
    ('u', ':', 'ü'),
    ('y', '\'', 'ý'),
    ('t', 'h', 'þ'),
    ('y', ':', 'ÿ'),
    // Latin Extended-A (selection)
    ('C', '<', 'Č'),
    ('c', '<', 'č'),
    ('E', '<', 'Ě'),
    ('e', '<', 'ě'),
    ('L', '/', 'Ł'),
    ('l', '/', 'ł'),
    ('N', '<', 'Ň'),
    ('n', '<', 'ň'),
    ('O', 'E', 'Œ'),
    ('o', 'e', 'œ'),
    ('R', '<', 'Ř'),
    ('r', '<', 'ř'),
    ('S', '<', 'Š'),
    ('s', '<', 'š'),
    ('Z', '<', 'Ž'),
    ('z', '<', 'ž'),
    // Greek
    ('A', '*', 'Α'),
    ('B', '*', 'Β'),
    ('G', '*', 'Γ'),
    ('D', '*', 'Δ'),
    ('E', '*', 'Ε'),
    ('Z', '*', 'Ζ'),
    ('Y', '*', 'Η'),
    ('H', '*', 'Θ'),
    ('I', '*', 'Ι'),
    ('K', '*', 'Κ'),
    ('L', '*', 'Λ'),
    ('M', '*', 'Μ'),
    ('N', '*', 'Ν'),
    ('C', '*', 'Ξ'),
    ('O', '*', 'Ο'),
    ('P', '*', 'Π'),
    ('R', '*', 'Ρ'),
    ('S', '*', 'Σ'),
    ('T', '*', 'Τ'),
    ('U', '*', 'Υ'),
    ('F', '*', 'Φ'),
    ('X', '*', 'Χ'),
    ('Q', '*', 'Ψ'),
    ('W', '*', 'Ω'),
    ('a', '*', 'α'),
    ('b', '*', 'β'),
    ('g', '*', 'γ'),
    ('d', '*', 'δ'),
    ('e', '*', 'ε'),
    ('z', '*', 'ζ'),
    ('y', '*', 'η'),
    ('h', '*', 'θ'),
    ('i', '*', 'ι'),
    ('k', '*', 'κ'),
    ('l', '*', 'λ'),
    ('m', '*', 'μ'),
    ('n', '*', 'ν'),
    ('c', '*', 'ξ'),
    ('o', '*', 'ο'),
    ('p', '*', 'π'),
    ('r', '*', 'ρ'),
    ('*', 's', 'ς'),
    ('s', '*', 'σ'),
    ('t', '*', 'τ'),
    ('u', '*', 'υ'),
    ('f', '*', 'φ'),
    ('x', '*', 'χ'),
    ('q', '*', 'ψ'),
    ('w', '*', 'ω'),
    // Punctuation, currency, arrows, math
    ('-', 'N', '–'),
    ('-', 'M', '—'),
    ('\'', '6', '‘'),
    ('\'', '9', '’'),
    ('"', '6', '“'),
    ('"', '9', '”'),
    ('/', '-', '†'),
    ('/', '=', '‡'),
    ('.', '.', '‥'),
    (',', '.', '…'),
    ('%', '0', '‰'),
    ('E', 'u', '€'),
    ('=', 'R', '₽'),
    ('o', 'C', '℃'),
    ('T', 'M', '™'),
    ('<', '-', '←'),
    ('-', '!', '↑'),
    ('-', '>', '→'),
    ('-', 'v', '↓'),
    ('<', '>', '↔'),
    ('=', '>', '⇒'),
    ('=', '=', '⇔'),
    ('F', 'A', '∀'),
    ('d', 'P', '∂'),
    ('T', 'E', '∃'),
    ('/', '0', '∅'),
    ('(', '-', '∈'),
    ('*', 'P', '∏'),
    ('+', 'Z', '∑'),
    ('R', 'T', '√'),
    ('0', '0', '∞'),
    ('A', 'N', '∧'),
    ('O', 'R', '∨'),
    ('(', 'U', '∩'),
    (')', 'U', '∪'),
    ('I', 'n', '∫'),
    ('?', '=', '≅'),
    ('?', '2', '≈'),
    ('!', '=', '≠'),
    ('=', '3', '≡'),
    ('=', '<', '≤'),
    ('>', '=', '≥'),
    ('O', 'K', '✓'),
    ('X', 'X', '✗'),
];

static DIGRAPHS: LazyLock<AHashMap<(char, char), char>> =
    LazyLock::new(|| TABLE.iter().map(|&(a, b, c)| ((a, b), c)).collect());

/// Character for the pair, trying the reversed order as Vim does.
pub fn lookup(first: char, second: char) -> Option<char> {
    DIGRAPHS
        .get(&(first, second))
        .or_else(|| DIGRAPHS.get(&(second, first)))
        .copied()
}
