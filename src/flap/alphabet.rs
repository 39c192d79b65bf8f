//! The fixed glyph wheel every flap rolls through.

pub const ALPHABET_LEN: usize = 41;

/// Glyph order on the physical wheel. Index 0 is the blank flap. `0` appears
/// twice; lookups resolve to the first one.
pub const ALPHABET: [char; ALPHABET_LEN] = [
    ' ', 'A', 'B', '0', 'C', 'D', '1', 'E', 'F', '2', 'G', 'H', '3', 'I', 'J', '4', 'K', 'L', '5',
    'M', 'N', '6', 'O', 'P', '7', 'Q', 'R', '8', 'S', 'T', '9', 'U', 'V', '0', 'W', 'X', '$', 'Y',
    'Z', ',', '.',
];

pub const BLANK_INDEX: usize = 0;

/// Position of `c` on the wheel, case-insensitive. Anything not on the wheel is blank.
pub fn index_of(c: char) -> usize {
    let upper = c.to_ascii_uppercase();
    ALPHABET
        .iter()
        .position(|&g| g == upper)
        .unwrap_or(BLANK_INDEX)
}

pub fn glyph(index: usize) -> char {
    ALPHABET.get(index).copied().unwrap_or(' ')
}
