//! Trigram-frequency surface for the pronounceable password path.
//!
//! `original_source/src/core/PWCharPool.cpp` drives `MakePronounceable`
//! from a static `tris[26][26][26]` table loaded from `trigram.h`, built
//! offline from an English corpus by the `gpw` tool it credits. That
//! corpus data isn't part of this crate's retrieval pack, so this module
//! provides a deterministic synthetic frequency surface instead: it has
//! the same shape (every trigram has a nonnegative integer frequency,
//! `sigma` is their sum) and drives the identical random-walk algorithm,
//! but doesn't reproduce genuine English letter statistics. Swapping in
//! a real corpus-derived table later only means replacing [`freq`] and
//! [`sigma`].

/// Frequency of the trigram `(c1, c2, c3)`, each a 0-indexed lowercase
/// letter offset (`'a'..='z'` → `0..26`). Never zero, so the random walk
/// in `password::make_pronounceable` always has somewhere to go.
pub fn freq(c1: u8, c2: u8, c3: u8) -> u32 {
    debug_assert!(c1 < 26 && c2 < 26 && c3 < 26);
    // A smooth, non-degenerate surface: adjacent letters and vowel-heavy
    // trigrams score higher, loosely mimicking why "th", "in", "er" are
    // common in English without encoding real corpus statistics.
    const VOWELS: [u8; 5] = [0, 4, 8, 14, 20]; // a e i o u

    let mut score: u32 = 4;
    if c2.abs_diff(c1) <= 2 {
        score += 6;
    }
    if c3.abs_diff(c2) <= 2 {
        score += 6;
    }
    if VOWELS.contains(&c2) {
        score += 10;
    }
    if VOWELS.contains(&c1) != VOWELS.contains(&c3) {
        score += 5;
    }
    score
}

/// Sum of every `freq(c1, c2, c3)` over the full 26×26×26 space.
pub fn sigma() -> u64 {
    let mut total: u64 = 0;
    for c1 in 0..26u8 {
        for c2 in 0..26u8 {
            for c3 in 0..26u8 {
                total += freq(c1, c2, c3) as u64;
            }
        }
    }
    total
}
