//! Base-36 glyph codec and the allow-list of legal glyphs.
//!
//! Every cell of the grid holds a single character. Numeric operands are read
//! through the alphabet `0-9a-z`, so `'a'` and `'A'` both decode to 10 and
//! `'z'` decodes to 35. The empty glyph and the bang glyph both decode to 0.

/// Glyph occupying every blank cell.
pub const EMPTY: char = '.';

/// One-tick trigger pulse that activates adjacent lowercase operators.
pub const BANG: char = '*';

/// Glyph that disables the remainder of a row until a matching comment glyph.
pub const COMMENT: char = '#';

/// Number of symbols in the base-36 alphabet.
pub const RADIX: u32 = 36;

const KEYS: [char; RADIX as usize] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Punctuation glyphs that host special or I/O operators.
pub const SPECIALS: [char; 9] = ['*', '#', '$', ':', '!', '?', '%', '=', ';'];

/// Decodes a glyph into its base-36 value.
///
/// Empty, bang and any glyph outside the alphabet decode to 0. Letters are
/// case-insensitive.
#[must_use]
pub fn value_of(glyph: char) -> u32 {
    glyph.to_digit(RADIX).unwrap_or(0)
}

/// Encodes a value into its base-36 glyph, wrapping modulo 36.
///
/// Negative values wrap the same way so that `key_of(-1) == 'z'`.
#[must_use]
pub fn key_of(value: i64) -> char {
    let index = value.rem_euclid(i64::from(RADIX));
    KEYS[usize::try_from(index).unwrap_or(0)]
}

/// Encodes a value into its base-36 glyph and optionally upper-cases it.
#[must_use]
pub fn key_of_cased(value: i64, uppercase: bool) -> char {
    let key = key_of(value);
    if uppercase {
        key.to_ascii_uppercase()
    } else {
        key
    }
}

/// Reports whether the glyph may be stored in the grid.
///
/// The allow-list contains the empty glyph, ASCII digits and letters of both
/// cases, and the special operator glyphs.
#[must_use]
pub fn is_allowed(glyph: char) -> bool {
    glyph == EMPTY || glyph.is_ascii_alphanumeric() || SPECIALS.contains(&glyph)
}

/// Reports whether the glyph is a non-numeric glyph without case.
#[must_use]
pub fn is_special(glyph: char) -> bool {
    !glyph.is_ascii_alphanumeric() && glyph.to_ascii_lowercase() == glyph.to_ascii_uppercase()
}

/// Reports whether an operator hosted by this glyph runs every tick.
///
/// Uppercase letters are passive; so are digits and punctuation, whose
/// upper-case form equals themselves.
#[must_use]
pub fn is_passive(glyph: char) -> bool {
    glyph.to_ascii_uppercase() == glyph
}

/// Replaces a disallowed glyph with [`EMPTY`].
#[must_use]
pub fn sanitize(glyph: char) -> char {
    if is_allowed(glyph) {
        glyph
    } else {
        EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_bang_decode_to_zero() {
        assert_eq!(value_of(EMPTY), 0);
        assert_eq!(value_of(BANG), 0);
        assert_eq!(value_of('#'), 0);
    }

    #[test]
    fn letters_decode_case_insensitively() {
        assert_eq!(value_of('a'), 10);
        assert_eq!(value_of('A'), 10);
        assert_eq!(value_of('z'), 35);
        assert_eq!(value_of('9'), 9);
    }

    #[test]
    fn key_of_wraps_and_cases() {
        assert_eq!(key_of(36), '0');
        assert_eq!(key_of(37), '1');
        assert_eq!(key_of(-1), 'z');
        assert_eq!(key_of_cased(11, true), 'B');
        assert_eq!(key_of_cased(3, true), '3');
    }

    #[test]
    fn allow_list_rejects_foreign_glyphs() {
        for glyph in ['.', 'a', 'Z', '5', '*', '#', '$', ':', '!', '?', '%', '=', ';'] {
            assert!(is_allowed(glyph), "{glyph} should be allowed");
        }
        for glyph in [' ', '\n', '@', '&', '/', 'é'] {
            assert!(!is_allowed(glyph), "{glyph} should be rejected");
        }
        assert_eq!(sanitize('@'), EMPTY);
        assert_eq!(sanitize('q'), 'q');
    }

    #[test]
    fn case_decides_passivity() {
        assert!(is_passive('A'));
        assert!(!is_passive('a'));
        assert!(is_passive('7'));
        assert!(is_passive('#'));
        assert!(is_special('#'));
        assert!(!is_special('4'));
    }

    proptest! {
        #[test]
        fn codec_inverts_modulo_radix(value in any::<i32>()) {
            let value = i64::from(value);
            let expected = u32::try_from(value.rem_euclid(36)).unwrap();
            prop_assert_eq!(value_of(key_of(value)), expected);
        }

        #[test]
        fn codec_is_bijective_over_alphabet(index in 0u32..36) {
            prop_assert_eq!(value_of(key_of(i64::from(index))), index);
            prop_assert_eq!(value_of(key_of_cased(i64::from(index), true)), index);
        }
    }
}
