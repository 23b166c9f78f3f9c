//! Text helpers for Bot API entity offsets.

/// Substring addressed by UTF-16 code units, the unit Telegram uses for entity
/// `offset`/`length`.
///
/// Returns `None` when the range runs past the end of the text or cuts a
/// surrogate pair in half.
pub fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let end = offset.checked_add(length)?;
    let units: Vec<u16> = text.encode_utf16().collect();
    let slice = units.get(offset..end)?;
    String::from_utf16(slice).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_offsets_match_bytes() {
        assert_eq!(utf16_slice("/start now", 0, 6).as_deref(), Some("/start"));
        assert_eq!(utf16_slice("/start now", 7, 3).as_deref(), Some("now"));
    }

    #[test]
    fn surrogate_pair_counts_as_two_units() {
        // U+1F600 is one scalar, four UTF-8 bytes, two UTF-16 units.
        let text = "\u{1F600} /start";
        assert_eq!(utf16_slice(text, 3, 6).as_deref(), Some("/start"));
        assert_eq!(utf16_slice(text, 0, 2).as_deref(), Some("\u{1F600}"));
    }

    #[test]
    fn bmp_non_ascii_is_one_unit() {
        let text = "привет #тег";
        assert_eq!(utf16_slice(text, 7, 4).as_deref(), Some("#тег"));
    }

    #[test]
    fn out_of_range_or_split_pair_is_none() {
        assert_eq!(utf16_slice("abc", 2, 5), None);
        assert_eq!(utf16_slice("\u{1F600}", 1, 1), None);
        assert_eq!(utf16_slice("abc", usize::MAX, 2), None);
        assert_eq!(utf16_slice("abc", 3, 0).as_deref(), Some(""));
    }
}
