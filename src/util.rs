/// Truncates to at most `max` characters without splitting a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn long_strings_are_cut_at_char_count() {
        assert_eq!(truncate_chars("abcdef", 4), "abcd");
    }

    #[test]
    fn multibyte_text_is_not_split_mid_char() {
        let hindi = "सोना महंगा है";
        let cut = truncate_chars(hindi, 4);
        assert_eq!(cut.chars().count(), 4);
        assert!(hindi.starts_with(cut));
    }
}
