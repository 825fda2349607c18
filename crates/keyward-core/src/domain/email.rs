/// Lower-cases an email address one character at a time.
///
/// Characters whose lowercase form expands to more than one character are kept as-is,
/// so the result always has the same number of characters as the input. Whitespace and
/// structure are left untouched; shape checks belong to validation.
pub fn normalize_email(value: &str) -> String {
    value.chars().map(simple_lowercase).collect()
}

fn simple_lowercase(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn normalize_email_lowercases() {
        assert_eq!(normalize_email("Foo@Bar.COM"), "foo@bar.com");
    }

    #[test]
    fn normalize_email_keeps_whitespace() {
        assert_eq!(normalize_email("  Ada@Example.com "), "  ada@example.com ");
    }

    #[test]
    fn normalize_email_is_idempotent() {
        for raw in ["Foo@Bar.COM", "ÄDA@EXAMPLE.COM", "mixed.Case+Tag@Sub.Example.Org", ""] {
            let once = normalize_email(raw);
            assert_eq!(normalize_email(&once), once);
        }
    }

    #[test]
    fn normalize_email_preserves_char_count() {
        // U+0130 lowercases to two chars under full mapping; it must stay one.
        for raw in ["İSTANBUL@EXAMPLE.COM", "Grüße@Example.de", "A@B.CO"] {
            let normalized = normalize_email(raw);
            assert_eq!(normalized.chars().count(), raw.chars().count());
        }
    }

    #[test]
    fn normalize_email_output_has_no_uppercase_ascii() {
        let normalized = normalize_email("SHOUTING.USER@EXAMPLE.COM");
        assert!(!normalized.chars().any(|ch| ch.is_ascii_uppercase()));
    }
}
