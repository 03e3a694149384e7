use std::borrow::Cow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Require a terminating `;` on named entities.
    pub strict: bool,
    /// Decode `&nbsp;` (and literal U+00A0) as a plain space.
    pub nbsp_as_space: bool,
}

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("copy", '\u{00A9}'),
    ("reg", '\u{00AE}'),
    ("trade", '\u{2122}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("laquo", '\u{00AB}'),
    ("raquo", '\u{00BB}'),
    ("middot", '\u{00B7}'),
    ("bull", '\u{2022}'),
    ("times", '\u{00D7}'),
    ("divide", '\u{00F7}'),
    ("euro", '\u{20AC}'),
    ("pound", '\u{00A3}'),
    ("yen", '\u{00A5}'),
    ("cent", '\u{00A2}'),
    ("sect", '\u{00A7}'),
    ("para", '\u{00B6}'),
    ("deg", '\u{00B0}'),
    ("plusmn", '\u{00B1}'),
    ("frac12", '\u{00BD}'),
    ("shy", '\u{00AD}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
];

// Names browsers still accept without a trailing `;`.
const LEGACY_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "nbsp", "copy", "reg"];

const MAX_NAME_LEN: usize = 8;

fn lookup_named(name: &str) -> Option<char> {
    NAMED_ENTITIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, ch)| *ch)
}

/// Decode HTML entities.
///
/// Contract:
/// - Named entities from a common subset decode when `;`-terminated; in non-strict mode the
///   legacy names (`amp`, `lt`, `gt`, `quot`, `nbsp`, `copy`, `reg`) also decode without it.
/// - Numeric entities decode only when well-formed and semicolon-terminated:
///   `&#123;` (decimal) and `&#x1F4A9;` (hex).
/// - Only valid Unicode scalar values decode; invalid scalars pass through unchanged.
/// - Unknown names, malformed numerics, or overlong digit runs are left unchanged.
pub fn decode_entities(s: &str, options: DecodeOptions) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut copy_start = 0;

    const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
    const MAX_DEC_DIGITS: usize = 7; // 1114111

    // Bounded scan to avoid quadratic behavior on adversarial input.
    fn scan_numeric_entity(
        bytes: &[u8],
        start: usize,
        max_digits: usize,
        is_hex: bool,
    ) -> Option<usize> {
        let mut j = start;
        let mut digits = 0usize;

        while j < bytes.len() {
            let b = bytes[j];
            if b == b';' {
                return (digits > 0).then_some(j);
            }
            if digits == max_digits {
                return None;
            }
            let ok = if is_hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            };
            if !ok {
                return None;
            }
            digits += 1;
            j += 1;
        }

        None
    }

    fn emit_malformed_entity(out: &mut String, s: &str, bytes: &[u8], start: usize) -> usize {
        let mut j = start + 1;
        while j < bytes.len() {
            let b = bytes[j];
            // Stop at `;`, whitespace, or `&` to avoid spanning into adjacent tokens.
            if b == b';' {
                out.push_str(&s[start..=j]);
                return j + 1;
            }
            if b == b'&' || b.is_ascii_whitespace() {
                out.push_str(&s[start..j]);
                return j;
            }
            j += 1;
        }
        out.push_str(&s[start..]);
        bytes.len()
    }

    fn starts_with_bytes(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
        bytes.get(i..i + pat.len()).is_some_and(|s| s == pat)
    }

    let push_decoded = |out: &mut String, ch: char| {
        if options.nbsp_as_space && ch == '\u{00A0}' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    };

    while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }

        // Flush bytes up to '&' unchanged (preserves UTF-8).
        if copy_start < i {
            out.push_str(&s[copy_start..i]);
        }

        // named entities
        let name_start = i + 1;
        let mut j = name_start;
        while j < bytes.len() && j - name_start < MAX_NAME_LEN && bytes[j].is_ascii_alphanumeric()
        {
            j += 1;
        }
        if j > name_start {
            let name = &s[name_start..j];
            let terminated = bytes.get(j) == Some(&b';');
            if let Some(ch) = lookup_named(name) {
                if terminated {
                    push_decoded(&mut out, ch);
                    i = j + 1;
                    copy_start = i;
                    continue;
                }
                let followed_by_name_char = bytes.get(j).is_some_and(|b| b.is_ascii_alphanumeric());
                if !options.strict && !followed_by_name_char && LEGACY_ENTITIES.contains(&name) {
                    push_decoded(&mut out, ch);
                    i = j;
                    copy_start = i;
                    continue;
                }
            }
        }

        // numeric entities: &#123; or &#x1F4A9;
        if starts_with_bytes(bytes, i, b"&#x") || starts_with_bytes(bytes, i, b"&#X") {
            let digits_start = i + 3;
            let Some(end) = scan_numeric_entity(bytes, digits_start, MAX_HEX_DIGITS, true) else {
                i = emit_malformed_entity(&mut out, s, bytes, i);
                copy_start = i;
                continue;
            };

            let hex = &s[digits_start..end];
            if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                push_decoded(&mut out, ch);
            } else {
                // Known end; preserve entire sequence unchanged.
                out.push_str(&s[i..=end]);
            }
            i = end + 1;
            copy_start = i;
            continue;
        } else if starts_with_bytes(bytes, i, b"&#") {
            let digits_start = i + 2;
            let Some(end) = scan_numeric_entity(bytes, digits_start, MAX_DEC_DIGITS, false) else {
                i = emit_malformed_entity(&mut out, s, bytes, i);
                copy_start = i;
                continue;
            };

            let dec = &s[digits_start..end];
            if let Some(ch) = dec.parse::<u32>().ok().and_then(char::from_u32) {
                push_decoded(&mut out, ch);
            } else {
                out.push_str(&s[i..=end]);
            }
            i = end + 1;
            copy_start = i;
            continue;
        }

        // fallback to keep '&' as-is
        out.push('&');
        i += 1;
        copy_start = i;
    }

    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }

    if options.nbsp_as_space && out.contains('\u{00A0}') {
        out = out.replace('\u{00A0}', " ");
    }

    out
}

fn encode_with(s: &str, quote_sensitive: bool) -> Cow<'_, str> {
    let needs_escape = |ch: char| match ch {
        '&' | '<' | '>' | '\u{00A0}' => true,
        '"' | '\'' => quote_sensitive,
        _ => false,
    };
    if !s.chars().any(needs_escape) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            '"' if quote_sensitive => out.push_str("&quot;"),
            '\'' if quote_sensitive => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escape text content for serialization.
pub fn encode_text(s: &str) -> Cow<'_, str> {
    encode_with(s, false)
}

/// Escape an attribute value so it is safe inside either quote style.
pub fn encode_attribute(s: &str) -> Cow<'_, str> {
    encode_with(s, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: DecodeOptions = DecodeOptions {
        strict: true,
        nbsp_as_space: false,
    };

    fn strict(s: &str) -> String {
        decode_entities(s, STRICT)
    }

    fn lenient(s: &str) -> String {
        decode_entities(s, DecodeOptions::default())
    }

    #[test]
    fn decode_entities_preserves_utf8() {
        assert_eq!(strict("120×32"), "120×32");
    }

    #[test]
    fn decode_entities_decodes_common_entities() {
        assert_eq!(strict("a &amp; b"), "a & b");
        assert_eq!(strict("&lt;tag&gt;"), "<tag>");
        assert_eq!(strict("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(strict("&apos;x&apos;"), "'x'");
        assert_eq!(strict("a&nbsp;b"), "a\u{00A0}b");
        assert_eq!(strict("&copy; 2024 &mdash; x"), "\u{00A9} 2024 \u{2014} x");
    }

    #[test]
    fn decode_entities_decodes_numeric_entities() {
        assert_eq!(strict("&#215;"), "×");
        assert_eq!(strict("&#xD7;"), "×");
    }

    #[test]
    fn strict_mode_passes_through_unknown_and_missing_semicolon() {
        assert_eq!(
            strict("before &notanentity; after"),
            "before &notanentity; after"
        );
        assert_eq!(strict("&amp"), "&amp");
        assert_eq!(strict("loose &amp space"), "loose &amp space");
        assert_eq!(strict("&#xD7 "), "&#xD7 ");
        assert_eq!(strict("&#215 "), "&#215 ");
    }

    #[test]
    fn lenient_mode_accepts_legacy_names_without_semicolon() {
        assert_eq!(lenient("loose &amp space"), "loose & space");
        assert_eq!(lenient("a&ltb"), "a&ltb");
        assert_eq!(lenient("a &lt b"), "a < b");
        assert_eq!(lenient("&copy"), "\u{00A9}");
        assert_eq!(lenient("&mdash x"), "&mdash x");
        assert_eq!(lenient("&#215 "), "&#215 ");
    }

    #[test]
    fn decode_entities_passes_through_malformed_numeric() {
        assert_eq!(strict("&#xZZ;"), "&#xZZ;");
        assert_eq!(strict("&#99999999;"), "&#99999999;");
        assert_eq!(strict("&#xD800;"), "&#xD800;");
        assert_eq!(strict("&#x110000;"), "&#x110000;");
        assert_eq!(strict("&#-1;"), "&#-1;");
        assert_eq!(strict("&#12345678"), "&#12345678");
        assert_eq!(strict("&#;"), "&#;");
        assert_eq!(strict("&#x;"), "&#x;");
    }

    #[test]
    fn decode_entities_respects_numeric_digit_limits() {
        assert_eq!(strict("&#1114111;"), "\u{10FFFF}");
        assert_eq!(strict("&#11141111;"), "&#11141111;");
        assert_eq!(strict("&#x10FFFF;"), "\u{10FFFF}");
    }

    #[test]
    fn nbsp_as_space_covers_entities_and_literals() {
        let options = DecodeOptions {
            strict: false,
            nbsp_as_space: true,
        };
        assert_eq!(decode_entities("a&nbsp;b\u{00A0}c&#160;d", options), "a b c d");
    }

    #[test]
    fn decode_entities_property_like_adversarial_inputs() {
        let unchanged = [
            "", "plain text", "πσ", "&", "&&", "&;", "&#;", "&#x;", "&unknown;", "&#xZZ;",
            "&#9999999;",
        ];
        for s in unchanged {
            assert_eq!(strict(s), s);
            assert_eq!(lenient(s), s);
        }
    }

    #[test]
    fn malformed_entity_allows_following_entity() {
        assert_eq!(strict("&#xZZ;&amp;"), "&#xZZ;&");
    }

    #[test]
    fn encode_text_escapes_markup_characters_only() {
        assert_eq!(encode_text("a < b & \"c\""), "a &lt; b &amp; \"c\"");
        assert_eq!(encode_text("a\u{00A0}b"), "a&nbsp;b");
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn encode_attribute_escapes_quotes() {
        assert_eq!(encode_attribute("say \"hi\" & 'bye'"), "say &quot;hi&quot; &amp; &#39;bye&#39;");
    }

    #[test]
    fn encode_then_decode_restores_text() {
        let text = "x < y && \"q\" \u{00A0}'";
        assert_eq!(strict(&encode_attribute(text)), text);
    }
}
