//! Lenient markup tokenizer feeding the tree builder.
//!
//! Tag and attribute names use the ASCII character class `[A-Za-z0-9:_-]`.
//! Text and attribute values are emitted raw; entity decoding belongs to the tree builder so
//! that attribute value offsets keep pointing into the source.
//!
//! Known limitations (intentional):
//! - No HTML5 parse-error recovery. A `<` that cannot open markup is kept as text.
//! - Rawtext close-tag scanning accepts only ASCII whitespace before `>` (see
//!   `find_rawtext_close_tag`).
use crate::types::{AttrValue, Attribute, Quote, Token, TokenStream};
use memchr::memchr;

const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

// it only attempts matches starting at ASCII <
// < cannot appear in UTF-8 continuation bytes
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<(usize, usize)> {
    let hay_bytes = haystack.as_bytes();
    let len = hay_bytes.len();
    let n = close_tag.len();
    debug_assert!(n >= 2);
    debug_assert!(close_tag[0] == b'<' && close_tag[1] == b'/');
    if len < n {
        return None;
    }
    let mut i = 0;
    while i + n <= len {
        let rel = memchr(b'<', &hay_bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if hay_bytes[i + 1] == b'/' && starts_with_ignore_ascii_case_at(hay_bytes, i, close_tag) {
            let mut k = i + n;
            while k < len && hay_bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && hay_bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

/// `<` starts markup only when followed by a tag name, `/` or `!`.
fn opens_markup(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && bytes
            .get(i + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/' || b == b'!')
}

/// Tokenizes markup, recording the source offset of every start tag and attribute value.
pub fn tokenize(input: &str) -> TokenStream {
    let mut out = Vec::new();
    let mut i = 0;
    let bytes = input.as_bytes();
    let len = bytes.len();
    // Invariant: slices are only cut at ASCII structural bytes, so every endpoint is a
    // UTF-8 char boundary.
    while i < len {
        if !opens_markup(bytes, i) {
            let start = i;
            loop {
                match memchr(b'<', &bytes[i..]) {
                    Some(rel) => {
                        i += rel;
                        if opens_markup(bytes, i) {
                            break;
                        }
                        i += 1;
                    }
                    None => {
                        i = len;
                        break;
                    }
                }
            }
            debug_assert!(input.is_char_boundary(start));
            debug_assert!(input.is_char_boundary(i));
            out.push(Token::Text(input[start..i].to_string()));
            continue;
        }

        if input[i..].starts_with(HTML_COMMENT_START) {
            let body_start = i + HTML_COMMENT_START.len();
            // Scan for the comment terminator once per comment (linear in comment length).
            if let Some(end) = input[body_start..].find(HTML_COMMENT_END) {
                out.push(Token::Comment(input[body_start..body_start + end].to_string()));
                i = body_start + end + HTML_COMMENT_END.len();
                continue;
            }
            out.push(Token::Comment(input[body_start..].to_string()));
            break;
        }

        if bytes[i + 1] == b'!' {
            // doctype and other declarations, including the `<!/>` wrap-site marker
            let rest = &input[i + 2..];
            match memchr(b'>', rest.as_bytes()) {
                Some(end) => {
                    out.push(Token::Declaration(rest[..end].trim().to_string()));
                    i += 2 + end + 1;
                    continue;
                }
                None => {
                    out.push(Token::Declaration(rest.trim().to_string()));
                    break;
                }
            }
        }

        // end tag?
        if bytes[i + 1] == b'/' {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_char(bytes[j]) {
                j += 1;
            }
            let name = input[start..j].to_ascii_lowercase();
            // skip to '>'
            j += memchr(b'>', &bytes[j..]).map_or(len - j, |rel| rel + 1);
            out.push(Token::EndTag(name));
            i = j;
            continue;
        }

        // start tag
        let tag_start = i;
        let name_start = i + 1;
        let mut k = name_start;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        let raw_name = &input[name_start..k];
        let name = raw_name.to_ascii_lowercase();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        let skip_whitespace = |k: &mut usize| {
            while *k < len && bytes[*k].is_ascii_whitespace() {
                *k += 1;
            }
        };

        loop {
            skip_whitespace(&mut k);
            if k >= len {
                break;
            }
            if bytes[k] == b'>' {
                k += 1;
                break;
            }
            if bytes[k] == b'/' {
                if k + 1 < len && bytes[k + 1] == b'>' {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            let attr_start = k;
            while k < len && is_name_char(bytes[k]) {
                k += 1;
            }
            if attr_start == k {
                k += 1;
                continue;
            }
            let attr_name = input[attr_start..k].to_string();

            skip_whitespace(&mut k);
            let mut value = None;
            if k < len && bytes[k] == b'=' {
                k += 1;
                skip_whitespace(&mut k);
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = if bytes[k] == b'"' {
                        Quote::Double
                    } else {
                        Quote::Single
                    };
                    let close = bytes[k];
                    k += 1;
                    let vstart = k;
                    k += memchr(close, &bytes[k..]).unwrap_or(len - k);
                    value = Some(AttrValue {
                        raw: input[vstart..k].to_string(),
                        quote,
                        start: vstart,
                        end: k,
                    });
                    if k < len {
                        k += 1;
                    }
                } else {
                    let vstart = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                            break;
                        }
                        k += 1;
                    }
                    value = Some(AttrValue {
                        raw: input[vstart..k].to_string(),
                        quote: Quote::None,
                        start: vstart,
                        end: k,
                    });
                }
            }
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }

        let rawtext = !self_closing && (name == "script" || name == "style");
        out.push(Token::StartTag {
            name: name.clone(),
            raw_name: raw_name.to_string(),
            attributes,
            self_closing,
            start: tag_start,
        });

        if rawtext {
            // Rawtext close tags are fixed-length ASCII sequences; scan linearly.
            let close_tag = if name == "script" {
                SCRIPT_CLOSE_TAG
            } else {
                STYLE_CLOSE_TAG
            };
            if let Some((rel_start, rel_end)) = find_rawtext_close_tag(&input[k..], close_tag) {
                let raw = &input[k..k + rel_start];
                if !raw.is_empty() {
                    out.push(Token::Text(raw.to_string()));
                }
                out.push(Token::EndTag(name));
                i = k + rel_end;
                continue;
            }
            // Missing close tag: the remainder is rawtext content.
            let raw = &input[k..];
            if !raw.is_empty() {
                out.push(Token::Text(raw.to_string()));
            }
            out.push(Token::EndTag(name));
            break;
        }

        i = k;
    }
    log::trace!(target: "htmltoolbox.tokenizer", "tokenized {} bytes into {} tokens", len, out.len());
    TokenStream::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_tag(stream: &TokenStream, index: usize) -> (&str, &str, &[Attribute], bool, usize) {
        match &stream.tokens()[index] {
            Token::StartTag {
                name,
                raw_name,
                attributes,
                self_closing,
                start,
            } => (name, raw_name, attributes, *self_closing, *start),
            other => panic!("expected start tag at {index}, got {other:?}"),
        }
    }

    #[test]
    fn tokenize_preserves_utf8_text_nodes() {
        let stream = tokenize("<p>120×32</p>");
        assert!(
            stream
                .iter()
                .any(|t| matches!(t, Token::Text(s) if s == "120×32")),
            "expected UTF-8 text token, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_keeps_entities_raw() {
        let stream = tokenize("a &amp; b<i title=\"x&quot;y\">c</i>");
        assert!(matches!(&stream.tokens()[0], Token::Text(s) if s == "a &amp; b"));
        let (_, _, attributes, _, _) = start_tag(&stream, 1);
        assert_eq!(attributes[0].value.as_ref().map(|v| v.raw.as_str()), Some("x&quot;y"));
    }

    #[test]
    fn tokenize_records_tag_and_value_offsets() {
        let input = "ab<DIV Class='box' hidden data-x=1>";
        let stream = tokenize(input);
        let (name, raw_name, attributes, self_closing, start) = start_tag(&stream, 1);
        assert_eq!(name, "div");
        assert_eq!(raw_name, "DIV");
        assert!(!self_closing);
        assert_eq!(start, 2);
        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].name, "Class");
        let class = attributes[0].value.as_ref().expect("class value");
        assert_eq!(class.quote, Quote::Single);
        assert_eq!(&input[class.start..class.end], "box");
        assert!(attributes[1].value.is_none());
        let data = attributes[2].value.as_ref().expect("data value");
        assert_eq!(data.quote, Quote::None);
        assert_eq!(&input[data.start..data.end], "1");
    }

    #[test]
    fn tokenize_handles_uppercase_doctype_as_declaration() {
        let stream = tokenize("<!DOCTYPE html>");
        assert!(
            matches!(stream.tokens(), [Token::Declaration(s)] if s == "DOCTYPE html"),
            "expected declaration, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_emits_wrap_site_marker() {
        let stream = tokenize("<b>x <!/></b>");
        assert!(
            stream
                .iter()
                .any(|t| matches!(t, Token::Declaration(s) if s == "/")),
            "expected wrap-site declaration, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_keeps_stray_angle_brackets_as_text() {
        let stream = tokenize("a < b <3 c");
        assert!(
            matches!(stream.tokens(), [Token::Text(s)] if s == "a < b <3 c"),
            "expected single text token, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_marks_explicit_self_closing_only() {
        let stream = tokenize("<br><img src=x/><p/>");
        assert!(!start_tag(&stream, 0).3);
        assert!(start_tag(&stream, 1).3, "unquoted value stops before `/>`");
        assert!(start_tag(&stream, 2).3);
        assert!(is_void_element("br"));
    }

    #[test]
    fn tokenize_finds_script_end_tag_case_insensitive() {
        let stream = tokenize("<script>let x = 1 < 2;</ScRiPt>");
        assert!(
            matches!(
                stream.tokens(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(body),
                    Token::EndTag(end)
                ] if name == "script" && body == "let x = 1 < 2;" && end == "script"
            ),
            "expected raw script text and matching end tag, got: {stream:?}"
        );
    }

    #[test]
    fn rawtext_close_tag_does_not_accept_near_matches() {
        let stream = tokenize("<style>ok</stylex >no</style >");
        assert!(
            matches!(
                stream.tokens(),
                [
                    Token::StartTag { name, .. },
                    Token::Text(body),
                    Token::EndTag(end),
                ] if name == "style" && body == "ok</stylex >no" && end == "style"
            ),
            "expected near-match not to close rawtext, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_handles_rawtext_without_close_tag() {
        let stream = tokenize("<script>x<y>");
        assert!(
            matches!(
                stream.tokens(),
                [Token::StartTag { .. }, Token::Text(text), Token::EndTag(_)] if text == "x<y>"
            ),
            "expected unterminated rawtext, got: {stream:?}"
        );
    }

    #[test]
    fn tokenize_handles_unterminated_comment() {
        let stream = tokenize("a<!-- never closed");
        assert!(matches!(&stream.tokens()[1], Token::Comment(c) if c == " never closed"));
    }

    #[test]
    fn tokenize_handles_tons_of_angle_brackets() {
        let input = "<".repeat(200_000);
        let stream = tokenize(&input);
        assert!(stream.tokens().len() <= 1);
    }

    #[test]
    fn tokenize_handles_many_simple_tags_linearly() {
        let input = "<a></a>".repeat(20_000);
        let stream = tokenize(&input);
        assert_eq!(stream.tokens().len(), 40_000);
    }
}
