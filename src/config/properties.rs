//! Parser for the line-oriented `key=value` configuration format.
//!
//! Supports `#`/`!` comments, `=`, `:` or whitespace separators, backslash
//! line continuation and the usual escapes (`\t`, `\n`, `\r`, `\f`,
//! `\uXXXX`). A file either parses completely or not at all.

use std::collections::BTreeMap;

use crate::error::ParseError;

/// Flat set of properties read from one file.
pub type PropertySet = BTreeMap<String, String>;

/// Parse file content into a property set. Duplicate keys: last one wins.
pub fn parse(content: &str) -> Result<PropertySet, ParseError> {
    let mut properties = PropertySet::new();

    for (line, logical) in logical_lines(content) {
        let (raw_key, raw_value) = split_key_value(&logical);
        let key = unescape(raw_key, line)?;
        let value = unescape(raw_value, line)?;
        properties.insert(key, value);
    }

    Ok(properties)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Odd number of trailing backslashes means the line continues.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Join continuation lines, dropping comments and blank lines.
/// Each logical line is paired with the 1-based number of its first physical line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut physical = normalized.split('\n').enumerate();
    let mut lines = Vec::new();

    while let Some((index, line)) = physical.next() {
        let trimmed = line.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = String::new();
        let mut current = trimmed;
        loop {
            if !continues(current) {
                logical.push_str(current);
                break;
            }
            logical.push_str(&current[..current.len() - 1]);
            match physical.next() {
                Some((_, next)) => current = next.trim_start_matches(is_blank),
                None => break,
            }
        }

        lines.push((index + 1, logical));
    }

    lines
}

/// Split a logical line into its still-escaped key and value parts.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    for (i, c) in line.char_indices() {
        if !preceding_backslash && (c == '=' || c == ':') {
            key_end = i;
            value_start = i + 1;
            has_separator = true;
            break;
        }
        if !preceding_backslash && is_blank(c) {
            key_end = i;
            value_start = i + c.len_utf8();
            break;
        }
        preceding_backslash = c == '\\' && !preceding_backslash;
    }

    let rest = &line[value_start..];
    let mut offset = rest.len();
    for (i, c) in rest.char_indices() {
        if is_blank(c) {
            continue;
        }
        if !has_separator && (c == '=' || c == ':') {
            has_separator = true;
            continue;
        }
        offset = i;
        break;
    }

    (&line[..key_end], &rest[offset..])
}

fn read_hex4(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u16, ParseError> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.chars().count() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::MalformedUnicodeEscape { line });
    }
    u16::from_str_radix(&hex, 16).map_err(|_| ParseError::MalformedUnicodeEscape { line })
}

fn unescape(text: &str, line: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let mut units = vec![read_hex4(&mut chars, line)?];
                // A high surrogate pairs with an immediately following \uXXXX.
                if (0xD800..0xDC00).contains(&units[0]) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        units.push(read_hex4(&mut lookahead, line)?);
                        chars = lookahead;
                    }
                }
                for decoded in char::decode_utf16(units) {
                    out.push(decoded.map_err(|_| ParseError::MalformedUnicodeEscape { line })?);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        let props = parse("a=1\nb: 2\nc 3\nd   =   4\ne\n").unwrap();
        assert_eq!(props["a"], "1");
        assert_eq!(props["b"], "2");
        assert_eq!(props["c"], "3");
        assert_eq!(props["d"], "4");
        assert_eq!(props["e"], "");
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let props = parse("# comment\n  ! also comment\n\n   \nkey=value\n").unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["key"], "value");
    }

    #[test]
    fn test_value_keeps_trailing_whitespace_and_tags() {
        let props = parse("key = [Integer] 123  \n").unwrap();
        assert_eq!(props["key"], "[Integer] 123  ");
    }

    #[test]
    fn test_line_continuation() {
        let props = parse("list = one, \\\n       two, \\\n       three\n").unwrap();
        assert_eq!(props["list"], "one, two, three");
    }

    #[test]
    fn test_escaped_backslash_does_not_continue() {
        let props = parse("path = c:\\\\temp\\\\\nnext = 1\n").unwrap();
        assert_eq!(props["path"], "c:\\temp\\");
        assert_eq!(props["next"], "1");
    }

    #[test]
    fn test_escaped_separator_in_key() {
        let props = parse("a\\=b = c\nx\\ y = z\n").unwrap();
        assert_eq!(props["a=b"], "c");
        assert_eq!(props["x y"], "z");
    }

    #[test]
    fn test_escapes() {
        let props = parse("k = tab\\there\\nnew \\u00e9\\q\n").unwrap();
        assert_eq!(props["k"], "tab\there\nnew \u{e9}q");
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let props = parse("emoji = \\ud83d\\ude00\n").unwrap();
        assert_eq!(props["emoji"], "\u{1F600}");
    }

    #[test]
    fn test_malformed_unicode_escape_is_error() {
        let err = parse("ok = 1\nbad = \\u12g4\n").unwrap_err();
        assert_eq!(err, ParseError::MalformedUnicodeEscape { line: 2 });
    }

    #[test]
    fn test_crlf_and_duplicate_keys() {
        let props = parse("k=1\r\nk=2\r\n").unwrap();
        assert_eq!(props["k"], "2");
    }
}
