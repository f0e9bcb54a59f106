//! Percent-escaping for URL path segments and query components.
//!
//! Escaped output never contains the separators that would change how a
//! composite URL parses: a path segment never contains `/`, `?`, `;` or `,`
//! and a query component never contains `&`, `=`, `?`, `#` or `+` other than
//! as the encoding of a space.

const UPPER_HEX: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    PathSegment,
    QueryComponent,
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

fn should_escape(b: u8, mode: Mode) -> bool {
    if is_unreserved(b) {
        return false;
    }
    match mode {
        // sub-delims that are harmless inside a single segment
        Mode::PathSegment => !matches!(b, b'$' | b'&' | b'+' | b':' | b'=' | b'@'),
        Mode::QueryComponent => true,
    }
}

fn escape(s: &str, mode: Mode) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if mode == Mode::QueryComponent && b == b' ' {
            out.push('+');
        } else if should_escape(b, mode) {
            out.push('%');
            out.push(char::from(UPPER_HEX[usize::from(b >> 4)]));
            out.push(char::from(UPPER_HEX[usize::from(b & 0x0F)]));
        } else {
            out.push(char::from(b));
        }
    }
    out
}

/// Escapes `s` so it can be placed inside a single path segment.
#[must_use]
pub fn path_escape(s: &str) -> String {
    escape(s, Mode::PathSegment)
}

/// Escapes `s` so it can be placed inside a query string.
#[must_use]
pub fn query_escape(s: &str) -> String {
    escape(s, Mode::QueryComponent)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn unescape(s: &str, mode: Mode) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = hex_value(*bytes.get(i + 1)?)?;
                let lo = hex_value(*bytes.get(i + 2)?)?;
                out.push((hi << 4) | lo);
                i += 3;
            },
            b'+' if mode == Mode::QueryComponent => {
                out.push(b' ');
                i += 1;
            },
            b => {
                out.push(b);
                i += 1;
            },
        }
    }
    String::from_utf8(out).ok()
}

/// Reverses [`path_escape`]. Returns `None` for malformed escapes.
#[must_use]
pub fn path_unescape(s: &str) -> Option<String> {
    unescape(s, Mode::PathSegment)
}

/// Reverses [`query_escape`]. Returns `None` for malformed escapes.
#[must_use]
pub fn query_unescape(s: &str) -> Option<String> {
    unescape(s, Mode::QueryComponent)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_path_escape_separators() {
        assert_eq!(path_escape("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(path_escape("x;y,z"), "x%3By%2Cz");
        assert_eq!(path_escape("a b"), "a%20b");
        assert_eq!(path_escape("k=v&w@h:p$+"), "k=v&w@h:p$+");
    }

    #[test]
    fn test_query_escape_separators() {
        assert_eq!(query_escape("a=b&c"), "a%3Db%26c");
        assert_eq!(query_escape("a b+c"), "a+b%2Bc");
        assert_eq!(query_escape("#?/"), "%23%3F%2F");
    }

    #[test]
    fn test_multibyte_is_escaped_per_byte() {
        assert_eq!(path_escape("é"), "%C3%A9");
        assert_eq!(path_unescape("%C3%A9").unwrap(), "é");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        for s in ["", "plain", "a/b?c", "sp ace+plus", "%%%", "ü/ß?&="] {
            assert_eq!(path_unescape(&path_escape(s)).unwrap(), s);
            assert_eq!(query_unescape(&query_escape(s)).unwrap(), s);
        }
    }

    #[test]
    fn test_unescape_rejects_truncated_escape() {
        assert!(path_unescape("%4").is_none());
        assert!(query_unescape("%zz").is_none());
    }
}
