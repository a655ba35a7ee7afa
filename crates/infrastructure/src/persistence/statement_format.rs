//! Render a SQL statement with its bound values inlined
//!
//! Diagnostic only: the output is attached to query spans and never
//! executed. Placeholders are recognised outside quoted literals, quoted
//! identifiers and comments:
//!
//! - `?NNN` and `$NNN` take the N-th value (1-based)
//! - a bare `?` takes one past the largest index used so far
//!
//! A placeholder whose value is missing stays as written; surplus values
//! are ignored.

use std::fmt::Write as _;

/// A bound statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// A value of a type the formatter cannot render, by type name
    Unsupported(String),
}

impl SqlValue {
    fn render(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("NULL"),
            Self::Bool(true) => out.push_str("TRUE"),
            Self::Bool(false) => out.push_str("FALSE"),
            Self::Integer(i) => {
                let _ = write!(out, "{i}");
            },
            Self::Real(r) => {
                let _ = write!(out, "{r:.6}");
            },
            Self::Text(s) => push_quoted(out, s),
            Self::Blob(bytes) => push_quoted(out, &String::from_utf8_lossy(bytes)),
            Self::Unsupported(type_name) => {
                let _ = write!(out, "'<unsupported:{type_name}>'");
            },
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
}

/// Replace placeholders in `sql` with literal renderings of `values`
pub fn format_statement(sql: &str, values: &[SqlValue]) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + values.len() * 8);
    let mut max_index = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                let end = find_byte(bytes, i + 1, quote).map_or(bytes.len(), |e| e + 1);
                out.push_str(&sql[i..end]);
                i = end;
            },
            b'[' => {
                let end = find_byte(bytes, i + 1, b']').map_or(bytes.len(), |e| e + 1);
                out.push_str(&sql[i..end]);
                i = end;
            },
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = find_byte(bytes, i + 2, b'\n').map_or(bytes.len(), |e| e + 1);
                out.push_str(&sql[i..end]);
                i = end;
            },
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..].find("*/").map_or(bytes.len(), |e| i + 2 + e + 2);
                out.push_str(&sql[i..end]);
                i = end;
            },
            sigil @ (b'?' | b'$') => {
                let digits_end = scan_digits(bytes, i + 1);
                let explicit = sql[i + 1..digits_end].parse::<usize>().ok();

                let index = match (sigil, explicit) {
                    (_, Some(n)) => Some(n),
                    (b'?', None) => Some(max_index + 1),
                    _ => None,
                };

                let bound = index.and_then(|n| {
                    n.checked_sub(1)
                        .and_then(|k| values.get(k))
                        .map(|v| (n, v))
                });
                match bound {
                    Some((n, value)) => {
                        value.render(&mut out);
                        max_index = max_index.max(n);
                    },
                    None => {
                        if let Some(n) = index {
                            max_index = max_index.max(n);
                        }
                        out.push_str(&sql[i..digits_end.max(i + 1)]);
                    },
                }
                i = digits_end.max(i + 1);
            },
            _ => {
                let end = next_special(bytes, i + 1);
                out.push_str(&sql[i..end]);
                i = end;
            },
        }
    }

    out
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == needle)
        .map(|p| from + p)
}

fn scan_digits(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}

/// Index of the next byte that may start a literal, comment or placeholder
fn next_special(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| matches!(b, b'\'' | b'"' | b'`' | b'[' | b'-' | b'/' | b'?' | b'$'))
        .map_or(bytes.len(), |p| from + p)
}
