//! Quoting of file names for display.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::os::unix::ffi::OsStrExt;
use std::str::FromStr;
use unicode_width::UnicodeWidthStr;

/// How names are quoted on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotingStyle {
    Literal,
    Shell,
    ShellAlways,
    ShellEscape,
    ShellEscapeAlways,
    C,
    Escape,
}

impl FromStr for QuotingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(QuotingStyle::Literal),
            "shell" => Ok(QuotingStyle::Shell),
            "shell-always" => Ok(QuotingStyle::ShellAlways),
            "shell-escape" => Ok(QuotingStyle::ShellEscape),
            "shell-escape-always" => Ok(QuotingStyle::ShellEscapeAlways),
            "c" => Ok(QuotingStyle::C),
            "escape" => Ok(QuotingStyle::Escape),
            other => Err(format!("invalid quoting style: {other}")),
        }
    }
}

impl QuotingStyle {
    /// Styles whose outer quotes come and go per name.
    pub fn has_variable_outer_quotes(self) -> bool {
        matches!(self, QuotingStyle::Shell | QuotingStyle::ShellEscape)
    }
}

/// Bytes that force quoting anywhere in a name under the shell styles.
const SHELL_SPECIAL: &[u8] = b" \t\n!\"$&'()*;<=>?[\\]^`{|}";

/// Decoded unit of a name: a printable char or a raw byte that is not.
enum Unit {
    Printable(char),
    Raw(u8),
}

fn units(name: &[u8]) -> Vec<Unit> {
    let mut out = Vec::with_capacity(name.len());
    for chunk in name.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c.is_control() {
                let mut buf = [0u8; 4];
                for &b in c.encode_utf8(&mut buf).as_bytes() {
                    out.push(Unit::Raw(b));
                }
            } else {
                out.push(Unit::Printable(c));
            }
        }
        out.extend(chunk.invalid().iter().map(|&b| Unit::Raw(b)));
    }
    out
}

fn c_escape(b: u8, out: &mut String) {
    match b {
        0x07 => out.push_str("\\a"),
        0x08 => out.push_str("\\b"),
        0x0c => out.push_str("\\f"),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b'\t' => out.push_str("\\t"),
        0x0b => out.push_str("\\v"),
        _ => {
            let _ = write!(out, "\\{b:03o}");
        }
    }
}

/// Quotes names according to a style.
#[derive(Debug, Clone, Copy)]
pub struct Quoter {
    pub style: QuotingStyle,
    /// Replace non-printable bytes with `?` in the non-escaping styles.
    pub hide_control: bool,
}

impl Quoter {
    pub fn new(style: QuotingStyle, hide_control: bool) -> Self {
        Self {
            style,
            hide_control,
        }
    }

    /// Whether the name gets outer quotes (or escapes) under this style.
    pub fn needs_quoting(&self, name: &OsStr) -> bool {
        let bytes = name.as_bytes();
        match self.style {
            QuotingStyle::Literal => false,
            QuotingStyle::C | QuotingStyle::ShellAlways | QuotingStyle::ShellEscapeAlways => true,
            QuotingStyle::Escape => units(bytes).iter().any(|u| match u {
                Unit::Raw(_) => true,
                Unit::Printable(c) => *c == '\\' || *c == ' ',
            }),
            QuotingStyle::Shell | QuotingStyle::ShellEscape => {
                bytes.is_empty()
                    || matches!(bytes[0], b'#' | b'~')
                    || units(bytes).iter().any(|u| match u {
                        Unit::Raw(_) => true,
                        Unit::Printable(c) => c.is_ascii() && SHELL_SPECIAL.contains(&(*c as u8)),
                    })
            }
        }
    }

    /// Returns the display form of a name.
    pub fn quote(&self, name: &OsStr) -> String {
        let bytes = name.as_bytes();
        match self.style {
            QuotingStyle::Literal => self.literal(bytes),
            QuotingStyle::C => {
                let mut out = String::from("\"");
                for u in units(bytes) {
                    match u {
                        Unit::Printable('"') => out.push_str("\\\""),
                        Unit::Printable('\\') => out.push_str("\\\\"),
                        Unit::Printable(c) => out.push(c),
                        Unit::Raw(b) => c_escape(b, &mut out),
                    }
                }
                out.push('"');
                out
            }
            QuotingStyle::Escape => {
                let mut out = String::new();
                for u in units(bytes) {
                    match u {
                        Unit::Printable('\\') => out.push_str("\\\\"),
                        Unit::Printable(' ') => out.push_str("\\ "),
                        Unit::Printable(c) => out.push(c),
                        Unit::Raw(b) => c_escape(b, &mut out),
                    }
                }
                out
            }
            QuotingStyle::Shell | QuotingStyle::ShellAlways => {
                if self.style == QuotingStyle::Shell && !self.needs_quoting(name) {
                    return self.literal(bytes);
                }
                shell_quote(&self.literal(bytes))
            }
            QuotingStyle::ShellEscape | QuotingStyle::ShellEscapeAlways => {
                if self.style == QuotingStyle::ShellEscape && !self.needs_quoting(name) {
                    return String::from_utf8_lossy(bytes).into_owned();
                }
                let units = units(bytes);
                if units.iter().all(|u| matches!(u, Unit::Printable(_))) {
                    return shell_quote(&String::from_utf8_lossy(bytes));
                }
                shell_escape(&units)
            }
        }
    }

    fn literal(&self, bytes: &[u8]) -> String {
        if !self.hide_control {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        units(bytes)
            .into_iter()
            .map(|u| match u {
                Unit::Printable(c) => c,
                Unit::Raw(_) => '?',
            })
            .collect()
    }

    /// Terminal columns taken by the quoted name.
    pub fn width(&self, name: &OsStr) -> usize {
        UnicodeWidthStr::width(self.quote(name).as_str())
    }
}

/// Quotes a path for a diagnostic message.
pub fn quote_path(path: &std::path::Path) -> String {
    Quoter::new(QuotingStyle::ShellEscapeAlways, false).quote(path.as_os_str())
}

/// Wraps printable text in shell quotes, preferring double quotes when the
/// only special character is a single quote.
fn shell_quote(text: &str) -> String {
    let only_apostrophe = text.contains('\'') && !text.contains(['"', '$', '`', '\\', '!']);
    if only_apostrophe {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\'', "'\\''"))
    }
}

/// Shell quoting with `$'...'` segments for non-printable bytes.
fn shell_escape(units: &[Unit]) -> String {
    let mut out = String::new();
    let mut in_quote = false;
    for u in units {
        match u {
            Unit::Printable(c) => {
                if !in_quote {
                    out.push('\'');
                    in_quote = true;
                }
                if *c == '\'' {
                    out.push_str("'\\''");
                } else {
                    out.push(*c);
                }
            }
            Unit::Raw(b) => {
                if in_quote {
                    out.push('\'');
                    in_quote = false;
                }
                out.push_str("$'");
                c_escape(*b, &mut out);
                out.push('\'');
            }
        }
    }
    if in_quote {
        out.push('\'');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    fn q(style: QuotingStyle, name: &[u8]) -> String {
        Quoter::new(style, false).quote(OsStr::from_bytes(name))
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(q(QuotingStyle::ShellEscape, b"plain.txt"), "plain.txt");
        assert_eq!(q(QuotingStyle::ShellEscape, b"with space"), "'with space'");
        assert_eq!(q(QuotingStyle::ShellEscape, b"don't"), "\"don't\"");
        assert_eq!(q(QuotingStyle::ShellEscape, b"a\nb"), "'a'$'\\n''b'");
        assert_eq!(q(QuotingStyle::ShellEscapeAlways, b"x"), "'x'");
    }

    #[test]
    fn test_c_and_escape_styles() {
        assert_eq!(q(QuotingStyle::C, b"a\"b"), "\"a\\\"b\"");
        assert_eq!(q(QuotingStyle::C, b"tab\there"), "\"tab\\there\"");
        assert_eq!(q(QuotingStyle::Escape, b"a b"), "a\\ b");
        assert_eq!(q(QuotingStyle::Escape, b"\xff"), "\\377");
    }

    #[test]
    fn test_literal_hides_control_on_terminal() {
        let quoter = Quoter::new(QuotingStyle::Literal, true);
        assert_eq!(quoter.quote(OsStr::from_bytes(b"a\x01b")), "a?b");
        assert!(!quoter.needs_quoting(OsStr::from_bytes(b"a b")));
    }

    #[test]
    fn test_leading_hash_needs_quoting() {
        let quoter = Quoter::new(QuotingStyle::Shell, false);
        assert!(quoter.needs_quoting(OsStr::new("#notes")));
        assert!(!quoter.needs_quoting(OsStr::new("notes#")));
    }

    #[test]
    fn test_width_counts_quotes() {
        let quoter = Quoter::new(QuotingStyle::ShellEscape, false);
        assert_eq!(quoter.width(OsStr::new("a b")), 5);
        assert_eq!(quoter.width(OsStr::new("日本")), 4);
    }
}
