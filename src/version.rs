//! Natural ("version") ordering of file names.
//!
//! Digit runs compare numerically, letters sort before other punctuation,
//! `~` sorts before everything including the end of the name, and trailing
//! suffixes such as `.tar.gz` are only consulted when the stems tie. The
//! ordering works on raw bytes and never depends on the active locale.

use std::cmp::Ordering;

/// Weight of a non-digit byte.
fn order(c: u8) -> i32 {
    if c.is_ascii_digit() {
        0
    } else if c.is_ascii_alphabetic() {
        c as i32
    } else if c == b'~' {
        -1
    } else {
        c as i32 + 256
    }
}

/// Length of `s` without its file suffix, where a suffix is a run of
/// `.` + letter-or-tilde + alphanumerics-or-tildes groups at the end.
fn prefix_len(s: &[u8]) -> usize {
    let n = s.len();
    let mut prefix = 0;
    let mut i = 0;
    while i < n {
        i += 1;
        prefix = i;
        while i + 1 < n && s[i] == b'.' && (s[i + 1].is_ascii_alphabetic() || s[i + 1] == b'~') {
            i += 2;
            while i < n && (s[i].is_ascii_alphanumeric() || s[i] == b'~') {
                i += 1;
            }
        }
    }
    prefix
}

fn verrevcmp(s1: &[u8], s2: &[u8]) -> Ordering {
    let (mut p1, mut p2) = (0, 0);
    while p1 < s1.len() || p2 < s2.len() {
        while (p1 < s1.len() && !s1[p1].is_ascii_digit())
            || (p2 < s2.len() && !s2[p2].is_ascii_digit())
        {
            let c1 = s1.get(p1).map_or(0, |&c| order(c));
            let c2 = s2.get(p2).map_or(0, |&c| order(c));
            if c1 != c2 {
                return c1.cmp(&c2);
            }
            p1 += 1;
            p2 += 1;
        }
        while p1 < s1.len() && s1[p1] == b'0' {
            p1 += 1;
        }
        while p2 < s2.len() && s2[p2] == b'0' {
            p2 += 1;
        }
        let mut first_diff = Ordering::Equal;
        while p1 < s1.len() && p2 < s2.len() && s1[p1].is_ascii_digit() && s2[p2].is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = s1[p1].cmp(&s2[p2]);
            }
            p1 += 1;
            p2 += 1;
        }
        if p1 < s1.len() && s1[p1].is_ascii_digit() {
            return Ordering::Greater;
        }
        if p2 < s2.len() && s2[p2].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }
    Ordering::Equal
}

/// Compares two names in version order.
///
/// Empty names come first, then `.`, then `..`, then other dot-files, then
/// everything else.
pub fn version_cmp(a: &[u8], b: &[u8]) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    if a.is_empty() || b.is_empty() {
        return a.len().cmp(&b.len());
    }

    match (a[0] == b'.', b[0] == b'.') {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) => {
            for special in [&b"."[..], &b".."[..]] {
                match (a == special, b == special) {
                    (true, _) => return Ordering::Less,
                    (_, true) => return Ordering::Greater,
                    _ => {}
                }
            }
        }
        (false, false) => {}
    }

    let (pa, pb) = (prefix_len(a), prefix_len(b));
    let one_pass_only = pa == a.len() && pb == b.len();
    let result = verrevcmp(&a[..pa], &b[..pb]);
    if result != Ordering::Equal || one_pass_only {
        result
    } else {
        verrevcmp(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<&str> = names.to_vec();
        v.sort_by(|a, b| version_cmp(a.as_bytes(), b.as_bytes()));
        v.into_iter().map(String::from).collect()
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(
            sorted(&["file10", "file2", "file1"]),
            vec!["file1", "file2", "file10"]
        );
    }

    #[test]
    fn test_suffixes_compared_last() {
        assert_eq!(
            sorted(&["foo-1.10.tar.gz", "foo-1.9.tar.gz", "foo-1.9.zip"]),
            vec!["foo-1.9.tar.gz", "foo-1.9.zip", "foo-1.10.tar.gz"]
        );
    }

    #[test]
    fn test_dot_names_first() {
        assert_eq!(
            sorted(&["a", ".hidden", "..", "."]),
            vec![".", "..", ".hidden", "a"]
        );
    }

    #[test]
    fn test_tilde_before_end() {
        assert_eq!(version_cmp(b"1.0~rc1", b"1.0"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_ignored_in_value() {
        assert_eq!(version_cmp(b"a007", b"a7"), Ordering::Equal);
        assert_eq!(version_cmp(b"a08", b"a7"), Ordering::Greater);
    }
}
