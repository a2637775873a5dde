//! Utility functions for the `ruls` directory lister.
//!
//! This module provides:
//! - Owner and group name resolution via `getpwuid_r` / `getgrgid_r`, with a
//!   `getent` fallback and a per-session cache
//! - Terminal width detection via `TIOCGWINSZ`
//! - Block size parsing and size rendering
//! - Device number splitting and the local host name for hyperlinks

use fnv::FnvHashMap;
use humansize::{BINARY, DECIMAL, FormatSizeOptions, format_size};
use libc::{c_char, getgrgid_r, getpwuid_r, group, passwd};
use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::process::Command;

/// Largest buffer handed to the reentrant lookup functions.
const MAX_LOOKUP_BUFFER: usize = 1 << 20;

/// Fallback function to resolve an id with the `getent` command.
/// Used when the reentrant libc lookup fails but NSS still answers.
fn resolve_with_getent(database: &str, id: u32) -> Option<String> {
    let output = Command::new("getent")
        .arg(database)
        .arg(id.to_string())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let output_str = String::from_utf8(output.stdout).ok()?;
    // passwd and group lines both start with `name:`
    let name = output_str.trim().split(':').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn lookup_user(uid: u32) -> Option<String> {
    let mut buf = vec![0u8; 4096];
    loop {
        let mut pwd = MaybeUninit::<passwd>::uninit();
        let mut result: *mut passwd = std::ptr::null_mut();
        let ret = unsafe {
            getpwuid_r(
                uid,
                pwd.as_mut_ptr(),
                buf.as_mut_ptr() as *mut c_char,
                buf.len(),
                &mut result,
            )
        };
        if ret == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if ret != 0 || result.is_null() {
            return None;
        }
        // result points into pwd/buf, both alive here
        let name = unsafe { (*result).pw_name };
        if name.is_null() {
            return None;
        }
        return unsafe { CStr::from_ptr(name) }.to_str().ok().map(String::from);
    }
}

fn lookup_group(gid: u32) -> Option<String> {
    let mut buf = vec![0u8; 4096];
    loop {
        let mut grp = MaybeUninit::<group>::uninit();
        let mut result: *mut group = std::ptr::null_mut();
        let ret = unsafe {
            getgrgid_r(
                gid,
                grp.as_mut_ptr(),
                buf.as_mut_ptr() as *mut c_char,
                buf.len(),
                &mut result,
            )
        };
        if ret == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if ret != 0 || result.is_null() {
            return None;
        }
        let name = unsafe { (*result).gr_name };
        if name.is_null() {
            return None;
        }
        return unsafe { CStr::from_ptr(name) }.to_str().ok().map(String::from);
    }
}

/// Caches uid and gid to name lookups for one listing session.
///
/// Unresolvable ids are cached as `None` so each id is looked up at most once.
#[derive(Debug, Default)]
pub struct NameCache {
    users: FnvHashMap<u32, Option<String>>,
    groups: FnvHashMap<u32, Option<String>>,
    getent_noted: bool,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user name for `uid`, or `None` when it has no name.
    ///
    /// # Arguments
    /// * `uid` - Numeric user id from the probe
    ///
    /// # Returns
    /// * `Option<&str>` - The resolved name; callers print the number otherwise
    pub fn user_name(&mut self, uid: u32) -> Option<&str> {
        if !self.users.contains_key(&uid) {
            let resolved = lookup_user(uid).or_else(|| {
                let name = resolve_with_getent("passwd", uid);
                self.note_getent(name.is_some());
                name
            });
            if resolved.is_none() {
                log::debug!("no user name for uid {uid}");
            }
            self.users.insert(uid, resolved);
        }
        self.users.get(&uid).and_then(|n| n.as_deref())
    }

    /// Returns the group name for `gid`, or `None` when it has no name.
    pub fn group_name(&mut self, gid: u32) -> Option<&str> {
        if !self.groups.contains_key(&gid) {
            let resolved = lookup_group(gid).or_else(|| {
                let name = resolve_with_getent("group", gid);
                self.note_getent(name.is_some());
                name
            });
            self.groups.insert(gid, resolved);
        }
        self.groups.get(&gid).and_then(|n| n.as_deref())
    }

    fn note_getent(&mut self, worked: bool) {
        if worked && !self.getent_noted {
            self.getent_noted = true;
            log::info!("libc id lookup failed but getent works; using getent as fallback");
        }
    }
}

/// Width in columns of the terminal on standard output, when there is one.
pub fn terminal_width(stdout_is_tty: bool) -> Option<usize> {
    if !stdout_is_tty {
        return None;
    }
    let mut ws = MaybeUninit::<libc::winsize>::zeroed();
    let ret = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, ws.as_mut_ptr()) };
    if ret != 0 {
        return None;
    }
    let ws = unsafe { ws.assume_init() };
    (ws.ws_col > 0).then_some(ws.ws_col as usize)
}

/// Unit in which sizes and block counts are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSize {
    /// Fixed unit in bytes; counts are rounded up.
    Bytes(u64),
    /// Powers of 1024 with a single-letter suffix.
    HumanBinary,
    /// Powers of 1000 with a single-letter suffix.
    HumanDecimal,
}

/// Parses a `--block-size` / `BLOCK_SIZE` value such as `1K`, `MiB`, `4kB`,
/// `human-readable` or `si`. A leading `'` is accepted and ignored.
pub fn parse_block_size(spec: &str) -> Option<BlockSize> {
    match spec {
        "human-readable" => return Some(BlockSize::HumanBinary),
        "si" => return Some(BlockSize::HumanDecimal),
        _ => {}
    }
    let spec = spec.strip_prefix('\'').unwrap_or(spec);
    let digits_end = spec.find(|c: char| !c.is_ascii_digit()).unwrap_or(spec.len());
    let (number, suffix) = spec.split_at(digits_end);
    let count: u64 = if number.is_empty() { 1 } else { number.parse().ok()? };

    let mut chars = suffix.chars();
    let multiplier = match chars.next() {
        None => 1,
        Some(letter) => {
            let exponent = "KMGTPEZY".find(letter.to_ascii_uppercase())? as u32 + 1;
            let base: u64 = match chars.as_str() {
                "" | "iB" => 1024,
                "B" => 1000,
                _ => return None,
            };
            base.checked_pow(exponent)?
        }
    };
    match count.checked_mul(multiplier)? {
        0 => None,
        n => Some(BlockSize::Bytes(n)),
    }
}

/// Compact human-readable size: `512`, `4.0K`, `1.2M`, or `1.5k` in SI units.
fn human_size(bytes: u64, si: bool) -> String {
    let options = FormatSizeOptions::from(if si { DECIMAL } else { BINARY })
        .decimal_places(1)
        .space_after_value(false);
    let text = format_size(bytes, options);
    let text = text
        .strip_suffix("iB")
        .or_else(|| text.strip_suffix('B'))
        .unwrap_or(&text);
    if si { text.to_string() } else { text.to_uppercase() }
}

/// Renders a byte count in the given unit.
///
/// # Arguments
/// * `bytes` - Quantity to render
/// * `unit` - Fixed unit (rounded up) or one of the human-readable forms
pub fn format_in_units(bytes: u64, unit: BlockSize) -> String {
    match unit {
        BlockSize::Bytes(n) => bytes.div_ceil(n.max(1)).to_string(),
        BlockSize::HumanBinary => human_size(bytes, false),
        BlockSize::HumanDecimal => human_size(bytes, true),
    }
}

/// Splits a Linux `dev_t` into its major number.
pub fn major(dev: u64) -> u64 {
    ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)
}

/// Splits a Linux `dev_t` into its minor number.
pub fn minor(dev: u64) -> u64 {
    ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)
}

/// Local host name used in `file://` hyperlinks; empty when unknown.
pub fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            log::debug!("host name unavailable: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_size() {
        assert_eq!(parse_block_size("1K"), Some(BlockSize::Bytes(1024)));
        assert_eq!(parse_block_size("KiB"), Some(BlockSize::Bytes(1024)));
        assert_eq!(parse_block_size("kB"), Some(BlockSize::Bytes(1000)));
        assert_eq!(parse_block_size("2M"), Some(BlockSize::Bytes(2 << 20)));
        assert_eq!(parse_block_size("512"), Some(BlockSize::Bytes(512)));
        assert_eq!(parse_block_size("si"), Some(BlockSize::HumanDecimal));
        assert_eq!(parse_block_size("0"), None);
        assert_eq!(parse_block_size("12Q"), None);
        assert_eq!(parse_block_size("1Kx"), None);
    }

    #[test]
    fn test_format_in_units_rounds_up() {
        assert_eq!(format_in_units(1, BlockSize::Bytes(1024)), "1");
        assert_eq!(format_in_units(2048, BlockSize::Bytes(1024)), "2");
        assert_eq!(format_in_units(2049, BlockSize::Bytes(1024)), "3");
        assert_eq!(format_in_units(0, BlockSize::Bytes(1024)), "0");
    }

    #[test]
    fn test_human_sizes_have_no_unit_suffix() {
        let small = format_in_units(512, BlockSize::HumanBinary);
        assert_eq!(small, "512");
        let kib = format_in_units(1536, BlockSize::HumanBinary);
        assert!(kib.ends_with('K'), "got {kib}");
        let si = format_in_units(1500, BlockSize::HumanDecimal);
        assert!(si.ends_with('k'), "got {si}");
    }

    #[test]
    fn test_device_numbers() {
        // makedev(8, 1)
        let dev = (8u64 << 8) | 1;
        assert_eq!(major(dev), 8);
        assert_eq!(minor(dev), 1);
        // makedev(259, 300)
        let dev = ((259u64 & 0xfff) << 8) | (300 & 0xff) | ((300u64 & !0xff) << 12);
        assert_eq!(major(dev), 259);
        assert_eq!(minor(dev), 300);
    }

    #[test]
    fn test_root_uid_resolves_once() {
        let mut cache = NameCache::new();
        let first = cache.user_name(0).map(String::from);
        let second = cache.user_name(0).map(String::from);
        assert_eq!(first, second);
        assert_eq!(cache.users.len(), 1);
    }
}
