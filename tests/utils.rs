use ruls::quote::{Quoter, QuotingStyle};
use ruls::utils::{BlockSize, format_in_units, major, minor, parse_block_size};
use ruls::version::version_cmp;
use std::cmp::Ordering;
use std::ffi::OsStr;

#[test]
fn test_parse_block_size() {
    assert_eq!(parse_block_size("1K"), Some(BlockSize::Bytes(1024)));
    assert_eq!(parse_block_size("4kB"), Some(BlockSize::Bytes(4000)));
    assert_eq!(parse_block_size("MiB"), Some(BlockSize::Bytes(1024 * 1024)));
    assert_eq!(parse_block_size("'1K"), Some(BlockSize::Bytes(1024)));
    assert_eq!(parse_block_size("512"), Some(BlockSize::Bytes(512)));
    assert_eq!(parse_block_size("human-readable"), Some(BlockSize::HumanBinary));
    assert_eq!(parse_block_size("si"), Some(BlockSize::HumanDecimal));
}

#[test]
fn test_parse_block_size_rejects_garbage() {
    assert_eq!(parse_block_size("0"), None);
    assert_eq!(parse_block_size("12X"), None);
    assert_eq!(parse_block_size("1Kb"), None);
    assert_eq!(parse_block_size("99999999999999999999"), None);
}

#[test]
fn test_format_in_units_rounds_up() {
    assert_eq!(format_in_units(0, BlockSize::Bytes(1024)), "0");
    assert_eq!(format_in_units(1, BlockSize::Bytes(1024)), "1");
    assert_eq!(format_in_units(1025, BlockSize::Bytes(1024)), "2");
    assert_eq!(format_in_units(4096, BlockSize::Bytes(1)), "4096");
}

#[test]
fn test_human_sizes_below_one_unit_are_plain() {
    assert_eq!(format_in_units(512, BlockSize::HumanBinary), "512");
    assert_eq!(format_in_units(999, BlockSize::HumanDecimal), "999");
}

#[test]
fn test_device_numbers() {
    // sda1 is 8,1
    let dev = (8u64 << 8) | 1;
    assert_eq!(major(dev), 8);
    assert_eq!(minor(dev), 1);
    // large minors spill into the high bits
    let dev = (259u64 << 8) | (0x12345u64 & 0xff) | ((0x12345u64 & !0xff) << 12);
    assert_eq!(major(dev), 259);
    assert_eq!(minor(dev), 0x12345);
}

#[test]
fn test_version_order() {
    assert_eq!(version_cmp(b"file2", b"file10"), Ordering::Less);
    assert_eq!(version_cmp(b"v1.10", b"v1.9"), Ordering::Greater);
    assert_eq!(version_cmp(b".", b".."), Ordering::Less);
    assert_eq!(version_cmp(b"..", b".hidden"), Ordering::Less);
    assert_eq!(version_cmp(b".hidden", b"a"), Ordering::Less);
    assert_eq!(version_cmp(b"same", b"same"), Ordering::Equal);
}

#[test]
fn test_quoting_styles() {
    let name = OsStr::new("a b");
    assert_eq!(Quoter::new(QuotingStyle::Literal, false).quote(name), "a b");
    assert_eq!(Quoter::new(QuotingStyle::ShellEscape, false).quote(name), "'a b'");
    assert_eq!(Quoter::new(QuotingStyle::Escape, false).quote(name), "a\\ b");
    assert_eq!(Quoter::new(QuotingStyle::C, false).quote(name), "\"a b\"");

    let plain = OsStr::new("plain");
    assert!(!Quoter::new(QuotingStyle::Shell, false).needs_quoting(plain));
    assert_eq!(Quoter::new(QuotingStyle::ShellAlways, false).quote(plain), "'plain'");
}

#[test]
fn test_control_characters() {
    let name = OsStr::new("a\nb");
    assert_eq!(Quoter::new(QuotingStyle::Literal, true).quote(name), "a?b");
    assert_eq!(Quoter::new(QuotingStyle::C, false).quote(name), "\"a\\nb\"");
    assert_eq!(Quoter::new(QuotingStyle::Literal, true).width(name), 3);
}
