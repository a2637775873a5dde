use clap::Parser;
use ruls::{Args, Config, Diagnostics, Environment, ExitStatus, ListingSession};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::Path;
use tempfile::TempDir;

/// Resolves `argv` as the binary would, with `root` as the only operand,
/// and returns what the listing printed.
fn render(argv: &[&str], env: Environment, tty: bool, root: &Path) -> (String, Vec<String>) {
    let mut full = vec!["ruls".to_string()];
    full.extend(argv.iter().map(|a| a.to_string()));
    full.push(root.display().to_string());
    let args = Args::parse_from(full);
    let (config, warnings) = Config::resolve(&args, &env, tty);

    let mut out = Vec::new();
    let mut session = ListingSession::new(config, &mut out)
        .with_diagnostics(Diagnostics::new("ruls", Box::new(io::sink())));
    let status = session
        .list_operands(&args.files)
        .expect("listing should not abort");
    assert_eq!(status, ExitStatus::Success);
    drop(session);
    (String::from_utf8(out).expect("output is UTF-8"), warnings)
}

fn sample_tree() -> TempDir {
    // root/
    // ├── docs/
    // ├── run.sh   (executable)
    // ├── notes.txt
    // └── link -> docs
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir(root.join("docs")).expect("Failed to create docs");
    fs::write(root.join("run.sh"), "#!/bin/sh\n").expect("Failed to write run.sh");
    fs::set_permissions(root.join("run.sh"), fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod run.sh");
    fs::write(root.join("notes.txt"), "hello").expect("Failed to write notes.txt");
    symlink("docs", root.join("link")).expect("Failed to create link");
    temp_dir
}

fn env_with_colors(spec: &str) -> Environment {
    Environment {
        ls_colors: Some(OsString::from(spec)),
        ..Environment::default()
    }
}

#[test]
fn test_classify_indicators() {
    let tree = sample_tree();
    let (text, _) = render(&["-1", "-F"], Environment::default(), false, tree.path());
    assert_eq!(text, "docs/\nlink@\nnotes.txt\nrun.sh*\n");
}

#[test]
fn test_slash_indicator_only_marks_directories() {
    let tree = sample_tree();
    let (text, _) = render(&["-1", "-p"], Environment::default(), false, tree.path());
    assert_eq!(text, "docs/\nlink\nnotes.txt\nrun.sh\n");
}

#[test]
fn test_comma_format() {
    let tree = sample_tree();
    let (text, _) = render(&["-m"], Environment::default(), false, tree.path());
    assert_eq!(text, "docs, link, notes.txt, run.sh\n");
    let (narrow, _) = render(&["-m", "-w", "20"], Environment::default(), false, tree.path());
    assert_eq!(narrow, "docs, link,\nnotes.txt, run.sh\n");
}

#[test]
fn test_grid_and_horizontal_formats() {
    let tree = sample_tree();
    let grid_args = ["-C", "-w", "24", "-T", "0"];
    let (grid, _) = render(&grid_args, Environment::default(), false, tree.path());
    assert_eq!(grid, "docs  notes.txt\nlink  run.sh\n");
    let across_args = ["-x", "-w", "23", "-T", "0"];
    let (across, _) = render(&across_args, Environment::default(), false, tree.path());
    assert_eq!(across, "docs       link\nnotes.txt  run.sh\n");
}

#[test]
fn test_colors_wrap_names() {
    let tree = sample_tree();
    let env = env_with_colors("di=01;34:ex=01;32:*.txt=00;33");
    let (text, warnings) = render(&["-1", "--color=always"], env, false, tree.path());
    assert!(warnings.is_empty());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "\x1b[01;34mdocs\x1b[0m");
    assert_eq!(lines[2], "\x1b[00;33mnotes.txt\x1b[0m");
    assert_eq!(lines[3], "\x1b[01;32mrun.sh\x1b[0m");
}

#[test]
fn test_malformed_color_spec_disables_all_color() {
    let tree = sample_tree();
    // the escape \y is not recognized; the valid di= token must not survive either
    let env = env_with_colors("di=01;34:*.txt=\\y");
    let (text, warnings) = render(&["-1", "--color=always"], env, false, tree.path());
    assert_eq!(warnings, ["unparsable value for LS_COLORS environment variable"]);
    assert!(!text.contains('\x1b'));
    assert_eq!(text, "docs\nlink\nnotes.txt\nrun.sh\n");
}

#[test]
fn test_long_format_human_sizes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("big"), vec![0u8; 2048]).expect("Failed to write big");
    let (text, _) = render(
        &["-l", "-h", "-G", "--time-style=long-iso"],
        Environment::default(),
        false,
        temp_dir.path(),
    );
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let fields: Vec<&str> = lines[1].split_whitespace().collect();
    // mode, links, owner, size, date, time, name
    assert_eq!(fields.len(), 7);
    assert!(fields[3].starts_with('2') && fields[3].ends_with('K'), "got {}", fields[3]);
    assert_eq!(fields[6], "big");
}

#[test]
fn test_long_format_shows_link_target() {
    let tree = sample_tree();
    let (text, _) = render(&["-l", "-n"], Environment::default(), false, tree.path());
    let link_line = text
        .lines()
        .find(|l| l.starts_with('l'))
        .expect("link line");
    assert!(link_line.ends_with("link -> docs"));
    assert!(text.starts_with("total "));
}

#[test]
fn test_shell_escape_quoting_on_terminal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("with space"), "").expect("Failed to write file");
    fs::write(temp_dir.path().join("plain"), "").expect("Failed to write file");
    let env = Environment {
        columns: Some("80".to_string()),
        ..Environment::default()
    };
    let (text, _) = render(&["-1"], env, true, temp_dir.path());
    assert_eq!(text, "plain\n'with space'\n");
}

#[test]
fn test_hyperlinks_wrap_each_name() {
    let temp_dir = sample_tree();
    let root = fs::canonicalize(temp_dir.path()).expect("Failed to canonicalize root");
    let (text, _) = render(&["--hyperlink=always", "-1"], Environment::default(), false, &root);

    let line = text
        .lines()
        .find(|line| line.contains("notes.txt"))
        .expect("notes.txt is listed");
    assert!(line.starts_with("\x1b]8;;file://"), "got {line:?}");
    let target = format!("{}/notes.txt\x1b\\notes.txt\x1b]8;;\x1b\\", root.display());
    assert!(line.ends_with(&target), "got {line:?}");
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().all(|line| line.starts_with("\x1b]8;;file://")));
}
