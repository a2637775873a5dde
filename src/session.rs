//! One listing run.
//!
//! [`ListingSession`] owns every piece of run state: configuration, probe,
//! entry catalog, traversal queue, renderer, diagnostics and the output
//! stream. Operands are admitted first and printed as files; the directories
//! among them are queued and then listed one at a time, depth first.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cancel::CancelToken;
use crate::catalog::{Admission, EntryCatalog};
use crate::config::{Config, Format, SortKey};
use crate::data::{FileType, Timestamp};
use crate::error::{Diagnostics, ExitStatus, ListError, Severity};
use crate::output::{ListingView, Renderer};
use crate::probe::{FsProbe, Probe};
use crate::quote::quote_path;
use crate::sort::sort_entries;
use crate::traverse::{NameFilter, PendingDirectory, Traversal, TraversalState, is_dot_or_dotdot};

/// Explicit owner of all state of one run.
pub struct ListingSession<W: Write> {
    config: Config,
    probe: Box<dyn Probe>,
    catalog: EntryCatalog,
    filter: NameFilter,
    filter_warnings: Vec<String>,
    traversal: Traversal,
    renderer: Renderer,
    diag: Diagnostics,
    out: W,
    print_dir_name: bool,
    first_header: bool,
}

/// Writes the catalog's entries through the renderer.
fn render_catalog<W: Write>(
    renderer: &mut Renderer,
    out: &mut W,
    catalog: &EntryCatalog,
    align_quotes: bool,
) -> Result<(), ListError> {
    let view = ListingView {
        entries: catalog.entries(),
        widths: catalog.widths(),
        any_has_acl: catalog.any_has_acl(),
        align_quotes: align_quotes && catalog.some_quoted(),
    };
    renderer.render(out, &view)
}

impl<W: Write> ListingSession<W> {
    /// A session on the real filesystem, reporting to standard error.
    pub fn new(config: Config, out: W) -> Self {
        let (filter, filter_warnings) =
            NameFilter::new(config.ignore_mode, &config.ignore_patterns, &config.hide_patterns);
        ListingSession {
            probe: Box::new(FsProbe),
            catalog: EntryCatalog::new(&config),
            filter,
            filter_warnings,
            traversal: Traversal::new(config.recursive),
            renderer: Renderer::new(&config, Timestamp::from(SystemTime::now())),
            diag: Diagnostics::stderr("ruls"),
            out,
            print_dir_name: true,
            first_header: true,
            config,
        }
    }

    pub fn with_probe(mut self, probe: Box<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_diagnostics(mut self, diag: Diagnostics) -> Self {
        self.diag = diag;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.renderer = self.renderer.with_cancel(cancel);
        self
    }

    /// Fixes "now" for the recent/old time-format split.
    pub fn with_clock(mut self, now: Timestamp) -> Self {
        let cancel = self.renderer.cancel();
        self.renderer = Renderer::new(&self.config, now).with_cancel(cancel);
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Lists the operands (the current directory when there are none).
    ///
    /// Per-entry and per-directory problems are reported and listing goes
    /// on; the returned status reflects the worst of them. An error return
    /// means the run was cut short: interrupted, unable to write output, or
    /// an internal invariant broke.
    pub fn list_operands(&mut self, operands: &[PathBuf]) -> Result<ExitStatus, ListError> {
        for warning in std::mem::take(&mut self.filter_warnings) {
            self.diag.warn(warning);
        }
        let result = self.run(operands);
        if result.is_ok() {
            let closing = self.renderer.closing_sequence();
            if !closing.is_empty() {
                self.out.write_all(&closing)?;
            }
        }
        // nothing left to report a failed flush to after an error
        let flushed = self.out.flush();
        result?;
        flushed?;
        Ok(self.diag.status())
    }

    fn run(&mut self, operands: &[PathBuf]) -> Result<(), ListError> {
        self.catalog.clear();
        if operands.is_empty() {
            if self.config.immediate_dirs {
                self.admit_operand(OsStr::new("."), FileType::Directory);
            } else {
                self.traversal.enqueue(".", None, true);
            }
        } else {
            for operand in operands {
                self.admit_operand(operand.as_os_str(), FileType::Unknown);
            }
        }

        if !self.catalog.is_empty() {
            self.sort_catalog();
            if !self.config.immediate_dirs {
                self.extract_subdirectories(None, true);
            }
        }

        if !self.catalog.is_empty() {
            self.render()?;
            if self.traversal.pending() > 0 {
                self.out.write_all(b"\n")?;
            }
        } else if operands.len() <= 1 && self.traversal.pending() == 1 {
            self.print_dir_name = false;
        }

        while let Some(pending) = self.traversal.next_directory()? {
            self.list_directory(&pending)?;
            self.traversal.set_state(TraversalState::Idle);
            self.print_dir_name = true;
        }
        Ok(())
    }

    fn admit_operand(&mut self, name: &OsStr, type_hint: FileType) {
        self.catalog.admit(
            self.probe.as_ref(),
            &mut self.diag,
            Admission {
                name,
                type_hint,
                inode_hint: None,
                command_line_arg: true,
                dirname: None,
            },
        );
    }

    fn align_quotes(&self) -> bool {
        self.config.align_variable_outer_quotes()
    }

    fn sort_catalog(&mut self) {
        self.traversal.set_state(TraversalState::Sorting);
        if self.config.sort.key == SortKey::Width {
            let align = self.align_quotes() && self.catalog.some_quoted();
            let renderer = &self.renderer;
            for entry in self.catalog.entries_mut().iter_mut() {
                entry.display_width = renderer.name_width(entry, align);
            }
        }
        sort_entries(
            self.catalog.entries_mut(),
            self.config.sort,
            self.config.collation,
            &mut self.diag,
        );
    }

    /// Queues the directories in the (sorted) catalog, last first, so that
    /// they come off the queue in display order.
    ///
    /// With `dirname` set the entries were read from that directory: `.` and
    /// `..` are skipped and a pop marker is queued ahead of the children.
    /// Without it they are operands, and operand directories leave the
    /// catalog.
    fn extract_subdirectories(&mut self, dirname: Option<&Path>, command_line_arg: bool) {
        self.traversal.set_state(TraversalState::ExtractingSubdirs);
        if dirname.is_some() {
            self.traversal.push_pop_marker();
        }
        for entry in self.catalog.entries().iter().rev() {
            if !entry.file_type.is_directory() {
                continue;
            }
            if dirname.is_some() && is_dot_or_dotdot(&entry.name) {
                continue;
            }
            let name = Path::new(&entry.name);
            let path = match dirname {
                Some(dir) if !name.is_absolute() => dir.join(name),
                _ => name.to_path_buf(),
            };
            let display_name = entry.link_target.as_ref().map(|t| t.as_os_str().to_owned());
            self.traversal.enqueue(path, display_name, command_line_arg);
        }
        self.catalog
            .entries_mut()
            .retain(|e| e.file_type != FileType::ArgDirectory);
    }

    fn render(&mut self) -> Result<(), ListError> {
        self.traversal.set_state(TraversalState::Rendering);
        let align = self.align_quotes();
        render_catalog(&mut self.renderer, &mut self.out, &self.catalog, align)
    }

    /// Whether entries can be printed as soon as they are read.
    fn streams_entries(&self) -> bool {
        self.config.format == Format::OnePerLine
            && self.config.sort.key == SortKey::None
            && !self.config.print_block_size
            && !self.config.recursive
    }

    fn list_directory(&mut self, pending: &PendingDirectory) -> Result<(), ListError> {
        let Some(path) = pending.path.as_deref() else {
            return Ok(());
        };
        let command_line_arg = pending.command_line_arg;
        let severity = Severity::for_operand(command_line_arg);
        self.traversal.set_state(TraversalState::OpeningDirectory);
        log::debug!("listing {}", path.display());

        let hints = match self.probe.read_dir(path) {
            Ok(hints) => hints,
            Err(source) => {
                self.diag.report(
                    severity,
                    &ListError::OpenDir {
                        path: quote_path(path),
                        source,
                    },
                );
                return Ok(());
            }
        };

        if self.traversal.detects_cycles() {
            match self.probe.stat(path, true) {
                Ok(status) => {
                    if !self.traversal.enter((status.dev, status.ino)) {
                        self.diag.report(
                            Severity::Serious,
                            &ListError::Cycle {
                                path: quote_path(path),
                            },
                        );
                        return Ok(());
                    }
                }
                Err(source) => {
                    self.diag.report(
                        severity,
                        &ListError::DeviceInode {
                            path: quote_path(path),
                            source,
                        },
                    );
                    return Ok(());
                }
            }
        }

        self.catalog.clear();

        if self.config.recursive || self.print_dir_name {
            if !self.first_header {
                self.out.write_all(b"\n")?;
            }
            self.first_header = false;
            let shown = pending.display_name.as_deref().unwrap_or(path.as_os_str());
            writeln!(self.out, "{}:", self.config.quoting.quote(shown))?;
        }

        self.traversal.set_state(TraversalState::ReadingEntries);
        let streaming = self.streams_entries();
        let align = self.align_quotes();
        let mut total_blocks: u64 = 0;

        if self.filter.shows_dot_entries() {
            for dot in [".", ".."] {
                total_blocks += self.catalog.admit(
                    self.probe.as_ref(),
                    &mut self.diag,
                    Admission {
                        name: OsStr::new(dot),
                        type_hint: FileType::Directory,
                        inode_hint: None,
                        command_line_arg: false,
                        dirname: Some(path),
                    },
                );
            }
        }

        for hint in hints {
            match hint {
                Ok(hint) => {
                    if !self.filter.is_ignored(&hint.name) {
                        total_blocks += self.catalog.admit(
                            self.probe.as_ref(),
                            &mut self.diag,
                            Admission {
                                name: &hint.name,
                                type_hint: hint.file_type,
                                inode_hint: hint.inode,
                                command_line_arg: false,
                                dirname: Some(path),
                            },
                        );
                        if streaming {
                            let catalog = &self.catalog;
                            render_catalog(&mut self.renderer, &mut self.out, catalog, align)?;
                            self.catalog.clear();
                        }
                    }
                }
                Err(source) => {
                    let overflow = source.raw_os_error() == Some(libc::EOVERFLOW);
                    self.diag.report(
                        severity,
                        &ListError::ReadDir {
                            path: quote_path(path),
                            source,
                        },
                    );
                    if !overflow {
                        break;
                    }
                }
            }
            self.renderer.checkpoint(&mut self.out)?;
        }

        self.sort_catalog();
        if self.config.recursive {
            self.extract_subdirectories(Some(path), false);
        }

        if self.config.is_long() || self.config.print_block_size {
            writeln!(self.out, "total {}", self.renderer.total_text(total_blocks))?;
        }
        if !self.catalog.is_empty() {
            self.render()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreMode;
    use std::fs;
    use std::io;

    fn run(config: Config, operands: &[PathBuf]) -> (String, ExitStatus, Vec<String>) {
        let mut out = Vec::new();
        let mut session = ListingSession::new(config, &mut out)
            .with_diagnostics(Diagnostics::new("ruls", Box::new(io::sink())));
        let status = session.list_operands(operands).unwrap();
        let messages = session.diagnostics().messages().to_vec();
        drop(session);
        (String::from_utf8(out).unwrap(), status, messages)
    }

    #[test]
    fn test_single_directory_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        let (text, status, _) = run(Config::default(), &[dir.path().to_path_buf()]);
        assert_eq!(text, "a\nb\n");
        assert_eq!(status, ExitStatus::Success);
    }

    #[test]
    fn test_files_then_directories_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("inner"), "").unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();

        let (text, _, _) = run(Config::default(), &[sub.clone(), file.clone()]);
        let expected = format!("{}\n\n{}:\ninner\n", file.display(), sub.display());
        assert_eq!(text, expected);
    }

    #[test]
    fn test_missing_operand_is_serious() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let (text, status, messages) = run(Config::default(), &[missing]);
        assert_eq!(text, "");
        assert_eq!(status, ExitStatus::Serious);
        assert!(messages[0].starts_with("cannot access"));
    }

    #[test]
    fn test_all_lists_dot_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".rc"), "").unwrap();
        let config = Config {
            ignore_mode: IgnoreMode::Minimal,
            ..Config::default()
        };
        let (text, _, _) = run(config, &[dir.path().to_path_buf()]);
        assert_eq!(text, ".\n..\n.rc\n");
    }

    #[test]
    fn test_recursive_order_is_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/deep")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("a/deep/leaf"), "").unwrap();
        let config = Config {
            recursive: true,
            ..Config::default()
        };
        let (text, status, _) = run(config, &[root.to_path_buf()]);
        let r = root.display();
        let expected = format!("{r}:\na\nb\n\n{r}/a:\ndeep\n\n{r}/a/deep:\nleaf\n\n{r}/b:\n");
        assert_eq!(text, expected);
        assert_eq!(status, ExitStatus::Success);
    }

    #[test]
    fn test_long_format_prints_total() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            format: Format::Long,
            ..Config::default()
        };
        let (text, _, _) = run(config, &[dir.path().to_path_buf()]);
        assert_eq!(text, "total 0\n");
    }
}
