//! The table of entries for the directory currently being listed.
//!
//! [`EntryCatalog::admit`] turns a name into a [`FileEntry`], probing only as
//! much as [`ProbeGate`] says the output needs, and keeps the running column
//! widths the long format aligns on.

use fnv::FnvHashSet;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use unicode_width::UnicodeWidthStr;

use crate::color::Indicator;
use crate::config::{Config, Dereference, IndicatorStyle};
use crate::data::{AclState, FileEntry, FileType, SecurityContext, Tristate};
use crate::error::{Diagnostics, ListError, Severity};
use crate::probe::{Probe, ProbeGate, is_unsupported};
use crate::quote::{Quoter, quote_path};
use crate::utils::{BlockSize, NameCache, format_in_units, major, minor};

/// Running maxima of long-format column widths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnWidths {
    pub inode: usize,
    pub block_size: usize,
    pub nlink: usize,
    pub owner: usize,
    pub group: usize,
    pub author: usize,
    pub scontext: usize,
    pub major: usize,
    pub minor: usize,
    pub file_size: usize,
}

/// One name to be admitted.
#[derive(Debug, Clone, Copy)]
pub struct Admission<'a> {
    pub name: &'a OsStr,
    /// Type from the directory read, `Unknown` if none.
    pub type_hint: FileType,
    pub inode_hint: Option<u64>,
    pub command_line_arg: bool,
    /// Directory the name was read from; `None` for operands.
    pub dirname: Option<&'a Path>,
}

/// The parts of the configuration the catalog acts on.
#[derive(Debug, Clone)]
struct Policy {
    gate: ProbeGate,
    dereference: Dereference,
    immediate_dirs: bool,
    long: bool,
    check_symlink_mode: bool,
    follow_links_for_type: bool,
    print_inode: bool,
    print_block_size: bool,
    print_owner: bool,
    print_group: bool,
    print_author: bool,
    print_scontext: bool,
    numeric_ids: bool,
    color_capability: bool,
    align_quotes: bool,
    quoter: Quoter,
    block_size: BlockSize,
    file_block_size: BlockSize,
}

impl Policy {
    fn new(config: &Config) -> Self {
        Policy {
            gate: ProbeGate::from_config(config),
            dereference: config.dereference,
            immediate_dirs: config.immediate_dirs,
            long: config.is_long(),
            check_symlink_mode: config.check_symlink_mode(),
            follow_links_for_type: config.indicator_style >= IndicatorStyle::FileType,
            print_inode: config.print_inode,
            print_block_size: config.print_block_size,
            print_owner: config.print_owner,
            print_group: config.print_group,
            print_author: config.print_author,
            print_scontext: config.print_scontext,
            numeric_ids: config.numeric_ids,
            color_capability: config.color.as_ref().is_some_and(|c| c.is_colored(Indicator::Cap)),
            align_quotes: config.align_variable_outer_quotes(),
            quoter: config.quoting,
            block_size: config.block_size,
            file_block_size: config.file_block_size,
        }
    }
}

/// Growable table of entries plus the per-listing width bookkeeping.
pub struct EntryCatalog {
    entries: Vec<FileEntry>,
    widths: ColumnWidths,
    any_has_acl: bool,
    some_quoted: bool,
    /// Devices whose filesystem cannot answer security probes.
    unsupported_devices: FnvHashSet<u64>,
    names: NameCache,
    policy: Policy,
}

/// Joins a directory and a name; a `.` directory adds nothing.
fn full_path(name: &OsStr, dirname: Option<&Path>) -> PathBuf {
    let name_path = Path::new(name);
    match dirname {
        Some(dir)
            if !name_path.is_absolute() && !dir.as_os_str().is_empty() && dir != Path::new(".") =>
        {
            dir.join(name_path)
        }
        _ => name_path.to_path_buf(),
    }
}

fn digits(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

impl EntryCatalog {
    pub fn new(config: &Config) -> Self {
        EntryCatalog {
            entries: Vec::with_capacity(100),
            widths: ColumnWidths::default(),
            any_has_acl: false,
            some_quoted: false,
            unsupported_devices: FnvHashSet::default(),
            names: NameCache::new(),
            policy: Policy::new(config),
        }
    }

    /// Drops every entry and resets the width maxima.
    ///
    /// The unsupported-device cache survives; it belongs to the filesystem,
    /// not to one listing.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.widths = ColumnWidths::default();
        self.any_has_acl = false;
        self.some_quoted = false;
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<FileEntry> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn widths(&self) -> &ColumnWidths {
        &self.widths
    }

    /// Whether any entry has an ACL or security context marker.
    pub fn any_has_acl(&self) -> bool {
        self.any_has_acl
    }

    /// Whether any entry's quoted name carries outer quotes.
    pub fn some_quoted(&self) -> bool {
        self.some_quoted
    }

    /// Admits a name, probing it as needed, and returns its allocated size in
    /// 512-byte blocks (0 when it was not probed).
    ///
    /// Probe failures are reported through `diag`. A failed operand is not
    /// admitted at all; any other failed name is admitted as a placeholder
    /// without status.
    pub fn admit(
        &mut self,
        probe: &dyn Probe,
        diag: &mut Diagnostics,
        request: Admission<'_>,
    ) -> u64 {
        let Admission {
            name,
            type_hint,
            inode_hint,
            command_line_arg,
            dirname,
        } = request;
        let policy = &self.policy;
        let path = full_path(name, dirname);
        let mut entry = FileEntry::new(name, type_hint, inode_hint);

        if policy.gate.hyperlink {
            entry.absolute_path = probe.canonicalize(&path).ok();
        }

        let full = policy
            .gate
            .needs_full_probe(type_hint, inode_hint.is_some(), command_line_arg);
        if !full {
            if policy
                .gate
                .needs_light_probe(type_hint, inode_hint.is_some(), command_line_arg)
            {
                match probe.file_type(&path, false) {
                    Ok(ft) => entry.file_type = ft,
                    Err(source) => {
                        diag.report(
                            Severity::Minor,
                            &ListError::Access {
                                path: quote_path(&path),
                                source,
                            },
                        );
                        self.note_placeholder();
                    }
                }
            } else {
                log::trace!("no probe needed for {}", path.display());
            }
            self.push(entry);
            return 0;
        }

        let status = match self.stat_with_policy(probe, &path, command_line_arg) {
            Ok(status) => status,
            Err(source) => {
                diag.report(
                    Severity::for_operand(command_line_arg),
                    &ListError::Access {
                        path: quote_path(&path),
                        source,
                    },
                );
                if !command_line_arg {
                    self.note_placeholder();
                    self.push(entry);
                }
                return 0;
            }
        };
        entry.file_type = status.file_type();
        let blocks = status.blocks;
        let regular = entry.file_type == FileType::Regular;
        entry.status = Some(status);

        self.probe_security(probe, diag, &path, &mut entry, regular);

        let policy = &self.policy;
        if entry.file_type == FileType::Symlink && (policy.long || policy.check_symlink_mode) {
            match probe.read_link(&path) {
                Ok(target) => {
                    entry.link_target = Some(target);
                    if policy.follow_links_for_type || policy.check_symlink_mode || policy.long {
                        if let Ok(referent) = probe.stat(&path, true) {
                            entry.link_mode = Some(referent.mode);
                        }
                    }
                }
                Err(source) => diag.report(
                    Severity::for_operand(command_line_arg),
                    &ListError::ReadLink {
                        path: quote_path(&path),
                        source,
                    },
                ),
            }
        }

        if entry.file_type == FileType::Directory && command_line_arg && !policy.immediate_dirs {
            entry.file_type = FileType::ArgDirectory;
        }

        self.note_widths(&mut entry);
        self.push(entry);
        blocks
    }

    /// Status under the dereference policy.
    fn stat_with_policy(
        &self,
        probe: &dyn Probe,
        path: &Path,
        command_line_arg: bool,
    ) -> io::Result<crate::data::Status> {
        match self.policy.dereference {
            Dereference::Always => probe.stat(path, true),
            Dereference::CommandLineArguments if command_line_arg => probe.stat(path, true),
            Dereference::CommandLineSymlinkToDir if command_line_arg => {
                let followed = probe.stat(path, true);
                let need_lstat = match &followed {
                    Err(e) => {
                        e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ELOOP)
                    }
                    Ok(status) => !status.is_dir(),
                };
                if need_lstat {
                    probe.stat(path, false)
                } else {
                    followed
                }
            }
            _ => probe.stat(path, false),
        }
    }

    fn probe_security(
        &mut self,
        probe: &dyn Probe,
        diag: &mut Diagnostics,
        path: &Path,
        entry: &mut FileEntry,
        regular: bool,
    ) {
        let want_security = self.policy.long || self.policy.print_scontext;
        let want_capability = self.policy.color_capability && regular;
        if !want_security && !want_capability {
            return;
        }
        let dev = entry.status.as_ref().map_or(0, |s| s.dev);
        if want_security {
            entry.security_context = SecurityContext::Unknown;
        }
        if self.unsupported_devices.contains(&dev) {
            return;
        }

        match probe.security(path, want_capability) {
            Ok(info) => {
                if want_security {
                    entry.acl_state = if self.policy.long { info.acl } else { AclState::None };
                    entry.security_context = info.context;
                    self.any_has_acl |=
                        matches!(entry.acl_state, AclState::Present | AclState::ContextOnly);
                }
                entry.has_capability = info.capability;
            }
            Err(e) if is_unsupported(&e) => {
                log::debug!("security probes unsupported on device {dev}; skipping its files");
                self.unsupported_devices.insert(dev);
            }
            Err(source) => {
                entry.acl_state = AclState::Unknown;
                diag.report(
                    Severity::Minor,
                    &ListError::Security {
                        path: quote_path(path),
                        source,
                    },
                );
            }
        }
    }

    /// Widths for an entry whose status fields all render as `?`.
    fn note_placeholder(&mut self) {
        let w = &mut self.widths;
        if self.policy.long || self.policy.print_block_size {
            w.block_size = w.block_size.max(1);
        }
        if self.policy.long {
            w.nlink = w.nlink.max(1);
            w.owner = w.owner.max(1);
            w.group = w.group.max(1);
            w.author = w.author.max(1);
            w.file_size = w.file_size.max(1);
        }
        if self.policy.print_scontext {
            w.scontext = w.scontext.max(1);
        }
    }

    fn note_widths(&mut self, entry: &mut FileEntry) {
        let Some(status) = entry.status.as_ref() else {
            return;
        };
        let policy = &self.policy;
        let w = &mut self.widths;

        if policy.long || policy.print_block_size {
            let text = format_in_units(status.blocks.saturating_mul(512), policy.block_size);
            w.block_size = w.block_size.max(text.len());
        }
        if policy.long {
            w.nlink = w.nlink.max(digits(status.nlink));

            if policy.print_owner || policy.print_author {
                let owner = if policy.numeric_ids {
                    status.uid.to_string()
                } else {
                    self.names
                        .user_name(status.uid)
                        .map_or_else(|| status.uid.to_string(), String::from)
                };
                let width = UnicodeWidthStr::width(owner.as_str());
                if policy.print_owner {
                    w.owner = w.owner.max(width);
                }
                if policy.print_author {
                    w.author = w.author.max(width);
                }
                entry.owner = Some(owner);
            }
            if policy.print_group {
                let group = if policy.numeric_ids {
                    status.gid.to_string()
                } else {
                    self.names
                        .group_name(status.gid)
                        .map_or_else(|| status.gid.to_string(), String::from)
                };
                w.group = w.group.max(UnicodeWidthStr::width(group.as_str()));
                entry.group = Some(group);
            }

            let ft = status.file_type();
            if ft == FileType::CharDevice || ft == FileType::BlockDevice {
                w.major = w.major.max(digits(major(status.rdev)));
                w.minor = w.minor.max(digits(minor(status.rdev)));
                w.file_size = w.file_size.max(w.major + 2 + w.minor);
            } else {
                let text = format_in_units(status.size, policy.file_block_size);
                w.file_size = w.file_size.max(text.len());
            }
        }
        if policy.print_scontext {
            let width = UnicodeWidthStr::width(entry.security_context.as_display());
            w.scontext = w.scontext.max(width);
        }
    }

    /// Stores an entry, noting the widths every entry contributes to
    /// whether or not it was probed.
    fn push(&mut self, mut entry: FileEntry) {
        if self.policy.print_inode {
            // the directory-read inode counts; `?` when there is none
            let width = entry.inode().map_or(1, digits);
            self.widths.inode = self.widths.inode.max(width);
        }
        if self.policy.align_quotes {
            let quoted = self.policy.quoter.needs_quoting(&entry.name);
            entry.needs_quoting = if quoted { Tristate::Yes } else { Tristate::No };
            self.some_quoted |= quoted;
        }
        self.entries.push(entry);
    }
}
