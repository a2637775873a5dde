//! Run configuration and its resolution from flags plus environment.
//!
//! [`Config`] is the immutable record consumed by the listing core. It is
//! produced once per run by [`Config::resolve`] from the decoded [`Args`] and
//! an explicit [`Environment`] snapshot, so the core never reads process
//! globals.

use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;

use crate::cli::{Args, FormatArg, IndicatorArg, SortArg, TimeArg, When};
use crate::color::{self, ColorTable};
use crate::error::ListError;
use crate::layout::LayoutBudget;
use crate::quote::{Quoter, QuotingStyle};
use crate::sort::Collation;
use crate::timefmt::{TimeStyle, Zone};
use crate::utils::{BlockSize, parse_block_size, terminal_width};

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Long,
    OnePerLine,
    /// Grid filled down then across.
    Vertical,
    /// Grid filled across then down.
    Horizontal,
    Commas,
}

/// Primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Extension,
    Width,
    Size,
    Version,
    Time,
    None,
}

/// Which timestamp is shown and used by time sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeKind {
    #[default]
    Mtime,
    Ctime,
    Atime,
    Btime,
}

/// Immutable per-run sort configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub time_subkey: TimeKind,
    pub reverse: bool,
    pub directories_first: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            time_subkey: TimeKind::Mtime,
            reverse: false,
            directories_first: false,
        }
    }
}

/// When symlinks are followed during probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dereference {
    Never,
    Always,
    CommandLineArguments,
    CommandLineSymlinkToDir,
}

/// Which names are hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreMode {
    /// Hide dot-files and `--hide` patterns.
    Default,
    /// Hide only `.` and `..`.
    DotAndDotDot,
    /// Show everything, including `.` and `..`.
    Minimal,
}

/// Character appended to names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndicatorStyle {
    None,
    Slash,
    FileType,
    Classify,
}

/// Environment inputs consumed by configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub ls_colors: Option<OsString>,
    pub quoting_style: Option<String>,
    pub time_style: Option<String>,
    pub columns: Option<String>,
    pub tabsize: Option<String>,
    pub block_size: Option<String>,
    pub tz: Option<String>,
    pub term: Option<String>,
}

impl Environment {
    /// Snapshot of the current process environment.
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            ls_colors: std::env::var_os("LS_COLORS"),
            quoting_style: var("QUOTING_STYLE"),
            time_style: var("TIME_STYLE"),
            columns: var("COLUMNS"),
            tabsize: var("TABSIZE"),
            block_size: var("LS_BLOCK_SIZE").or_else(|| var("BLOCK_SIZE")),
            tz: var("TZ"),
            term: var("TERM"),
        }
    }
}

/// Resolved configuration of one listing run.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: Format,
    pub sort: SortSpec,
    pub collation: Collation,
    pub layout: LayoutBudget,
    pub dereference: Dereference,
    pub ignore_mode: IgnoreMode,
    pub ignore_patterns: Vec<String>,
    pub hide_patterns: Vec<String>,
    pub quoting: Quoter,
    pub indicator_style: IndicatorStyle,
    /// Parsed color table; `None` when color output is off.
    pub color: Option<ColorTable>,
    pub hyperlink: bool,
    pub recursive: bool,
    pub immediate_dirs: bool,
    pub print_inode: bool,
    pub print_block_size: bool,
    pub print_owner: bool,
    pub print_group: bool,
    pub print_author: bool,
    pub print_scontext: bool,
    pub numeric_ids: bool,
    /// Units for the block column and the directory total.
    pub block_size: BlockSize,
    /// Units for the size column.
    pub file_block_size: BlockSize,
    pub time_style: TimeStyle,
    pub zone: Zone,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: Format::OnePerLine,
            sort: SortSpec::default(),
            collation: Collation::ByteOrder,
            layout: LayoutBudget::new(80, 0),
            dereference: Dereference::CommandLineSymlinkToDir,
            ignore_mode: IgnoreMode::Default,
            ignore_patterns: Vec::new(),
            hide_patterns: Vec::new(),
            quoting: Quoter::new(QuotingStyle::Literal, false),
            indicator_style: IndicatorStyle::None,
            color: None,
            hyperlink: false,
            recursive: false,
            immediate_dirs: false,
            print_inode: false,
            print_block_size: false,
            print_owner: true,
            print_group: true,
            print_author: false,
            print_scontext: false,
            numeric_ids: false,
            block_size: BlockSize::Bytes(1024),
            file_block_size: BlockSize::Bytes(1),
            time_style: TimeStyle::Locale,
            zone: Zone::Local,
        }
    }
}

impl Config {
    /// Resolves flags and environment into a configuration.
    ///
    /// Returns the configuration and the warnings for environment values that
    /// were ignored.
    pub fn resolve(args: &Args, env: &Environment, stdout_is_tty: bool) -> (Config, Vec<String>) {
        let mut warnings = Vec::new();
        let mut config = Config {
            layout: LayoutBudget::new(80, 8),
            ..Config::default()
        };

        config.format = if args.full_time {
            Format::Long
        } else if let Some(f) = args.format {
            match f {
                FormatArg::Long | FormatArg::Verbose => Format::Long,
                FormatArg::Commas => Format::Commas,
                FormatArg::Across | FormatArg::Horizontal => Format::Horizontal,
                FormatArg::SingleColumn => Format::OnePerLine,
                FormatArg::Vertical => Format::Vertical,
            }
        } else if args.long || args.numeric_uid_gid {
            Format::Long
        } else if args.one_per_line {
            Format::OnePerLine
        } else if args.columns {
            Format::Vertical
        } else if args.across {
            Format::Horizontal
        } else if args.commas {
            Format::Commas
        } else if stdout_is_tty {
            Format::Vertical
        } else {
            Format::OnePerLine
        };

        config.numeric_ids = args.numeric_uid_gid;
        config.print_group = !args.no_group;
        config.print_author = args.author;
        config.print_inode = args.inode;
        config.print_block_size = args.size;
        config.print_scontext = args.context;
        config.recursive = args.recursive;
        config.immediate_dirs = args.directory;

        config.sort = Self::resolve_sort(args, config.format);
        config.collation = Collation::from_current_locale();

        config.ignore_mode = if args.all || args.unsorted_all {
            IgnoreMode::Minimal
        } else if args.almost_all {
            IgnoreMode::DotAndDotDot
        } else {
            IgnoreMode::Default
        };
        config.ignore_patterns = args.ignore.clone();
        if args.ignore_backups {
            config.ignore_patterns.push("*~".to_string());
            config.ignore_patterns.push(".*~".to_string());
        }
        config.hide_patterns = args.hide.clone();

        config.indicator_style = if let Some(style) = args.indicator_style {
            match style {
                IndicatorArg::None => IndicatorStyle::None,
                IndicatorArg::Slash => IndicatorStyle::Slash,
                IndicatorArg::FileType => IndicatorStyle::FileType,
                IndicatorArg::Classify => IndicatorStyle::Classify,
            }
        } else if args.classify {
            IndicatorStyle::Classify
        } else if args.file_type {
            IndicatorStyle::FileType
        } else if args.slash {
            IndicatorStyle::Slash
        } else {
            IndicatorStyle::None
        };

        config.dereference = if args.dereference {
            Dereference::Always
        } else if args.dereference_command_line {
            Dereference::CommandLineArguments
        } else if args.dereference_command_line_symlink_to_dir {
            Dereference::CommandLineSymlinkToDir
        } else if args.directory
            || config.indicator_style == IndicatorStyle::Classify
            || config.format == Format::Long
        {
            Dereference::Never
        } else {
            Dereference::CommandLineSymlinkToDir
        };

        config.quoting = Quoter::new(
            Self::resolve_quoting(args, env, stdout_is_tty, &mut warnings),
            stdout_is_tty,
        );

        config.time_style = Self::resolve_time_style(args, env, &mut warnings);
        config.zone = Zone::from_tz(env.tz.as_deref());

        Self::resolve_block_size(&mut config, args, env, &mut warnings);

        let line_length = match args.width {
            Some(w) => w,
            None => match env.columns.as_deref().map(str::parse::<usize>) {
                Some(Ok(cols)) if cols > 0 => cols,
                Some(_) => {
                    warnings.push(format!(
                        "ignoring invalid width in environment variable COLUMNS: '{}'",
                        env.columns.as_deref().unwrap_or_default()
                    ));
                    terminal_width(stdout_is_tty).unwrap_or(80)
                }
                None => terminal_width(stdout_is_tty).unwrap_or(80),
            },
        };
        let mut tab_size = match args.tabsize {
            Some(t) => t,
            None => match env.tabsize.as_deref().map(str::parse::<usize>) {
                Some(Ok(t)) => t,
                Some(Err(_)) => {
                    warnings.push(format!(
                        "ignoring invalid tab size in environment variable TABSIZE: '{}'",
                        env.tabsize.as_deref().unwrap_or_default()
                    ));
                    8
                }
                None => 8,
            },
        };

        let color_wanted = !args.unsorted_all
            && match args.color {
                Some(When::Always) => true,
                Some(When::Auto) => stdout_is_tty && env.term.as_deref() != Some("dumb"),
                Some(When::Never) | None => false,
            };
        if color_wanted {
            config.color = match env.ls_colors.as_ref().filter(|v| !v.is_empty()) {
                None => Some(ColorTable::default()),
                Some(spec) => match color::parse(spec.as_bytes()) {
                    Ok(table) => Some(table),
                    Err(e) => {
                        log::debug!("LS_COLORS rejected: {e}");
                        warnings.push(ListError::from(e).to_string());
                        None
                    }
                },
            };
        }
        if config.color.is_some() {
            // Tabs and color escapes do not mix on some terminals.
            tab_size = 0;
        }
        config.layout = LayoutBudget::new(line_length, tab_size);

        config.hyperlink = match args.hyperlink {
            Some(When::Always) => true,
            Some(When::Auto) => stdout_is_tty,
            Some(When::Never) | None => false,
        };

        log::debug!(
            "resolved config: format={:?} sort={:?} deref={:?} width={} color={}",
            config.format,
            config.sort,
            config.dereference,
            line_length,
            config.color.is_some()
        );
        (config, warnings)
    }

    fn resolve_sort(args: &Args, format: Format) -> SortSpec {
        let time_subkey = match args.time {
            Some(TimeArg::Mtime) => TimeKind::Mtime,
            Some(TimeArg::Atime) => TimeKind::Atime,
            Some(TimeArg::Ctime) => TimeKind::Ctime,
            Some(TimeArg::Birth) => TimeKind::Btime,
            None if args.ctime => TimeKind::Ctime,
            None if args.atime => TimeKind::Atime,
            None => TimeKind::Mtime,
        };

        let key = if args.unsorted || args.unsorted_all {
            SortKey::None
        } else if let Some(s) = args.sort {
            match s {
                SortArg::None => SortKey::None,
                SortArg::Size => SortKey::Size,
                SortArg::Time => SortKey::Time,
                SortArg::Version => SortKey::Version,
                SortArg::Extension => SortKey::Extension,
                SortArg::Width => SortKey::Width,
                SortArg::Name => SortKey::Name,
            }
        } else if args.sort_size {
            SortKey::Size
        } else if args.sort_time {
            SortKey::Time
        } else if args.sort_version {
            SortKey::Version
        } else if args.sort_extension {
            SortKey::Extension
        } else if (args.ctime || args.atime || args.time.is_some()) && format != Format::Long {
            // -c / -u without -l sort by that time.
            SortKey::Time
        } else {
            SortKey::Name
        };

        SortSpec {
            key,
            time_subkey,
            reverse: args.reverse,
            directories_first: args.group_directories_first,
        }
    }

    fn resolve_quoting(
        args: &Args,
        env: &Environment,
        stdout_is_tty: bool,
        warnings: &mut Vec<String>,
    ) -> QuotingStyle {
        if args.literal {
            return QuotingStyle::Literal;
        }
        if args.quote_name {
            return QuotingStyle::C;
        }
        if let Some(word) = &args.quoting_style {
            match word.parse() {
                Ok(style) => return style,
                Err(e) => warnings.push(e),
            }
        }
        if let Some(word) = &env.quoting_style {
            match word.parse() {
                Ok(style) => return style,
                Err(_) => warnings.push(format!(
                    "ignoring invalid value of environment variable QUOTING_STYLE: '{word}'"
                )),
            }
        }
        if stdout_is_tty {
            QuotingStyle::ShellEscape
        } else {
            QuotingStyle::Literal
        }
    }

    fn resolve_time_style(args: &Args, env: &Environment, warnings: &mut Vec<String>) -> TimeStyle {
        if args.full_time {
            return TimeStyle::FullIso;
        }
        let (value, source) = match (&args.time_style, &env.time_style) {
            (Some(v), _) => (v, "--time-style"),
            (None, Some(v)) => (v, "TIME_STYLE"),
            (None, None) => return TimeStyle::Locale,
        };
        TimeStyle::parse(value).unwrap_or_else(|| {
            warnings.push(format!("invalid time style format in {source}: '{value}'"));
            TimeStyle::Locale
        })
    }

    fn resolve_block_size(
        config: &mut Config,
        args: &Args,
        env: &Environment,
        warnings: &mut Vec<String>,
    ) {
        let explicit = if args.human_readable {
            Some(BlockSize::HumanBinary)
        } else if args.si {
            Some(BlockSize::HumanDecimal)
        } else if let Some(spec) = &args.block_size {
            match parse_block_size(spec) {
                Some(size) => Some(size),
                None => {
                    warnings.push(format!("invalid --block-size argument '{spec}'"));
                    None
                }
            }
        } else if let Some(spec) = &env.block_size {
            match parse_block_size(spec) {
                Some(size) => Some(size),
                None => {
                    warnings.push(format!("ignoring invalid block size in environment: '{spec}'"));
                    None
                }
            }
        } else {
            None
        };

        match explicit {
            Some(size) => {
                config.block_size = size;
                config.file_block_size = size;
            }
            None => {
                config.block_size = BlockSize::Bytes(1024);
                config.file_block_size = BlockSize::Bytes(1);
            }
        }
        let human = matches!(explicit, Some(BlockSize::HumanBinary | BlockSize::HumanDecimal));
        if args.kibibytes && !human {
            config.block_size = BlockSize::Bytes(1024);
        }
    }

    pub fn is_long(&self) -> bool {
        self.format == Format::Long
    }

    /// Whether symlink referents need resolving for indicators or color.
    pub fn check_symlink_mode(&self) -> bool {
        self.color
            .as_ref()
            .is_some_and(|c| c.needs_symlink_mode(self.is_long()))
    }

    /// Whether names without outer quotes get a leading space so they line
    /// up with quoted names.
    pub fn align_variable_outer_quotes(&self) -> bool {
        self.format != Format::Commas
            && self.format != Format::OnePerLine
            && (self.layout.line_length > 0 || self.is_long())
            && self.quoting.style.has_variable_outer_quotes()
    }
}
