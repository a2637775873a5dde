//! Main entry point for the `ruls` CLI application.
//!
//! `ruls` lists directory contents the way `ls` does: sorted, optionally in
//! columns, optionally long, optionally colored.
//!
//! # Responsibilities
//! - Parses CLI arguments via [`clap`] using the [`Args`] struct
//! - Resolves them, together with the environment, into a [`Config`]
//! - Wires terminal signals to the cancellation token when colors are on
//! - Hands the operands to a [`ListingSession`] and maps its outcome to the
//!   exit status (0, 1, 2, or 130 when interrupted)

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, IsTerminal};
use std::sync::atomic::AtomicU8;

use ruls::cancel::{CancelRequest, CancelToken};
use ruls::{Args, Config, Diagnostics, Environment, ListError, ListingSession};

const PROGRAM: &str = "ruls";

/// Exit status after an honored interrupt.
const INTERRUPTED: i32 = 130;

static SIGNAL_STATE: AtomicU8 = AtomicU8::new(0);

const HANDLED_SIGNALS: [libc::c_int; 6] = [
    libc::SIGHUP,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGTERM,
    libc::SIGALRM,
    libc::SIGTSTP,
];

extern "C" fn on_signal(sig: libc::c_int) {
    let request = if sig == libc::SIGTSTP {
        CancelRequest::Stop
    } else {
        CancelRequest::Interrupt
    };
    CancelToken::new(&SIGNAL_STATE).request(request);
}

/// Stops the process until it is continued.
fn suspend() {
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
}

/// Routes the handled signals to [`SIGNAL_STATE`], leaving alone any the
/// parent process told us to ignore.
fn install_signal_handlers() -> io::Result<()> {
    for sig in HANDLED_SIGNALS {
        unsafe {
            let mut old: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(sig, std::ptr::null(), &mut old) != 0 {
                return Err(io::Error::last_os_error());
            }
            if old.sa_sigaction == libc::SIG_IGN {
                continue;
            }
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = libc::SA_RESTART;
            if libc::sigaction(sig, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

fn run() -> Result<i32> {
    // collation and time names follow the user's locale
    unsafe {
        libc::setlocale(libc::LC_ALL, c"".as_ptr());
    }

    let args = Args::parse();
    let env = Environment::from_process();
    let stdout = io::stdout();
    let (config, warnings) = Config::resolve(&args, &env, stdout.is_terminal());

    let mut diag = Diagnostics::stderr(PROGRAM);
    for warning in warnings {
        diag.warn(warning);
    }

    let cancel = if config.color.is_some() {
        install_signal_handlers().context("Failed to install signal handlers")?;
        CancelToken::new(&SIGNAL_STATE).with_suspend(suspend)
    } else {
        CancelToken::inert()
    };

    let out = BufWriter::new(stdout.lock());
    let mut session = ListingSession::new(config, out)
        .with_diagnostics(diag)
        .with_cancel(cancel);

    match session.list_operands(&args.files) {
        Ok(status) => Ok(status.code()),
        Err(ListError::Interrupted) => Ok(INTERRUPTED),
        Err(e) => Err(e).context("Listing aborted"),
    }
}

fn main() {
    env_logger::init();
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{PROGRAM}: {e:#}");
            2
        }
    };
    std::process::exit(code);
}
