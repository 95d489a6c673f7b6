//! Signal plumbing. Only the orchestrator's main thread is meant to see
//! `SIGINT`; collaborator children are detached from it so a `^C` doesn't
//! race the parent's own cleanup against children dying mid-write.

use std::process::Command;

static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Install the process-wide `SIGINT` handler. Call once, from the CLI
/// binary, before starting a search.
#[cfg(unix)]
pub fn install_sigint_handler() {
    unsafe extern "C" fn on_sigint(_sig: libc::c_int) {
        INTERRUPTED.store(true, std::sync::atomic::Ordering::SeqCst);
    }
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install_sigint_handler() {}

/// Whether `SIGINT` has been observed since [`install_sigint_handler`] was
/// called.
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::SeqCst)
}

/// Detach a collaborator child from the parent's signal disposition: ignore
/// `SIGINT` so the parent (not a half-written `bgparse` process) handles a
/// `^C`, and restore default `SIGTERM` handling.
#[cfg(unix)]
pub fn detach_from_parent_signals(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_IGN);
            libc::signal(libc::SIGTERM, libc::SIG_DFL);
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn detach_from_parent_signals(_cmd: &mut Command) {}
