//! The `\r`-overwritten progress line written to stderr while a search
//! runs, in the `Search:<cc> <pct>% Verify:<vf>/<cc> <pct>%` form of the
//! original's `ps()`.

use std::io::Write;

use biggrep_engine::SearchStatus;

/// Tracks the previous line's length so the next one can be padded to
/// overwrite any trailing characters it left behind.
#[derive(Default)]
pub struct StatusReporter {
    previous_len: usize,
}

impl StatusReporter {
    /// Construct a reporter with no prior line to overwrite.
    pub fn new() -> StatusReporter {
        StatusReporter::default()
    }

    /// Write `status` to stderr as a single overwritten line, unless
    /// `quiet`.
    pub fn report(&mut self, status: SearchStatus, quiet: bool) {
        if quiet {
            return;
        }
        let search_percent = if status.total_index_files == 0 {
            100.0
        } else {
            100.0 * (status.total_index_files - status.pending_index_files) as f64
                / status.total_index_files as f64
        };
        let verify_percent = if status.candidate_count > 0 {
            100.0 * status.verify_checked_count as f64 / status.candidate_count as f64
        } else {
            0.0
        };

        let mut line = format!(
            "Search:{} {:.2}% Verify:{}/{} {:.2}%",
            status.candidate_count, search_percent, status.verified_count, status.candidate_count, verify_percent
        );
        if line.len() < self.previous_len {
            line.push_str(&" ".repeat(self.previous_len - line.len()));
        }
        self.previous_len = line.len();

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{line}\r");
        let _ = stderr.flush();
    }
}

/// Write a final newline so the next shell prompt doesn't land on top of
/// the last overwritten status line.
pub fn finish() {
    eprintln!();
}
