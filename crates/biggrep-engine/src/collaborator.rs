//! Subprocess invocation of the three collaborator binaries BigGrep
//! orchestrates: `bgparse` (searches a single `.bgi` index), `bgverify`
//! (confirms candidates against their source files), and `yara` (an
//! alternative verifier driven by a rules file).

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use biggrep_core::{Candidate, SearchTerm};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::signal::detach_from_parent_signals;

/// Run `bgparse` against a single `.bgi` index and parse its candidate
/// output.
pub fn run_search(
    bgparse_path: &str,
    terms: &[SearchTerm],
    index_file: &Path,
    debug_collaborators: bool,
) -> Result<(Vec<Candidate>, Duration), EngineError> {
    let started = Instant::now();
    let mut cmd = Command::new(bgparse_path);
    for term in terms {
        cmd.arg("-s").arg(term.as_hex());
    }
    if debug_collaborators {
        cmd.arg("-d");
    }
    cmd.arg(index_file);
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    detach_from_parent_signals(&mut cmd);

    debug!(?cmd, "executing bgparse");
    let output = cmd.output().map_err(|source| EngineError::Spawn {
        program: "bgparse",
        source,
    })?;

    if !output.status.success() {
        warn!(status = ?output.status, "bgparse exited with an error or a signal");
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(collaborator = "bgparse", "{line}");
        }
    } else if debug_collaborators {
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(collaborator = "bgparse", "{line}");
        }
    }

    let candidates: Vec<Candidate> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .map(Candidate::parse_line)
        .collect();

    let duration = started.elapsed();
    debug!(
        candidates = candidates.len(),
        ?duration,
        "bgparse finished"
    );
    Ok((candidates, duration))
}

/// Run `bgverify` against a batch of candidates, returning the subset that
/// verified (their metadata is carried through unchanged).
pub fn run_verify(
    bgverify_path: &str,
    terms: &[SearchTerm],
    candidates: &[Candidate],
) -> Result<(usize, Vec<Candidate>, Duration), EngineError> {
    let started = Instant::now();
    let batch_size = candidates.len();
    if batch_size == 0 {
        return Ok((0, Vec::new(), Duration::default()));
    }

    let mut cmd = Command::new(bgverify_path);
    for term in terms {
        cmd.arg(term.as_hex());
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    detach_from_parent_signals(&mut cmd);

    debug!(?cmd, batch_size, "executing bgverify");
    let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
        program: "bgverify",
        source,
    })?;

    let stdin_payload: String = candidates
        .iter()
        .map(|c| c.file_path.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let mut stdin = child.stdin.take().expect("stdin was piped");
    std::thread::scope(|scope| -> Result<(), EngineError> {
        scope.spawn(|| {
            let _ = stdin.write_all(stdin_payload.as_bytes());
            drop(stdin);
        });
        Ok(())
    })?;

    let output = child
        .wait_with_output()
        .map_err(|source| EngineError::Spawn {
            program: "bgverify",
            source,
        })?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        if line.contains(" (E) ") {
            tracing::error!(collaborator = "bgverify", "{line}");
        } else if line.contains(" (W) ") {
            warn!(collaborator = "bgverify", "{line}");
        } else {
            debug!(collaborator = "bgverify", "{line}");
        }
    }

    let mut verified_paths = std::collections::HashSet::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(pos) = line.rfind(':') {
            verified_paths.insert(line[..pos].to_string());
        }
    }

    let verified: Vec<Candidate> = candidates
        .iter()
        .filter(|c| verified_paths.contains(&c.file_path))
        .cloned()
        .collect();

    let duration = started.elapsed();
    debug!(
        batch_size,
        verified = verified.len(),
        ?duration,
        "bgverify finished"
    );
    Ok((batch_size, verified, duration))
}

/// Run `yara <rules> <paths...>` against a batch of candidates, appending
/// the matched rule names onto each verified candidate's metadata.
pub fn run_yara_verify(
    yara_path: &str,
    rules_file: &str,
    candidates: &[Candidate],
) -> Result<(usize, Vec<Candidate>, Duration), EngineError> {
    let started = Instant::now();
    let batch_size = candidates.len();
    if batch_size == 0 {
        return Ok((0, Vec::new(), Duration::default()));
    }

    let mut cmd = Command::new(yara_path);
    cmd.arg(rules_file);
    for c in candidates {
        cmd.arg(&c.file_path);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    detach_from_parent_signals(&mut cmd);

    debug!(?cmd, batch_size, "executing yara");
    let output = cmd.output().map_err(|source| EngineError::Spawn {
        program: "yara",
        source,
    })?;

    let mut matches: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(pos) = line.find(' ') {
            let rule = &line[..pos];
            let path = &line[pos + 1..];
            matches
                .entry(path.to_string())
                .or_default()
                .push(rule.to_string());
        }
    }

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(collaborator = "yara", "{line}");
    }

    let verified: Vec<Candidate> = candidates
        .iter()
        .filter_map(|c| {
            matches.get(&c.file_path).map(|rules| {
                let sanitized: Vec<String> = rules
                    .iter()
                    .map(|r| r.replace([';', ','], "_"))
                    .collect();
                let mut raw_metadata = c.raw_metadata.clone();
                raw_metadata.push_str(",YARA_MATCHES=");
                raw_metadata.push_str(&sanitized.join(";"));
                Candidate {
                    file_path: c.file_path.clone(),
                    raw_metadata,
                }
            })
        })
        .collect();

    let duration = started.elapsed();
    debug!(
        batch_size,
        verified = verified.len(),
        ?duration,
        "yara finished"
    );
    Ok((batch_size, verified, duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use biggrep_core::TermMode;
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{body}").unwrap();
        drop(f);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn term(raw: &str) -> SearchTerm {
        biggrep_core::normalize(raw, TermMode::Auto).unwrap().term
    }

    #[test]
    fn run_search_parses_candidate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let bgparse = script(
            dir.path(),
            "bgparse",
            "echo '/bin/a,size=1'; echo '/bin/b,size=2'",
        );
        let (candidates, _) = run_search(
            bgparse.to_str().unwrap(),
            &[term("deadbeef")],
            std::path::Path::new("index.bgi"),
            false,
        )
        .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].file_path, "/bin/a");
    }

    #[test]
    fn run_verify_keeps_only_confirmed_paths() {
        let dir = tempfile::tempdir().unwrap();
        let bgverify = script(dir.path(), "bgverify", "cat - | while read -r p; do echo \"$p: 1\"; done");
        let candidates = vec![
            Candidate {
                file_path: "/bin/a".to_string(),
                raw_metadata: "size=1".to_string(),
            },
            Candidate {
                file_path: "/bin/b".to_string(),
                raw_metadata: "size=2".to_string(),
            },
        ];
        let (checked, verified, _) =
            run_verify(bgverify.to_str().unwrap(), &[term("deadbeef")], &candidates).unwrap();
        assert_eq!(checked, 2);
        assert_eq!(verified.len(), 2);
    }

    #[test]
    fn run_verify_empty_batch_skips_subprocess() {
        let (checked, verified, _) = run_verify("does-not-exist", &[term("deadbeef")], &[]).unwrap();
        assert_eq!(checked, 0);
        assert!(verified.is_empty());
    }

    #[test]
    fn run_yara_verify_annotates_matched_rules() {
        let dir = tempfile::tempdir().unwrap();
        let yara = script(dir.path(), "yara", "shift; for p in \"$@\"; do echo \"EICAR_TEST $p\"; done");
        let candidates = vec![Candidate {
            file_path: "/bin/a".to_string(),
            raw_metadata: "size=1".to_string(),
        }];
        let (_, verified, _) =
            run_yara_verify(yara.to_str().unwrap(), "rules.yar", &candidates).unwrap();
        assert_eq!(verified.len(), 1);
        assert!(verified[0].raw_metadata.contains("YARA_MATCHES=EICAR_TEST"));
    }
}
