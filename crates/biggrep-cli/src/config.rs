//! Reads the bespoke `key=value` / bare-flag config file format and
//! re-parses it through the same [`Cli`] clap definition used for `argv`.

use std::fs;
use std::path::Path;

use clap::Parser;

use crate::cli::Cli;

const DEFAULT_CONFIG_PATH: &str = "/etc/biggrep/biggrep.conf";

/// Read `path` (or the default system config path if `path` is `None`) and
/// turn it into a synthetic argument list suitable for [`Cli::try_parse_from`].
///
/// Missing files are not an error: the default config path is optional, and
/// an explicitly-requested one that's missing is reported by the caller.
fn read_config_args(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let mut args = vec!["bgsearch".to_string()];
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                args.push(format!("--{}", key.trim()));
                args.push(value.trim().to_string());
            }
            None => args.push(format!("--{line}")),
        }
    }
    Ok(args)
}

/// Load the config-file-sourced `Cli` defaults for `explicit_path`, falling
/// back to `/etc/biggrep/biggrep.conf` when no `--config` flag was given.
/// Returns `Cli::default()` (no-op merge) if neither exists.
pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Cli> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => Path::new(DEFAULT_CONFIG_PATH).to_path_buf(),
    };

    let args = match read_config_args(&path) {
        Ok(args) => args,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit_path.is_none() => {
            return Ok(Cli::default());
        }
        Err(err) => {
            return Err(anyhow::anyhow!("failed to read config file {}: {err}", path.display()));
        }
    };

    Cli::try_parse_from(args).map_err(|err| anyhow::anyhow!("malformed config file {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_becomes_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biggrep.conf");
        std::fs::write(&path, "recursive\nverify\n").unwrap();
        let args = read_config_args(&path).unwrap();
        assert!(args.contains(&"--recursive".to_string()));
        assert!(args.contains(&"--verify".to_string()));
    }

    #[test]
    fn key_value_becomes_flag_and_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biggrep.conf");
        std::fs::write(&path, "numprocs = 4\n").unwrap();
        let args = read_config_args(&path).unwrap();
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.numprocs, Some(4));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biggrep.conf");
        std::fs::write(&path, "# a comment\n\nnumprocs=2\n").unwrap();
        let args = read_config_args(&path).unwrap();
        assert_eq!(args, vec!["bgsearch".to_string(), "--numprocs".to_string(), "2".to_string()]);
    }
}
