//! `bg-fileidmap`: extracts or replaces the file-id map section of a
//! `.bgi` index, backed by a sidecar `<index>.fileidmap.txt` text file.
//!
//! The sidecar holds one `%010u file_path[,meta=data,...]` line per
//! fileid, in increasing order starting at zero; this tool does no
//! validation beyond checking the line count matches the header, so it's
//! on the caller not to reorder or drop lines before a `--replace`.

mod header;

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

/// Extract (default) or replace the file-id map portion of `.bgi` files.
#[derive(Debug, Parser)]
#[command(name = "bg-fileidmap", version)]
struct Cli {
    /// Verbose output.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Debug output.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Replace the file-id map instead of extracting it.
    #[arg(short = 'r', long = "replace")]
    replace: bool,

    /// Path to the sidecar file-id map file, overriding the default
    /// `<index>.fileidmap.txt` naming.
    #[arg(long = "fileidmap")]
    fileidmap: Option<PathBuf>,

    /// `.bgi` files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::ERROR
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.replace { Mode::Replace } else { Mode::Extract };
    let mut failures = 0;
    for file in &cli.files {
        let sidecar = cli.fileidmap.clone().unwrap_or_else(|| sidecar_path(file));
        tracing::info!("processing {}, {}ing fileid map", file.display(), mode.verb());
        if let Err(err) = process_file(file, &sidecar, mode) {
            tracing::error!("{}: {err}", file.display());
            failures += 1;
            continue;
        }
        tracing::info!("done {}ing {}", mode.verb(), file.display());
    }

    if failures > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Extract,
    Replace,
}

impl Mode {
    fn verb(self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Replace => "replac",
        }
    }
}

fn sidecar_path(bgi: &Path) -> PathBuf {
    let mut name = bgi.file_name().unwrap_or_default().to_os_string();
    name.push(".fileidmap.txt");
    match bgi.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

fn process_file(bgi_path: &Path, sidecar_path: &Path, mode: Mode) -> anyhow::Result<()> {
    match mode {
        Mode::Extract => extract(bgi_path, sidecar_path),
        Mode::Replace => replace(bgi_path, sidecar_path),
    }
}

fn extract(bgi_path: &Path, sidecar_path: &Path) -> anyhow::Result<()> {
    let mut bgi = OpenOptions::new().read(true).open(bgi_path)?;
    let header = header::read(&mut bgi)?;

    let sidecar = OpenOptions::new().create(true).write(true).truncate(true).open(sidecar_path)?;
    let mut sidecar = BufWriter::new(sidecar);

    let mut reader = BufReader::new(bgi);
    let mut lines_written = 0u32;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        sidecar.write_all(line.as_bytes())?;
        if !line.ends_with('\n') {
            sidecar.write_all(b"\n")?;
        }
        lines_written += 1;
    }
    sidecar.flush()?;

    if lines_written != header.file_count {
        anyhow::bail!(
            "line number mismatch ({lines_written} vs expected {}), bailing",
            header.file_count
        );
    }
    Ok(())
}

fn replace(bgi_path: &Path, sidecar_path: &Path) -> anyhow::Result<()> {
    if !sidecar_path.is_file() {
        anyhow::bail!("fileid map file {} appears to be missing, skipping", sidecar_path.display());
    }

    let mut bgi = OpenOptions::new().read(true).write(true).open(bgi_path)?;
    let header = header::read(&mut bgi)?;

    let sidecar_lines: Vec<String> = BufReader::new(std::fs::File::open(sidecar_path)?)
        .lines()
        .collect::<Result<_, _>>()?;

    if sidecar_lines.len() as u32 != header.file_count {
        anyhow::bail!(
            "line number mismatch ({} vs expected {}), bailing",
            sidecar_lines.len(),
            header.file_count
        );
    }

    // `header::read` already seeked `bgi` to the map offset.
    for line in &sidecar_lines {
        bgi.write_all(line.as_bytes())?;
        bgi.write_all(b"\n")?;
    }
    let end = std::io::Seek::stream_position(&mut bgi)?;
    bgi.set_len(end)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn make_index(map_offset: u64, file_count: u32, map_body: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; map_offset as usize];
        bytes[8] = 2;
        bytes[9] = 0;
        bytes[16..20].copy_from_slice(&file_count.to_le_bytes());
        bytes[20..28].copy_from_slice(&map_offset.to_le_bytes());
        bytes.extend_from_slice(map_body.as_bytes());
        bytes
    }

    #[test]
    fn extract_writes_sidecar_and_matches_count() {
        let dir = tempfile::tempdir().unwrap();
        let bgi_path = dir.path().join("test.bgi");
        let body = "0000000000 /a/b,size=1\n0000000001 /a/c,size=2\n";
        std::fs::write(&bgi_path, make_index(28, 2, body)).unwrap();

        let sidecar = sidecar_path(&bgi_path);
        extract(&bgi_path, &sidecar).unwrap();
        let contents = std::fs::read_to_string(&sidecar).unwrap();
        assert_eq!(contents, body);
    }

    #[test]
    fn extract_reports_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let bgi_path = dir.path().join("test.bgi");
        let body = "0000000000 /a/b,size=1\n";
        std::fs::write(&bgi_path, make_index(28, 2, body)).unwrap();

        let sidecar = sidecar_path(&bgi_path);
        assert!(extract(&bgi_path, &sidecar).is_err());
    }

    #[test]
    fn replace_roundtrips_through_extract() {
        let dir = tempfile::tempdir().unwrap();
        let bgi_path = dir.path().join("test.bgi");
        let body = "0000000000 /a/b,size=1\n0000000001 /a/c,size=2\n";
        std::fs::write(&bgi_path, make_index(28, 2, body)).unwrap();

        let sidecar = sidecar_path(&bgi_path);
        extract(&bgi_path, &sidecar).unwrap();
        std::fs::write(&sidecar, "0000000000 /a/b,size=1\n0000000001 /a/d,size=9\n").unwrap();
        replace(&bgi_path, &sidecar).unwrap();

        extract(&bgi_path, &sidecar).unwrap();
        let contents = std::fs::read_to_string(&sidecar).unwrap();
        assert_eq!(contents, "0000000000 /a/b,size=1\n0000000001 /a/d,size=9\n");
    }

    #[test]
    fn replace_rejects_missing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let bgi_path = dir.path().join("test.bgi");
        std::fs::write(&bgi_path, make_index(28, 1, "0000000000 /a\n")).unwrap();
        let missing = dir.path().join("missing.fileidmap.txt");
        assert!(replace(&bgi_path, &missing).is_err());
    }
}
