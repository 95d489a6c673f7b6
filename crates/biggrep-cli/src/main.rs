//! `bgsearch`: search every `.bgi` index under a set of directories for a
//! set of terms, confirming candidates with `bgverify` or `yara` and
//! reporting matches as they're confirmed.

mod cli;
mod config;
mod index_files;
mod logging;
mod status;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use biggrep_core::{normalize, FilterPredicate, SearchTerm, TermMode};
use biggrep_engine::{search, EngineError, SearchConfig, Verifier};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };
    let cli = cli.merge(cfg);

    let verbosity = if cli.debug {
        logging::Verbosity::Debug
    } else if cli.verbose || cli.metrics {
        logging::Verbosity::Verbose
    } else {
        logging::Verbosity::Quiet
    };
    logging::install(verbosity, cli.syslog.as_deref());

    if let Some(banner) = &cli.banner {
        match std::fs::read_to_string(banner) {
            Ok(text) => {
                let _ = write!(std::io::stderr(), "{text}");
            }
            Err(err) => tracing::warn!("could not read banner file {}: {err}", banner.display()),
        }
    }

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.directory.is_empty() {
        anyhow::bail!("no directories specified");
    }

    if let Some(yara_rules) = &cli.yara {
        if !yara_rules.is_file() {
            anyhow::bail!("yara rules file {} does not exist", yara_rules.display());
        }
    }

    let mut terms: Vec<SearchTerm> = Vec::new();
    for raw in &cli.binary {
        terms.push(convert_term(raw, TermMode::Hex)?);
    }
    for raw in &cli.ascii {
        terms.push(convert_term(raw, TermMode::Ascii)?);
    }
    for raw in &cli.unicode {
        terms.push(convert_term(raw, TermMode::Unicode)?);
    }
    for raw in &cli.terms {
        terms.push(convert_term(raw, TermMode::Auto)?);
    }
    if terms.is_empty() {
        anyhow::bail!("no search terms specified");
    }
    tracing::info!(count = terms.len(), "searching for terms");

    let mut filter_criteria = Vec::new();
    for expr in &cli.filter {
        filter_criteria.push(FilterPredicate::parse(expr)?);
    }

    let index_files = index_files::collect(&cli.directory, cli.recursive, cli.index_order_or_default())?;
    if index_files.is_empty() {
        anyhow::bail!("no index files found");
    }

    let verifier = if let Some(rules) = &cli.yara {
        Verifier::Yara {
            yara_path: cli.yara_path_or_default(),
            rules_file: rules.to_string_lossy().into_owned(),
        }
    } else if cli.verify {
        Verifier::Native {
            bgverify_path: cli.bgverify_path_or_default(),
        }
    } else {
        Verifier::None
    };

    let config = SearchConfig {
        terms,
        index_files,
        verifier,
        filter_criteria,
        candidate_limit: cli.limit_or_default(),
        num_procs: cli.numprocs_or_default(),
        bgparse_path: cli.bgparse_path_or_default(),
        throttle_at: cli.throttle_or_default(),
        debug_collaborators: cli.debug && cli.verbose,
    };

    biggrep_engine::signal::install_sigint_handler();

    let show_metadata = !cli.no_metadata;
    let quiet_status = !(cli.verbose || cli.debug || cli.metrics);
    let mut printed = 0usize;
    let stdout = std::io::stdout();
    let mut status_reporter = status::StatusReporter::new();

    let outcome = search(
        config,
        |candidate| {
            let mut handle = stdout.lock();
            let line = if show_metadata {
                format!("{}{}", candidate.file_path, candidate.raw_metadata)
            } else {
                candidate.file_path.clone()
            };
            let _ = writeln!(handle, "{line}");
            if printed < 10 {
                printed += 1;
                let _ = handle.flush();
            }
        },
        |status| status_reporter.report(status, quiet_status),
    );

    status::finish();

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(EngineError::CandidateLimitReached { count, percent_done }) => {
            tracing::error!(count, percent_done, "candidate limit reached, exiting");
            Ok(ExitCode::from(2))
        }
        Err(EngineError::Interrupted) => Ok(ExitCode::from(1)),
        Err(err) => {
            tracing::error!("{err}");
            Ok(ExitCode::from(1))
        }
    }
}

fn convert_term(raw: &str, mode: TermMode) -> anyhow::Result<SearchTerm> {
    let normalized = normalize(raw, mode)?;
    if let Some(warning) = normalized.warning {
        tracing::warn!("{warning}");
    }
    Ok(normalized.term)
}
