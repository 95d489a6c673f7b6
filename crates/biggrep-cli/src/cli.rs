//! Command-line surface for `bgsearch`.
//!
//! Every option is `Option<T>` with no clap-level default: a config-file
//! value and a command-line value are parsed independently as two `Cli`
//! instances, then [`Cli::merge`] combines them before defaults are
//! applied. This mirrors the two-pass `optparse` invocation the original
//! tool used (config file first, then `argv` layered on top) without
//! inheriting its append-then-strip workaround for directory lists.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How `.bgi` index files should be ordered before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexOrder {
    /// Keep whatever order directory enumeration produced.
    Undefined,
    /// Sort by file basename.
    Alpha,
    /// Shuffle with a fixed seed, so repeated runs are reproducible.
    Shuffle,
}

/// Search every `.bgi` index under the given directories for a set of
/// search terms, invoking `bgparse` and (optionally) `bgverify` or `yara`.
#[derive(Debug, Parser, Default, Clone)]
#[command(name = "bgsearch", version, disable_version_flag = true)]
pub struct Cli {
    /// Ascii string search term (repeatable).
    #[arg(short = 'a', long = "ascii")]
    pub ascii: Vec<String>,

    /// Binary hexadecimal string search term (repeatable).
    #[arg(short = 'b', long = "binary")]
    pub binary: Vec<String>,

    /// Unicode string search term (repeatable).
    #[arg(short = 'u', long = "unicode")]
    pub unicode: Vec<String>,

    /// Search terms with auto-detected encoding.
    #[arg(trailing_var_arg = true)]
    pub terms: Vec<String>,

    /// Directory to look for `.bgi` files in (repeatable). A directory
    /// given on the command line replaces, rather than adds to, any
    /// directories named in a config file.
    #[arg(short = 'd', long = "directory")]
    pub directory: Vec<PathBuf>,

    /// Recurse into subdirectories looking for `.bgi` files.
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Do not show metadata associated with each result.
    #[arg(short = 'M', long = "no-metadata")]
    pub no_metadata: bool,

    /// Invoke `bgverify` on candidate answers.
    #[arg(short = 'v', long = "verify")]
    pub verify: bool,

    /// Invoke `yara` on the specified rules file to verify candidates.
    #[arg(short = 'y', long = "yara")]
    pub yara: Option<PathBuf>,

    /// Do not verify above this number of candidates.
    #[arg(short = 'l', long = "limit")]
    pub limit: Option<usize>,

    /// Metadata filter criteria (repeatable), e.g. `size>=1024`.
    #[arg(short = 'f', long = "filter")]
    pub filter: Vec<String>,

    /// Number of simultaneous `.bgi` files to search.
    #[arg(short = 'n', long = "numprocs")]
    pub numprocs: Option<usize>,

    /// Text file to display as a banner before searching.
    #[arg(long = "banner")]
    pub banner: Option<PathBuf>,

    /// Order in which index files are searched.
    #[arg(short = 'i', long = "index-order")]
    pub index_order: Option<IndexOrder>,

    /// Throttle index parsing once this many candidates are buffered
    /// awaiting verification.
    #[arg(short = 't', long = "throttle")]
    pub throttle: Option<usize>,

    /// Verbose output.
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,

    /// Diagnostic output.
    #[arg(short = 'D', long = "debug")]
    pub debug: bool,

    /// Log output to syslog, e.g. `facility[@address]`.
    #[arg(long = "syslog")]
    pub syslog: Option<String>,

    /// Display per-directory timing metrics.
    #[arg(long = "metrics")]
    pub metrics: bool,

    /// Path to a config file to read defaults from, in place of
    /// `/etc/biggrep/biggrep.conf`.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the `bgparse` binary.
    #[arg(long = "bgparse-path", env = "BGPARSE_PATH")]
    pub bgparse_path: Option<String>,

    /// Path to the `bgverify` binary.
    #[arg(long = "bgverify-path", env = "BGVERIFY_PATH")]
    pub bgverify_path: Option<String>,

    /// Path to the `yara` binary.
    #[arg(long = "yara-path", env = "YARA_PATH")]
    pub yara_path: Option<String>,

    /// Print version information and exit.
    #[arg(long = "version", action = clap::ArgAction::Version)]
    pub version_flag: (),
}

const DEFAULT_LIMIT: usize = 15000;
const DEFAULT_NUMPROCS: usize = 12;
const DEFAULT_THROTTLE: usize = 10000;

impl Cli {
    /// Combine a config-file-sourced `Cli` (`cfg`) with the real
    /// command-line `Cli` (`self`, parsed from `argv`). `self`'s explicit
    /// values win; repeatable fields are concatenated except `directory`,
    /// which is fully overridden by the command line when non-empty.
    pub fn merge(self, cfg: Cli) -> Cli {
        Cli {
            ascii: concat(cfg.ascii, self.ascii),
            binary: concat(cfg.binary, self.binary),
            unicode: concat(cfg.unicode, self.unicode),
            terms: concat(cfg.terms, self.terms),
            directory: if self.directory.is_empty() {
                cfg.directory
            } else {
                self.directory
            },
            recursive: cfg.recursive || self.recursive,
            no_metadata: cfg.no_metadata || self.no_metadata,
            verify: cfg.verify || self.verify,
            yara: self.yara.or(cfg.yara),
            limit: self.limit.or(cfg.limit),
            filter: concat(cfg.filter, self.filter),
            numprocs: self.numprocs.or(cfg.numprocs),
            banner: self.banner.or(cfg.banner),
            index_order: self.index_order.or(cfg.index_order),
            throttle: self.throttle.or(cfg.throttle),
            verbose: cfg.verbose || self.verbose,
            debug: cfg.debug || self.debug,
            syslog: self.syslog.or(cfg.syslog),
            metrics: cfg.metrics || self.metrics,
            config: self.config,
            bgparse_path: self.bgparse_path.or(cfg.bgparse_path),
            bgverify_path: self.bgverify_path.or(cfg.bgverify_path),
            yara_path: self.yara_path.or(cfg.yara_path),
            version_flag: (),
        }
    }

    /// Number of candidates to allow before verification is cut off.
    pub fn limit_or_default(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Number of processor engines per stage.
    pub fn numprocs_or_default(&self) -> usize {
        self.numprocs.unwrap_or(DEFAULT_NUMPROCS)
    }

    /// Candidate backlog size that triggers search throttling.
    pub fn throttle_or_default(&self) -> usize {
        self.throttle.unwrap_or(DEFAULT_THROTTLE)
    }

    /// Index ordering mode, defaulting to whatever enumeration produced.
    pub fn index_order_or_default(&self) -> IndexOrder {
        self.index_order.unwrap_or(IndexOrder::Undefined)
    }

    /// Path to the `bgparse` binary, defaulting to a bare `PATH` lookup.
    pub fn bgparse_path_or_default(&self) -> String {
        self.bgparse_path.clone().unwrap_or_else(|| "bgparse".to_string())
    }

    /// Path to the `bgverify` binary, defaulting to a bare `PATH` lookup.
    pub fn bgverify_path_or_default(&self) -> String {
        self.bgverify_path.clone().unwrap_or_else(|| "bgverify".to_string())
    }

    /// Path to the `yara` binary, defaulting to a bare `PATH` lookup.
    pub fn yara_path_or_default(&self) -> String {
        self.yara_path.clone().unwrap_or_else(|| "yara".to_string())
    }
}

fn concat<T>(mut a: Vec<T>, b: Vec<T>) -> Vec<T> {
    a.extend(b);
    a
}
