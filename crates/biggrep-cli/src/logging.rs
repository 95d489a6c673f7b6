//! Installs the process-wide `tracing` subscriber.
//!
//! There is deliberately no global logger singleton in `biggrep-engine` or
//! `biggrep-core`: those crates just call the `tracing` macros, which are
//! no-ops until a subscriber is installed. Only the CLI binary installs
//! one, here, once.

use std::io::Write;
use std::net::UdpSocket;
use std::os::unix::net::UnixDatagram;

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Default: warnings and errors only.
    Quiet,
    /// `-V/--verbose`: info and above.
    Verbose,
    /// `-D/--debug`: debug and above (implies verbose).
    Debug,
}

impl Verbosity {
    fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Verbose => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }
}

/// Best-effort syslog destination, parsed from `facility[@address]`
/// (`address` is a unix socket path, `host`, or `host:port`; default
/// `/dev/log`).
struct SyslogWriter {
    facility: u8,
    sink: SyslogSink,
}

enum SyslogSink {
    Unix(UnixDatagram, String),
    Udp(UdpSocket, String),
}

impl SyslogWriter {
    fn connect(spec: &str) -> std::io::Result<SyslogWriter> {
        let (facility_name, address) = match spec.split_once('@') {
            Some((f, a)) => (f, a.to_string()),
            None => (spec, "/dev/log".to_string()),
        };
        let facility = facility_code(facility_name);
        let sink = if address.contains('/') {
            let socket = UnixDatagram::unbound()?;
            socket.connect(&address)?;
            SyslogSink::Unix(socket, address)
        } else {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            let target = if address.contains(':') {
                address.clone()
            } else {
                format!("{address}:514")
            };
            socket.connect(&target)?;
            SyslogSink::Udp(socket, target)
        };
        Ok(SyslogWriter { facility, sink })
    }
}

fn facility_code(name: &str) -> u8 {
    // RFC 3164 facility numbers for the local use slots this tool targets.
    match name {
        "local0" => 16,
        "local1" => 17,
        "local2" => 18,
        "local3" => 19,
        "local4" => 20,
        "local5" => 21,
        "local6" => 22,
        "local7" => 23,
        "user" => 1,
        "daemon" => 3,
        _ => 1,
    }
}

impl Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // severity 6 (info): the actual level is already in the formatted
        // line via the fmt layer, this is just the RFC 3164 wrapper.
        let priority = self.facility as u32 * 8 + 6;
        let mut framed = format!("<{priority}>").into_bytes();
        framed.extend_from_slice(buf);
        match &self.sink {
            SyslogSink::Unix(socket, _) => socket.send(&framed)?,
            SyslogSink::Udp(socket, _) => socket.send(&framed)?,
        };
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct SyslogMakeWriter {
    spec: std::sync::Arc<str>,
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogLine;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogLine { spec: self.spec.clone() }
    }
}

/// One log line's worth of syslog delivery; connects fresh each write since
/// a persistent connection that outlives log rotation or network hiccups
/// isn't worth the complexity here, and syslog is explicitly best-effort.
struct SyslogLine {
    spec: std::sync::Arc<str>,
}

impl Write for SyslogLine {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match SyslogWriter::connect(&self.spec) {
            Ok(mut writer) => {
                let _ = writer.write(buf);
            }
            Err(err) => {
                eprintln!("warning: syslog delivery failed: {err}");
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Install the global `tracing` subscriber. `syslog_spec` is the raw
/// `--syslog facility[@address]` argument, if given.
pub fn install(verbosity: Verbosity, syslog_spec: Option<&str>) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(verbosity.level()));

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match syslog_spec {
        Some(spec) => {
            let syslog_layer = fmt::layer()
                .with_writer(SyslogMakeWriter {
                    spec: std::sync::Arc::from(spec),
                })
                .with_ansi(false)
                .with_target(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(verbosity.level()));
            registry.with(syslog_layer).init();
        }
        None => registry.init(),
    }
}
