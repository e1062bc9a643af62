// file: src/logging/logger.rs
// version: 2.0.0
// guid: j0k1l2m3-n4o5-6789-0123-456789jklmno

//! Logger initialization and the shared build log file

use crate::error::ConfiguratorError;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Target used for lines relayed from the build subprocess
pub const BUILD_OUTPUT_TARGET: &str = "pi_gen::output";

/// Name of the log file in the invocation directory
pub const BUILD_LOG_FILE: &str = "build.log";

/// Append-only log file shared by the tracing file layer and the build relay
#[derive(Clone)]
pub struct BuildLog {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl BuildLog {
    /// Open (or create) the log file and write a run header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ConfiguratorError::config(format!(
                    "Failed to open build log {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let log = Self {
            path,
            file: Arc::new(Mutex::new(file)),
        };
        log.append_line(&format!(
            "=== pi-gen-configurator {} run started {} ===",
            env!("CARGO_PKG_VERSION"),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ))?;
        Ok(log)
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line verbatim
    pub fn append_line(&self, line: &str) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| ConfiguratorError::system("build log lock poisoned"))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Writer handed out to the tracing file layer
pub struct BuildLogWriter {
    file: Arc<Mutex<File>>,
}

impl Write for BuildLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "build log lock poisoned"))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "build log lock poisoned"))?;
        file.flush()
    }
}

impl<'a> MakeWriter<'a> for BuildLog {
    type Writer = BuildLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BuildLogWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Console filter directive for the verbosity flags
pub fn console_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize logging: compact console output plus everything in `build.log`
pub fn init_logger(verbose: bool, quiet: bool, build_log: &BuildLog) -> Result<()> {
    let console_filter = EnvFilter::new(console_directive(verbose, quiet));
    // relayed build output is already written verbatim by the dispatcher
    let file_filter = EnvFilter::new(format!("debug,{}=off", BUILD_OUTPUT_TARGET));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(build_log.clone())
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfiguratorError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Create a scoped logger for operations
pub fn with_operation_span<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = tracing::info_span!("operation", name = operation);
    let _enter = span.enter();
    f()
}
