//! A logging handle that components receive at construction instead of reaching
//! for process-wide state.

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

/// Where a component's log records go.
///
/// * [`Logger::noop`] discards everything and is the default.
/// * [`Logger::global`] forwards to whichever `log` backend the binary installed
///   (for example `env_logger`).
/// * [`Logger::new`] sends records to any [`Log`] implementation.
///
/// Cloning is cheap; every component keeps its own copy with its own target.
#[derive(Clone)]
pub struct Logger {
    sink: Option<Arc<dyn Log>>,
    target: &'static str,
}

impl Logger {
    /// Sends records to `sink` directly, bypassing the global `log` logger.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self {
            sink: Some(sink),
            target: "weather_ingest",
        }
    }

    /// Drops every record. This is the `Default`.
    pub fn noop() -> Self {
        Self {
            sink: None,
            target: "weather_ingest",
        }
    }

    /// Forwards to whatever logger the application installed through the `log` facade.
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalFacade))
    }

    /// Same destination, different record target.
    pub fn with_target(&self, target: &'static str) -> Self {
        Self {
            sink: self.sink.clone(),
            target,
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if sink.enabled(&metadata) {
            sink.log(
                &Record::builder()
                    .metadata(metadata)
                    .args(args)
                    .module_path_static(Some(module_path!()))
                    .build(),
            );
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.target)
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

/// Forwards to the `log` crate's global logger at the time of each call.
struct GlobalFacade;

impl Log for GlobalFacade {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects `"LEVEL target: message"` lines for assertions.
    #[derive(Default)]
    pub(crate) struct CaptureLog {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl CaptureLog {
        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().map(|l| l.clone()).unwrap_or_default()
        }
    }

    impl Log for CaptureLog {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(format!(
                    "{} {}: {}",
                    record.level(),
                    record.target(),
                    record.args()
                ));
            }
        }

        fn flush(&self) {}
    }
}
