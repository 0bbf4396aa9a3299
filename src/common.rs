// Licensed under the Apache-2.0 license

//! Shared driver plumbing: the logging seam used by every driver in the crate.

use core::fmt::Write as _;

/// Capacity of a single formatted log line.
pub const LOG_LINE_CAPACITY: usize = 128;

/// Formatted log line. Formatting past the capacity truncates.
pub type LogLine = heapless::String<LOG_LINE_CAPACITY>;

/// Sink for driver diagnostics.
///
/// Drivers are generic over the logger so that production builds can use
/// [`NoOpLogger`] and pay nothing for the calls.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Logger writing `[tag] message\r\n` lines to a serial byte sink.
pub struct UartLogger<W: embedded_io::Write> {
    sink: W,
    tag: &'static str,
    verbose: bool,
}

impl<W: embedded_io::Write> UartLogger<W> {
    /// Create a logger. When `verbose` is false, only errors are written.
    pub fn new(sink: W, tag: &'static str, verbose: bool) -> Self {
        Self { sink, tag, verbose }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn emit(&mut self, level: &str, msg: &str) {
        // A failing debug UART has nowhere to report to.
        let _ = self.sink.write_all(b"[");
        let _ = self.sink.write_all(self.tag.as_bytes());
        let _ = self.sink.write_all(b"] ");
        let _ = self.sink.write_all(level.as_bytes());
        let _ = self.sink.write_all(msg.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for UartLogger<W> {
    fn debug(&mut self, msg: &str) {
        if self.verbose {
            self.emit("", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        self.emit("error: ", msg);
    }
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, msg: &str) {
        (**self).debug(msg);
    }

    fn error(&mut self, msg: &str) {
        (**self).error(msg);
    }
}

#[doc(hidden)]
pub fn format_line(args: core::fmt::Arguments<'_>) -> LogLine {
    let mut line = LogLine::new();
    // Overflow leaves the truncated prefix in place.
    let _ = line.write_fmt(args);
    line
}

/// Format a debug message into a fixed-size line and hand it to a [`Logger`].
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::Logger::debug(
            &mut $logger,
            $crate::common::format_line(format_args!($($arg)*)).as_str(),
        )
    };
}

/// Format an error message into a fixed-size line and hand it to a [`Logger`].
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::common::Logger::error(
            &mut $logger,
            $crate::common::format_line(format_args!($($arg)*)).as_str(),
        )
    };
}
