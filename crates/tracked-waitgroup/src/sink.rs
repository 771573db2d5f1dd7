//! Destination for dump text.
//!
//! A [`DiagnosticSink`] owns a writer behind its own mutex, so one report is
//! written at a time and concurrent dumps never interleave inside each other.
//! The process-wide instance returned by [`global_sink`] writes to standard
//! error until reconfigured. Reconfigure it once at startup, before wait
//! groups are in use.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

static GLOBAL_SINK: OnceLock<Arc<DiagnosticSink>> = OnceLock::new();

/// Process-wide sink used by wait groups built without explicit options.
pub fn global_sink() -> Arc<DiagnosticSink> {
    Arc::clone(GLOBAL_SINK.get_or_init(|| Arc::new(DiagnosticSink::stderr())))
}

pub struct DiagnosticSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl DiagnosticSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Replaces the destination. Reports already in flight finish on the old
    /// writer.
    pub fn set_writer(&self, writer: impl Write + Send + 'static) {
        *self.writer.lock() = Box::new(writer);
    }

    pub fn write_report(&self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink").finish_non_exhaustive()
    }
}

/// In-memory writer whose clones share one buffer.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_reach_the_buffer() {
        let buffer = CaptureBuffer::new();
        let sink = DiagnosticSink::new(buffer.clone());
        sink.write_report("hello\n").expect("write succeeds");
        assert_eq!(buffer.contents(), "hello\n");
    }

    #[test]
    fn empty_report_writes_nothing() {
        let sink = DiagnosticSink::new(FailingWriter);
        sink.write_report("").expect("empty report is not written");
    }

    #[test]
    fn set_writer_redirects_later_reports() {
        let first = CaptureBuffer::new();
        let second = CaptureBuffer::new();
        let sink = DiagnosticSink::new(first.clone());
        sink.write_report("one\n").expect("write succeeds");
        sink.set_writer(second.clone());
        sink.write_report("two\n").expect("write succeeds");
        assert_eq!(first.contents(), "one\n");
        assert_eq!(second.contents(), "two\n");
    }

    #[test]
    fn write_errors_propagate() {
        let sink = DiagnosticSink::new(FailingWriter);
        let err = sink.write_report("x").expect_err("writer fails");
        assert_eq!(err.to_string(), "sink closed");
    }

    #[test]
    fn concurrent_reports_stay_whole() {
        let buffer = CaptureBuffer::new();
        let sink = Arc::new(DiagnosticSink::new(buffer.clone()));
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    let report = format!("report {i} line 1\nreport {i} line 2\n");
                    for _ in 0..50 {
                        sink.write_report(&report).expect("write succeeds");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread panicked");
        }

        let contents = buffer.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 50 * 2);
        for pair in lines.chunks(2) {
            let first = pair[0].strip_suffix(" line 1").expect("first line of a report");
            let second = pair[1].strip_suffix(" line 2").expect("second line of a report");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn global_sink_is_shared() {
        assert!(Arc::ptr_eq(&global_sink(), &global_sink()));
    }
}
