use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::warn;

use super::{Compression, Format, Sink};
use crate::error::CoreError;

/// Writes each payload as one line to standard output (or any writer).
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
    batches: AtomicU64,
    bytes: AtomicU64,
    flush_errors: AtomicU64,
}

impl std::fmt::Debug for StdoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdoutSink")
            .field("batches", &self.batches.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            batches: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn init(&mut self, _format: Format, compression: Compression) -> Result<(), CoreError> {
        match compression {
            Compression::None => Ok(()),
            other => Err(CoreError::Unsupported {
                operation: format!("{other} compression on the stdout sink"),
            }),
        }
    }

    async fn send(&self, payload: &[u8]) -> Result<(), CoreError> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(payload)
            .and_then(|()| out.write_all(b"\n"))
            .map_err(|e| CoreError::Sink {
                message: format!("stdout write failed: {e}"),
            })?;
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(u64::try_from(payload.len()).unwrap_or(u64::MAX), Ordering::Relaxed);
        Ok(())
    }

    async fn close(&mut self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.flush() {
            self.flush_errors.fetch_add(1, Ordering::Relaxed);
            warn!(sink = "stdout", error = %e, "flush at close failed");
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn health(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("batches_sent".to_owned(), self.batches.load(Ordering::Relaxed) as f64),
            ("bytes_sent".to_owned(), self.bytes.load(Ordering::Relaxed) as f64),
            ("flush_errors".to_owned(), self.flush_errors.load(Ordering::Relaxed) as f64),
        ])
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;
    use std::sync::{Arc, Mutex, PoisonError};

    /// A cloneable in-memory writer.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
