//! Helpers shared by unit tests.

use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for LogBuffer {
  type Writer = LogBuffer;

  fn make_writer(&'a self) -> Self::Writer {
    self.clone()
  }
}

/// Run `f` with a debug-level subscriber on this thread and return its
/// result along with everything it logged.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
  let buffer = LogBuffer::default();
  let subscriber = tracing_subscriber::fmt()
    .with_writer(buffer.clone())
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .finish();

  let result = tracing::subscriber::with_default(subscriber, f);
  let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
  (result, logs)
}
