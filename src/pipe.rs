use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::unix::io::FromRawFd;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use log::warn;
use nix::{fcntl::OFlag, unistd::pipe2};

use crate::error::CodeRunError;

/// One pipe both output streams of a child are attached to
pub struct OutputPipe(File, File);

/// Everything read from an `OutputPipe`, up to a byte limit
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
  bytes: Vec<u8>,
  total: usize,
}

impl OutputPipe {
  pub fn new() -> Result<Self, CodeRunError> {
    // O_CLOEXEC keeps the ends out of children spawned concurrently by other requests
    let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
    let read = unsafe { File::from_raw_fd(read) };
    let write = unsafe { File::from_raw_fd(write) };
    Ok(OutputPipe(read, write))
  }

  /// (read end, write end)
  pub fn split(self) -> (File, File) {
    (self.0, self.1)
  }
}

impl CollectedOutput {
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Bytes produced, including the discarded ones
  pub fn total(&self) -> usize {
    self.total
  }

  pub fn truncated(&self) -> bool {
    self.total > self.bytes.len()
  }

  /// Lossy UTF-8 text, with a marker when the limit cut it short
  pub fn text(&self) -> String {
    let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
    if self.truncated() {
      text.push_str(&format!("\n\n[Output truncated, {} bytes total]", self.total));
    }
    text
  }
}

/// Drain `reader` on a background thread until EOF
///
/// Bytes past `limit` are read and dropped so the writer never blocks on a full pipe.
pub fn collect(mut reader: File, limit: usize) -> Receiver<CollectedOutput> {
  let (sender, receiver) = channel();
  thread::spawn(move || {
    let mut output = CollectedOutput::default();
    let mut buf = [0u8; 8192];
    loop {
      match reader.read(&mut buf) {
        Ok(0) => break,
        Ok(size) => {
          let keep = limit.saturating_sub(output.bytes.len()).min(size);
          output.bytes.extend_from_slice(&buf[..keep]);
          output.total += size;
        }
        Err(err) if err.kind() == ErrorKind::Interrupted => continue,
        Err(err) => {
          warn!("Reading child output fails: {}", err);
          break;
        }
      }
    }
    // The receiver may have given up waiting
    let _ = sender.send(output);
  });
  receiver
}
