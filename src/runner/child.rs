use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::Receiver;
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

use crate::error::CodeRunError;
use crate::pipe::{collect, CollectedOutput, OutputPipe};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A child process in its own process group whose output is drained by a reader thread
pub(crate) struct CapturedChild {
  child: Child,
  output: Receiver<CollectedOutput>,
}

impl CapturedChild {
  /// Spawn `command` with a null stdin and stdout (plus stderr when `merge_stderr`)
  /// on one pipe
  pub(crate) fn spawn(
    mut command: Command,
    limit: usize,
    merge_stderr: bool,
  ) -> Result<Self, CodeRunError> {
    let (reader, writer) = OutputPipe::new()?.split();

    command.stdin(Stdio::null());
    let stdout = writer
      .try_clone()
      .map_err(|err| CodeRunError::runtime(format!("duplicate output pipe: {}", err)))?;
    command.stdout(Stdio::from(stdout));
    if merge_stderr {
      command.stderr(Stdio::from(writer));
    } else {
      command.stderr(Stdio::null());
      drop(writer);
    }
    command.process_group(0);

    let child = command
      .spawn()
      .map_err(|err| CodeRunError::runtime(format!("{:?}: {}", command.get_program(), err)))?;
    // The command still holds the write ends; the reader only sees EOF once they are closed
    drop(command);

    Ok(CapturedChild {
      child,
      output: collect(reader, limit),
    })
  }

  pub(crate) fn id(&self) -> u32 {
    self.child.id()
  }

  /// Poll until the child exits or `deadline` passes (`None`)
  pub(crate) fn wait_until(
    &mut self,
    deadline: Instant,
  ) -> Result<Option<ExitStatus>, CodeRunError> {
    loop {
      let status = self
        .child
        .try_wait()
        .map_err(|err| CodeRunError::runtime(err.to_string()))?;
      if let Some(status) = status {
        return Ok(Some(status));
      }
      let now = Instant::now();
      if now >= deadline {
        return Ok(None);
      }
      sleep(POLL_INTERVAL.min(deadline - now));
    }
  }

  /// SIGKILL the whole process group, then reap the child
  pub(crate) fn kill_group(&mut self) {
    let pid = Pid::from_raw(self.child.id() as i32);
    match killpg(pid, Signal::SIGKILL) {
      Ok(_) => debug!("Kill process group #{}.", pid),
      Err(Errno::ESRCH) => {}
      Err(err) => {
        warn!("Kill process group #{}. fails: {}", pid, err);
        if let Err(err) = self.child.kill() {
          warn!("Kill child #{}. fails: {}", pid, err);
        }
      }
    }
    if let Err(err) = self.child.wait() {
      warn!("Reap child #{}. fails: {}", pid, err);
    }
  }

  /// Output collected so far, waiting at most `grace` for the reader to hit EOF
  pub(crate) fn output(self, grace: Duration) -> CollectedOutput {
    match self.output.recv_timeout(grace) {
      Ok(output) => output,
      Err(_) => {
        warn!(
          "Output of child #{}. not closed within {} ms",
          self.child.id(),
          grace.as_millis()
        );
        CollectedOutput::default()
      }
    }
  }
}
