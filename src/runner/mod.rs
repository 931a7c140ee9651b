use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::outcome::ExecutionOutcome;
use crate::reaper::Reaper;
use crate::sandbox::SandboxInvocation;

pub(crate) mod child;

use child::CapturedChild;

/// Launches sandbox invocations and classifies how they end
#[derive(Debug, Clone)]
pub struct ExecutionRunner {
  output_limit: usize,
  teardown_timeout: Duration,
  failure_status: Option<i32>,
}

impl ExecutionRunner {
  pub fn new(output_limit: usize, teardown_timeout: Duration, failure_status: Option<i32>) -> Self {
    ExecutionRunner {
      output_limit,
      teardown_timeout,
      failure_status,
    }
  }

  /// Run `invocation` until it exits or `deadline` elapses
  ///
  /// On timeout both kill paths run: the local process group is killed and the
  /// sandbox instance is force-removed through `reaper`.
  pub fn run(
    &self,
    invocation: &SandboxInvocation,
    deadline: Duration,
    reaper: &mut Reaper,
  ) -> ExecutionOutcome {
    let name = invocation.instance_name();
    let started = Instant::now();

    let mut child = match CapturedChild::spawn(invocation.command(), self.output_limit, true) {
      Ok(child) => child,
      Err(err) => {
        error!("Launch sandbox {} fails: {}", name, err);
        // Something may have been created before the launch broke
        reaper.remove_instance();
        return ExecutionOutcome::SandboxFailure {
          message: err.to_string(),
        };
      }
    };
    info!("Launch sandbox {} (pid #{}.)", name, child.id());

    let status = match child.wait_until(started + deadline) {
      Ok(status) => status,
      Err(err) => {
        error!("Waiting for sandbox {} fails: {}", name, err);
        child.kill_group();
        reaper.remove_instance();
        return ExecutionOutcome::SandboxFailure {
          message: err.to_string(),
        };
      }
    };

    match status {
      Some(status) => {
        let output = child.output(self.teardown_timeout);
        info!(
          "Sandbox {} exited with {} after {} ms ({} bytes output)",
          name,
          status,
          started.elapsed().as_millis(),
          output.total()
        );
        match (status.code(), self.failure_status) {
          (Some(code), Some(failure)) if code == failure => ExecutionOutcome::SandboxFailure {
            message: output.text().trim().to_string(),
          },
          _ => ExecutionOutcome::Completed {
            output: output.text(),
          },
        }
      }
      None => {
        warn!(
          "Sandbox {} exceeded the {} ms deadline",
          name,
          deadline.as_millis()
        );
        child.kill_group();
        reaper.remove_instance();
        ExecutionOutcome::TimedOut
      }
    }
  }
}
