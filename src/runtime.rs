use std::process::Command;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::CodeRunError;
use crate::runner::child::CapturedChild;

pub const DEFAULT_RUNTIME: &str = "docker";

/// Exit status `docker run` uses when the failure is in the runtime itself
/// (missing image, daemon unreachable) rather than in the sandboxed program
pub const RUNTIME_FAILURE_STATUS: i32 = 125;

/// Output kept from management commands (`rm`, `ps`, ...)
const MANAGEMENT_OUTPUT_LIMIT: usize = 64 * 1024;

/// Container runtime CLI, e.g. `docker`, `podman` or `sudo docker`
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRuntime {
  command: Vec<String>,
  failure_status: Option<i32>,
}

impl ContainerRuntime {
  pub fn new<S: Into<String>>(command: Vec<S>) -> Result<Self, CodeRunError> {
    let command = command.into_iter().map(|c| c.into()).collect::<Vec<String>>();
    if command.is_empty() || command[0].is_empty() {
      return Err(CodeRunError::cli("Container runtime command is empty"));
    }
    Ok(ContainerRuntime {
      command,
      failure_status: Some(RUNTIME_FAILURE_STATUS),
    })
  }

  /// Parse a whitespace separated command line such as `sudo docker`
  pub fn parse(text: &str) -> Result<Self, CodeRunError> {
    Self::new(text.split_whitespace().collect())
  }

  pub fn docker() -> Self {
    ContainerRuntime {
      command: vec![DEFAULT_RUNTIME.to_string()],
      failure_status: Some(RUNTIME_FAILURE_STATUS),
    }
  }

  /// Set which exit status of `run` means the runtime itself failed
  pub fn failure_status(mut self, status: Option<i32>) -> Self {
    self.failure_status = status;
    self
  }

  pub fn runtime_failure_status(&self) -> Option<i32> {
    self.failure_status
  }

  pub fn command_line(&self) -> &[String] {
    &self.command
  }

  /// (program, leading arguments)
  pub(crate) fn split(&self) -> (String, Vec<String>) {
    (self.command[0].clone(), self.command[1..].to_vec())
  }

  fn command<AS: AsRef<str>>(&self, args: &[AS]) -> Command {
    let mut command = Command::new(&self.command[0]);
    command.args(&self.command[1..]);
    command.args(args.iter().map(|a| a.as_ref()));
    command
  }

  /// Run a management command, killing it once `timeout` elapses
  fn run_bounded<AS: AsRef<str>>(
    &self,
    args: &[AS],
    timeout: Duration,
    merge_stderr: bool,
  ) -> Result<(i32, String), CodeRunError> {
    let command = self.command(args);
    let mut child = CapturedChild::spawn(command, MANAGEMENT_OUTPUT_LIMIT, merge_stderr)?;
    match child.wait_until(Instant::now() + timeout)? {
      Some(status) => {
        let output = child.output(timeout);
        Ok((status.code().unwrap_or(-1), output.text()))
      }
      None => {
        child.kill_group();
        Err(CodeRunError::runtime(format!(
          "`{} {}` exceeded {} ms",
          self.command.join(" "),
          args.iter().map(|a| a.as_ref()).collect::<Vec<&str>>().join(" "),
          timeout.as_millis()
        )))
      }
    }
  }

  /// Force-remove an instance; an instance that does not exist counts as removed
  pub fn force_remove(&self, name: &str, timeout: Duration) -> Result<(), CodeRunError> {
    let (status, output) = self.run_bounded(&["rm", "-f", name], timeout, true)?;
    if status == 0 {
      info!("Remove sandbox instance {}", name);
      Ok(())
    } else if output.contains("No such container") || output.contains("no such container") {
      debug!("Sandbox instance {} already gone", name);
      Ok(())
    } else {
      Err(CodeRunError::runtime(format!(
        "remove {} exited with {}: {}",
        name,
        status,
        output.trim()
      )))
    }
  }

  /// Names of all instances (running or not) starting with `prefix`
  pub fn list_instances(
    &self,
    prefix: &str,
    timeout: Duration,
  ) -> Result<Vec<String>, CodeRunError> {
    let filter = format!("name={}", prefix);
    let args = ["ps", "-a", "--filter", filter.as_str(), "--format", "{{.Names}}"];
    let (status, output) = self.run_bounded(&args, timeout, false)?;
    if status != 0 {
      return Err(CodeRunError::runtime(format!("list instances exited with {}", status)));
    }
    // The runtime filter matches substrings
    Ok(
      output
        .lines()
        .map(|line| line.trim())
        .filter(|name| name.starts_with(prefix))
        .map(|name| name.to_string())
        .collect(),
    )
  }

  /// Whether the runtime answers at all
  pub fn is_available(&self, timeout: Duration) -> bool {
    match self.run_bounded(&["version"], timeout, true) {
      Ok((0, _)) => true,
      Ok((status, output)) => {
        warn!("Runtime version exited with {}: {}", status, output.trim());
        false
      }
      Err(err) => {
        warn!("{}", err);
        false
      }
    }
  }

  /// Whether `image` is present locally
  pub fn has_image(&self, image: &str, timeout: Duration) -> bool {
    matches!(
      self.run_bounded(&["image", "inspect", image], timeout, true),
      Ok((0, _))
    )
  }
}

impl Default for ContainerRuntime {
  fn default() -> Self {
    Self::docker()
  }
}
