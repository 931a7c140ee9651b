use std::process::Command;

use log::debug;

use crate::preset::LanguageSpec;
use crate::runtime::ContainerRuntime;
use crate::utils::mount::MountPoint;
use crate::utils::MemoryLimitType;
use crate::workspace::{Workspace, STDIN_FILENAME};

/// Working directory inside the sandbox, where the staged files are mounted
pub const DEFAULT_WORKDIR: &str = "/app";

/// Resource caps applied to every sandbox instance
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxPolicy {
  /// Fraction of CPU cores
  pub cpus: f64,
  /// Memory limit in bytes, swap included
  pub memory: MemoryLimitType,
  /// Max number of processes and threads
  pub processes: u64,
}

impl Default for SandboxPolicy {
  fn default() -> Self {
    SandboxPolicy {
      cpus: 0.5,
      memory: 128 * 1024 * 1024,
      processes: 30,
    }
  }
}

/// A fully composed sandbox launch, kept as an argument list
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxInvocation {
  program: String,
  args: Vec<String>,
  instance_name: String,
}

impl SandboxInvocation {
  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  pub fn instance_name(&self) -> &str {
    &self.instance_name
  }

  /// Value following `flag` in the argument list
  pub fn flag_value(&self, flag: &str) -> Option<&str> {
    self
      .args
      .iter()
      .position(|arg| arg == flag)
      .and_then(|i| self.args.get(i + 1))
      .map(|v| v.as_str())
  }

  pub fn command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args);
    command
  }
}

/// Turns a staged workspace into a sandbox invocation
#[derive(Debug, Clone)]
pub struct SandboxProvisioner {
  runtime: ContainerRuntime,
  workdir: String,
}

impl SandboxProvisioner {
  pub fn new<WS: Into<String>>(runtime: ContainerRuntime, workdir: WS) -> Self {
    SandboxProvisioner {
      runtime,
      workdir: workdir.into(),
    }
  }

  pub fn workdir(&self) -> &str {
    &self.workdir
  }

  pub fn build(
    &self,
    spec: &LanguageSpec,
    workspace: &Workspace,
    policy: &SandboxPolicy,
  ) -> SandboxInvocation {
    let (program, mut args) = self.runtime.split();

    args.push("run".to_string());
    args.push("--rm".to_string());
    args.push("--name".to_string());
    args.push(workspace.instance_name().to_string());

    // caps
    args.push("--cpus".to_string());
    args.push(policy.cpus.to_string());
    args.push("--memory".to_string());
    args.push(policy.memory.to_string());
    args.push("--memory-swap".to_string());
    args.push(policy.memory.to_string());
    args.push("--pids-limit".to_string());
    args.push(policy.processes.to_string());

    // isolation
    args.push("--network".to_string());
    args.push("none".to_string());
    args.push("--security-opt".to_string());
    args.push("no-new-privileges".to_string());
    args.push("--cap-drop".to_string());
    args.push("ALL".to_string());
    args.push("--label".to_string());
    args.push(format!("coderun.workspace={}", workspace.id()));

    args.push("--workdir".to_string());
    args.push(self.workdir.clone());
    for mount_point in self.mounts(spec, workspace) {
      args.push("--volume".to_string());
      args.push(mount_point.to_volume());
    }

    args.push(spec.image().to_string());
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(self.shell_command(spec, workspace));

    debug!(
      "Compose sandbox {} for {}: {} {}",
      workspace.instance_name(),
      spec.tag(),
      program,
      args.join(" ")
    );

    SandboxInvocation {
      program,
      args,
      instance_name: workspace.instance_name().to_string(),
    }
  }

  /// Read-only mounts of the staged files
  pub fn mounts(&self, spec: &LanguageSpec, workspace: &Workspace) -> Vec<MountPoint> {
    let mut mounts = vec![MountPoint::read(
      workspace.source_path(),
      spec.source_path(&self.workdir),
    )];
    if let Some(stdin) = workspace.stdin_path() {
      mounts.push(MountPoint::read(stdin, self.stdin_path()));
    }
    mounts
  }

  /// Shell line run inside the sandbox; only registry templates and fixed paths end up here
  ///
  /// A program exiting with the runtime's own failure status is reported as exit 1,
  /// so that status can only come from the runtime.
  pub fn shell_command(&self, spec: &LanguageSpec, workspace: &Workspace) -> String {
    let run = spec.run_command(&self.workdir);
    let run = run.trim_end().trim_end_matches(';');
    let stdin = match workspace.stdin_path() {
      Some(_) => self.stdin_path(),
      None => "/dev/null".to_string(),
    };
    match self.runtime.runtime_failure_status() {
      Some(failure) => format!(
        "{{ {}; }} < {}; s=$?; [ \"$s\" -ne {} ] || s=1; exit \"$s\"",
        run, stdin, failure
      ),
      None => format!("{{ {}; }} < {}", run, stdin),
    }
  }

  fn stdin_path(&self) -> String {
    format!("{}/{}", self.workdir.trim_end_matches('/'), STDIN_FILENAME)
  }
}
