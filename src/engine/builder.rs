use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::admission::AdmissionGate;
use crate::engine::{
  Engine, EngineConfig, DEFAULT_DEADLINE, DEFAULT_OUTPUT_LIMIT, DEFAULT_TEARDOWN_TIMEOUT,
};
use crate::error::CodeRunError;
use crate::preset::{LanguageRegistry, LanguageSpec};
use crate::runner::ExecutionRunner;
use crate::runtime::ContainerRuntime;
use crate::sandbox::{SandboxPolicy, SandboxProvisioner, DEFAULT_WORKDIR};
use crate::utils::{MemoryLimitType, TimeLimitType};
use crate::workspace::WorkspaceManager;

/// Build an Engine
///
/// Unset values fall back to `CODERUN_STAGING_DIR` / `CODERUN_RUNTIME` and then
/// to the built-in defaults.
pub struct EngineBuilder {
  registry: LanguageRegistry,
  runtime: Option<ContainerRuntime>,
  staging_root: Option<PathBuf>,
  deadline: Duration,
  teardown_timeout: Duration,
  output_limit: usize,
  policy: SandboxPolicy,
  workdir: String,
  max_concurrent: Option<usize>,
  reap_on_start: bool,
}

impl EngineBuilder {
  pub fn new() -> Self {
    EngineBuilder {
      registry: LanguageRegistry::default(),
      runtime: None,
      staging_root: None,
      deadline: DEFAULT_DEADLINE,
      teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
      output_limit: DEFAULT_OUTPUT_LIMIT,
      policy: SandboxPolicy::default(),
      workdir: DEFAULT_WORKDIR.to_string(),
      max_concurrent: None,
      reap_on_start: false,
    }
  }

  /// Replace the whole language registry
  pub fn registry(mut self, registry: LanguageRegistry) -> Self {
    self.registry = registry;
    self
  }

  /// Register one more language (or replace a built-in one)
  pub fn language(mut self, spec: LanguageSpec) -> Self {
    self.registry.register(spec);
    self
  }

  pub fn runtime(mut self, runtime: ContainerRuntime) -> Self {
    self.runtime = Some(runtime);
    self
  }

  /// Set runtime or keep the default
  pub fn set_runtime(mut self, runtime: Option<ContainerRuntime>) -> Self {
    if runtime.is_some() {
      self.runtime = runtime;
    }
    self
  }

  pub fn staging_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
    self.staging_root = Some(path.into());
    self
  }

  /// Set staging root or keep the default
  pub fn set_staging_root(mut self, path: Option<PathBuf>) -> Self {
    if path.is_some() {
      self.staging_root = path;
    }
    self
  }

  pub fn deadline(mut self, value: Duration) -> Self {
    self.deadline = value;
    self
  }

  /// Set deadline (unit: ms) or keep the default
  pub fn set_time_limit(mut self, value: Option<TimeLimitType>) -> Self {
    if let Some(value) = value {
      self.deadline = Duration::from_millis(value);
    }
    self
  }

  pub fn teardown_timeout(mut self, value: Duration) -> Self {
    self.teardown_timeout = value;
    self
  }

  /// Set max bytes of output kept per run
  pub fn output_limit(mut self, value: usize) -> Self {
    self.output_limit = value;
    self
  }

  pub fn policy(mut self, policy: SandboxPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Set memory limit (unit: bytes) or keep the default
  pub fn set_memory_limit(mut self, value: Option<MemoryLimitType>) -> Self {
    if let Some(value) = value {
      self.policy.memory = value;
    }
    self
  }

  /// Set cpu share or keep the default
  pub fn set_cpus(mut self, value: Option<f64>) -> Self {
    if let Some(value) = value {
      self.policy.cpus = value;
    }
    self
  }

  /// Set the max number of processes or keep the default
  pub fn set_process(mut self, value: Option<u64>) -> Self {
    if let Some(value) = value {
      self.policy.processes = value;
    }
    self
  }

  /// Set the working directory inside the sandbox
  pub fn workdir<WS: Into<String>>(mut self, path: WS) -> Self {
    self.workdir = path.into();
    self
  }

  /// Bound the number of requests running at once (`None`: unbounded)
  pub fn max_concurrent(mut self, value: Option<usize>) -> Self {
    self.max_concurrent = value;
    self
  }

  /// Sweep orphans from an earlier crash right after building
  pub fn reap_on_start(mut self, flag: bool) -> Self {
    self.reap_on_start = flag;
    self
  }

  /// Build Engine after setting all the options
  pub fn build(self) -> Result<Engine, CodeRunError> {
    if self.deadline.is_zero() {
      return Err(CodeRunError::cli("Deadline should be positive"));
    }
    if !(self.policy.cpus > 0.0) {
      return Err(CodeRunError::cli("CPU share should be positive"));
    }
    if self.policy.memory == 0 || self.policy.processes == 0 {
      return Err(CodeRunError::cli("Memory and process limits should be positive"));
    }
    if !self.workdir.starts_with('/') {
      return Err(CodeRunError::cli("Sandbox workdir should be absolute"));
    }

    let runtime = match self.runtime {
      Some(runtime) => runtime,
      None => match env::var("CODERUN_RUNTIME") {
        Ok(text) if !text.trim().is_empty() => ContainerRuntime::parse(&text)?,
        _ => ContainerRuntime::docker(),
      },
    };
    let staging_root = self.staging_root.unwrap_or_else(|| {
      env::var("CODERUN_STAGING_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("coderun"))
    });

    let workspaces = WorkspaceManager::new(&staging_root)?;
    debug!("Staging root {}", workspaces.root().display());

    let config = EngineConfig {
      deadline: self.deadline,
      teardown_timeout: self.teardown_timeout,
      output_limit: self.output_limit,
      policy: self.policy,
      workdir: self.workdir,
      runtime: runtime.clone(),
      staging_root: workspaces.root().to_path_buf(),
      max_concurrent: self.max_concurrent,
    };

    let engine = Engine {
      provisioner: SandboxProvisioner::new(runtime.clone(), config.workdir.clone()),
      runner: ExecutionRunner::new(
        config.output_limit,
        config.teardown_timeout,
        runtime.runtime_failure_status(),
      ),
      gate: config.max_concurrent.map(AdmissionGate::new),
      registry: Arc::new(self.registry),
      workspaces,
      config,
    };

    info!(
      "Engine ready: {} languages, runtime `{}`, deadline {} ms",
      engine.registry.len(),
      runtime.command_line().join(" "),
      engine.config.deadline.as_millis()
    );

    if self.reap_on_start {
      engine.reap_orphans();
    }

    Ok(engine)
  }
}

impl Default for EngineBuilder {
  fn default() -> Self {
    Self::new()
  }
}
