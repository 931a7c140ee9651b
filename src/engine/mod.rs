use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::admission::AdmissionGate;
use crate::error::CodeRunError;
use crate::outcome::{ExecutionOutcome, ExecutionRequest, ExecutionState};
use crate::preset::LanguageRegistry;
use crate::reaper::{reap_orphans, ReapReport, Reaper};
use crate::runner::ExecutionRunner;
use crate::runtime::ContainerRuntime;
use crate::sandbox::{SandboxPolicy, SandboxProvisioner};
use crate::workspace::WorkspaceManager;

pub use builder::EngineBuilder;

mod builder;

/// Wall-clock budget of one sandboxed run
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5000);

/// Budget for force-removing a lingering instance
pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_millis(10000);

/// Combined output kept per run
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

/// Resolved engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub deadline: Duration,
  pub teardown_timeout: Duration,
  pub output_limit: usize,
  pub policy: SandboxPolicy,
  pub workdir: String,
  pub runtime: ContainerRuntime,
  pub staging_root: PathBuf,
  pub max_concurrent: Option<usize>,
}

/// Code execution engine: registry, staging, sandbox, runner and reaper wired together
///
/// `execute` may be called from many threads at once; requests share nothing
/// but the read-only registry and the optional admission gate.
pub struct Engine {
  config: EngineConfig,
  registry: Arc<LanguageRegistry>,
  workspaces: WorkspaceManager,
  provisioner: SandboxProvisioner,
  runner: ExecutionRunner,
  gate: Option<AdmissionGate>,
}

struct Lifecycle {
  id: String,
  state: ExecutionState,
}

impl Lifecycle {
  fn new(id: &str) -> Self {
    Lifecycle {
      id: id.to_string(),
      state: ExecutionState::Pending,
    }
  }

  fn advance(&mut self, next: ExecutionState) {
    debug_assert!(
      self.state.can_advance_to(next),
      "invalid transition {:?} -> {:?}",
      self.state,
      next
    );
    debug!("Request {}: {:?} -> {:?}", self.id, self.state, next);
    self.state = next;
  }
}

impl Engine {
  pub fn builder() -> EngineBuilder {
    EngineBuilder::new()
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn registry(&self) -> &LanguageRegistry {
    &self.registry
  }

  pub fn workspaces(&self) -> &WorkspaceManager {
    &self.workspaces
  }

  /// Run one request to its outcome and tear down everything it created
  ///
  /// Only a staging failure is returned as `Err`; every other failure is an
  /// `ExecutionOutcome`.
  pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, CodeRunError> {
    let spec = match self.registry.resolve(&request.language) {
      Ok(spec) => spec,
      Err(err) => {
        info!("Reject request: {}", err);
        return Ok(ExecutionOutcome::UnsupportedLanguage {
          language: request.language.clone(),
        });
      }
    };

    let _permit = self.gate.as_ref().map(|gate| gate.acquire());

    let workspace = self
      .workspaces
      .stage(spec, &request.source, request.stdin.as_deref())?;
    let mut lifecycle = Lifecycle::new(workspace.id());
    lifecycle.advance(ExecutionState::Staged);

    let mut reaper = Reaper::new(
      self.config.runtime.clone(),
      self.workspaces.clone(),
      workspace,
      self.config.teardown_timeout,
    );
    let invocation = self
      .provisioner
      .build(spec, reaper.workspace(), &self.config.policy);

    lifecycle.advance(ExecutionState::Launched);
    let outcome = self
      .runner
      .run(&invocation, self.config.deadline, &mut reaper);
    if let Some(state) = ExecutionState::of(&outcome) {
      lifecycle.advance(state);
    }

    reaper.finish();
    lifecycle.advance(ExecutionState::TornDown);

    info!("Request {} ({}): {}", lifecycle.id, spec.tag(), outcome);
    Ok(outcome)
  }

  /// Sweep instances and workspaces left by a crashed orchestrator
  pub fn reap_orphans(&self) -> ReapReport {
    reap_orphans(
      &self.config.runtime,
      &self.workspaces,
      self.config.teardown_timeout,
    )
  }
}
