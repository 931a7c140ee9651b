use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use remove_dir_all::remove_dir_all;

use crate::runtime::ContainerRuntime;
use crate::workspace::{Workspace, WorkspaceManager, INSTANCE_PREFIX};

/// Single finalization point of one request
///
/// Owns the workspace from staging on. Teardown (instance first, files second)
/// happens exactly once, on `finish` or on drop, whichever comes first.
pub struct Reaper {
  runtime: ContainerRuntime,
  workspaces: WorkspaceManager,
  workspace: Workspace,
  teardown_timeout: Duration,
  instance_removed: bool,
  finished: bool,
}

/// What an orphan sweep removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
  pub instances: usize,
  pub workspaces: usize,
  pub failures: usize,
}

impl Reaper {
  pub fn new(
    runtime: ContainerRuntime,
    workspaces: WorkspaceManager,
    workspace: Workspace,
    teardown_timeout: Duration,
  ) -> Self {
    Reaper {
      runtime,
      workspaces,
      workspace,
      teardown_timeout,
      instance_removed: false,
      finished: false,
    }
  }

  pub fn workspace(&self) -> &Workspace {
    &self.workspace
  }

  pub fn instance_removed(&self) -> bool {
    self.instance_removed
  }

  /// Force-remove the sandbox instance; only the first call does anything
  pub fn remove_instance(&mut self) {
    if self.instance_removed {
      return;
    }
    self.instance_removed = true;

    let name = self.workspace.instance_name();
    let started = Instant::now();
    match self.runtime.force_remove(name, self.teardown_timeout) {
      Ok(_) => debug!(
        "Instance {} removal took {} ms",
        name,
        started.elapsed().as_millis()
      ),
      Err(err) => error!("Fails removing sandbox instance {}: {}", name, err),
    }
  }

  /// Tear everything down now
  pub fn finish(mut self) {
    self.teardown();
  }

  fn teardown(&mut self) {
    if self.finished {
      return;
    }
    self.finished = true;
    self.remove_instance();
    self.workspaces.dispose(&self.workspace);
  }
}

impl Drop for Reaper {
  fn drop(&mut self) {
    self.teardown();
  }
}

/// Remove instances and workspaces left behind by an orchestrator that died mid-request
///
/// Everything under the staging root is considered abandoned, so this must not
/// run while another engine shares that root.
pub fn reap_orphans(
  runtime: &ContainerRuntime,
  workspaces: &WorkspaceManager,
  timeout: Duration,
) -> ReapReport {
  let mut report = ReapReport::default();

  match runtime.list_instances(INSTANCE_PREFIX, timeout) {
    Ok(names) => {
      for name in names {
        match runtime.force_remove(&name, timeout) {
          Ok(_) => report.instances += 1,
          Err(err) => {
            error!("Fails reaping instance {}: {}", name, err);
            report.failures += 1;
          }
        }
      }
    }
    Err(err) => {
      warn!("Listing sandbox instances fails: {}", err);
      report.failures += 1;
    }
  }

  match workspaces.list() {
    Ok(dirs) => {
      for dir in dirs {
        match remove_dir_all(&dir) {
          Ok(_) => report.workspaces += 1,
          Err(err) => {
            error!("Fails reaping workspace {}: {}", dir.display(), err);
            report.failures += 1;
          }
        }
      }
    }
    Err(err) => {
      warn!("Listing workspaces fails: {}", err);
      report.failures += 1;
    }
  }

  info!(
    "Reap {} instances and {} workspaces ({} failures)",
    report.instances, report.workspaces, report.failures
  );
  report
}
