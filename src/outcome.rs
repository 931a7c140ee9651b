use std::fmt::{Display, Formatter};

use serde::Serialize;

/// What the boundary layer hands to the engine
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
  pub language: String,
  pub source: String,
  pub stdin: Option<String>,
}

impl ExecutionRequest {
  pub fn new<LS: Into<String>, SS: Into<String>>(language: LS, source: SS) -> Self {
    ExecutionRequest {
      language: language.into(),
      source: source.into(),
      stdin: None,
    }
  }

  pub fn stdin<IS: Into<String>>(mut self, stdin: IS) -> Self {
    self.stdin = Some(stdin.into());
    self
  }

  pub fn set_stdin(mut self, stdin: Option<String>) -> Self {
    self.stdin = stdin;
    self
  }
}

/// Terminal result of one request
///
/// `Completed` also covers programs that exited non-zero: compiler and runtime
/// diagnostics are part of `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
  Completed { output: String },
  TimedOut,
  SandboxFailure { message: String },
  UnsupportedLanguage { language: String },
}

impl ExecutionOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, ExecutionOutcome::Completed { .. })
  }

  pub fn output(&self) -> Option<&str> {
    match self {
      ExecutionOutcome::Completed { output } => Some(output.as_str()),
      _ => None,
    }
  }
}

impl Display for ExecutionOutcome {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ExecutionOutcome::Completed { .. } => write!(f, "Completed"),
      ExecutionOutcome::TimedOut => write!(f, "Timed Out"),
      ExecutionOutcome::SandboxFailure { message } => write!(f, "Sandbox Failure: {}", message),
      ExecutionOutcome::UnsupportedLanguage { language } => {
        write!(f, "Unsupported Language: {}", language)
      }
    }
  }
}

/// Lifecycle of a request inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
  Pending,
  Staged,
  Launched,
  Completed,
  TimedOut,
  SandboxFailure,
  TornDown,
}

impl ExecutionState {
  pub fn can_advance_to(self, next: ExecutionState) -> bool {
    use ExecutionState::*;
    matches!(
      (self, next),
      (Pending, Staged)
        | (Staged, Launched)
        | (Launched, Completed)
        | (Launched, TimedOut)
        | (Launched, SandboxFailure)
        | (Completed, TornDown)
        | (TimedOut, TornDown)
        | (SandboxFailure, TornDown)
    )
  }

  /// Terminal execution state matching an outcome, if it ran at all
  pub fn of(outcome: &ExecutionOutcome) -> Option<ExecutionState> {
    match outcome {
      ExecutionOutcome::Completed { .. } => Some(ExecutionState::Completed),
      ExecutionOutcome::TimedOut => Some(ExecutionState::TimedOut),
      ExecutionOutcome::SandboxFailure { .. } => Some(ExecutionState::SandboxFailure),
      ExecutionOutcome::UnsupportedLanguage { .. } => None,
    }
  }
}
