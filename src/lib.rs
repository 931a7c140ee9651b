pub use engine::{Engine, EngineBuilder, EngineConfig};
pub use error::{CodeRunError, CodeRunExit};
pub use outcome::{ExecutionOutcome, ExecutionRequest, ExecutionState};
pub use preset::{LanguageRegistry, LanguageSpec};
pub use reaper::ReapReport;
pub use runtime::ContainerRuntime;
pub use sandbox::{SandboxInvocation, SandboxPolicy};

pub mod admission;
pub mod engine;
mod error;
mod outcome;
pub mod pipe;
pub mod preset;
pub mod reaper;
pub mod runner;
pub mod runtime;
pub mod sandbox;
pub mod utils;
pub mod workspace;
