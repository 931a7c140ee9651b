pub(crate) use cpp::CPP_PRESET;
pub(crate) use javascript::JAVASCRIPT_PRESET;
pub(crate) use python::PYTHON_PRESET;

mod cpp;
mod javascript;
mod python;

/// Runner image carrying g++, python3 and node (see `sandbox/Dockerfile`)
pub const DEFAULT_IMAGE: &str = "code-runner";
