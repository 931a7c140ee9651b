use std::{
  error::Error,
  fmt::{Debug, Display},
  process::{ExitCode, Termination},
};

use flexi_logger::FlexiLoggerError;
use nix::{errno::Errno, libc::STDOUT_FILENO, unistd::isatty};

pub enum CodeRunError {
  UnsupportedLanguage(String),
  Staging(String),
  Runtime(String),
  Cli(String),
  Logger(FlexiLoggerError),
}

/// Process exit for the binary: a finished command or the error that stopped it
pub enum CodeRunExit {
  Ok,
  Failed,
  Err(CodeRunError),
}

impl CodeRunError {
  pub fn unsupported<MS: Into<String>>(language: MS) -> CodeRunError {
    CodeRunError::UnsupportedLanguage(language.into())
  }

  pub fn staging<MS: Into<String>>(msg: MS) -> CodeRunError {
    CodeRunError::Staging(msg.into())
  }

  pub fn runtime<MS: Into<String>>(msg: MS) -> CodeRunError {
    CodeRunError::Runtime(msg.into())
  }

  pub fn cli<MS: Into<String>>(msg: MS) -> CodeRunError {
    CodeRunError::Cli(msg.into())
  }
}

impl Debug for CodeRunError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    std::fmt::Display::fmt(&self, f)
  }
}

impl Display for CodeRunError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self {
      CodeRunError::UnsupportedLanguage(language) => {
        f.write_fmt(format_args!("Unsupported Language: {}", language))
      }
      CodeRunError::Staging(msg) => f.write_fmt(format_args!("Staging Error: {}", msg)),
      CodeRunError::Runtime(msg) => f.write_fmt(format_args!("Sandbox Runtime Error: {}", msg)),
      CodeRunError::Cli(msg) => f.write_fmt(format_args!("CLI Error: {}", msg)),
      CodeRunError::Logger(err) => f.write_fmt(format_args!("Logger Error: {}", err)),
    }
  }
}

impl From<Errno> for CodeRunError {
  fn from(errno: Errno) -> Self {
    CodeRunError::Runtime(errno.to_string())
  }
}

/// Plain I/O errors come from staging unless wrapped otherwise
impl From<std::io::Error> for CodeRunError {
  fn from(err: std::io::Error) -> Self {
    CodeRunError::Staging(err.to_string())
  }
}

impl From<FlexiLoggerError> for CodeRunError {
  fn from(err: FlexiLoggerError) -> Self {
    CodeRunError::Logger(err)
  }
}

impl Error for CodeRunError {}

impl Termination for CodeRunExit {
  fn report(self) -> ExitCode {
    match self {
      CodeRunExit::Ok => ExitCode::SUCCESS,
      CodeRunExit::Failed => ExitCode::FAILURE,
      CodeRunExit::Err(err) => {
        let text = format!("{}", err);
        let text = match text.split_once(": ") {
          Some((prefix, message)) => {
            let is_tty = isatty(STDOUT_FILENO).unwrap_or(false);
            if is_tty {
              format!("\x1b[1m\x1b[91m{}\x1b[39m\x1b[22m  {}", prefix, message)
            } else {
              serde_json::json!({ "ok": false, "type": prefix, "message": message }).to_string()
            }
          }
          None => text,
        };
        eprintln!("{}", text);
        ExitCode::FAILURE
      }
    }
  }
}
