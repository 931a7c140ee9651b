#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use flexi_logger::Logger;
use tempfile::{tempdir, TempDir};

use coderun::{ContainerRuntime, Engine, EngineBuilder, LanguageRegistry, LanguageSpec};

static INIT: Once = Once::new();

pub fn setup() {
  INIT.call_once(|| {
    Logger::try_with_str("coderun=debug,info")
      .unwrap()
      .start()
      .unwrap();
  });
}

/// Stand-in for a container runtime CLI.
///
/// `run` maps `--volume` destinations back to host paths and runs the shell
/// command on the host, `rm` and `run` log instance names, `ps` prints the
/// `orphans` file, image `missing-image` fails with status 125.
const STUB_RUNTIME: &str = r#"#!/bin/sh
state="$(dirname "$0")"
action="$1"
shift
case "$action" in
  run)
    name=""
    image=""
    mounts=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --rm) shift ;;
        --name) name="$2"; shift 2 ;;
        --volume) mounts="$mounts $2"; shift 2 ;;
        --*) shift 2 ;;
        *) image="$1"; shift; break ;;
      esac
    done
    echo "$name" >> "$state/started"
    if [ "$image" = "missing-image" ]; then
      echo "Unable to find image '$image:latest' locally" >&2
      exit 125
    fi
    script="$3"
    for mount in $mounts; do
      src="${mount%%:*}"
      rest="${mount#*:}"
      dst="${rest%%:*}"
      script=$(printf '%s' "$script" | sed "s|$dst|$src|g")
    done
    sh -c "$script"
    ;;
  rm)
    shift
    echo "$1" >> "$state/removed"
    echo "$1"
    ;;
  ps)
    if [ -f "$state/orphans" ]; then
      cat "$state/orphans"
    fi
    ;;
  version)
    echo "stub 1.0"
    ;;
  *)
    echo "unknown command $action" >&2
    exit 1
    ;;
esac
"#;

pub struct StubRuntime {
  dir: TempDir,
}

impl StubRuntime {
  pub fn new() -> Self {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("stub.sh"), STUB_RUNTIME).unwrap();
    StubRuntime { dir }
  }

  pub fn runtime(&self) -> ContainerRuntime {
    let script = self.dir.path().join("stub.sh");
    ContainerRuntime::new(vec!["sh".to_string(), script.to_string_lossy().to_string()]).unwrap()
  }

  fn lines(&self, file: &str) -> Vec<String> {
    fs::read_to_string(self.dir.path().join(file))
      .unwrap_or_default()
      .lines()
      .map(|l| l.to_string())
      .filter(|l| !l.is_empty())
      .collect()
  }

  /// Instance names passed to `run`
  pub fn started(&self) -> Vec<String> {
    self.lines("started")
  }

  /// Instance names passed to `rm -f`
  pub fn removed(&self) -> Vec<String> {
    self.lines("removed")
  }

  pub fn set_orphans(&self, names: &[&str]) {
    fs::write(self.dir.path().join("orphans"), names.join("\n") + "\n").unwrap();
  }
}

/// `sh` scripts run directly by the stub runtime
pub fn shell_language() -> LanguageSpec {
  LanguageSpec::new("sh", "main.sh", "stub-image", "sh ${source}")
}

pub fn stub_registry() -> LanguageRegistry {
  LanguageRegistry::empty()
    .with(shell_language())
    .with(LanguageSpec::new("broken", "main.sh", "missing-image", "sh ${source}"))
}

pub fn stub_builder(stub: &StubRuntime, staging: &Path) -> EngineBuilder {
  Engine::builder()
    .registry(stub_registry())
    .runtime(stub.runtime())
    .staging_root(staging)
    .teardown_timeout(Duration::from_secs(5))
}

/// Entries left under a staging root
pub fn leftovers(root: &Path) -> Vec<PathBuf> {
  match fs::read_dir(root) {
    Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
    Err(_) => vec![],
  }
}
