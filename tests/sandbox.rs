use tempfile::tempdir;

use coderun::sandbox::{SandboxPolicy, SandboxProvisioner, DEFAULT_WORKDIR};
use coderun::workspace::WorkspaceManager;
use coderun::{ContainerRuntime, LanguageRegistry};

mod common;

const HOSTILE_SOURCE: &str = "import os\nos.system('rm -rf / $(whoami) `id`')\n";

#[test]
fn it_should_compose_locked_down_invocation() {
  let root = tempdir().unwrap();
  let manager = WorkspaceManager::new(root.path()).unwrap();
  let registry = LanguageRegistry::default();
  let spec = registry.resolve("py").unwrap();
  let workspace = manager.stage(spec, HOSTILE_SOURCE, None).unwrap();

  let provisioner = SandboxProvisioner::new(ContainerRuntime::docker(), DEFAULT_WORKDIR);
  let invocation = provisioner.build(spec, &workspace, &SandboxPolicy::default());

  assert_eq!(invocation.program(), "docker");
  assert_eq!(invocation.args()[0], "run");
  assert!(invocation.args().iter().any(|a| a == "--rm"));
  assert_eq!(invocation.instance_name(), workspace.instance_name());
  assert_eq!(invocation.flag_value("--name"), Some(workspace.instance_name()));
  assert!(invocation.instance_name().contains(workspace.id()));

  assert_eq!(invocation.flag_value("--cpus"), Some("0.5"));
  assert_eq!(invocation.flag_value("--memory"), Some("134217728"));
  assert_eq!(invocation.flag_value("--memory-swap"), Some("134217728"));
  assert_eq!(invocation.flag_value("--pids-limit"), Some("30"));
  assert_eq!(invocation.flag_value("--network"), Some("none"));
  assert_eq!(invocation.flag_value("--security-opt"), Some("no-new-privileges"));
  assert_eq!(invocation.flag_value("--cap-drop"), Some("ALL"));
  assert_eq!(invocation.flag_value("--workdir"), Some("/app"));

  let volumes = invocation
    .args()
    .windows(2)
    .filter(|w| w[0] == "--volume")
    .map(|w| w[1].clone())
    .collect::<Vec<String>>();
  assert_eq!(
    volumes,
    vec![format!("{}:/app/script.py:ro", workspace.source_path().display())]
  );

  let tail = &invocation.args()[invocation.args().len() - 4..];
  assert_eq!(tail[0], "code-runner");
  assert_eq!(tail[1], "sh");
  assert_eq!(tail[2], "-c");
  assert_eq!(
    tail[3],
    "{ python3 /app/script.py; } < /dev/null; s=$?; [ \"$s\" -ne 125 ] || s=1; exit \"$s\""
  );

  // Source text only reaches the sandbox through the mount
  assert!(invocation.args().iter().all(|a| !a.contains("rm -rf")));

  manager.dispose(&workspace);
}

#[test]
fn it_should_mount_and_redirect_stdin() {
  let root = tempdir().unwrap();
  let manager = WorkspaceManager::new(root.path()).unwrap();
  let registry = LanguageRegistry::default();
  let spec = registry.resolve("cpp").unwrap();
  let workspace = manager
    .stage(spec, "int main() {}", Some("$(reboot)\n"))
    .unwrap();

  let provisioner = SandboxProvisioner::new(ContainerRuntime::docker(), "/sandbox");
  let invocation = provisioner.build(spec, &workspace, &SandboxPolicy::default());

  let mounts = provisioner.mounts(spec, &workspace);
  assert_eq!(mounts.len(), 2);
  assert!(mounts.iter().all(|m| m.read_only()));
  assert_eq!(mounts[1].src(), workspace.stdin_path().unwrap());
  assert_eq!(mounts[1].dst().to_string_lossy(), "/sandbox/input.txt");

  let expected = "{ g++ /sandbox/program.cpp -o /sandbox/a.out && /sandbox/a.out; } \
                  < /sandbox/input.txt;";
  assert!(invocation.args().last().unwrap().starts_with(expected));
  assert!(invocation.args().iter().all(|a| !a.contains("reboot")));

  manager.dispose(&workspace);
}

#[test]
fn it_should_apply_policy_and_runtime_prefix() {
  let root = tempdir().unwrap();
  let manager = WorkspaceManager::new(root.path()).unwrap();
  let spec = common::shell_language();
  let workspace = manager.stage(&spec, "echo hi", None).unwrap();

  let runtime = ContainerRuntime::parse("sudo -n docker").unwrap();
  let provisioner = SandboxProvisioner::new(runtime, "/app");
  let policy = SandboxPolicy {
    cpus: 1.5,
    memory: 64 * 1024 * 1024,
    processes: 8,
  };
  let invocation = provisioner.build(&spec, &workspace, &policy);

  assert_eq!(invocation.program(), "sudo");
  assert_eq!(&invocation.args()[..3], &["-n", "docker", "run"]);
  assert_eq!(invocation.flag_value("--cpus"), Some("1.5"));
  assert_eq!(invocation.flag_value("--memory"), Some("67108864"));
  assert_eq!(invocation.flag_value("--pids-limit"), Some("8"));
  assert_eq!(
    invocation.flag_value("--label"),
    Some(format!("coderun.workspace={}", workspace.id()).as_str())
  );

  manager.dispose(&workspace);
}

#[test]
fn it_should_keep_exit_status_without_failure_status() {
  let root = tempdir().unwrap();
  let manager = WorkspaceManager::new(root.path()).unwrap();
  let spec = common::shell_language();
  let workspace = manager.stage(&spec, "exit 125", None).unwrap();

  let runtime = ContainerRuntime::parse("podman").unwrap().failure_status(None);
  let provisioner = SandboxProvisioner::new(runtime, DEFAULT_WORKDIR);
  assert_eq!(
    provisioner.shell_command(&spec, &workspace),
    "{ sh /app/main.sh; } < /dev/null"
  );

  let runtime = ContainerRuntime::docker().failure_status(Some(99));
  let provisioner = SandboxProvisioner::new(runtime, DEFAULT_WORKDIR);
  assert!(provisioner
    .shell_command(&spec, &workspace)
    .contains("[ \"$s\" -ne 99 ] || s=1"));

  manager.dispose(&workspace);
}

#[test]
fn it_should_reject_empty_runtime() {
  assert!(ContainerRuntime::parse("   ").is_err());
  assert!(ContainerRuntime::new(Vec::<String>::new()).is_err());
}
