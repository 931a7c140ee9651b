use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use path_absolutize::Absolutize;
use remove_dir_all::remove_dir_all;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::CodeRunError;
use crate::preset::LanguageSpec;

/// File name of the staged standard input
pub const STDIN_FILENAME: &str = "input.txt";

/// Prefix of every sandbox instance name
pub const INSTANCE_PREFIX: &str = "code-runner-";

/// Staged files of one request
///
/// Owned by exactly one request; the id is embedded in the directory name and
/// in the sandbox instance name.
#[derive(Debug)]
pub struct Workspace {
  id: String,
  dir: PathBuf,
  source_path: PathBuf,
  stdin_path: Option<PathBuf>,
  instance_name: String,
}

impl Workspace {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn source_path(&self) -> &Path {
    &self.source_path
  }

  pub fn stdin_path(&self) -> Option<&Path> {
    self.stdin_path.as_deref()
  }

  pub fn instance_name(&self) -> &str {
    &self.instance_name
  }
}

/// Allocates and removes workspaces under one staging root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
  root: PathBuf,
}

impl WorkspaceManager {
  pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, CodeRunError> {
    let root = root.as_ref().absolutize()?.to_path_buf();
    fs::create_dir_all(&root).map_err(|err| {
      CodeRunError::staging(format!("create staging root {}: {}", root.display(), err))
    })?;
    Ok(WorkspaceManager { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Write the source (and non-empty stdin) of one request into a fresh workspace
  pub fn stage(
    &self,
    spec: &LanguageSpec,
    source: &str,
    stdin: Option<&str>,
  ) -> Result<Workspace, CodeRunError> {
    let id = Uuid::new_v4().simple().to_string();
    let dir = self.root.join(&id);

    // create_dir refuses to reuse an existing directory
    fs::create_dir(&dir)
      .map_err(|err| CodeRunError::staging(format!("create {}: {}", dir.display(), err)))?;

    let mut workspace = Workspace {
      source_path: dir.join(spec.entry_filename()),
      stdin_path: None,
      instance_name: format!("{}{}", INSTANCE_PREFIX, id),
      dir,
      id,
    };

    match Self::write_files(&mut workspace, source, stdin) {
      Ok(_) => {
        debug!(
          "Stage workspace {} ({} bytes source, stdin: {})",
          workspace.id,
          source.len(),
          workspace.stdin_path.is_some()
        );
        Ok(workspace)
      }
      Err(err) => {
        error!("Staging workspace {} fails: {}", workspace.id, err);
        self.dispose(&workspace);
        Err(err)
      }
    }
  }

  fn write_files(
    workspace: &mut Workspace,
    source: &str,
    stdin: Option<&str>,
  ) -> Result<(), CodeRunError> {
    fs::set_permissions(&workspace.dir, Permissions::from_mode(0o755))?;
    write_scoped(&workspace.dir, &workspace.source_path, source)?;
    if let Some(stdin) = stdin.filter(|text| !text.is_empty()) {
      let path = workspace.dir.join(STDIN_FILENAME);
      write_scoped(&workspace.dir, &path, stdin)?;
      workspace.stdin_path = Some(path);
    }
    Ok(())
  }

  /// Remove the staged files and the workspace directory
  ///
  /// Missing files are fine, so disposing twice does nothing the second time.
  /// Failures are logged only.
  pub fn dispose(&self, workspace: &Workspace) {
    let files = [workspace.stdin_path(), Some(workspace.source_path())];
    for path in files.into_iter().flatten() {
      match fs::remove_file(path) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => error!("Fails removing {}: {}", path.display(), err),
      }
    }

    if !workspace.dir.exists() {
      return;
    }
    match remove_dir_all(&workspace.dir) {
      Ok(_) => info!("Remove workspace {}", workspace.id),
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => error!("Fails removing workspace {}: {}", workspace.dir.display(), err),
    }
  }

  /// Workspace directories currently present under the root
  pub fn list(&self) -> Result<Vec<PathBuf>, CodeRunError> {
    let mut dirs = vec![];
    for entry in fs::read_dir(&self.root)? {
      let entry = entry?;
      if entry.file_type()?.is_dir() {
        dirs.push(entry.path());
      }
    }
    Ok(dirs)
  }
}

/// Write through a temp file in `dir` and persist it, so a failed write leaves nothing behind
fn write_scoped(dir: &Path, path: &Path, text: &str) -> Result<(), CodeRunError> {
  let context =
    |err: std::io::Error| CodeRunError::staging(format!("write {}: {}", path.display(), err));

  let mut file = NamedTempFile::new_in(dir).map_err(context)?;
  file.write_all(text.as_bytes()).map_err(context)?;
  file.flush().map_err(context)?;
  file
    .as_file()
    .set_permissions(Permissions::from_mode(0o644))
    .map_err(context)?;
  file.persist(path).map_err(|err| context(err.error))?;
  Ok(())
}
