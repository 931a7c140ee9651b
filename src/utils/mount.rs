use std::path::{Path, PathBuf};

/// Bind mount of a host file into the sandbox, read-only unless stated otherwise
#[derive(Debug, Clone)]
pub struct MountPoint {
  write: bool,
  src: PathBuf,
  dst: PathBuf,
}

impl MountPoint {
  pub fn read<SP: Into<PathBuf>, DP: Into<PathBuf>>(src: SP, dst: DP) -> Self {
    MountPoint {
      write: false,
      src: src.into(),
      dst: dst.into(),
    }
  }

  pub fn read_only(&self) -> bool {
    !self.write
  }

  pub fn src(&self) -> &Path {
    &self.src
  }

  pub fn dst(&self) -> &Path {
    &self.dst
  }

  /// `src:dst[:ro]` as accepted by `--volume`
  pub fn to_volume(&self) -> String {
    let mut volume = format!("{}:{}", self.src.to_string_lossy(), self.dst.to_string_lossy());
    if self.read_only() {
      volume.push_str(":ro");
    }
    volume
  }
}
