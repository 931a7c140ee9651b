use crate::utils::render_template;

/// How one language is staged and run inside the sandbox
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSpec {
  tag: String,
  entry_filename: String,
  image: String,
  run_template: String,
}

impl LanguageSpec {
  /// `run_template` is a shell command where `${source}` expands to the mounted
  /// entry file and `${workdir}` to the sandbox working directory
  pub fn new<TS, ES, IS, RS>(tag: TS, entry_filename: ES, image: IS, run_template: RS) -> Self
  where
    TS: Into<String>,
    ES: Into<String>,
    IS: Into<String>,
    RS: Into<String>,
  {
    LanguageSpec {
      tag: tag.into(),
      entry_filename: entry_filename.into(),
      image: image.into(),
      run_template: run_template.into(),
    }
  }

  /// Same language on another sandbox image
  pub fn with_image<IS: Into<String>>(mut self, image: IS) -> Self {
    self.image = image.into();
    self
  }

  pub fn tag(&self) -> &str {
    &self.tag
  }

  pub fn entry_filename(&self) -> &str {
    &self.entry_filename
  }

  pub fn image(&self) -> &str {
    &self.image
  }

  pub fn run_template(&self) -> &str {
    &self.run_template
  }

  /// Path of the entry file as seen from inside the sandbox
  pub fn source_path(&self, workdir: &str) -> String {
    format!("{}/{}", workdir.trim_end_matches('/'), self.entry_filename)
  }

  /// Render the run command for a sandbox whose working directory is `workdir`
  pub fn run_command(&self, workdir: &str) -> String {
    let source = self.source_path(workdir);
    let workdir = workdir.trim_end_matches('/');
    render_template(
      &self.run_template,
      &[("source", source.as_str()), ("workdir", workdir)],
    )
  }
}
