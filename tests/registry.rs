use std::path::Path;

use tempfile::tempdir;

use coderun::{
  CodeRunError, Engine, ExecutionOutcome, ExecutionRequest, LanguageRegistry, LanguageSpec,
};

mod common;

#[test]
fn it_should_resolve_default_languages() {
  let registry = LanguageRegistry::default();
  assert_eq!(registry.tags(), vec!["cpp", "js", "py"]);

  for tag in registry.tags() {
    let spec = registry.resolve(tag).unwrap();
    assert_eq!(spec.tag(), tag);
    assert!(!spec.entry_filename().is_empty());
    assert!(!spec.image().is_empty());
  }

  assert_eq!(registry.resolve("cpp").unwrap().entry_filename(), "program.cpp");
  assert_eq!(registry.resolve("py").unwrap().entry_filename(), "script.py");
  assert_eq!(registry.resolve("js").unwrap().entry_filename(), "app.js");
}

#[test]
fn it_should_resolve_aliases() {
  let registry = LanguageRegistry::default();
  assert_eq!(registry.resolve("c++").unwrap().tag(), "cpp");
  assert_eq!(registry.resolve("Python3").unwrap().tag(), "py");
  assert_eq!(registry.resolve(" node ").unwrap().tag(), "js");
}

#[test]
fn it_should_reject_unknown_language() {
  let registry = LanguageRegistry::default();
  match registry.resolve("cobol") {
    Err(CodeRunError::UnsupportedLanguage(language)) => assert_eq!(language, "cobol"),
    other => panic!("unexpected {:?}", other.map(|s| s.tag().to_string())),
  }
}

#[test]
fn it_should_not_stage_unsupported_language() {
  common::setup();

  let stub = common::StubRuntime::new();
  let staging = tempdir().unwrap();
  let engine = common::stub_builder(&stub, staging.path()).build().unwrap();

  let outcome = engine
    .execute(&ExecutionRequest::new("cobol", "DISPLAY 'HI'."))
    .unwrap();
  assert_eq!(
    outcome,
    ExecutionOutcome::UnsupportedLanguage {
      language: "cobol".to_string()
    }
  );
  assert!(common::leftovers(staging.path()).is_empty());
  assert!(stub.started().is_empty());
  assert!(stub.removed().is_empty());
}

#[test]
fn it_should_render_run_commands() {
  let registry = LanguageRegistry::default();
  assert_eq!(
    registry.resolve("cpp").unwrap().run_command("/app"),
    "g++ /app/program.cpp -o /app/a.out && /app/a.out"
  );
  assert_eq!(
    registry.resolve("py").unwrap().run_command("/app/"),
    "python3 /app/script.py"
  );
  assert_eq!(
    registry.resolve("js").unwrap().run_command("/sandbox"),
    "node /sandbox/app.js"
  );
}

#[test]
fn it_should_register_languages() {
  let mut registry = LanguageRegistry::default();
  let ruby = LanguageSpec::new("rb", "main.rb", "ruby:3-slim", "ruby ${source}");
  assert!(registry.register(ruby.clone()).is_none());
  assert_eq!(registry.resolve("rb").unwrap(), &ruby);

  let python = registry.resolve("py").unwrap().clone();
  let replaced = registry.register(python.with_image("python:3.12-slim"));
  assert_eq!(replaced.unwrap().image(), "code-runner");
  assert_eq!(registry.resolve("py").unwrap().image(), "python:3.12-slim");
  assert_eq!(registry.len(), 4);

  // Defaults are untouched
  assert_eq!(LanguageRegistry::default().resolve("py").unwrap().image(), "code-runner");
  assert!(!LanguageRegistry::default().contains("rb"));
}

#[test]
fn it_should_detect_language() {
  let registry = LanguageRegistry::default();
  assert_eq!(
    registry.detect(None, Path::new("solution.cpp")).unwrap().tag(),
    "cpp"
  );
  assert_eq!(registry.detect(None, Path::new("main.py")).unwrap().tag(), "py");
  assert_eq!(registry.detect(Some("js"), Path::new("main.py")).unwrap().tag(), "js");
  assert!(registry.detect(None, Path::new("Makefile")).is_none());
  assert!(registry.detect(None, Path::new("main.rs")).is_none());
}

#[test]
fn it_should_carry_registry_into_engine() {
  let staging = tempdir().unwrap();
  let engine = Engine::builder()
    .staging_root(staging.path())
    .language(LanguageSpec::new("rb", "main.rb", "ruby:3-slim", "ruby ${source}"))
    .build()
    .unwrap();
  assert_eq!(engine.registry().tags(), vec!["cpp", "js", "py", "rb"]);
}
