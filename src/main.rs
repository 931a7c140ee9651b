use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};
use log::info;

use coderun::utils::{default_format, stdout_is_tty, MemoryLimitType, TimeLimitType};
use coderun::{
  CodeRunError, CodeRunExit, ContainerRuntime, Engine, EngineBuilder, ExecutionOutcome,
  ExecutionRequest,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[arg(
    long,
    global = true,
    help = "Staging directory (default: $CODERUN_STAGING_DIR or <tmp>/coderun)"
  )]
  staging: Option<PathBuf>,

  #[arg(
    long,
    global = true,
    help = "Container runtime command (default: $CODERUN_RUNTIME or docker)"
  )]
  runtime: Option<String>,

  #[arg(long, global = true, default_value_t = false)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  #[command(about = "Run a source file in the sandbox")]
  Run {
    #[arg(help = "Source file")]
    submission: PathBuf,

    #[arg(short, long, help = "Language tag (default: detect from file extension)")]
    language: Option<String>,

    #[arg(long, help = "File fed to standard input")]
    stdin: Option<PathBuf>,

    #[arg(short, long, help = "Deadline (unit: ms)")]
    time: Option<TimeLimitType>,

    #[arg(short, long, help = "Memory limit (unit: bytes)")]
    memory: Option<MemoryLimitType>,

    #[arg(long, help = "CPU share, e.g. 0.5")]
    cpus: Option<f64>,

    #[arg(long, help = "The max number of processes")]
    process: Option<u64>,
  },

  #[command(about = "Remove sandbox instances and workspaces left by a crash")]
  Reap,

  #[command(about = "List supported languages")]
  Languages,
}

fn setup_logger(verbose: bool) -> Result<LoggerHandle, CodeRunError> {
  let spec = if verbose { "coderun=debug" } else { "coderun=info" };
  let handle = Logger::try_with_str(spec)?
    .log_to_file(
      FileSpec::default()
        .directory(env::var("LOG_DIR").unwrap_or("./logs/".into()))
        .basename("coderun")
        .discriminant(format!("{}", chrono::offset::Local::now().format("%Y-%m-%d")))
        .suppress_timestamp(),
    )
    .append()
    .duplicate_to_stderr(Duplicate::Warn)
    .format_for_files(default_format)
    .start()?;
  Ok(handle)
}

fn read_text(path: &Path) -> Result<String, CodeRunError> {
  fs::read_to_string(path)
    .map_err(|err| CodeRunError::cli(format!("Read {} fails: {}", path.to_string_lossy(), err)))
}

fn report_human(outcome: &ExecutionOutcome) {
  if let ExecutionOutcome::Completed { output } = outcome {
    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
      println!();
    }
  }
  let color = if outcome.is_completed() { 2 } else { 1 };
  println!();
  println!("\x1b[1mOutcome\x1b[22m    \x1b[9{}m{}\x1b[39m", color, outcome);
}

fn report_json(outcome: &ExecutionOutcome) {
  let report = serde_json::json!({
    "ok": outcome.is_completed(),
    "outcome": outcome,
  });
  println!(
    "{}",
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string())
  );
}

fn run(
  builder: EngineBuilder,
  submission: PathBuf,
  language: Option<String>,
  stdin: Option<PathBuf>,
) -> Result<bool, CodeRunError> {
  let engine = builder.build()?;

  let language = match language {
    Some(language) => language,
    None => engine
      .registry()
      .detect(None, &submission)
      .map(|spec| spec.tag().to_string())
      .ok_or(CodeRunError::cli("Can not detect submission language"))?,
  };
  let stdin = stdin.as_deref().map(read_text).transpose()?;
  let request = ExecutionRequest::new(language, read_text(&submission)?).set_stdin(stdin);

  let outcome = engine.execute(&request)?;
  if stdout_is_tty() {
    report_human(&outcome);
  } else {
    report_json(&outcome);
  }
  Ok(outcome.is_completed())
}

fn start(cli: Cli) -> Result<bool, CodeRunError> {
  let _logger = setup_logger(cli.verbose)?;
  info!("Start running coderun");

  let runtime = cli.runtime.as_deref().map(ContainerRuntime::parse).transpose()?;
  let builder = Engine::builder()
    .set_runtime(runtime)
    .set_staging_root(cli.staging);

  let ok = match cli.command {
    Commands::Run {
      submission,
      language,
      stdin,
      time,
      memory,
      cpus,
      process,
    } => {
      let builder = builder
        .set_time_limit(time)
        .set_memory_limit(memory)
        .set_cpus(cpus)
        .set_process(process);
      run(builder, submission, language, stdin)?
    }
    Commands::Reap => {
      let report = builder.build()?.reap_orphans();
      println!(
        "Removed {} instances and {} workspaces ({} failures)",
        report.instances, report.workspaces, report.failures
      );
      report.failures == 0
    }
    Commands::Languages => {
      let engine = builder.build()?;
      let registry = engine.registry();
      for tag in registry.tags() {
        let spec = registry.resolve(tag)?;
        println!("{:<6} {:<14} {}", tag, spec.entry_filename(), spec.image());
      }
      true
    }
  };

  info!("Running coderun finished");
  Ok(ok)
}

fn main() -> CodeRunExit {
  let cli = Cli::parse();
  match start(cli) {
    Ok(true) => CodeRunExit::Ok,
    Ok(false) => CodeRunExit::Failed,
    Err(err) => CodeRunExit::Err(err),
  }
}
