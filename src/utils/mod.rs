use flexi_logger::DeferredNow;
use log::Record;
use nix::libc::STDOUT_FILENO;
use nix::unistd::isatty;

pub mod mount;

pub type TimeLimitType = u64;

pub type MemoryLimitType = u64;

/// A logline-formatter that produces log lines like <br>
/// ```[datetime: INFO] Workspace 3f2a... staged```
pub fn default_format(
  w: &mut dyn std::io::Write,
  now: &mut DeferredNow,
  record: &Record,
) -> Result<(), std::io::Error> {
  write!(
    w,
    "[{}: {:5}] {}",
    now.format("%Y-%m-%d %H:%M:%S"),
    record.level(),
    record.args()
  )
}

pub fn stdout_is_tty() -> bool {
  isatty(STDOUT_FILENO).unwrap_or(false)
}

/// Render `${key}` placeholders of a command template
pub(crate) fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
  let mut text = template.to_string();
  for (key, value) in vars {
    text = text.replace(&format!("${{{}}}", key), value);
  }
  text
}
