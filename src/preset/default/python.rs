use lazy_static::lazy_static;

use crate::preset::default::DEFAULT_IMAGE;
use crate::preset::LanguageSpec;

lazy_static! {
  pub(crate) static ref PYTHON_PRESET: LanguageSpec =
    LanguageSpec::new("py", "script.py", DEFAULT_IMAGE, "python3 ${source}");
}
