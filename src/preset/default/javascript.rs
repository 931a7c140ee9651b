use lazy_static::lazy_static;

use crate::preset::default::DEFAULT_IMAGE;
use crate::preset::LanguageSpec;

lazy_static! {
  pub(crate) static ref JAVASCRIPT_PRESET: LanguageSpec =
    LanguageSpec::new("js", "app.js", DEFAULT_IMAGE, "node ${source}");
}
