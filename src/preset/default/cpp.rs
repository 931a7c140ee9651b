use lazy_static::lazy_static;

use crate::preset::default::DEFAULT_IMAGE;
use crate::preset::LanguageSpec;

lazy_static! {
  pub(crate) static ref CPP_PRESET: LanguageSpec = LanguageSpec::new(
    "cpp",
    "program.cpp",
    DEFAULT_IMAGE,
    "g++ ${source} -o ${workdir}/a.out && ${workdir}/a.out"
  );
}
