use std::path::{Path, PathBuf};

use elab_typing::{FloatKind, LIBRARY_MAX_FLOAT, LIBRARY_MAX_INTEGER_WIDTH};
use serde::{Deserialize, Serialize};

/// Knobs for one elaboration run, usually read from an `elab.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElaborationOptions {
    /// Allows bridging restrictions between native and foreign types.
    #[serde(default = "default_true")]
    pub foreign_interop: bool,
    #[serde(default = "default_max_integer_width")]
    pub max_builtin_integer_width: u32,
    #[serde(default = "default_max_float")]
    pub max_builtin_float: FloatKind,
    /// Binds arguments positionally, ignoring labels, when the callee takes a single `Any`.
    #[serde(default)]
    pub legacy_ignore_labels_for_single_any: bool,
    /// Accepts mislabeled arguments with a warning instead of failing.
    #[serde(default)]
    pub allow_label_mismatch: bool,
    #[serde(default = "default_true")]
    pub dedupe_diagnostics: bool,
    /// Value `#file` materializes to.
    #[serde(default = "default_source_name")]
    pub source_name: String,
}

impl Default for ElaborationOptions {
    fn default() -> Self {
        Self {
            foreign_interop: default_true(),
            max_builtin_integer_width: default_max_integer_width(),
            max_builtin_float: default_max_float(),
            legacy_ignore_labels_for_single_any: false,
            allow_label_mismatch: false,
            dedupe_diagnostics: default_true(),
            source_name: default_source_name(),
        }
    }
}

impl ElaborationOptions {
    /// The integer payload width literals are lowered with, capped by what the library accepts.
    pub fn integer_literal_width(&self) -> u32 {
        self.max_builtin_integer_width.min(LIBRARY_MAX_INTEGER_WIDTH)
    }

    pub fn float_literal_kind(&self) -> FloatKind {
        self.max_builtin_float.min(LIBRARY_MAX_FLOAT)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_integer_width() -> u32 {
    LIBRARY_MAX_INTEGER_WIDTH
}

fn default_max_float() -> FloatKind {
    LIBRARY_MAX_FLOAT
}

fn default_source_name() -> String {
    "<input>".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

pub fn read_options(path: &Path) -> Result<ElaborationOptions, OptionsError> {
    let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_options(&text).map_err(|message| OptionsError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn parse_options(text: &str) -> Result<ElaborationOptions, String> {
    toml::from_str(text).map_err(|err| err.to_string())
}
