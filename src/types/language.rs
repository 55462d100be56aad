//! Supported source languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MuninnError, Result};

/// Source language of a completion request.
///
/// Closed set: requests naming anything else are rejected before they reach
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Java,
    Cpp,
    Csharp,
    Go,
    Rust,
}

impl Language {
    const ALL: [Language; 8] = [
        Language::Python,
        Language::Javascript,
        Language::Typescript,
        Language::Java,
        Language::Cpp,
        Language::Csharp,
        Language::Go,
        Language::Rust,
    ];

    /// Every supported language, in declaration order.
    pub fn all() -> &'static [Language] {
        &Self::ALL
    }

    /// Lowercase wire name (`"python"`, `"cpp"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Csharp => "csharp",
            Self::Go => "go",
            Self::Rust => "rust",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = MuninnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| MuninnError::InvalidRequest(format!("unsupported language: {s}")))
    }
}
