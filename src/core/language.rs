//! Source languages understood by the compiler backends.

use serde::{Deserialize, Serialize};

/// Source language of an object or binary task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C language (default)
    #[default]
    C,
    /// C++ language
    #[serde(rename = "cpp", alias = "cxx", alias = "c++")]
    Cxx,
}

impl Language {
    /// The tag used for this language in build descriptions (`lang="..."`).
    pub fn as_tag(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "cpp",
        }
    }

    /// Guess the language from a file extension, case-insensitively.
    ///
    /// Headers and unknown extensions return `None`.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Some(Language::C),
            "cc" | "cpp" | "c++" | "cxx" => Some(Language::Cxx),
            _ => None,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = LanguageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" | "C" => Ok(Language::C),
            "cpp" | "cxx" | "c++" | "C++" => Ok(Language::Cxx),
            _ => Err(LanguageParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Error returned when parsing an unknown language tag.
#[derive(Debug, Clone)]
pub struct LanguageParseError(pub String);

impl std::fmt::Display for LanguageParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid language '{}', valid values: c, cpp", self.0)
    }
}

impl std::error::Error for LanguageParseError {}
