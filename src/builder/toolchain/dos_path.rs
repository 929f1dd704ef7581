//! 8.3 short file names for the legacy DOS toolchain.
//!
//! [`mangle`] approximates DOS short-name generation: long basenames become
//! their first six characters plus `~1`. There is no collision pass, so two
//! long names sharing a six character prefix map to the same short name.

use crate::core::errors::{BuildError, BuildResult};

/// Longest basename DOS accepts.
pub const MAX_BASENAME: usize = 8;
/// Longest extension DOS accepts.
pub const MAX_EXTENSION: usize = 3;

/// Convert a `/`-separated path into its DOS form.
///
/// Each segment must contain at most one `.`. Basenames longer than eight
/// characters are shortened to `XXXXXX~1`, extensions are cut to three
/// characters, and everything is upper-cased. Segments are joined with `\`,
/// so an absolute path keeps its leading separator. Never touches the
/// filesystem.
pub fn mangle(path: &str) -> BuildResult<String> {
    let mut segments = Vec::new();

    for segment in path.split('/') {
        if segment.matches('.').count() > 1 {
            return Err(BuildError::IncompatiblePath {
                path: path.to_string(),
                reason: format!("segment `{}` contains more than one `.`", segment),
            });
        }
        segments.push(short_name(segment));
    }

    Ok(segments.join("\\"))
}

fn short_name(segment: &str) -> String {
    let (base, ext) = segment.split_once('.').unwrap_or((segment, ""));

    let mut name = if base.chars().count() > MAX_BASENAME {
        let mut short: String = base.chars().take(MAX_BASENAME - 2).collect();
        short.push_str("~1");
        short
    } else {
        base.to_string()
    };

    let ext: String = ext.chars().take(MAX_EXTENSION).collect();
    if !ext.is_empty() {
        name.push('.');
        name.push_str(&ext);
    }

    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_basename_and_extension() {
        assert_eq!(
            mangle("/a/VeryLongName123.extra").unwrap(),
            "\\A\\VERYLO~1.EXT"
        );
    }

    #[test]
    fn test_two_dots_rejected() {
        let err = mangle("/src/a.b.c").unwrap_err();
        match err {
            BuildError::IncompatiblePath { path, reason } => {
                assert_eq!(path, "/src/a.b.c");
                assert!(reason.contains("a.b.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_dot_has_no_trailing_dot() {
        assert_eq!(mangle("src/makefile").unwrap(), "SRC\\MAKEFILE");
        assert_eq!(mangle("readme.").unwrap(), "README");
    }

    #[test]
    fn test_exactly_eight_is_kept() {
        assert_eq!(mangle("abcdefgh.c").unwrap(), "ABCDEFGH.C");
        assert_eq!(mangle("abcdefghi.c").unwrap(), "ABCDEF~1.C");
    }

    #[test]
    fn test_collisions_are_not_resolved() {
        assert_eq!(
            mangle("program_one.c").unwrap(),
            mangle("program_two.c").unwrap()
        );
    }
}
