//! Implementation of `buildcc objtags`.

use std::path::Path;

use walkdir::WalkDir;

use crate::core::errors::{BuildError, BuildResult};
use crate::core::language::Language;

/// Extensions that get a tag, compared case-insensitively.
const EXTENSIONS: [&str; 4] = ["c", "cc", "cpp", "c++"];

/// One `<object>` element for every C or C++ file directly inside `dir`,
/// sorted by file name.
pub fn object_tags(dir: &Path) -> BuildResult<Vec<String>> {
    let mut tags = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let message = format!("failed to read `{}`", dir.display());
            match e.into_io_error() {
                Some(io) => BuildError::io(message, io),
                None => BuildError::io(message, std::io::Error::other("directory loop")),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let lang = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| EXTENSIONS.contains(&e.as_str()))
            .and_then(|e| Language::from_extension(&e));

        if let Some(lang) = lang {
            tags.push(format!(
                "<object lang=\"{}\" src=\"{}\"/>",
                lang.as_tag(),
                path.display()
            ));
        }
    }

    Ok(tags)
}
