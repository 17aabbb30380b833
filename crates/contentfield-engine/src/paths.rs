use std::sync::LazyLock;

use regex::Regex;
use relative_path::RelativePath;

static LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.?/+").expect("valid regex"));
static TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/*$").expect("valid regex"));

/// Normalize a configured directory into the repository-relative form used
/// as a directory key: no leading `/` or `./`, no trailing slashes.
pub fn fix_path(path: &str) -> String {
    let path = LEADING.replace(path, "");
    TRAILING.replace(&path, "").into_owned()
}

/// Join a normalized directory with a file name inside it.
pub fn join(directory: &str, file: &str) -> String {
    if directory.is_empty() {
        return file.to_string();
    }
    RelativePath::new(directory)
        .join_normalized(file)
        .into_string()
}

/// Final path segment of a `/`-separated source reference.
pub fn file_name(src: &str) -> &str {
    RelativePath::new(src).file_name().unwrap_or(src)
}
