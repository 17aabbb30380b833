//! Content files on disk.
//!
//! A document `posts/hello.mdoc` keeps its sibling assets (the `other`
//! files of a parse or serialize) under `posts/hello/`. Assets in an
//! external directory `d` live under `d/posts/hello/` and are keyed by
//! `posts/hello/<file>`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use relative_path::{RelativePath, RelativePathBuf};

use crate::{
    convert::{ExternalFiles, Files},
    field::SerializedContent,
    models::ContentFile,
};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid content directory: {0}")]
    InvalidContentDir(String),
    #[error("Path is not relative to the content root: {0}")]
    InvalidPath(PathBuf),
}

/// A stored document and the assets found next to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentEntry {
    pub content: Vec<u8>,
    pub other: Files,
    pub external: ExternalFiles,
}

/// Read a document's raw bytes.
pub fn read_content(file: &ContentFile, root: &Path) -> Result<Vec<u8>, IoError> {
    let absolute_path = file.relative_path().to_path(root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read(&absolute_path).map_err(IoError::Io)
}

/// Read a document together with its sibling assets and the assets it owns
/// in each of `directories`.
pub fn read_entry(
    file: &ContentFile,
    root: &Path,
    directories: &[String],
) -> Result<ContentEntry, IoError> {
    let content = read_content(file, root)?;

    let slug = RelativePath::new(file.slug());
    let other = read_tree(&slug.to_path(root), RelativePath::new(""))?;

    let mut external = ExternalFiles::new();
    for directory in directories {
        if external.contains_key(directory) {
            continue;
        }
        let base = RelativePath::new(directory).join(slug);
        let files = read_tree(&base.to_path(root), slug)?;
        external.insert(directory.clone(), files);
    }

    Ok(ContentEntry {
        content,
        other,
        external,
    })
}

/// Files under `dir`, keyed by `prefix/<path inside dir>`. A missing
/// directory holds no files.
fn read_tree(dir: &Path, prefix: &RelativePath) -> Result<Files, IoError> {
    let mut files = Files::new();
    if dir.is_dir() {
        read_tree_recursive(dir, prefix, &mut files)?;
    }
    Ok(files)
}

fn read_tree_recursive(dir: &Path, prefix: &RelativePath, files: &mut Files) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let key = prefix.join(&*name.to_string_lossy());
        if path.is_dir() {
            read_tree_recursive(&path, &key, files)?;
        } else {
            files.insert(key.into_string(), fs::read(&path)?);
        }
    }
    Ok(())
}

/// Write serialized output: the document text, its sibling assets and its
/// external assets. Parent directories are created as needed.
pub fn write_content(
    file: &ContentFile,
    root: &Path,
    serialized: &SerializedContent,
) -> Result<(), IoError> {
    write_bytes(&file.relative_path().to_path(root), &serialized.content)?;

    let slug = RelativePath::new(file.slug());
    for (name, bytes) in &serialized.other {
        write_bytes(&slug.join(name).to_path(root), bytes)?;
    }
    for (directory, files) in &serialized.external {
        for (key, bytes) in files {
            write_bytes(&RelativePath::new(directory).join(key).to_path(root), bytes)?;
        }
    }
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).map_err(IoError::Io)
}

/// Find every content file with `extension` (leading dot included) under
/// `root`, sorted by path.
pub fn scan_content_files(root: &Path, extension: &str) -> Result<Vec<ContentFile>, IoError> {
    if !root.is_dir() {
        return Err(IoError::InvalidContentDir(
            "content directory not found".to_string(),
        ));
    }

    let mut paths = Vec::new();
    scan_directory_recursive(root, extension, &mut paths)?;
    paths.sort();

    let files = paths
        .into_iter()
        .map(|path| {
            let relative = path
                .strip_prefix(root)
                .ok()
                .and_then(|rel| RelativePathBuf::from_path(rel).ok())
                .ok_or_else(|| IoError::InvalidPath(path.clone()))?;
            Ok(ContentFile::new(relative, extension))
        })
        .collect::<Result<Vec<_>, IoError>>()?;

    log::debug!(
        "Found {} {extension} files under {}",
        files.len(),
        root.display()
    );
    Ok(files)
}

fn scan_directory_recursive(
    dir: &Path,
    extension: &str,
    files: &mut Vec<PathBuf>,
) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_directory_recursive(&path, extension, files)?;
        } else if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(extension) && name.len() > extension.len())
        {
            files.push(path);
        }
    }
    Ok(())
}
