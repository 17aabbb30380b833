use relative_path::{RelativePath, RelativePathBuf};

/// A content file addressed relative to the content root.
///
/// The slug is the relative path with the dialect extension removed; it is
/// what parse and serialize use to place per-document assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFile {
    relative_path: RelativePathBuf,
    slug: String,
}

impl ContentFile {
    /// Create a ContentFile from a relative path and the dialect's extension
    /// (with leading dot, e.g. `.mdoc`)
    pub fn new(relative_path: RelativePathBuf, extension: &str) -> Self {
        let slug = {
            let path_str = relative_path.as_str();
            path_str
                .strip_suffix(extension)
                .unwrap_or(path_str)
                .to_string()
        };

        Self {
            relative_path,
            slug,
        }
    }

    pub fn from_relative_str(path: &str, extension: &str) -> Self {
        Self::new(RelativePathBuf::from(path), extension)
    }

    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Display name: the last slug segment
    pub fn display_name(&self) -> &str {
        self.slug.rsplit('/').next().unwrap_or("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_strips_extension() {
        let file = ContentFile::from_relative_str("posts/hello-world.mdoc", ".mdoc");
        assert_eq!(file.slug(), "posts/hello-world");
        assert_eq!(file.display_name(), "hello-world");
        assert_eq!(file.relative_path().as_str(), "posts/hello-world.mdoc");
    }

    #[test]
    fn test_slug_keeps_other_extensions() {
        let file = ContentFile::from_relative_str("notes.md", ".mdx");
        assert_eq!(file.slug(), "notes.md");
    }
}
