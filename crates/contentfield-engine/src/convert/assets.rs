//! Image bytes that travel alongside document text.
//!
//! Without an image directory, images sit next to the document and are
//! keyed by file name in `other`. With a directory, they live under
//! `external[directory]`, keyed by `{slug}/{file}` (or `{file}` when there is
//! no slug), and the document refers to them through the public path.

use std::collections::BTreeMap;

use crate::{
    paths::{file_name, join},
    schema::ImageConfig,
};

/// Files keyed by path relative to the document.
pub type Files = BTreeMap<String, Vec<u8>>;

/// Files grouped by the directory they belong to.
pub type ExternalFiles = BTreeMap<String, Files>;

/// Assets available while parsing.
#[derive(Debug, Clone, Copy)]
pub struct AssetSource<'a> {
    pub other: &'a Files,
    pub external: &'a ExternalFiles,
    pub slug: Option<&'a str>,
}

/// Assets produced while serializing.
#[derive(Debug, Default)]
pub struct AssetSink {
    pub other: Files,
    pub external: ExternalFiles,
}

/// The URL prefix images in `directory` are referenced by.
fn public_prefix(config: &ImageConfig, directory: &str) -> String {
    let mut prefix = config
        .public_path
        .clone()
        .unwrap_or_else(|| format!("/{directory}/"));
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

fn slugged(slug: Option<&str>, filename: &str) -> String {
    match slug {
        Some(slug) if !slug.is_empty() => join(slug, filename),
        _ => filename.to_string(),
    }
}

/// Look up the bytes an image `src` refers to. Returns the file name and
/// bytes, or `None` when the source is not one of the document's assets.
pub fn resolve_image(
    config: &ImageConfig,
    src: &str,
    assets: &AssetSource<'_>,
) -> Option<(String, Vec<u8>)> {
    let found = match config.directory() {
        Some(directory) => {
            let key = src.strip_prefix(&public_prefix(config, &directory))?;
            assets
                .external
                .get(&directory)
                .and_then(|files| files.get(key))
                .map(|bytes| (file_name(key).to_string(), bytes.clone()))
        }
        None => {
            let key = src.strip_prefix("./").unwrap_or(src);
            assets
                .other
                .get(key)
                .map(|bytes| (file_name(key).to_string(), bytes.clone()))
        }
    };
    if found.is_none() && !src.contains("://") {
        log::warn!("Image {src} is not among the document's assets");
    }
    found
}

/// Store image bytes and return the `src` that refers to them.
pub fn place_image(
    config: &ImageConfig,
    filename: &str,
    data: Vec<u8>,
    slug: Option<&str>,
    sink: &mut AssetSink,
) -> String {
    match config.directory() {
        Some(directory) => {
            let key = slugged(slug, filename);
            let src = format!("{}{key}", public_prefix(config, &directory));
            sink.external.entry(directory).or_default().insert(key, data);
            src
        }
        None => {
            sink.other.insert(filename.to_string(), data);
            filename.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_directory(public_path: Option<&str>) -> ImageConfig {
        ImageConfig {
            directory: Some("./public/images/".to_string()),
            public_path: public_path.map(str::to_string),
        }
    }

    #[test]
    fn test_directory_images_are_keyed_by_slug() {
        let config = with_directory(Some("/images"));
        let mut sink = AssetSink::default();

        let src = place_image(&config, "cat.png", vec![1, 2], Some("posts/hello"), &mut sink);

        assert_eq!(src, "/images/posts/hello/cat.png");
        assert_eq!(
            sink.external["public/images"]["posts/hello/cat.png"],
            vec![1, 2]
        );
        assert!(sink.other.is_empty());
    }

    #[test]
    fn test_default_public_path_mirrors_directory() {
        let config = with_directory(None);
        let mut sink = AssetSink::default();
        assert_eq!(
            place_image(&config, "a.png", vec![], None, &mut sink),
            "/public/images/a.png"
        );
    }

    #[test]
    fn test_resolve_mirrors_place() {
        let config = with_directory(Some("/images/"));
        let mut sink = AssetSink::default();
        let src = place_image(&config, "cat.png", vec![9], Some("post"), &mut sink);
        let other = Files::new();
        let source = AssetSource {
            other: &other,
            external: &sink.external,
            slug: Some("post"),
        };

        let resolved = resolve_image(&config, &src, &source);

        assert_eq!(resolved, Some(("cat.png".to_string(), vec![9])));
    }

    #[test]
    fn test_images_without_directory_live_in_other() {
        let config = ImageConfig::default();
        let mut sink = AssetSink::default();
        let src = place_image(&config, "dog.jpg", vec![7], Some("post"), &mut sink);
        assert_eq!(src, "dog.jpg");

        let external = ExternalFiles::new();
        let source = AssetSource {
            other: &sink.other,
            external: &external,
            slug: None,
        };
        assert_eq!(
            resolve_image(&config, "./dog.jpg", &source),
            Some(("dog.jpg".to_string(), vec![7]))
        );
    }

    #[test]
    fn test_remote_images_do_not_resolve() {
        let other = Files::new();
        let external = ExternalFiles::new();
        let source = AssetSource {
            other: &other,
            external: &external,
            slug: None,
        };
        assert_eq!(
            resolve_image(&ImageConfig::default(), "https://example.com/x.png", &source),
            None
        );
    }
}
