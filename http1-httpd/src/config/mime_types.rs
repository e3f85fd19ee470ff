use std::{collections::HashMap, path::Path};

use super::{read_directives, ConfigError, Directive};

/// Content type for files whose extension is not in the table.
pub const DEFAULT_MIME_TYPE: &str = "text/text";

/// Extension to content type table read from a `mime.types` file, where each
/// line is a type followed by the extensions that map to it.
#[derive(Debug, Clone, Default)]
pub struct MimeTypes {
    by_extension: HashMap<String, String>,
}

impl MimeTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_directives(read_directives(path)?))
    }

    pub fn from_directives(directives: impl IntoIterator<Item = Directive>) -> Self {
        let mut mime_types = Self::new();
        for directive in directives {
            for extension in directive.args() {
                mime_types.insert(extension, directive.name());
            }
        }
        mime_types
    }

    pub fn insert(&mut self, extension: &str, mime_type: &str) {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), mime_type.to_owned());
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }

    pub fn lookup(&self, extension: &str) -> Option<&str> {
        self.by_extension
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Content type for a file, falling back to [`DEFAULT_MIME_TYPE`].
    pub fn content_type(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.lookup(extension))
            .unwrap_or(DEFAULT_MIME_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::tokenizer::split_tokens;

    fn table() -> MimeTypes {
        MimeTypes::from_directives(
            ["text/html html htm", "image/png png", "application/x-empty"]
                .iter()
                .enumerate()
                .map(|(i, line)| Directive {
                    line: i + 1,
                    tokens: split_tokens(line),
                }),
        )
    }

    #[test]
    fn test_lookup() {
        let mime_types = table();
        assert_eq!(mime_types.len(), 3);
        assert_eq!(mime_types.lookup("html"), Some("text/html"));
        assert_eq!(mime_types.lookup("HTM"), Some("text/html"));
        assert_eq!(mime_types.lookup("gif"), None);
    }

    #[test]
    fn test_content_type() {
        let mime_types = table();
        assert_eq!(mime_types.content_type(Path::new("/srv/index.html")), "text/html");
        assert_eq!(mime_types.content_type(Path::new("/srv/logo.png")), "image/png");
        assert_eq!(mime_types.content_type(Path::new("/srv/data.bin")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_types.content_type(Path::new("/srv/README")), DEFAULT_MIME_TYPE);
    }
}
