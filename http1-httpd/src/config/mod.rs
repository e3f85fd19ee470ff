//! Line-oriented directive files: `httpd.conf`, `mime.types`, access-control
//! files and credential files all share the same reader.

pub mod httpd_conf;
pub mod mime_types;
pub mod tokenizer;

use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

pub use httpd_conf::ServerConfig;
pub use mime_types::MimeTypes;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {directive} expects {expected}")]
    MissingArgument {
        line: usize,
        directive: String,
        expected: &'static str,
    },
    #[error("line {line}: invalid value {value:?} for {directive}")]
    InvalidValue {
        line: usize,
        directive: String,
        value: String,
    },
    #[error("DocumentRoot is not set")]
    MissingDocumentRoot,
}

/// One meaningful line of a directive file, already split into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub line: usize,
    pub tokens: Vec<String>,
}

impl Directive {
    pub fn name(&self) -> &str {
        self.tokens.first().map_or("", String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

/// Reads every non-blank line that is not a `#` comment, trimmed.
pub fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_owned(),
        source,
    };

    let file = fs::File::open(path).map_err(io_error)?;
    let mut lines = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_error)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        lines.push((index + 1, line.to_owned()));
    }

    Ok(lines)
}

/// Reads a directive file and tokenizes each line.
pub fn read_directives(path: &Path) -> Result<Vec<Directive>, ConfigError> {
    Ok(read_lines(path)?
        .into_iter()
        .filter_map(|(line, text)| {
            let tokens = tokenizer::split_tokens(&text);
            (!tokens.is_empty()).then_some(Directive { line, tokens })
        })
        .collect())
}
