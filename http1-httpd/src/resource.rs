use std::path::{Path, PathBuf};

use crate::config::ServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("request path {0:?} climbs out of its root")]
    Traversal(String),
}

/// Where a request landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: PathBuf,
    script_aliased: bool,
    access_file: PathBuf,
}

impl Resource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Script-aliased resources are executed, never served as files.
    pub fn is_script_aliased(&self) -> bool {
        self.script_aliased
    }

    /// The access-control file guarding this resource's directory. It may
    /// not exist.
    pub fn access_file(&self) -> &Path {
        &self.access_file
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Maps request paths to [`Resource`]s using the alias tables, document root
/// and directory index rules of a [`ServerConfig`].
pub struct ResourceResolver<'a> {
    config: &'a ServerConfig,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(config: &'a ServerConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, request_path: &str) -> Result<Resource, ResolveError> {
        if request_path.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ResolveError::Traversal(request_path.to_owned()));
        }

        let (mut path, script_aliased) =
            if let Some(real) = substitute(&self.config.script_aliases, request_path) {
                (PathBuf::from(real), true)
            } else if let Some(real) = substitute(&self.config.aliases, request_path) {
                (PathBuf::from(real), false)
            } else {
                (
                    self.config
                        .document_root
                        .join(request_path.trim_start_matches('/')),
                    false,
                )
            };

        if path.is_dir() {
            if let Some(index) = self.directory_index(&path) {
                path = index;
            }
        }

        let access_file = path
            .parent()
            .unwrap_or(&path)
            .join(&self.config.access_file);

        Ok(Resource {
            path,
            script_aliased,
            access_file,
        })
    }

    fn directory_index(&self, dir: &Path) -> Option<PathBuf> {
        let indexes = self.config.directory_indexes();
        indexes
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .or_else(|| indexes.first().map(|name| dir.join(name)))
    }
}

/// Applies the first table entry whose key occurs anywhere in `path`,
/// replacing only the first occurrence of that key.
///
/// This is a substring match, not a prefix match: `/cgi-bin/` also fires for
/// `/docs/cgi-bin/x`.
pub fn substitute(table: &[(String, String)], path: &str) -> Option<String> {
    table
        .iter()
        .find(|(key, _)| path.contains(key.as_str()))
        .map(|(key, real)| path.replacen(key.as_str(), real, 1))
}
