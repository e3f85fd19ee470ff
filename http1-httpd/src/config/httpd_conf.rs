use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use super::{read_directives, ConfigError, Directive};

pub const DEFAULT_LISTEN: u16 = 8080;
pub const DEFAULT_LOG_FILE: &str = "logs/access.log";
pub const DEFAULT_ACCESS_FILE: &str = ".htaccess";
pub const DEFAULT_DIRECTORY_INDEX: &str = "index.html";
pub const DEFAULT_SERVER_NAME: &str = "http1-httpd";
pub const DEFAULT_WORKERS: usize = 16;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CGI_TIMEOUT: Duration = Duration::from_secs(30);

/// Server settings read once from `httpd.conf` at startup and shared
/// read-only by every worker.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: u16,
    pub document_root: PathBuf,
    pub log_file: PathBuf,
    /// `Alias` entries in declaration order.
    pub aliases: Vec<(String, String)>,
    /// `ScriptAlias` entries in declaration order. The first entry whose key
    /// occurs in a request path wins.
    pub script_aliases: Vec<(String, String)>,
    pub access_file: String,
    /// `None` when `DirectoryIndex disabled` is set.
    pub directory_indexes: Option<Vec<String>>,
    pub server_name: String,
    pub workers: usize,
    pub request_timeout: Duration,
    pub cgi_timeout: Duration,
}

impl ServerConfig {
    /// A configuration with every optional directive at its default.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            listen: DEFAULT_LISTEN,
            document_root: document_root.into(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            aliases: Vec::new(),
            script_aliases: Vec::new(),
            access_file: DEFAULT_ACCESS_FILE.to_owned(),
            directory_indexes: Some(vec![DEFAULT_DIRECTORY_INDEX.to_owned()]),
            server_name: DEFAULT_SERVER_NAME.to_owned(),
            workers: DEFAULT_WORKERS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cgi_timeout: DEFAULT_CGI_TIMEOUT,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_directives(read_directives(path)?)?;
        config.warn_overlapping_aliases();
        Ok(config)
    }

    pub fn from_directives(
        directives: impl IntoIterator<Item = Directive>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(PathBuf::new());
        let mut document_root = None;

        for directive in directives {
            let args = directive.args();
            match directive.name().to_ascii_uppercase().as_str() {
                "LISTEN" => config.listen = parse_arg(&directive, "a port")?,
                "DOCUMENTROOT" => document_root = Some(PathBuf::from(arg(&directive, 0, "a directory")?)),
                "LOGFILE" => config.log_file = PathBuf::from(arg(&directive, 0, "a path")?),
                "ALIAS" => config.aliases.push(alias_pair(&directive)?),
                "SCRIPTALIAS" => config.script_aliases.push(alias_pair(&directive)?),
                "ACCESSFILE" => config.access_file = arg(&directive, 0, "a file name")?.to_owned(),
                "DIRECTORYINDEX" => {
                    // A lone `disabled` turns the index off; anywhere else it is a file name.
                    if args.len() == 1 && args[0] == "disabled" {
                        config.directory_indexes = None;
                    } else if args.is_empty() {
                        return Err(missing(&directive, "at least one file name"));
                    } else {
                        config.directory_indexes = Some(args.to_vec());
                    }
                }
                "SERVERNAME" => config.server_name = arg(&directive, 0, "a name")?.to_owned(),
                "WORKERS" => {
                    config.workers = parse_arg(&directive, "a thread count")?;
                    if config.workers == 0 {
                        return Err(invalid(&directive, "0"));
                    }
                }
                "REQUESTTIMEOUT" => config.request_timeout = parse_timeout(&directive)?,
                "CGITIMEOUT" => config.cgi_timeout = parse_timeout(&directive)?,
                _ => tracing::warn!(
                    line = directive.line,
                    directive = directive.name(),
                    "unrecognized or unsupported directive"
                ),
            }
        }

        config.document_root = document_root.ok_or(ConfigError::MissingDocumentRoot)?;
        Ok(config)
    }

    pub fn directory_indexes(&self) -> &[String] {
        self.directory_indexes.as_deref().unwrap_or_default()
    }

    /// Pairs of alias keys where one contains the other. Which of the two
    /// applies to a matching path depends only on declaration order.
    pub fn overlapping_aliases(&self) -> Vec<(&str, &str)> {
        let mut overlapping = Vec::new();
        for table in [&self.script_aliases, &self.aliases] {
            for (i, (a, _)) in table.iter().enumerate() {
                for (b, _) in &table[i + 1..] {
                    if a.contains(b.as_str()) || b.contains(a.as_str()) {
                        overlapping.push((a.as_str(), b.as_str()));
                    }
                }
            }
        }
        overlapping
    }

    fn warn_overlapping_aliases(&self) {
        for (first, second) in self.overlapping_aliases() {
            tracing::warn!(
                first,
                second,
                "overlapping alias keys, the one declared first takes precedence"
            );
        }
    }
}

fn arg<'a>(directive: &'a Directive, index: usize, expected: &'static str) -> Result<&'a str, ConfigError> {
    directive
        .args()
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| missing(directive, expected))
}

fn parse_arg<T: std::str::FromStr>(directive: &Directive, expected: &'static str) -> Result<T, ConfigError> {
    let value = arg(directive, 0, expected)?;
    value.parse().map_err(|_| invalid(directive, value))
}

// socket deadlines reject a zero duration
fn parse_timeout(directive: &Directive) -> Result<Duration, ConfigError> {
    match parse_arg(directive, "seconds")? {
        0 => Err(invalid(directive, "0")),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn alias_pair(directive: &Directive) -> Result<(String, String), ConfigError> {
    Ok((
        arg(directive, 0, "a virtual path and a real path")?.to_owned(),
        arg(directive, 1, "a virtual path and a real path")?.to_owned(),
    ))
}

fn missing(directive: &Directive, expected: &'static str) -> ConfigError {
    ConfigError::MissingArgument {
        line: directive.line,
        directive: directive.name().to_owned(),
        expected,
    }
}

fn invalid(directive: &Directive, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        line: directive.line,
        directive: directive.name().to_owned(),
        value: value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::tokenizer::split_tokens;

    fn directives(text: &str) -> Vec<Directive> {
        text.lines()
            .enumerate()
            .map(|(i, line)| Directive {
                line: i + 1,
                tokens: split_tokens(line),
            })
            .filter(|d| !d.tokens.is_empty())
            .collect()
    }

    #[test]
    fn test_defaults() -> Result<(), ConfigError> {
        let config = ServerConfig::from_directives(directives("DocumentRoot /srv/www"))?;
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.document_root, PathBuf::from("/srv/www"));
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.access_file, ".htaccess");
        assert_eq!(config.directory_indexes(), ["index.html".to_owned()]);
        assert!(config.script_aliases.is_empty());

        Ok(())
    }

    #[test]
    fn test_full() -> Result<(), ConfigError> {
        let config = ServerConfig::from_directives(directives(
            r#"
Listen 9090
DocumentRoot "/srv/my site"
LogFile /var/log/httpd/access.log
ScriptAlias /cgi-bin/ /srv/cgi-bin/
ScriptAlias /scripts/ /srv/scripts/
Alias /static/ /srv/static/
AccessFile .access
DirectoryIndex home.html index.html
ServerName example
Workers 4
RequestTimeout 5
CgiTimeout 2
"#,
        ))?;
        assert_eq!(config.listen, 9090);
        assert_eq!(config.document_root, PathBuf::from("/srv/my site"));
        assert_eq!(
            config.script_aliases,
            vec![
                ("/cgi-bin/".to_owned(), "/srv/cgi-bin/".to_owned()),
                ("/scripts/".to_owned(), "/srv/scripts/".to_owned()),
            ]
        );
        assert_eq!(
            config.aliases,
            vec![("/static/".to_owned(), "/srv/static/".to_owned())]
        );
        assert_eq!(config.access_file, ".access");
        assert_eq!(
            config.directory_indexes(),
            ["home.html".to_owned(), "index.html".to_owned()]
        );
        assert_eq!(config.server_name, "example");
        assert_eq!(config.workers, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.cgi_timeout, Duration::from_secs(2));

        Ok(())
    }

    #[test]
    fn test_directory_index_disabled() -> Result<(), ConfigError> {
        let config = ServerConfig::from_directives(directives(
            "DocumentRoot /srv\nDirectoryIndex disabled",
        ))?;
        assert_eq!(config.directory_indexes, None);
        assert!(config.directory_indexes().is_empty());

        // only a lone `disabled` is special
        let config = ServerConfig::from_directives(directives(
            "DocumentRoot /srv\nDirectoryIndex index.html disabled",
        ))?;
        assert_eq!(
            config.directory_indexes(),
            ["index.html".to_owned(), "disabled".to_owned()]
        );

        Ok(())
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ServerConfig::from_directives(directives("Listen 8080")),
            Err(ConfigError::MissingDocumentRoot)
        ));
        assert!(matches!(
            ServerConfig::from_directives(directives("DocumentRoot /srv\nListen http")),
            Err(ConfigError::InvalidValue { line: 2, .. })
        ));
        assert!(matches!(
            ServerConfig::from_directives(directives("DocumentRoot /srv\nRequestTimeout 0")),
            Err(ConfigError::InvalidValue { line: 2, .. })
        ));
        assert!(matches!(
            ServerConfig::from_directives(directives("DocumentRoot /srv\nScriptAlias /cgi-bin/")),
            Err(ConfigError::MissingArgument { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_directive_is_ignored() -> Result<(), ConfigError> {
        let config =
            ServerConfig::from_directives(directives("DocumentRoot /srv\nKeepAlive On"))?;
        assert_eq!(config.document_root, PathBuf::from("/srv"));

        Ok(())
    }

    #[test]
    fn test_overlapping_aliases() {
        let mut config = ServerConfig::new("/srv");
        config.script_aliases = vec![
            ("/cgi/".to_owned(), "/a/".to_owned()),
            ("/cgi/bin/".to_owned(), "/b/".to_owned()),
            ("/other/".to_owned(), "/c/".to_owned()),
        ];
        assert_eq!(config.overlapping_aliases(), vec![("/cgi/", "/cgi/bin/")]);
    }
}
