use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http1_wire::{header_table::HeaderField, request::Request};
use sha1::{Digest as _, Sha1};

use crate::config::{read_directives, read_lines, ConfigError, Directive};

const SHA_PREFIX: &str = "{SHA}";
const SSHA_PREFIX: &str = "{SSHA}";
const SHA1_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Valid,
    Invalid,
    MissingAuth,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{access_file} has no AuthUserFile")]
    MissingUserFile { access_file: PathBuf },
}

//
//
//
/// Directives of one access-control file, keyed by lowercased name. A
/// directive's value is its first argument; a repeated directive keeps the
/// last value.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    path: PathBuf,
    directives: HashMap<String, String>,
}

impl AccessControl {
    /// `Ok(None)` when there is no file at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::from_directives(path, read_directives(path)?)))
    }

    pub fn from_directives(path: &Path, directives: impl IntoIterator<Item = Directive>) -> Self {
        let directives = directives
            .into_iter()
            .filter_map(|directive| {
                let value = directive.args().first()?.clone();
                Some((directive.name().to_ascii_lowercase(), value))
            })
            .collect();
        Self {
            path: path.to_owned(),
            directives,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn auth_type(&self) -> Option<&str> {
        self.get("AuthType")
    }

    pub fn auth_name(&self) -> Option<&str> {
        self.get("AuthName")
    }

    pub fn auth_user_file(&self) -> Option<&str> {
        self.get("AuthUserFile")
    }

    fn is_basic(&self) -> bool {
        self.auth_type()
            .is_some_and(|auth_type| auth_type.eq_ignore_ascii_case("Basic"))
    }
}

//
//
//
/// A stored password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordDigest {
    /// `{SHA}` followed by base64 of the SHA-1 of the password.
    Sha(String),
    /// `{SSHA}` followed by base64 of the SHA-1 of password and salt, then the
    /// salt itself.
    SaltedSha { hash: Vec<u8>, salt: Vec<u8> },
}

impl PasswordDigest {
    /// Entries without a scheme prefix are read as `{SHA}`. `None` for a
    /// `{SSHA}` entry that does not decode.
    pub fn parse(stored: &str) -> Option<Self> {
        let stored = stored.trim();
        if let Some(encoded) = stored.strip_prefix(SSHA_PREFIX) {
            let mut decoded = STANDARD.decode(encoded).ok()?;
            if decoded.len() <= SHA1_LEN {
                return None;
            }
            let salt = decoded.split_off(SHA1_LEN);
            return Some(Self::SaltedSha {
                hash: decoded,
                salt,
            });
        }
        let encoded = stored.strip_prefix(SHA_PREFIX).unwrap_or(stored);
        Some(Self::Sha(encoded.to_owned()))
    }

    pub fn verify(&self, password: &str) -> bool {
        match self {
            Self::Sha(encoded) => {
                STANDARD.encode(Sha1::digest(password.as_bytes())).as_bytes() == encoded.as_bytes()
            }
            Self::SaltedSha { hash, salt } => {
                let mut hasher = Sha1::new();
                hasher.update(password.as_bytes());
                hasher.update(salt);
                hasher.finalize().as_slice() == hash.as_slice()
            }
        }
    }
}

/// Username to digest, read from an `AuthUserFile` of `username:digest`
/// lines.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    digests: HashMap<String, PasswordDigest>,
}

impl CredentialTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_lines(
            read_lines(path)?.iter().map(|(_, line)| line.as_str()),
        ))
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut digests = HashMap::new();
        for line in lines {
            let Some((user, stored)) = line.split_once(':') else {
                continue;
            };
            match PasswordDigest::parse(stored) {
                Some(digest) => {
                    digests.insert(user.to_owned(), digest);
                }
                None => tracing::warn!(user, "ignoring undecodable password digest"),
            }
        }
        Self { digests }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn verify(&self, user: &str, password: &str) -> bool {
        self.digests
            .get(user)
            .is_some_and(|digest| digest.verify(password))
    }
}

/// Splits a Basic `Authorization` value into username and password. The
/// username comes back alone when the decoded text has no `:`.
pub fn decode_basic_credentials(authorization: &str) -> Option<(String, Option<String>)> {
    let authorization = authorization.trim();
    let encoded = match authorization.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("Basic") => rest.trim(),
        Some(_) => return None,
        None => authorization,
    };
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    Some(match decoded.split_once(':') {
        Some((user, password)) => (user.to_owned(), Some(password.to_owned())),
        None => (decoded, None),
    })
}

//
//
//
/// Per-request access check against the access-control file guarding the
/// resource.
#[derive(Debug, Default)]
pub struct AuthorizationGate {
    access: Option<AccessControl>,
    checked_user: Option<String>,
}

impl AuthorizationGate {
    pub fn new(access: Option<AccessControl>) -> Self {
        Self {
            access,
            checked_user: None,
        }
    }

    pub fn load(access_file: &Path) -> Result<Self, AuthError> {
        Ok(Self::new(AccessControl::load(access_file)?))
    }

    pub fn is_protected(&self) -> bool {
        self.access.is_some()
    }

    pub fn check(&mut self, request: &Request) -> Result<AuthorizationOutcome, AuthError> {
        let Some(access) = &self.access else {
            return Ok(AuthorizationOutcome::Valid);
        };

        if !access.is_basic() {
            tracing::warn!(
                access_file = %access.path.display(),
                auth_type = access.auth_type().unwrap_or("<none>"),
                "unsupported auth type"
            );
            return Ok(AuthorizationOutcome::Invalid);
        }

        let authorization = match request.header(HeaderField::Authorization) {
            Some(value) if !value.trim().is_empty() => value,
            _ => return Ok(AuthorizationOutcome::MissingAuth),
        };

        let user_file = access
            .auth_user_file()
            .ok_or_else(|| AuthError::MissingUserFile {
                access_file: access.path.clone(),
            })?;
        let credentials = CredentialTable::load(Path::new(user_file))?;

        let Some((user, password)) = decode_basic_credentials(authorization) else {
            return Ok(AuthorizationOutcome::Invalid);
        };
        let valid = password.is_some_and(|password| credentials.verify(&user, &password));
        self.checked_user = Some(user);

        Ok(if valid {
            AuthorizationOutcome::Valid
        } else {
            AuthorizationOutcome::Invalid
        })
    }

    /// The `WWW-Authenticate` value that goes with a
    /// [`AuthorizationOutcome::MissingAuth`].
    pub fn challenge(&self) -> Option<String> {
        let access = self.access.as_ref().filter(|access| access.is_basic())?;
        Some(format!(
            "Basic realm=\"{}\"",
            access.auth_name().unwrap_or_default()
        ))
    }

    /// The username supplied with the last checked credentials, verified or
    /// not.
    pub fn checked_user(&self) -> Option<&str> {
        self.checked_user.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{error::Error, fs};

    // sha1("password"), base64
    const PASSWORD_SHA: &str = "W6ph5Mm5Pz8GgiULbPgzG37mj9g=";
    // base64("alice:password")
    const ALICE_BASIC: &str = "Basic YWxpY2U6cGFzc3dvcmQ=";

    fn ssha(password: &str, salt: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(password.as_bytes());
        hasher.update(salt);
        let mut raw = hasher.finalize().to_vec();
        raw.extend_from_slice(salt);
        format!("{SSHA_PREFIX}{}", STANDARD.encode(raw))
    }

    #[test]
    fn test_sha_digest() {
        let digest = PasswordDigest::parse(&format!("{SHA_PREFIX}{PASSWORD_SHA}")).unwrap();
        assert!(digest.verify("password"));
        assert!(!digest.verify("Password"));

        let digest = PasswordDigest::parse(PASSWORD_SHA).unwrap();
        assert_eq!(digest, PasswordDigest::Sha(PASSWORD_SHA.to_owned()));
        assert!(digest.verify("password"));
    }

    #[test]
    fn test_salted_sha_digest() {
        let digest = PasswordDigest::parse(&ssha("secret", b"NaCl")).unwrap();
        assert!(digest.verify("secret"));
        assert!(!digest.verify("secreT"));

        assert_eq!(PasswordDigest::parse("{SSHA}not base64!"), None);
        assert_eq!(PasswordDigest::parse("{SSHA}c2hvcnQ="), None);
    }

    #[test]
    fn test_credential_table() {
        let table = CredentialTable::from_lines([
            format!("alice:{SHA_PREFIX}{PASSWORD_SHA}").as_str(),
            format!("bob:{}", ssha("hunter2", b"pepper")).as_str(),
            "no separator here",
        ]);
        assert_eq!(table.len(), 2);
        assert!(table.verify("alice", "password"));
        assert!(table.verify("bob", "hunter2"));
        assert!(!table.verify("bob", "password"));
        assert!(!table.verify("carol", "password"));
    }

    #[test]
    fn test_decode_basic_credentials() {
        assert_eq!(
            decode_basic_credentials(ALICE_BASIC),
            Some(("alice".to_owned(), Some("password".to_owned())))
        );
        // base64("alice")
        assert_eq!(
            decode_basic_credentials("Basic YWxpY2U="),
            Some(("alice".to_owned(), None))
        );
        assert_eq!(decode_basic_credentials("Basic %%%"), None);
        assert_eq!(decode_basic_credentials("Bearer YWxpY2U6cGFzc3dvcmQ="), None);
    }

    #[test]
    fn test_gate() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let user_file = dir.path().join(".htpasswd");
        fs::write(&user_file, format!("alice:{SHA_PREFIX}{PASSWORD_SHA}\n"))?;
        let access_file = dir.path().join(".htaccess");
        fs::write(
            &access_file,
            format!(
                "AuthUserFile \"{}\"\nAuthType Basic\nAuthName \"Private area\"\n",
                user_file.display()
            ),
        )?;

        let mut request = Request::new();
        let mut gate = AuthorizationGate::load(&access_file)?;
        assert!(gate.is_protected());
        assert_eq!(gate.check(&request)?, AuthorizationOutcome::MissingAuth);
        assert_eq!(gate.challenge().as_deref(), Some("Basic realm=\"Private area\""));
        assert_eq!(gate.checked_user(), None);

        request.set_header(HeaderField::Authorization, ALICE_BASIC);
        assert_eq!(gate.check(&request)?, AuthorizationOutcome::Valid);
        assert_eq!(gate.checked_user(), Some("alice"));

        // base64("alice:wrong")
        request.set_header(HeaderField::Authorization, "Basic YWxpY2U6d3Jvbmc=");
        assert_eq!(gate.check(&request)?, AuthorizationOutcome::Invalid);

        Ok(())
    }

    #[test]
    fn test_open_and_misconfigured() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut request = Request::new();
        request.set_header(HeaderField::Authorization, ALICE_BASIC);

        let mut gate = AuthorizationGate::load(&dir.path().join(".htaccess"))?;
        assert!(!gate.is_protected());
        assert_eq!(gate.check(&request)?, AuthorizationOutcome::Valid);

        let access_file = dir.path().join(".htaccess");
        fs::write(&access_file, "AuthType Digest\nAuthName realm\n")?;
        let mut gate = AuthorizationGate::load(&access_file)?;
        assert_eq!(gate.check(&request)?, AuthorizationOutcome::Invalid);
        assert_eq!(gate.challenge(), None);

        fs::write(&access_file, "AuthType Basic\n")?;
        let mut gate = AuthorizationGate::load(&access_file)?;
        assert!(matches!(
            gate.check(&request),
            Err(AuthError::MissingUserFile { .. })
        ));

        Ok(())
    }
}
