use std::{
    fs,
    io::{self, BufRead, Write},
    net::IpAddr,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use http::{
    header::{self, InvalidHeaderValue},
    HeaderValue, Method,
};
use http1_wire::{
    head_parser,
    header_table::HeaderField,
    request::{InvalidRequest, Request},
    request_parser::{RequestParseError, RequestParser},
    response::{Response, ResponseWriter, Status},
};

use crate::{
    access_log::{AccessLog, AccessLogEntry},
    authorization::{AuthError, AuthorizationGate, AuthorizationOutcome},
    cgi::{CgiContext, CgiError, CgiGateway},
    config::{MimeTypes, ServerConfig},
    counting_writer::CountingWriter,
    resource::{Resource, ResourceResolver},
};

/// Methods answered by the dispatcher, as sent in `Allow`.
pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, PUT, DELETE";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Cgi(#[from] CgiError),
    #[error("failed to {action} {path}: {source}")]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid response header value: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error("failed to write response: {0}")]
    Write(#[from] io::Error),
}

impl DispatchError {
    /// The client went away or stopped reading, so there is nobody left to
    /// answer.
    pub fn is_peer_gone(&self) -> bool {
        let err = match self {
            Self::Write(err) => err,
            Self::Cgi(CgiError::Relay { source, .. }) => source,
            _ => return false,
        };
        matches!(
            err.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ) || head_parser::is_timeout(err)
    }
}

fn fs_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> DispatchError + 'a {
    move |source| DispatchError::Fs {
        action,
        path: path.to_owned(),
        source,
    }
}

/// What the access log needs to know once a transaction ends.
#[derive(Debug, Default)]
struct Transaction {
    status: Option<Status>,
    user: Option<String>,
}

//
//
//
/// Runs one request/response transaction per connection.
pub struct Dispatcher {
    config: ServerConfig,
    mime_types: MimeTypes,
    access_log: Option<AccessLog>,
    parser: RequestParser,
    writer: ResponseWriter,
}

impl Dispatcher {
    pub fn new(config: ServerConfig, mime_types: MimeTypes) -> Self {
        let writer = ResponseWriter::new(&config.server_name);
        Self {
            config,
            mime_types,
            access_log: None,
            parser: RequestParser::new(),
            writer,
        }
    }

    pub fn with_access_log(mut self, access_log: AccessLog) -> Self {
        self.access_log = Some(access_log);
        self
    }

    pub fn with_parser(mut self, parser: RequestParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Reads one request from `r` and answers it on `w`.
    ///
    /// Nothing is written when the peer closes without sending anything or
    /// the read fails outright. Failures after the request was read are
    /// answered with `500` if no response byte has gone out yet.
    pub fn serve<R: BufRead, W: Write>(&self, r: &mut R, w: &mut W, peer: Option<IpAddr>) {
        let request = match self.parser.parse(r) {
            Ok(request) => request,
            Err(RequestParseError::ConnectionClosed) => {
                tracing::debug!(?peer, "connection closed before a request");
                return;
            }
            Err(RequestParseError::ReadError(err)) => {
                tracing::debug!(?peer, %err, "failed to read request");
                return;
            }
        };

        let mut w = CountingWriter::new(w);
        let mut transaction = Transaction::default();
        if let Err(err) = self.dispatch(&request, peer, &mut transaction, &mut w) {
            if err.is_peer_gone() {
                tracing::debug!(?peer, %err, "peer went away mid-response");
            } else if w.count() > 0 {
                tracing::error!(?peer, %err, "transaction failed after the response was committed");
            } else {
                tracing::error!(?peer, request = request.request_line(), %err, "transaction failed");
                transaction.status = Some(Status::InternalServerError);
                let mut response = Response::with_status(Status::InternalServerError);
                if let Err(err) = self.writer.write(&mut response, &mut w) {
                    tracing::debug!(?peer, %err, "failed to write 500 response");
                }
            }
        }

        let status = transaction
            .status
            .unwrap_or(Status::InternalServerError)
            .code();
        tracing::debug!(
            ?peer,
            method = %request.method(),
            target = request.target(),
            status,
            bytes = w.count(),
            "transaction complete"
        );

        if let Some(access_log) = &self.access_log {
            let entry = AccessLogEntry {
                host: peer,
                user: transaction.user.as_deref(),
                request_line: request.request_line(),
                status,
                bytes: w.count(),
            };
            if let Err(err) = access_log.append(&entry) {
                tracing::warn!(%err, "failed to append to access log");
            }
        }
    }

    fn dispatch<W: Write>(
        &self,
        request: &Request,
        peer: Option<IpAddr>,
        transaction: &mut Transaction,
        w: &mut W,
    ) -> Result<(), DispatchError> {
        if let Some(reason) = request.invalid_reason() {
            tracing::debug!(?reason, "rejecting invalid request");
            let mut response = Response::with_status(Status::BadRequest);
            if reason == InvalidRequest::UnsupportedMethod {
                response.insert_header(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            }
            return self.respond(transaction, response, w);
        }

        let resource = match ResourceResolver::new(&self.config).resolve(request.path()) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::debug!(%err, "refusing request path");
                return self.respond(transaction, Response::with_status(Status::Forbidden), w);
            }
        };

        let mut gate = AuthorizationGate::load(resource.access_file())?;
        let outcome = gate.check(request);
        transaction.user = gate.checked_user().map(str::to_owned);
        match outcome? {
            AuthorizationOutcome::Valid => {}
            AuthorizationOutcome::MissingAuth => {
                let mut response = Response::with_status(Status::Unauthorized);
                if let Some(challenge) = gate.challenge() {
                    response.set_header(header::WWW_AUTHENTICATE, &challenge)?;
                }
                return self.respond(transaction, response, w);
            }
            AuthorizationOutcome::Invalid => {
                return self.respond(transaction, Response::with_status(Status::Forbidden), w);
            }
        }

        if !resource.exists() && request.method() != Method::PUT {
            return self.respond(transaction, Response::with_status(Status::NotFound), w);
        }

        if resource.is_script_aliased() {
            let context = CgiContext {
                server_software: &self.config.server_name,
                remote_addr: peer,
            };
            transaction.status = Some(Status::Ok);
            CgiGateway::new(&self.writer, self.config.cgi_timeout).run(
                resource.path(),
                request,
                &context,
                w,
            )?;
            return Ok(());
        }

        let response = match request.method() {
            &Method::GET | &Method::HEAD | &Method::POST => self.get(request, &resource)?,
            &Method::PUT => self.put(request, &resource)?,
            &Method::DELETE => self.delete(&resource)?,
            _ => {
                let mut response = Response::with_status(Status::BadRequest);
                response.insert_header(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
                response
            }
        };
        self.respond(transaction, response, w)
    }

    fn respond<W: Write>(
        &self,
        transaction: &mut Transaction,
        mut response: Response,
        w: &mut W,
    ) -> Result<(), DispatchError> {
        transaction.status = Some(response.status());
        self.writer.write(&mut response, w)?;
        Ok(())
    }

    fn get(&self, request: &Request, resource: &Resource) -> Result<Response, DispatchError> {
        let path = resource.path();
        let metadata = fs::metadata(path).map_err(fs_error("stat", path))?;
        let mut response = Response::new();

        // HTTP dates cannot express anything before the epoch
        if let Some(modified) = metadata
            .modified()
            .ok()
            .filter(|modified| modified.duration_since(UNIX_EPOCH).is_ok())
        {
            response.set_header(header::LAST_MODIFIED, &httpdate::fmt_http_date(modified))?;

            let since = request
                .header(HeaderField::IfModifiedSince)
                .and_then(|value| httpdate::parse_http_date(value).ok());
            if since.is_some_and(|since| !modified_since(modified, since)) {
                response.set_status(Status::NotModified);
                return Ok(response);
            }
        }

        let body = fs::read(path).map_err(fs_error("read", path))?;
        response.set_header(header::CONTENT_TYPE, self.mime_types.content_type(path))?;
        response.set_body(body);
        if request.method() == Method::HEAD {
            response.suppress_body();
        }

        Ok(response)
    }

    fn put(&self, request: &Request, resource: &Resource) -> Result<Response, DispatchError> {
        let path = resource.path();
        let existed = path.is_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(fs_error("create directories for", path))?;
        }
        fs::write(path, request.body().unwrap_or_default()).map_err(fs_error("write", path))?;
        tracing::debug!(path = %path.display(), existed, "stored request body");

        let status = if existed { Status::Ok } else { Status::Created };
        let mut response = Response::with_status(status);
        response.set_header(header::CONTENT_LOCATION, request.target())?;
        response.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        response.set_body(
            format!(
                "<!doctype html>\n<title>{} {}</title>\n<p>{} has been saved.</p>\n",
                status.code(),
                status.reason_phrase(),
                escape_html(request.target()),
            )
            .into_bytes(),
        );

        Ok(response)
    }

    fn delete(&self, resource: &Resource) -> Result<Response, DispatchError> {
        let path = resource.path();
        match fs::remove_file(path) {
            Ok(()) => Ok(Response::with_status(Status::NoContent)),
            // lost a race with another DELETE
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Response::with_status(Status::NotFound))
            }
            Err(source) => Err(fs_error("remove", path)(source)),
        }
    }
}

/// Compared at whole seconds, the resolution of an HTTP date.
fn modified_since(modified: SystemTime, since: SystemTime) -> bool {
    match (
        modified.duration_since(UNIX_EPOCH),
        since.duration_since(UNIX_EPOCH),
    ) {
        (Ok(modified), Ok(since)) => modified.as_secs() > since.as_secs(),
        _ => true,
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_modified_since() {
        let modified = UNIX_EPOCH + Duration::from_millis(1_000_500);
        assert!(!modified_since(modified, UNIX_EPOCH + Duration::from_secs(1_000)));
        assert!(!modified_since(modified, UNIX_EPOCH + Duration::from_secs(1_001)));
        assert!(modified_since(modified, UNIX_EPOCH + Duration::from_secs(999)));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("/a?b=<c>&d"), "/a?b=&lt;c&gt;&amp;d");
    }

    #[test]
    fn test_peer_gone() {
        let reset = DispatchError::Write(io::ErrorKind::ConnectionReset.into());
        assert!(reset.is_peer_gone());

        let relay = DispatchError::Cgi(CgiError::Relay {
            path: PathBuf::from("/srv/cgi-bin/x"),
            source: io::ErrorKind::BrokenPipe.into(),
        });
        assert!(relay.is_peer_gone());

        let fs = DispatchError::Fs {
            action: "read",
            path: PathBuf::from("/srv/x"),
            source: io::ErrorKind::ConnectionReset.into(),
        };
        assert!(!fs.is_peer_gone());
    }
}
