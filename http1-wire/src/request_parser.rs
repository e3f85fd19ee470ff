use std::io::{self, BufRead, Read};
use std::{error, fmt, result};

use http::Method;

use crate::{
    body_framing::{BodyFraming, BodyFramingDetector},
    body_parser::{BodyParseError, BodyParser},
    content_length_body_parser::ContentLengthBodyParser,
    head_parser::{self, HeadParseConfig, HeadParseError},
    request::{InvalidRequest, Request},
};

//
//
//
/// Failures that leave nothing to answer: the peer went away before sending
/// anything, or the socket itself failed.
#[derive(Debug)]
pub enum RequestParseError {
    ConnectionClosed,
    ReadError(io::Error),
}
impl fmt::Display for RequestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl error::Error for RequestParseError {}
impl From<RequestParseError> for io::Error {
    fn from(err: RequestParseError) -> io::Error {
        match err {
            RequestParseError::ReadError(err) => err,
            RequestParseError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")
            }
        }
    }
}

//
//
//
/// Reads one request off a buffered stream.
///
/// Protocol violations do not fail the parse: they come back as a request
/// marked invalid, which the caller answers with `400 Bad Request`.
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    config: HeadParseConfig,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_config(config: HeadParseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeadParseConfig {
        &self.config
    }

    pub fn parse<R: BufRead>(&self, r: &mut R) -> result::Result<Request, RequestParseError> {
        let mut request = Request::new();

        self.parse_head(r, &mut request)?;
        if request.is_invalid() {
            return Ok(request);
        }

        let body_required = match *request.method() {
            // body, if any, is ignored
            Method::GET | Method::HEAD => return Ok(request),
            Method::POST | Method::PUT => true,
            Method::DELETE => false,
            _ => {
                request.mark_invalid(InvalidRequest::UnsupportedMethod);
                return Ok(request);
            }
        };

        let length = match request.detect() {
            Ok(BodyFraming::ContentLength(length)) => length,
            Ok(BodyFraming::Neither) => {
                if body_required {
                    request.mark_invalid(InvalidRequest::MissingContentLength);
                }
                return Ok(request);
            }
            Err(_) => {
                request.mark_invalid(InvalidRequest::InvalidContentLength);
                return Ok(request);
            }
        };
        if length > self.config.get_body_max_len() {
            request.mark_invalid(InvalidRequest::TooLongBody);
            return Ok(request);
        }

        let mut body_parser = ContentLengthBodyParser::new(length);
        let mut body = Vec::with_capacity(length);
        match body_parser.parse_to_end(r, &mut body) {
            Ok(_) => request.set_body(body),
            Err(err) if err.is_timeout() => request.mark_invalid(InvalidRequest::TruncatedBody),
            Err(BodyParseError::UnexpectedEof) => {
                request.mark_invalid(InvalidRequest::TruncatedBody)
            }
            Err(BodyParseError::ReadError(err)) => {
                return Err(RequestParseError::ReadError(err))
            }
        }

        Ok(request)
    }

    fn parse_head<R: BufRead>(
        &self,
        r: &mut R,
        request: &mut Request,
    ) -> result::Result<(), RequestParseError> {
        let mut take = r.take(0);
        let mut buf = Vec::with_capacity(self.config.buf_capacity());

        // request line
        if let Err(err) = head_parser::read_line(
            &mut take,
            &mut buf,
            self.config.get_request_line_max_len(),
            HeadParseError::TooLongRequestLine,
        ) {
            if matches!(err, HeadParseError::UnexpectedEof) && buf.is_empty() {
                return Err(RequestParseError::ConnectionClosed);
            }
            return Self::reject(request, err);
        }

        let line = String::from_utf8_lossy(&buf).into_owned();
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        request.set_request_line(line.as_str());
        let (method, target, version) = match tokens[..] {
            [method, target, version] => (method, target, version),
            _ => {
                request.mark_invalid(InvalidRequest::MalformedRequestLine);
                return Ok(());
            }
        };
        match Method::from_bytes(method.as_bytes()) {
            Ok(method) => request.set_method(method),
            Err(_) => {
                request.mark_invalid(InvalidRequest::UnsupportedMethod);
                return Ok(());
            }
        }
        request.set_target(target);
        request.set_version(version);

        // headers
        let parsed = head_parser::parse_headers(&mut take, &mut buf, &self.config, |k, v| {
            request.set_header(k, v)
        });
        match parsed {
            Ok(_) => Ok(()),
            Err(err) => Self::reject(request, err),
        }
    }

    fn reject(request: &mut Request, err: HeadParseError) -> result::Result<(), RequestParseError> {
        if err.is_timeout() {
            request.mark_invalid(InvalidRequest::TruncatedHead);
            return Ok(());
        }
        let reason = match err {
            HeadParseError::ReadError(err) => return Err(RequestParseError::ReadError(err)),
            HeadParseError::UnexpectedEof => InvalidRequest::TruncatedHead,
            HeadParseError::TooLongRequestLine
            | HeadParseError::TooLongHeader
            | HeadParseError::TooLongHeaders => InvalidRequest::TooLongHead,
            HeadParseError::InvalidCRLF => InvalidRequest::InvalidCRLF,
            HeadParseError::InvalidHeader => InvalidRequest::MalformedHeader,
        };
        request.mark_invalid(reason);
        Ok(())
    }
}
