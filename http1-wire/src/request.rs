use std::collections::HashMap;

use http::Method;

use crate::header_table::HeaderField;

//
//
//
/// Why a request was rejected. The dispatcher answers every one of these
/// with `400 Bad Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRequest {
    MalformedRequestLine,
    UnsupportedMethod,
    MalformedHeader,
    InvalidCRLF,
    TooLongHead,
    TruncatedHead,
    MissingContentLength,
    InvalidContentLength,
    TooLongBody,
    TruncatedBody,
}

//
//
//
/// One parsed request. Populated by
/// [`RequestParser`](crate::request_parser::RequestParser) and read-only
/// afterwards, except that it may still be marked invalid.
#[derive(Debug, Clone, Default)]
pub struct Request {
    line: String,
    method: Method,
    target: String,
    version: String,
    headers: HashMap<HeaderField, String>,
    body: Option<Vec<u8>>,
    invalid: Option<InvalidRequest>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// The request target exactly as sent, query included.
    pub fn target(&self) -> &str {
        &self.target
    }
    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    /// The target up to the first `?`.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    /// Everything after the first `?`, if the target has one.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn header(&self, field: HeaderField) -> Option<&str> {
        self.headers.get(&field).map(String::as_str)
    }
    pub fn has_header(&self, field: HeaderField) -> bool {
        self.headers.contains_key(&field)
    }
    pub fn headers(&self) -> &HashMap<HeaderField, String> {
        &self.headers
    }
    pub fn set_header(&mut self, field: HeaderField, value: impl Into<String>) {
        self.headers.insert(field, value.into());
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.is_some()
    }
    pub fn invalid_reason(&self) -> Option<InvalidRequest> {
        self.invalid
    }
    /// Marks the request invalid. The first reason recorded wins; there is
    /// no way back to valid.
    pub fn mark_invalid(&mut self, reason: InvalidRequest) {
        self.invalid.get_or_insert(reason);
    }

    /// The request line as received, without its CRLF. Kept even when it
    /// failed to parse, for the access log.
    pub fn request_line(&self) -> &str {
        &self.line
    }
    pub fn set_request_line(&mut self, line: impl Into<String>) {
        self.line = line.into();
    }
}
