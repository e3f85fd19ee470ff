use std::{io::Write, time::SystemTime};

use http::{
    header::{self, HeaderName, InvalidHeaderValue},
    HeaderMap, HeaderValue, StatusCode,
};

use crate::{response_head_renderer::ResponseHeadRenderer, CRLF};

//
//
//
/// Every status this server can answer with. Anything else is not
/// representable, so there is no reason phrase lookup that can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    Created,
    NoContent,
    NotModified,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::Created => StatusCode::CREATED,
            Self::NoContent => StatusCode::NO_CONTENT,
            Self::NotModified => StatusCode::NOT_MODIFIED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

//
//
//
#[derive(Debug, Clone)]
pub struct Response {
    status: Status,
    headers: HeaderMap<HeaderValue>,
    body: Option<Vec<u8>>,
    send_body: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: Status::Ok,
            headers: HeaderMap::new(),
            body: None,
            send_body: true,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), InvalidHeaderValue> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(())
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    /// HEAD: the body still sizes `Content-Length` but is not transmitted.
    pub fn suppress_body(&mut self) {
        self.send_body = false;
    }
    pub fn is_body_suppressed(&self) -> bool {
        !self.send_body
    }

    pub fn content_length(&self) -> Option<usize> {
        self.body.as_ref().map(Vec::len)
    }
}

//
//
//
/// Serializes responses onto a stream, stamping the headers the server
/// always owns: `Server`, `Date`, `Connection` and `Content-Length`.
pub struct ResponseWriter {
    renderer: ResponseHeadRenderer,
    server: HeaderValue,
}

impl ResponseWriter {
    pub fn new(server_name: &str) -> Self {
        Self {
            renderer: ResponseHeadRenderer::new(),
            server: HeaderValue::from_str(server_name)
                .unwrap_or_else(|_| HeaderValue::from_static(env!("CARGO_PKG_NAME"))),
        }
    }

    /// Writes the whole response and returns the number of bytes written.
    pub fn write<W: Write>(&self, response: &mut Response, w: &mut W) -> std::io::Result<usize> {
        self.stamp(&mut response.headers);
        match response.content_length() {
            Some(n) => {
                response.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(n));
            }
            None => {
                response.headers.remove(header::CONTENT_LENGTH);
            }
        }

        let mut buf = Vec::with_capacity(256);
        self.renderer.render(response.status, &response.headers, &mut buf);
        buf.extend_from_slice(CRLF);
        w.write_all(&buf)?;
        let mut n = buf.len();

        if let Some(body) = response.body.as_ref().filter(|_| response.send_body) {
            w.write_all(body)?;
            n += body.len();
        }
        w.flush()?;

        Ok(n)
    }

    /// Writes a status line and the server-owned headers, leaving the head
    /// open for a CGI child to finish.
    pub fn write_cgi_prologue<W: Write>(&self, status: Status, w: &mut W) -> std::io::Result<usize> {
        let mut headers = HeaderMap::with_capacity(3);
        self.stamp(&mut headers);

        let mut buf = Vec::with_capacity(128);
        self.renderer.render(status, &headers, &mut buf);
        w.write_all(&buf)?;

        Ok(buf.len())
    }

    fn stamp(&self, headers: &mut HeaderMap<HeaderValue>) {
        headers.insert(header::SERVER, self.server.clone());
        if let Ok(date) = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now())) {
            headers.insert(header::DATE, date);
        }
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
}
