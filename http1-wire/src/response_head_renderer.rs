use http::{HeaderMap, HeaderValue};

use crate::{response::Status, COLON_SP, CRLF, HTTP_VERSION_11, SP};

/// Renders a status line and header block. The blank line ending the head
/// is left to the caller, since a CGI child supplies its own.
#[derive(Default)]
pub struct ResponseHeadRenderer {}

impl ResponseHeadRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, status: Status, headers: &HeaderMap<HeaderValue>, buf: &mut Vec<u8>) {
        buf.extend_from_slice(HTTP_VERSION_11);
        buf.extend_from_slice(&[SP]);
        buf.extend_from_slice(status.code().to_string().as_bytes());
        buf.extend_from_slice(&[SP]);
        buf.extend_from_slice(status.reason_phrase().as_bytes());
        buf.extend_from_slice(CRLF);

        for (k, v) in headers {
            Self::render_name(k.as_str(), buf);
            buf.extend_from_slice(COLON_SP);
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(CRLF);
        }
    }

    // `http` stores names lowercased; put them back in the usual
    // `Content-Length` shape.
    fn render_name(name: &str, buf: &mut Vec<u8>) {
        let mut upper = true;
        for b in name.bytes() {
            buf.push(if upper { b.to_ascii_uppercase() } else { b });
            upper = b == b'-';
        }
    }
}
