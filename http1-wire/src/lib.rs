pub mod body_framing;
pub mod body_parser;
pub mod content_length_body_parser;
pub mod head_parser;
pub mod header_table;
pub mod request;
pub mod request_parser;
pub mod response;
pub mod response_head_renderer;

pub use http;

//
//
//
pub const SP: u8 = b' ';
pub const HTTP_VERSION_11: &[u8] = b"HTTP/1.1";
pub const COLON_SP: &[u8] = b": ";
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';
pub const CRLF: &[u8] = b"\r\n";
