use std::{
    cmp, error, fmt,
    io::{self, BufRead, Take},
};

use crate::{header_table::HeaderField, COLON_SP, CR, LF};

//
//
//
const LINE_MAX_LEN: usize = 65536;
const HEADERS_MAX_LEN: usize = 1 << 20;

pub type IsAllCompleted = bool;

//
//
//
#[derive(Debug, Clone)]
pub struct HeadParseConfig {
    request_line_max_len: usize,
    header_max_len: usize,
    headers_max_len: usize,
    body_max_len: usize,
}
impl Default for HeadParseConfig {
    fn default() -> Self {
        HeadParseConfig {
            request_line_max_len: 8192,
            header_max_len: 8192,
            headers_max_len: 65536,
            body_max_len: 64 * 1024 * 1024,
        }
    }
}
impl HeadParseConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn buf_capacity(&self) -> usize {
        cmp::max(self.request_line_max_len, self.header_max_len)
    }

    pub fn set_request_line_max_len(&mut self, value: usize) -> &mut Self {
        self.request_line_max_len = cmp::min(value, LINE_MAX_LEN);
        self
    }
    pub fn get_request_line_max_len(&self) -> usize {
        self.request_line_max_len
    }
    pub fn set_header_max_len(&mut self, value: usize) -> &mut Self {
        self.header_max_len = cmp::min(value, LINE_MAX_LEN);
        self
    }
    pub fn get_header_max_len(&self) -> usize {
        self.header_max_len
    }
    pub fn set_headers_max_len(&mut self, value: usize) -> &mut Self {
        self.headers_max_len = cmp::min(value, HEADERS_MAX_LEN);
        self
    }
    pub fn get_headers_max_len(&self) -> usize {
        self.headers_max_len
    }
    pub fn set_body_max_len(&mut self, value: usize) -> &mut Self {
        self.body_max_len = value;
        self
    }
    pub fn get_body_max_len(&self) -> usize {
        self.body_max_len
    }
}

//
//
//
#[derive(Debug)]
pub enum HeadParseError {
    ReadError(io::Error),
    UnexpectedEof,
    TooLongRequestLine,
    TooLongHeader,
    TooLongHeaders,
    InvalidCRLF,
    InvalidHeader,
}
impl HeadParseError {
    /// The socket read deadline elapsed before the head was complete.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadError(err) if is_timeout(err))
    }
}
impl fmt::Display for HeadParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl error::Error for HeadParseError {}
impl From<HeadParseError> for io::Error {
    fn from(err: HeadParseError) -> io::Error {
        match err {
            HeadParseError::ReadError(err) => err,
            HeadParseError::UnexpectedEof => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err.to_string())
            }
            err => io::Error::new(io::ErrorKind::InvalidInput, err.to_string()),
        }
    }
}

/// Read deadlines surface as `WouldBlock` on unix and `TimedOut` on windows.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

//
//
//
/// Reads one CRLF terminated line into `buf`, returning the number of bytes
/// consumed from the stream. `buf` holds the line without its CRLF.
pub fn read_line<R: BufRead>(
    take: &mut Take<R>,
    buf: &mut Vec<u8>,
    max_len: usize,
    too_long: HeadParseError,
) -> Result<usize, HeadParseError> {
    let end_bytes_len = 2_usize;
    buf.clear();
    take.set_limit(max_len as u64 + end_bytes_len as u64);
    let n = take
        .read_until(LF, buf)
        .map_err(HeadParseError::ReadError)?;
    if n == 0 {
        return Err(HeadParseError::UnexpectedEof);
    }
    if !buf[..n].ends_with(&[LF]) {
        if n >= max_len {
            return Err(too_long);
        } else {
            return Err(HeadParseError::UnexpectedEof);
        }
    }
    if !buf[..n - 1].ends_with(&[CR]) {
        return Err(HeadParseError::InvalidCRLF);
    }
    buf.truncate(n - end_bytes_len);
    Ok(n)
}

/// Splits a header line on its first `": "`. Fields missing from the header
/// table come back as `None`.
pub fn parse_header_line(line: &[u8]) -> Result<Option<(HeaderField, String)>, HeadParseError> {
    let separator_index = line
        .windows(COLON_SP.len())
        .position(|w| w == COLON_SP)
        .ok_or(HeadParseError::InvalidHeader)?;
    let header_name = String::from_utf8_lossy(&line[..separator_index]);
    let header_value = &line[separator_index + COLON_SP.len()..];

    match HeaderField::from_name(&header_name) {
        Some(field) => Ok(Some((
            field,
            String::from_utf8_lossy(header_value).trim().to_owned(),
        ))),
        None => Ok(None),
    }
}

/// Reads header lines up to and including the blank line ending the head.
/// Returns the number of bytes consumed.
pub fn parse_headers<R: BufRead>(
    take: &mut Take<R>,
    buf: &mut Vec<u8>,
    config: &HeadParseConfig,
    mut on_header: impl FnMut(HeaderField, String),
) -> Result<usize, HeadParseError> {
    let mut parsed_num_bytes = 0_usize;
    loop {
        let n = read_line(
            take,
            buf,
            config.get_header_max_len(),
            HeadParseError::TooLongHeader,
        )?;
        parsed_num_bytes += n;
        if parsed_num_bytes > config.get_headers_max_len() {
            return Err(HeadParseError::TooLongHeaders);
        }

        let is_all_completed: IsAllCompleted = buf.is_empty();
        if is_all_completed {
            return Ok(parsed_num_bytes);
        }

        if let Some((field, value)) = parse_header_line(buf)? {
            on_header(field, value);
        }
    }
}
