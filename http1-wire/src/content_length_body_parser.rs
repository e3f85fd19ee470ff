use std::io::{BufRead, Read};
use std::result;

use crate::body_parser::{BodyParseError, BodyParseOutput, BodyParser};

//
//
//
/// Reads a body framed by `Content-Length`: exactly `remaining` more bytes,
/// never past them, so nothing after the body is consumed from the stream.
#[derive(Debug, Default)]
pub struct ContentLengthBodyParser {
    remaining: usize,
}
impl ContentLengthBodyParser {
    pub fn new(length: usize) -> Self {
        Self { remaining: length }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

//
//
//
impl BodyParser for ContentLengthBodyParser {
    fn parse<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> result::Result<BodyParseOutput, BodyParseError> {
        if self.is_complete() {
            return Ok(BodyParseOutput::Completed(0));
        }

        let mut window = r.take(self.remaining as u64);
        let available = window.fill_buf().map_err(BodyParseError::ReadError)?;
        if available.is_empty() {
            return Err(BodyParseError::UnexpectedEof);
        }

        let n = available.len();
        body_buf.extend_from_slice(available);
        window.consume(n);
        self.remaining -= n;

        Ok(if self.is_complete() {
            BodyParseOutput::Completed(n)
        } else {
            BodyParseOutput::Partial(n)
        })
    }
}
