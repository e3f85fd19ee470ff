use std::{
    error, fmt,
    io::{self, BufRead},
};

//
//
//
#[derive(Debug, PartialEq, Eq)]
pub enum BodyParseOutput {
    Completed(usize),
    Partial(usize),
}

#[derive(Debug)]
pub enum BodyParseError {
    ReadError(io::Error),
    UnexpectedEof,
}
impl BodyParseError {
    /// The socket read deadline elapsed before the body was complete.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadError(err) if crate::head_parser::is_timeout(err))
    }
}
impl fmt::Display for BodyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl error::Error for BodyParseError {}
impl From<BodyParseError> for io::Error {
    fn from(err: BodyParseError) -> io::Error {
        match err {
            BodyParseError::ReadError(err) => err,
            BodyParseError::UnexpectedEof => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err.to_string())
            }
        }
    }
}

//
//
//
pub trait BodyParser {
    /// Appends whatever the reader has buffered, up to the remaining length,
    /// to `body_buf`.
    fn parse<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> Result<BodyParseOutput, BodyParseError>;

    /// Keeps parsing until the body is complete. A stream that ends first is
    /// an error, never a short body.
    fn parse_to_end<R: BufRead>(
        &mut self,
        r: &mut R,
        body_buf: &mut Vec<u8>,
    ) -> Result<usize, BodyParseError> {
        let mut parsed_num_bytes = 0_usize;
        loop {
            match self.parse(r, body_buf) {
                Ok(BodyParseOutput::Completed(n)) => return Ok(parsed_num_bytes + n),
                Ok(BodyParseOutput::Partial(n)) => parsed_num_bytes += n,
                Err(BodyParseError::ReadError(err))
                    if err.kind() == io::ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
    }
}
