use std::io;

use crate::{header_table::HeaderField, request::Request};

//
//
//
// Only Content-Length framing is understood; a request without it has no body.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BodyFraming {
    ContentLength(usize),
    Neither,
}

pub trait BodyFramingDetector {
    fn detect(&self) -> io::Result<BodyFraming>;
}
impl BodyFramingDetector for Request {
    fn detect(&self) -> io::Result<BodyFraming> {
        if let Some(value) = self.header(HeaderField::ContentLength) {
            let value: usize = value
                .trim()
                .parse()
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
            return Ok(BodyFraming::ContentLength(value));
        }

        Ok(BodyFraming::Neither)
    }
}
