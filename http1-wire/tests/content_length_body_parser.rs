use std::io::{BufReader, Cursor, Read as _};

use http1_wire::{
    body_parser::{BodyParseError, BodyParseOutput, BodyParser},
    content_length_body_parser::ContentLengthBodyParser,
};

#[test]
fn stops_at_declared_length() -> Result<(), Box<dyn std::error::Error>> {
    let mut p = ContentLengthBodyParser::new(5);
    let mut r = BufReader::new(Cursor::new(b"abcdeNEXT"));

    let mut body_buf = Vec::new();
    assert_eq!(p.parse(&mut r, &mut body_buf)?, BodyParseOutput::Completed(5));
    assert!(p.is_complete());
    assert_eq!(body_buf, b"abcde");

    // bytes past the body stay in the stream
    let mut rest = String::new();
    r.read_to_string(&mut rest)?;
    assert_eq!(rest, "NEXT");

    Ok(())
}

#[test]
fn small_reads() -> Result<(), BodyParseError> {
    let mut p = ContentLengthBodyParser::new(10);
    let mut r = BufReader::with_capacity(3, Cursor::new(b"abcdefghij"));

    let mut body_buf = Vec::new();
    assert_eq!(p.parse(&mut r, &mut body_buf)?, BodyParseOutput::Partial(3));
    assert_eq!(p.remaining(), 7);

    assert_eq!(p.parse_to_end(&mut r, &mut body_buf)?, 7);
    assert_eq!(p.remaining(), 0);
    assert_eq!(body_buf, b"abcdefghij");

    Ok(())
}

#[test]
fn empty_body_reads_nothing() -> Result<(), BodyParseError> {
    let mut p = ContentLengthBodyParser::new(0);

    let mut body_buf = Vec::new();
    assert_eq!(
        p.parse(&mut BufReader::new(Cursor::new(b"abc")), &mut body_buf)?,
        BodyParseOutput::Completed(0)
    );
    assert!(body_buf.is_empty());

    Ok(())
}

#[test]
fn stream_ends_early() {
    let mut p = ContentLengthBodyParser::new(10);

    let mut body_buf = Vec::new();
    let r = p.parse_to_end(&mut BufReader::new(Cursor::new(b"abcdefgh")), &mut body_buf);
    assert!(matches!(r, Err(BodyParseError::UnexpectedEof)));
    assert_eq!(p.remaining(), 2);
    assert_eq!(body_buf, b"abcdefgh");
}
