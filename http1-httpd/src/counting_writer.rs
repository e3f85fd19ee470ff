use std::io::{self, Write};

/// Counts the bytes that make it into the inner writer.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: usize,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() -> io::Result<()> {
        let mut w = CountingWriter::new(Vec::new());
        assert_eq!(w.count(), 0);

        w.write_all(b"HTTP/1.1 200 OK\r\n")?;
        write!(w, "{}", 42)?;
        assert_eq!(w.count(), 19);
        assert_eq!(w.into_inner(), b"HTTP/1.1 200 OK\r\n42".to_vec());

        Ok(())
    }
}
