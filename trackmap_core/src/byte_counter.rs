use std::io::{Result, Write};

/// Wraps a writer and counts the bytes that go through it, so we can report
/// the size of a file without asking the filesystem.
pub struct ByteCounter<W> {
    inner: W,
    count: usize,
}

impl<W> ByteCounter<W>
where
    W: Write,
{
    pub fn new(inner: W) -> Self {
        ByteCounter { inner, count: 0 }
    }

    pub fn bytes_written(&self) -> usize {
        self.count
    }
}

impl<W> Write for ByteCounter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let res = self.inner.write(buf);
        if let Ok(size) = res {
            self.count += size
        }
        res
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
