use std::io::{self, Read, Seek, SeekFrom};

/// A byte stream that a trajectory can be read from.
///
/// Keeps track of its own absolute position, such that readers can compute and report offsets
/// without querying the underlying stream.
pub trait Source: Read {
    /// The total number of bytes in the stream, if that can be known up front.
    fn byte_len(&mut self) -> io::Result<Option<u64>>;

    /// Whether [`Source::seek_to`] can move the cursor to arbitrary offsets.
    fn can_seek(&self) -> bool;

    /// The absolute byte offset of the cursor.
    fn position(&self) -> u64;

    /// Move the cursor to an absolute byte offset.
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    /// Move the cursor `n` bytes forward, returning how many bytes were actually passed.
    ///
    /// A [seekable][`Source::can_seek`] source of which the length was never asked for may move
    /// beyond the end of the stream, in which case the problem surfaces on the next read.
    fn skip(&mut self, n: u64) -> io::Result<u64>;
}

/// A [`Source`] backed by a reader that supports random access.
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
    position: u64,
    /// Set once the length has been asked for.
    len: Option<u64>,
}

impl<R: Seek> Seekable<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self {
            inner,
            position,
            len: None,
        })
    }
}

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Source for Seekable<R> {
    fn byte_len(&mut self) -> io::Result<Option<u64>> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        self.len = Some(len);
        Ok(Some(len))
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.position = self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let n = match self.len {
            Some(len) => n.min(len.saturating_sub(self.position)),
            None => n,
        };
        let delta = i64::try_from(n).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.position = self.inner.seek(SeekFrom::Current(delta))?;
        Ok(n)
    }
}

/// A fallback [`Source`] in case [`std::io::Seek`] is not available, such as for a stream that
/// is decompressed on the fly.
///
/// Its length is unknown and it can only move forward, by reading and discarding bytes.
#[derive(Debug)]
pub struct Sequential<R> {
    inner: R,
    position: u64,
}

impl<R> Sequential<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }
}

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> Source for Sequential<R> {
    fn byte_len(&mut self) -> io::Result<Option<u64>> {
        Ok(None)
    }

    fn can_seek(&self) -> bool {
        false
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        match offset.checked_sub(self.position) {
            Some(0) => Ok(()),
            Some(ahead) => {
                let passed = self.skip(ahead)?;
                if passed < ahead {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "cannot move back from byte {} to {offset} in a sequential stream",
                    self.position
                ),
            )),
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let passed = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.position += passed;
        Ok(passed)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn byte_len(&mut self) -> io::Result<Option<u64>> {
        (**self).byte_len()
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        (**self).seek_to(offset)
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        (**self).skip(n)
    }
}
