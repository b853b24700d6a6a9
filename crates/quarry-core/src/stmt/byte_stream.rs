use std::{
    fmt,
    io::Read,
    sync::{Arc, Mutex},
};

/// A one-shot byte source used to feed large binary values into a write.
///
/// The stream is drained the first time it is converted to a storage value.
/// Clones share the same underlying reader, so draining one clone drains them
/// all.
#[derive(Clone)]
pub struct ByteStream {
    reader: Arc<Mutex<Option<Box<dyn Read + Send>>>>,
}

impl ByteStream {
    pub fn new(reader: impl Read + Send + 'static) -> ByteStream {
        ByteStream {
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Reads the stream to the end. Fails if it was already consumed.
    pub fn read_to_end(&self) -> crate::Result<Vec<u8>> {
        let mut guard = self
            .reader
            .lock()
            .map_err(|_| crate::err!("byte stream lock poisoned"))?;

        let Some(mut reader) = guard.take() else {
            crate::bail!("byte stream already consumed");
        };

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl PartialEq for ByteStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.reader, &other.reader)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(value: Vec<u8>) -> Self {
        ByteStream::new(std::io::Cursor::new(value))
    }
}
