//! File sink implementation.

use crate::sink::DataSink;
use crate::SinkError;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A sink that writes encoded bytes to a file.
///
/// The file is created on construction and honors positional writes, so the
/// encoder's end-of-stream header rewrite lands where it belongs and the
/// resulting file carries accurate stream metadata.
///
/// # Example
///
/// ```no_run
/// use stream_flac::FileSink;
///
/// let sink = FileSink::create("recording.flac")?;
/// // Hand `sink` to a FlacEncoder...
/// # Ok::<(), stream_flac::SinkError>(())
/// ```
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
    // Physical cursor, tracked to skip redundant seeks on the hot
    // append path.
    cursor: u64,
}

impl FileSink {
    /// Creates the file at `path`, truncating any existing content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SinkError::file_error(&path, e))?;
        Ok(Self {
            path,
            file,
            cursor: 0,
        })
    }

    /// Returns the path this sink writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSink for FileSink {
    fn write(&mut self, position: u64, buf: &[u8]) -> Result<u64, SinkError> {
        tracing::trace!(
            path = %self.path.display(),
            position,
            len = buf.len(),
            "file sink write"
        );

        if position != self.cursor {
            self.file
                .seek(SeekFrom::Start(position))
                .map_err(|e| SinkError::file_error(&self.path, e))?;
            self.cursor = position;
        }

        self.file
            .write_all(buf)
            .map_err(|e| SinkError::file_error(&self.path, e))?;
        self.cursor += buf.len() as u64;

        Ok(buf.len() as u64)
    }

    fn release(&mut self) {
        if let Err(e) = self.file.flush() {
            tracing::error!(path = %self.path.display(), error = %e, "file sink flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_sequential_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = FileSink::create(&path).unwrap();
        assert_eq!(sink.write(0, &[1, 2, 3]).unwrap(), 3);
        assert_eq!(sink.write(3, &[4, 5]).unwrap(), 2);
        sink.release();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_file_sink_positional_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = FileSink::create(&path).unwrap();
        sink.write(0, &[0; 8]).unwrap();
        sink.write(2, &[9, 9]).unwrap();
        // Back to the end after a rewrite
        sink.write(8, &[1]).unwrap();
        sink.release();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 0, 9, 9, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_file_sink_invalid_path_error() {
        let result = FileSink::create("/nonexistent/directory/out.flac");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("nonexistent"));
    }
}
