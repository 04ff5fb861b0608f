//! Self-delimited record streams used for scratch, cluster-summary, and
//! info files. Every record is msgpack-encoded and framed with a
//! little-endian `u32` byte-length prefix, so a file produced by several
//! sequential writer instances (concatenation) reads back exactly the same
//! as one written in a single pass.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Append-only sink for one node's scratch/cluster/info stream.
pub struct RecordWriter {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl RecordWriter {
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = rmp_serde::to_vec(value)
            .with_context(|| format!("[store] failed to encode record for {}", self.path.display()))?;
        let len = u32::try_from(bytes.len())
            .with_context(|| format!("[store] record too large to frame in {}", self.path.display()))?;
        self.inner
            .write_all(&len.to_le_bytes())
            .with_context(|| format!("[store] failed to write frame length to {}", self.path.display()))?;
        self.inner
            .write_all(&bytes)
            .with_context(|| format!("[store] failed to write record to {}", self.path.display()))?;
        Ok(())
    }

    /// Flush and sync. Callers are expected to call this explicitly; a
    /// best-effort flush also happens on drop.
    pub fn close(mut self) -> Result<()> {
        self.inner
            .flush()
            .with_context(|| format!("[store] failed to flush {}", self.path.display()))?;
        self.inner
            .get_ref()
            .sync_all()
            .with_context(|| format!("[store] failed to sync {}", self.path.display()))?;
        Ok(())
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        let _ = self.inner.flush();
    }
}

/// Streaming reader over a self-delimited record file.
pub struct RecordReader<T> {
    path: PathBuf,
    inner: BufReader<File>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for RecordReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut len_buf = [0u8; 4];
        match self.inner.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return None,
            Err(e) => {
                return Some(Err(anyhow::Error::from(e)
                    .context(format!("[store] failed to read frame length from {}", self.path.display()))))
            }
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        if let Err(e) = self.inner.read_exact(&mut buf) {
            return Some(Err(anyhow::Error::from(e)
                .context(format!("[store] truncated record in {}", self.path.display()))));
        }
        let value = rmp_serde::from_slice(&buf)
            .with_context(|| format!("[store] malformed record in {}", self.path.display()));
        Some(value)
    }
}

/// Open a scratch/cluster/info file for appending records.
pub fn open_writer(path: &Path) -> Result<RecordWriter> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("[store] failed to open {} for writing", path.display()))?;
    Ok(RecordWriter { path: path.to_path_buf(), inner: BufWriter::new(file) })
}

/// Open a scratch/cluster/info file for streaming read.
pub fn open_reader<T: DeserializeOwned>(path: &Path) -> Result<RecordReader<T>> {
    let file = File::open(path)
        .with_context(|| format!("[store] failed to open {} for reading", path.display()))?;
    Ok(RecordReader { path: path.to_path_buf(), inner: BufReader::new(file), _marker: std::marker::PhantomData })
}

/// Read every record from a file into memory. Used by the leaf tile path,
/// which needs the full row set at once.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    open_reader(path)?.collect()
}
