//! Replay of externally captured workloads
//!
//! A capture file is a flat run of records, each
//! `{key_len: u32 BE}{key}{value_len: u32 BE}{value}{flags: u32 BE}{expiry: u32 BE}`.
//! `ImportedKeylist` loads every key once for key-only operations;
//! `ImportObjectGenerator` streams full records through a [`FileReader`] and
//! rewinds to the start when the capture runs out.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use spate_common::GaussianNoise;

use crate::workload::object_gen::{DataObject, KEY_GAUSSIAN, KEY_ITERATORS, KEY_RANDOM};

/// One decoded capture record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedItem {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub flags: u32,
    pub expiry: u32,
}

/// Streaming reader over a capture.
///
/// The concrete format behind `read_next_item` belongs to whatever tool
/// produced the capture; the generator only needs these four operations.
pub trait FileReader {
    fn open(&mut self) -> Result<()>;
    fn read_next_item(&mut self) -> Result<Option<ImportedItem>>;
    fn rewind(&mut self) -> Result<()>;
    fn eof(&self) -> bool;
}

/// [`FileReader`] over the standard capture framing.
#[derive(Debug)]
pub struct CaptureReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    eof: bool,
}

impl CaptureReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: None, eof: false }
    }
}

impl FileReader for CaptureReader {
    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open capture file: {}", self.path.display()))?;
        self.file = Some(BufReader::new(file));
        self.eof = false;
        Ok(())
    }

    fn read_next_item(&mut self) -> Result<Option<ImportedItem>> {
        let Some(file) = self.file.as_mut() else {
            bail!("capture file not opened: {}", self.path.display());
        };

        let Some(key_len) = read_u32_or_eof(file)? else {
            self.eof = true;
            return Ok(None);
        };

        let item = (|| -> std::io::Result<ImportedItem> {
            let key = read_exact_vec(file, key_len as usize)?;
            let value_len = read_u32(file)?;
            let value = read_exact_vec(file, value_len as usize)?;
            let flags = read_u32(file)?;
            let expiry = read_u32(file)?;
            Ok(ImportedItem { key, value, flags, expiry })
        })()
        .with_context(|| format!("truncated capture record in {}", self.path.display()))?;

        Ok(Some(item))
    }

    fn rewind(&mut self) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            bail!("capture file not opened: {}", self.path.display());
        };
        file.seek(SeekFrom::Start(0))?;
        self.eof = false;
        Ok(())
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

fn read_u32_or_eof(reader: &mut impl Read) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(Some(u32::from_be_bytes(buf))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_exact_vec(reader: &mut impl Read, len: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read-only list of every key in a capture, loaded once.
#[derive(Debug, Clone)]
pub struct ImportedKeylist {
    keys: Vec<Vec<u8>>,
}

impl ImportedKeylist {
    /// Load every key record from a capture file.
    pub fn read_keys(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = CaptureReader::new(path);
        reader.open()?;

        let mut keys = Vec::new();
        while let Some(item) = reader.read_next_item()? {
            keys.push(item.key);
        }
        if keys.is_empty() {
            bail!("capture file contains no records: {}", path.display());
        }
        Ok(Self { keys })
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn get(&self, pos: usize) -> Option<&[u8]> {
        self.keys.get(pos).map(|k| k.as_slice())
    }
}

/// Generator that replays a captured workload.
pub struct ImportObjectGenerator {
    keys: ImportedKeylist,
    reader: Box<dyn FileReader>,
    current: Option<ImportedItem>,
    no_expiry: bool,
    next_key: [u64; KEY_ITERATORS],
    random: GaussianNoise,
}

impl ImportObjectGenerator {
    /// Pair a loaded key list with a streaming reader over the same capture.
    ///
    /// When `no_expiry` is set, every replayed object reports expiry 0
    /// regardless of what was captured.
    pub fn new(
        keys: ImportedKeylist,
        mut reader: Box<dyn FileReader>,
        no_expiry: bool,
        seed: Option<u64>,
    ) -> Result<Self> {
        reader.open()?;
        Ok(Self {
            keys,
            reader,
            current: None,
            no_expiry,
            next_key: [0; KEY_ITERATORS],
            random: GaussianNoise::from_seed_opt(seed),
        })
    }

    pub fn keys(&self) -> &ImportedKeylist {
        &self.keys
    }

    /// The i-th imported key for positive iterators (advancing that
    /// iterator's cursor), or a uniform/Gaussian pick for negative ones.
    pub fn get_key(&mut self, iter: i32) -> &[u8] {
        let max = (self.keys.size() - 1) as u64;
        let pos = match iter {
            KEY_RANDOM => self.random.source_mut().random_range(0, max),
            KEY_GAUSSIAN => self.random.gaussian_distribution_range(0.0, 0.0, 0, max),
            _ => {
                let cursor = &mut self.next_key[iter as usize];
                let pos = *cursor % self.keys.size() as u64;
                *cursor += 1;
                pos
            }
        } as usize;
        self.keys.get(pos).expect("position bounded by list size")
    }

    /// The next streamed record; rewinds to the start of the capture when it
    /// is exhausted.
    pub fn get_object(&mut self, _iter: i32) -> Result<DataObject<'_>> {
        let item = match self.reader.read_next_item()? {
            Some(item) => item,
            None => {
                self.reader.rewind()?;
                self.reader
                    .read_next_item()?
                    .context("capture file has no records after rewind")?
            }
        };
        self.current = Some(item);

        let item = self.current.as_ref().expect("record stored above");
        Ok(DataObject {
            key: &item.key,
            value: &item.value,
            expiry: if self.no_expiry { 0 } else { item.expiry },
        })
    }
}
