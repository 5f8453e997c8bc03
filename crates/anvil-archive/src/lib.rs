//! Zip helpers shared by the pipeline stages: entry reads, filtered copies,
//! per-entry rewriting and extraction into a directory.
//!
//! Jars produced by the remapper and the decompiler are plain zip files, and
//! an exploded directory can stand in for one wherever only reads are needed.

mod error;

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub use crate::error::{ArchiveError, Result};

/// What to do when an extracted entry already exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Always,
    /// Keep local files whose mtime is at least the entry's timestamp.
    IfOlder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub name: String,
    pub path: PathBuf,
    /// `false` when an up-to-date local copy was kept.
    pub written: bool,
}

#[derive(Clone, Debug)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<ZipArchive<File>> {
        let file = File::open(&self.path).map_err(ArchiveError::io(&self.path))?;
        ZipArchive::new(file).map_err(ArchiveError::zip(&self.path))
    }

    /// Read a file from the archive.
    ///
    /// Returns `Ok(None)` when the file isn't present.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.path.is_dir() {
            let candidate = self.path.join(name);
            if !candidate.is_file() {
                return Ok(None);
            }
            return fs::read(&candidate)
                .map(Some)
                .map_err(ArchiveError::io(candidate));
        }

        let mut zip = self.open()?;
        let result = match zip.by_name(name) {
            Ok(mut entry) => {
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(ArchiveError::io(&self.path))?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(ArchiveError::zip(&self.path)(err)),
        };
        result
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> Result<Vec<String>> {
        let zip = self.open()?;
        Ok(zip.file_names().map(str::to_string).collect())
    }

    /// Copies the entries accepted by `keep` into a new archive at `output`
    /// without recompressing them. Returns the number of copied entries.
    pub fn copy_filtered(&self, output: &Path, mut keep: impl FnMut(&str) -> bool) -> Result<usize> {
        let mut zip = self.open()?;
        let mut writer = create_writer(output)?;
        let mut copied = 0;
        for i in 0..zip.len() {
            let entry = zip.by_index_raw(i).map_err(ArchiveError::zip(&self.path))?;
            if !keep(entry.name()) {
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(ArchiveError::zip(output))?;
            copied += 1;
        }
        writer.finish().map_err(ArchiveError::zip(output))?;

        tracing::debug!(
            target: "anvil.archive",
            input = %self.path.display(),
            output = %output.display(),
            copied,
            skipped = zip.len() - copied,
            "copied filtered archive"
        );
        Ok(copied)
    }

    /// Writes a new archive whose file entries are produced by `map`.
    ///
    /// `map` receives each file entry's name and content and returns the new
    /// content, or `None` to drop the entry. Directory entries are copied.
    pub fn rewrite<E, F>(&self, output: &Path, mut map: F) -> std::result::Result<usize, E>
    where
        E: From<ArchiveError>,
        F: FnMut(&str, Vec<u8>) -> std::result::Result<Option<Vec<u8>>, E>,
    {
        let mut zip = self.open()?;
        let mut writer = create_writer(output)?;
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut written = 0;
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(ArchiveError::zip(&self.path))?;
            let name = entry.name().to_string();
            if entry.is_dir() {
                writer
                    .add_directory(name, options)
                    .map_err(ArchiveError::zip(output))?;
                continue;
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut content)
                .map_err(ArchiveError::io(&self.path))?;
            drop(entry);

            let Some(content) = map(&name, content)? else {
                continue;
            };
            writer
                .start_file(name, options)
                .map_err(ArchiveError::zip(output))?;
            writer
                .write_all(&content)
                .map_err(ArchiveError::io(output))?;
            written += 1;
        }
        writer.finish().map_err(ArchiveError::zip(output))?;
        Ok(written)
    }

    /// Extracts the file entries accepted by `select` below `dest`.
    ///
    /// Entries whose name would escape `dest` are rejected.
    pub fn extract(
        &self,
        dest: &Path,
        overwrite: Overwrite,
        mut select: impl FnMut(&str) -> bool,
    ) -> Result<Vec<Extracted>> {
        let mut zip = self.open()?;
        let mut extracted = Vec::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(ArchiveError::zip(&self.path))?;
            if entry.is_dir() || !select(entry.name()) {
                continue;
            }
            let name = entry.name().to_string();
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry {
                    name: name.clone(),
                    root: dest.to_path_buf(),
                })?;
            let path = dest.join(relative);

            if overwrite == Overwrite::IfOlder {
                let entry_time = entry.last_modified().map(zip_time_to_system);
                if is_up_to_date(&path, entry_time) {
                    tracing::trace!(target: "anvil.archive", entry = %name, "up to date");
                    extracted.push(Extracted {
                        name,
                        path,
                        written: false,
                    });
                    continue;
                }
            }

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
            }
            let mut out = File::create(&path).map_err(ArchiveError::io(&path))?;
            io::copy(&mut entry, &mut out).map_err(ArchiveError::io(&path))?;
            extracted.push(Extracted {
                name,
                path,
                written: true,
            });
        }

        tracing::debug!(
            target: "anvil.archive",
            archive = %self.path.display(),
            dest = %dest.display(),
            entries = extracted.len(),
            written = extracted.iter().filter(|e| e.written).count(),
            "extracted archive"
        );
        Ok(extracted)
    }
}

fn create_writer(output: &Path) -> Result<ZipWriter<BufWriter<File>>> {
    let file = File::create(output).map_err(ArchiveError::io(output))?;
    Ok(ZipWriter::new(BufWriter::new(file)))
}

fn is_up_to_date(path: &Path, entry_time: Option<SystemTime>) -> bool {
    let Ok(local) = fs::metadata(path).and_then(|meta| meta.modified()) else {
        return false;
    };
    match entry_time {
        Some(entry_time) => local >= entry_time,
        None => true,
    }
}

/// Zip timestamps carry no zone; they are read as UTC.
fn zip_time_to_system(time: zip::DateTime) -> SystemTime {
    let days = days_from_civil(
        i64::from(time.year()),
        i64::from(time.month()),
        i64::from(time.day()),
    );
    let secs = days * 86_400
        + i64::from(time.hour()) * 3_600
        + i64::from(time.minute()) * 60
        + i64::from(time.second());
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

// Howard Hinnant's days_from_civil.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
