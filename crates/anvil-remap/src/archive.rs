use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::class::{remap_class, RemappedClass};
use crate::error::{RemapError, Result};
use crate::resolver::NameResolver;

/// Counts of what happened to the entries of one archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub classes: usize,
    pub resources: usize,
    pub directories: usize,
    pub dropped_signatures: usize,
}

/// Whether `name` is a jar signature file (`META-INF/*.SF`, `.RSA`, `.DSA`, `.EC`).
///
/// Signatures no longer match once classes are rewritten, so they are dropped.
pub fn is_signature_entry(name: &str) -> bool {
    let Some(file_name) = name.strip_prefix("META-INF/") else {
        return false;
    };
    if file_name.contains('/') {
        return false;
    }
    let upper = file_name.to_ascii_uppercase();
    [".SF", ".RSA", ".DSA", ".EC"]
        .iter()
        .any(|ext| upper.ends_with(ext))
}

/// Copies an archive entry by entry, rewriting `.class` entries.
///
/// Class entries are renamed to the remapped internal name of the class they
/// contain. Every other entry is copied without recompression.
pub struct ArchiveTransformer<'r, R: ?Sized> {
    resolver: &'r R,
}

impl<'r, R: NameResolver + ?Sized> ArchiveTransformer<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self { resolver }
    }

    pub fn transform_file(&self, input: &Path, output: &Path) -> Result<TransformReport> {
        let file = File::open(input)?;
        let archive = ZipArchive::new(file).map_err(|source| RemapError::OpenArchive {
            path: input.to_path_buf(),
            source,
        })?;
        let out = BufWriter::new(File::create(output)?);
        let report = self.transform(archive, out)?;

        tracing::info!(
            target: "anvil.remap",
            input = %input.display(),
            output = %output.display(),
            classes = report.classes,
            resources = report.resources,
            directories = report.directories,
            dropped_signatures = report.dropped_signatures,
            "remapped archive"
        );
        Ok(report)
    }

    pub fn transform<In, Out>(&self, mut archive: ZipArchive<In>, out: Out) -> Result<TransformReport>
    where
        In: Read + Seek,
        Out: Write + Seek,
    {
        let mut writer = ZipWriter::new(out);
        // Fixed timestamps keep the output stable across runs.
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut report = TransformReport::default();
        let mut buf = Vec::new();
        for i in 0..archive.len() {
            let raw = archive.by_index_raw(i)?;
            let name = raw.name().to_string();

            if raw.is_dir() {
                writer.raw_copy_file(raw)?;
                report.directories += 1;
                continue;
            }
            if is_signature_entry(&name) {
                tracing::debug!(target: "anvil.remap", entry = %name, "dropping signature entry");
                report.dropped_signatures += 1;
                continue;
            }
            if !name.ends_with(".class") {
                writer.raw_copy_file(raw)?;
                report.resources += 1;
                continue;
            }
            drop(raw);

            buf.clear();
            archive.by_index(i)?.read_to_end(&mut buf)?;
            let remapped = remap_class(&buf, self.resolver).map_err(|source| RemapError::Class {
                entry: name.clone(),
                source,
            })?;
            if remapped.name != remapped.original_name {
                tracing::trace!(
                    target: "anvil.remap",
                    from = %remapped.original_name,
                    to = %remapped.name,
                    "renamed class"
                );
            }

            writer.start_file(renamed_entry(&name, &remapped), options)?;
            writer.write_all(&remapped.bytes)?;
            report.classes += 1;
        }

        writer.finish()?;
        Ok(report)
    }
}

/// Entry path for a remapped class; a directory prefix in front of the
/// package path (`META-INF/versions/9/`) is kept.
fn renamed_entry(entry: &str, class: &RemappedClass) -> String {
    let original = format!("{}.class", class.original_name);
    match entry.strip_suffix(original.as_str()) {
        Some(prefix) if prefix.is_empty() || prefix.ends_with('/') => {
            format!("{prefix}{}.class", class.name)
        }
        _ => entry.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renamed_entry_keeps_version_prefix() {
        let class = RemappedClass {
            original_name: "a".into(),
            name: "net/Alpha".into(),
            bytes: Vec::new(),
        };
        assert_eq!(renamed_entry("a.class", &class), "net/Alpha.class");
        assert_eq!(
            renamed_entry("META-INF/versions/9/a.class", &class),
            "META-INF/versions/9/net/Alpha.class"
        );
        assert_eq!(renamed_entry("misplaced/b.class", &class), "misplaced/b.class");
    }

    #[test]
    fn signature_entries_are_recognized_case_insensitively() {
        assert!(is_signature_entry("META-INF/MOJANGCS.SF"));
        assert!(is_signature_entry("META-INF/mojangcs.rsa"));
        assert!(is_signature_entry("META-INF/KEY.DSA"));
        assert!(is_signature_entry("META-INF/KEY.EC"));
        assert!(!is_signature_entry("META-INF/MANIFEST.MF"));
        assert!(!is_signature_entry("assets/META-INF/KEY.SF"));
        assert!(!is_signature_entry("META-INF/versions/9/KEY.SF"));
    }
}
