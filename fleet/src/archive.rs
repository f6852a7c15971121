//! Fleet data archives.
//!
//! Archives are gzip-compressed tarballs of the fleet data directory, one
//! top-level entry per node directory. Entries are written in sorted order
//! with deterministic headers.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder as TarBuilder, Header, HeaderMode};

/// Per-run artifacts that are not ledger state.
const RUN_ARTIFACT_EXTENSIONS: &[&str] = &["log", "out", "err"];

/// Private key files keep owner-only permissions inside the archive.
const KEY_EXTENSION: &str = "wif";
const KEY_MODE: u32 = 0o600;

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| wanted.contains(&e))
}

/// Which files of the data directory go into an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveContents {
    /// Ledger state, keys and configuration; logs and process output are
    /// left out.
    Ledger,
    /// Everything, for post-mortem analysis.
    Everything,
}

impl ArchiveContents {
    fn includes(self, path: &Path) -> bool {
        match self {
            ArchiveContents::Everything => true,
            ArchiveContents::Ledger => !has_extension(path, RUN_ARTIFACT_EXTENSIONS),
        }
    }
}

/// Packs `source_dir` into the gzip tarball `output`.
///
/// `output` itself is skipped if it lies inside `source_dir`.
pub fn pack_directory(source_dir: &Path, output: &Path, contents: ArchiveContents) -> io::Result<()> {
    let skip = output.canonicalize().ok();
    let mut files = Vec::new();
    collect_files(source_dir, source_dir, &mut files)?;

    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = TarBuilder::new(encoder);
    builder.mode(HeaderMode::Deterministic);
    for (path, relative) in files {
        if !contents.includes(&path) {
            continue;
        }
        if skip.is_some() && path.canonicalize().ok() == skip {
            continue;
        }
        if has_extension(&path, &[KEY_EXTENSION]) {
            let file = File::open(&path)?;
            let mut header = Header::new_gnu();
            header.set_metadata_in_mode(&file.metadata()?, HeaderMode::Deterministic);
            header.set_mode(KEY_MODE);
            builder.append_data(&mut header, &relative, file)?;
        } else {
            builder.append_path_with_name(&path, &relative)?;
        }
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, PathBuf)>) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push((path.clone(), relative.to_path_buf()));
        }
    }
    Ok(())
}

/// Restores an archive produced by [`pack_directory`] into `dest`.
pub fn unpack_archive(archive: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;
    let decoder = GzDecoder::new(File::open(archive)?);
    Archive::new(decoder).unpack(dest)
}
