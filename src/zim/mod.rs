//! ZIM writer (spec §6 "ZIM writer"): an external collaborator. No
//! `libzim`/ZIM-writing crate exists anywhere in the example pack, so this
//! crate ships one concrete, explicitly-documented simplification,
//! `DirectoryZimWriter`, rather than a fabricated binding to the true
//! libzim container format — see DESIGN.md for the open design decision
//! this records.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConverterError;
use crate::url::ZimPath;

#[derive(Clone, Debug, Serialize)]
pub struct ZimMetadata {
    pub name: String,
    pub language: String,
    pub title: String,
    pub description: String,
    pub long_description: Option<String>,
    pub creator: String,
    pub publisher: String,
    pub date: String,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub scraper: String,
    pub illustration_48x48_png: Vec<u8>,
}

#[derive(Serialize)]
struct EntrySidecar {
    path: String,
    mime: String,
    size: usize,
}

#[derive(Serialize)]
struct AliasSidecar {
    from: String,
    title: String,
    to: String,
}

/// Hints accompanying an added item (compression/frontend-visibility, not
/// modelled beyond what the directory layout needs).
#[derive(Default, Clone, Copy)]
pub struct ItemHints {
    pub is_front: bool,
}

pub trait ZimWriter {
    fn add_item(&mut self, path: &ZimPath, mime: &str, bytes: &[u8], hints: ItemHints) -> Result<(), ConverterError>;
    fn add_alias(&mut self, from: &ZimPath, title: &str, to: &ZimPath, hints: ItemHints) -> Result<(), ConverterError>;
    fn finish(self: Box<Self>) -> Result<(), ConverterError>;
}

/// Lays out `(path, mime, bytes)` entries as files under the output
/// directory, with a sidecar `metadata.json` and `aliases.json`, rather
/// than the true libzim binary container.
pub struct DirectoryZimWriter {
    root: PathBuf,
    main_path: ZimPath,
    entries: Vec<EntrySidecar>,
    aliases: Vec<AliasSidecar>,
    seen: HashSet<ZimPath>,
}

impl DirectoryZimWriter {
    pub fn create(root: impl Into<PathBuf>, main_path: ZimPath, metadata: &ZimMetadata) -> Result<Self, ConverterError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ConverterError::Other(anyhow::anyhow!("creating output dir: {e}")))?;
        let metadata_path = root.join("metadata.json");
        let file = fs::File::create(&metadata_path)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("creating metadata.json: {e}")))?;
        serde_json::to_writer_pretty(file, metadata)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("writing metadata.json: {e}")))?;
        Ok(Self { root, main_path, entries: Vec::new(), aliases: Vec::new(), seen: HashSet::new() })
    }

    fn entry_fs_path(&self, path: &ZimPath) -> PathBuf {
        if path.is_directory() {
            self.root.join("content").join(path.as_str()).join("index.html")
        } else {
            self.root.join("content").join(path.as_str())
        }
    }

    fn flush_sidecars(&self) -> Result<(), ConverterError> {
        let entries_path = self.root.join("entries.json");
        let file = fs::File::create(&entries_path)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("creating entries.json: {e}")))?;
        serde_json::to_writer_pretty(file, &self.entries)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("writing entries.json: {e}")))?;

        let aliases_path = self.root.join("aliases.json");
        let file = fs::File::create(&aliases_path)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("creating aliases.json: {e}")))?;
        serde_json::to_writer_pretty(file, &self.aliases)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("writing aliases.json: {e}")))?;
        Ok(())
    }
}

impl ZimWriter for DirectoryZimWriter {
    fn add_item(&mut self, path: &ZimPath, mime: &str, bytes: &[u8], _hints: ItemHints) -> Result<(), ConverterError> {
        if !self.seen.insert(path.clone()) {
            return Err(ConverterError::DuplicateEntry(path.clone()));
        }
        let fs_path = self.entry_fs_path(path);
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConverterError::Other(anyhow::anyhow!("creating {parent:?}: {e}")))?;
        }
        fs::write(&fs_path, bytes).map_err(|e| ConverterError::Other(anyhow::anyhow!("writing {fs_path:?}: {e}")))?;
        self.entries.push(EntrySidecar { path: path.as_str().to_string(), mime: mime.to_string(), size: bytes.len() });
        Ok(())
    }

    fn add_alias(&mut self, from: &ZimPath, title: &str, to: &ZimPath, _hints: ItemHints) -> Result<(), ConverterError> {
        if !self.seen.contains(to) {
            return Err(ConverterError::AliasTargetMissing { from: from.clone(), to: to.clone() });
        }
        self.aliases.push(AliasSidecar { from: from.as_str().to_string(), title: title.to_string(), to: to.as_str().to_string() });
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), ConverterError> {
        self.flush_sidecars()?;
        let main_ptr = self.root.join("main_path.txt");
        fs::write(&main_ptr, self.main_path.as_str())
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("writing main_path.txt: {e}")))?;
        Ok(())
    }
}

/// Probe that `dir` is writable before starting any conversion work (spec
/// §4.10 "validate output writability (temp-file probe)").
pub fn probe_output_writable(dir: &Path) -> Result<(), ConverterError> {
    fs::create_dir_all(dir).map_err(|e| ConverterError::Other(anyhow::anyhow!("creating {dir:?}: {e}")))?;
    let probe = dir.join(".warc2zim-write-probe");
    fs::write(&probe, b"probe").map_err(|e| ConverterError::Other(anyhow::anyhow!("output dir not writable: {e}")))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ZimMetadata {
        ZimMetadata {
            name: "test".into(),
            language: "eng".into(),
            title: "Test".into(),
            description: "desc".into(),
            long_description: None,
            creator: "tester".into(),
            publisher: "warc2zim".into(),
            date: "2026-07-27".into(),
            tags: vec!["_ftindex:yes".into()],
            source: None,
            scraper: "warc2zim-rs".into(),
            illustration_48x48_png: Vec::new(),
        }
    }

    #[test]
    fn add_item_then_finish_writes_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = ZimPath::from_static("example.com/".to_string());
        let mut writer = DirectoryZimWriter::create(dir.path(), main_path.clone(), &metadata()).unwrap();
        writer.add_item(&main_path, "text/html", b"<html></html>", ItemHints::default()).unwrap();
        Box::new(writer).finish().unwrap();

        assert!(dir.path().join("metadata.json").is_file());
        assert!(dir.path().join("entries.json").is_file());
        assert!(dir.path().join("content/example.com/index.html").is_file());
    }

    #[test]
    fn duplicate_add_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = ZimPath::from_static("a/".to_string());
        let mut writer = DirectoryZimWriter::create(dir.path(), main_path.clone(), &metadata()).unwrap();
        writer.add_item(&main_path, "text/html", b"x", ItemHints::default()).unwrap();
        let err = writer.add_item(&main_path, "text/html", b"y", ItemHints::default()).unwrap_err();
        assert!(matches!(err, ConverterError::DuplicateEntry(_)));
    }

    #[test]
    fn alias_to_missing_target_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = ZimPath::from_static("a/".to_string());
        let mut writer = DirectoryZimWriter::create(dir.path(), main_path.clone(), &metadata()).unwrap();
        let missing = ZimPath::from_static("nowhere".to_string());
        let err = writer.add_alias(&main_path, "Title", &missing, ItemHints::default()).unwrap_err();
        assert!(matches!(err, ConverterError::AliasTargetMissing { .. }));
    }
}
