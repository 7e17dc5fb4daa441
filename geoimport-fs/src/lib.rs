//! Capability-based file access for local imports and CLI output.
//!
//! Files are opened through `cap-std` directories resolved from ambient
//! authority, and paths are `camino` UTF-8 paths throughout.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use geoimport_core::ImportFile;
use std::io;
use std::path::Component;

/// Resolve the directory holding `path` and return it with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Return whether a path exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read a local file into an [`ImportFile`] named after its last path
/// component.
///
/// Format detection then works from the extension exactly as it does for
/// uploads.
pub fn read_import_file(path: &Utf8Path) -> io::Result<ImportFile> {
    let (dir, name) = open_dir_and_file(path)?;
    let bytes = dir.read(name.as_str())?;
    Ok(ImportFile::new(name, bytes))
}

/// Read a UTF-8 text file, such as importer settings.
pub fn read_text(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read_to_string(name.as_str())
}

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    dir.write(name.as_str(), contents)
}

/// Ensure the parent directory for `path` exists, handling absolute paths
/// for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Split a parent path into an ambient base directory and a relative suffix.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimport_core::{ImportFormat, detect_file_format};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workdir() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, path)
    }

    #[rstest]
    fn reads_import_file_with_its_name(workdir: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workdir;
        let path = root.join("benches.geojson");
        std::fs::write(&path, br#"{"type":"FeatureCollection","features":[]}"#)
            .expect("write fixture");

        let file = read_import_file(&path).expect("read file");
        assert_eq!(file.name, "benches.geojson");
        assert_eq!(detect_file_format(&file), Some(ImportFormat::GeoJson));
        assert!(file.text().starts_with("{\"type\""));
    }

    #[rstest]
    fn write_creates_parent_directories(workdir: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workdir;
        let path = root.join("out/nested/report.json");
        write_file(&path, b"{}").expect("write report");
        assert!(file_is_file(&path).expect("stat report"));
        assert_eq!(read_text(&path).expect("read back"), "{}");
    }

    #[rstest]
    fn missing_and_directory_paths_are_not_files(workdir: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workdir;
        assert!(!file_is_file(&root.join("absent.csv")).expect("stat absent"));
        std::fs::create_dir(root.join("folder")).expect("create folder");
        assert!(!file_is_file(&root.join("folder")).expect("stat folder"));
    }

    #[rstest]
    fn missing_file_fails_to_read(workdir: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workdir;
        let err = read_import_file(&root.join("absent.gpx")).expect_err("file is absent");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
