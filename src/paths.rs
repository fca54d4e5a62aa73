//! Path Resolver: output naming, directory creation and atomic writes.
//!
//! ## Why atomic writes?
//!
//! A codec that fails halfway would otherwise leave a truncated file at the
//! destination that looks like a successful conversion. Every output is
//! written to a temp file in the destination directory first and renamed into
//! place only once complete, so a non-success result always means "no output
//! file".

use crate::error::ConvertError;
use crate::format::{extension_of, normalize_token, FormatSpec};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Input base name without its extension (`"a/b/photo.png"` → `"photo"`).
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Create `dir` and all missing parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), ConvertError> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| ConvertError::write(dir, e))
}

/// Compute `<output_dir or input dir>/<input stem>.<format>` and create the directory.
pub fn resolve_output_path(
    input_path: &Path,
    output_dir: Option<&Path>,
    output_format: &str,
) -> Result<PathBuf, ConvertError> {
    let dir = match output_dir {
        Some(d) => d.to_path_buf(),
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    ensure_dir(&dir)?;

    let name = format!("{}.{}", file_stem(input_path), normalize_token(output_format));
    let path = dir.join(name);
    debug!("Resolved output path {}", path.display());
    Ok(path)
}

/// Use an explicit caller path verbatim, creating only its parent directory.
pub fn prepare_explicit_output(output_path: &Path) -> Result<PathBuf, ConvertError> {
    if let Some(parent) = output_path.parent() {
        ensure_dir(parent)?;
    }
    Ok(output_path.to_path_buf())
}

/// Write `bytes` to `path` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".convert-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| ConvertError::write(path, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ConvertError::write(path, e))?;
    // On failure the temp file is removed when `PersistError` drops.
    tmp.persist(path).map_err(|e| ConvertError::write(path, e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Regular files directly inside `dir` whose extension is in `spec`, sorted.
pub fn collect_inputs(dir: &Path, spec: &FormatSpec) -> Result<Vec<PathBuf>, ConvertError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConvertError::Unreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| extension_of(p).is_some_and(|e| spec.contains(&e)))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IMAGE_FORMATS;

    #[test]
    fn output_beside_input_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("holiday.png");
        let out = resolve_output_path(&input, None, ".JPG").unwrap();
        assert_eq!(out, dir.path().join("holiday.jpg"));
    }

    #[test]
    fn output_dir_is_created_recursively_and_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.md");
        let target = dir.path().join("x/y/z");

        let out = resolve_output_path(&input, Some(&target), "html").unwrap();
        assert!(target.is_dir());
        assert_eq!(out, target.join("a.html"));

        // Second call must not fail on the existing directory.
        resolve_output_path(&input, Some(&target), "html").unwrap();
    }

    #[test]
    fn explicit_output_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("deep/Custom.Name.JPEG");
        let out = prepare_explicit_output(&explicit).unwrap();
        assert_eq!(out, explicit);
        assert!(dir.path().join("deep").is_dir());
    }

    #[test]
    fn uncreatable_dir_is_io_write() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let err = ensure_dir(&blocker.join("sub")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IoWrite);
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.bin");
        write_atomic(&out, b"hello").unwrap();
        write_atomic(&out, b"again").unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"again");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "stray files: {names:?}");
    }

    #[test]
    fn collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", "d.gif"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.png")).unwrap();

        let files = collect_inputs(dir.path(), &IMAGE_FORMATS).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_stem(p)).collect();
        assert_eq!(names, vec!["a", "b", "d"]);
    }
}
