use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never a
/// partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));

    // Temp file lives next to the target so the rename stays on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Write only when the file content differs from `bytes`.
///
/// Returns `true` when the file was (re)written.
///
/// # Errors
/// Returns an error if the write fails.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    if fs::read(path).is_ok_and(|existing| existing == bytes) {
        return Ok(false);
    }
    atomic_write(path, bytes)?;
    Ok(true)
}

/// Path of the staging directory used while publishing `target`.
#[must_use]
pub fn staging_dir_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("out");
    target.with_file_name(format!(".{name}.staging.{}", std::process::id()))
}

/// Replace `target` with the fully written `staging` directory.
///
/// The previous `target` (if any) is moved aside first and removed only after
/// the staging directory took its place.
///
/// # Errors
/// Returns an error if any rename fails. On failure the previous directory is
/// restored when possible.
pub fn replace_dir(staging: &Path, target: &Path) -> io::Result<()> {
    let backup = target.with_file_name(format!(
        ".{}.old.{}",
        target.file_name().and_then(|n| n.to_str()).unwrap_or("out"),
        std::process::id()
    ));

    let had_previous = target.exists();
    if had_previous {
        fs::rename(target, &backup)?;
    }

    if let Err(e) = fs::rename(staging, target) {
        if had_previous {
            let _ = fs::rename(&backup, target);
        }
        return Err(e);
    }

    if had_previous {
        fs::remove_dir_all(&backup)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_overwrites_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");

        atomic_write(&path, b"hello").unwrap();
        atomic_write(&path, b"world").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "world");

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_if_changed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("App.module.scss.d.ts");

        assert!(write_if_changed(&path, b"a").unwrap());
        assert!(!write_if_changed(&path, b"a").unwrap());
        assert!(write_if_changed(&path, b"b").unwrap());
    }

    #[test]
    fn test_replace_dir_swaps_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("dist");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("stale.js"), "old").unwrap();

        let staging = staging_dir_for(&target);
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("main-bundle.js"), "new").unwrap();

        replace_dir(&staging, &target).unwrap();

        assert!(!target.join("stale.js").exists());
        assert_eq!(
            fs::read_to_string(target.join("main-bundle.js")).unwrap(),
            "new"
        );
        assert!(!staging.exists());
        // Only `dist` remains in the parent
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_replace_dir_without_previous_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("dist");
        let staging = staging_dir_for(&target);
        fs::create_dir(&staging).unwrap();

        replace_dir(&staging, &target).unwrap();
        assert!(target.is_dir());
    }
}
