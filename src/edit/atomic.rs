use crate::edit::errors::EditError;
use std::io::Write;
use std::path::Path;

/// Atomic file write: tempfile + fsync + rename, then an mtime bump.
///
/// Either the full write lands or the target is left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(EditError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path has no parent directory",
                ),
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| EditError::io(path, e))?;
    temp.write_all(content).map_err(|e| EditError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| EditError::io(path, e))?;
    if let Ok(meta) = std::fs::metadata(path) {
        // Keep the target's permissions across the rename
        temp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| EditError::io(path, e))?;
    }
    temp.persist(path).map_err(|e| EditError::io(path, e.error))?;

    filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(|e| EditError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("mod.py");
        fs::write(&file_path, b"original content").unwrap();

        atomic_write(&file_path, b"modified").unwrap();
        assert_eq!(fs::read(&file_path).unwrap(), b"modified");
    }

    #[test]
    fn test_atomic_write_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("new_copy.py");

        atomic_write(&file_path, b"x = 1\n").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_atomic_write_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("absent").join("mod.py");

        let result = atomic_write(&file_path, b"x");
        assert!(matches!(result, Err(EditError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("run.py");
        fs::write(&file_path, b"print()").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o755)).unwrap();

        atomic_write(&file_path, b"print(1)").unwrap();
        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
