//! Blocking recursive directory copy, run off the async executor via
//! `spawn_blocking`. Neither `std::fs` nor `tokio::fs` offers a recursive
//! directory copy directly.

use std::path::{Path, PathBuf};

fn copy_dir_blocking(src: &Path, dst: &Path) -> std::io::Result<u64> {
    std::fs::create_dir_all(dst)?;
    let mut total = 0u64;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dst_path = dst.join(entry.file_name());
        if file_type.is_dir() {
            total += copy_dir_blocking(&entry.path(), &dst_path)?;
        } else if file_type.is_file() {
            total += std::fs::copy(entry.path(), &dst_path)?;
        }
    }
    Ok(total)
}

/// Copy `src` to `dst` recursively, returning total bytes copied.
pub async fn copy_dir(src: PathBuf, dst: PathBuf) -> std::io::Result<u64> {
    tokio::task::spawn_blocking(move || copy_dir_blocking(&src, &dst))
        .await
        .unwrap_or_else(|join_err| Err(std::io::Error::other(join_err)))
}

fn dir_size_blocking(path: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size_blocking(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Total size in bytes of everything under `path`.
pub async fn dir_size(path: PathBuf) -> std::io::Result<u64> {
    tokio::task::spawn_blocking(move || dir_size_blocking(&path))
        .await
        .unwrap_or_else(|join_err| Err(std::io::Error::other(join_err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_nested_files_and_reports_size() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("nested")).unwrap();
        std::fs::write(src.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(src.path().join("nested/b.txt"), b"world!").unwrap();

        let copied = copy_dir(src.path().to_path_buf(), dst.path().join("snap")).await.unwrap();
        assert_eq!(copied, 11);
        assert!(dst.path().join("snap/nested/b.txt").exists());
    }
}
