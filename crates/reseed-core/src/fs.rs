use std::path::Path;

/// Non-failing readability probe: true if `path` can be opened for reading.
pub async fn is_accessible(path: &Path) -> bool {
    tokio::fs::File::open(path).await.is_ok()
}

/// Create `path`'s parent directory (recursively, idempotent).
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_reports_missing_and_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.db");
        assert!(!is_accessible(&file).await);

        std::fs::write(&file, b"x").unwrap();
        assert!(is_accessible(&file).await);
    }

    #[tokio::test]
    async fn parent_dir_is_created_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/c/data.db");
        ensure_parent_dir(&file).await.unwrap();
        ensure_parent_dir(&file).await.unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }
}
