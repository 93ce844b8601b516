//! On-disk layout of indexes inside a workspace.

use std::path::{Path, PathBuf};

/// Get the directory holding one named index.
pub fn get_index_dir(workspace: &Path, index_name: &str) -> PathBuf {
    workspace.join(".charter").join("index").join(index_name)
}

/// Get the SQLite index path for a named index.
pub fn get_index_path(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("index.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path_layout() {
        let path = get_index_path(Path::new("/ws"), "constitution");
        assert_eq!(
            path,
            PathBuf::from("/ws/.charter/index/constitution/index.sqlite")
        );
    }
}
