// =============================================================================
// Output file tree
// =============================================================================
//
// Directory listing of the analysis output, built on the blocking pool.
// Folders sort before files, then by name. Symlinks are listed but never
// followed.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{trace, warn};

use super::types::{FileKind, FileNode};

/// List `root` recursively. `None` when it is missing or not a directory.
pub async fn load_file_tree(root: &Path) -> Option<FileNode> {
    let root = root.to_path_buf();
    match tokio::task::spawn_blocking(move || build_tree(&root)).await {
        Ok(tree) => tree,
        Err(e) => {
            warn!("File tree task failed: {}", e);
            None
        }
    }
}

fn build_tree(root: &Path) -> Option<FileNode> {
    let metadata = fs::symlink_metadata(root).ok()?;
    if !metadata.is_dir() {
        return None;
    }
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    Some(folder_node(root, name))
}

fn folder_node(path: &Path, name: String) -> FileNode {
    let children = match list_children(path) {
        Ok(children) => children,
        Err(e) => {
            trace!(path = %path.display(), "Cannot list directory: {}", e);
            Vec::new()
        }
    };
    FileNode {
        name,
        kind: FileKind::Folder,
        size: 0,
        children,
    }
}

fn list_children(dir: &Path) -> io::Result<Vec<FileNode>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            children.push(folder_node(&entry.path(), name));
        } else {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            children.push(FileNode {
                name,
                kind: FileKind::File,
                size,
                children: Vec::new(),
            });
        }
    }

    children.sort_by(|a, b| {
        let a_is_file = a.kind == FileKind::File;
        let b_is_file = b.kind == FileKind::File;
        a_is_file.cmp(&b_is_file).then_with(|| a.name.cmp(&b.name))
    });
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tree_orders_folders_first() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("results/firefox")).unwrap();
        fs::create_dir_all(root.join("results/chromium/chrome/Default")).unwrap();
        fs::write(root.join("MANIFEST.json"), b"{}").unwrap();
        fs::write(root.join("CUSTODY_REPORT.json"), b"{}").unwrap();
        fs::write(root.join("results/firefox/firefox_history.json"), b"{\"a\": []}").unwrap();

        let tree = load_file_tree(root).await.unwrap();
        assert_eq!(tree.kind, FileKind::Folder);

        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["results", "CUSTODY_REPORT.json", "MANIFEST.json"]);
        assert_eq!(tree.file_count(), 3);

        let results = &tree.children[0];
        assert_eq!(results.children[0].name, "chromium");
        let history = &results.children[1].children[0];
        assert_eq!(history.size, 9);
    }

    #[tokio::test]
    async fn test_tree_of_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not_a_dir.json");
        fs::write(&file, b"{}").unwrap();
        assert!(load_file_tree(&file).await.is_none());
        assert!(load_file_tree(&temp_dir.path().join("missing")).await.is_none());
    }
}
