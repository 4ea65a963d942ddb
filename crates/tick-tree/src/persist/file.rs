//! File-based storage of tree and runtime blobs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TreeError};
use crate::persist::NodeRegistry;
use crate::tree::BehaviorTree;

/// Stores the two blobs of each tree as bincode files indexed by tree ID.
///
/// # File Format
///
/// - `tree_{id}.bin`: the static tree
/// - `runtime_{id}.bin`: the runtime state of the same tree
///
/// Writes go to a temporary file first and are then renamed into place.
/// Empty tree IDs and IDs containing a path separator are rejected with
/// [`TreeError::InvalidTreeId`].
#[derive(Debug, Clone)]
pub struct TreeFileStore {
    base_dir: PathBuf,
}

impl TreeFileStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn tree_path(&self, tree_id: &str) -> Result<PathBuf> {
        check_tree_id(tree_id)?;
        Ok(self.base_dir.join(format!("tree_{}.bin", tree_id)))
    }

    fn runtime_path(&self, tree_id: &str) -> Result<PathBuf> {
        check_tree_id(tree_id)?;
        Ok(self.base_dir.join(format!("runtime_{}.bin", tree_id)))
    }

    pub fn save_tree<C>(&self, tree: &BehaviorTree<C>) -> Result<()> {
        let path = self.tree_path(tree.id())?;
        write_atomic(&path, &tree.save()?)?;
        tracing::debug!("Saved tree[{}] to {}", tree.id(), path.display());
        Ok(())
    }

    /// Loads tree `tree_id` into `tree`. Returns `false` if it was never saved.
    pub fn load_tree<C>(
        &self,
        tree_id: &str,
        tree: &mut BehaviorTree<C>,
        registry: &NodeRegistry<C>,
    ) -> Result<bool> {
        let path = self.tree_path(tree_id)?;
        if !path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(&path)?;
        tree.load(&bytes, registry)?;
        tracing::debug!("Loaded tree[{}] from {}", tree_id, path.display());
        Ok(true)
    }

    pub fn save_runtime<C>(&self, tree: &BehaviorTree<C>) -> Result<()> {
        let path = self.runtime_path(tree.id())?;
        write_atomic(&path, &tree.save_runtime()?)?;
        tracing::debug!("Saved runtime[{}] to {}", tree.id(), path.display());
        Ok(())
    }

    /// Loads the saved runtime of `tree`. Returns `false` if there is none.
    pub fn load_runtime<C>(&self, tree: &mut BehaviorTree<C>) -> Result<bool> {
        let path = self.runtime_path(tree.id())?;
        if !path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(&path)?;
        tree.load_runtime(&bytes)?;
        tracing::debug!("Loaded runtime[{}] from {}", tree.id(), path.display());
        Ok(true)
    }

    pub fn exists(&self, tree_id: &str) -> bool {
        self.tree_path(tree_id).is_ok_and(|path| path.exists())
    }

    /// Removes both blobs of `tree_id`, if present.
    pub fn delete(&self, tree_id: &str) -> Result<()> {
        for path in [self.tree_path(tree_id)?, self.runtime_path(tree_id)?] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        tracing::debug!("Deleted tree[{}]", tree_id);
        Ok(())
    }

    /// IDs of every saved tree, sorted.
    pub fn list_trees(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(id) = filename
                    .strip_prefix("tree_")
                    .and_then(|s| s.strip_suffix(".bin"))
            {
                ids.push(id.to_owned());
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }
}

fn check_tree_id(tree_id: &str) -> Result<()> {
    if tree_id.is_empty() || tree_id.contains(['/', '\\', '\0']) {
        return Err(TreeError::InvalidTreeId(tree_id.to_owned()));
    }
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("bin.tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::TreeRecord;
    use tempfile::TempDir;

    struct TestContext;

    #[test]
    fn missing_files_load_nothing() {
        let dir = TempDir::new().unwrap();
        let store = TreeFileStore::new(dir.path()).unwrap();
        let registry = NodeRegistry::<TestContext>::new();
        let mut tree = BehaviorTree::new();

        assert!(!store.load_tree("absent", &mut tree, &registry).unwrap());
        assert!(!store.load_runtime(&mut tree).unwrap());
        assert!(store.list_trees().unwrap().is_empty());
    }

    #[test]
    fn saved_trees_are_listed_and_deleted() {
        let dir = TempDir::new().unwrap();
        let store = TreeFileStore::new(dir.path().join("trees")).unwrap();

        let mut tree =
            BehaviorTree::<TestContext>::new().with_id_generator(crate::id::sequential("t"));
        let root = tree.sequence("root");
        tree.set_root_node(root);
        store.save_tree(&tree).unwrap();
        store.save_runtime(&tree).unwrap();

        assert_eq!(store.list_trees().unwrap(), vec!["t-1".to_owned()]);
        assert!(store.exists("t-1"));

        store.delete("t-1").unwrap();
        assert!(!store.exists("t-1"));
        assert!(store.list_trees().unwrap().is_empty());
    }

    #[test]
    fn tree_ids_that_escape_the_directory_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = TreeFileStore::new(dir.path().join("trees")).unwrap();
        let record = TreeRecord {
            tree_id: "../escape".into(),
            root_id: None,
            nodes: Vec::new(),
        };
        let mut tree = BehaviorTree::<TestContext>::new();
        tree.load_record(&record, &NodeRegistry::new()).unwrap();

        assert!(matches!(
            store.save_tree(&tree),
            Err(TreeError::InvalidTreeId(id)) if id == "../escape"
        ));
        assert!(matches!(
            store.load_tree("a\\..\\b", &mut tree, &NodeRegistry::new()),
            Err(TreeError::InvalidTreeId(_))
        ));
        assert!(!store.exists("a/b"));
        assert!(store.delete("").is_err());
        assert!(!dir.path().join("tree_escape.bin").exists());
        assert!(store.list_trees().unwrap().is_empty());
    }
}
