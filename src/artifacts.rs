//! The directory holding intermediate compiler outputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    /// Start from an empty directory at `root`, removing any previous contents.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            fs::remove_dir_all(&root)
                .with_context(|| format!("clearing artifacts directory {}", root.display()))?;
        }
        fs::create_dir_all(&root)
            .with_context(|| format!("creating artifacts directory {}", root.display()))?;
        debug!(path = %root.display(), "prepared artifacts directory");
        Ok(Self { root })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_text(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
        Ok(path)
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("serialising {name}"))?;
        self.write_text(name, &json)
    }

    pub fn cleanup(self) -> Result<()> {
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("removing artifacts directory {}", self.root.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_clears_stale_files() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("artifacts");
        fs::create_dir_all(&root)?;
        fs::write(root.join("stale.ll"), "old")?;

        let dir = ArtifactDir::prepare(&root)?;
        assert!(!dir.path("stale.ll").exists());

        dir.write_json("tokens.json", &["a", "b"])?;
        let written = fs::read_to_string(dir.path("tokens.json"))?;
        assert!(written.contains("\"a\""));
        Ok(())
    }

    #[test]
    fn cleanup_removes_directory() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = ArtifactDir::prepare(tmp.path().join("out"))?;
        dir.write_text("output.ll", "; empty")?;
        let root = dir.root().to_path_buf();
        dir.cleanup()?;
        assert!(!root.exists());
        Ok(())
    }
}
