use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;

use crate::{errors::Error, selector::NonEmpty, Result};

/// Entries whose name starts with this are never offered.
pub const HIDDEN_MARKER: char = '.';

/// One selectable problem file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

/// What a category token resolves to at the moment of the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryState {
    /// No backing collection exists for the token.
    Missing,
    /// The collection exists but has no visible entries.
    Empty,
    Ready(NonEmpty<Artifact>),
}

/// Source of category contents.
///
/// Implementations must re-enumerate on every call: problem sets are edited
/// while the bot runs.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<CategoryState>;

    async fn load(&self, artifact: &Artifact) -> Result<Vec<u8>>;
}

/// Catalog backed by `<root>/<token>/<file>`.
#[derive(Clone, Debug)]
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn category_dir(&self, token: &str) -> Option<PathBuf> {
        let mut components = Path::new(token).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == token => Some(self.root.join(name)),
            _ => None,
        }
    }
}

#[async_trait]
impl Catalog for DirCatalog {
    async fn resolve(&self, token: &str) -> Result<CategoryState> {
        let token = token.to_lowercase();
        let Some(dir) = self.category_dir(&token) else {
            return Ok(CategoryState::Missing);
        };

        match tokio::fs::metadata(&dir).await {
            Ok(md) if md.is_dir() => {}
            Ok(_) => return Ok(CategoryState::Missing),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CategoryState::Missing),
            Err(e) => return Err(e.into()),
        }

        let mut rd = tokio::fs::read_dir(&dir).await?;

        let mut items = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(HIDDEN_MARKER) {
                continue;
            }
            // Follows symlinks; dangling links and subdirectories are not artifacts.
            let is_file = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            items.push(Artifact {
                name,
                path: entry.path(),
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(match NonEmpty::new(items) {
            Some(items) => CategoryState::Ready(items),
            None => CategoryState::Empty,
        })
    }

    async fn load(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| Error::InvalidPath {
                path: artifact.path.clone(),
                reason: e.to_string(),
            })
    }
}
