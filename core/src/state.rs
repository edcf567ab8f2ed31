// stepline/src/state.rs

//! The state handoff: an opaque blob moved from step to step through a file.
//!
//! The orchestrator never looks inside the blob. Only the step programs agree
//! on its shape.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

/// Opaque pipeline-wide working data.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StateBlob(Vec<u8>);

impl StateBlob {
  pub fn new(bytes: Vec<u8>) -> Self {
    StateBlob(bytes)
  }

  /// The sentinel written before the first step: zero bytes.
  pub fn empty() -> Self {
    StateBlob(Vec::new())
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

// Blobs can be large and are meaningless to us; only show the size.
impl std::fmt::Debug for StateBlob {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "StateBlob({} bytes)", self.0.len())
  }
}

/// Location of the state artifact shared by every step of a run.
#[derive(Debug, Clone)]
pub struct StateHandoff {
  path: PathBuf,
}

impl StateHandoff {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Reads the artifact. A missing file is `Ok(None)`.
  pub async fn read(&self) -> std::io::Result<Option<StateBlob>> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => {
        event!(Level::TRACE, path = %self.path.display(), bytes = bytes.len(), "State artifact read.");
        Ok(Some(StateBlob(bytes)))
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// Replaces the artifact with `blob`.
  pub async fn write(&self, blob: &StateBlob) -> std::io::Result<()> {
    tokio::fs::write(&self.path, blob.as_bytes()).await?;
    event!(Level::TRACE, path = %self.path.display(), bytes = blob.len(), "State artifact written.");
    Ok(())
  }
}
