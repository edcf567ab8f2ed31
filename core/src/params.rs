// stepline/src/params.rs

//! The parameter store: a flat key/value set built from the report's TOML
//! config and accumulated across the steps of a run through a JSON artifact.

use crate::error::{PipelineError, PipelineResult};
use anyhow::Context as _;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

/// Bootstrap key holding the resolved path of the config file the set was
/// built from, so steps can re-read it without re-deriving its location.
pub const CONFIG_PATH_KEY: &str = "report_config_file_path";

/// Flat, insertion-ordered string parameters shared by all steps of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(IndexMap<String, String>);

impl ParameterSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  /// Inserts or overwrites `key`. An overwritten key keeps its position.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    self.0.insert(key.into(), value.into())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    ParameterSet(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

/// Reads and flattens the config file at `config_path`.
pub fn build(config_path: &Path) -> PipelineResult<ParameterSet> {
  if !config_path.is_file() {
    return Err(PipelineError::config(
      config_path,
      "the config file does not exist",
    ));
  }
  let source = std::fs::read_to_string(config_path)
    .map_err(|e| PipelineError::config(config_path, format!("unreadable: {}", e)))?;
  build_from_str(&source, config_path)
}

/// Flattens TOML `source` into a parameter set.
///
/// Every table is a section. Sections are applied in file order, so a key in
/// a later section overwrites the same key from an earlier one. Scalars outside
/// any table form an implicit leading section.
pub fn build_from_str(source: &str, config_path: &Path) -> PipelineResult<ParameterSet> {
  let doc: toml::Table = source
    .parse()
    .map_err(|e: toml::de::Error| PipelineError::config(config_path, e.message().to_string()))?;

  let mut params = ParameterSet::new();
  params.insert(CONFIG_PATH_KEY, config_path.display().to_string());

  let (sections, loose): (Vec<_>, Vec<_>) = doc.iter().partition(|(_, v)| v.is_table());

  for (key, value) in loose {
    params.insert(key.clone(), render_scalar(key, value, config_path)?);
  }
  for (section, table) in sections {
    // partition above guarantees a table here
    let Some(table) = table.as_table() else { continue };
    for (key, value) in table {
      if value.is_table() {
        return Err(PipelineError::config(
          config_path,
          format!("nested table '{}.{}' cannot be flattened", section, key),
        ));
      }
      params.insert(key.clone(), render_scalar(key, value, config_path)?);
    }
  }

  event!(Level::DEBUG, config = %config_path.display(), count = params.len(), "Parameter set built.");
  Ok(params)
}

fn render_scalar(key: &str, value: &toml::Value, config_path: &Path) -> PipelineResult<String> {
  match value {
    toml::Value::String(s) => Ok(s.clone()),
    toml::Value::Table(_) => Err(PipelineError::config(
      config_path,
      format!("key '{}' is a table, expected a value", key),
    )),
    other => Ok(other.to_string()),
  }
}

/// Combines a step's freshly computed parameters with what earlier steps of
/// the run already persisted.
///
/// NOTE: the persisted values win. A step cannot overwrite a key set by an
/// earlier step through its fresh defaults; this is easy to read backwards.
pub fn merge(fresh: ParameterSet, persisted: ParameterSet) -> ParameterSet {
  let mut merged = fresh;
  for (key, value) in persisted.0 {
    merged.0.insert(key, value);
  }
  merged
}

/// The on-disk parameter artifact of a run.
#[derive(Debug, Clone)]
pub struct ParamStore {
  path: PathBuf,
}

impl ParamStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Loads the persisted set, `None` if no step has persisted one yet.
  pub async fn load(&self) -> anyhow::Result<Option<ParameterSet>> {
    let raw = match tokio::fs::read(&self.path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
    };
    let params = serde_json::from_slice(&raw)
      .with_context(|| format!("parameter artifact {} is not a JSON object of strings", self.path.display()))?;
    Ok(Some(params))
  }

  /// Merges `fresh` under whatever is already persisted and writes the union back.
  pub async fn persist_merged(&self, fresh: ParameterSet) -> anyhow::Result<ParameterSet> {
    let merged = match self.load().await? {
      Some(persisted) => merge(fresh, persisted),
      None => fresh,
    };
    let json = serde_json::to_vec_pretty(&merged)?;
    tokio::fs::write(&self.path, json)
      .await
      .with_context(|| format!("writing {}", self.path.display()))?;
    event!(Level::TRACE, path = %self.path.display(), count = merged.len(), "Parameter artifact persisted.");
    Ok(merged)
  }

  /// Removes an artifact left behind by an earlier run.
  pub fn clear_stale(&self) -> std::io::Result<bool> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e),
    }
  }
}
