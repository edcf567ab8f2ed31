// stepline/src/core/step.rs

//! Defines a discovered step program and the ordering key parsed from its name.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Ordering key of a step, taken from the first run of digits in the file stem.
///
/// Steps whose stem carries no digits (or a digit run too large to represent)
/// are `Unnumbered` and sort after every numbered step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordinal {
  Numbered(u64),
  Unnumbered,
}

impl Ordinal {
  /// Parses the first maximal run of ASCII digits in `stem`.
  pub fn from_stem(stem: &str) -> Self {
    let digits: String = stem
      .chars()
      .skip_while(|c| !c.is_ascii_digit())
      .take_while(|c| c.is_ascii_digit())
      .collect();
    match digits.parse::<u64>() {
      Ok(n) => Ordinal::Numbered(n),
      Err(_) => Ordinal::Unnumbered,
    }
  }

  pub fn value(&self) -> Option<u64> {
    match self {
      Ordinal::Numbered(n) => Some(*n),
      Ordinal::Unnumbered => None,
    }
  }

  /// `self >= bound`, with `Unnumbered` behaving as infinity.
  pub fn at_least(&self, bound: u64) -> bool {
    self.value().map_or(true, |n| n >= bound)
  }

  /// `self <= bound`, with `Unnumbered` behaving as infinity.
  pub fn at_most(&self, bound: u64) -> bool {
    self.value().map_or(false, |n| n <= bound)
  }
}

impl Ord for Ordinal {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Ordinal::Numbered(a), Ordinal::Numbered(b)) => a.cmp(b),
      (Ordinal::Numbered(_), Ordinal::Unnumbered) => Ordering::Less,
      (Ordinal::Unnumbered, Ordinal::Numbered(_)) => Ordering::Greater,
      (Ordinal::Unnumbered, Ordinal::Unnumbered) => Ordering::Equal,
    }
  }
}

impl PartialOrd for Ordinal {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for Ordinal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Ordinal::Numbered(n) => write!(f, "{}", n),
      Ordinal::Unnumbered => f.write_str("inf"),
    }
  }
}

/// One step program discovered in the steps directory.
///
/// Identity is the file path. Steps are rediscovered on every run and never
/// change once discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub path: PathBuf,
  pub file_name: String,
  pub ordinal: Ordinal,
}

impl Step {
  /// Builds a step from a path, or `None` when the path has no UTF-8 file name.
  pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
    let path = path.into();
    let file_name = path.file_name()?.to_str()?.to_string();
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let ordinal = Ordinal::from_stem(stem);
    Some(Step {
      path,
      file_name,
      ordinal,
    })
  }

  /// Extension used to pick an interpreter, lowercased.
  pub fn extension(&self) -> Option<String> {
    self
      .path
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase())
  }

  /// Directory the step program lives in; used as its working directory.
  pub fn working_dir(&self) -> &Path {
    self.path.parent().unwrap_or_else(|| Path::new("."))
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path.display())
  }
}
