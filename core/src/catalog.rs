// stepline/src/catalog.rs

//! The step catalog: discovery, ordering and start/end filtering of step programs.

use crate::core::step::Step;
use crate::error::{PipelineError, PipelineResult};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{event, Level};

/// Two digits immediately before the final extension, e.g. `load_data_00.py`.
fn step_name_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\d{2}\.[^.]+$").expect("step name pattern is valid"))
}

/// Whether `file_name` follows the step naming convention.
pub fn is_step_name(file_name: &str) -> bool {
  step_name_pattern().is_match(file_name)
}

/// Whether `step` can be started: its extension has an interpreter in
/// `interpreters`, or the file itself is executable.
pub fn is_launchable(step: &Step, interpreters: &BTreeMap<String, String>) -> bool {
  if step.extension().is_some_and(|ext| interpreters.contains_key(&ext)) {
    return true;
  }
  is_executable(&step.path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  std::fs::metadata(path)
    .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

/// Lists the qualifying step programs in `steps_dir`, ordered by ordinal and
/// then file name. A missing directory yields no steps.
///
/// Steps write their outputs next to themselves, so a name that follows the
/// convention is not enough: the file must also be launchable.
pub fn list_steps(steps_dir: &Path, interpreters: &BTreeMap<String, String>) -> PipelineResult<Vec<Step>> {
  let entries = match std::fs::read_dir(steps_dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      event!(Level::WARN, dir = %steps_dir.display(), "Steps directory does not exist.");
      return Ok(Vec::new());
    }
    Err(e) => return Err(PipelineError::io(steps_dir, e)),
  };

  let mut steps = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|e| PipelineError::io(steps_dir, e))?;
    let file_type = entry.file_type().map_err(|e| PipelineError::io(entry.path(), e))?;
    if !file_type.is_file() && !(file_type.is_symlink() && entry.path().is_file()) {
      continue;
    }
    let Some(step) = Step::from_path(entry.path()) else {
      event!(Level::DEBUG, path = %entry.path().display(), "Skipping entry with a non UTF-8 name.");
      continue;
    };
    if !is_step_name(&step.file_name) {
      event!(Level::TRACE, file = %step.file_name, "Not a step program.");
    } else if !is_launchable(&step, interpreters) {
      event!(Level::DEBUG, file = %step.file_name, "Skipping file with no interpreter that is not executable.");
    } else {
      steps.push(step);
    }
  }

  sort_steps(&mut steps);
  event!(Level::DEBUG, dir = %steps_dir.display(), count = steps.len(), "Steps discovered.");
  Ok(steps)
}

/// Orders by ordinal, ties by file name. Stable.
pub fn sort_steps(steps: &mut [Step]) {
  steps.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.file_name.cmp(&b.file_name)));
}

/// Narrows an ordered step list to the inclusive `[start, end]` ordinal range.
///
/// A `start` that no step meets or exceeds is a resolution error. An `end`
/// below every remaining step just yields an empty plan; whether that is fatal
/// is the caller's call.
pub fn filter(steps: Vec<Step>, start: Option<u64>, end: Option<u64>) -> PipelineResult<Vec<Step>> {
  let mut steps = steps;

  if let Some(start) = start {
    match steps.iter().position(|s| s.ordinal.at_least(start)) {
      Some(first) => {
        steps.drain(..first);
      }
      None => {
        event!(Level::DEBUG, start, "No script found for starting step.");
        return Err(PipelineError::StepResolution { start });
      }
    }
  }

  if let Some(end) = end {
    if let Some(past_end) = steps.iter().position(|s| !s.ordinal.at_most(end)) {
      steps.truncate(past_end);
    }
  }

  Ok(steps)
}
