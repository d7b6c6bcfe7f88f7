//! File-level driver: finds `.jack` sources and writes their `.vm` output
//! next to them.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{CompileError, CompileOptions, tokenizer};

#[derive(Debug, Snafu)]
pub enum DriverError {
  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("{}:{source}", path.display()))]
  Compile { path: PathBuf, source: CompileError },

  #[snafu(display("cannot list {}: {source}", path.display()))]
  Discover {
    path: PathBuf,
    source: walkdir::Error,
  },
}

/// Outcome of compiling every file under one input.
#[derive(Debug, Default)]
pub struct Report {
  /// Written `.vm` paths, in compile order.
  pub compiled: Vec<PathBuf>,
  pub failed: Vec<DriverError>,
}

impl Report {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

/// A single file compiles alone; a directory contributes every `.jack` file
/// directly inside it, in name order.
pub fn discover(input: &Path) -> Result<Vec<PathBuf>, DriverError> {
  if !input.is_dir() {
    return Ok(vec![input.to_path_buf()]);
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(input)
    .min_depth(1)
    .max_depth(1)
    .sort_by_file_name()
  {
    let entry = entry.context(DiscoverSnafu { path: input })?;
    let is_jack = entry.path().extension().is_some_and(|ext| ext == "jack");
    if entry.file_type().is_file() && is_jack {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

/// Outputs are written only once the class compiled completely, so a failed
/// compile never leaves a truncated `.vm` behind.
pub fn compile_file(
  path: &Path,
  options: CompileOptions,
  tokens: bool,
) -> Result<PathBuf, DriverError> {
  let source = fs::read_to_string(path).context(ReadSourceSnafu { path })?;
  let vm = crate::compile_with(&source, options).context(CompileSnafu { path })?;

  if tokens {
    let xml = tokenizer::tokens_xml(&source).context(CompileSnafu { path })?;
    let stem = path
      .file_stem()
      .map(|stem| stem.to_string_lossy())
      .unwrap_or_default();
    let xml_path = path.with_file_name(format!("{stem}T.xml"));
    fs::write(&xml_path, xml).context(WriteOutputSnafu { path: &xml_path })?;
  }

  let out = path.with_extension("vm");
  fs::write(&out, vm).context(WriteOutputSnafu { path: &out })?;
  Ok(out)
}

/// Compile every discovered file. A failing file is recorded and the batch
/// moves on; only a failed directory listing stops it early.
pub fn compile_all(
  input: &Path,
  options: CompileOptions,
  tokens: bool,
) -> Result<Report, DriverError> {
  let files = discover(input)?;
  if files.is_empty() {
    warn!(input = %input.display(), "no .jack files found");
  }

  let mut report = Report::default();
  for path in &files {
    match compile_file(path, options, tokens) {
      Ok(out) => {
        info!(output = %out.display(), "compiled {}", path.display());
        report.compiled.push(out);
      }
      Err(err) => report.failed.push(err),
    }
  }
  if !report.is_success() {
    warn!(failed = report.failed.len(), total = files.len(), "compilation failed");
  }
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const GOOD: &str = "class Good { function void main() { return; } }";
  const BAD: &str = "class Bad { function void main() { let = 1; } }";

  fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
  }

  #[test]
  fn bad_file_fails_without_output_and_batch_continues() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Bad.jack", BAD);
    write(dir.path(), "Good.jack", GOOD);

    let report = compile_all(dir.path(), CompileOptions::default(), false).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.compiled, [dir.path().join("Good.vm")]);
    assert_eq!(report.failed.len(), 1);
    match &report.failed[0] {
      DriverError::Compile { path, source } => {
        assert_eq!(path, &dir.path().join("Bad.jack"));
        assert!(matches!(source, CompileError::Syntax { .. }));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("Bad.vm").exists());
    let vm = fs::read_to_string(dir.path().join("Good.vm")).unwrap();
    assert_eq!(vm, "function Good.main 0\npush constant 0\nreturn\n");
  }

  #[test]
  fn discovery_skips_nested_dirs_and_other_extensions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Zeta.jack", GOOD);
    write(dir.path(), "Alpha.jack", GOOD);
    write(dir.path(), "notes.txt", "not a class");
    let nested = dir.path().join("lib");
    fs::create_dir(&nested).unwrap();
    write(&nested, "Inner.jack", GOOD);
    fs::create_dir(dir.path().join("Dir.jack")).unwrap();

    let files = discover(dir.path()).unwrap();

    assert_eq!(
      files,
      [dir.path().join("Alpha.jack"), dir.path().join("Zeta.jack")]
    );
  }

  #[test]
  fn single_file_input_is_compiled_alone() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "Good.jack", GOOD);
    write(dir.path(), "Other.jack", GOOD);

    let report = compile_all(&path, CompileOptions::default(), false).unwrap();

    assert!(report.is_success());
    assert_eq!(report.compiled, [dir.path().join("Good.vm")]);
    assert!(!dir.path().join("Other.vm").exists());
  }

  #[test]
  fn tokens_flag_writes_listing_next_to_source() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "Good.jack", GOOD);

    compile_file(&path, CompileOptions::default(), true).unwrap();

    let xml = fs::read_to_string(dir.path().join("GoodT.xml")).unwrap();
    assert!(xml.starts_with("<tokens>\n<keyword> class </keyword>\n"));
    assert!(xml.ends_with("</tokens>\n"));
  }

  #[test]
  fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = compile_file(
      &dir.path().join("Missing.jack"),
      CompileOptions::default(),
      false,
    )
    .unwrap_err();
    assert!(matches!(err, DriverError::ReadSource { .. }));
    assert!(err.to_string().starts_with("cannot read "));
  }
}
