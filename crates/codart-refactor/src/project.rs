//! Running a field move against a project directory.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use codart_config::{init_tracing, load_for_project, MoveFieldConfig};
use walkdir::WalkDir;

use crate::move_field::{move_field, MoveFieldError, MoveFieldParams, SkippedFile, UpdatedMethod};

/// Maps an original file path to the path its rewritten contents are written to.
pub type OutputPathStrategy = Arc<dyn Fn(&Path) -> PathBuf + Send + Sync>;

/// `Foo.java` with suffix `.rewritten.java` becomes `Foo.rewritten.java`.
pub fn suffix_output_path(suffix: impl Into<String>) -> OutputPathStrategy {
    let suffix = suffix.into();
    Arc::new(move |path: &Path| {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!("{stem}{suffix}"))
    })
}

#[derive(Clone)]
pub struct MoveFieldRequest {
    pub params: MoveFieldParams,
    pub project_root: PathBuf,
    /// Replace files in place instead of writing through `output_path`.
    pub overwrite: bool,
    pub output_path: OutputPathStrategy,
    /// Files ending in this suffix are left out of discovery.
    pub ignored_suffix: Option<String>,
}

impl MoveFieldRequest {
    pub fn new(project_root: impl Into<PathBuf>, params: MoveFieldParams) -> Self {
        Self::from_config(&MoveFieldConfig::default(), project_root, params)
    }

    pub fn from_config(
        config: &MoveFieldConfig,
        project_root: impl Into<PathBuf>,
        params: MoveFieldParams,
    ) -> Self {
        let suffix = config.output_suffix.clone();
        Self {
            params,
            project_root: project_root.into(),
            overwrite: config.overwrite,
            output_path: suffix_output_path(suffix.clone()),
            ignored_suffix: (!suffix.is_empty()).then_some(suffix),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_output_path(
        mut self,
        strategy: impl Fn(&Path) -> PathBuf + Send + Sync + 'static,
    ) -> Self {
        self.output_path = Arc::new(strategy);
        self
    }

    fn destination(&self, path: &Path) -> PathBuf {
        if self.overwrite {
            path.to_path_buf()
        } else {
            (self.output_path)(path)
        }
    }
}

impl fmt::Debug for MoveFieldRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveFieldRequest")
            .field("params", &self.params)
            .field("project_root", &self.project_root)
            .field("overwrite", &self.overwrite)
            .field("ignored_suffix", &self.ignored_suffix)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveFieldReport {
    /// `(original, written)` path pairs.
    pub written: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<SkippedFile>,
    pub updated_methods: Vec<UpdatedMethod>,
}

/// Discover, rewrite and write back. Nothing is written unless every check passed.
pub fn refactor(request: &MoveFieldRequest) -> Result<MoveFieldReport, MoveFieldError> {
    let paths = discover_java_files(&request.project_root, request.ignored_suffix.as_deref())?;
    let mut files = BTreeMap::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| MoveFieldError::Io {
            path: path.clone(),
            source,
        })?;
        files.insert(path, text);
    }
    tracing::debug!(
        target: "codart.refactor",
        root = %request.project_root.display(),
        files = files.len(),
        "loaded project"
    );

    let outcome = move_field(&files, &request.params)?;

    let mut written = Vec::with_capacity(outcome.files.len());
    for (path, text) in &outcome.files {
        let dest = request.destination(path);
        write_atomic(&dest, text).map_err(|source| MoveFieldError::Io {
            path: dest.clone(),
            source,
        })?;
        tracing::debug!(target: "codart.refactor", path = %dest.display(), "wrote file");
        written.push((path.clone(), dest));
    }

    Ok(MoveFieldReport {
        written,
        skipped: outcome.skipped,
        updated_methods: outcome.updated_methods,
    })
}

/// Run a field move under `project_root` with the project's own configuration.
///
/// Loads `codart.toml` (or whatever [`codart_config::discover_config_path`] finds), installs
/// logging from its `[logging]` table, and applies its `[move_field]` output settings.
pub fn refactor_project(
    project_root: &Path,
    params: MoveFieldParams,
) -> Result<MoveFieldReport, MoveFieldError> {
    let (config, config_path) = load_for_project(project_root)?;
    init_tracing(&config.logging);
    tracing::info!(
        target: "codart.refactor",
        root = %project_root.display(),
        config = ?config_path,
        overwrite = config.move_field.overwrite,
        "refactoring project"
    );
    refactor(&MoveFieldRequest::from_config(
        &config.move_field,
        project_root,
        params,
    ))
}

/// All `.java` files under `root`, sorted. Unreadable entries are skipped.
pub fn discover_java_files(
    root: &Path,
    ignored_suffix: Option<&str>,
) -> Result<Vec<PathBuf>, MoveFieldError> {
    if !root.is_dir() {
        return Err(MoveFieldError::Io {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "project root is not a directory"),
        });
    }

    let mut files = Vec::new();
    let mut walk_errors = 0u64;
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                walk_errors += 1;
                tracing::debug!(
                    target: "codart.refactor",
                    path = ?err.path(),
                    error = %err,
                    "skipping unreadable entry"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if !name.ends_with(".java") {
            continue;
        }
        if ignored_suffix.is_some_and(|suffix| name.ends_with(suffix)) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    if walk_errors > 0 {
        tracing::warn!(
            target: "codart.refactor",
            root = %root.display(),
            walk_errors,
            "java file scan skipped some entries"
        );
    }
    files.sort();
    Ok(files)
}

/// Whether `path` is `<class>.java`.
pub fn is_class_file(path: &Path, class: &str) -> bool {
    path.extension().is_some_and(|ext| ext == "java")
        && path.file_stem().is_some_and(|stem| stem == class)
}

/// Processing order: the source class file, then the target class file, then the rest sorted.
pub fn order_files(
    files: impl IntoIterator<Item = PathBuf>,
    source_class: &str,
    target_class: &str,
) -> Vec<PathBuf> {
    let rank = |path: &Path| {
        if is_class_file(path, source_class) {
            0
        } else if is_class_file(path, target_class) {
            1
        } else {
            2
        }
    };
    let mut files: Vec<PathBuf> = files.into_iter().collect();
    files.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    files
}

fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codart_test_utils::TempProject;
    use pretty_assertions::assert_eq;

    #[test]
    fn orders_source_then_target_then_the_rest() {
        let files = ["b/Z.java", "a/Target.java", "a/A.java", "c/Source.java"].map(PathBuf::from);
        assert_eq!(
            order_files(files, "Source", "Target"),
            ["c/Source.java", "a/Target.java", "a/A.java", "b/Z.java"].map(PathBuf::from)
        );
    }

    #[test]
    fn class_file_names() {
        assert!(is_class_file(Path::new("src/p/Source.java"), "Source"));
        assert!(!is_class_file(Path::new("src/p/Source.rewritten.java"), "Source"));
        assert!(!is_class_file(Path::new("src/p/Source.kt"), "Source"));
    }

    #[test]
    fn suffix_strategy_replaces_the_extension() {
        let strategy = suffix_output_path(".rewritten.java");
        assert_eq!(
            strategy(Path::new("src/p/Source.java")),
            PathBuf::from("src/p/Source.rewritten.java")
        );
    }

    #[test]
    fn discovery_is_sorted_and_skips_rewritten_outputs() {
        let project = TempProject::from_fixture(
            "//- /src/b/B.java\nclass B {}\n//- /src/a/A.java\nclass A {}\n//- /src/a/A.rewritten.java\nclass A {}\n//- /README.md\nx\n",
        );
        let found: Vec<_> = discover_java_files(project.root(), Some(".rewritten.java"))
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(project.root()).unwrap().to_path_buf())
            .collect();
        assert_eq!(found, [PathBuf::from("src/a/A.java"), PathBuf::from("src/b/B.java")]);

        let err = discover_java_files(&project.path("missing"), None).unwrap_err();
        assert!(matches!(err, MoveFieldError::Io { .. }), "{err}");
    }

    #[test]
    fn request_debug_omits_the_strategy() {
        let request = MoveFieldRequest::new(
            "/tmp/p",
            MoveFieldParams::new("s", "S", "f", "t", "T"),
        );
        let debug = format!("{request:?}");
        assert!(debug.contains("project_root"), "{debug}");
        assert!(!request.overwrite);
        assert_eq!(request.ignored_suffix.as_deref(), Some(".rewritten.java"));
    }
}
