use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Load a fixture directory into a `(relative_path -> text)` map.
pub fn load_fixture_dir(dir: &Path) -> BTreeMap<PathBuf, String> {
    fn visit_dir(
        root: &Path,
        dir: &Path,
        out: &mut BTreeMap<PathBuf, String>,
    ) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                visit_dir(root, &path, out)?;
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                let text = fs::read_to_string(&path)?;
                out.insert(rel, text);
            }
        }
        Ok(())
    }

    let mut out = BTreeMap::new();
    visit_dir(dir, dir, &mut out).expect("fixture dir readable");
    out
}

/// Load `before`, apply `transform`, and compare the result against `after`.
///
/// With `BLESS=1` a missing or mismatching `after` directory is rewritten instead.
pub fn assert_fixture_transformed(
    before: &Path,
    after: &Path,
    mut transform: impl FnMut(&mut BTreeMap<PathBuf, String>),
) {
    let mut files = load_fixture_dir(before);
    transform(&mut files);

    if !after.exists() {
        if bless_enabled() {
            bless_fixture_dir(after, &files);
            return;
        }
        panic!(
            "missing expected fixture dir {} (run with `BLESS=1` to write it)",
            after.display()
        );
    }

    let expected = load_fixture_dir(after);
    if files != expected {
        if bless_enabled() {
            bless_fixture_dir(after, &files);
            return;
        }
        assert_eq!(files, expected);
    }
}

pub fn bless_enabled() -> bool {
    let Ok(val) = env::var("BLESS") else {
        return false;
    };
    let val = val.trim().to_ascii_lowercase();
    !(val.is_empty() || val == "0" || val == "false")
}

fn bless_fixture_dir(dir: &Path, files: &BTreeMap<PathBuf, String>) {
    if dir.exists() {
        fs::remove_dir_all(dir).unwrap_or_else(|err| {
            panic!(
                "failed to remove existing fixture dir {}: {err}",
                dir.display()
            )
        });
    }
    write_files(dir, files);
}

fn write_files(dir: &Path, files: &BTreeMap<PathBuf, String>) {
    fs::create_dir_all(dir)
        .unwrap_or_else(|err| panic!("failed to create fixture dir {}: {err}", dir.display()));

    for (rel, text) in files {
        assert!(
            rel.components().all(|c| !matches!(c, Component::ParentDir)),
            "fixture paths must not contain '..': {}",
            rel.display()
        );
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|err| {
                panic!("failed to create fixture dir {}: {err}", parent.display())
            });
        }
        fs::write(&path, text)
            .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
    }
}

/// Parse an inline multi-file fixture.
///
/// Each file starts with a `//- path` header line; leading `/` on paths is ignored so fixtures can
/// use workspace-absolute paths like `//- /source/Source.java`. File texts end with a newline.
#[must_use]
pub fn parse_multi_file(fixture: &str) -> BTreeMap<PathBuf, String> {
    let mut files = BTreeMap::new();
    let mut current: Option<(PathBuf, String)> = None;

    for line in fixture.lines() {
        if let Some(rest) = line.strip_prefix("//-") {
            if let Some((path, text)) = current.take() {
                files.insert(path, text);
            }
            let path = rest.trim().trim_start_matches('/').replace('\\', "/");
            current = Some((PathBuf::from(path), String::new()));
            continue;
        }

        match current.as_mut() {
            Some((_, text)) => {
                text.push_str(line);
                text.push('\n');
            }
            None => assert!(
                line.trim().is_empty(),
                "fixture text before the first `//-` header: {line:?}"
            ),
        }
    }

    if let Some((path, text)) = current.take() {
        files.insert(path, text);
    }
    files
}

/// A fixture project materialized in a temporary directory.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    #[must_use]
    pub fn new(files: &BTreeMap<PathBuf, String>) -> Self {
        let dir = tempfile::tempdir().expect("create temp project dir");
        write_files(dir.path(), files);
        Self { dir }
    }

    #[must_use]
    pub fn from_fixture(fixture: &str) -> Self {
        Self::new(&parse_multi_file(fixture))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    #[must_use]
    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        let path = self.path(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()))
    }

    /// Snapshot every file under the project root.
    #[must_use]
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        load_fixture_dir(self.root())
    }
}
