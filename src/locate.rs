use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use glob::Pattern;
use tracing::info;
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};

/// Lazily yields files under the top directories whose names match any of the
/// file patterns.
///
/// Each top directory is itself a glob expression and may expand to several
/// concrete directories. A traversal node whose path is a member of
/// `exclusions` is pruned whole, subtree included; membership is exact, never
/// by prefix. Files come out in directory-tree order, one walker active at a
/// time.
pub struct Locator {
    tops: std::vec::IntoIter<String>,
    globs: Option<glob::Paths>,
    walker: Option<Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>>,
    patterns: Vec<Pattern>,
    exclusions: Arc<BTreeSet<String>>,
    matched: u64,
    announce_files: bool,
}

impl Locator {
    pub fn new(
        top_dirs: Vec<String>,
        exclusions: BTreeSet<String>,
        file_patterns: &[String],
        announce_files: bool,
    ) -> Result<Self> {
        let patterns = file_patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            tops: top_dirs.into_iter(),
            globs: None,
            walker: None,
            patterns,
            exclusions: Arc::new(exclusions),
            matched: 0,
            announce_files,
        })
    }

    fn walk(&self, root: PathBuf) -> Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>> {
        let exclusions = Arc::clone(&self.exclusions);
        Box::new(
            WalkDir::new(root)
                .into_iter()
                .filter_entry(move |entry| {
                    !exclusions.contains(entry.path().to_string_lossy().as_ref())
                }),
        )
    }

    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }
}

impl Iterator for Locator {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(walker) = self.walker.as_mut() {
                match walker.next() {
                    Some(Ok(entry)) => {
                        if !entry.file_type().is_file() {
                            continue;
                        }
                        let name = entry.file_name().to_string_lossy();
                        if self.matches(name.as_ref()) {
                            self.matched += 1;
                            if self.announce_files {
                                info!(count = self.matched, file = %entry.path().display(), "located file");
                            }
                            return Some(Ok(entry.into_path()));
                        }
                    }
                    Some(Err(e)) => return Some(Err(PipelineError::Io(e.into()))),
                    None => self.walker = None,
                }
            } else if let Some(globs) = self.globs.as_mut() {
                match globs.next() {
                    // Top dirs expand to concrete directories; stray file
                    // matches are not traversal roots.
                    Some(Ok(dir)) if dir.is_dir() => self.walker = Some(self.walk(dir)),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Some(Err(PipelineError::Io(e.into_error()))),
                    None => self.globs = None,
                }
            } else {
                match self.tops.next() {
                    Some(top) => match glob::glob(&top) {
                        Ok(paths) => self.globs = Some(paths),
                        Err(e) => return Some(Err(e.into())),
                    },
                    None => return None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &std::path::Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn yields_only_matching_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.log");
        touch(tmp.path(), "b.txt");
        touch(tmp.path(), "c.log");

        let locator = Locator::new(
            vec![tmp.path().to_string_lossy().to_string()],
            BTreeSet::new(),
            &["*.log".to_string()],
            false,
        )
        .unwrap();
        let mut names: Vec<String> = locator
            .map(|r| r.unwrap().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.log", "c.log"]);
    }

    #[test]
    fn any_pattern_suffices() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.log");
        touch(tmp.path(), "b.txt");
        touch(tmp.path(), "c.csv");

        let locator = Locator::new(
            vec![tmp.path().to_string_lossy().to_string()],
            BTreeSet::new(),
            &["*.log".to_string(), "*.csv".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(locator.count(), 2);
    }

    #[test]
    fn excluded_subtree_is_pruned_entirely() {
        let tmp = TempDir::new().unwrap();
        let keep = tmp.path().join("01");
        let skip = tmp.path().join("02");
        let skip_nested = skip.join("deep");
        fs::create_dir_all(&keep).unwrap();
        fs::create_dir_all(&skip_nested).unwrap();
        touch(&keep, "a.log");
        touch(&skip, "b.log");
        touch(&skip_nested, "c.log");

        let exclusions: BTreeSet<String> =
            [skip.to_string_lossy().to_string()].into_iter().collect();
        let locator = Locator::new(
            vec![tmp.path().to_string_lossy().to_string()],
            exclusions,
            &["*.log".to_string()],
            false,
        )
        .unwrap();
        let found: Vec<PathBuf> = locator.map(|r| r.unwrap()).collect();
        assert_eq!(found, vec![keep.join("a.log")]);
    }

    #[test]
    fn top_dir_may_contain_wildcards() {
        let tmp = TempDir::new().unwrap();
        for sub in ["2023-01", "2023-02", "other"] {
            let dir = tmp.path().join(sub);
            fs::create_dir_all(&dir).unwrap();
            touch(&dir, "data.log");
        }

        let pattern = format!("{}/2023-*", tmp.path().to_string_lossy());
        let locator = Locator::new(
            vec![pattern],
            BTreeSet::new(),
            &["*.log".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(locator.count(), 2);
    }

    #[test]
    fn missing_top_dir_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("nope");
        let locator = Locator::new(
            vec![gone.to_string_lossy().to_string()],
            BTreeSet::new(),
            &["*".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(locator.count(), 0);
    }
}
