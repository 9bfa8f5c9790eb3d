use std::collections::BTreeSet;

use regex::Regex;
use tracing::info;

use crate::decode::{RecordDecoder, RecordFormat};
use crate::error::Result;
use crate::locate::Locator;

/// Records between progress notifications on the diagnostic channel.
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Everything one pipeline invocation needs, built once and immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Shell-style file name patterns; a file matches if any pattern matches.
    pub file_patterns: Vec<String>,
    /// Top-level directories to scan; each may itself contain wildcards.
    pub top_dirs: Vec<String>,
    /// Directories pruned whole during traversal.
    pub exclusions: BTreeSet<String>,
    /// Regexes applied to each record; empty keeps everything.
    pub grep_patterns: Vec<String>,
    pub format: RecordFormat,
    /// Announce each located file on the diagnostic channel.
    pub announce_files: bool,
}

/// The composed lazy record stream: locate, open, decode, grep, trim.
///
/// Strictly pull-based; nothing upstream advances until the consumer asks for
/// the next record, and dropping the stream mid-iteration closes whatever
/// source is open. Owns its record counter, so concurrent pipeline instances
/// never share state.
pub struct Pipeline {
    records: RecordDecoder<Locator>,
    greps: Vec<Regex>,
    seen: u64,
}

impl Pipeline {
    /// Validate the parameters and build the stream. Configuration errors
    /// (bad pattern, bad regex) surface here, before any file is touched.
    pub fn run(params: &PipelineParams) -> Result<Self> {
        let greps = params
            .grep_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let locator = Locator::new(
            params.top_dirs.clone(),
            params.exclusions.clone(),
            &params.file_patterns,
            params.announce_files,
        )?;
        Ok(Self {
            records: RecordDecoder::new(locator, params.format),
            greps,
            seen: 0,
        })
    }
}

impl Iterator for Pipeline {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next()? {
                Ok(line) => {
                    if !self.greps.is_empty() && !self.greps.iter().any(|re| re.is_match(&line)) {
                        continue;
                    }
                    self.seen += 1;
                    if self.seen % PROGRESS_INTERVAL == 0 {
                        info!(records = self.seen, "pipeline progress");
                    }
                    return Some(Ok(line.trim().to_string()));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn params(top: &std::path::Path) -> PipelineParams {
        PipelineParams {
            file_patterns: vec!["*.log".to_string()],
            top_dirs: vec![top.to_string_lossy().to_string()],
            exclusions: BTreeSet::new(),
            grep_patterns: Vec::new(),
            format: RecordFormat::None,
            announce_files: false,
        }
    }

    #[test]
    fn records_are_trimmed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.log"), "  padded  \nplain\n").unwrap();

        let out: Vec<String> = Pipeline::run(&params(tmp.path()))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(out, vec!["padded", "plain"]);
    }

    #[test]
    fn grep_patterns_filter_the_stream() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.log"), "keep this\ndrop that\nkeep too\n").unwrap();

        let mut p = params(tmp.path());
        p.grep_patterns = vec!["^keep".to_string()];
        let out: Vec<String> = Pipeline::run(&p).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(out, vec!["keep this", "keep too"]);
    }

    #[test]
    fn bad_grep_pattern_fails_at_construction() {
        let tmp = TempDir::new().unwrap();
        let mut p = params(tmp.path());
        p.grep_patterns = vec!["(unclosed".to_string()];
        assert!(Pipeline::run(&p).is_err());
    }

    #[test]
    fn early_termination_is_clean() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.log"), "one\ntwo\nthree\n").unwrap();

        let mut stream = Pipeline::run(&params(tmp.path())).unwrap();
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first, "one");
        // Abandoning the stream drops the open source.
        drop(stream);
    }
}
