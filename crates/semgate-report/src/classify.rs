//! Classification of `cargo semver-checks` output into result buckets.
//!
//! The tool's output grammar is not pinned down here: each bucket is driven
//! by configured line patterns, and with none configured every bucket stays
//! empty.

use regex::Regex;
use semgate_core::{Finding, PatternConfig, ResultSummary, SemgateError, Severity};

/// Line-pattern classifier.
///
/// # Examples
///
/// ```
/// use semgate_core::{PatternConfig, Severity};
/// use semgate_report::classify::Classifier;
///
/// let patterns = PatternConfig {
///     major: vec![r"^--- failure ".into()],
///     ..Default::default()
/// };
/// let classifier = Classifier::new(&patterns).unwrap();
/// let summary = classifier.classify("--- failure function_missing: pub fn removed ---").unwrap();
/// assert_eq!(summary.severity(), Severity::Major);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    /// Most severe bucket first.
    rules: Vec<(Severity, Vec<Regex>)>,
}

impl Classifier {
    /// Compile the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::Pattern`] for an invalid regular expression.
    pub fn new(patterns: &PatternConfig) -> Result<Self, SemgateError> {
        let compile = |sources: &[String]| -> Result<Vec<Regex>, SemgateError> {
            sources
                .iter()
                .map(|s| Regex::new(s).map_err(SemgateError::from))
                .collect()
        };

        let rules = vec![
            (Severity::Error, compile(&patterns.error)?),
            (Severity::Warning, compile(&patterns.warning)?),
            (Severity::Major, compile(&patterns.major)?),
            (Severity::Minor, compile(&patterns.minor)?),
        ];
        Ok(Self { rules })
    }

    /// Number of configured patterns across all buckets.
    pub fn pattern_count(&self) -> usize {
        self.rules.iter().map(|(_, r)| r.len()).sum()
    }

    /// Classify captured output.
    ///
    /// Each line goes to the most severe bucket with a matching pattern, or
    /// nowhere.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::Config`] when `output` is empty.
    pub fn classify(&self, output: &str) -> Result<ResultSummary, SemgateError> {
        if output.trim().is_empty() {
            return Err(SemgateError::Config("No output provided for parsing.".into()));
        }

        let mut summary = ResultSummary::default();
        for (index, raw) in output.lines().enumerate() {
            let line = console::strip_ansi_codes(raw);
            let Some(severity) = self.severity_of(&line) else {
                continue;
            };
            if let Some(bucket) = summary.bucket_mut(severity) {
                bucket.push(Finding {
                    line: index + 1,
                    message: line.trim_end().to_string(),
                });
            }
        }

        tracing::info!("Parsed summary: {summary}");
        Ok(summary)
    }

    fn severity_of(&self, line: &str) -> Option<Severity> {
        self.rules
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(line)))
            .map(|(severity, _)| *severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
     Parsing serde v1.0.0 (current)
    Checking serde v0.9.0 -> v1.0.0 (major change)
--- failure function_missing: pub fn removed or renamed ---
--- failure enum_variant_added: enum variant added on exhaustive enum ---
warning: unused manifest key
     Summary semver requires new major version: 2 major and 0 minor checks failed
";

    fn patterns() -> PatternConfig {
        PatternConfig {
            minor: vec![r"^--- minor ".into()],
            major: vec![r"^--- failure ".into()],
            warning: vec![r"^warning:".into()],
            error: vec![r"^error:".into()],
        }
    }

    #[test]
    fn no_patterns_yield_patch() {
        let classifier = Classifier::new(&PatternConfig::default()).unwrap();
        assert_eq!(classifier.pattern_count(), 0);
        let summary = classifier.classify(OUTPUT).unwrap();
        assert_eq!(summary, ResultSummary::default());
        assert_eq!(summary.severity(), Severity::Patch);
    }

    #[test]
    fn empty_output_is_rejected() {
        let classifier = Classifier::new(&PatternConfig::default()).unwrap();
        let err = classifier.classify("  \n").unwrap_err();
        assert!(err.to_string().contains("No output provided for parsing."));
    }

    #[test]
    fn lines_land_in_buckets() {
        let classifier = Classifier::new(&patterns()).unwrap();
        let summary = classifier.classify(OUTPUT).unwrap();
        assert_eq!(summary.majors.len(), 2);
        assert_eq!(summary.majors[0].line, 3);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.minors.is_empty());
        assert!(summary.errors.is_empty());
        assert_eq!(summary.severity(), Severity::Warning);
    }

    #[test]
    fn most_severe_bucket_wins_per_line() {
        let classifier = Classifier::new(&PatternConfig {
            major: vec!["failure".into()],
            error: vec!["failure".into()],
            ..Default::default()
        })
        .unwrap();
        let summary = classifier.classify("--- failure x ---").unwrap();
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.majors.is_empty());
    }

    #[test]
    fn ansi_codes_do_not_block_matches() {
        let classifier = Classifier::new(&patterns()).unwrap();
        let summary = classifier
            .classify("\x1b[1m\x1b[31merror:\x1b[0m could not compile")
            .unwrap();
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].message, "error: could not compile");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Classifier::new(&PatternConfig {
            minor: vec!["(".into()],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, SemgateError::Pattern(_)));
    }
}
