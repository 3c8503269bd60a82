use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SemgateError;

/// Which feature set `cargo semver-checks` builds rustdoc with.
///
/// # Examples
///
/// ```
/// use semgate_core::FeatureGroup;
///
/// let group = FeatureGroup::parse_input("all-features").unwrap();
/// assert_eq!(group.map(FeatureGroup::flag), Some("--all-features"));
/// assert_eq!(FeatureGroup::parse_input("").unwrap(), None);
/// assert!(FeatureGroup::parse_input("some-features").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureGroup {
    /// Enable every feature.
    AllFeatures,
    /// Enable the default features.
    DefaultFeatures,
    /// Enable only the features passed through `features`.
    OnlyExplicitFeatures,
}

impl FeatureGroup {
    /// Parse the raw `feature-group` input.
    ///
    /// An empty value means "unset". Any unrecognised value is a fatal
    /// configuration error.
    pub fn parse_input(value: &str) -> Result<Option<Self>, SemgateError> {
        match value.trim() {
            "" => Ok(None),
            other => other.parse().map(Some),
        }
    }

    /// The `check-release` flag for this group.
    pub fn flag(self) -> &'static str {
        match self {
            FeatureGroup::AllFeatures => "--all-features",
            FeatureGroup::DefaultFeatures => "--default-features",
            FeatureGroup::OnlyExplicitFeatures => "--only-explicit-features",
        }
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureGroup::AllFeatures => write!(f, "all-features"),
            FeatureGroup::DefaultFeatures => write!(f, "default-features"),
            FeatureGroup::OnlyExplicitFeatures => write!(f, "only-explicit-features"),
        }
    }
}

impl FromStr for FeatureGroup {
    type Err = SemgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-features" => Ok(FeatureGroup::AllFeatures),
            "default-features" => Ok(FeatureGroup::DefaultFeatures),
            "only-explicit-features" => Ok(FeatureGroup::OnlyExplicitFeatures),
            other => Err(SemgateError::Config(format!(
                "Unsupported feature group: {other}"
            ))),
        }
    }
}

/// Operating system of the CI runner, using the identifiers GitHub runners report.
///
/// # Examples
///
/// ```
/// use semgate_core::RunnerOs;
///
/// let os = RunnerOs::from_platform("darwin").unwrap();
/// assert_eq!(os.target_triple(), "x86_64-apple-darwin");
/// assert!(RunnerOs::from_platform("aix").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOs {
    Linux,
    Windows,
    MacOs,
}

impl RunnerOs {
    /// Map a platform identifier (`linux`, `win32`, `darwin`) to a runner OS.
    pub fn from_platform(platform: &str) -> Result<Self, SemgateError> {
        match platform {
            "linux" => Ok(RunnerOs::Linux),
            "win32" => Ok(RunnerOs::Windows),
            "darwin" => Ok(RunnerOs::MacOs),
            _ => Err(SemgateError::Config("Unsupported runner".into())),
        }
    }

    /// The runner this process is executing on.
    pub fn current() -> Result<Self, SemgateError> {
        Self::from_platform(host_platform())
    }

    /// Target triple of the prebuilt release assets for this OS.
    pub fn target_triple(self) -> &'static str {
        match self {
            RunnerOs::Linux => "x86_64-unknown-linux-gnu",
            RunnerOs::Windows => "x86_64-pc-windows-msvc",
            RunnerOs::MacOs => "x86_64-apple-darwin",
        }
    }
}

/// Platform identifier of the host, as used in cache keys.
///
/// Supported runners report `linux`, `win32` or `darwin`; other hosts fall
/// back to Rust's own OS name.
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// Overall result of a semver check, ordered from least to most severe.
///
/// # Examples
///
/// ```
/// use semgate_core::Severity;
///
/// assert_eq!(Severity::Warning.template_file(), "warning.txt");
/// assert!(Severity::Error > Severity::Minor);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No issues found.
    Patch,
    Minor,
    Major,
    Warning,
    Error,
}

impl Severity {
    /// File name of the comment template for this severity.
    pub fn template_file(self) -> String {
        format!("{self}.txt")
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Patch => write!(f, "patch"),
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single classified line of lint output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// 1-based line number in the captured output.
    pub line: usize,
    /// The line text with ANSI escapes removed.
    pub message: String,
}

/// Classification of lint output into four buckets.
///
/// # Examples
///
/// ```
/// use semgate_core::{Finding, ResultSummary, Severity};
///
/// let mut summary = ResultSummary::default();
/// assert_eq!(summary.severity(), Severity::Patch);
///
/// summary.majors.push(Finding { line: 3, message: "removed fn".into() });
/// assert_eq!(summary.severity(), Severity::Major);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub minors: Vec<Finding>,
    pub majors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub errors: Vec<Finding>,
}

impl ResultSummary {
    /// Overall severity: error > warning > major > minor > patch.
    pub fn severity(&self) -> Severity {
        if !self.errors.is_empty() {
            Severity::Error
        } else if !self.warnings.is_empty() {
            Severity::Warning
        } else if !self.majors.is_empty() {
            Severity::Major
        } else if !self.minors.is_empty() {
            Severity::Minor
        } else {
            Severity::Patch
        }
    }

    /// Mutable access to the bucket collecting findings of `severity`.
    ///
    /// Returns `None` for [`Severity::Patch`], which has no bucket.
    pub fn bucket_mut(&mut self, severity: Severity) -> Option<&mut Vec<Finding>> {
        match severity {
            Severity::Patch => None,
            Severity::Minor => Some(&mut self.minors),
            Severity::Major => Some(&mut self.majors),
            Severity::Warning => Some(&mut self.warnings),
            Severity::Error => Some(&mut self.errors),
        }
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (minors: {}, majors: {}, warnings: {}, errors: {})",
            self.severity(),
            self.minors.len(),
            self.majors.len(),
            self.warnings.len(),
            self.errors.len(),
        )
    }
}

/// Inputs selecting what `cargo semver-checks check-release` checks.
///
/// # Examples
///
/// ```
/// use semgate_core::{CheckInputs, FeatureGroup};
///
/// let inputs = CheckInputs {
///     packages: vec!["foo".into()],
///     feature_group: Some(FeatureGroup::DefaultFeatures),
///     ..Default::default()
/// };
/// assert_eq!(
///     inputs.check_release_args(),
///     vec!["--package", "foo", "--default-features"],
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckInputs {
    pub packages: Vec<String>,
    pub excludes: Vec<String>,
    pub manifest_path: Option<String>,
    pub release_type: Option<String>,
    pub feature_group: Option<FeatureGroup>,
    pub features: Vec<String>,
    pub verbose: bool,
}

impl CheckInputs {
    /// Arguments appended to `cargo semver-checks check-release`.
    pub fn check_release_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(option_from_list("--package", &self.packages));
        args.extend(option_from_list("--exclude", &self.excludes));
        args.extend(option_if_value_provided(
            "--manifest-path",
            self.manifest_path.as_deref(),
        ));
        args.extend(option_if_value_provided(
            "--release-type",
            self.release_type.as_deref(),
        ));
        if let Some(group) = self.feature_group {
            args.push(group.flag().to_string());
        }
        args.extend(option_from_list("--features", &self.features));
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

/// `[option, value]` when `value` is non-empty, otherwise nothing.
pub fn option_if_value_provided(option: &str, value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) if !v.is_empty() => vec![option.to_string(), v.to_string()],
        _ => Vec::new(),
    }
}

/// `[option, v1, option, v2, ...]` for every value.
pub fn option_from_list(option: &str, values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| [option.to_string(), v.clone()])
        .collect()
}

/// Split list inputs on newlines and commas, dropping blank entries.
///
/// GitHub Actions passes list inputs as a single multi-line string, while
/// the CLI may repeat a flag; both shapes end up here.
///
/// # Examples
///
/// ```
/// use semgate_core::split_list_input;
///
/// let raw = vec!["a, b\nc".to_string(), " ".to_string(), "d".to_string()];
/// assert_eq!(split_list_input(&raw), vec!["a", "b", "c", "d"]);
/// ```
pub fn split_list_input(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(['\n', ',']))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(message: &str) -> Finding {
        Finding {
            line: 1,
            message: message.into(),
        }
    }

    #[test]
    fn feature_group_flags() {
        let cases = [
            ("all-features", Some("--all-features")),
            ("default-features", Some("--default-features")),
            ("only-explicit-features", Some("--only-explicit-features")),
            ("", None),
        ];
        for (input, flag) in cases {
            let group = FeatureGroup::parse_input(input).unwrap();
            assert_eq!(group.map(FeatureGroup::flag), flag, "input {input:?}");
        }
    }

    #[test]
    fn feature_group_rejects_unknown_value() {
        let err = FeatureGroup::parse_input("no-features").unwrap_err();
        assert!(matches!(err, SemgateError::Config(_)));
        assert!(err.to_string().contains("no-features"));
    }

    #[test]
    fn feature_group_is_case_sensitive() {
        assert!(FeatureGroup::parse_input("All-Features").is_err());
    }

    #[test]
    fn platform_targets() {
        assert_eq!(
            RunnerOs::from_platform("linux").unwrap().target_triple(),
            "x86_64-unknown-linux-gnu"
        );
        assert_eq!(
            RunnerOs::from_platform("win32").unwrap().target_triple(),
            "x86_64-pc-windows-msvc"
        );
        assert_eq!(
            RunnerOs::from_platform("darwin").unwrap().target_triple(),
            "x86_64-apple-darwin"
        );
    }

    #[test]
    fn unsupported_platform_is_fatal() {
        for platform in ["freebsd", "windows", "macos", ""] {
            let err = RunnerOs::from_platform(platform).unwrap_err();
            assert!(err.to_string().contains("Unsupported runner"));
        }
    }

    #[test]
    fn severity_error_wins_over_everything() {
        let summary = ResultSummary {
            minors: vec![finding("a"), finding("b")],
            majors: vec![finding("c")],
            warnings: vec![finding("d"), finding("e")],
            errors: vec![finding("f")],
        };
        assert_eq!(summary.severity(), Severity::Error);
    }

    #[test]
    fn severity_warning_without_errors() {
        let summary = ResultSummary {
            majors: vec![finding("c")],
            warnings: vec![finding("d")],
            ..Default::default()
        };
        assert_eq!(summary.severity(), Severity::Warning);
    }

    #[test]
    fn severity_major_over_minor() {
        let summary = ResultSummary {
            minors: vec![finding("a")],
            majors: vec![finding("c")],
            ..Default::default()
        };
        assert_eq!(summary.severity(), Severity::Major);
    }

    #[test]
    fn severity_only_minors() {
        let summary = ResultSummary {
            minors: vec![finding("a")],
            ..Default::default()
        };
        assert_eq!(summary.severity(), Severity::Minor);
    }

    #[test]
    fn severity_empty_is_patch() {
        assert_eq!(ResultSummary::default().severity(), Severity::Patch);
    }

    #[test]
    fn severity_template_files() {
        assert_eq!(Severity::Patch.template_file(), "patch.txt");
        assert_eq!(Severity::Error.template_file(), "error.txt");
    }

    #[test]
    fn patch_has_no_bucket() {
        let mut summary = ResultSummary::default();
        assert!(summary.bucket_mut(Severity::Patch).is_none());
        summary
            .bucket_mut(Severity::Warning)
            .unwrap()
            .push(finding("w"));
        assert_eq!(summary.warnings.len(), 1);
    }

    #[test]
    fn check_release_args_full() {
        let inputs = CheckInputs {
            packages: vec!["a".into(), "b".into()],
            excludes: vec!["c".into()],
            manifest_path: Some("crates/a/Cargo.toml".into()),
            release_type: Some("minor".into()),
            feature_group: Some(FeatureGroup::OnlyExplicitFeatures),
            features: vec!["serde".into()],
            verbose: true,
        };
        assert_eq!(
            inputs.check_release_args(),
            vec![
                "--package",
                "a",
                "--package",
                "b",
                "--exclude",
                "c",
                "--manifest-path",
                "crates/a/Cargo.toml",
                "--release-type",
                "minor",
                "--only-explicit-features",
                "--features",
                "serde",
                "--verbose",
            ]
        );
    }

    #[test]
    fn check_release_args_empty() {
        assert!(CheckInputs::default().check_release_args().is_empty());
    }

    #[test]
    fn empty_optional_values_are_skipped() {
        assert!(option_if_value_provided("--release-type", Some("")).is_empty());
        assert!(option_if_value_provided("--release-type", None).is_empty());
    }
}
