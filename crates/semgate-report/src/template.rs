use std::path::{Path, PathBuf};

use semgate_core::{ResultSummary, SemgateError, Severity};

/// Path of the template for `severity` inside `templates_dir`.
pub fn template_path(templates_dir: &Path, severity: Severity) -> PathBuf {
    templates_dir.join(severity.template_file())
}

/// Read the comment template for `severity`.
///
/// # Errors
///
/// Returns [`SemgateError::Template`] if the file cannot be read.
pub fn load_template(templates_dir: &Path, severity: Severity) -> Result<String, SemgateError> {
    let path = template_path(templates_dir, severity);
    std::fs::read_to_string(&path).map_err(|_| {
        SemgateError::Template(format!(
            "Unable to access template file: {}",
            path.display()
        ))
    })
}

/// Replace `{{minorCount}}`, `{{majorCount}}`, `{{warningCount}}` and
/// `{{errorCount}}` with the bucket sizes.
///
/// # Examples
///
/// ```
/// use semgate_core::ResultSummary;
/// use semgate_report::template::render;
///
/// let text = render("{{majorCount}} major, {{errorCount}} errors", &ResultSummary::default());
/// assert_eq!(text, "0 major, 0 errors");
/// ```
pub fn render(template: &str, summary: &ResultSummary) -> String {
    let replacements = [
        ("minorCount", summary.minors.len()),
        ("majorCount", summary.majors.len()),
        ("warningCount", summary.warnings.len()),
        ("errorCount", summary.errors.len()),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |text, (name, count)| {
            text.replace(&format!("{{{{{name}}}}}"), &count.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgate_core::Finding;

    fn finding() -> Finding {
        Finding {
            line: 1,
            message: "x".into(),
        }
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let summary = ResultSummary {
            minors: vec![finding()],
            majors: vec![finding(), finding()],
            warnings: vec![],
            errors: vec![finding(), finding(), finding()],
        };
        let text = render(
            "{{minorCount}}/{{majorCount}}/{{warningCount}}/{{errorCount}} ({{errorCount}})",
            &summary,
        );
        assert_eq!(text, "1/2/0/3 (3)");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let text = render("{{other}} {{ minorCount }}", &ResultSummary::default());
        assert_eq!(text, "{{other}} {{ minorCount }}");
    }

    #[test]
    fn load_template_by_severity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("major.txt"), "major: {{majorCount}}").unwrap();
        assert_eq!(
            load_template(dir.path(), Severity::Major).unwrap(),
            "major: {{majorCount}}"
        );
    }

    #[test]
    fn missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_template(dir.path(), Severity::Patch).unwrap_err();
        let expected = format!(
            "Unable to access template file: {}",
            dir.path().join("patch.txt").display()
        );
        assert_eq!(err.to_string(), expected);
    }
}
