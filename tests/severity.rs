use semgate_core::{Finding, ResultSummary, Severity};

fn findings(n: usize) -> Vec<Finding> {
    (1..=n)
        .map(|line| Finding {
            line,
            message: format!("finding {line}"),
        })
        .collect()
}

#[test]
fn empty_summary_is_patch() {
    assert_eq!(ResultSummary::default().severity(), Severity::Patch);
}

#[test]
fn errors_outrank_everything() {
    let summary = ResultSummary {
        minors: findings(3),
        majors: findings(2),
        warnings: findings(1),
        errors: findings(1),
    };
    assert_eq!(summary.severity(), Severity::Error);
}

#[test]
fn warnings_outrank_major_changes() {
    let summary = ResultSummary {
        majors: findings(5),
        warnings: findings(1),
        ..Default::default()
    };
    assert_eq!(summary.severity(), Severity::Warning);
}

#[test]
fn major_outranks_minor() {
    let summary = ResultSummary {
        minors: findings(4),
        majors: findings(1),
        ..Default::default()
    };
    assert_eq!(summary.severity(), Severity::Major);

    let summary = ResultSummary {
        minors: findings(1),
        ..Default::default()
    };
    assert_eq!(summary.severity(), Severity::Minor);
}

#[test]
fn severity_order_matches_precedence() {
    assert!(Severity::Error > Severity::Warning);
    assert!(Severity::Warning > Severity::Major);
    assert!(Severity::Major > Severity::Minor);
    assert!(Severity::Minor > Severity::Patch);
}
