//! Keyword triage of open issues, rendered as the body of a triage issue.

use std::fmt::Write as _;

use jiff::civil::Date;

use crate::models::IssueSummary;

/// Category and priority assigned to an issue by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triage {
    pub category: &'static str,
    pub priority: &'static str,
}

const RULES: &[(&[&str], Triage)] = &[
    (
        &["security", "vulnerability", "cve"],
        Triage {
            category: "security",
            priority: "critical",
        },
    ),
    (
        &["bug", "error", "crash", "panic"],
        Triage {
            category: "bug",
            priority: "high",
        },
    ),
    (
        &["feature", "enhancement", "request"],
        Triage {
            category: "enhancement",
            priority: "medium",
        },
    ),
];

const FALLBACK: Triage = Triage {
    category: "other",
    priority: "low",
};

/// First matching rule wins.
pub fn classify(title: &str) -> Triage {
    let title = title.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map_or(FALLBACK, |(_, triage)| *triage)
}

/// Markdown body listing each open issue with its triage. Pull requests are
/// left out.
pub fn render_report(repo: &str, date: Date, issues: &[IssueSummary]) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "Automated triage of open issues in `{repo}` on {date}.");
    let _ = writeln!(body);

    let open: Vec<_> = issues.iter().filter(|i| !i.is_pull_request).collect();
    if open.is_empty() {
        let _ = writeln!(body, "No open issues.");
        return body;
    }

    let _ = writeln!(body, "| Issue | Title | Category | Priority |");
    let _ = writeln!(body, "|---|---|---|---|");
    for issue in open {
        let triage = classify(&issue.title);
        let _ = writeln!(
            body,
            "| #{} | {} | {} | {} |",
            issue.number,
            issue.title.replace('|', "\\|"),
            triage.category,
            triage.priority
        );
    }
    body
}
