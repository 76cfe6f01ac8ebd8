//! Action catalog: the kinds of work a plan can contain, how each is derived
//! from an idea or a repository, and the preconditions it must satisfy.

use jiff::civil::Date;

use crate::{
    error::{ForemanError, Result},
    models::{ActionKind, Idea, PlanEntry, Repository},
};

/// GitHub's limit on repository name length.
const MAX_REPOSITORY_NAME_LEN: usize = 100;

/// A validated action waiting for a position in a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCandidate {
    pub kind: ActionKind,
    pub target: String,
    pub idea_id: Option<u64>,
    pub instruction: String,
}

impl ActionCandidate {
    pub fn into_entry(self, position: u32) -> PlanEntry {
        PlanEntry::pending(
            position,
            self.idea_id,
            self.kind,
            self.target,
            self.instruction,
        )
    }

    /// Two candidates collide when they do the same kind of work on the same
    /// repository.
    pub fn conflicts_with(&self, other: &ActionCandidate) -> bool {
        self.kind == other.kind && self.target.eq_ignore_ascii_case(&other.target)
    }
}

/// Derives a repository name from free text: lowercase ASCII alphanumerics
/// separated by single hyphens.
///
/// Returns `None` when nothing usable remains.
pub fn repository_name(title: &str) -> Option<String> {
    let mut slug = String::with_capacity(title.len());
    for ch in title.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.truncate(MAX_REPOSITORY_NAME_LEN);
    let slug = slug.trim_matches('-').to_string();
    (!slug.is_empty()).then_some(slug)
}

/// Checks a repository name against the host's naming rules.
pub fn validate_repository_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(ForemanError::invalid_input("target").with_reason(reason));

    if name.is_empty() {
        return invalid("Repository name must not be empty");
    }
    if name.len() > MAX_REPOSITORY_NAME_LEN {
        return invalid("Repository name must be at most 100 characters");
    }
    if name == "." || name == ".." {
        return invalid("Repository name must not be '.' or '..'");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return invalid("Repository name may only contain letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

/// Name of the feature branch opened on `repo` for the plan of `date`.
pub fn branch_name(repo: &str, date: Date) -> String {
    format!("feature/{repo}-{date}")
}

/// Title of the triage issue filed by a maintenance entry. Later passes
/// over the same repository on one day carry their pass number.
pub fn triage_issue_title(date: Date, pass: usize) -> String {
    if pass <= 1 {
        format!("Issue triage report {date}")
    } else {
        format!("Issue triage report {date} (pass {pass})")
    }
}

/// Which triage pass over its repository `entry` is within `entries`,
/// counting from 1 in plan order.
pub fn triage_pass(entries: &[PlanEntry], entry: &PlanEntry) -> usize {
    entries
        .iter()
        .filter(|other| {
            other.position <= entry.position
                && other.kind == ActionKind::FileIssue
                && other.target.eq_ignore_ascii_case(&entry.target)
        })
        .count()
        .max(1)
}

fn find_repository<'a>(repositories: &'a [Repository], name: &str) -> Option<&'a Repository> {
    repositories
        .iter()
        .find(|repo| repo.name.eq_ignore_ascii_case(name))
}

/// The repository realising `idea`, if one exists: either linked to the idea
/// or named after it.
pub fn repository_for<'a>(idea: &Idea, repositories: &'a [Repository]) -> Option<&'a Repository> {
    repositories
        .iter()
        .find(|repo| repo.idea_id == Some(idea.id))
        .or_else(|| repository_name(&idea.title).and_then(|name| find_repository(repositories, &name)))
}

/// The idea-backed action for `idea`: create its repository if none exists,
/// otherwise open a feature branch on it.
pub fn candidate_for_idea(
    idea: &Idea,
    repositories: &[Repository],
    date: Date,
) -> Result<ActionCandidate> {
    if let Some(repo) = repository_for(idea, repositories) {
        return Ok(ActionCandidate {
            kind: ActionKind::OpenFeatureBranch,
            target: repo.name.clone(),
            idea_id: Some(idea.id),
            instruction: format!(
                "Open branch {} on {} to continue \"{}\"",
                branch_name(&repo.name, date),
                repo.name,
                idea.title
            ),
        });
    }

    let name = repository_name(&idea.title).ok_or_else(|| {
        ForemanError::invalid_input("title").with_reason(format!(
            "Idea {} has no usable repository name: {:?}",
            idea.id, idea.title
        ))
    })?;
    validate_repository_name(&name)?;

    Ok(ActionCandidate {
        kind: ActionKind::CreateRepository,
        instruction: format!("Create repository {name} for \"{}\"", idea.title),
        target: name,
        idea_id: Some(idea.id),
    })
}

/// A maintenance triage action on an existing repository. `pass` numbers
/// repeated triage of the same repository within one plan.
pub fn triage_candidate(repository: &Repository, pass: usize) -> Result<ActionCandidate> {
    validate_repository_name(&repository.name)?;
    let instruction = if pass <= 1 {
        format!("Triage open issues on {}", repository.name)
    } else {
        format!("Triage open issues on {} (pass {pass})", repository.name)
    };
    Ok(ActionCandidate {
        kind: ActionKind::FileIssue,
        target: repository.name.clone(),
        idea_id: None,
        instruction,
    })
}

/// Checks that `entry` still makes sense against the known repositories.
///
/// Repository creation needs an idea and a valid, not yet taken name; the
/// other kinds need an existing target.
pub fn validate_entry(entry: &PlanEntry, repositories: &[Repository]) -> Result<()> {
    validate_repository_name(&entry.target)?;

    match entry.kind {
        ActionKind::CreateRepository => {
            if entry.idea_id.is_none() {
                return Err(ForemanError::invalid_input("idea_id")
                    .with_reason("Repository creation must reference an idea"));
            }
            if find_repository(repositories, &entry.target).is_some() {
                return Err(ForemanError::invalid_input("target")
                    .with_reason(format!("Repository {} already exists", entry.target)));
            }
        }
        ActionKind::OpenFeatureBranch | ActionKind::FileIssue => {
            if find_repository(repositories, &entry.target).is_none() {
                return Err(ForemanError::invalid_input("target")
                    .with_reason(format!("Unknown repository {}", entry.target)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::{civil::date, Timestamp};

    use super::*;

    fn idea(id: u64, title: &str) -> Idea {
        Idea {
            id,
            title: title.to_string(),
            description: String::new(),
            score: 0.5,
            rank: 0,
            batch_date: date(2024, 6, 1),
            created_at: Timestamp::now(),
        }
    }

    fn repo(name: &str, idea_id: Option<u64>) -> Repository {
        Repository {
            name: name.to_string(),
            idea_id,
            url: None,
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_repeated_triage_gets_distinct_titles() {
        let day = date(2024, 6, 1);
        let entries = vec![
            PlanEntry::pending(0, None, ActionKind::FileIssue, "alpha", "Triage alpha"),
            PlanEntry::pending(1, None, ActionKind::FileIssue, "beta", "Triage beta"),
            PlanEntry::pending(2, None, ActionKind::FileIssue, "Alpha", "Triage alpha again"),
        ];

        assert_eq!(triage_pass(&entries, &entries[0]), 1);
        assert_eq!(triage_pass(&entries, &entries[1]), 1);
        assert_eq!(triage_pass(&entries, &entries[2]), 2);
        assert_eq!(triage_issue_title(day, 1), "Issue triage report 2024-06-01");
        assert_eq!(
            triage_issue_title(day, 2),
            "Issue triage report 2024-06-01 (pass 2)"
        );
    }

    #[test]
    fn test_repository_name_slugs() {
        assert_eq!(
            repository_name("  Weather CLI: fast & tiny!").as_deref(),
            Some("weather-cli-fast-tiny")
        );
        assert_eq!(repository_name("Ünïcode only ☃").as_deref(), Some("n-code-only"));
        assert_eq!(repository_name("!!!"), None);
        assert_eq!(repository_name(&"a".repeat(150)).map(|s| s.len()), Some(100));
    }

    #[test]
    fn test_validate_repository_name() {
        assert!(validate_repository_name("log_lens.v2").is_ok());
        assert!(validate_repository_name("..").is_err());
        assert!(validate_repository_name("has space").is_err());
        assert!(validate_repository_name("").is_err());
    }

    #[test]
    fn test_new_idea_creates_repository() {
        let candidate = candidate_for_idea(&idea(1, "Weather CLI"), &[], date(2024, 6, 1)).unwrap();
        assert_eq!(candidate.kind, ActionKind::CreateRepository);
        assert_eq!(candidate.target, "weather-cli");
        assert_eq!(candidate.idea_id, Some(1));
    }

    #[test]
    fn test_existing_repository_gets_branch() {
        let repos = [repo("Weather-CLI", None)];
        let candidate =
            candidate_for_idea(&idea(1, "Weather CLI"), &repos, date(2024, 6, 1)).unwrap();
        assert_eq!(candidate.kind, ActionKind::OpenFeatureBranch);
        assert_eq!(candidate.target, "Weather-CLI");
        assert!(candidate.instruction.contains("feature/Weather-CLI-2024-06-01"));
    }

    #[test]
    fn test_linked_repository_wins_over_name() {
        let repos = [repo("forecasting", Some(7))];
        let candidate =
            candidate_for_idea(&idea(7, "Weather CLI"), &repos, date(2024, 6, 1)).unwrap();
        assert_eq!(candidate.target, "forecasting");
    }

    #[test]
    fn test_validate_entry_preconditions() {
        let repos = [repo("alpha", None)];
        let create_existing =
            PlanEntry::pending(0, Some(1), ActionKind::CreateRepository, "alpha", "");
        assert!(validate_entry(&create_existing, &repos).is_err());

        let create_orphan = PlanEntry::pending(0, None, ActionKind::CreateRepository, "beta", "");
        assert!(validate_entry(&create_orphan, &repos).is_err());

        let issue_unknown = PlanEntry::pending(0, None, ActionKind::FileIssue, "gamma", "");
        assert!(validate_entry(&issue_unknown, &repos).is_err());

        let issue_known = PlanEntry::pending(0, None, ActionKind::FileIssue, "alpha", "");
        assert!(validate_entry(&issue_known, &repos).is_ok());
    }
}
