//! Tests for the planner module.

use jiff::civil::date;
use tempfile::TempDir;

use super::*;
use crate::{
    models::{ActionKind, ScoredProposal},
    store::StateStoreBuilder,
};

/// Helper function to create a planner over a throwaway store
async fn create_test_planner(actions: usize) -> (TempDir, StateStore, DailyPlanner) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = StateStoreBuilder::new()
        .with_database_path(Some(temp_dir.path().join("test.db")))
        .build()
        .await
        .expect("Failed to create store");
    let planner = DailyPlanner::new(store.clone(), actions);
    (temp_dir, store, planner)
}

fn scored(title: &str, score: f64) -> ScoredProposal {
    ScoredProposal {
        title: title.to_string(),
        description: format!("{title} description"),
        score,
    }
}

fn repo(name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        idea_id: None,
        url: None,
        created_at: Timestamp::now(),
    }
}

#[tokio::test]
async fn test_plan_fills_with_maintenance() {
    let (_dir, store, planner) = create_test_planner(3).await;
    store
        .save_ideas(
            date(2024, 6, 1),
            vec![scored("weather-cli", 0.9), scored("log-lens", 0.7)],
        )
        .await
        .unwrap();
    store.upsert_repositories(vec![repo("log-lens")]).await.unwrap();

    let plan = planner.plan_for(date(2024, 6, 1)).await.unwrap();

    assert_eq!(plan.status, PlanStatus::Planned);
    let kinds: Vec<_> = plan.entries.iter().map(|e| (e.kind, e.target.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (ActionKind::CreateRepository, "weather-cli"),
            (ActionKind::OpenFeatureBranch, "log-lens"),
            (ActionKind::FileIssue, "log-lens"),
        ]
    );
    assert!(plan.entries[2].is_maintenance());
}

#[tokio::test]
async fn test_replanning_returns_identical_plan() {
    let (_dir, store, planner) = create_test_planner(2).await;
    store
        .save_ideas(date(2024, 6, 1), vec![scored("a", 0.5), scored("b", 0.4)])
        .await
        .unwrap();

    let first = planner.plan_for(date(2024, 6, 1)).await.unwrap();

    store
        .save_ideas(date(2024, 6, 1), vec![scored("c", 0.99), scored("d", 0.98)])
        .await
        .unwrap();
    let second = planner.plan_for(date(2024, 6, 1)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.list_plans(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_nothing_to_plan_is_an_error_and_persists_nothing() {
    let (_dir, store, planner) = create_test_planner(3).await;

    let err = planner.plan_for(date(2024, 6, 1)).await.unwrap_err();

    assert!(matches!(err, ForemanError::Planning { .. }));
    assert!(store.get_plan(date(2024, 6, 1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ideas_sorted_by_score_and_truncated() {
    let (_dir, store, planner) = create_test_planner(2).await;
    store
        .save_ideas(
            date(2024, 6, 1),
            vec![scored("low", 0.1), scored("high", 0.9), scored("mid", 0.5)],
        )
        .await
        .unwrap();

    let plan = planner.plan_for(date(2024, 6, 1)).await.unwrap();
    let targets: Vec<_> = plan.entries.iter().map(|e| e.target.as_str()).collect();
    assert_eq!(targets, vec!["high", "mid"]);
}

#[test]
fn test_equal_scores_keep_rank_order() {
    let temp_dir = TempDir::new().unwrap();
    let planner = DailyPlanner::new(StateStore::new(temp_dir.path().join("unused.db")), 2);
    let ideas = ["first", "second", "third"]
        .iter()
        .enumerate()
        .map(|(rank, title)| Idea {
            id: rank as u64 + 1,
            title: title.to_string(),
            description: String::new(),
            score: 0.5,
            rank: rank as u32,
            batch_date: date(2024, 6, 1),
            created_at: Timestamp::now(),
        })
        .collect();

    let plan = planner.build(date(2024, 6, 1), ideas, &[]).unwrap();
    assert_eq!(plan.entries[0].target, "first");
    assert_eq!(plan.entries[1].target, "second");
}

#[test]
fn test_colliding_ideas_are_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let planner = DailyPlanner::new(StateStore::new(temp_dir.path().join("unused.db")), 2);
    let idea = |id: u64, title: &str| Idea {
        id,
        title: title.to_string(),
        description: String::new(),
        score: 1.0 / id as f64,
        rank: id as u32,
        batch_date: date(2024, 6, 1),
        created_at: Timestamp::now(),
    };

    let plan = planner
        .build(
            date(2024, 6, 1),
            vec![idea(1, "Weather CLI"), idea(2, "weather cli"), idea(3, "Log Lens")],
            &[],
        )
        .unwrap();
    let targets: Vec<_> = plan.entries.iter().map(|e| e.target.as_str()).collect();
    assert_eq!(targets, vec!["weather-cli", "log-lens"]);
}

struct NoMaintenance;

impl MaintenancePolicy for NoMaintenance {
    fn select(&self, _: Date, _: &[Repository], _: usize) -> Vec<ActionCandidate> {
        Vec::new()
    }
}

#[tokio::test]
async fn test_custom_policy_is_consulted() {
    let (_dir, store, planner) = create_test_planner(2).await;
    let planner = planner.with_policy(Arc::new(NoMaintenance));
    store.upsert_repositories(vec![repo("alpha")]).await.unwrap();

    let err = planner.plan_for(date(2024, 6, 1)).await.unwrap_err();
    assert!(matches!(err, ForemanError::Planning { .. }));
}
