mod common;

use std::time::Duration;

use common::{
    create_test_store, reopen_store, repo, scored, seed, test_agent, test_config, FakeSourceHost,
};
use foreman_core::{
    db::plan_queries::EntryResolution, error::PermanentKind, ActionKind, CollaboratorError,
    Collaborators, EntryStatus, PlanStatus,
};
use jiff::civil::date;

/// Two ideas and one existing repository, three actions a day.
async fn scenario() -> (tempfile::TempDir, foreman_core::StateStore, std::sync::Arc<FakeSourceHost>) {
    let (dir, store) = create_test_store().await;
    seed(
        &store,
        date(2024, 6, 1),
        vec![scored("weather-cli", 0.9), scored("log-lens", 0.7)],
        &["log-lens"],
    )
    .await;
    let host = FakeSourceHost::new();
    host.with_repositories(&["log-lens"]);
    (dir, store, host)
}

fn with_host(host: &std::sync::Arc<FakeSourceHost>) -> Collaborators {
    Collaborators {
        source_host: Some(host.clone()),
        ..Collaborators::default()
    }
}

#[tokio::test]
async fn test_plan_executes_every_entry() {
    let (_dir, store, host) = scenario().await;
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);

    let planned = agent.build_plan(day).await.unwrap();
    assert_eq!(planned.entries.len(), 3);

    let plan = agent.execute_plan(day).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Executed);
    assert!(plan.entries.iter().all(|e| e.status == EntryStatus::Succeeded));
    assert_eq!(
        plan.entries[0].reference.as_deref(),
        Some("https://github.com/acme/weather-cli")
    );
    assert_eq!(
        plan.entries[1].reference.as_deref(),
        Some("refs/heads/feature/log-lens-2024-06-01")
    );
    assert_eq!(plan.entries[2].reference.as_deref(), Some("log-lens#1"));

    let state = store.load().await.unwrap();
    assert_eq!(state.counters.repositories_created, 1);
    assert_eq!(state.counters.branches_opened, 1);
    assert_eq!(state.counters.issues_opened, 1);
    assert_eq!(state.recent_actions.len(), 3);
    assert_eq!(state.recent_actions[0].kind, ActionKind::FileIssue);

    let repositories = store.list_repositories().await.unwrap();
    let created = repositories
        .iter()
        .find(|r| r.name == "weather-cli")
        .expect("created repository is registered");
    assert!(created.idea_id.is_some());
    assert_eq!(created.url.as_deref(), Some("https://github.com/acme/weather-cli"));
}

#[tokio::test]
async fn test_executing_twice_makes_no_new_calls() {
    let (_dir, store, host) = scenario().await;
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);

    agent.build_plan(day).await.unwrap();
    let first = agent.execute_plan(day).await.unwrap();
    let calls = host.calls();

    let second = agent.execute_plan(day).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(host.calls(), calls);
    assert_eq!(store.load().await.unwrap().counters.repositories_created, 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let (_dir, store, host) = scenario().await;
    host.fail(
        "create_repository",
        CollaboratorError::transient("github", "502 Bad Gateway"),
    );
    let agent = test_agent(store, test_config(3), with_host(&host));
    let day = date(2024, 6, 1);

    agent.build_plan(day).await.unwrap();
    let plan = agent.execute_plan(day).await.unwrap();

    assert_eq!(plan.entries[0].status, EntryStatus::Succeeded);
    assert_eq!(plan.entries[0].attempts, 2);
    assert_eq!(host.count("create_repository"), 2);
}

#[tokio::test]
async fn test_exhausted_retries_fail_the_entry_only() {
    let (_dir, store, host) = scenario().await;
    for _ in 0..3 {
        host.fail(
            "create_repository",
            CollaboratorError::transient("github", "connection reset"),
        );
    }
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);

    agent.build_plan(day).await.unwrap();
    let plan = agent.execute_plan(day).await.unwrap();

    let failed = &plan.entries[0];
    assert_eq!(failed.status, EntryStatus::Failed);
    assert_eq!(failed.attempts, 3);
    assert_eq!(failed.error.as_ref().unwrap().classification, "transient");
    assert_eq!(plan.entries[1].status, EntryStatus::Succeeded);
    assert_eq!(plan.entries[2].status, EntryStatus::Succeeded);
    assert_eq!(plan.status, PlanStatus::Executed);

    let state = store.load().await.unwrap();
    assert_eq!(state.counters.repositories_created, 0);
    assert_eq!(state.counters.branches_opened, 1);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let (_dir, store, host) = scenario().await;
    host.fail(
        "create_repository",
        CollaboratorError::permanent("github", PermanentKind::PermissionDenied, "403 Forbidden"),
    );
    let agent = test_agent(store, test_config(3), with_host(&host));
    let day = date(2024, 6, 1);

    agent.build_plan(day).await.unwrap();
    let plan = agent.execute_plan(day).await.unwrap();

    assert_eq!(plan.entries[0].status, EntryStatus::Failed);
    assert_eq!(plan.entries[0].attempts, 1);
    assert_eq!(
        plan.entries[0].error.as_ref().unwrap().classification,
        "permission-denied"
    );
    assert_eq!(host.count("create_repository"), 1);
    assert_eq!(host.count("create_branch"), 1);
    assert_eq!(host.count("create_issue"), 1);
}

#[tokio::test]
async fn test_resumes_after_partial_execution() {
    let (_dir, store, host) = scenario().await;
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);
    agent.build_plan(day).await.unwrap();

    // First entry finished before the previous process died.
    store
        .resolve_entry(
            day,
            EntryResolution {
                position: 0,
                status: EntryStatus::Succeeded,
                reference: Some("https://github.com/acme/weather-cli".to_string()),
                error: None,
                attempts: 1,
            },
            20,
        )
        .await
        .unwrap();

    let plan = agent.execute_plan(day).await.unwrap();

    assert_eq!(plan.status, PlanStatus::Executed);
    assert_eq!(host.count("create_repository"), 0);
    assert_eq!(host.count("create_branch"), 1);
    assert_eq!(store.load().await.unwrap().counters.repositories_created, 1);
}

#[tokio::test]
async fn test_shutdown_leaves_entries_pending() {
    let (_dir, store, host) = scenario().await;
    let agent = test_agent(store, test_config(3), with_host(&host));
    let day = date(2024, 6, 1);
    agent.build_plan(day).await.unwrap();

    agent.request_shutdown();
    let plan = agent.execute_plan(day).await.unwrap();

    assert_eq!(plan.status, PlanStatus::Planned);
    assert!(plan.has_pending());
    assert!(host.calls().is_empty());
}

fn assert_each_action_once(host: &FakeSourceHost) {
    assert_eq!(host.count("create_repository"), 1);
    assert_eq!(host.count("create_branch"), 1);
    assert_eq!(host.count("list_issues"), 1);
    assert_eq!(host.count("create_issue"), 1);
}

#[tokio::test]
async fn test_concurrent_execution_on_one_agent_runs_each_entry_once() {
    let (_dir, store, host) = scenario().await;
    host.with_delay(Duration::from_millis(50));
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);
    agent.build_plan(day).await.unwrap();

    let (first, second) = tokio::join!(agent.execute_plan(day), agent.execute_plan(day));
    first.unwrap();
    second.unwrap();

    assert_each_action_once(&host);
    let plan = store.get_plan(day).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Executed);
    let state = store.load().await.unwrap();
    assert_eq!(state.counters.repositories_created, 1);
    assert_eq!(state.recent_actions.len(), 3);
}

#[tokio::test]
async fn test_two_agents_on_one_database_run_each_entry_once() {
    let (dir, store, host) = scenario().await;
    host.with_delay(Duration::from_millis(50));
    let day = date(2024, 6, 1);
    let first = test_agent(store.clone(), test_config(3), with_host(&host));
    let second = test_agent(reopen_store(&dir).await, test_config(3), with_host(&host));
    first.build_plan(day).await.unwrap();

    let (a, b) = tokio::join!(first.execute_plan(day), second.execute_plan(day));
    a.unwrap();
    b.unwrap();

    assert_each_action_once(&host);
    let plan = store.get_plan(day).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Executed);
    assert!(plan.entries.iter().all(|e| e.status == EntryStatus::Succeeded));

    let state = store.load().await.unwrap();
    assert_eq!(state.counters.repositories_created, 1);
    assert_eq!(state.counters.branches_opened, 1);
    assert_eq!(state.counters.issues_opened, 1);
    assert_eq!(state.recent_actions.len(), 3);
}

#[tokio::test]
async fn test_expired_claim_from_dead_process_is_taken_over() {
    let (_dir, store, host) = scenario().await;
    let agent = test_agent(store.clone(), test_config(3), with_host(&host));
    let day = date(2024, 6, 1);
    agent.build_plan(day).await.unwrap();

    // A process claimed the first entry and died; its lease is already over.
    assert!(store
        .claim_entry(day, 0, "crashed-process", Duration::ZERO)
        .await
        .unwrap());

    let plan = agent.execute_plan(day).await.unwrap();

    assert_eq!(plan.status, PlanStatus::Executed);
    assert_eq!(plan.entries[0].status, EntryStatus::Succeeded);
    assert_each_action_once(&host);
}

#[tokio::test]
async fn test_repeated_triage_files_distinct_issues() {
    let (_dir, store) = create_test_store().await;
    let day = date(2024, 6, 1);
    store.upsert_repositories(vec![repo("log-lens")]).await.unwrap();
    let host = FakeSourceHost::new();
    host.with_repositories(&["log-lens"]);
    let agent = test_agent(store, test_config(3), with_host(&host));

    let planned = agent.build_plan(day).await.unwrap();
    assert!(planned
        .entries
        .iter()
        .all(|e| e.kind == ActionKind::FileIssue && e.target == "log-lens"));

    let plan = agent.execute_plan(day).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Executed);
    assert_eq!(
        host.issue_titles(),
        vec![
            "Issue triage report 2024-06-01",
            "Issue triage report 2024-06-01 (pass 2)",
            "Issue triage report 2024-06-01 (pass 3)",
        ]
    );
}
