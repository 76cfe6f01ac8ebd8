mod common;

use common::{
    create_test_store, issue, reopen_store, repo, test_agent, test_config,
    FakeNotifier, FakeSourceHost, FakeTextGenerator,
};
use foreman_core::{
    CollaboratorError, Collaborators, Config, ForemanError, OrgState, PlanStatus, ReportStatus,
};
use jiff::{civil::date, Timestamp};

#[tokio::test]
async fn test_generate_ideas_ranks_and_is_idempotent() {
    let (_dir, store) = create_test_store().await;
    let generator = FakeTextGenerator::new(
        r#"Here you go: [{"title": "Weather CLI", "description": "Forecasts"},
            {"title": "Log Lens", "description": "Reads logs"}]"#,
        &[("Log Lens", 0.9), ("Weather CLI", 0.4)],
    );
    let collaborators = Collaborators {
        text_generator: Some(generator.clone()),
        ..Collaborators::default()
    };
    let agent = test_agent(store.clone(), test_config(3), collaborators);
    let day = date(2024, 6, 1);

    let ideas = agent.generate_ideas(day).await.unwrap();
    assert_eq!(ideas.len(), 2);
    assert_eq!(ideas[0].title, "Log Lens");
    assert_eq!(ideas[0].rank, 0);
    assert_eq!(ideas[1].title, "Weather CLI");

    let again = agent.generate_ideas(day).await.unwrap();
    assert_eq!(again, ideas);
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    assert_eq!(store.load().await.unwrap().counters.ideas_processed, 2);
}

#[tokio::test]
async fn test_generate_ideas_without_generator_fails() {
    let (_dir, store) = create_test_store().await;
    let agent = test_agent(store, test_config(3), Collaborators::default());

    let err = agent.generate_ideas(date(2024, 6, 1)).await.unwrap_err();
    assert!(matches!(err, ForemanError::Collaborator(_)));
}

#[tokio::test]
async fn test_report_is_sent_once_per_day() {
    let (dir, store) = create_test_store().await;
    let notifier = FakeNotifier::new("email");
    let collaborators = Collaborators {
        notifiers: vec![notifier.clone()],
        ..Collaborators::default()
    };
    let day = date(2024, 6, 1);

    let agent = test_agent(store, test_config(3), collaborators.clone());
    let first = agent.report_status(day).await.unwrap();
    assert_eq!(first.status, ReportStatus::Sent);
    assert_eq!(first.delivered_count(), 1);
    assert_eq!(
        agent.report_status(day).await.unwrap().status,
        ReportStatus::AlreadySent
    );

    // A restarted agent sees the claim too.
    let restarted = test_agent(reopen_store(&dir).await, test_config(3), collaborators);
    assert_eq!(
        restarted.report_status(day).await.unwrap().status,
        ReportStatus::AlreadySent
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Foreman Status Report - 2024-06-01");
    assert!(sent[0].body.contains("## Counters"));
}

#[tokio::test]
async fn test_report_read_failure_leaves_day_unclaimed() {
    let (dir, store) = create_test_store().await;
    store.save(&OrgState::default()).await.unwrap();
    let notifier = FakeNotifier::new("email");
    let collaborators = Collaborators {
        notifiers: vec![notifier.clone()],
        ..Collaborators::default()
    };
    let agent = test_agent(store, test_config(3), collaborators);
    let day = date(2024, 6, 1);

    let db = rusqlite::Connection::open(dir.path().join("test.db")).unwrap();
    db.execute("UPDATE org_state SET recent_actions = '{oops' WHERE id = 1", [])
        .unwrap();
    let err = agent.report_status(day).await.unwrap_err();
    assert!(matches!(err, ForemanError::StateCorruption { .. }));
    assert!(notifier.sent().is_empty());

    db.execute("UPDATE org_state SET recent_actions = '[]' WHERE id = 1", [])
        .unwrap();
    let outcome = agent.report_status(day).await.unwrap();
    assert_eq!(outcome.status, ReportStatus::Sent);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_report_without_channels_claims_nothing() {
    let (_dir, store) = create_test_store().await;
    let day = date(2024, 6, 1);

    let silent = test_agent(store.clone(), test_config(3), Collaborators::default());
    assert_eq!(
        silent.report_status(day).await.unwrap().status,
        ReportStatus::NoChannels
    );

    let notifier = FakeNotifier::new("chat");
    let collaborators = Collaborators {
        notifiers: vec![notifier.clone()],
        ..Collaborators::default()
    };
    let agent = test_agent(store, test_config(3), collaborators);
    assert_eq!(agent.report_status(day).await.unwrap().status, ReportStatus::Sent);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_does_not_block_other_channels() {
    let (_dir, store) = create_test_store().await;
    let broken = FakeNotifier::failing("email", CollaboratorError::transient("smtp", "421"));
    let working = FakeNotifier::new("chat");
    let collaborators = Collaborators {
        notifiers: vec![broken, working.clone()],
        ..Collaborators::default()
    };
    let agent = test_agent(store, test_config(3), collaborators);

    let outcome = agent.report_status(date(2024, 6, 1)).await.unwrap();
    assert_eq!(outcome.status, ReportStatus::Sent);
    assert!(outcome.deliveries[0].error.is_some());
    assert!(outcome.deliveries[1].error.is_none());
    assert_eq!(working.sent().len(), 1);
}

#[tokio::test]
async fn test_startup_notice_is_sent_once() {
    let (_dir, store) = create_test_store().await;
    let notifier = FakeNotifier::new("chat");
    let collaborators = Collaborators {
        notifiers: vec![notifier.clone()],
        ..Collaborators::default()
    };
    let agent = test_agent(store, test_config(3), collaborators);

    assert!(agent.announce_startup().await.unwrap());
    assert!(!agent.announce_startup().await.unwrap());
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_maintenance_closes_stale_issues() {
    let (_dir, store) = create_test_store().await;
    let host = FakeSourceHost::new();
    host.with_repositories(&["log-lens"]);
    let recent = Timestamp::now().to_string();
    host.with_issues(
        "log-lens",
        vec![
            issue(1, "Crash on start", Some("2020-01-01T00:00:00Z"), false),
            issue(2, "Fresh report", Some(&recent), false),
            issue(3, "Old pull request", Some("2020-01-01T00:00:00Z"), true),
        ],
    );
    let collaborators = Collaborators {
        source_host: Some(host.clone()),
        ..Collaborators::default()
    };
    let agent = test_agent(store.clone(), test_config(3), collaborators);

    let report = agent.run_maintenance().await.unwrap();

    assert_eq!(report.repositories, 1);
    assert_eq!(report.issues_closed, 1);
    assert_eq!(report.prs_open, 1);
    assert_eq!(host.closed(), vec![("log-lens".to_string(), 1)]);

    let state = store.load().await.unwrap();
    assert_eq!(state.counters.issues_closed, 1);
    assert_eq!(state.counters.prs_open, 1);
    assert_eq!(store.list_repositories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dry_run_maintenance_closes_nothing() {
    let (_dir, store) = create_test_store().await;
    let host = FakeSourceHost::new();
    host.with_repositories(&["log-lens"]);
    host.with_issues(
        "log-lens",
        vec![issue(1, "Ancient", Some("2020-01-01T00:00:00Z"), false)],
    );
    let collaborators = Collaborators {
        source_host: Some(host.clone()),
        ..Collaborators::default()
    };
    let config = Config {
        dry_run: true,
        ..test_config(3)
    };
    let agent = test_agent(store, config, collaborators);

    let report = agent.run_maintenance().await.unwrap();
    assert_eq!(report.issues_closed, 0);
    assert!(host.closed().is_empty());
}

#[tokio::test]
async fn test_daily_cycle_end_to_end() {
    let (_dir, store) = create_test_store().await;
    let day = date(2024, 6, 1);
    store.upsert_repositories(vec![repo("log-lens")]).await.unwrap();

    let host = FakeSourceHost::new();
    host.with_repositories(&["log-lens"]);
    let generator = FakeTextGenerator::new(
        r#"[{"title": "Weather CLI", "description": "Forecasts"},
            {"title": "Log Lens", "description": "Reads logs"}]"#,
        &[("Log Lens", 0.9), ("Weather CLI", 0.4)],
    );
    let notifier = FakeNotifier::new("chat");
    let collaborators = Collaborators {
        source_host: Some(host.clone()),
        text_generator: Some(generator),
        trend_source: None,
        notifiers: vec![notifier.clone()],
    };
    let agent = test_agent(store.clone(), test_config(3), collaborators);

    let summary = agent.run_daily_cycle(day).await;

    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    assert_eq!(summary.ideas, Some(2));
    let plan = summary.plan.expect("plan executed");
    assert_eq!(plan.status, PlanStatus::Executed);
    assert_eq!(plan.entries[0].target, "log-lens");
    assert_eq!(plan.entries[1].target, "weather-cli");
    assert_eq!(summary.report.unwrap().status, ReportStatus::Sent);
    assert_eq!(summary.maintenance.unwrap().repositories, 2);

    // A second cycle on the same day repeats nothing.
    let calls = host.count("create_repository");
    let again = agent.run_daily_cycle(day).await;
    assert_eq!(again.report.unwrap().status, ReportStatus::AlreadySent);
    assert_eq!(host.count("create_repository"), calls);
    assert_eq!(notifier.sent().len(), 1);

    let status = agent.status(day).await.unwrap();
    assert_eq!(status.state.counters.repositories_created, 1);
    assert!(status.to_string().contains("# Status on 2024-06-01"));
}
