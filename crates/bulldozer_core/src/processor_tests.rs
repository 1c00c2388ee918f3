use super::*;
use crate::config::parse_configuration;
use crate::config_resolver::DEFAULT_CONFIG_PATH;
use crate::pull_context::GitHubPullContext;
use github_client::models::{CheckState, PullRequest};
use test_utils::fixtures::{pull_request, status, OWNER, REPO};
use test_utils::{MockFailure, MockPullRequestClient};
use tracing_test::traced_test;

const POLICY: &str = "\
version: 1
update:
  trigger:
    labels: [\"update me\"]
merge:
  trigger:
    labels: [\"merge when ready\"]
  required_statuses: [\"ci\"]
";

fn processor() -> PullRequestProcessor {
    PullRequestProcessor::new(Arc::new(ConfigResolver::default()))
}

fn context(client: &Arc<MockPullRequestClient>, pr: PullRequest) -> GitHubPullContext {
    GitHubPullContext::new(client.clone(), OWNER, REPO, pr)
}

#[tokio::test]
async fn test_closed_pull_request_is_skipped() {
    let client = Arc::new(MockPullRequestClient::new());
    let ctx = context(&client, pull_request(1).closed().build());

    let outcome = processor()
        .process(client.clone(), &ctx, "main")
        .await
        .unwrap();

    assert!(matches!(outcome, ProcessOutcome::Closed));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_repository_without_policy_is_left_alone() {
    let client = Arc::new(MockPullRequestClient::new().with_labels(1, &["merge when ready"]));
    let ctx = context(&client, pull_request(1).build());

    let outcome = processor()
        .process(client.clone(), &ctx, "main")
        .await
        .unwrap();

    assert!(matches!(outcome, ProcessOutcome::NoConfiguration));
    assert_eq!(client.call_count("merge_pull_request"), 0);
}

#[tokio::test]
#[traced_test]
async fn test_invalid_policy_is_logged_and_ignored() {
    let client = Arc::new(MockPullRequestClient::new().with_file(
        DEFAULT_CONFIG_PATH,
        "main",
        "version: 1\nmerge:\n  unknown_option: true\n",
    ));
    let ctx = context(&client, pull_request(1).build());

    let outcome = processor()
        .process(client.clone(), &ctx, "main")
        .await
        .unwrap();

    assert!(matches!(outcome, ProcessOutcome::InvalidConfiguration));
    assert!(logs_contain("Ignoring invalid policy"));
}

#[tokio::test]
async fn test_fallback_policy_applies_without_repository_file() {
    let fallback = parse_configuration(POLICY).unwrap();
    let processor =
        PullRequestProcessor::new(Arc::new(ConfigResolver::new(DEFAULT_CONFIG_PATH, Some(fallback))));
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_labels(1, &["merge when ready"])
            .with_status_checks("head-sha-1", vec![status("ci", CheckState::Success, None)]),
    );
    let ctx = context(&client, pull_request(1).build());

    let outcome = processor.process(client.clone(), &ctx, "main").await.unwrap();

    assert!(matches!(
        outcome,
        ProcessOutcome::Evaluated {
            merge: MergeAction::Merged(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_policy_is_read_from_base_branch() {
    let client = Arc::new(MockPullRequestClient::new());
    let ctx = context(&client, pull_request(1).base_ref("develop").build());

    processor()
        .process(client.clone(), &ctx, "develop")
        .await
        .unwrap();

    assert_eq!(
        client.calls()[0].detail,
        "octo-org/widgets .bulldozer.yml@develop"
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_is_scheduled_and_merge_waits_for_statuses() {
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_file(DEFAULT_CONFIG_PATH, "main", POLICY)
            .with_labels(1, &["update me", "merge when ready"])
            .with_status_checks("head-sha-1", vec![status("ci", CheckState::Pending, None)])
            .with_pull_request(pull_request(1).build())
            .with_comparison(0, 2),
    );
    let ctx = context(&client, pull_request(1).build());

    let outcome = processor()
        .process(client.clone(), &ctx, "main")
        .await
        .unwrap();

    let ProcessOutcome::Evaluated { update, merge } = outcome else {
        panic!("expected an evaluated outcome");
    };
    assert_eq!(
        merge,
        MergeAction::Skipped(IneligibleReason::UnsatisfiedStatuses(vec!["ci".to_string()]))
    );
    let UpdateAction::Scheduled(handle) = update else {
        panic!("expected a scheduled update");
    };
    assert!(matches!(handle.await.unwrap(), UpdateOutcome::Updated { .. }));
    assert_eq!(client.call_count("merge_branch"), 1);
}

#[tokio::test]
async fn test_update_evaluation_failure_does_not_block_merge() {
    let policy = "\
version: 1
update:
  required_statuses: [\"ci\"]
merge:
  trigger:
    labels: [\"merge when ready\"]
";
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_file(DEFAULT_CONFIG_PATH, "main", policy)
            .with_labels(1, &["merge when ready"])
            .with_failure("list_status_checks", MockFailure::Api("boom".to_string())),
    );
    let ctx = context(&client, pull_request(1).build());

    let outcome = processor()
        .process(client.clone(), &ctx, "main")
        .await
        .unwrap();

    let ProcessOutcome::Evaluated { update, merge } = outcome else {
        panic!("expected an evaluated outcome");
    };
    assert!(matches!(update, UpdateAction::Failed(_)));
    assert!(matches!(merge, MergeAction::Merged(_)));
    assert_eq!(client.call_count("merge_pull_request"), 1);
}

#[tokio::test]
async fn test_config_transport_error_is_returned() {
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_failure("get_file_content", MockFailure::RateLimit),
    );
    let ctx = context(&client, pull_request(1).build());

    let result = processor().process(client.clone(), &ctx, "main").await;

    assert!(matches!(result, Err(BulldozerError::ConfigTransport { .. })));
}

#[tokio::test]
async fn test_push_restriction_client_merges_restricted_branch() {
    let token = Arc::new(MockPullRequestClient::new());
    let processor = processor().with_push_restriction_client(token.clone());
    let policy = "version: 1\nmerge:\n  trigger:\n    branches: [\"main\"]\n";
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_file(DEFAULT_CONFIG_PATH, "main", policy)
            .with_push_restrictions("main"),
    );
    let ctx = context(&client, pull_request(1).build());

    processor.process(client.clone(), &ctx, "main").await.unwrap();

    assert_eq!(token.call_count("merge_pull_request"), 1);
    assert_eq!(client.call_count("merge_pull_request"), 0);
}
