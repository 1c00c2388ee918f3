use super::*;
use crate::config_resolver::ConfigResolver;
use test_utils::fixtures::{installation, pull_request, repository};
use test_utils::{MockClientProvider, MockFailure, MockPullRequestClient};

fn scanner(provider: MockClientProvider) -> FullScanReconciler {
    let processor = PullRequestProcessor::new(Arc::new(ConfigResolver::default()));
    FullScanReconciler::new(Arc::new(provider), Arc::new(processor))
}

#[tokio::test]
async fn test_scan_visits_every_open_pull_request() {
    let first = Arc::new(
        MockPullRequestClient::new()
            .with_repository_pages(vec![
                vec![repository("acme", "api"), repository("acme", "web")],
                vec![Repository::new("legacy", "acme", true)],
            ])
            .with_open_pull_request_pages(
                "acme",
                "api",
                vec![vec![pull_request(1).build()], vec![pull_request(2).build()]],
            )
            .with_open_pull_request_pages("acme", "web", vec![vec![pull_request(9).build()]]),
    );
    let second = Arc::new(MockPullRequestClient::new());
    let provider = MockClientProvider::new()
        .with_installation(installation(1, "acme"), first.clone())
        .with_installation(installation(2, "empty-org"), second);

    let report = scanner(provider).run().await.unwrap();

    assert_eq!(
        report,
        ScanReport {
            installations: 2,
            repositories: 2,
            pull_requests: 3,
            failures: 0,
        }
    );
    assert_eq!(first.call_count("get_file_content"), 3);
    assert_eq!(first.call_count("list_installation_repositories"), 2);
}

#[tokio::test]
async fn test_archived_repositories_are_skipped() {
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_repository_pages(vec![vec![Repository::new("legacy", "acme", true)]]),
    );
    let provider = MockClientProvider::new().with_installation(installation(1, "acme"), client.clone());

    let report = scanner(provider).run().await.unwrap();

    assert_eq!(report.repositories, 0);
    assert_eq!(client.call_count("list_open_pull_requests"), 0);
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let healthy = Arc::new(
        MockPullRequestClient::new()
            .with_repository_pages(vec![vec![repository("acme", "api")]])
            .with_open_pull_request_pages("acme", "api", vec![vec![pull_request(1).build()]]),
    );
    let failing = Arc::new(
        MockPullRequestClient::new()
            .with_repository_pages(vec![vec![repository("other", "svc")]])
            .with_failure("list_open_pull_requests", MockFailure::RateLimit),
    );
    let provider = MockClientProvider::new()
        .with_broken_installation(installation(3, "gone"))
        .with_installation(installation(2, "other"), failing)
        .with_installation(installation(1, "acme"), healthy.clone());

    let report = scanner(provider).run().await.unwrap();

    assert_eq!(report.installations, 3);
    assert_eq!(report.repositories, 2);
    assert_eq!(report.pull_requests, 1);
    assert_eq!(report.failures, 2);
    assert_eq!(healthy.call_count("get_file_content"), 1);
}

#[tokio::test]
async fn test_pull_request_failure_does_not_stop_repository() {
    let client = Arc::new(
        MockPullRequestClient::new()
            .with_repository_pages(vec![vec![repository("acme", "api")]])
            .with_open_pull_request_pages(
                "acme",
                "api",
                vec![vec![pull_request(1).build(), pull_request(2).build()]],
            )
            .with_failure_times(
                "get_file_content",
                MockFailure::Api("502 Bad Gateway".to_string()),
                1,
            ),
    );
    let provider = MockClientProvider::new().with_installation(installation(1, "acme"), client.clone());

    let report = scanner(provider).run().await.unwrap();

    assert_eq!(report.pull_requests, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(client.call_count("get_file_content"), 2);
}

#[tokio::test]
async fn test_installation_listing_failure_is_an_error() {
    let result = scanner(MockClientProvider::new().with_listing_failure()).run().await;

    assert!(matches!(result, Err(BulldozerError::Client(_))));
}
