use super::*;
use crate::config_resolver::ConfigResolver;
use serde_json::{json, Value};
use test_utils::fixtures::{installation, pull_request, OWNER, REPO};
use test_utils::{MockClientProvider, MockPullRequestClient};

fn common() -> Value {
    json!({
        "installation": { "id": 42 },
        "repository": { "name": REPO, "owner": { "login": OWNER } },
    })
}

fn payload(fields: Value) -> Vec<u8> {
    let mut value = common();
    if let (Some(target), Some(extra)) = (value.as_object_mut(), fields.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    serde_json::to_vec(&value).unwrap()
}

fn router(provider: MockClientProvider) -> EventRouter {
    let processor = PullRequestProcessor::new(Arc::new(ConfigResolver::default()));
    EventRouter::new(Arc::new(provider), Arc::new(processor), 4)
}

#[test]
fn test_parse_pull_request_event() {
    let body = payload(json!({ "action": "synchronize", "number": 12 }));

    let notification = Notification::parse("pull_request", &body).unwrap().unwrap();

    assert_eq!(
        notification,
        Notification {
            event_type: "pull_request".to_string(),
            installation_id: 42,
            owner: OWNER.to_string(),
            repo: REPO.to_string(),
            target: Target::Numbers(vec![12]),
        }
    );
}

#[test]
fn test_closed_pull_request_event_is_ignored() {
    let body = payload(json!({ "action": "closed", "number": 12 }));

    assert_eq!(Notification::parse("pull_request", &body).unwrap(), None);
}

#[test]
fn test_parse_submitted_review() {
    let body = payload(json!({ "action": "submitted", "pull_request": { "number": 5 } }));
    let dismissed = payload(json!({ "action": "dismissed", "pull_request": { "number": 5 } }));

    let notification = Notification::parse("pull_request_review", &body).unwrap().unwrap();

    assert_eq!(notification.target, Target::Numbers(vec![5]));
    assert_eq!(Notification::parse("pull_request_review", &dismissed).unwrap(), None);
}

#[test]
fn test_issue_comment_only_on_pull_requests() {
    let on_pr = payload(json!({
        "action": "created",
        "issue": { "number": 8, "pull_request": { "url": "https://api.github.com/x" } },
    }));
    let on_issue = payload(json!({ "action": "created", "issue": { "number": 9 } }));

    assert_eq!(
        Notification::parse("issue_comment", &on_pr).unwrap().unwrap().target,
        Target::Numbers(vec![8])
    );
    assert_eq!(Notification::parse("issue_comment", &on_issue).unwrap(), None);
}

#[test]
fn test_parse_completed_check_run() {
    let body = payload(json!({
        "action": "completed",
        "check_run": { "pull_requests": [{ "number": 3 }, { "number": 4 }] },
    }));
    let queued = payload(json!({
        "action": "created",
        "check_run": { "pull_requests": [{ "number": 3 }] },
    }));

    assert_eq!(
        Notification::parse("check_run", &body).unwrap().unwrap().target,
        Target::Numbers(vec![3, 4])
    );
    assert_eq!(Notification::parse("check_run", &queued).unwrap(), None);
}

#[test]
fn test_parse_successful_status() {
    let success = payload(json!({ "state": "success", "sha": "abc123" }));
    let pending = payload(json!({ "state": "pending", "sha": "abc123" }));

    assert_eq!(
        Notification::parse("status", &success).unwrap().unwrap().target,
        Target::HeadSha("abc123".to_string())
    );
    assert_eq!(Notification::parse("status", &pending).unwrap(), None);
}

#[test]
fn test_parse_branch_push() {
    let push = payload(json!({ "ref": "refs/heads/release/1.0" }));
    let tag = payload(json!({ "ref": "refs/tags/v1.0" }));
    let deleted = payload(json!({ "ref": "refs/heads/old", "deleted": true }));

    assert_eq!(
        Notification::parse("push", &push).unwrap().unwrap().target,
        Target::BaseBranch("release/1.0".to_string())
    );
    assert_eq!(Notification::parse("push", &tag).unwrap(), None);
    assert_eq!(Notification::parse("push", &deleted).unwrap(), None);
}

#[test]
fn test_unknown_event_is_ignored_without_parsing() {
    assert_eq!(Notification::parse("star", b"not json").unwrap(), None);
}

#[test]
fn test_malformed_payload_is_rejected() {
    let result = Notification::parse("pull_request", b"{\"action\": 3}");

    assert!(matches!(
        result,
        Err(BulldozerError::InvalidPayload { event_type, .. }) if event_type == "pull_request"
    ));
}

#[test]
fn test_payload_without_installation_is_rejected() {
    let body = serde_json::to_vec(&json!({
        "action": "opened",
        "number": 1,
        "repository": { "name": REPO, "owner": { "login": OWNER } },
    }))
    .unwrap();

    let result = Notification::parse("pull_request", &body);

    assert!(matches!(result, Err(BulldozerError::InvalidPayload { .. })));
}

#[tokio::test]
async fn test_pull_requests_for_sha_are_deduplicated_across_pages() {
    let client = MockPullRequestClient::new().with_open_pull_request_pages(
        OWNER,
        REPO,
        vec![
            vec![
                pull_request(1).head_sha("abc").build(),
                pull_request(2).head_sha("other").build(),
            ],
            vec![
                pull_request(1).head_sha("abc").build(),
                pull_request(3).head_sha("abc").build(),
            ],
        ],
    );

    let prs = list_open_pull_requests_for_sha(&client, OWNER, REPO, "abc")
        .await
        .unwrap();

    let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert_eq!(client.call_count("list_open_pull_requests"), 2);
}

#[tokio::test]
async fn test_pull_requests_for_base() {
    let client = MockPullRequestClient::new().with_open_pull_request_pages(
        OWNER,
        REPO,
        vec![vec![
            pull_request(1).base_ref("develop").build(),
            pull_request(2).build(),
        ]],
    );

    let prs = list_open_pull_requests_for_base(&client, OWNER, REPO, "develop")
        .await
        .unwrap();

    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].number, 1);
}

#[tokio::test]
async fn test_dispatch_isolates_failing_pull_requests() {
    let client = Arc::new(MockPullRequestClient::new().with_pull_request(pull_request(3).build()));
    let router = router(MockClientProvider::new().with_installation(installation(42, OWNER), client.clone()));
    let notification = Notification {
        event_type: "check_run".to_string(),
        installation_id: 42,
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        target: Target::Numbers(vec![3, 4]),
    };

    let report = router.dispatch(&notification).await.unwrap();

    assert_eq!(report, DispatchReport { processed: 1, failed: 1 });
    assert_eq!(client.call_count("get_file_content"), 1);
}

#[tokio::test]
async fn test_dispatch_push_resolves_policy_per_pull_request() {
    let client = Arc::new(MockPullRequestClient::new().with_open_pull_request_pages(
        OWNER,
        REPO,
        vec![vec![
            pull_request(1).base_ref("develop").build(),
            pull_request(2).base_ref("develop").build(),
            pull_request(3).build(),
        ]],
    ));
    let router = router(MockClientProvider::new().with_installation(installation(42, OWNER), client.clone()));
    let notification = Notification {
        event_type: "push".to_string(),
        installation_id: 42,
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        target: Target::BaseBranch("develop".to_string()),
    };

    let report = router.dispatch(&notification).await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(client.call_count("get_pull_request"), 0);
}

#[tokio::test]
async fn test_dispatch_fails_without_installation_client() {
    let router = router(MockClientProvider::new().with_broken_installation(installation(42, OWNER)));
    let notification = Notification {
        event_type: "status".to_string(),
        installation_id: 42,
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        target: Target::HeadSha("abc".to_string()),
    };

    let result = router.dispatch(&notification).await;

    assert!(matches!(result, Err(BulldozerError::Client(_))));
}

#[tokio::test]
async fn test_submit_runs_in_background() {
    let client = Arc::new(MockPullRequestClient::new().with_pull_request(pull_request(7).build()));
    let router = router(MockClientProvider::new().with_installation(installation(42, OWNER), client.clone()));
    let body = payload(json!({ "action": "opened", "number": 7 }));
    let notification = Notification::parse("pull_request", &body).unwrap().unwrap();

    router.submit(notification).await.unwrap();

    assert_eq!(client.call_count("get_pull_request"), 1);
    assert_eq!(router.pending(), 0);
}

#[tokio::test]
async fn test_pending_counts_queued_notifications() {
    let client = Arc::new(MockPullRequestClient::new().with_pull_request(pull_request(7).build()));
    let router = router(MockClientProvider::new().with_installation(installation(42, OWNER), client));
    let body = payload(json!({ "action": "opened", "number": 7 }));
    let notification = Notification::parse("pull_request", &body).unwrap().unwrap();

    let first = router.submit(notification.clone());
    let second = router.submit(notification);
    assert_eq!(router.pending(), 2);

    second.abort();
    let _ = second.await;
    first.await.unwrap();

    assert_eq!(router.pending(), 0);
}
