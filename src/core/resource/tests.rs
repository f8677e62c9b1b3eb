//! Resource Loader Tests
//!
//! Drives environments, campaigns and sessions loaders against a scripted
//! gateway and a manual clock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::core::campaigns::CampaignsHook;
use crate::core::environments::{Environment, EnvironmentsHook};
use crate::core::gateway::RemoteResult;
use crate::core::sessions::SessionsHook;
use crate::tests::mocks::ScriptedGateway;

const DEBOUNCE: Duration = Duration::from_millis(300);

// ========================================================================
// Helpers
// ========================================================================

fn default_names() -> Vec<String> {
    vec!["Forest".to_string(), "Swamp".to_string()]
}

fn environments(gateway: &Arc<ScriptedGateway>, clock: &Arc<ManualClock>) -> EnvironmentsHook {
    EnvironmentsHook::environments(gateway.clone(), clock.clone(), &default_names(), DEBOUNCE)
}

fn campaigns(gateway: &Arc<ScriptedGateway>, clock: &Arc<ManualClock>) -> CampaignsHook {
    CampaignsHook::campaigns(gateway.clone(), clock.clone(), DEBOUNCE)
}

fn sessions(
    gateway: &Arc<ScriptedGateway>,
    clock: &Arc<ManualClock>,
    campaign: &str,
) -> SessionsHook {
    SessionsHook::sessions(
        gateway.clone(),
        clock.clone(),
        Some(campaign.to_string()),
        DEBOUNCE,
    )
}

/// Let spawned loads run and commit until nothing is in flight.
async fn until_idle<S: ResourceSource>(hook: &mut ResourceHook<S>) {
    for _ in 0..1000 {
        tokio::task::yield_now().await;
        hook.poll();
        if !hook.has_load_in_flight() {
            return;
        }
    }
    panic!("load never completed");
}

/// Give spawned tasks a chance to run without requiring completion.
async fn churn<S: ResourceSource>(hook: &mut ResourceHook<S>) {
    for _ in 0..50 {
        tokio::task::yield_now().await;
        hook.poll();
    }
}

// ========================================================================
// Initial Load
// ========================================================================

#[tokio::test]
async fn test_initial_load_fires_once() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_ok(json!({"campaigns": [{"id": "c1", "name": "Curse of Strahd"}]}));

    let mut hook = campaigns(&gateway, &clock);
    assert_eq!(hook.state().phase, LoadPhase::Idle);

    assert!(hook.mount());
    assert!(!hook.mount());
    assert_eq!(hook.state().phase, LoadPhase::Loading);
    assert!(hook.state().is_loading);

    until_idle(&mut hook).await;
    assert!(!hook.mount());

    assert_eq!(gateway.call_count(), 1);
    assert_eq!(gateway.calls()[0].operation, "fetch-campaigns");
    assert_eq!(hook.state().phase, LoadPhase::Loaded);
    assert!(!hook.state().is_loading);
    assert_eq!(hook.items().len(), 1);
    assert_eq!(hook.find("c1").map(|c| c.name.as_str()), Some("Curse of Strahd"));
}

#[tokio::test]
async fn test_query_set_before_mount_is_used_by_initial_load() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);

    hook.set_search_query("strahd");
    assert_eq!(gateway.call_count(), 0);

    hook.mount();
    until_idle(&mut hook).await;
    assert_eq!(gateway.call_count(), 1);
    assert_eq!(gateway.calls()[0].search(), Some("strahd"));
}

// ========================================================================
// Default Fallback
// ========================================================================

#[tokio::test]
async fn test_empty_environments_fall_back_to_defaults() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_ok(json!({"environments": []}));

    let mut hook = environments(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    let state = hook.state();
    assert!(state.is_using_defaults);
    assert!(state.error.is_none());
    assert_eq!(state.phase, LoadPhase::Loaded);
    assert_eq!(
        state.items,
        vec![Environment::named("Forest"), Environment::named("Swamp")]
    );
    assert_eq!(hook.options(), vec!["Any", "Forest", "Swamp"]);
}

#[tokio::test]
async fn test_failed_environments_fall_back_and_record_error() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_err("Notion API unavailable", 502);

    let mut hook = environments(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    let state = hook.state();
    assert!(state.is_using_defaults);
    assert_eq!(state.error.as_deref(), Some("Notion API unavailable"));
    assert_eq!(state.phase, LoadPhase::Errored);
    assert_eq!(state.items.len(), 2);
}

#[tokio::test]
async fn test_malformed_environments_fall_back() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_ok(json!({"environments": "Forest"}));

    let mut hook = environments(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    assert!(hook.state().is_using_defaults);
    assert!(hook.state().error.is_some());
}

#[tokio::test]
async fn test_backend_environments_clear_defaults_flag() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_err("timeout", 504);
    gateway.push_ok(json!({"environments": [{"id": "e1", "name": "Mountain"}]}));

    let mut hook = environments(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;
    assert!(hook.state().is_using_defaults);

    hook.retry();
    until_idle(&mut hook).await;
    assert!(!hook.state().is_using_defaults);
    assert!(hook.state().error.is_none());
    assert_eq!(hook.items(), &[Environment::new("e1", "Mountain")]);
}

#[tokio::test]
async fn test_empty_campaigns_stay_empty() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_ok(json!({"campaigns": []}));

    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    assert!(hook.items().is_empty());
    assert!(!hook.state().is_using_defaults);
    assert!(hook.state().error.is_none());
    assert_eq!(hook.state().phase, LoadPhase::Loaded);
}

#[tokio::test]
async fn test_failed_campaigns_are_empty_with_error_and_retryable() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    gateway.push_err("HTTP 500: Internal Server Error", 500);
    gateway.push_ok(json!({"campaigns": [{"id": "c1", "name": "Rime of the Frostmaiden"}]}));

    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;
    assert!(hook.items().is_empty());
    assert_eq!(
        hook.state().error.as_deref(),
        Some("HTTP 500: Internal Server Error")
    );
    assert_eq!(hook.state().phase, LoadPhase::Errored);

    hook.retry();
    assert_eq!(hook.state().phase, LoadPhase::Loading);
    until_idle(&mut hook).await;
    assert!(hook.state().error.is_none());
    assert_eq!(hook.items().len(), 1);
}

// ========================================================================
// Debounced Search
// ========================================================================

#[tokio::test]
async fn test_burst_of_queries_issues_one_reload_with_last_query() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;
    assert_eq!(gateway.call_count(), 1);

    hook.set_search_query("a");
    clock.advance(Duration::from_millis(100));
    hook.poll();
    hook.set_search_query("ab");
    clock.advance(Duration::from_millis(100));
    hook.poll();
    hook.set_search_query("abc");

    clock.advance(Duration::from_millis(299));
    hook.poll();
    assert_eq!(gateway.call_count(), 1);

    clock.advance(Duration::from_millis(1));
    hook.poll();
    assert!(hook.state().is_searching);
    until_idle(&mut hook).await;

    clock.advance(Duration::from_secs(5));
    hook.poll();

    assert_eq!(gateway.call_count(), 2);
    assert_eq!(gateway.last_call().unwrap().search(), Some("abc"));
    assert!(!hook.state().is_searching);
}

#[tokio::test]
async fn test_search_reload_marks_searching_not_loading() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    let gate = gateway.push_gated(RemoteResult::ok(json!({"campaigns": []})));
    hook.set_search_query("tomb");
    clock.advance(DEBOUNCE);
    hook.poll();

    assert!(hook.state().is_searching);
    assert!(!hook.state().is_loading);
    assert_eq!(hook.state().phase, LoadPhase::Loaded);

    gate.notify_one();
    until_idle(&mut hook).await;
    assert!(!hook.state().is_searching);
}

#[tokio::test]
async fn test_clearing_query_reloads_immediately() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    hook.set_search_query("lich");
    hook.set_search_query("");
    until_idle(&mut hook).await;

    clock.advance(DEBOUNCE * 2);
    hook.poll();

    assert_eq!(gateway.call_count(), 2);
    assert_eq!(gateway.last_call().unwrap().search(), None);
}

#[tokio::test]
async fn test_unchanged_query_is_ignored() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;
    let revision = hook.revision();

    hook.set_search_query("");
    assert_eq!(hook.revision(), revision);
    assert!(!hook.is_busy());
}

// ========================================================================
// Liveness
// ========================================================================

#[tokio::test]
async fn test_teardown_before_resolution_writes_nothing() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let gate = gateway.push_gated(RemoteResult::ok(json!({"campaigns": [{"id": "c1", "name": "Late"}]})));

    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    churn(&mut hook).await;

    hook.teardown();
    let revision = hook.revision();
    let snapshot = hook.state().clone();

    gate.notify_one();
    churn(&mut hook).await;
    hook.set_search_query("after");
    hook.retry();
    clock.advance(DEBOUNCE);
    assert!(!hook.poll());

    assert_eq!(hook.revision(), revision);
    assert_eq!(hook.state(), &snapshot);
    assert!(hook.items().is_empty());
    assert!(!hook.is_alive());
    assert!(!hook.is_busy());
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_teardown_cancels_pending_debounce() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    until_idle(&mut hook).await;

    hook.set_search_query("beholder");
    hook.teardown();
    clock.advance(DEBOUNCE);
    hook.poll();
    churn(&mut hook).await;

    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_dropped_hook_discards_inflight_load() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let gate = gateway.push_gated(RemoteResult::ok(json!([])));

    let mut hook = campaigns(&gateway, &clock);
    hook.mount();
    churn(&mut hook).await;
    drop(hook);

    gate.notify_one();
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(gateway.call_count(), 1);
}

// ========================================================================
// Stale Responses
// ========================================================================

#[tokio::test]
async fn test_superseded_load_does_not_overwrite_newer_state() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let slow = gateway.push_gated(
        RemoteResult::ok(json!({"sessions": [{"id": "old", "title": "Campaign X session"}]})),
    );
    gateway.push_ok(json!({"sessions": [{"id": "new", "title": "Campaign Y session"}]}));

    let mut hook = sessions(&gateway, &clock, "X");
    hook.mount();
    churn(&mut hook).await;

    hook.set_campaign(Some("Y".to_string()));
    churn(&mut hook).await;
    assert_eq!(hook.items()[0].id, "new");
    assert!(!hook.has_load_in_flight());

    let revision = hook.revision();
    slow.notify_one();
    churn(&mut hook).await;

    assert_eq!(hook.items()[0].id, "new");
    assert_eq!(hook.revision(), revision);
}

// ========================================================================
// Dependent Key
// ========================================================================

#[tokio::test]
async fn test_campaign_change_resets_search() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = sessions(&gateway, &clock, "X");
    hook.mount();
    until_idle(&mut hook).await;

    hook.set_search_query("foo");
    clock.advance(DEBOUNCE);
    hook.poll();
    until_idle(&mut hook).await;
    let searched = gateway.last_call().unwrap();
    assert_eq!(searched.search(), Some("foo"));
    assert_eq!(searched.field("campaignId"), Some(&json!("X")));

    hook.set_campaign(Some("Y".to_string()));
    assert_eq!(hook.state().search_query, "");
    assert!(hook.state().is_loading);
    until_idle(&mut hook).await;

    let reloaded = gateway.last_call().unwrap();
    assert_eq!(reloaded.operation, "fetch-sessions");
    assert_eq!(reloaded.search(), None);
    assert_eq!(reloaded.field("campaignId"), Some(&json!("Y")));
    assert_eq!(hook.campaign_id(), Some("Y"));
}

#[tokio::test]
async fn test_campaign_change_cancels_pending_search() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = sessions(&gateway, &clock, "X");
    hook.mount();
    until_idle(&mut hook).await;

    hook.set_search_query("foo");
    hook.set_campaign(Some("Y".to_string()));
    until_idle(&mut hook).await;
    clock.advance(DEBOUNCE * 2);
    hook.poll();
    until_idle(&mut hook).await;

    assert_eq!(gateway.call_count(), 2);
    assert!(gateway.calls().iter().all(|c| c.search().is_none()));
}

#[tokio::test]
async fn test_same_campaign_is_noop() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = sessions(&gateway, &clock, "X");
    hook.mount();
    until_idle(&mut hook).await;

    hook.set_search_query("foo");
    hook.set_campaign(Some("X".to_string()));
    assert_eq!(hook.state().search_query, "foo");
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_retry_keeps_query_and_key() {
    let gateway = Arc::new(ScriptedGateway::new());
    let clock = Arc::new(ManualClock::new());
    let mut hook = sessions(&gateway, &clock, "X");
    hook.mount();
    until_idle(&mut hook).await;

    gateway.push_err("Network error: connection refused", 0);
    hook.set_search_query("crypt");
    clock.advance(DEBOUNCE);
    hook.poll();
    until_idle(&mut hook).await;
    assert!(hook.state().error.is_some());

    hook.retry();
    until_idle(&mut hook).await;

    let retried = gateway.last_call().unwrap();
    assert_eq!(retried.search(), Some("crypt"));
    assert_eq!(retried.field("campaignId"), Some(&json!("X")));
    assert_eq!(hook.state().search_query, "crypt");
    assert!(hook.state().error.is_none());
}

// ========================================================================
// Settle
// ========================================================================

#[tokio::test]
async fn test_settle_waits_for_debounced_search() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut hook = CampaignsHook::campaigns(
        gateway.clone(),
        Arc::new(SystemClock),
        Duration::from_millis(20),
    );
    hook.mount();
    hook.set_search_query("phandelver");

    tokio::time::timeout(Duration::from_secs(5), hook.settle(Duration::from_millis(5)))
        .await
        .expect("settle timed out");

    assert!(!hook.is_busy());
    assert_eq!(gateway.last_call().unwrap().search(), Some("phandelver"));
}

// ========================================================================
// List Extraction
// ========================================================================

#[test]
fn test_extract_list_shapes() {
    let from_field: Vec<u32> = extract_list(json!({"items": [1, 2]}), "items").unwrap();
    assert_eq!(from_field, vec![1, 2]);

    let bare: Vec<u32> = extract_list(json!([3]), "items").unwrap();
    assert_eq!(bare, vec![3]);

    let null: Vec<u32> = extract_list(json!({"items": null}), "items").unwrap();
    assert!(null.is_empty());

    assert!(extract_list::<u32>(json!(true), "items").is_err());
    assert!(extract_list::<u32>(json!({"items": ["x"]}), "items").is_err());
}
