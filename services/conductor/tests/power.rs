//! Integration tests for power state management.
//!
//! Covers the idempotent power-change path, driver failure recording
//! and the best-effort periodic power-state sweep.

use std::sync::Arc;

use metalplane_conductor::db::{Node, NodeStore};
use metalplane_conductor::drivers::{DriverFactory, FakeDriver};
use metalplane_conductor::manager::ConductorManager;
use metalplane_conductor::Error;
use metalplane_states::PowerState;
use uuid::Uuid;

fn harness(driver: FakeDriver) -> (Arc<NodeStore>, Arc<FakeDriver>, ConductorManager) {
    let store = Arc::new(NodeStore::open_in_memory().unwrap());
    let driver = Arc::new(driver);
    let mut factory = DriverFactory::new();
    factory.register(driver.clone());
    let manager = ConductorManager::new(Arc::clone(&store), Arc::new(factory), "cond-1");
    (store, driver, manager)
}

fn enroll(store: &NodeStore) -> Uuid {
    let id = Uuid::new_v4();
    store.create_node(&Node::new(id, "fake")).unwrap();
    id
}

#[tokio::test]
async fn test_change_power_state() {
    let (store, driver, manager) = harness(FakeDriver::new());
    let id = enroll(&store);

    manager
        .change_node_power_state(id, PowerState::PowerOn)
        .await
        .unwrap();

    let node = store.get_node(id).unwrap();
    assert_eq!(node.power_state, Some(PowerState::PowerOn));
    assert!(node.target_power_state.is_none());
    assert!(node.last_error.is_none());
    assert!(node.reservation.is_none());
    assert_eq!(driver.set_power_call_count(), 1);
}

#[tokio::test]
async fn test_change_power_state_is_idempotent() {
    let (store, driver, manager) = harness(FakeDriver::new());
    let id = enroll(&store);

    // The controller already reports the requested state; the record
    // carries a stale target and an old error.
    driver.seed_power(id, PowerState::PowerOn);
    let mut node = store.get_node(id).unwrap();
    node.target_power_state = Some(PowerState::PowerOn);
    node.last_error = Some("previous attempt failed".to_string());
    store.update_node(&node).unwrap();

    manager
        .change_node_power_state(id, PowerState::PowerOn)
        .await
        .unwrap();

    let node = store.get_node(id).unwrap();
    assert!(node.target_power_state.is_none());
    assert!(node.last_error.is_none());
    assert_eq!(driver.set_power_call_count(), 0);
}

#[tokio::test]
async fn test_change_power_state_records_driver_failure() {
    let (store, _driver, manager) = harness(FakeDriver::new().with_power_failure());
    let id = enroll(&store);

    let err = manager
        .change_node_power_state(id, PowerState::PowerOn)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DriverOperation(_)));

    let node = store.get_node(id).unwrap();
    assert!(node.last_error.is_some());
    assert!(node.target_power_state.is_none());
    assert!(node.reservation.is_none());
}

#[tokio::test]
async fn test_change_power_state_validation_failure() {
    let (store, driver, manager) = harness(FakeDriver::new().with_validate_failure());
    let id = enroll(&store);

    let err = manager
        .change_node_power_state(id, PowerState::PowerOn)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameterValue(_)));
    assert_eq!(driver.set_power_call_count(), 0);
}

#[tokio::test]
async fn test_reboot_resolves_to_power_on() {
    let (store, driver, manager) = harness(FakeDriver::new());
    let id = enroll(&store);
    driver.seed_power(id, PowerState::PowerOn);

    manager
        .change_node_power_state(id, PowerState::Reboot)
        .await
        .unwrap();

    let node = store.get_node(id).unwrap();
    assert_eq!(node.power_state, Some(PowerState::PowerOn));
    assert_eq!(driver.set_power_call_count(), 1);
}

#[tokio::test]
async fn test_get_node_power_state_is_read_only() {
    let (store, driver, manager) = harness(FakeDriver::new());
    let id = enroll(&store);
    driver.seed_power(id, PowerState::PowerOn);

    let state = manager.get_node_power_state(id).await.unwrap();
    assert_eq!(state, PowerState::PowerOn);

    // The record is untouched and no reservation was taken.
    let node = store.get_node(id).unwrap();
    assert!(node.power_state.is_none());
    assert!(node.reservation.is_none());
}

#[tokio::test]
async fn test_power_sweep_skips_reserved_and_missing_nodes() {
    let (store, driver, manager) = harness(FakeDriver::new());

    let ids: Vec<Uuid> = (0..5).map(|_| enroll(&store)).collect();
    for id in &ids {
        driver.seed_power(*id, PowerState::PowerOn);
    }

    // One node is held by another conductor, one is gone.
    store.reserve_nodes("cond-other", &ids[..1]).unwrap();
    store.destroy_node(ids[1]).unwrap();

    let stats = manager.sync_power_states().await;
    assert_eq!(stats.checked, 3);
    assert_eq!(stats.updated, 3);
    assert_eq!(stats.errors, 0);

    for id in &ids[2..] {
        assert_eq!(
            store.get_node(*id).unwrap().power_state,
            Some(PowerState::PowerOn)
        );
    }
    // The reserved node was left alone.
    assert!(store.get_node(ids[0]).unwrap().power_state.is_none());
}

#[tokio::test]
async fn test_power_sweep_converges_and_settles() {
    let (store, driver, manager) = harness(FakeDriver::new());
    let id = enroll(&store);
    driver.seed_power(id, PowerState::PowerOn);

    let stats = manager.sync_power_states().await;
    assert_eq!(stats.updated, 1);

    // A second pass finds nothing to do.
    let stats = manager.sync_power_states().await;
    assert_eq!(stats.checked, 1);
    assert_eq!(stats.updated, 0);
}
