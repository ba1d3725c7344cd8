//! End-to-end monitor runs against the in-memory hook.

use std::sync::Arc;
use std::time::Duration;

use equipswap::config::{MonitorSettings, SwapConfig};
use equipswap::hook::{MemoryWorld, PlayerSnapshot, WorldSnapshot};
use equipswap::monitor::{Monitor, MonitorHandle, StopReason};
use equipswap::observability::EventEmitter;
use equipswap::swap::{Hand, PhysicalSlot, PlayerIndex, SubSlot, SwapTrigger, TriggerTarget};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const LEFT_PRIMARY: PhysicalSlot = PhysicalSlot::Weapon(Hand::Left, SubSlot::Primary);
const BUFF: i32 = 4010;

fn settings() -> MonitorSettings {
    MonitorSettings {
        process_search_timeout_ms: 5_000,
        process_search_interval_ms: 5,
        monitor_interval_ms: 5,
        game_loaded_interval_ms: 5,
        sp_effect_trigger_cooldown_ms: 500,
    }
}

fn player(index: usize) -> PlayerSnapshot {
    let mut player = PlayerSnapshot::new(PlayerIndex::new(index).unwrap());
    player.weapons.left.primary = 1000;
    player.weapons.left.secondary = 3000;
    player.effects.insert(BUFF);
    player
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn read_events(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

#[tokio::test]
async fn weapon_swap_reverts_when_put_away() {
    let world = MemoryWorld::new(WorldSnapshot {
        world_loaded: true,
        players: vec![player(0), player(2)],
    });
    let trigger =
        SwapTrigger::new(TriggerTarget::Weapon(Hand::Left), Some(BUFF), Some(1000), 1, false)
            .unwrap();
    let config = SwapConfig {
        settings: settings(),
        triggers: vec![trigger],
    };
    let monitor = Monitor::new(
        config,
        Box::new(world.connector()),
        Arc::new(EventEmitter::noop()),
        CancellationToken::new(),
    );
    let handle = MonitorHandle::spawn(monitor);

    let p0 = PlayerIndex::new(0).unwrap();
    let p2 = PlayerIndex::new(2).unwrap();
    wait_until(|| {
        world.slot(p0, LEFT_PRIMARY) == Some(1001) && world.slot(p2, LEFT_PRIMARY) == Some(1001)
    })
    .await;

    world.set_equipped(p0, Hand::Left, SubSlot::Secondary);
    wait_until(|| world.slot(p0, LEFT_PRIMARY) == Some(1000)).await;

    let summary = handle.stop().await.unwrap();
    assert_eq!(summary.reason, StopReason::Cancelled);
    // Player 2 still holds its swap; player 0's was reverted and its
    // secondary (3000) never matched.
    assert_eq!(summary.pending_swaps, 1);
    assert_eq!(world.slot(p2, LEFT_PRIMARY), Some(1001));
    assert_eq!(
        world.slot(p0, PhysicalSlot::Weapon(Hand::Left, SubSlot::Secondary)),
        Some(3000)
    );
}

#[tokio::test]
async fn reload_reverts_armor_and_ring_swaps_once() {
    let dir = tempfile::tempdir().unwrap();
    let events_path = dir.path().join("events.jsonl");

    let mut p = player(1);
    p.armor.body = 40;
    p.rings = [70, 71];
    let world = MemoryWorld::new(WorldSnapshot {
        world_loaded: true,
        players: vec![p],
    });
    let body = SwapTrigger::new(
        TriggerTarget::Armor(equipswap::swap::ArmorLocation::Body),
        None,
        Some(40),
        5,
        false,
    )
    .unwrap();
    let ring = SwapTrigger::new(TriggerTarget::Ring, None, Some(71), -1, false).unwrap();
    let config = SwapConfig {
        settings: settings(),
        triggers: vec![body, ring],
    };
    let monitor = Monitor::new(
        config,
        Box::new(world.connector()),
        Arc::new(EventEmitter::from_file(&events_path).unwrap()),
        CancellationToken::new(),
    );
    let handle = MonitorHandle::spawn(monitor);

    let p1 = PlayerIndex::new(1).unwrap();
    let body_slot = PhysicalSlot::Armor(equipswap::swap::ArmorLocation::Body);
    let ring_slot = PhysicalSlot::Ring(equipswap::swap::RingSlot::Second);
    wait_until(|| world.slot(p1, body_slot) == Some(45) && world.slot(p1, ring_slot) == Some(70))
        .await;

    world.set_world_loaded(false);
    wait_until(|| {
        read_events(&events_path)
            .iter()
            .any(|e| e["type"] == "WorldUnloaded")
    })
    .await;
    world.set_world_loaded(true);
    wait_until(|| {
        read_events(&events_path)
            .iter()
            .any(|e| e["type"] == "ForcedRevert")
    })
    .await;

    let summary = handle.stop().await.unwrap();
    let events = read_events(&events_path);
    let forced: Vec<_> = events
        .iter()
        .filter(|e| e["type"] == "ForcedRevert")
        .collect();
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0]["reverted"], 2);
    assert_eq!(forced[0]["failed"], 0);

    let reverted: Vec<_> = events
        .iter()
        .filter(|e| e["type"] == "SwapReverted")
        .collect();
    assert_eq!(reverted.len(), 2);
    assert!(reverted.iter().all(|e| e["reason"] == "forced"));

    // Both rules fire again in the same tick, since the ids match again.
    assert_eq!(summary.pending_swaps, 2);
    assert_eq!(world.slot(p1, body_slot), Some(45));
    assert_eq!(world.slot(p1, ring_slot), Some(70));
    let applied = events.iter().filter(|e| e["type"] == "SwapApplied").count();
    assert_eq!(applied, 4);
    assert_eq!(events.last().unwrap()["type"], "MonitorStopped");
}
