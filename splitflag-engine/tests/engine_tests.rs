mod common;

use common::make_engine;
use pretty_assertions::assert_eq;
use serde_json::json;
use splitflag_engine::EngineError;
use splitflag_types::{KeyDefinition, KeyScope, PlayerId};

// ── Registration surface ──────────────────────────────────────────

#[tokio::test]
async fn key_lookup_and_enumeration() {
    let (mut engine, _source) = make_engine();
    engine
        .register_key(KeyDefinition::player("a", json!(1)).replicated())
        .unwrap();
    engine.register_key(KeyDefinition::server("b", json!(2))).unwrap();

    let a = engine.key("a").unwrap();
    assert_eq!(a.scope, KeyScope::Player);
    assert!(a.replicated);

    let mut names: Vec<String> = engine.all_keys().iter().map(|k| k.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

    assert!(matches!(engine.key("c"), Err(EngineError::UnknownKey(_))));
}

#[tokio::test]
async fn duplicate_key_registration_fails() {
    let (mut engine, _source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    assert!(matches!(
        engine.register_key(KeyDefinition::server("k", json!(2))),
        Err(EngineError::DuplicateKey(_))
    ));
}

// ── Session lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn operations_require_an_active_session() {
    let (mut engine, _source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    let player = PlayerId::new();

    assert!(matches!(
        engine.resolve(player).await,
        Err(EngineError::SessionNotInitialized(_))
    ));
    assert!(matches!(
        engine.resolved_config(player).await,
        Err(EngineError::SessionNotInitialized(_))
    ));
    assert!(matches!(
        engine.set_override(player, "k", Some(json!(2))).await,
        Err(EngineError::SessionNotInitialized(_))
    ));
    assert!(matches!(
        engine.eligibility_state(player).await,
        Err(EngineError::SessionNotInitialized(_))
    ));
}

#[tokio::test]
async fn stop_session_drops_all_player_state() {
    let (mut engine, _source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    let player = PlayerId::new();

    engine.start_session(player).await.unwrap();
    engine.set_override(player, "k", Some(json!(9))).await.unwrap();
    assert_eq!(engine.resolved_config(player).await.unwrap()["k"], json!(9));

    assert!(engine.stop_session(player).await);
    assert!(!engine.stop_session(player).await);
    assert!(matches!(
        engine.resolved_config(player).await,
        Err(EngineError::SessionNotInitialized(_))
    ));

    // A fresh session starts clean: the old override is gone.
    engine.start_session(player).await.unwrap();
    assert_eq!(engine.resolved_config(player).await.unwrap()["k"], json!(1));
}

#[tokio::test]
async fn restarting_a_session_replaces_it() {
    let (mut engine, _source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    let player = PlayerId::new();

    engine.start_session(player).await.unwrap();
    engine.set_override(player, "k", Some(json!(9))).await.unwrap();

    engine.start_session(player).await.unwrap();
    assert_eq!(engine.resolved_config(player).await.unwrap()["k"], json!(1));
}

#[tokio::test]
async fn sessions_are_independent() {
    let (mut engine, _source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    let p1 = PlayerId::new();
    let p2 = PlayerId::new();

    engine.start_session(p1).await.unwrap();
    engine.start_session(p2).await.unwrap();
    engine.set_override(p1, "k", Some(json!(5))).await.unwrap();

    assert_eq!(engine.resolved_config(p1).await.unwrap()["k"], json!(5));
    assert_eq!(engine.resolved_config(p2).await.unwrap()["k"], json!(1));

    let mut active = engine.active_players().await;
    active.sort_by_key(|p| p.to_string());
    assert_eq!(active.len(), 2);
}

// ── Update propagation ────────────────────────────────────────────

#[tokio::test]
async fn refresh_all_picks_up_new_server_values() {
    let (mut engine, source) = make_engine();
    engine.register_key(KeyDefinition::player("k", json!(1))).unwrap();
    let p1 = PlayerId::new();
    let p2 = PlayerId::new();
    engine.start_session(p1).await.unwrap();
    engine.start_session(p2).await.unwrap();

    source.set_server_value("k", json!(2)).await;
    engine.refresh_all().await;

    assert_eq!(engine.resolved_config(p1).await.unwrap()["k"], json!(2));
    assert_eq!(engine.resolved_config(p2).await.unwrap()["k"], json!(2));
}
