use splitflag_types::PlayerId;
use std::str::FromStr;

#[test]
fn player_id_new_is_unique() {
    let a = PlayerId::new();
    let b = PlayerId::new();
    assert_ne!(a, b);
}

#[test]
fn player_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = PlayerId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn player_id_display_and_parse() {
    let id = PlayerId::new();
    let parsed = PlayerId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn player_id_from_str_invalid() {
    assert!(PlayerId::from_str("not-a-uuid").is_err());
}

#[test]
fn player_id_serde_is_transparent() {
    let id = PlayerId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let back: PlayerId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}
