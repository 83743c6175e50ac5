//! Drives the service the way the binary does: one JSON line per request.

use rpg_rules::catalog::CombatRules;
use rpg_rules::Catalog;
use rpg_server::narration::Silent;
use rpg_server::{GameService, Request, Response};
use serde_json::{json, Value};
use std::sync::Arc;

fn service() -> GameService<Silent> {
    let catalog = Catalog::builtin()
        .unwrap()
        .with_combat_rules(CombatRules::deterministic());
    GameService::new(Arc::new(catalog), Silent, Some(3))
}

async fn send(service: &GameService<Silent>, line: &str) -> Value {
    let response = match Request::parse(line) {
        Ok(request) => service.handle(request).await,
        Err(e) => Response::failure(&e),
    };
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn test_new_player_session() {
    let service = service();

    let created = send(
        &service,
        r#"{"op":"create_character","account_id":"p1","name":"Mira","class_id":"mage","personality_id":"wise"}"#,
    )
    .await;
    assert_eq!(created["ok"], json!(true));
    assert_eq!(created["data"]["level"], json!(1));
    assert_eq!(created["data"]["current_location"], json!("village"));

    let bought = send(
        &service,
        r#"{"op":"buy","account_id":"p1","item_id":"mana_potion","quantity":2}"#,
    )
    .await;
    assert_eq!(bought["data"]["gold"], json!(20));

    let inventory = send(&service, r#"{"op":"inventory","account_id":"p1"}"#).await;
    let items = inventory["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(inventory["data"]["capacity"], json!(20));

    let chat = send(
        &service,
        r#"{"op":"chat","account_id":"p1","message":"I look around"}"#,
    )
    .await;
    assert_eq!(chat["ok"], json!(true));
    assert_eq!(chat["data"]["scene"], json!("village"));
}

#[tokio::test]
async fn test_garbage_lines_get_validation_errors() {
    let service = service();
    for line in ["{", r#"{"op":"fly"}"#, r#"{"op":"buy","account_id":"p1"}"#] {
        let response = send(&service, line).await;
        assert_eq!(response["ok"], json!(false), "{line}");
        assert_eq!(response["error"]["kind"], json!("validation"), "{line}");
    }
}

#[tokio::test]
async fn test_boss_encounter_cannot_be_fled() {
    let service = service();
    send(
        &service,
        r#"{"op":"create_character","account_id":"p1","name":"Mira","class_id":"warrior","personality_id":"brave"}"#,
    )
    .await;

    let combat = send(
        &service,
        r#"{"op":"start_combat","account_id":"p1","enemy_id":"dragon"}"#,
    )
    .await;
    assert_eq!(
        combat["data"]["available_actions"],
        json!(["attack", "defend", "use_item"])
    );

    let flee = send(
        &service,
        r#"{"op":"combat_action","account_id":"p1","action":"flee"}"#,
    )
    .await;
    assert_eq!(flee["ok"], json!(true));
    assert_eq!(flee["data"]["combat"]["active"], json!(true));
    let log = flee["data"]["combat"]["log"].as_array().unwrap();
    let last = log.last().and_then(Value::as_str).unwrap();
    assert!(last.ends_with("Dragon blocks your escape!"), "{last}");

    let explore = send(&service, r#"{"op":"explore","account_id":"p1"}"#).await;
    assert_eq!(explore["error"]["kind"], json!("state_conflict"));
}

#[tokio::test]
async fn test_final_boss_flee_is_blocked() {
    let service = service();
    send(
        &service,
        r#"{"op":"create_character","account_id":"p1","name":"Mira","class_id":"warrior","personality_id":"brave"}"#,
    )
    .await;

    let combat = send(
        &service,
        r#"{"op":"start_combat","account_id":"p1","enemy_id":"demon_lord"}"#,
    )
    .await;
    assert!(combat["data"].get("flee_result").is_none());
    let hp = combat["data"]["character"]["stats"]["hp"].clone();

    let flee = send(
        &service,
        r#"{"op":"combat_action","account_id":"p1","action":"flee"}"#,
    )
    .await;
    assert_eq!(flee["ok"], json!(true));
    assert_eq!(flee["data"]["flee_result"], json!("blocked"));
    assert_eq!(flee["data"]["combat"]["active"], json!(true));
    assert_eq!(flee["data"]["combat"]["turn"], json!(1));
    assert_eq!(flee["data"]["character"]["stats"]["hp"], hp);
    assert!(hp.as_u64().is_some());

    let attack = send(
        &service,
        r#"{"op":"combat_action","account_id":"p1","action":"attack"}"#,
    )
    .await;
    assert!(attack["data"].get("flee_result").is_none());
}
