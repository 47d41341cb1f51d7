//! Turns against the live model.
//!
//! These tests require ANTHROPIC_API_KEY to be set.
//! Run with: `cargo test -p gm-core --test api_integration -- --ignored --nocapture`

use gm_core::generation::ClaudeGenerator;
use gm_core::state::InMemoryGameState;
use gm_core::testing::{sample_encounter, sample_lore, sample_party};
use gm_core::{AgentKind, GameMaster, OrchestratorConfig, StandardRules};
use std::sync::Arc;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

fn live_game_master() -> GameMaster {
    let narrator = Arc::new(ClaudeGenerator::from_env().expect("Failed to create client"));
    let notes = Arc::new(ClaudeGenerator::from_env().expect("Failed to create client"));
    GameMaster::standard(
        OrchestratorConfig::default(),
        narrator,
        Some(notes),
        Arc::new(sample_lore()),
        Arc::new(StandardRules),
    )
    .expect("default config is valid")
}

#[tokio::test]
#[ignore]
async fn test_live_exploration_turn() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let gm = live_game_master();
    let id = gm.open_session(InMemoryGameState::new(sample_party())).await;
    let response = gm
        .process_turn(id, "I look around the common room of the inn")
        .await
        .expect("turn should complete");

    println!("Narrative: {}", response.narrative);
    println!("Facts: {:?}", response.recorded_facts);
    for report in &response.agent_reports {
        println!("  {} {} in {}ms", report.agent, report.status, report.elapsed_ms);
    }

    assert!(!response.narrative.is_empty());
    let narrator = response
        .agent_reports
        .iter()
        .find(|r| r.agent == AgentKind::Narrator)
        .expect("narrator was dispatched");
    assert_eq!(narrator.status, "success", "{:?}", narrator.reason);
}

#[tokio::test]
#[ignore]
async fn test_live_combat_turn() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let gm = live_game_master();
    let id = gm.open_session(InMemoryGameState::new(sample_encounter())).await;
    let response = gm
        .process_turn(id, "I attack the goblin with my longsword")
        .await
        .expect("turn should complete");

    println!("Narrative: {}", response.narrative);
    println!("Merge: {:?}", response.merge_strategy);
    println!("Ruling note: {:?}", response.ruling_note);

    // Mechanics do not depend on the model.
    assert!(!response.dice.is_empty());
    assert!(response.merge_strategy.is_some());
}
