//! A short session at the old mill.
//!
//! Uses Claude when ANTHROPIC_API_KEY is set, canned narration otherwise.
//! Run with: `RUST_LOG=gm_core=debug cargo run -p gm-core --example scripted_session`

use gm_core::generation::{ClaudeGenerator, Generator};
use gm_core::state::InMemoryGameState;
use gm_core::testing::{sample_encounter, sample_lore, ScriptedGenerator};
use gm_core::{GameMaster, OrchestratorConfig, StandardRules};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const TURNS: [&str; 5] = [
    "I look around the mill",
    "I attack the goblin with my longsword",
    "How does grappling work?",
    "Tell me about Snikket",
    "I shout at Snikket to surrender",
];

fn narrator() -> Arc<dyn Generator> {
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        match ClaudeGenerator::from_env() {
            Ok(generator) => return Arc::new(generator),
            Err(e) => eprintln!("Falling back to canned narration: {e}"),
        }
    }
    Arc::new(
        ScriptedGenerator::new()
            .reply("Flour dust drifts through shafts of light. The millstone is still.\nFACT: the millstone is still")
            .reply("You surge forward, blade raised, as the goblin shrieks.")
            .reply("Snikket's yellow eyes narrow from the loft above.")
            .reply("Snikket spits and draws back his bowstring."),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("GM_CONFIG") {
        Ok(path) => OrchestratorConfig::from_json_file(path).await?,
        Err(_) => OrchestratorConfig::default(),
    };

    let gm = GameMaster::standard(
        config,
        narrator(),
        None,
        Arc::new(sample_lore()),
        Arc::new(StandardRules),
    )?;
    let session = gm.open_session(InMemoryGameState::new(sample_encounter())).await;

    for text in TURNS {
        println!("\n> {text}");
        let response = gm.process_turn(session, text).await?;
        println!("{}", response.narrative);
        for roll in &response.dice {
            println!("  [{roll}]");
        }
        for change in &response.state_changes_applied {
            println!("  * {change}");
        }
        for warning in &response.consistency_warnings {
            println!("  ! {warning}");
        }
        if response.degraded {
            let missing: Vec<String> = response
                .agent_reports
                .iter()
                .filter(|r| r.status != "success")
                .map(|r| format!("{} ({})", r.agent, r.status))
                .collect();
            println!("  (degraded: {})", missing.join(", "));
        }
    }

    let saved = gm.close_session(session).await?;
    println!(
        "\nSession {} closed after {} turns with {} facts on record.",
        saved.session_id,
        saved.turn,
        saved.facts.len()
    );
    Ok(())
}
