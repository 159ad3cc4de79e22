use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::io::BufReader;

use pixel_assistant::catalog::{self, ModelCard};
use pixel_assistant::ui::conversation::{ChatViewModel, describe_model, render_history};
use pixel_assistant::ui::repl;
use pixel_assistant::{
    Config, ConversationManager, FileSnapshotStore, InferenceEngine, LocalModelManager,
    SnapshotStore,
};

const WRAP_WIDTH: usize = 80;

fn lookup_model(id: &str) -> Result<&'static ModelCard> {
    catalog::find_model(id).ok_or_else(|| {
        anyhow!(
            "Unknown model '{}'. Run 'pixel-assistant models' to see the catalog.",
            id
        )
    })
}

pub async fn start_chat(
    config: &Config,
    model: Option<&str>,
    no_memory: bool,
    fresh: bool,
) -> Result<()> {
    let requested = model.map(lookup_model).transpose()?;

    let store = Arc::new(FileSnapshotStore::new(config.memory_path()));
    let engine = Arc::new(LocalModelManager::new(config)?);
    let manager = Arc::new(ConversationManager::new(store, engine));
    let view_model = ChatViewModel::new(manager, config.memory_enabled && !no_memory).await;

    if fresh {
        view_model.clear_conversation().await?;
    }
    if let Some(card) = requested {
        view_model.change_model(card.clone(), false).await?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(&view_model, stdin, &mut stdout).await
}

pub async fn list_models(config: &Config) -> Result<()> {
    let engine = LocalModelManager::new(config)?;

    println!("📦 Bundled models:");
    println!("{}", "=".repeat(50));
    for (i, card) in catalog::featured_models().iter().enumerate() {
        let status = if engine.is_cached(card) {
            "downloaded"
        } else {
            "not downloaded"
        };
        println!("{}. {}", i + 1, describe_model(card));
        println!("   🆔 {} ({})", card.id, status);
    }

    Ok(())
}

pub async fn show_history(config: &Config) -> Result<()> {
    let store = FileSnapshotStore::new(config.memory_path());

    let Some(snapshot) = store.load().await else {
        println!("No saved conversation. Run 'pixel-assistant chat' to start one.");
        return Ok(());
    };

    let model_name = catalog::find_model(&snapshot.model_id)
        .map(|card| card.display_name.clone())
        .unwrap_or_else(|| snapshot.model_id.clone());

    println!("💬 Conversation with {}", model_name);
    if let Some(saved_at) = store.last_modified().await {
        println!("🕒 Saved: {}", saved_at.format("%Y-%m-%d %H:%M"));
    }
    println!();
    print!("{}", render_history(&snapshot.messages, &model_name, WRAP_WIDTH));

    Ok(())
}

pub async fn clear_history(config: &Config) -> Result<()> {
    let store = FileSnapshotStore::new(config.memory_path());
    store
        .save(None)
        .await
        .context("Failed to clear saved conversation")?;
    println!("🧹 Saved conversation cleared.");
    Ok(())
}

pub async fn pull_model(config: &Config, id: &str) -> Result<()> {
    let card = lookup_model(id)?;
    let engine = LocalModelManager::new(config)?;

    println!("⬇️  Preparing {} ({:.1} GB)...", card.display_name, card.size_gb);
    let path = engine.ensure_ready(card).await?;
    println!("✨ {} is ready at {}", card.display_name, path.display());

    Ok(())
}
