//! `state` subcommand handlers.

use std::time::Duration;

use anyhow::{Context, Result};

use auditq_checkpoint::{FileStateStore, StateStore};
use auditq_config::Config;

use crate::cli::StateAction;

/// Handle state subcommands.
pub(crate) async fn handle_state_command(config: &Config, action: StateAction) -> Result<()> {
    let storage = &config.persistence.storage_path;
    let store = FileStateStore::new(storage)
        .await
        .with_context(|| format!("Failed to open state directory {}", storage.display()))?;

    match action {
        StateAction::List => state_list(&store).await,
        StateAction::Show { state_id } => state_show(&store, &state_id).await,
        StateAction::Delete { state_id } => state_delete(&store, &state_id).await,
        StateAction::Cleanup { max_age_hours } => state_cleanup(&store, max_age_hours).await,
    }
}

async fn state_list(store: &dyn StateStore) -> Result<()> {
    let mut ids = store.list().await?;
    if ids.is_empty() {
        println!("No saved states.");
        return Ok(());
    }
    ids.sort();

    println!(
        "{:<40} {:<12} {:>8} {:>9}  UPDATED",
        "ID", "STATUS", "URLS", "PROGRESS"
    );
    for id in ids {
        match store.load(&id).await? {
            Some(state) => println!(
                "{:<40} {:<12} {:>8} {:>8.1}%  {}",
                state.id,
                state.status,
                state.urls.len(),
                state.progress_percent(),
                state.updated_at.format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("{:<40} (removed)", id),
        }
    }
    Ok(())
}

async fn state_show(store: &dyn StateStore, state_id: &str) -> Result<()> {
    let state = store
        .load(state_id)
        .await?
        .with_context(|| format!("State not found: {}", state_id))?;

    println!("ID:          {}", state.id);
    println!("Status:      {}", state.status);
    println!("Started:     {}", state.started_at.to_rfc3339());
    println!("Updated:     {}", state.updated_at.to_rfc3339());
    println!("URLs:        {}", state.urls.len());
    println!("Completed:   {}", state.processed_urls.len());
    println!("Failed:      {}", state.failed.len());
    println!("Remaining:   {}", state.remaining_urls().len());
    println!("Progress:    {:.1}%", state.progress_percent());
    println!(
        "Options:     max_concurrent={}, max_retries={}",
        state.options.max_concurrent, state.options.max_retries
    );

    if !state.failed.is_empty() {
        println!();
        println!("Failures:");
        for failed in &state.failed {
            println!("  {} ({} attempts): {}", failed.url, failed.attempts, failed.error);
        }
    }
    Ok(())
}

async fn state_delete(store: &dyn StateStore, state_id: &str) -> Result<()> {
    if !store.exists(state_id).await? {
        anyhow::bail!("State not found: {}", state_id);
    }
    store.delete(state_id).await?;
    println!("Deleted {}", state_id);
    Ok(())
}

async fn state_cleanup(store: &dyn StateStore, max_age_hours: u64) -> Result<()> {
    let max_age = Duration::from_secs(max_age_hours.saturating_mul(3600));
    let removed = store.cleanup(max_age).await?;
    println!(
        "Removed {} state(s) older than {} hours",
        removed, max_age_hours
    );
    Ok(())
}
