use anyhow::{Context, Result};
use tempdash_core::Config;
use tempdash_store::{DataStore, MemorySource, PreferencesStore, StoreOptions, TemperatureState};

fn log_summary(state: &TemperatureState) {
    tracing::info!(
        "Latest {} ({}): temperature {:?}, humidity {:?}, heat index {:?}; {} days loaded, {} changes",
        state.last_entry_time,
        state.relative_time,
        state.last_temperature,
        state.last_humidity,
        state.last_heat_index,
        state.data_entries.len(),
        state.data_changes
    );
    if let (Some(high), Some(low)) = (&state.today_high, &state.today_low) {
        tracing::info!(
            "Today high {} at {}, low {} at {}",
            high.value,
            high.time,
            low.value,
            low.time
        );
    }
    if let Some(message) = &state.error_message {
        tracing::warn!("{}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tempdash_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    let source = MemorySource::new();
    match &config.fixture_path {
        Some(path) => {
            source
                .load_fixture(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
        }
        None => tracing::warn!("No fixture configured; waiting for documents"),
    }

    let preferences = PreferencesStore::from_config(&config.dashboard)
        .context("Invalid dashboard preferences")?;
    let prefs = preferences.get();
    tracing::info!(
        "Showing {} day(s), series toggle {}",
        prefs.time_range,
        if prefs.series_toggle { "on" } else { "off" }
    );

    let store = DataStore::new(source, StoreOptions::from_config(&config));
    let Some(handle) = store.fetch_data().await else {
        anyhow::bail!("Could not start listening for temperature data");
    };

    let mut updates = store.watch();
    log_summary(&updates.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                log_summary(&updates.borrow_and_update());
            }
        }
    }

    tracing::info!("Shutting down");
    handle.stop().await;
    Ok(())
}
