use spawn_ledger_core::Galaxy;
use spawn_ledger_sync::settings::STARTUP_GRACE;

use crate::App;
use crate::error::CliError;

/// Run the periodic refresher in the foreground until interrupted.
pub(crate) fn run(app: App, galaxy: Galaxy) -> Result<(), CliError> {
    let interval = app.settings.refresh_interval();
    log::info!(
        "watching {galaxy}: refreshing every {}s after a {}s grace delay",
        interval.as_secs(),
        STARTUP_GRACE.as_secs(),
    );

    let runtime = tokio::runtime::Runtime::new().map_err(spawn_ledger_sync::SyncError::from)?;
    runtime.block_on(async {
        let refresher = tokio::spawn(
            app.manager
                .clone()
                .run_periodic(galaxy, interval, STARTUP_GRACE),
        );
        tokio::select! {
            _ = refresher => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    log::warn!("could not listen for ctrl-c: {err}");
                }
                log::info!("stopping");
            }
        }
    });
    Ok(())
}
