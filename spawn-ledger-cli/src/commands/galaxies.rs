use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::App;
use crate::error::CliError;

/// List the galaxies known from the servers export.
pub(crate) fn run(app: &App) -> Result<(), CliError> {
    let servers = app.manager.servers();
    if servers.is_empty() {
        println!(
            "{}",
            "No server list cached yet. Run 'spawn-ledger refresh'.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }

    let main = app.settings.main_galaxy;
    for (galaxy, name) in servers {
        let marker = if Some(galaxy) == main { " (main)" } else { "" };
        println!(
            "  {:>4}  {}{marker}",
            galaxy.id(),
            name.if_supports_color(Stdout, |t| t.bold()),
        );
    }
    Ok(())
}
