use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_net::ResourceService;
use spawn_ledger_net::envelope::format_timestamp;
use spawn_ledger_sync::cache;

use crate::App;
use crate::error::CliError;

/// Show server freshness and the local cache inventory.
pub(crate) fn run(app: &App) -> Result<(), CliError> {
    match app.service.server_status() {
        Ok(when) => println!(
            "server: {} (last updated {})",
            "reachable".if_supports_color(Stdout, |t| t.green()),
            format_timestamp(when),
        ),
        Err(err) => println!(
            "server: {} ({err})",
            "unreachable".if_supports_color(Stdout, |t| t.red()),
        ),
    }

    let dir = cache::cache_dir()?;
    let meta = cache::load_meta(&dir)?;
    if meta.exports.is_empty() {
        println!(
            "{}",
            "No cached exports yet. Run 'spawn-ledger refresh'.".if_supports_color(Stdout, |t| t.dimmed())
        );
        return Ok(());
    }

    println!("{}", "Cached exports:".if_supports_color(Stdout, |t| t.bold()));
    let mut entries: Vec<_> = meta.exports.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (file_name, cached) in entries {
        println!(
            "  {} — {} bytes, downloaded {}",
            file_name.if_supports_color(Stdout, |t| t.bold()),
            cached.file_size,
            cached.downloaded,
        );
    }
    Ok(())
}
