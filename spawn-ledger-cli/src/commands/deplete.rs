use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::Galaxy;
use spawn_ledger_net::ResourceService;
use spawn_ledger_registry::{UpdateCategory, UpdateEvent};

use crate::App;
use crate::error::CliError;

/// Report a resource as no longer spawned, remotely and locally.
pub(crate) fn run(app: &App, galaxy: Galaxy, query: &str) -> Result<(), CliError> {
    let resource = match query.parse::<u64>() {
        Ok(id) => app.registry.lookup_id(id),
        Err(_) => app.registry.lookup_name(query, galaxy),
    }
    .ok_or_else(|| CliError::usage(format!("'{query}' is not known locally; try 'lookup' first")))?;

    let id = resource.remote_id().ok_or_else(|| {
        CliError::usage(format!(
            "'{}' has no remote id yet; refresh or submit it first",
            resource.name()
        ))
    })?;

    let status = app.service.mark_depleted(id)?;
    if !status.is_accepted() {
        return Err(CliError::usage(format!(
            "server refused the depletion report: {status}"
        )));
    }

    resource.set_depleted(true);
    app.notifier.notify(&UpdateEvent::with_note(
        UpdateCategory::LocalSubmission,
        format!("marked '{}' depleted", resource.name()),
    ));

    println!(
        "{} '{}' marked depleted",
        "\u{2713}".if_supports_color(Stdout, |t| t.green()),
        resource.name(),
    );
    Ok(())
}
