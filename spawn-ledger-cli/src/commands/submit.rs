use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::{Galaxy, ResourceStats};
use spawn_ledger_net::ResourceService;
use spawn_ledger_registry::{ResourceDraft, UpdateCategory, UpdateEvent};

use crate::App;
use crate::error::CliError;

use super::dupes;

/// Validate, scan for near duplicates, and submit a new resource.
pub(crate) fn run(
    app: &App,
    galaxy: Galaxy,
    name: &str,
    class_token: &str,
    stats_text: &str,
    force: bool,
) -> Result<(), CliError> {
    let classes = app.manager.classes();
    let class = classes.by_token(class_token).ok_or_else(|| {
        CliError::usage(format!(
            "unknown class token '{class_token}'; refresh the categories export first"
        ))
    })?;

    // Stat text is shaped by the class: one token per expected stat, in
    // game order. All problems come back in one report.
    let stats: ResourceStats = ResourceStats::parse_for_class(stats_text, &class)?;
    class.validate(&stats)?;

    let mut draft = ResourceDraft::new(name, galaxy, class_token);
    draft.stats = stats;
    draft.validate_name()?;

    // The guard against misspelled re-submissions. Overriding is an
    // explicit decision, never the default.
    let warnings = dupes::scan(app, galaxy, name, class_token);
    if !warnings.is_empty() && !force {
        println!(
            "{}",
            format!("{} suspiciously similar name(s) already known:", warnings.len())
                .if_supports_color(Stdout, |t| t.yellow()),
        );
        for warning in &warnings {
            println!(
                "  {} [{}] — distance {}",
                warning.name.if_supports_color(Stdout, |t| t.bold()),
                warning.class_name,
                warning.distance,
            );
        }
        return Err(CliError::usage(
            "submission aborted; re-run with --force to submit anyway",
        ));
    }

    let status = app.service.submit_new(&draft)?;
    if !status.is_accepted() {
        return Err(CliError::usage(format!("server refused the submission: {status}")));
    }

    // Either way the resource now exists remotely; converge the local
    // canonical instance on it.
    let resource = match app.service.find_by_name(name, galaxy)? {
        Some(remote) => app.registry.resolve_or_create(&remote)?,
        None => app.registry.resolve_or_create(&draft)?,
    };
    app.notifier.notify(&UpdateEvent::with_note(
        UpdateCategory::LocalSubmission,
        format!("submitted '{name}'"),
    ));

    println!(
        "{} submitted '{}' ({})",
        "\u{2713}".if_supports_color(Stdout, |t| t.green()),
        resource.name(),
        status,
    );
    if let Some(id) = resource.remote_id() {
        println!("  remote id {id}");
    }
    Ok(())
}
