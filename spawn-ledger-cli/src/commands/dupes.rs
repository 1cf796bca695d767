use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::Galaxy;
use spawn_ledger_match::{DuplicateWarning, find_near_duplicates};

use crate::App;
use crate::error::CliError;

/// Run the near-duplicate scan a submission would run, and print the
/// result.
pub(crate) fn run(app: &App, galaxy: Galaxy, name: &str, class_token: &str) -> Result<(), CliError> {
    let warnings = scan(app, galaxy, name, class_token);
    if warnings.is_empty() {
        println!(
            "{}",
            format!("no names close to '{name}' in {galaxy}").if_supports_color(Stdout, |t| t.green()),
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("{} suspiciously similar name(s):", warnings.len())
            .if_supports_color(Stdout, |t| t.yellow()),
    );
    for warning in warnings {
        println!(
            "  {} [{}] — distance {}",
            warning.name.if_supports_color(Stdout, |t| t.bold()),
            warning.class_name,
            warning.distance,
        );
    }
    Ok(())
}

/// Scan the galaxy's known resources for names too close to a candidate.
/// Shared with the submit command.
pub(crate) fn scan(
    app: &App,
    galaxy: Galaxy,
    name: &str,
    class_token: &str,
) -> Vec<DuplicateWarning> {
    let classes = app.manager.classes();
    let class_name = |token: &str| {
        classes
            .by_token(token)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| token.to_string())
    };
    let candidate_class = class_name(class_token);

    let known: Vec<(String, String)> = app
        .registry
        .galaxy_snapshot(galaxy)
        .iter()
        .map(|r| (r.name(), class_name(&r.class_token())))
        .collect();

    find_near_duplicates(
        name,
        &candidate_class,
        known.iter().map(|(n, c)| (n.as_str(), c.as_str())),
    )
}
