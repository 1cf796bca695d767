use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::{Galaxy, ResourceFilter};
use spawn_ledger_match::{CapPolicy, Guard, GuardLogic};

use crate::App;
use crate::error::CliError;

use super::parse_stat_pairs;

/// List the galaxy's resources matching a threshold filter, built as a
/// one-off guard.
pub(crate) fn run(
    app: &App,
    galaxy: Galaxy,
    thresholds: &str,
    require_all: bool,
    accept_no_stats: bool,
) -> Result<(), CliError> {
    let filter = ResourceFilter::from_vector(parse_stat_pairs(thresholds)?);
    let mut guard = Guard::new(
        "cli filter",
        GuardLogic::Plain {
            filter,
            require_all,
        },
    );
    guard.accept_no_stats = accept_no_stats;

    let classes = app.manager.classes();
    let caps = CapPolicy::default();
    let mut hits = 0usize;

    let mut snapshot = app.registry.galaxy_snapshot(galaxy);
    snapshot.sort_by_key(|r| r.name());
    for resource in snapshot {
        let Some(class) = classes.by_token(&resource.class_token()) else {
            continue;
        };
        if !guard.matches(&resource.stats(), &class, &caps) {
            continue;
        }
        hits += 1;
        println!(
            "  {} [{}]{} — {}",
            resource.name().if_supports_color(Stdout, |t| t.bold()),
            class.name.if_supports_color(Stdout, |t| t.cyan()),
            if resource.is_depleted() {
                " (depleted)"
            } else {
                ""
            },
            resource.stats().format(true),
        );
    }

    if hits == 0 {
        println!(
            "{}",
            format!("nothing in {galaxy} matches").if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}
