use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::Galaxy;
use spawn_ledger_sync::cache::ExportKind;
use spawn_ledger_sync::{RefreshOutcome, UpdateReport};

use crate::App;
use crate::error::CliError;

/// Refresh cached exports, resources last so a fresh taxonomy is in place
/// when they ingest.
pub(crate) fn run(app: &App, galaxy: Galaxy, resources_only: bool) -> Result<(), CliError> {
    let kinds: Vec<ExportKind> = if resources_only {
        vec![ExportKind::CurrentResources(galaxy)]
    } else {
        vec![
            ExportKind::Categories,
            ExportKind::Servers,
            ExportKind::CurrentResources(galaxy),
        ]
    };

    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}").expect("static pattern"),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    for kind in kinds {
        spinner.set_message(format!("refreshing {}", kind.file_name()));
        let outcome = app.manager.refresh(kind)?;
        spinner.suspend(|| report(&kind, &outcome));

        // No point probing the remaining entries if the server is away.
        if let RefreshOutcome::StatusUnavailable { .. } = outcome {
            break;
        }
    }
    spinner.finish_and_clear();
    Ok(())
}

fn report(kind: &ExportKind, outcome: &RefreshOutcome) {
    let name = kind.file_name();
    match outcome {
        RefreshOutcome::UpToDate => println!(
            "  {} {name} already up to date",
            "=".if_supports_color(Stdout, |t| t.dimmed())
        ),
        RefreshOutcome::Updated(report) => println!(
            "  {} {name}: {}",
            "\u{2713}".if_supports_color(Stdout, |t| t.green()),
            describe(report),
        ),
        RefreshOutcome::DroppedBusy => println!(
            "  {} {name}: another refresh is already running",
            "~".if_supports_color(Stdout, |t| t.dimmed())
        ),
        RefreshOutcome::StatusUnavailable { first_failure } => {
            if *first_failure {
                println!(
                    "  {} server unreachable; keeping cached data",
                    "\u{2718}".if_supports_color(Stdout, |t| t.red())
                );
            }
        }
    }
}

fn describe(report: &UpdateReport) -> String {
    match report {
        UpdateReport::Resources(s) => format!(
            "{} new, {} updated, {} depleted, {} skipped",
            s.created, s.updated, s.depleted, s.skipped
        ),
        UpdateReport::Classes(n) => format!("{n} classes"),
        UpdateReport::Servers(n) => format!("{n} servers"),
        UpdateReport::FileOnly => "replaced".to_string(),
    }
}
