use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::Galaxy;
use spawn_ledger_net::ResourceService;
use spawn_ledger_registry::KnownResource;

use crate::App;
use crate::error::CliError;

/// Look up a resource locally first, then against the remote database.
pub(crate) fn run(app: &App, galaxy: Galaxy, query: &str) -> Result<(), CliError> {
    // Numeric queries are remote ids, anything else is a name.
    let local = match query.parse::<u64>() {
        Ok(id) => app.registry.lookup_id(id),
        Err(_) => app.registry.lookup_name(query, galaxy),
    };

    if let Some(resource) = local {
        print_resource(app, &resource);
        return Ok(());
    }

    // Not cached locally; ask the server. Unknown there too is a normal
    // outcome, not an error.
    let remote = match query.parse::<u64>() {
        Ok(id) => app.service.find_by_id(id)?,
        Err(_) => app.service.find_by_name(query, galaxy)?,
    };

    match remote {
        Some(draft) => {
            let resource = app.registry.resolve_or_create(&draft)?;
            print_resource(app, &resource);
        }
        None => println!(
            "{}",
            format!("'{query}' is unknown locally and to the server").if_supports_color(Stdout, |t| t.dimmed()),
        ),
    }
    Ok(())
}

fn print_resource(app: &App, resource: &KnownResource) {
    let classes = app.manager.classes();
    let class_name = classes
        .by_token(&resource.class_token())
        .map(|c| c.name.clone())
        .unwrap_or_else(|| resource.class_token());

    println!(
        "{} [{}]{}",
        resource.name().if_supports_color(Stdout, |t| t.bold()),
        class_name.if_supports_color(Stdout, |t| t.cyan()),
        if resource.is_depleted() {
            " (depleted)"
        } else {
            ""
        },
    );
    match resource.remote_id() {
        Some(id) => println!("  id: {id}"),
        None => println!("  id: not yet assigned"),
    }
    println!("  stats: {}", resource.stats().format(true));
    for record in resource.availability() {
        println!(
            "  seen on planet {} at {} by {}",
            record.planet_id, record.reported, record.reporter,
        );
    }
}
