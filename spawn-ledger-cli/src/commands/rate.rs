use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use spawn_ledger_core::{Galaxy, WeightVector};
use spawn_ledger_match::rate;

use crate::App;
use crate::error::CliError;

use super::parse_stat_pairs;

/// Rate one resource against a weight vector, normalized by class caps.
pub(crate) fn run(
    app: &App,
    galaxy: Galaxy,
    query: &str,
    weights_text: &str,
    caps_class: Option<&str>,
    zero_is_max: bool,
    own_cap_wins: bool,
) -> Result<(), CliError> {
    let resource = match query.parse::<u64>() {
        Ok(id) => app.registry.lookup_id(id),
        Err(_) => app.registry.lookup_name(query, galaxy),
    }
    .ok_or_else(|| CliError::usage(format!("'{query}' is not known locally; try 'lookup' first")))?;

    let classes = app.manager.classes();
    let own_class = classes.by_token(&resource.class_token()).ok_or_else(|| {
        CliError::usage(format!(
            "class '{}' is not in the cached taxonomy; refresh first",
            resource.class_token()
        ))
    })?;
    let caps_source = match caps_class {
        Some(token) => Some(classes.by_token(token).ok_or_else(|| {
            CliError::usage(format!("unknown caps class token '{token}'"))
        })?),
        None => None,
    };

    let weights = WeightVector::from_vector(parse_stat_pairs(weights_text)?);
    let rating = rate(
        &weights,
        &resource.stats(),
        &own_class,
        caps_source.as_deref(),
        zero_is_max,
        own_cap_wins,
    );

    println!(
        "{} rates {}",
        resource.name().if_supports_color(Stdout, |t| t.bold()),
        rating.to_string().if_supports_color(Stdout, |t| t.green()),
    );
    println!("  stats: {}", resource.stats().format(true));
    Ok(())
}
