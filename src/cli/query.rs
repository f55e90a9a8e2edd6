//! Path and fee query commands.

use super::{load_rules, CliError, OutputFormat};
use huntercore::game::{
    format_amount, min_message_fee, min_registration_fee, min_spawn_lock, path_cost,
};
use huntercore::Coord;
use serde_json::json;
use std::path::Path;

/// Execute the path command.
///
/// # Errors
///
/// Returns an error if the rules are unusable or a tile is off the grid.
pub(crate) fn path(
    from: (i32, i32),
    to: (i32, i32),
    rules: Option<&Path>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let rules = load_rules(rules, false)?;
    let start = Coord::new(from.0, from.1);
    let waypoints = rules.grid()?.find_path(start, Coord::new(to.0, to.1))?;
    let blocks = path_cost(start, &waypoints);

    match format {
        OutputFormat::Text => {
            let tiles: Vec<String> = waypoints.iter().map(ToString::to_string).collect();
            println!("{} -> {} in {blocks} blocks", start, tiles.join(" -> "));
        }
        OutputFormat::Json => {
            let wp: Vec<i32> = waypoints.iter().flat_map(|c| [c.x, c.y]).collect();
            println!("{}", json!({ "wp": wp, "blocks": blocks }));
        }
    }
    Ok(())
}

/// Execute the fee command.
///
/// # Errors
///
/// Returns an error if the rules are unusable.
pub(crate) fn fee(length: usize, rules: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let rules = load_rules(rules, false)?;
    let message = min_message_fee(length);

    match format {
        OutputFormat::Text => {
            println!("Relay fee for {length} bytes: {}", format_amount(message));
            println!("Registration fee: {}", format_amount(min_registration_fee()));
            println!("Spawn lock: {}", format_amount(min_spawn_lock(&rules)));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "length": length,
                    "message_fee": message,
                    "registration_fee": min_registration_fee(),
                    "spawn_lock": min_spawn_lock(&rules),
                })
            );
        }
    }
    Ok(())
}
