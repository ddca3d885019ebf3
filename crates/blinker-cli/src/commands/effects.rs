//! `blinker effects`: list the device's effect catalog.

use serde::Serialize;

use blinker_config::Config;

use crate::cli::EffectsArgs;
use crate::commands::{connect, idle_line};
use crate::error::CliError;

#[derive(Serialize)]
struct EffectRow<'a> {
    index: usize,
    name: &'a str,
}

pub async fn handle(args: EffectsArgs, cfg: &Config) -> Result<(), CliError> {
    let blinker = connect(cfg, idle_line()).await?;
    let effects = blinker.effects_catalog().await;

    if args.json {
        let rows: Vec<EffectRow<'_>> = effects
            .iter()
            .enumerate()
            .map(|(index, name)| EffectRow { index, name })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if effects.is_empty() {
        eprintln!("The device reported no effects.");
        return Ok(());
    }
    let current = blinker.config().effect.index;
    for (index, name) in effects.iter().enumerate() {
        let marker = if index == usize::from(current) { '*' } else { ' ' };
        println!("{marker}{index:>4}  {name}");
    }
    Ok(())
}
