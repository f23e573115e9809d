//! CLI command implementations

use crate::output::{render_report, to_json, OutputFormat};
use crate::simulate::Simulation;
use crate::trace::Trace;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;
use vantage_core::{
    machine::load_delay, ConnectionQuality, EffectiveConnectionType, LoadStrategy,
    NetworkConditions, ViewportConfig,
};

/// Replay a scroll trace and print the resulting timeline
pub async fn simulate(trace_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let trace = Trace::load(trace_path).await?;
    info!(
        path = %trace_path.display(),
        slots = trace.slots.len(),
        steps = trace.steps.len(),
        "Replaying trace"
    );

    let report = Simulation::new(trace)?.run()?;
    println!("{}", render_report(&report, format));
    Ok(())
}

#[derive(Serialize, Tabled)]
struct PresetRow {
    #[tabled(rename = "Preset")]
    name: String,
    #[tabled(rename = "Load at")]
    loading_threshold: f64,
    #[tabled(rename = "Play at")]
    play_threshold: f64,
    #[tabled(rename = "Unload (px)")]
    unload_distance: f64,
    #[tabled(rename = "Margin (px)")]
    viewport_margin: f64,
    #[tabled(rename = "Prefetch")]
    prefetch_enabled: bool,
    #[tabled(rename = "Data saver")]
    respect_data_saver: bool,
}

impl PresetRow {
    fn new(name: &str, config: &ViewportConfig) -> Self {
        Self {
            name: name.to_string(),
            loading_threshold: config.loading_threshold,
            play_threshold: config.play_threshold,
            unload_distance: config.unload_distance,
            viewport_margin: config.viewport_margin,
            prefetch_enabled: config.prefetch_enabled,
            respect_data_saver: config.respect_data_saver,
        }
    }
}

/// List the named configuration presets
pub fn presets(format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<PresetRow> = ViewportConfig::preset_names()
        .iter()
        .filter_map(|name| ViewportConfig::preset(name).map(|c| PresetRow::new(name, &c)))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Table => println!("{}", Table::new(rows).with(Style::rounded())),
        OutputFormat::Text => {
            println!("Available presets:\n");
            for row in rows {
                println!("  {}:", row.name);
                println!("    Load at ratio:   {}", row.loading_threshold);
                println!("    Play at ratio:   {}", row.play_threshold);
                println!("    Unload distance: {}px", row.unload_distance);
                println!("    Viewport margin: {}px", row.viewport_margin);
                println!("    Prefetch:        {}", row.prefetch_enabled);
                println!("    Data saver:      {}", row.respect_data_saver);
                println!();
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct StrategyReport {
    conditions: NetworkConditions,
    respect_data_saver: bool,
    quality: ConnectionQuality,
    strategy: LoadStrategy,
    preload: &'static str,
    load_delay_ms: u64,
}

/// Show how network conditions map to a preload strategy
pub fn strategy(
    effective_type: &str,
    save_data: bool,
    ignore_data_saver: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let effective_type: EffectiveConnectionType = effective_type.parse()?;
    let conditions = NetworkConditions::new(effective_type, save_data);
    let respect_data_saver = !ignore_data_saver;
    let quality = ConnectionQuality::derive(&conditions, respect_data_saver);
    let strategy = quality.load_strategy();

    let report = StrategyReport {
        conditions,
        respect_data_saver,
        quality,
        strategy,
        preload: strategy.as_preload_attr(),
        load_delay_ms: load_delay(quality).as_millis() as u64,
    };

    match format {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text | OutputFormat::Table => {
            println!("Connection: {} (save-data: {})", effective_type, save_data);
            println!("  Quality:    {}", report.quality);
            println!("  Strategy:   {}", report.strategy);
            println!("  Preload:    {}", report.preload);
            println!("  Load delay: {}ms", report.load_delay_ms);
        }
    }
    Ok(())
}
