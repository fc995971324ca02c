//! Water-Level Forecast Evaluation - Main Pipeline
//!
//! A batch pipeline that:
//! 1. Loads the preprocessed water-level dataset (headerless CSV)
//! 2. Builds a regression schema from the column count
//! 3. Re-emits the table as a temp CSV and streams it record-by-record
//! 4. Drives an adaptive random forest prequentially (test-then-train)
//! 5. Reconstructs absolute levels by re-adding the baseline offset
//! 6. Renders the full-series and zoom charts against the flood level
//! 7. Writes a JSON evaluation report
//!
//! Usage:
//!   cargo run --release                          # defaults from forecast.toml
//!   cargo run --release -- --config other.toml   # alternate configuration
//!   cargo run --release -- --data levels.csv     # alternate dataset
//!   cargo run --release -- --no-charts           # metrics/report only
//!
//! Environment:
//!   FLOCAST_DATA - dataset path override (lower precedence than --data)

use std::env;
use std::error::Error;

use flocast_service::analysis::exceedance;
use flocast_service::analysis::reconstruction::reconstruct_levels;
use flocast_service::chart::{render_levels_chart, ChartSpec};
use flocast_service::config::{self, ForecastConfig};
use flocast_service::evaluation::{prequential_evaluation, EvaluationOptions};
use flocast_service::ingest::dataset::FeatureTable;
use flocast_service::learner::forest::ForestRegressor;
use flocast_service::logging::{self, LogLevel, Stage};
use flocast_service::report::{
    write_report, DatasetSummary, EvaluationReport, LearnerSummary,
};
use flocast_service::stream::{CsvStream, Schema};

fn main() {
    println!("🌊 Water-Level Forecast Evaluation");
    println!("===================================\n");

    dotenv::dotenv().ok();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path = "forecast.toml".to_string();
    let mut data_override: Option<String> = None;
    let mut render_charts = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
            }
            "--data" => {
                if i + 1 < args.len() {
                    data_override = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --data requires a file path");
                    std::process::exit(1);
                }
            }
            "--no-charts" => {
                render_charts = false;
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!(
                    "Usage: {} [--config PATH] [--data PATH] [--no-charts]",
                    args[0]
                );
                std::process::exit(1);
            }
        }
    }

    logging::init_logger(LogLevel::Info, None);

    let config = config::load_config(&config_path);
    let data_path = data_override
        .or_else(|| env::var("FLOCAST_DATA").ok())
        .unwrap_or_else(|| config.dataset.path.clone());

    if let Err(e) = run(&config, &data_path, render_charts) {
        eprintln!("\n❌ Evaluation failed: {}\n", e);
        std::process::exit(1);
    }
}

fn run(config: &ForecastConfig, data_path: &str, render_charts: bool) -> Result<(), Box<dyn Error>> {
    // 1. Ingest the feature table
    println!("📊 Loading dataset from {}...", data_path);
    let table = FeatureTable::from_csv_path(data_path)?;
    println!(
        "   ✓ {} rows, {} columns ({} features + target)\n",
        table.n_rows(),
        table.n_columns(),
        table.n_features()
    );

    // 2. Schema from the column count
    let schema = Schema::for_regression(table.n_features());

    // 3. Re-emit the table and open the record-at-a-time stream
    println!("📋 Re-emitting temp stream file {}...", config.dataset.temp_path);
    table.write_csv(&config.dataset.temp_path)?;
    let mut stream = CsvStream::open(&config.dataset.temp_path, schema)?;

    // 4. Build the ensemble
    let mut forest = ForestRegressor::from_config(&config.learner, table.n_features());
    println!(
        "🌲 Adaptive random forest: {} members, max_features {}, λ {}, drift detection {}\n",
        forest.n_members(),
        config.learner.max_features,
        config.learner.lambda,
        if config.learner.disable_drift_detection { "off" } else { "on" }
    );

    // 5. Prequential evaluation
    println!("🔄 Running prequential evaluation (window {})...", config.evaluation.window_size);
    let options = EvaluationOptions::from(&config.evaluation);
    let results = prequential_evaluation(&mut stream, &mut forest, &options)?;
    println!(
        "   ✓ {} instances | RMSE {:.4} | MAE {:.4} | R² {:.4} | {} leaves across members\n",
        results.instances,
        results.cumulative.rmse,
        results.cumulative.mae,
        results.cumulative.r2,
        forest.total_leaves()
    );

    // 6. Reconstruct absolute levels from relative predictions
    let baseline = table.baseline_column();
    let predicted_levels = reconstruct_levels(&results.predictions, &baseline)?;
    let actual_ground_truth = reconstruct_levels(&results.ground_truth, &baseline)?;
    let observed_levels = &baseline[..predicted_levels.len()];

    let flood_level = config.charts.flood_level;
    let observed_exceedance = exceedance::summarize(&actual_ground_truth, flood_level);
    let predicted_exceedance = exceedance::summarize(&predicted_levels, flood_level);
    logging::info(
        Stage::Analysis,
        &format!(
            "observed flood events: {}, forecast flood events: {}",
            observed_exceedance.events, predicted_exceedance.events
        ),
    );

    // 7. Charts (nothing to draw when prediction storage is off)
    if render_charts && predicted_levels.is_empty() {
        logging::warn(
            Stage::Chart,
            "store_predictions is off; no series to chart",
        );
    }
    if render_charts && !predicted_levels.is_empty() {
        println!("📈 Rendering charts...");
        let full_spec = ChartSpec::new(
            "Predicted vs. Actual Water Level",
            config.charts.full_width,
            config.charts.full_height,
            flood_level,
        );
        render_levels_chart(observed_levels, &predicted_levels, &full_spec, &config.charts.full_path)?;
        println!("   ✓ {}", config.charts.full_path);

        let zoom_start = config.charts.zoom_start.min(predicted_levels.len());
        let zoom_end = config.charts.zoom_end.min(predicted_levels.len());
        if zoom_start < zoom_end {
            let zoom_spec = ChartSpec::new(
                format!(
                    "Predicted vs. Actual Water Level (Instances {} to {})",
                    zoom_start, zoom_end
                ),
                config.charts.zoom_width,
                config.charts.zoom_height,
                flood_level,
            )
            .with_x_offset(zoom_start);
            render_levels_chart(
                &observed_levels[zoom_start..zoom_end],
                &predicted_levels[zoom_start..zoom_end],
                &zoom_spec,
                &config.charts.zoom_path,
            )?;
            println!("   ✓ {}", config.charts.zoom_path);
        } else {
            logging::warn(
                Stage::Chart,
                &format!(
                    "zoom window {}..{} is outside the {}-instance series, skipping zoom chart",
                    config.charts.zoom_start,
                    config.charts.zoom_end,
                    predicted_levels.len()
                ),
            );
        }
        println!();
    }

    // 8. Report
    let report = EvaluationReport::new(
        DatasetSummary {
            path: data_path.to_string(),
            rows: table.n_rows(),
            columns: table.n_columns(),
        },
        LearnerSummary::from(&config.learner),
        &results,
        observed_exceedance,
        predicted_exceedance,
    );
    write_report(&report, &config.report.path)?;
    println!("📝 Report written to {}\n", config.report.path);

    Ok(())
}
