//! Experiment Listing: discovery, filtering and table rows
//!
//! Writes a handful of synthetic experiments to a temporary directory,
//! discovers them again and prints the dashboard table.
//!
//! Run with: cargo run --example experiment_listing
//! Set `RUST_LOG=expdash=debug` to see cache and location events.

use anyhow::Context;
use expdash::experiment::{
    random_experiments, write_experiment_folder, Experiment, ExperimentManager, ExperimentType,
    FilterCriteria,
};
use expdash::location::LocationConfig;
use expdash::logging::init_logging;
use expdash::DashboardConfig;

fn print_table(title: &str, experiments: &[&Experiment]) {
    println!("=== {title} ({} experiments) ===", experiments.len());
    let columns = Experiment::column_spec();
    let header: Vec<_> = columns.iter().map(|c| c.label.as_str()).collect();
    println!("  TYPE | {}", header.join(" | "));
    for experiment in experiments {
        let row = experiment.to_row();
        let cells: Vec<_> = columns.iter().map(|c| row[c.field].as_str()).collect();
        println!("  {} | {}", row["experiment_type"], cells.join(" | "));
    }
    println!();
}

fn main() -> anyhow::Result<()> {
    init_logging("expdash=info");

    let workspace = tempfile::tempdir().context("creating temporary workspace")?;
    let root = workspace.path().join("experiments");
    let config = DashboardConfig {
        experiment_location: LocationConfig::from(root.as_path()),
        image_cache_location: LocationConfig::from(workspace.path().join("image_cache").as_path()),
        data_frame_cache_location: LocationConfig::from(
            workspace.path().join("dataframe_cache").as_path(),
        ),
    };

    let location = config.experiment_location.open()?;
    for experiment in random_experiments(8, Some(2024)) {
        let folder = write_experiment_folder(&location, "", &experiment)?;
        println!("wrote {}", folder.display());
    }
    println!();

    let loader = config.build_loader();
    let manager = ExperimentManager::discover(&loader, None).context("discovering experiments")?;
    print_table("All experiments", &manager.sorted());

    for experiment_type in ExperimentType::ALL {
        let found =
            manager.filter_by(&FilterCriteria::new().and("experiment_type", experiment_type));
        print_table(experiment_type.name(), &found);
    }

    let strict = manager.try_filter_by(&FilterCriteria::new().and("colour", "blue"));
    if let Err(err) = strict {
        println!("strict filter rejected: {err}");
    }

    Ok(())
}
