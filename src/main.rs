use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod column;
mod controller;
mod dataset;
mod debounce;
mod domain;
mod filter;
mod fuzzy;
mod inputter;
mod model;
mod pagination;
mod record;
mod reorder;
mod sort;
mod table;
mod ui;
mod visibility;

use controller::Controller;
use domain::{AVConfig, AVError, Variant, parse_filter_arg};
use model::{Model, Status};
use ui::TableUI;

/// Browse push alert records in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, Parquet or Arrow file to load instead of the built-in records
    #[arg(short, long)]
    data: Option<String>,

    /// Feature preset of the table
    #[arg(short, long, value_enum, default_value_t = Variant::Full)]
    variant: Variant,

    #[arg(long)]
    no_sort: bool,

    #[arg(long)]
    no_filter: bool,

    #[arg(long)]
    no_reorder: bool,

    #[arg(long)]
    no_visibility: bool,

    #[arg(long)]
    no_pagination: bool,

    #[arg(long)]
    no_fuzzy: bool,

    /// Rows per page
    #[arg(long, default_value_t = pagination::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Delay before filter input is applied
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Event poll interval
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    #[arg(long, default_value_t = 24)]
    max_column_width: usize,

    /// Initial column filter as COLUMN=VALUE, can be repeated
    #[arg(short, long, value_parser = parse_filter_arg)]
    filter: Vec<(String, String)>,

    #[arg(long, default_value = "alertview.log")]
    log_file: String,
}

impl Args {
    fn config(&self) -> AVConfig {
        let features = self.variant.features();
        let features = features
            .enable_sort(features.enable_sort && !self.no_sort)
            .enable_filter(features.enable_filter && !self.no_filter)
            .enable_reorder(features.enable_reorder && !self.no_reorder)
            .enable_visibility_toggle(features.enable_visibility_toggle && !self.no_visibility)
            .enable_pagination(features.enable_pagination && !self.no_pagination)
            .enable_fuzzy_search(features.enable_fuzzy_search && !self.no_fuzzy);
        AVConfig::default()
            .event_poll_time(self.poll_ms)
            .debounce_ms(self.debounce_ms)
            .page_size(self.page_size)
            .max_column_width(self.max_column_width)
            .features(features)
            .initial_filters(self.filter.clone())
    }
}

fn expand_path(path: &str) -> Result<PathBuf, AVError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| AVError::InvalidArgument(format!("Cannot expand {path}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn setup_logging(log_file: &str) -> Result<(), AVError> {
    let file = File::create(expand_path(log_file)?)?;
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = setup_logging(&args.log_file) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(&args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), AVError> {
    let config = args.config();
    info!("Starting with {config:?}");

    let records = match args.data.as_deref() {
        Some(path) => dataset::load_data_file(expand_path(path)?)?,
        None => dataset::static_alerts(),
    };

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&config, records, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;
        model.update(controller.handle_event(&model)?)?;
    }
    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_switch_features_off() {
        let args = Args::parse_from(["av", "--no-sort", "--no-fuzzy", "-f", "status=active"]);
        let config = args.config();
        assert!(!config.features.enable_sort);
        assert!(!config.features.enable_fuzzy_search);
        assert!(config.features.enable_filter);
        assert_eq!(config.page_size, 10);
        assert_eq!(
            config.initial_filters,
            vec![("status".to_string(), "active".to_string())]
        );
    }

    #[test]
    fn flags_can_not_enable_what_the_variant_lacks() {
        let args = Args::parse_from(["av", "--variant", "column-order", "--page-size", "5"]);
        let config = args.config();
        assert!(!config.features.enable_pagination);
        assert!(config.features.group_headers);
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(Args::try_parse_from(["av", "--filter", "status"]).is_err());
    }
}
