mod browser;
mod fetch;
mod geocode;
mod models;
mod orgs;
mod output;
mod pager;
mod saved;
mod scraper;
mod summary;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use browser::BrowserDirectory;
use clap::{Arg, ArgAction, ArgMatches, Command};
use fetch::OrgSource;
use models::{Config, DataSourceMode, ResultSet};
use orgs::OrgListParser;
use pager::{DirectoryOutcome, Pager};
use saved::SavedPages;
use std::path::Path;
use std::time::Duration;
use summary::RunSummary;
use tracing::warn;

fn cli() -> Command {
    Command::new("skillbridge-scraper")
        .version("0.1")
        .about("Collects the SkillBridge program directory and organization list into one CSV file")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the CSV here instead of a timestamped file"),
        )
        .arg(
            Arg::new("saved")
                .long("saved")
                .value_name("DIR")
                .help("Read previously saved directory pages instead of driving a browser"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .help("Show the browser window")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-orgs")
                .long("no-orgs")
                .help("Skip the organization list")
                .action(ArgAction::SetTrue),
        )
}

/// Command-line flags take precedence over the configuration file.
fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_file = Some(output.clone());
    }
    if let Some(dir) = matches.get_one::<String>("saved") {
        config.data_source_mode = DataSourceMode::Saved;
        config.pages_directory = Some(dir.clone());
    }
    if matches.get_flag("headed") {
        config.headless = false;
    }
    if matches.get_flag("no-orgs") {
        config.include_organizations = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let matches = cli().get_matches();
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please review {} and run the program again.", config_file);
        return Ok(());
    };
    apply_overrides(&mut config, &matches);

    run(&config).await
}

async fn run(config: &Config) -> Result<()> {
    let extractor = scraper::RowExtractor::new(&config.selectors.table)?;
    let pager = Pager::new(&extractor);
    let mut results = ResultSet::new();

    let outcome = match config.data_source_mode {
        DataSourceMode::Browser => scrape_live(config, &pager, &mut results).await?,
        DataSourceMode::Saved => {
            let dir = config.pages_directory.as_deref().unwrap_or("pages");
            let mut pages = SavedPages::open(Path::new(dir), &config.selectors)?;
            println!("📂 Reading {} saved pages from: {}", pages.page_count(), dir);
            pager.scrape_directory(&mut pages, &mut results).await?
        }
    };
    println!(
        "   ✅ Found {} directory entries across {} pages",
        outcome.extracted, outcome.pages
    );

    if config.include_organizations {
        let source = OrgSource::new(Duration::from_secs(config.timeouts.request_secs));
        let text = source.load(&config.organizations_source).await?;
        let stats = OrgListParser::new(config.on_malformed_organization)
            .append_to(&text, &mut results)?;
        println!("   ✅ Found {} organizations", stats.added);
        if stats.skipped > 0 {
            println!("   ⚠️  Skipped {} malformed organization entries", stats.skipped);
        }
    }

    if results.is_empty() {
        warn!("no records collected; writing the header only");
    }

    let path = output::output_path(config, chrono::Local::now());
    output::write_records(&path, &results)?;

    let written = output::read_records(&path)?.len();
    if written != results.len() {
        warn!(written, collected = results.len(), "CSV row count differs from collected records");
    }

    let summary = RunSummary::new(outcome.expected, &results);
    println!(
        "📄 Wrote {} directory and {} organization records to {}",
        summary.extracted,
        summary.organizations,
        path.display()
    );
    if summary.matched() {
        println!("✅ {}", summary.status_message());
    } else {
        println!("⚠️  {}", summary.status_message());
    }
    Ok(())
}

async fn scrape_live(
    config: &Config,
    pager: &Pager<'_>,
    results: &mut ResultSet,
) -> Result<DirectoryOutcome> {
    println!("🌐 Loading browser and initiating search at: {}", config.directory_url);
    let mut directory = BrowserDirectory::launch(config).await?;

    println!("🔍 Gathering data... this will be a few minutes...");
    let outcome = pager.scrape_directory(&mut directory, results).await;

    if let Err(e) = directory.close().await {
        warn!("{:#}", e);
    }
    outcome
}
