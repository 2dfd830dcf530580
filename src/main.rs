//! scrapecheck binary
//!
//! Runs the conformance suite against the exporters named in the config file.

use clap::Parser;
use scrapecheck::cli::{Cli, Command, generate_config_template};
use scrapecheck::config::Config;
use scrapecheck::exposition::MetricsParser;
use scrapecheck::metrics::Metrics;
use scrapecheck::runner::Runner;
use scrapecheck::suite::LowerCaseOutputNames;
use scrapecheck::telemetry;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Configuration template written to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Parse {
            file,
            content_type,
            json,
        }) => {
            telemetry::init("warn");
            let body = std::fs::read(&file)?;
            let metrics = MetricsParser::parse(&body, Some(&content_type))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                for metric in &metrics {
                    if metric.labels().is_empty() {
                        println!("{} {}", metric.name(), metric.value());
                        continue;
                    }
                    let labels: Vec<String> = metric
                        .labels()
                        .iter()
                        .map(|(k, v)| format!("{}={:?}", k, v))
                        .collect();
                    println!("{}{{{}}} {}", metric.name(), labels.join(","), metric.value());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Run { json, metrics_file }) => run(&cli.config, json, metrics_file).await,
        None => run(&cli.config, false, None).await,
    }
}

async fn run(
    config_path: &str,
    json: bool,
    metrics_file: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::from_file(config_path)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config = %config_path,
        exporters = config.exporters.len(),
        parallelism = config.run.parallelism,
        "Starting conformance run"
    );

    let metrics = Metrics::new()?;
    let suite = LowerCaseOutputNames::from_config(&config, metrics.clone())?;
    let runner = Runner::new(config.run.parallelism, metrics.clone());

    let report = runner.run(&suite, config.exporters.clone()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if let Some(path) = metrics_file {
        std::fs::write(&path, metrics.gather()?)?;
        tracing::info!(path = %path, "Harness metrics written");
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
