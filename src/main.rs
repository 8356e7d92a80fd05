use std::fs::File;
use std::io::{BufWriter, Write};

use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kzpml::aggregate::AggregatePml;
use kzpml::config::EngineConfig;
use kzpml::contract::Contract;
use kzpml::scenarios::ScenarioResult;
use kzpml::scoring::{PortfolioSummary, summarize};
use kzpml::synthetic::SyntheticPortfolio;
use kzpml::types::{Hazard, RiskLevel};
use kzpml::RiskEngine;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut portfolio = SyntheticPortfolio::canonical();
    let mut config_path: Option<String> = None;
    let mut output_path = "contracts.ndjson".to_string();
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                portfolio.seed = args.get(i).ok_or("--seed requires a u64")?.parse()?;
            }
            "--contracts" => {
                i += 1;
                portfolio.contracts = args.get(i).ok_or("--contracts requires a count")?.parse()?;
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).ok_or("--config requires a path")?.clone());
            }
            "--output" => {
                i += 1;
                output_path = args.get(i).ok_or("--output requires a path")?.clone();
            }
            "--quiet" => quiet = true,
            other => eprintln!("ignoring unknown argument {other}"),
        }
        i += 1;
    }

    init_tracing();

    let config = match &config_path {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::canonical(),
    };
    let engine = RiskEngine::new(config)?;

    let mut contracts = portfolio.generate()?;
    let today = NaiveDate::from_ymd_opt(portfolio.year, 1, 1).ok_or("portfolio year out of range")?;
    info!(contracts = contracts.len(), seed = portfolio.seed, "synthetic portfolio generated");

    // Cache scores on the contracts; later aggregation reuses them.
    let scores = engine.score_portfolio_at(&contracts, today);
    let summary = summarize(&contracts, &scores);
    for (contract, score) in contracts.iter_mut().zip(scores) {
        contract.risk_data = Some(score);
    }

    write_ndjson(&contracts, &output_path)?;
    info!(path = %output_path, "scored contracts written");

    let aggregate = engine.aggregate_pml_at(&contracts, today);
    let scenarios = engine.scenarios(&contracts);

    if !quiet {
        print_summary(&summary);
        print_aggregate(&aggregate);
        print_scenarios(&scenarios);
    }
    Ok(())
}

fn write_ndjson(contracts: &[Contract], path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    for c in contracts {
        serde_json::to_writer(&mut writer, c)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

const MILLION: f64 = 1_000_000.0;

fn print_summary(summary: &PortfolioSummary) {
    println!("\n=== Portfolio ===");
    println!("  Contracts:          {}", summary.contracts);
    println!("  Geocoded:           {}", summary.located);
    println!("  Active:             {}", summary.active);
    println!("  Active sum insured: {:.1} M", summary.active_sum_insured / MILLION);
    for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Extreme] {
        let n = summary.by_level.get(&level).copied().unwrap_or(0);
        println!("  {:<19} {n}", format!("{level:?}:"));
    }
}

fn print_aggregate(agg: &AggregatePml) {
    println!("\n=== Aggregate PML ({} contracts) ===", agg.contracts_included);
    println!("  {}", agg.formula);
    println!("  1 year:   {:>12.3} M", agg.total / MILLION);
    println!("  short:    {:>12.3} M", agg.periods.short / MILLION);
    println!("  medium:   {:>12.3} M", agg.periods.medium / MILLION);
    println!("  long:     {:>12.3} M", agg.periods.long / MILLION);

    println!("\n--- Breakdown by hazard (1 year) ---");
    for h in Hazard::ALL {
        let v = *agg.breakdown.get(h);
        let share = if agg.total > 0.0 { v / agg.total * 100.0 } else { 0.0 };
        println!("  {:<9} {:>12.3} M  {:>5.1}%", format!("{h:?}"), v / MILLION, share);
    }
}

fn print_scenarios(results: &[ScenarioResult]) {
    println!("\n=== Scenarios ===");
    println!(
        "{:<14} | {:>5} | {:>14} | {:>6} | {:>12}",
        "Scenario", "Count", "Exposure(M)", "Factor", "PML(M)"
    );
    println!("{}", "-".repeat(14 + 3 + 5 + 3 + 14 + 3 + 6 + 3 + 12));
    for r in results {
        println!(
            "{:<14} | {:>5} | {:>14.2} | {:>5.0}% | {:>12.3}",
            r.id,
            r.count,
            r.exposure / MILLION,
            r.factor * 100.0,
            r.pml / MILLION,
        );
    }
}
