use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use swisstax_core::{
    CalculationRequest, CalculationResult, CivilStatus, DbConfig, Denomination, RateSnapshot,
    RepositoryRegistry, TaxCalculator,
};
use swisstax_data::{AppConfig, init_logging};
use swisstax_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

/// Swiss federal, cantonal, municipal and church tax for one taxpayer.
///
/// Loads the rate tables for the requested year from the configured backend
/// and prints the liability breakdown.
#[derive(Debug, Parser)]
#[command(name = "swisstax-calc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database backend; overrides the config file.
    #[arg(long)]
    backend: Option<String>,

    /// Database connection string; overrides the config file.
    #[arg(long)]
    db: Option<String>,

    #[arg(long, default_value_t = 2024)]
    year: i32,

    /// Two-letter canton code, e.g. `ZH`.
    #[arg(long)]
    canton: String,

    #[arg(long)]
    municipality: String,

    /// `single`, `married` or `single_parent`.
    #[arg(long, default_value = "single", value_parser = parse_civil_status)]
    civil_status: CivilStatus,

    #[arg(long, default_value_t = 0)]
    children: u32,

    #[arg(long)]
    income: Decimal,

    #[arg(long, default_value = "0")]
    wealth: Decimal,

    /// Itemized deduction as `code=amount`; repeatable.
    #[arg(long = "claim", value_parser = parse_claim)]
    claims: Vec<(String, Decimal)>,

    /// `protestant`, `roman_catholic`, `christ_catholic` or `jewish`.
    #[arg(long, value_parser = parse_denomination)]
    denomination: Option<Denomination>,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log level or filter directive.
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_civil_status(s: &str) -> Result<CivilStatus, String> {
    CivilStatus::parse(s).ok_or_else(|| format!("unknown civil status '{s}'"))
}

fn parse_denomination(s: &str) -> Result<Denomination, String> {
    Denomination::parse(s).ok_or_else(|| format!("unknown denomination '{s}'"))
}

fn parse_claim(s: &str) -> Result<(String, Decimal), String> {
    let (code, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected code=amount, got '{s}'"))?;
    let amount = amount
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount in '{s}': {e}"))?;
    Ok((code.trim().to_string(), amount))
}

fn print_breakdown(
    request: &CalculationRequest,
    result: &CalculationResult,
) {
    println!(
        "{} {} {} ({})",
        request.canton.to_ascii_uppercase(),
        request.municipality,
        request.tax_year,
        request.civil_status.as_str()
    );
    let rows = [
        ("Taxable income (federal)", result.federal_taxable_income),
        ("Taxable income (canton)", result.taxable_income),
        ("Taxable wealth", result.taxable_wealth),
        ("Cantonal simple income tax", result.cantonal_simple_tax),
        ("Cantonal simple wealth tax", result.cantonal_simple_wealth_tax),
        ("Federal tax", result.federal_tax),
        ("Cantonal tax", result.cantonal_tax),
        ("Municipal tax", result.municipal_tax),
        ("Church tax", result.church_tax),
        ("Total tax", result.total_tax),
    ];
    for (label, amount) in rows {
        println!("  {label:<28} {amount:>14.2}");
    }
    println!(
        "  {:<28} {:>13.2}%",
        "Effective rate",
        result.effective_rate * Decimal::ONE_HUNDRED
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    init_logging(
        cli.log_level.as_deref().or(config.log_level.as_deref()),
        config.log_file.as_deref(),
    )?;

    let db_config = DbConfig {
        backend: cli.backend.unwrap_or(config.database.backend),
        connection_string: cli.db.unwrap_or(config.database.connection_string),
    };

    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));

    debug!("connecting to {} backend", db_config.backend);
    let repo = registry
        .create(&db_config)
        .await
        .with_context(|| format!("Failed to open {} backend", db_config.backend))?;

    let snapshot = RateSnapshot::load(&*repo, cli.year)
        .await
        .with_context(|| format!("Failed to load rate tables for {}", cli.year))?;

    let request = CalculationRequest {
        canton: cli.canton,
        municipality: cli.municipality,
        tax_year: cli.year,
        civil_status: cli.civil_status,
        children: cli.children,
        gross_income: cli.income,
        gross_wealth: cli.wealth,
        deduction_claims: cli.claims.into_iter().collect::<BTreeMap<_, _>>(),
        denomination: cli.denomination,
    };

    let result = TaxCalculator::new(&snapshot)
        .calculate(&request)
        .context("Calculation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else {
        print_breakdown(&request, &result);
    }

    Ok(())
}
