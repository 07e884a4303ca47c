//! radar CLI: technology-opportunity scoring and investor recommendation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use patent_radar::config::RadarConfig;
use patent_radar::daemon::{DaemonConfig, RefreshDaemon};
use patent_radar::engine::Engine;
use patent_radar::model::{InvestorProfile, MarketSnapshot, PatentRecord};
use patent_radar::refresh::RefreshCoordinator;
use patent_radar::scoring::InvestorPreferences;

#[derive(Parser)]
#[command(name = "radar", version, about = "Technology-opportunity scoring engine")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding patents.json, market.json and investors.json.
    /// Without it, tables come from the seeded synthetic producer.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank technology areas by composite opportunity score.
    Opportunities {
        #[arg(long, default_value = "10")]
        top_k: usize,
    },

    /// Show per-area growth metrics.
    Metrics,

    /// Areas most similar to the given one.
    Similar {
        area: String,
        #[arg(long, default_value = "5")]
        top_k: usize,
    },

    /// Recommend areas for an investor.
    Recommend {
        investor: String,
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Collaborative filtering only, without opportunity blending.
        #[arg(long)]
        collaborative: bool,
    },

    /// Recommend investors for a technology area.
    Investors {
        area: String,
        #[arg(long, default_value = "8")]
        top_k: usize,
    },

    /// Latest market conditions of an area.
    Insights { area: String },

    /// Patent growth against market growth, per area.
    Growth,

    /// Rank opportunities against ad-hoc preferences.
    Match {
        /// Risk appetite, 0.0 (conservative) to 1.0 (aggressive).
        #[arg(long, default_value = "0.6")]
        risk_appetite: f64,
        #[arg(long, default_value = "50")]
        min_quality: f64,
        #[arg(long, default_value = "60")]
        min_market_size: f64,
        #[arg(long, default_value = "70")]
        max_competition: f64,
        /// Preferred areas (comma-separated).
        #[arg(long, value_delimiter = ',')]
        areas: Vec<String>,
    },

    /// Run the periodic refresh against the synthetic producer.
    Daemon {
        /// Stop after this many refresh cycles (0 = until Ctrl+C).
        #[arg(long, default_value = "0")]
        max_cycles: usize,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RadarConfig::load_or_default(cli.config.as_deref())?;
    let (patents, market, investors) = match &cli.data_dir {
        Some(dir) => load_tables(dir)?,
        None => config.synthetic.build().initial_tables(),
    };
    let engine = Engine::with_config(config.engine_config(), patents, market, investors)?;

    match cli.command {
        Commands::Opportunities { top_k } => {
            let opps: Vec<_> = engine.opportunity_scores().into_iter().take(top_k).collect();
            if cli.json {
                return print_json(&opps);
            }
            println!("Top {} opportunities:", opps.len());
            for (i, o) in opps.iter().enumerate() {
                println!(
                    "  {}. {} score={:.1} cagr={:.1}% risk={} trend={}",
                    i + 1,
                    o.area,
                    o.score,
                    o.cagr_percent,
                    o.risk,
                    o.trend
                );
                println!("     {}", o.recommendation);
            }
        }

        Commands::Metrics => {
            let metrics = engine.growth_metrics();
            if cli.json {
                return print_json(&metrics);
            }
            for m in &metrics {
                println!(
                    "  {} patents={} applicants={} cagr={:.3} accel={:.3} market_growth={:.3}{}",
                    m.area,
                    m.patent_count,
                    m.applicant_count,
                    m.cagr,
                    m.acceleration,
                    m.market_growth,
                    if m.market_fallback { " (no market data)" } else { "" }
                );
            }
        }

        Commands::Similar { area, top_k } => {
            let similar = engine.find_similar(&area, top_k);
            if cli.json {
                return print_json(&similar);
            }
            if similar.is_empty() {
                println!("No similar areas for \"{area}\".");
            }
            for (other, sim) in &similar {
                println!("  {other} (similarity: {sim:.4})");
            }
        }

        Commands::Recommend {
            investor,
            top_k,
            collaborative,
        } => {
            if collaborative {
                let recs = engine.collaborative_recommend(&investor, top_k);
                if cli.json {
                    return print_json(&recs);
                }
                for (area, weight) in &recs {
                    println!("  {area} (weight: {weight:.4})");
                }
            } else {
                let recs = engine.hybrid_recommend(&investor, top_k);
                if cli.json {
                    return print_json(&recs);
                }
                if recs.is_empty() {
                    println!("No recommendations for \"{investor}\".");
                }
                for r in &recs {
                    println!("  {} (score: {:.4})", r.area, r.score);
                }
            }
        }

        Commands::Investors { area, top_k } => {
            let matches = engine.recommend_investors(&area, top_k);
            if cli.json {
                return print_json(&matches);
            }
            if matches.is_empty() {
                println!("No investors match \"{area}\".");
            }
            for m in &matches {
                println!(
                    "  {} [{}] {:.1}% {}",
                    m.name, m.investor_type, m.match_percent, m.investment_size
                );
                println!("     {}", m.reasoning);
            }
        }

        Commands::Insights { area } => {
            let insight = engine.market_insights(&area);
            if cli.json {
                return print_json(&insight);
            }
            match insight {
                Some(i) => println!(
                    "  {} ({}): growth={:.1}% size={} competition={} heat={} support={} risk={}",
                    i.area,
                    i.year,
                    i.growth_rate * 100.0,
                    i.market_size,
                    i.competition,
                    i.investment_heat,
                    i.government_support,
                    i.risk
                ),
                None => println!("No market data for \"{area}\"."),
            }
        }

        Commands::Growth => {
            let rows = engine.growth_comparison();
            if cli.json {
                return print_json(&rows);
            }
            for r in &rows {
                println!(
                    "  {} patents={:.1}% market={:.1}% combined={:.1}",
                    r.area, r.patent_growth, r.market_growth, r.combined
                );
            }
        }

        Commands::Match {
            risk_appetite,
            min_quality,
            min_market_size,
            max_competition,
            areas,
        } => {
            let prefs = InvestorPreferences {
                risk_appetite,
                min_quality,
                min_market_size,
                max_competition,
                preferred_areas: areas.into_iter().map(Into::into).collect(),
            };
            let matches = engine.match_preferences(&prefs);
            if cli.json {
                return print_json(&matches);
            }
            for m in &matches {
                println!(
                    "  {} match={:.1}% score={:.1} -> {}",
                    m.opportunity.area,
                    m.match_percent,
                    m.opportunity.score,
                    m.sizing.description()
                );
            }
        }

        Commands::Daemon { max_cycles } => {
            let source = Arc::new(config.synthetic.build());
            let coordinator = Arc::new(RefreshCoordinator::with_interval(
                Arc::new(engine),
                source,
                config.refresh_interval(),
            ));
            let daemon_config = DaemonConfig {
                max_cycles,
                ..config.daemon_config()
            };
            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            let report = runtime.block_on(RefreshDaemon::new(Arc::clone(&coordinator), daemon_config).run());
            if cli.json {
                return print_json(&coordinator.refresh_status());
            }
            println!(
                "Daemon stopped after {} cycles ({} completed, {} skipped, {} failed).",
                report.cycles, report.completed, report.skipped, report.failed
            );
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn load_tables(dir: &Path) -> Result<(Vec<PatentRecord>, Vec<MarketSnapshot>, Vec<InvestorProfile>)> {
    let patents = read_json(&dir.join("patents.json"))?;
    let market = read_optional_json(&dir.join("market.json"))?;
    let investors = read_optional_json(&dir.join("investors.json"))?;
    Ok((patents, market, investors))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

/// Market and investor tables may be absent.
fn read_optional_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if path.exists() {
        read_json(path)
    } else {
        Ok(Vec::new())
    }
}
