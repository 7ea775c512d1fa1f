use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valo_tracker::analytics::{profile, timeline};
use valo_tracker::config::AppConfig;
use valo_tracker::fetch::{FetcherConfig, MatchFetcher, MatchSource};
use valo_tracker::leaderboard::scheduler::Scheduler;
use valo_tracker::leaderboard::{
    AllowAll, DeliveryError, EngineConfig, LeaderboardEngine, RankingSink,
};
use valo_tracker::models::{parse_riot_id, RankedEntry};
use valo_tracker::storage::{JsonStateStore, StateStore};

#[derive(Parser)]
#[command(name = "valo-tracker")]
#[command(about = "Competitive match analytics and daily leaderboards")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the leaderboard schedule until interrupted
    Run,

    /// Recompute today's leaderboard once and exit
    Recompute,

    /// Distribute ranked views to all tenants once and exit
    Distribute,

    /// Show a player's aggregated profile
    Profile {
        /// Riot id (Name#Tag), alias, or linked external id
        target: String,

        /// Matches to aggregate over
        #[arg(long, default_value = "20")]
        size: usize,
    },

    /// Show the round timeline of one match
    Timeline {
        /// Match id
        match_id: String,

        /// Page number (3 rounds per page)
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Link an external account to a riot id
    Link {
        /// External account id
        external_id: String,

        /// Riot id (Name#Tag)
        riot_id: String,
    },

    /// Set a display alias for a linked identity
    SetAlias {
        /// Riot id (Name#Tag)
        riot_id: String,

        /// Alias shown in ranked views
        alias: String,
    },

    /// Register a tenant and bring it up to date
    AddTenant {
        /// Tenant id
        tenant_id: String,

        /// Destination handle for ranked views
        destination: String,
    },

    /// List configured tenants and tracked identities
    Status,
}

/// Prints ranked views to stdout.
struct StdoutSink;

#[async_trait]
impl RankingSink for StdoutSink {
    async fn deliver(
        &self,
        tenant_id: &str,
        destination: &str,
        day: NaiveDate,
        rankings: &[RankedEntry],
    ) -> Result<(), DeliveryError> {
        println!(
            "\n=== Leaderboard {} (tenant: {}, destination: {}) ===",
            day, tenant_id, destination
        );
        for entry in rankings {
            println!(
                "  {:>2}. {:<24} {:>5} pts  ({} wins, {} kills)",
                entry.rank, entry.label, entry.points, entry.wins, entry.kills
            );
        }
        Ok(())
    }
}

fn build_fetcher(config: &AppConfig) -> Result<MatchFetcher> {
    let base_url = url::Url::parse(&config.upstream.base_url)
        .with_context(|| format!("Invalid upstream.base_url: {}", config.upstream.base_url))?;
    let api_key = std::env::var(&config.upstream.api_key_env).ok();
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; upstream requests may be rejected",
            config.upstream.api_key_env
        );
    }

    let fetcher = MatchFetcher::new(FetcherConfig {
        base_url,
        region: config.upstream.region.clone(),
        api_key,
        timeout: Duration::from_secs(config.upstream.timeout_seconds),
        ..Default::default()
    })?;
    Ok(fetcher)
}

fn build_engine(config: &AppConfig, store: Arc<JsonStateStore>) -> Result<LeaderboardEngine> {
    let fetcher = build_fetcher(config)?;
    Ok(LeaderboardEngine::new(
        store,
        Arc::new(fetcher),
        EngineConfig {
            weights: config.scoring,
            window_size: config.upstream.window_size,
            top_n: config.top_n,
            fetch_delay: Duration::from_millis(config.upstream.request_delay_ms),
        },
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config.clone().into())
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting valo-tracker v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(JsonStateStore::new(config.data_dir.clone()));

    match cli.command {
        Commands::Run => {
            let engine = Arc::new(build_engine(&config, store)?);
            let scheduler = Scheduler::new(
                engine,
                Arc::new(AllowAll),
                Arc::new(StdoutSink),
                config.schedule,
            );
            scheduler.run().await;
        }
        Commands::Recompute => {
            let engine = build_engine(&config, store)?;
            let today = Local::now().date_naive();
            let report = engine.recompute(today).await?;

            println!("\n=== Recompute Results ===");
            println!("Day:        {}", today);
            println!("Refreshed:  {}", report.refreshed);
            println!("Kept stale: {}", report.kept_stale);
            println!("Day reset:  {}", report.day_reset);
        }
        Commands::Distribute => {
            let engine = build_engine(&config, store)?;
            let report = engine.distribute(&AllowAll, &StdoutSink).await?;

            println!("\n=== Distribution Results ===");
            println!("Delivered:     {}", report.delivered);
            println!("Skipped empty: {}", report.skipped_empty);
            println!("Failures:      {}", report.failures);
        }
        Commands::Profile { target, size } => {
            // Accept a raw riot id or anything the registry can resolve.
            let registry = store.load_identities()?;
            let (name, tag) = match registry.resolve(&target) {
                Some(identity) => (identity.name.clone(), identity.tag.clone()),
                None => parse_riot_id(&target)
                    .with_context(|| format!("Unknown player: {}", target))?,
            };

            let fetcher = build_fetcher(&config)?;
            let matches = fetcher.recent_matches(&name, &tag, size).await?;
            let summary = profile::summarize(&matches, &name, &tag);

            println!("\n=== Profile: {}#{} ===", name, tag);
            println!("Matches played:   {}", summary.matches_played);
            if let Some(agent) = &summary.top_agent {
                println!("Top agent:        {} ({} matches)", agent.name, agent.count);
            }
            if let Some(map) = &summary.top_map {
                println!("Top map:          {} ({} matches)", map.name, map.count);
            }
            if let Some(weapon) = &summary.top_weapon {
                println!("Top weapon:       {} ({} kills)", weapon.name, weapon.count);
            }
            if let Some(duo) = &summary.top_duo {
                println!("Top duo:          {} ({} matches)", duo.name, duo.count);
            }
            println!("KDA:              {:.2}", summary.kda);
            println!("Headshot %:       {}%", summary.headshot_pct);
            println!("Win rate:         {}%", summary.win_rate_pct);
            println!("Total kills:      {}", summary.total_kills);

            let breakdown = profile::agent_breakdown(&matches, &name, &tag);
            if !breakdown.is_empty() {
                println!("\nAgents:");
                for agent in &breakdown {
                    println!(
                        "  {:<14} {} played, {}/{}/{}, {} wins",
                        agent.agent, agent.played, agent.kills, agent.deaths, agent.assists,
                        agent.wins
                    );
                }
            }
        }
        Commands::Timeline { match_id, page } => {
            let fetcher = build_fetcher(&config)?;
            let record = fetcher.match_by_id(&match_id).await?;
            let rounds = timeline::reconstruct(&record);
            let view = timeline::paginate(&rounds, page);

            let map = record
                .metadata
                .as_ref()
                .map(|m| m.map.as_str())
                .unwrap_or("?");
            println!(
                "\n=== Timeline: {} on {} (page {}/{}) ===",
                match_id, map, view.page, view.total_pages
            );
            for round in &view.rounds {
                println!(
                    "\nRound {} — {} ({}-{})",
                    round.number,
                    round
                        .winner
                        .map(|w| format!("{} won", w))
                        .unwrap_or_else(|| "unknown".to_string()),
                    round.blue_score,
                    round.red_score
                );
                if let Some(fb) = &round.first_blood {
                    println!("  First blood: {} -> {} ({})", fb.killer, fb.victim, fb.weapon);
                }
                for kill in &round.kills {
                    println!(
                        "  [{:>6}ms] {} -> {} ({})",
                        kill.time_in_round, kill.killer, kill.victim, kill.weapon
                    );
                }
                if let Some(plant) = &round.plant {
                    println!(
                        "  Spike planted by {} ({})",
                        plant.player,
                        plant.site.as_deref().unwrap_or("?")
                    );
                }
                if let Some(defuse) = &round.defuse {
                    println!("  Spike defused by {}", defuse.player);
                }
            }
        }
        Commands::Link {
            external_id,
            riot_id,
        } => {
            let Some((name, tag)) = parse_riot_id(&riot_id) else {
                bail!("Invalid riot id (expected Name#Tag): {}", riot_id);
            };

            let mut registry = store.load_identities()?;
            let identity = registry.link(&external_id, &name, &tag);
            println!("Linked {} -> {}", external_id, identity.riot_id());
            store.save_identities(&registry)?;
        }
        Commands::SetAlias { riot_id, alias } => {
            let mut registry = store.load_identities()?;
            if !registry.set_alias(&riot_id, &alias) {
                bail!("No linked identity for {}", riot_id);
            }
            store.save_identities(&registry)?;
            println!("Alias for {} set to \"{}\"", riot_id, alias);
        }
        Commands::AddTenant {
            tenant_id,
            destination,
        } => {
            let engine = build_engine(&config, store)?;
            let today = Local::now().date_naive();
            let report = engine
                .register_tenant(&tenant_id, &destination, today, &AllowAll, &StdoutSink)
                .await?;

            println!("\nTenant {} registered -> {}", tenant_id, destination);
            if report.delivered == 0 && report.failures == 0 {
                println!("(no ranked entries yet for this tenant)");
            }
        }
        Commands::Status => {
            let snapshot = store.load_snapshot()?;
            let registry = store.load_identities()?;

            println!("=== Status ===");
            println!(
                "Day key:    {}",
                snapshot
                    .day_key
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!("Entries:    {}", snapshot.entries.len());
            println!("\nTenants ({}):", snapshot.tenants.len());
            for (id, tenant) in &snapshot.tenants {
                println!("  {} -> {}", id, tenant.destination);
            }
            println!("\nIdentities ({}):", registry.len());
            for (riot_id, identity) in registry.iter() {
                let alias = identity
                    .display_alias
                    .as_deref()
                    .map(|a| format!(" (alias: {})", a))
                    .unwrap_or_default();
                println!("  {} -> {}{}", riot_id, identity.linked_external_id, alias);
            }
        }
    }

    Ok(())
}
