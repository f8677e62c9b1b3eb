use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use encounter_gen::config::AppConfig;
use encounter_gen::core::admin::{AdminClient, CreatureFilter};
use encounter_gen::core::campaigns::CampaignsHook;
use encounter_gen::core::encounter::{
    magic_items_tab, ChallengeRating, Difficulty, EncounterRequest, EncounterService,
};
use encounter_gen::core::environments::EnvironmentsHook;
use encounter_gen::core::gateway::{Gateway, HttpGateway, RemoteResult};
use encounter_gen::core::resource::{ResourceHook, ResourceSource, SystemClock};
use encounter_gen::core::sessions::SessionsHook;
use encounter_gen::core::workspace::Workspace;

#[derive(Parser)]
#[command(
    name = "encounter-gen",
    version,
    about = "Encounter generator client and edge-function debugger"
)]
struct Cli {
    /// Project URL (overrides config and SUPABASE_URL)
    #[arg(long, global = true)]
    url: Option<String>,
    /// API key (overrides config and SUPABASE_ANON_KEY)
    #[arg(long, global = true)]
    key: Option<String>,
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call any edge function and print the normalized result
    Invoke {
        operation: String,
        /// JSON request body
        #[arg(long)]
        payload: Option<String>,
    },
    /// List environments (falls back to the configured defaults)
    Environments,
    /// List campaigns
    Campaigns {
        #[arg(long)]
        search: Option<String>,
    },
    /// List sessions, optionally for one campaign
    Sessions {
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Query the creature database
    Creatures {
        #[arg(long)]
        environment: Option<String>,
        #[arg(long)]
        min_cr: Option<ChallengeRating>,
        #[arg(long)]
        max_cr: Option<ChallengeRating>,
        #[arg(long = "type")]
        creature_type: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Generate an encounter
    Encounter {
        #[arg(long, default_value = "Any")]
        environment: String,
        #[arg(long, default_value = "0")]
        min_cr: ChallengeRating,
        #[arg(long, default_value = "30")]
        max_cr: ChallengeRating,
        #[arg(long, default_value_t = 4)]
        party_size: u8,
        #[arg(long, default_value_t = 1)]
        party_level: u8,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        /// Restrict to creature types (repeatable)
        #[arg(long = "type")]
        creature_types: Vec<String>,
    },
    /// List Notion databases visible to the integration
    Discover,
    /// Show a Notion database schema
    Schema { database_id: String },
    /// Normalize creature alignments (dry run unless --apply)
    FixAlignments {
        #[arg(long)]
        apply: bool,
    },
    /// Normalize creature types (dry run unless --apply)
    FixCreatureTypes {
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = AppConfig::load();
    if let Some(url) = cli.url {
        config.gateway.base_url = Some(url);
    }
    if let Some(key) = cli.key {
        config.gateway.api_key = Some(key);
    }
    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());

    let _log_guard = match &config.logging.log_dir {
        Some(dir) => Some(encounter_gen::core::logging::init(dir, &level)),
        None => {
            encounter_gen::core::logging::init_cli(&level);
            None
        }
    };
    if let Some(e) = config_error {
        log::warn!("{e}, using defaults");
    }
    log::info!("{} v{} starting", encounter_gen::NAME, encounter_gen::VERSION);

    let gateway: Arc<dyn Gateway> = Arc::new(
        HttpGateway::from_config(&config.gateway)
            .context("set gateway.base_url in the config file, SUPABASE_URL or --url")?,
    );
    let debounce = config.loader.search_debounce();
    let poll = config.loader.poll_interval();

    let success = match cli.command {
        Command::Invoke { operation, payload } => {
            let payload = payload
                .map(|p| serde_json::from_str::<Value>(&p))
                .transpose()
                .context("--payload is not valid JSON")?;
            print_result(&gateway.invoke(&operation, payload).await)?
        }

        Command::Environments => {
            let mut hook = EnvironmentsHook::environments(
                gateway,
                Arc::new(SystemClock),
                &config.defaults.environments,
                debounce,
            );
            let success = print_hook(&mut hook, None, poll).await?;
            if hook.state().is_using_defaults {
                eprintln!("(backend returned nothing usable, showing defaults)");
            }
            eprintln!("options: {}", hook.options().join(", "));
            success
        }

        Command::Campaigns { search } => {
            let mut hook = CampaignsHook::campaigns(gateway, Arc::new(SystemClock), debounce);
            print_hook(&mut hook, search, poll).await?
        }

        Command::Sessions { campaign, search } => {
            let mut hook =
                SessionsHook::sessions(gateway, Arc::new(SystemClock), campaign, debounce);
            print_hook(&mut hook, search, poll).await?
        }

        Command::Creatures {
            environment,
            min_cr,
            max_cr,
            creature_type,
            search,
            limit,
        } => {
            let filter = CreatureFilter {
                environment,
                min_cr,
                max_cr,
                creature_type,
                search,
                limit,
            };
            print_result(&AdminClient::new(gateway).fetch_creatures(&filter).await)?
        }

        Command::Encounter {
            environment,
            min_cr,
            max_cr,
            party_size,
            party_level,
            difficulty,
            creature_types,
        } => {
            let request = EncounterRequest::new(party_size, party_level)
                .with_environment(environment)
                .with_cr_range(min_cr, max_cr)
                .with_difficulty(difficulty)
                .with_creature_types(creature_types);

            let mut workspace = Workspace::new();
            let tab = EncounterService::new(gateway).generate(&request).await;
            let loot = magic_items_tab(&tab);
            workspace.add_tab(tab)?;
            if let Some(loot) = loot {
                workspace.add_tab(loot)?;
            }

            print_json(&workspace.list())?;
            workspace.list().iter().all(|t| !t.is_error())
        }

        Command::Discover => print_result(&AdminClient::new(gateway).discover_databases().await)?,

        Command::Schema { database_id } => {
            print_result(&AdminClient::new(gateway).database_schema(&database_id).await)?
        }

        Command::FixAlignments { apply } => {
            print_result(&AdminClient::new(gateway).fix_alignments(!apply).await)?
        }

        Command::FixCreatureTypes { apply } => {
            print_result(&AdminClient::new(gateway).fix_creature_types(!apply).await)?
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Load a resource list to completion and print its state.
async fn print_hook<S>(
    hook: &mut ResourceHook<S>,
    search: Option<String>,
    poll: Duration,
) -> anyhow::Result<bool>
where
    S: ResourceSource,
    S::Item: Serialize,
{
    if let Some(search) = search {
        hook.set_search_query(search);
    }
    hook.mount();
    tokio::time::timeout(Duration::from_secs(120), hook.settle(poll))
        .await
        .context("timed out waiting for the backend")?;

    let state = hook.state();
    if let Some(error) = &state.error {
        eprintln!("error: {error}");
    }
    print_json(&state.items)?;
    Ok(state.error.is_none())
}

fn print_result(result: &RemoteResult<Value>) -> anyhow::Result<bool> {
    print_json(result)?;
    Ok(result.is_success())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
