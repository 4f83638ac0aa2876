//! Binary entrypoint for the hammerkit CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and the settings database
//! - `status [--json]` - print the saved selection, option list, and store catalog
//! - `demo` - scripted walkthrough: strikes, a purchase, a cross-device grant, a refund
//! - `buy <product-id>` - run the purchase flow for one product
//! - `select [--head N] [--handle N]` - pick and save hammer colors
//!
//! See the library crate docs for module-level details: `hammerkit::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Duration};

use hammerkit::config::Config;
use hammerkit::cosmetics::{CosmeticsService, Palette};
use hammerkit::game::{GameEvent, GameSession, HammerModel};
use hammerkit::storage::SettingsStore;
use hammerkit::store::{
    start_store, EntitlementSet, ProductCatalog, PurchaseOutcome, SandboxCommerce,
    SandboxController, StoreEvent, StoreHandle,
};

#[derive(Parser)]
#[command(name = "hammerkit")]
#[command(about = "Cosmetic customization core for a hammer-and-nails game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration and settings database
    Init,
    /// Show the saved selection, available colors, and store catalog
    Status {
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run a scripted walkthrough of the whole customization flow
    Demo,
    /// Purchase a color from the store
    Buy {
        /// Product id from the catalog (see `status`)
        product_id: String,
    },
    /// Pick hammer colors by option index and save them
    Select {
        /// Option index for the head
        #[arg(long)]
        head: Option<usize>,
        /// Option index for the handle
        #[arg(long)]
        handle: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes the default later)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };

    match &cli.command {
        Commands::Init => {
            // Init doesn't have config yet
        }
        _ => {
            init_logging(&pre_config, cli.verbose);
        }
    }

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing a new hammerkit configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let cfg = Config::default();
            let settings = SettingsStore::open(cfg.settings_db_path())?;
            settings.flush()?;
            info!(
                "Settings database created at {}",
                cfg.settings_db_path().display()
            );
        }
        Commands::Status { json } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let rt = open_runtime(&config).await?;
            show_status(&rt, json).await?;
            rt.store.shutdown().await?;
        }
        Commands::Demo => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            info!("Starting hammerkit v{}", env!("CARGO_PKG_VERSION"));
            let rt = open_runtime(&config).await?;
            run_demo(rt, &config).await?;
        }
        Commands::Buy { product_id } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let rt = open_runtime(&config).await?;
            let result = rt.store.purchase(&product_id).await;
            rt.store.shutdown().await?;
            match result {
                Ok(PurchaseOutcome::Granted(receipt)) => {
                    println!(
                        "Purchase verified: {} is yours (receipt {}).",
                        receipt.product_id, receipt.transaction_id
                    );
                }
                Ok(PurchaseOutcome::Cancelled) => println!("Purchase cancelled; nothing changed."),
                Ok(PurchaseOutcome::Pending) => {
                    println!("Purchase pending; the grant may still arrive later.")
                }
                Ok(PurchaseOutcome::Unknown) => {
                    println!("Purchase ended with an unrecognized outcome; nothing changed.")
                }
                Err(err) => {
                    eprintln!("Purchase failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Select { head, handle } => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let mut rt = open_runtime(&config).await?;

            let resolved = rt.service.resolved_colors();
            let mut live = HammerModel::new(resolved.head, resolved.handle);
            let mut session = rt.service.open_session(&live);
            if let Some(index) = head {
                rt.service.select_head(&mut session, index)?;
            }
            if let Some(index) = handle {
                rt.service.select_handle(&mut session, index)?;
            }
            let report = rt.service.commit_session(session, &mut live)?;
            let selection = rt.service.selection();
            println!(
                "Saved: head {} ({}) / handle {} ({})",
                selection.head, report.head, selection.handle, report.handle
            );
            rt.store.shutdown().await?;
            rt.settings.flush()?;
        }
    }

    Ok(())
}

/// Everything a command needs: the settings database, the running store
/// service, the sandbox controls, and the customization service.
struct Runtime {
    settings: SettingsStore,
    store: StoreHandle,
    controller: SandboxController,
    service: CosmeticsService,
}

async fn open_runtime(config: &Config) -> Result<Runtime> {
    let settings = SettingsStore::open(config.settings_db_path())?;
    let catalog = ProductCatalog::standard();

    // Seed the sandbox platform side from the cache plus any configured
    // extras, so a fresh provider doesn't wipe purchases from earlier runs.
    let mut seeded = match settings.load_entitlements() {
        Ok(Some(cached)) => cached,
        Ok(None) => EntitlementSet::new(),
        Err(err) => {
            warn!("entitlement cache unreadable, seeding the sandbox empty: {err}");
            EntitlementSet::new()
        }
    };
    for id in &config.store.sandbox_owned {
        if catalog.contains(id) {
            seeded.insert(id.clone());
        } else {
            warn!("ignoring unknown product id in store.sandbox_owned: {id}");
        }
    }

    let provider = SandboxCommerce::with_owned(&catalog, seeded);
    let controller = provider.controller();
    let store = start_store(provider, settings.clone(), catalog.clone());

    let owned = store.entitlements().await?;
    let service = CosmeticsService::new(Palette::standard(), catalog, settings.clone(), owned);
    Ok(Runtime {
        settings,
        store,
        controller,
        service,
    })
}

async fn show_status(rt: &Runtime, json: bool) -> Result<()> {
    let owned = rt.store.entitlements().await?;
    let products = match rt.store.products().await {
        Ok(list) => list,
        Err(err) => {
            warn!("product metadata unavailable: {err}");
            Vec::new()
        }
    };
    let selection = rt.service.selection();
    let resolved = rt.service.resolved_colors();
    let mut owned_ids: Vec<String> = owned.iter().cloned().collect();
    owned_ids.sort();

    if json {
        let payload = serde_json::json!({
            "selection": { "head": selection.head, "handle": selection.handle },
            "colors": {
                "head": resolved.head.to_string(),
                "handle": resolved.handle.to_string(),
                "fallback": resolved.fallback,
            },
            "option_count": rt.service.options().len(),
            "owned": owned_ids,
            "products": products.iter().map(|p| serde_json::json!({
                "product_id": p.product_id,
                "display_name": p.display_name,
                "price": p.price,
                "owned": owned.contains(&p.product_id),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Selection: head {} / handle {}", selection.head, selection.handle);
        let fallback_note = if resolved.fallback { " (fallback)" } else { "" };
        println!(
            "Colors:    {} / {}{}",
            resolved.head, resolved.handle, fallback_note
        );
        println!("Options:   {} colors", rt.service.options().len());
        if owned_ids.is_empty() {
            println!("Owned:     nothing yet");
        } else {
            println!("Owned:     {}", owned_ids.join(", "));
        }
        if !products.is_empty() {
            println!("Store:");
            for product in &products {
                let tag = if owned.contains(&product.product_id) {
                    "owned".to_string()
                } else {
                    product.price.clone()
                };
                println!(
                    "  {:<6} {:<14} {}",
                    product.product_id, product.display_name, tag
                );
            }
        }
    }
    Ok(())
}

async fn run_demo(mut rt: Runtime, config: &Config) -> Result<()> {
    let resolved = rt.service.resolved_colors();
    let mut game = GameSession::new(HammerModel::new(resolved.head, resolved.handle));
    let mut store_events = rt.store.subscribe();

    println!("Hammering a few nails:");
    let interval = Duration::from_millis(config.game.auto_hammer_interval_ms);
    let mut game_events = game.subscribe();
    for _ in 0..5 {
        game.strike();
        sleep(interval).await;
    }
    while let Ok(GameEvent::NailsHammered(total)) = game_events.try_recv() {
        println!("  nail {total} is in");
    }

    let owned = rt.store.entitlements().await?;
    if owned.contains("ht1") {
        println!("ht1 already owned; skipping the purchase step.");
    } else {
        println!("Buying ht1 (Teal):");
        match rt.store.purchase("ht1").await? {
            PurchaseOutcome::Granted(receipt) => {
                println!("  verified, receipt {}", receipt.transaction_id)
            }
            other => println!("  finished without a grant: {other:?}"),
        }
        wait_for_change(&mut store_events).await;
        resync(&mut rt, &mut game).await?;
    }

    let owned = rt.store.entitlements().await?;
    if owned.contains("hw1") {
        println!("hw1 already owned; redelivering its grant to show duplicates are ignored.");
        rt.controller.redeliver_grant("hw1");
        match timeout(Duration::from_millis(300), store_events.recv()).await {
            Ok(_) => warn!("unexpected change notification after a duplicate delivery"),
            Err(_) => println!("  no change notification, as expected"),
        }
    } else {
        println!("A grant for hw1 (Watermelon) arrives from another device:");
        rt.controller.grant("hw1").await;
        wait_for_change(&mut store_events).await;
        resync(&mut rt, &mut game).await?;
    }

    println!("Customizing (the live hammer stays put until commit):");
    let mut session = rt.service.open_session(game.hammer());
    let last = rt.service.options().len() - 1;
    let preview = rt.service.select_head(&mut session, last)?;
    println!("  preview head: {}", preview.head);
    println!("  live head:    {}", game.hammer().head_color());
    let committed = rt.service.commit_session(session, game.hammer_mut())?;
    println!(
        "  committed and saved: head {} / handle {}",
        committed.head, committed.handle
    );

    println!("A refund revokes ht1:");
    rt.controller.revoke("ht1").await;
    wait_for_change(&mut store_events).await;
    let before = rt.service.selection();
    resync(&mut rt, &mut game).await?;
    let after = rt.service.selection();
    if before != after {
        println!(
            "  selection repaired: head {} / handle {} -> head {} / handle {}",
            before.head, before.handle, after.head, after.handle
        );
    }
    println!(
        "  live hammer is now {} / {}",
        game.hammer().head_color(),
        game.hammer().handle_color()
    );

    rt.store.shutdown().await?;
    rt.settings.flush()?;
    println!("Demo complete.");
    Ok(())
}

/// Applies the latest entitlement snapshot to the customization service and
/// the live hammer.
async fn resync(rt: &mut Runtime, game: &mut GameSession) -> Result<()> {
    let owned = rt.store.entitlements().await?;
    let sync = rt.service.sync_entitlements(owned, game.hammer_mut(), None);
    if sync.options_changed {
        println!("  option set now has {} colors", rt.service.options().len());
    }
    Ok(())
}

async fn wait_for_change(events: &mut broadcast::Receiver<StoreEvent>) {
    match timeout(Duration::from_secs(1), events.recv()).await {
        Ok(Ok(StoreEvent::EntitlementsChanged)) => {}
        Ok(Err(err)) => warn!("store event stream hiccup: {err}"),
        Err(_) => warn!("timed out waiting for a change notification"),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                let write_mutex = mutex.clone();

                // When stdout is a terminal, mirror log lines to it as well
                let is_tty = atty::is(atty::Stream::Stdout);

                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());

                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }

                    if is_tty {
                        writeln!(fmt, "{}", line)
                    } else {
                        Ok(())
                    }
                });
            } else {
                builder.format(|fmt, record| {
                    writeln!(
                        fmt,
                        "{} [{}] {}",
                        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                        record.level(),
                        record.args()
                    )
                });
            }
        } else {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
