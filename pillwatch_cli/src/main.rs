use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pillwatch_core::*;
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "pillwatch")]
#[command(about = "Pill inventory tracker with low-stock reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Evaluate as if the current time were this RFC 3339 instant
    #[arg(long, global = true)]
    at: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new medicine
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Starting pill count
        #[arg(long)]
        quantity: i64,

        /// Pills consumed per day
        #[arg(long)]
        dosage: i64,
    },

    /// List all medicines with derived stock (default)
    List,

    /// Show one medicine in detail
    Show {
        /// Medicine id or exact name
        medicine: String,
    },

    /// Refill a medicine, resetting its depletion clock
    Restock {
        /// Medicine id or exact name
        medicine: String,

        /// New pill count
        #[arg(long)]
        quantity: i64,
    },

    /// Pause low-stock alerts for a medicine
    Snooze {
        /// Medicine id or exact name
        medicine: String,

        /// Snooze length, overriding the configured duration
        #[arg(long)]
        minutes: Option<i64>,
    },

    /// Remove a medicine permanently
    Delete {
        /// Medicine id or exact name
        medicine: String,
    },

    /// Run one evaluation pass over all medicines
    Sweep,

    /// Run the recurring sweep loop until interrupted
    Watch {
        /// Minutes between sweeps, overriding the configured interval
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    pillwatch_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;

    let at = parse_at(cli.at.as_deref())?;
    let store = FileStore::open(&data_dir);

    match cli.command {
        Some(Commands::Add {
            name,
            quantity,
            dosage,
        }) => cmd_add(&store, name, quantity, dosage, now_or(at)),
        Some(Commands::Show { medicine }) => cmd_show(&store, &medicine, now_or(at), &config),
        Some(Commands::Restock { medicine, quantity }) => {
            cmd_restock(&store, &medicine, quantity, now_or(at))
        }
        Some(Commands::Snooze { medicine, minutes }) => {
            cmd_snooze(&store, &medicine, minutes, now_or(at), &config)
        }
        Some(Commands::Delete { medicine }) => cmd_delete(&store, &medicine),
        Some(Commands::Sweep) => cmd_sweep(store, &data_dir, now_or(at), &config),
        Some(Commands::Watch { interval_minutes }) => {
            if at.is_some() {
                return Err(Error::InvalidInput(
                    "--at cannot be combined with watch".into(),
                ));
            }
            cmd_watch(store, &data_dir, interval_minutes, &config)
        }
        Some(Commands::List) | None => cmd_list(&store, now_or(at), &config),
    }
}

/// Parse the global --at override
fn parse_at(at: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match at {
        None => Ok(None),
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                Error::InvalidInput(format!("invalid --at timestamp '{}': {}", s, e))
            })?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
    }
}

fn now_or(at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    at.unwrap_or_else(Utc::now)
}

/// Look up a record by UUID or exact name
fn resolve_medicine(store: &FileStore, key: &str) -> Result<MedicineRecord> {
    if let Ok(id) = uuid::Uuid::parse_str(key) {
        if let Some(record) = store.find_by_id(id)? {
            return Ok(record);
        }
    }

    let mut matches: Vec<MedicineRecord> = store
        .find_all()?
        .into_iter()
        .filter(|r| r.name == key)
        .collect();

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(Error::NotFound(format!("no medicine matching '{}'", key))),
        _ => Err(Error::InvalidInput(format!(
            "multiple medicines named '{}'; use the id instead",
            key
        ))),
    }
}

fn cmd_add(
    store: &FileStore,
    name: String,
    quantity: i64,
    dosage: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let record = store.create(
        NewMedicine {
            name,
            total_quantity: quantity,
            dosage_per_day: dosage,
        },
        now,
    )?;

    let level = evaluate(&record, now);
    println!(
        "✓ Added {} ({} pill(s), about {} day(s) of supply)",
        record.name, level.current_stock, level.days_left
    );
    println!("  Id: {}", record.id);
    Ok(())
}

fn cmd_list(store: &FileStore, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let mut records = store.find_all()?;
    if records.is_empty() {
        println!("No medicines tracked. Add one with 'pillwatch add'.");
        return Ok(());
    }
    records.sort_by(|a, b| a.name.cmp(&b.name));

    println!(
        "{:<20} {:>7} {:>10}  {:<14} {}",
        "NAME", "STOCK", "DAYS LEFT", "STATUS", "ID"
    );
    for record in &records {
        let level = evaluate(record, now);
        let status = policy::status(record, level, now, config.alerts.low_stock_threshold_days);
        println!(
            "{:<20} {:>7} {:>10}  {:<14} {}",
            record.name, level.current_stock, level.days_left, status, record.id
        );
    }
    Ok(())
}

fn cmd_show(store: &FileStore, medicine: &str, now: DateTime<Utc>, config: &Config) -> Result<()> {
    let record = resolve_medicine(store, medicine)?;
    let level = evaluate(&record, now);
    let status = policy::status(&record, level, now, config.alerts.low_stock_threshold_days);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", record.name);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Stock: {} pill(s), about {} day(s) of supply",
        level.current_stock, level.days_left
    );
    println!("  Dosage: {} per day", record.dosage_per_day);
    println!("  Status: {}", status);
    println!(
        "  Baseline: {}",
        stock::baseline_date(&record).format("%Y-%m-%d %H:%M UTC")
    );
    if let Some(until) = record.snoozed_until {
        println!("  Snoozed until: {}", until.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("  Added: {}", record.start_date.format("%Y-%m-%d %H:%M UTC"));
    println!("  Id: {}", record.id);
    Ok(())
}

fn cmd_restock(
    store: &FileStore,
    medicine: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let record = resolve_medicine(store, medicine)?;
    let update = restock(quantity, now)?;

    match store.update(record.id, &update)? {
        Some(updated) => {
            let level = evaluate(&updated, now);
            println!(
                "✓ Restocked {} to {} pill(s), about {} day(s) of supply",
                updated.name, level.current_stock, level.days_left
            );
            Ok(())
        }
        None => Err(Error::NotFound(format!(
            "medicine '{}' disappeared before the restock applied",
            record.name
        ))),
    }
}

fn cmd_snooze(
    store: &FileStore,
    medicine: &str,
    minutes: Option<i64>,
    now: DateTime<Utc>,
    config: &Config,
) -> Result<()> {
    let record = resolve_medicine(store, medicine)?;

    let duration = match minutes {
        Some(m) if m < 1 => {
            return Err(Error::InvalidInput(format!(
                "snooze minutes must be >= 1, got {}",
                m
            )))
        }
        Some(m) => chrono::Duration::minutes(m),
        None => config.alerts.snooze_duration(),
    };

    let update = policy::snooze(now, duration);
    match store.update(record.id, &update)? {
        Some(updated) => {
            println!(
                "✓ Alerts for {} snoozed until {}",
                updated.name,
                (now + duration).format("%Y-%m-%d %H:%M UTC")
            );
            Ok(())
        }
        None => Err(Error::NotFound(format!(
            "medicine '{}' disappeared before the snooze applied",
            record.name
        ))),
    }
}

fn cmd_delete(store: &FileStore, medicine: &str) -> Result<()> {
    let record = resolve_medicine(store, medicine)?;

    if store.delete(record.id)? {
        println!("✓ Deleted {}", record.name);
        Ok(())
    } else {
        Err(Error::NotFound(format!(
            "medicine '{}' was already deleted",
            record.name
        )))
    }
}

fn cmd_sweep(
    store: FileStore,
    data_dir: &std::path::Path,
    now: DateTime<Utc>,
    config: &Config,
) -> Result<()> {
    let notifier = OutboxNotifier::open(data_dir);
    let mut sweeper = Sweeper::new(store, notifier, FixedClock(now), &config.alerts);

    let report = sweeper.tick()?;

    println!("✓ Sweep complete");
    println!("  Evaluated: {}", report.evaluated);
    println!("  Alerts sent: {}", report.alerts_sent);
    println!("  Suppressed (snoozed): {}", report.suppressed);
    println!("  Delivery failures: {}", report.delivery_failures);
    Ok(())
}

fn cmd_watch(
    store: FileStore,
    data_dir: &std::path::Path,
    interval_minutes: Option<u64>,
    config: &Config,
) -> Result<()> {
    let interval = match interval_minutes {
        Some(minutes) => std::time::Duration::from_secs(minutes * 60),
        None => config.sweep.interval(),
    };

    let notifier = OutboxNotifier::open(data_dir);
    let mut sweeper = Sweeper::new(store, notifier, SystemClock, &config.alerts);

    println!(
        "Sweeping every {} minute(s). Press Ctrl-C to stop.",
        interval.as_secs() / 60
    );

    // Keep the sender alive so the loop only ends with the process
    let (_shutdown_tx, shutdown_rx) = mpsc::channel();
    sweeper.run(interval, shutdown_rx);
    Ok(())
}
