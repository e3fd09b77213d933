use clap::{Arg, Command};
use log::LevelFilter;
use mailwarden::config::Config;
use mailwarden::pipeline::TriagePipeline;
use mailwarden::quarantine::{QuarantineManager, Transition};
use mailwarden::report;
use mailwarden::scanner::{should_quarantine, ScanEngine};
use mailwarden::store::{MonitorRegistry, ScanStore, SqliteStore};
use mailwarden::types::{AddressStatus, EmailCandidate, ScanRecord};
use std::process;
use uuid::Uuid;

fn main() {
    let matches = Command::new("mailwarden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Email threat triage: keyword-rule scanning with a quarantine lifecycle")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("mailwarden.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("owner")
                .long("owner")
                .value_name("ID")
                .help("Owner scope for addresses and scans (default from config)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .value_name("ADDRESS")
                .help("Register an email address for monitoring")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("activate")
                .long("activate")
                .value_name("ADDRESS")
                .help("Re-activate monitoring for an address")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("deactivate")
                .long("deactivate")
                .value_name("ADDRESS")
                .help("Deactivate monitoring for an address")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("list-monitored")
                .long("list-monitored")
                .help("List monitored addresses with threat counts")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .value_name("ADDRESS")
                .help("Run the simulated ingestion batch against a monitored address")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("list-scans")
                .long("list-scans")
                .help("List scan records, newest received first")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-quarantine")
                .long("list-quarantine")
                .help("List quarantined scan records")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quarantine")
                .long("quarantine")
                .value_name("ID")
                .help("Quarantine an active scan record (manual escalation)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("release")
                .long("release")
                .value_name("ID")
                .help("Release a quarantined scan record back to the inbox view")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("delete")
                .long("delete")
                .value_name("ID")
                .help("Permanently delete a scan record")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show scan and quarantine statistics")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("scan-file")
                .long("scan-file")
                .value_name("FILE")
                .help("Classify an email file without storing the result")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Machine-readable output for list and stats commands")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match Config::default().save(path) {
            Ok(()) => println!("Generated default configuration at {path}"),
            Err(e) => {
                eprintln!("Error generating configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        match config.validate() {
            Ok(()) => {
                println!("✅ Configuration valid: {} rules", config.rules.len());
                for (i, rule) in config.rules.iter().enumerate() {
                    println!(
                        "  Rule {}: {} ({}) - {} keywords",
                        i + 1,
                        rule.category.as_str(),
                        rule.risk_level.as_str(),
                        rule.keywords.len()
                    );
                }
            }
            Err(e) => {
                println!("❌ Configuration invalid: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let engine = ScanEngine::new(&config);

    if let Some(path) = matches.get_one::<String>("scan-file") {
        if let Err(e) = scan_file(&engine, path) {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
        return;
    }

    let store = match SqliteStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening scan database {}: {e}", config.database_path);
            process::exit(1);
        }
    };

    let owner = matches
        .get_one::<String>("owner")
        .cloned()
        .unwrap_or_else(|| config.default_owner.clone());
    let json = matches.get_flag("json");

    let result = if let Some(address) = matches.get_one::<String>("monitor") {
        monitor_address(&store, &owner, address)
    } else if let Some(address) = matches.get_one::<String>("activate") {
        toggle_address(&store, &owner, address, AddressStatus::Active)
    } else if let Some(address) = matches.get_one::<String>("deactivate") {
        toggle_address(&store, &owner, address, AddressStatus::Inactive)
    } else if matches.get_flag("list-monitored") {
        list_monitored(&store, &owner, json)
    } else if let Some(address) = matches.get_one::<String>("simulate") {
        simulate(&store, &engine, &owner, address, json)
    } else if matches.get_flag("list-scans") {
        list_scans(&store, &owner, json, false)
    } else if matches.get_flag("list-quarantine") {
        list_scans(&store, &owner, json, true)
    } else if let Some(id) = matches.get_one::<String>("quarantine") {
        lifecycle_op(&store, id, LifecycleOp::Quarantine)
    } else if let Some(id) = matches.get_one::<String>("release") {
        lifecycle_op(&store, id, LifecycleOp::Release)
    } else if let Some(id) = matches.get_one::<String>("delete") {
        lifecycle_op(&store, id, LifecycleOp::Delete)
    } else if matches.get_flag("stats") {
        stats(&store, &owner, json)
    } else {
        println!("Nothing to do. Try --help for the list of commands.");
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn monitor_address(store: &SqliteStore, owner: &str, address: &str) -> anyhow::Result<()> {
    let monitored = store.register(owner, address)?;
    println!("✅ Now monitoring {} (id {})", monitored.address, monitored.id);
    Ok(())
}

fn toggle_address(
    store: &SqliteStore,
    owner: &str,
    address: &str,
    status: AddressStatus,
) -> anyhow::Result<()> {
    let monitored = store
        .list_addresses(owner)?
        .into_iter()
        .find(|a| a.address == address)
        .ok_or_else(|| anyhow::anyhow!("{address} is not monitored for owner {owner}"))?;
    let updated = store.set_status(monitored.id, status)?;
    println!("{} is now {}", updated.address, updated.status.as_str());
    Ok(())
}

fn list_monitored(store: &SqliteStore, owner: &str, json: bool) -> anyhow::Result<()> {
    let stats = report::address_stats(store, store, owner)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if stats.is_empty() {
        println!("No monitored addresses for owner {owner}");
        return Ok(());
    }
    for entry in stats {
        let last_scan = entry
            .last_scan
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<40} {:<8} threats: {:<4} last scan: {}",
            entry.address,
            entry.status.as_str(),
            entry.threat_count,
            last_scan
        );
    }
    Ok(())
}

fn simulate(
    store: &SqliteStore,
    engine: &ScanEngine,
    owner: &str,
    address: &str,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = TriagePipeline::new(store, store, engine);
    let batch_report = pipeline.simulate(owner, address)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&batch_report)?);
    } else {
        println!(
            "Simulation complete: {} processed, {} skipped, {} failed",
            batch_report.processed, batch_report.skipped, batch_report.failed
        );
        for failure in &batch_report.failures {
            println!("  ❌ {}: {}", failure.message_id, failure.reason);
        }
    }
    Ok(())
}

fn print_record(record: &ScanRecord) {
    println!(
        "{}  {:<10} {:<8} {} {} -> {}  {}",
        record.id,
        record.scan_result.as_str(),
        record.risk_level.as_str(),
        if record.is_quarantined { "[Q]" } else { "   " },
        record.sender,
        record.recipient,
        record.subject
    );
}

fn list_scans(store: &SqliteStore, owner: &str, json: bool, quarantined_only: bool) -> anyhow::Result<()> {
    let mut records = store.list_scans(owner)?;
    if quarantined_only {
        records.retain(|r| r.is_quarantined);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!(
            "No {} for owner {owner}",
            if quarantined_only {
                "quarantined records"
            } else {
                "scan records"
            }
        );
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

enum LifecycleOp {
    Quarantine,
    Release,
    Delete,
}

fn lifecycle_op(store: &SqliteStore, id: &str, op: LifecycleOp) -> anyhow::Result<()> {
    let id = Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("{id} is not a valid record id"))?;
    let manager = QuarantineManager::new(store);
    match op {
        LifecycleOp::Quarantine => match manager.quarantine(id)? {
            Transition::Applied(record) => {
                println!("✅ Quarantined {} ({})", record.id, record.subject)
            }
            Transition::NoOp(record) => {
                println!("Record {} is already quarantined", record.id)
            }
        },
        LifecycleOp::Release => match manager.release(id)? {
            Transition::Applied(record) => {
                println!("✅ Released {} ({})", record.id, record.subject)
            }
            Transition::NoOp(record) => {
                println!("Record {} is not quarantined", record.id)
            }
        },
        LifecycleOp::Delete => {
            let record = manager.delete(id)?;
            println!("✅ Deleted {} ({})", record.id, record.subject);
        }
    }
    Ok(())
}

fn stats(store: &SqliteStore, owner: &str, json: bool) -> anyhow::Result<()> {
    let summary = report::owner_summary(store, store, owner)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("📊 Mailwarden statistics for owner {owner}");
    println!("  Monitored addresses: {}", summary.monitored_addresses);
    println!("  Total scans:         {}", summary.total_scans);
    println!("  Threats detected:    {}", summary.threats_detected);
    println!("  In quarantine:       {}", summary.quarantined);
    if !summary.by_category.is_empty() {
        println!("  By category:");
        for (category, count) in &summary.by_category {
            println!("    {category:<12} {count}");
        }
    }
    Ok(())
}

/// Classify a raw email file (headers, blank line, body) without touching the
/// store. Debugging affordance; the verdict is printed, nothing is persisted.
fn scan_file(engine: &ScanEngine, path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;

    let mut sender = String::new();
    let mut recipient = String::new();
    let mut subject = String::new();
    let mut body = String::new();
    let mut in_body = false;
    for line in raw.lines() {
        if in_body {
            body.push_str(line);
            body.push('\n');
            continue;
        }
        if line.trim().is_empty() {
            in_body = true;
            continue;
        }
        if let Some(value) = line.strip_prefix("Subject:") {
            subject = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("From:") {
            sender = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("To:") {
            recipient = value.trim().to_string();
        }
    }

    let candidate = EmailCandidate {
        message_id: format!("file:{path}"),
        sender,
        recipient,
        subject,
        content: body,
        received_at: chrono::Utc::now(),
    };
    let verdict = engine.classify(&candidate);
    let quarantine = should_quarantine(verdict.scan_result, verdict.risk_level);

    println!("Subject:    {}", candidate.subject);
    println!("Result:     {}", verdict.scan_result.as_str());
    println!("Risk:       {}", verdict.risk_level.as_str());
    println!("Quarantine: {}", if quarantine { "yes" } else { "no" });
    if let Some(details) = verdict.threat_details {
        println!(
            "Indicators: {} ({})",
            details.indicators.join(", "),
            details.threat_type
        );
    }
    Ok(())
}
