mod calc;
mod config;
mod db;
mod logging;
mod models;
mod receipts;
mod run;
mod share;
mod thumbnail;
mod ui;

use anyhow::Result;

const DB_FILE: &str = "junkyard.db";
const OBJECTS_DIR: &str = "objects";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_dir = config::data_dir()?;
    if let Err(e) = logging::init(&data_dir) {
        eprintln!("Logging disabled: {e:#}");
    }

    let config = config::Config::load(&data_dir)?;
    let mut db = db::Database::open(&data_dir.join(DB_FILE))?;
    let store = receipts::FsObjectStore::open(&data_dir.join(OBJECTS_DIR))?;
    let parser = receipts::parser_from_command(config.receipt_parser.as_deref())?;

    // leftovers of sessions that never finished
    match receipts::sweep(&db, &store, config.pending_max_age(), chrono::Utc::now()) {
        Ok(report) if !report.is_clean() => tracing::info!(?report, "start-up sweep"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "start-up sweep failed"),
    }

    let services = run::Services {
        config,
        store: Box::new(store),
        parser,
    };

    match args.len() {
        1 => run::as_tui(&mut db, services),
        _ => run::as_cli(&args, &mut db, &services),
    }
}
