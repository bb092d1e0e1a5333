use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::path::Path;

use super::{shellexpand, Services};
use crate::calc::{self, parse_amount};
use crate::db::Database;
use crate::models::{Category, Entry, Expense, ExpenseStatus, Period, RecurringExpense};
use crate::receipts::{self, ReceiptSession};
use crate::share::{self, ShareView};
use crate::thumbnail;
use crate::ui::util::format_amount;

pub(crate) fn as_cli(args: &[String], db: &mut Database, services: &Services) -> Result<()> {
    let rest = &args[2..];
    let money = |amount: Decimal| format_amount(amount, &services.config.currency_symbol);
    match args[1].as_str() {
        "period" => cli_period(rest, db),
        "categories" | "cats" => cli_categories(rest, db, &money),
        "entries" => cli_entries(rest, db, &money),
        "entry" => cli_entry(rest, db, &money),
        "recurring" => cli_recurring(rest, db, &money),
        "expense" => cli_expense(rest, db, &money),
        "receipt" => cli_receipt(rest, db, services, &money),
        "share" => cli_share(rest, db, services),
        "shared" => cli_shared(rest, db, &money),
        "thumb" => cli_thumb(rest),
        "calc" => cli_calc(rest),
        "sweep" => cli_sweep(db, services),
        "verify" => cli_verify(rest, db, &money),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("junkyard {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("theJunkyard - budget tracker, expense reports and small money tools");
    println!();
    println!("Usage: junkyard [command]");
    println!();
    println!("Commands:");
    println!("  (none)                                  Launch interactive TUI");
    println!("  period [YYYY-MM]                        Create a period (default: current month)");
    println!("  period list                             List periods");
    println!("  period delete <YYYY-MM>                 Delete a period with its categories");
    println!("  categories [YYYY-MM]                    Show categories with goals and totals");
    println!("  entries [YYYY-MM]                       List a period's entries");
    println!("  entry <category> <amount> <description> Add an entry");
    println!("    --date <YYYY-MM-DD>                   Entry date (default: today)");
    println!("  recurring [list]                        List recurring expenses");
    println!("  recurring add <day> <amount> <category> [description]");
    println!("  recurring pause|resume|delete <id>");
    println!("  expense add <amount> <vendor>           Record an expense");
    println!("    --date <YYYY-MM-DD>  --desc <text>");
    println!("  expense list [status]                   List expenses");
    println!("  expense status <id> <status>            pending, submitted or reimbursed");
    println!("  expense export <file.csv> [status]      Export expenses to CSV");
    println!("  receipt add <file>                      Read a receipt and save it as an expense");
    println!("    --vendor <name> --amount <n> --date <YYYY-MM-DD> --desc <text>");
    println!("  share create [label]                    Create a share link");
    println!("  share list                              List share links");
    println!("  share revoke <id>                       Revoke a share link");
    println!("  shared <token> list                     View expenses through a share link");
    println!("  shared <token> reimburse <id>           Mark a submitted expense reimbursed");
    println!("  thumb <url> [quality]                   YouTube thumbnail links");
    println!("  calc <expression>                       Evaluate an expression");
    println!("  sweep                                   Remove stale receipts and orphaned files");
    println!("  verify [YYYY-MM] [--repair]             Check (and fix) stored totals");
    println!("  --help, -h                              Show this help");
    println!("  --version, -V                           Show version");
}

/// Value following `name`, e.g. `--date 2024-03-14`.
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--repair" {
            continue;
        }
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn parse_date(raw: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {raw} (expected YYYY-MM-DD)"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn required_amount(raw: Option<&str>) -> Result<Decimal> {
    let raw = raw.ok_or_else(|| anyhow::anyhow!("Missing amount"))?;
    parse_amount(raw).ok_or_else(|| anyhow::anyhow!("Invalid amount: {raw}"))
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn current_month() -> String {
    Local::now().format("%Y-%m").to_string()
}

// ── Budget ───────────────────────────────────────────────────

fn cli_period(args: &[String], db: &mut Database) -> Result<()> {
    if args.first().map(String::as_str) == Some("list") {
        let periods = db.get_periods()?;
        if periods.is_empty() {
            println!("No periods yet. Create one with: junkyard period");
        }
        for p in periods {
            println!("{}  {}", p.month, p.total);
        }
        return Ok(());
    }
    if args.first().map(String::as_str) == Some("delete") {
        let month = args
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("Usage: junkyard period delete <YYYY-MM>"))?;
        if !db.delete_period(month)? {
            bail!("No period {month}");
        }
        println!("Deleted period {month}");
        return Ok(());
    }

    let month = args.first().cloned().unwrap_or_else(current_month);
    let summary = db.create_period(&month)?;
    println!("Created period {}", summary.month);
    match summary.copied_from {
        Some(from) => println!("  {} categories copied from {from}", summary.categories_copied),
        None => println!("  No earlier period; starting empty"),
    }
    println!("  {} recurring entries added", summary.entries_materialized);
    Ok(())
}

fn cli_categories(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let month = match args.first() {
        Some(m) => Period::normalize_month(m).ok_or_else(|| anyhow::anyhow!("Invalid month: {m}"))?,
        None => current_month(),
    };
    let period = db
        .get_period(&month)?
        .ok_or_else(|| anyhow::anyhow!("No period for {month}. Create it with: junkyard period {month}"))?;

    println!("{month}  spent {}", money(period.total));
    println!("{:<24} {:>14} {:>14} {:>14}", "Category", "Spent", "Goal", "Left");
    println!("{}", "-".repeat(69));
    for cat in db.get_categories(&month)? {
        let flag = if cat.is_over_goal() { "  over" } else { "" };
        println!(
            "{:<24} {:>14} {:>14} {:>14}{flag}",
            cat.name,
            money(cat.total),
            money(cat.goal),
            money(cat.remaining())
        );
    }
    Ok(())
}

fn cli_entries(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let month = match args.first() {
        Some(m) => Period::normalize_month(m).ok_or_else(|| anyhow::anyhow!("Invalid month: {m}"))?,
        None => current_month(),
    };
    let categories = db.get_categories(&month)?;
    let entries = db.get_entries_for_period(&month)?;
    if entries.is_empty() {
        println!("No entries in {month}");
        return Ok(());
    }
    for e in entries {
        let mark = if e.recurring_id.is_some() { "*" } else { " " };
        println!(
            "{:>5} {} {}  {:<18} {:<30} {:>12}",
            e.id.unwrap_or_default(),
            mark,
            e.date,
            Category::find_by_id(&categories, e.category_id).map_or("?", |c| c.name.as_str()),
            e.description,
            money(e.amount)
        );
    }
    Ok(())
}

fn cli_entry(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let pos = positional(args);
    if pos.len() < 2 {
        bail!("Usage: junkyard entry <category> <amount> <description> [--date YYYY-MM-DD]");
    }
    let date = match flag(args, "--date") {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    let month = &date[..7];
    let categories = db.get_categories(month)?;
    let cat = Category::find_by_name(&categories, pos[0])
        .ok_or_else(|| anyhow::anyhow!("No category '{}' in {month}", pos[0]))?;
    let cat_id = cat.id.ok_or_else(|| anyhow::anyhow!("Category without id"))?;
    let amount = required_amount(pos.get(1).copied())?;
    let description = pos[2..].join(" ");

    let id = db.insert_entry(&Entry::new(cat_id, date.clone(), description, amount))?;
    println!("Entry {id}: {} to {} on {date}", money(amount), cat.name);
    if let Some(updated) = db.get_category_by_id(cat_id)? {
        println!(
            "{} now at {} of {}",
            updated.name,
            money(updated.total),
            money(updated.goal)
        );
    }
    Ok(())
}

fn cli_recurring(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let pos = positional(args);
    match pos.first().copied().unwrap_or("list") {
        "list" => {
            let all = db.get_recurring()?;
            if all.is_empty() {
                println!("No recurring expenses");
            }
            for r in all {
                println!(
                    "{:>4}  day {:>2}  {:>12}  {:<18} {}{}",
                    r.id.unwrap_or_default(),
                    r.day_of_month,
                    money(r.amount),
                    r.category_name,
                    r.description,
                    if r.active { "" } else { "  (paused)" }
                );
            }
            Ok(())
        }
        "add" => {
            if pos.len() < 4 {
                bail!("Usage: junkyard recurring add <day> <amount> <category> [description]");
            }
            let day: u32 = pos[1]
                .parse()
                .ok()
                .filter(|d| (1..=31).contains(d))
                .ok_or_else(|| anyhow::anyhow!("Day must be 1-31: {}", pos[1]))?;
            let amount = required_amount(Some(pos[2]))?;
            let category = pos[3].to_string();
            let description = if pos.len() > 4 {
                pos[4..].join(" ")
            } else {
                category.clone()
            };
            let id = db.insert_recurring(&RecurringExpense::new(description, amount, category, day))?;
            println!("Recurring {id} added; it applies from the next new period");
            Ok(())
        }
        action @ ("pause" | "resume" | "delete") => {
            let id: i64 = pos
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("Usage: junkyard recurring {action} <id>"))?;
            match action {
                "delete" => db.delete_recurring(id)?,
                _ => db.set_recurring_active(id, action == "resume")?,
            }
            println!("Recurring {id}: {action}d");
            Ok(())
        }
        other => bail!("Unknown recurring action: {other}"),
    }
}

// ── Expenses ─────────────────────────────────────────────────

fn print_expenses(expenses: &[Expense], money: &dyn Fn(Decimal) -> String) {
    for e in expenses {
        println!(
            "{:>4}  {}  {:<24} {:>12}  {:<10} {}",
            e.id.unwrap_or_default(),
            e.date,
            e.vendor,
            money(e.amount),
            e.status,
            if e.has_receipt() { "receipt" } else { "" }
        );
    }
}

fn parse_status(raw: &str) -> Result<ExpenseStatus> {
    ExpenseStatus::parse(raw)
        .ok_or_else(|| anyhow::anyhow!("Unknown status: {raw} (pending, submitted, reimbursed)"))
}

fn cli_expense(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let pos = positional(args);
    match pos.first().copied().unwrap_or("list") {
        "add" => {
            if pos.len() < 3 {
                bail!("Usage: junkyard expense add <amount> <vendor> [--date D] [--desc text]");
            }
            let amount = required_amount(Some(pos[1]))?;
            let vendor = pos[2..].join(" ");
            let date = match flag(args, "--date") {
                Some(raw) => parse_date(raw)?,
                None => today(),
            };
            let desc = flag(args, "--desc").unwrap_or("").to_string();
            let id = db.insert_expense(&Expense::new(date, vendor.clone(), desc, amount))?;
            println!("Expense {id}: {vendor} {}", money(amount));
            Ok(())
        }
        "list" => {
            let status = pos.get(1).map(|s| parse_status(s)).transpose()?;
            let expenses = db.get_expenses(status)?;
            if expenses.is_empty() {
                println!("No expenses");
                return Ok(());
            }
            print_expenses(&expenses, money);
            let totals = db.expense_totals()?;
            println!();
            println!(
                "Pending {}  Submitted {}  Reimbursed {}",
                money(totals.pending),
                money(totals.submitted),
                money(totals.reimbursed)
            );
            Ok(())
        }
        "status" => {
            let (Some(id), Some(raw)) = (pos.get(1).and_then(|s| s.parse::<i64>().ok()), pos.get(2))
            else {
                bail!("Usage: junkyard expense status <id> <status>");
            };
            let status = parse_status(raw)?;
            db.update_expense_status(id, status)?;
            println!("Expense {id} is now {status}");
            Ok(())
        }
        "export" => {
            let path = pos
                .get(1)
                .map(|p| shellexpand(p))
                .ok_or_else(|| anyhow::anyhow!("Usage: junkyard expense export <file.csv> [status]"))?;
            let status = pos.get(2).map(|s| parse_status(s)).transpose()?;
            let count = db.export_expenses_to_csv(&path, status)?;
            if count == 0 {
                println!("No expenses to export");
            } else {
                println!("Exported {count} expenses to {path}");
            }
            Ok(())
        }
        other => bail!("Unknown expense action: {other}"),
    }
}

/// Upload, read and commit a receipt in one go. Anything that fails after
/// the upload abandons the receipt.
fn cli_receipt(
    args: &[String],
    db: &mut Database,
    services: &Services,
    money: &dyn Fn(Decimal) -> String,
) -> Result<()> {
    let pos = positional(args);
    let (Some("add"), Some(file)) = (pos.first().copied(), pos.get(1)) else {
        bail!("Usage: junkyard receipt add <file> [--vendor V] [--amount N] [--date D] [--desc T]");
    };
    let path = shellexpand(file);
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {path}"))?;
    let file_name = Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path.as_str())
        .to_string();

    let store = services.store.as_ref();
    let mut session = ReceiptSession::new();
    session.upload(db, store, &file_name, &bytes)?;

    let result = build_draft(&mut session, db, services, args).and_then(|draft| {
        let id = session.commit(db, &draft)?;
        Ok((id, draft))
    });
    match result {
        Ok((id, draft)) => {
            println!("Expense {id}: {} {} on {}", draft.vendor, money(draft.amount), draft.date);
            for item in &draft.line_items {
                println!("  {:<30} {:>12}", item.description, money(item.amount));
            }
            Ok(())
        }
        Err(e) => {
            session.teardown(db, store);
            Err(e)
        }
    }
}

fn build_draft(
    session: &mut ReceiptSession,
    db: &Database,
    services: &Services,
    args: &[String],
) -> Result<Expense> {
    let parsed = match session.parse(db, services.store.as_ref(), services.parser.as_ref()) {
        Ok(parsed) => parsed.clone(),
        // without any override there is nothing to save
        Err(e) if flag(args, "--amount").is_none() => return Err(e.into()),
        Err(e) => {
            eprintln!("Could not read receipt ({e}); using the values given");
            receipts::ParsedReceipt::default()
        }
    };
    let mut draft = parsed.to_draft(Local::now().date_naive());

    if let Some(vendor) = flag(args, "--vendor") {
        draft.vendor = vendor.to_string();
    }
    if let Some(raw) = flag(args, "--amount") {
        draft.amount = required_amount(Some(raw))?;
    }
    if let Some(raw) = flag(args, "--date") {
        draft.date = parse_date(raw)?;
    }
    if let Some(desc) = flag(args, "--desc") {
        draft.description = desc.to_string();
    }
    if draft.vendor.trim().is_empty() {
        bail!("No vendor found on the receipt; pass --vendor <name>");
    }
    Ok(draft)
}

fn cli_share(args: &[String], db: &mut Database, services: &Services) -> Result<()> {
    let pos = positional(args);
    match pos.first().copied().unwrap_or("list") {
        "create" => {
            let label = if pos.len() > 1 {
                pos[1..].join(" ")
            } else {
                "Expenses".to_string()
            };
            let link = share::create(db, &label, services.config.share_ttl())?;
            println!("Token:   {}", link.token);
            println!("Label:   {}", link.label);
            println!("Expires: {}", link.expires_at.as_deref().unwrap_or("never"));
            println!();
            println!("The holder runs: junkyard shared {} list", link.token);
            Ok(())
        }
        "list" => {
            let now = Utc::now();
            let links = db.get_share_links()?;
            if links.is_empty() {
                println!("No share links");
            }
            for l in links {
                let state = if l.is_usable(now) {
                    "active"
                } else if l.revoked {
                    "revoked"
                } else {
                    "expired"
                };
                println!(
                    "{:>4}  {:<8} {}  {:<20} expires {}",
                    l.id.unwrap_or_default(),
                    state,
                    l.token,
                    l.label,
                    l.expires_at.as_deref().unwrap_or("never")
                );
            }
            Ok(())
        }
        "revoke" => {
            let id: i64 = pos
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("Usage: junkyard share revoke <id>"))?;
            db.revoke_share_link(id)?;
            println!("Share link {id} revoked");
            Ok(())
        }
        other => bail!("Unknown share action: {other}"),
    }
}

fn cli_shared(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let pos = positional(args);
    let Some(token) = pos.first() else {
        bail!("Usage: junkyard shared <token> list|reimburse <id>");
    };
    let view = ShareView::open(db, token, Utc::now())?;
    match pos.get(1).copied().unwrap_or("list") {
        "list" => {
            println!("{}", view.link().label);
            print_expenses(&view.expenses()?, money);
            let totals = view.totals()?;
            println!();
            println!("Outstanding {}", money(totals.outstanding()));
            Ok(())
        }
        "reimburse" => {
            let id: i64 = pos
                .get(2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("Usage: junkyard shared <token> reimburse <id>"))?;
            view.mark_reimbursed(id)?;
            println!("Expense {id} marked reimbursed");
            Ok(())
        }
        other => bail!("Unknown shared action: {other}"),
    }
}

// ── Tools ────────────────────────────────────────────────────

fn cli_thumb(args: &[String]) -> Result<()> {
    let Some(input) = args.first() else {
        bail!("Usage: junkyard thumb <url> [quality]");
    };
    let id = thumbnail::extract_video_id(input)?;
    match args.get(1) {
        Some(q) => {
            let quality = thumbnail::Quality::parse(q)?;
            println!("{}", thumbnail::thumbnail_url(&id, quality));
        }
        None => {
            for (quality, url) in thumbnail::all_thumbnails(&id) {
                let (w, h) = quality.size();
                println!("{:<15} {:>9}  {url}", quality.label(), format!("{w}x{h}"));
            }
        }
    }
    Ok(())
}

fn cli_calc(args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("Usage: junkyard calc <expression>");
    }
    let value = calc::evaluate(&args.join(" "), None)?;
    println!("{value}");
    Ok(())
}

fn cli_sweep(db: &mut Database, services: &Services) -> Result<()> {
    let report = receipts::sweep(
        db,
        services.store.as_ref(),
        services.config.pending_max_age(),
        Utc::now(),
    )?;
    println!(
        "{} stale receipts, {} orphaned files removed, {} failures",
        report.stale_records, report.orphan_objects, report.failures
    );
    if report.failures > 0 {
        bail!("{} receipts could not be removed; see the log", report.failures);
    }
    Ok(())
}

fn cli_verify(args: &[String], db: &mut Database, money: &dyn Fn(Decimal) -> String) -> Result<()> {
    let pos = positional(args);
    let month = match pos.first() {
        Some(m) => Period::normalize_month(m).ok_or_else(|| anyhow::anyhow!("Invalid month: {m}"))?,
        None => current_month(),
    };
    let drifts = db.verify_totals(&month)?;
    if drifts.is_empty() {
        println!("Totals for {month} are consistent");
        return Ok(());
    }
    for d in &drifts {
        println!(
            "{:<24} stored {:>12}  actual {:>12}",
            d.category.as_deref().unwrap_or("(period total)"),
            money(d.stored),
            money(d.actual)
        );
    }
    if args.iter().any(|a| a == "--repair") {
        let repaired = db.repair_totals(&month)?;
        println!("Repaired {repaired} totals");
        Ok(())
    } else {
        bail!("{} totals drifted in {month}; rerun with --repair", drifts.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_and_positional() {
        let a = args(&["add", "42.10", "--date", "2024-03-14", "Office", "Depot", "--repair"]);
        assert_eq!(flag(&a, "--date"), Some("2024-03-14"));
        assert_eq!(flag(&a, "--desc"), None);
        assert_eq!(positional(&a), vec!["add", "42.10", "Office", "Depot"]);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-3-4").unwrap(), "2024-03-04");
        assert!(parse_date("14/03/2024").is_err());
    }

    #[test]
    fn test_required_amount() {
        assert_eq!(required_amount(Some("12.50")).unwrap().to_string(), "12.50");
        assert!(required_amount(Some("twelve")).is_err());
        assert!(required_amount(None).is_err());
    }
}
