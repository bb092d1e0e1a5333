#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::*;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

fn expense(date: &str, vendor: &str, amount: rust_decimal::Decimal) -> Expense {
    Expense::new(date.into(), vendor.into(), "Client visit".into(), amount)
}

// ── Expenses ──────────────────────────────────────────────────

#[test]
fn test_insert_and_get_expense() {
    let db = Database::open_in_memory().unwrap();
    let mut e = expense("2024-03-02", "Taxi Co", dec!(23.40));
    e.line_items = vec![LineItem {
        description: "Fare".into(),
        amount: dec!(23.40),
    }];
    let id = db.insert_expense(&e).unwrap();

    let loaded = db.get_expense(id).unwrap().unwrap();
    assert_eq!(loaded.vendor, "Taxi Co");
    assert_eq!(loaded.amount, dec!(23.40));
    assert_eq!(loaded.status, ExpenseStatus::Pending);
    assert_eq!(loaded.line_items, e.line_items);
    assert!(loaded.receipt_key.is_none());
    assert!(db.get_expense(id + 1).unwrap().is_none());
}

#[test]
fn test_get_expenses_filter_and_order() {
    let db = Database::open_in_memory().unwrap();
    let a = db.insert_expense(&expense("2024-03-01", "A", dec!(1))).unwrap();
    db.insert_expense(&expense("2024-03-05", "B", dec!(2))).unwrap();
    db.insert_expense(&expense("2024-02-20", "C", dec!(3))).unwrap();
    db.update_expense_status(a, ExpenseStatus::Submitted).unwrap();

    let vendors: Vec<String> = db
        .get_expenses(None)
        .unwrap()
        .into_iter()
        .map(|e| e.vendor)
        .collect();
    assert_eq!(vendors, vec!["B", "A", "C"]);

    let submitted = db.get_expenses(Some(ExpenseStatus::Submitted)).unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].vendor, "A");
    assert!(db
        .get_expenses(Some(ExpenseStatus::Reimbursed))
        .unwrap()
        .is_empty());
}

#[test]
fn test_update_status_missing_expense() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.update_expense_status(5, ExpenseStatus::Submitted).is_err());
}

#[test]
fn test_expense_totals_by_status() {
    let db = Database::open_in_memory().unwrap();
    let a = db.insert_expense(&expense("2024-03-01", "A", dec!(10.50))).unwrap();
    let b = db.insert_expense(&expense("2024-03-02", "B", dec!(4.50))).unwrap();
    db.insert_expense(&expense("2024-03-03", "C", dec!(7))).unwrap();
    db.update_expense_status(a, ExpenseStatus::Submitted).unwrap();
    db.update_expense_status(b, ExpenseStatus::Reimbursed).unwrap();

    let totals = db.expense_totals().unwrap();
    assert_eq!(totals.pending, dec!(7));
    assert_eq!(totals.submitted, dec!(10.50));
    assert_eq!(totals.reimbursed, dec!(4.50));
    assert_eq!(totals.outstanding(), dec!(17.50));
}

#[test]
fn test_delete_expense_returns_receipt_key() {
    let db = Database::open_in_memory().unwrap();
    let mut with_receipt = expense("2024-03-01", "Hotel", dec!(120));
    with_receipt.receipt_key = Some("receipts/abc.jpg".into());
    let id = db.insert_expense(&with_receipt).unwrap();
    let plain = db.insert_expense(&expense("2024-03-01", "Bus", dec!(2))).unwrap();

    assert_eq!(db.delete_expense(id).unwrap().as_deref(), Some("receipts/abc.jpg"));
    assert_eq!(db.delete_expense(plain).unwrap(), None);
    assert!(db.delete_expense(plain).is_err());
}

#[test]
fn test_receipt_key_unique_across_expenses() {
    let db = Database::open_in_memory().unwrap();
    let mut first = expense("2024-03-01", "A", dec!(1));
    first.receipt_key = Some("receipts/same.png".into());
    db.insert_expense(&first).unwrap();
    assert!(db.insert_expense(&first).is_err());

    let keys = db.receipt_keys_in_use().unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains("receipts/same.png"));
}

// ── Pending receipts ──────────────────────────────────────────

#[test]
fn test_one_pending_receipt_per_session() {
    let db = Database::open_in_memory().unwrap();
    db.insert_pending_receipt(&PendingReceipt::new(
        "s1".into(),
        "receipts/one.jpg".into(),
        "one.jpg".into(),
    ))
    .unwrap();
    let second = db.insert_pending_receipt(&PendingReceipt::new(
        "s1".into(),
        "receipts/two.jpg".into(),
        "two.jpg".into(),
    ));
    assert!(second.is_err());

    db.insert_pending_receipt(&PendingReceipt::new(
        "s2".into(),
        "receipts/three.jpg".into(),
        "three.jpg".into(),
    ))
    .unwrap();
    assert_eq!(db.get_pending_receipts().unwrap().len(), 2);

    let pending = db.get_pending_for_session("s1").unwrap().unwrap();
    assert_eq!(pending.object_key, "receipts/one.jpg");
    assert!(db.get_pending_for_session("nope").unwrap().is_none());
}

#[test]
fn test_delete_pending_receipt() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_pending_receipt(&PendingReceipt::new(
            "s1".into(),
            "receipts/x.jpg".into(),
            "x.jpg".into(),
        ))
        .unwrap();
    assert!(db.delete_pending_receipt(id).unwrap());
    assert!(!db.delete_pending_receipt(id).unwrap());
    assert!(db.get_pending_for_session("s1").unwrap().is_none());
}

#[test]
fn test_commit_expense_with_receipt() {
    let mut db = Database::open_in_memory().unwrap();
    let pending_id = db
        .insert_pending_receipt(&PendingReceipt::new(
            "s1".into(),
            "receipts/lunch.jpg".into(),
            "lunch.jpg".into(),
        ))
        .unwrap();

    let id = db
        .commit_expense_with_receipt(&expense("2024-03-04", "Deli", dec!(14.20)), pending_id)
        .unwrap();

    let saved = db.get_expense(id).unwrap().unwrap();
    assert_eq!(saved.receipt_key.as_deref(), Some("receipts/lunch.jpg"));
    assert!(db.get_pending_receipts().unwrap().is_empty());
    assert!(db.receipt_keys_in_use().unwrap().contains("receipts/lunch.jpg"));
}

#[test]
fn test_commit_without_pending_record_writes_nothing() {
    let mut db = Database::open_in_memory().unwrap();
    let result = db.commit_expense_with_receipt(&expense("2024-03-04", "Deli", dec!(1)), 99);
    assert!(result.is_err());
    assert!(db.get_expenses(None).unwrap().is_empty());
}

#[test]
fn test_commit_failure_keeps_pending_record() {
    let mut db = Database::open_in_memory().unwrap();
    let mut existing = expense("2024-03-01", "A", dec!(1));
    existing.receipt_key = Some("receipts/dup.jpg".into());
    db.insert_expense(&existing).unwrap();

    let pending_id = db
        .insert_pending_receipt(&PendingReceipt::new(
            "s1".into(),
            "receipts/dup.jpg".into(),
            "dup.jpg".into(),
        ))
        .unwrap();

    // The receipt key collides, so the whole commit is rolled back.
    let result = db.commit_expense_with_receipt(&expense("2024-03-02", "B", dec!(2)), pending_id);
    assert!(result.is_err());
    assert_eq!(db.get_expenses(None).unwrap().len(), 1);
    assert!(db.get_pending_for_session("s1").unwrap().is_some());
}

// ── Share links ───────────────────────────────────────────────

#[test]
fn test_share_link_lifecycle() {
    let db = Database::open_in_memory().unwrap();
    let link = ShareLink::new(
        "token-1".into(),
        "Finance".into(),
        Some(Utc::now() + Duration::days(7)),
    );
    let id = db.insert_share_link(&link).unwrap();

    let loaded = db.get_share_link_by_token("token-1").unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.label, "Finance");
    assert!(loaded.is_usable(Utc::now()));

    db.revoke_share_link(id).unwrap();
    let revoked = db.get_share_link_by_token("token-1").unwrap().unwrap();
    assert!(revoked.revoked);
    assert!(!revoked.is_usable(Utc::now()));

    assert!(db.get_share_link_by_token("other").unwrap().is_none());
    assert!(db.revoke_share_link(id + 10).is_err());
    assert_eq!(db.get_share_links().unwrap().len(), 1);
}

#[test]
fn test_share_token_unique() {
    let db = Database::open_in_memory().unwrap();
    let link = ShareLink::new("dup".into(), String::new(), None);
    db.insert_share_link(&link).unwrap();
    assert!(db.insert_share_link(&link).is_err());
}

// ── CSV export ────────────────────────────────────────────────

#[test]
fn test_export_expenses_to_csv() {
    let db = Database::open_in_memory().unwrap();
    let mut hotel = expense("2024-03-01", "Hotel, Downtown", dec!(210.00));
    hotel.receipt_key = Some("receipts/h.pdf".into());
    let hotel_id = db.insert_expense(&hotel).unwrap();
    db.insert_expense(&expense("2024-03-03", "Cafe", dec!(4.75))).unwrap();
    db.update_expense_status(hotel_id, ExpenseStatus::Submitted).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expenses.csv");
    let path_str = path.to_str().unwrap();

    assert_eq!(db.export_expenses_to_csv(path_str, None).unwrap(), 2);

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "Date");
    assert_eq!(&headers[5], "Receipt");
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Cafe");
    assert_eq!(&rows[1][1], "Hotel, Downtown");
    assert_eq!(&rows[1][4], "Submitted");
    assert_eq!(&rows[1][5], "receipts/h.pdf");
}

#[test]
fn test_export_filtered_and_empty() {
    let db = Database::open_in_memory().unwrap();
    db.insert_expense(&expense("2024-03-03", "Cafe", dec!(4.75))).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("none.csv");
    let count = db
        .export_expenses_to_csv(path.to_str().unwrap(), Some(ExpenseStatus::Reimbursed))
        .unwrap();
    assert_eq!(count, 0);
    assert!(!path.exists());
}
