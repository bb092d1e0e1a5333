#![allow(clippy::unwrap_used)]

use super::*;
use crate::db::Database;
use crate::models::{Expense, ExpenseStatus};
use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// In-memory store whose deletes can be made to fail.
#[derive(Default)]
struct MemoryStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    fail_deletes: Cell<bool>,
}

impl MemoryStore {
    fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ReceiptError> {
        self.objects.borrow_mut().insert(key.into(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ReceiptError> {
        self.objects
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| ReceiptError::NotFound(key.into()))
    }

    fn delete(&self, key: &str) -> Result<(), ReceiptError> {
        if self.fail_deletes.get() {
            return Err(std::io::Error::other("disk on fire").into());
        }
        self.objects.borrow_mut().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, ReceiptError> {
        Ok(self.objects.borrow().contains_key(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ReceiptError> {
        Ok(self
            .objects
            .borrow()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

struct FixedParser(Option<ParsedReceipt>);

impl ReceiptParser for FixedParser {
    fn parse(&self, _bytes: &[u8], _file_name: &str) -> Result<ParsedReceipt, ReceiptError> {
        self.0
            .clone()
            .ok_or_else(|| ReceiptError::Extraction("model said no".into()))
    }
}

const RECEIPT_TXT: &str = "\
CORNER CAFE
123 Main St
2024-03-14 12:31

Flat white        4.50
Bagel             3.25
Subtotal          7.75
Tax               0.62
TOTAL             8.37
";

// ── Session lifecycle ─────────────────────────────────────────

#[test]
fn test_upload_tracks_pending_receipt() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();

    let key = session
        .upload(&db, &store, "lunch.JPG", b"jpeg bytes")
        .unwrap()
        .object_key
        .clone();

    assert!(key.starts_with(RECEIPT_PREFIX));
    assert!(key.ends_with(".jpg"));
    assert!(store.exists(&key).unwrap());
    let record = db.get_pending_for_session(session.id()).unwrap().unwrap();
    assert_eq!(record.object_key, key);
    assert_eq!(record.file_name, "lunch.JPG");
}

#[test]
fn test_upload_rejects_empty_and_unsupported() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();

    assert!(matches!(
        session.upload(&db, &store, "a.jpg", b""),
        Err(ReceiptError::Empty)
    ));
    assert!(matches!(
        session.upload(&db, &store, "a.exe", b"MZ"),
        Err(ReceiptError::UnsupportedType(_))
    ));
    assert!(store.keys().is_empty());
    assert!(db.get_pending_receipts().unwrap().is_empty());
}

#[test]
fn test_upload_removes_object_when_tracking_fails() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    // a record already claims this session id, so tracking the upload collides
    db.insert_pending_receipt(&crate::models::PendingReceipt::new(
        session.id().to_string(),
        format!("{RECEIPT_PREFIX}elsewhere.jpg"),
        "elsewhere.jpg".into(),
    ))
    .unwrap();

    assert!(matches!(
        session.upload(&db, &store, "dinner.jpg", b"jpeg"),
        Err(ReceiptError::Database(_))
    ));
    assert!(store.keys().is_empty());
    assert!(session.pending().is_none());
    assert_eq!(db.get_pending_receipts().unwrap().len(), 1);
}

#[test]
fn test_new_upload_replaces_previous() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();

    let first = session
        .upload(&db, &store, "one.png", b"1")
        .unwrap()
        .object_key
        .clone();
    let second = session
        .upload(&db, &store, "two.png", b"2")
        .unwrap()
        .object_key
        .clone();

    assert_ne!(first, second);
    assert_eq!(store.keys(), vec![second.clone()]);
    let pending = db.get_pending_receipts().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].object_key, second);
}

#[test]
fn test_replacement_blocked_when_old_artifact_cannot_be_deleted() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    let first = session
        .upload(&db, &store, "one.png", b"1")
        .unwrap()
        .object_key
        .clone();

    store.fail_deletes.set(true);
    assert!(session.upload(&db, &store, "two.png", b"2").is_err());

    // The old upload is still fully tracked.
    assert_eq!(store.keys(), vec![first.clone()]);
    assert_eq!(session.pending().unwrap().object_key, first);
    assert_eq!(db.get_pending_receipts().unwrap().len(), 1);
}

#[test]
fn test_parse_success_keeps_pending() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session
        .upload(&db, &store, "cafe.txt", RECEIPT_TXT.as_bytes())
        .unwrap();

    let parser = TextParser::new().unwrap();
    let parsed = session.parse(&db, &store, &parser).unwrap();
    assert_eq!(parsed.total, Some(dec!(8.37)));
    assert!(session.pending().is_some());
    assert!(session.parsed().is_some());
    assert_eq!(db.get_pending_receipts().unwrap().len(), 1);
}

#[test]
fn test_parse_failure_discards_upload() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "blurry.jpg", b"???").unwrap();

    let result = session.parse(&db, &store, &FixedParser(None));
    assert!(matches!(result, Err(ReceiptError::Extraction(_))));
    assert!(session.pending().is_none());
    assert!(store.keys().is_empty());
    assert!(db.get_pending_receipts().unwrap().is_empty());
}

#[test]
fn test_parse_without_upload() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    assert!(matches!(
        session.parse(&db, &store, &FixedParser(None)),
        Err(ReceiptError::NothingPending)
    ));
}

#[test]
fn test_commit_attaches_artifact_and_drops_record() {
    let mut db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    let key = session
        .upload(&db, &store, "taxi.pdf", b"%PDF")
        .unwrap()
        .object_key
        .clone();

    let draft = Expense::new("2024-03-14".into(), "Taxi".into(), "Airport".into(), dec!(31));
    let id = session.commit(&mut db, &draft).unwrap();

    let saved = db.get_expense(id).unwrap().unwrap();
    assert_eq!(saved.receipt_key.as_deref(), Some(key.as_str()));
    assert_eq!(saved.status, ExpenseStatus::Pending);
    assert!(db.get_pending_receipts().unwrap().is_empty());
    assert!(store.exists(&key).unwrap());
    assert!(session.pending().is_none());

    // A later teardown leaves the committed artifact alone.
    session.teardown(&db, &store);
    assert!(store.exists(&key).unwrap());
}

#[test]
fn test_commit_without_receipt() {
    let mut db = Database::open_in_memory().unwrap();
    let mut session = ReceiptSession::new();
    let draft = Expense::new("2024-03-14".into(), "Bus".into(), String::new(), dec!(2.5));
    let id = session.commit(&mut db, &draft).unwrap();
    assert!(db.get_expense(id).unwrap().unwrap().receipt_key.is_none());
}

#[test]
fn test_commit_after_sweep_asks_for_new_upload() {
    let mut db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "hotel.png", b"png").unwrap();

    let later = chrono::Utc::now() + Duration::hours(48);
    sweep(&db, &store, Duration::hours(24), later).unwrap();

    let draft = Expense::new("2024-03-14".into(), "Hotel".into(), String::new(), dec!(120));
    assert!(matches!(session.commit(&mut db, &draft), Err(ReceiptError::Swept)));
    assert!(session.pending().is_none());
    assert!(db.get_expenses(None).unwrap().is_empty());
}

#[test]
fn test_cancel_deletes_artifact_then_record() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "a.png", b"a").unwrap();

    session.cancel(&db, &store).unwrap();
    assert!(store.keys().is_empty());
    assert!(db.get_pending_receipts().unwrap().is_empty());
    // Cancelling an empty session is a no-op.
    session.cancel(&db, &store).unwrap();
}

#[test]
fn test_teardown_keeps_record_when_artifact_delete_fails() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "a.png", b"a").unwrap();

    store.fail_deletes.set(true);
    session.teardown(&db, &store);
    assert_eq!(store.keys().len(), 1);
    assert_eq!(db.get_pending_receipts().unwrap().len(), 1);

    // The next sweep finishes the job once the store recovers.
    store.fail_deletes.set(false);
    let report = sweep(&db, &store, Duration::zero(), chrono::Utc::now() + Duration::seconds(1)).unwrap();
    assert_eq!(report.stale_records, 1);
    assert!(store.keys().is_empty());
    assert!(db.get_pending_receipts().unwrap().is_empty());
}

// ── Sweep ─────────────────────────────────────────────────────

#[test]
fn test_sweep_spares_fresh_pending_and_committed() {
    let mut db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();

    let mut committed = ReceiptSession::new();
    let kept = committed
        .upload(&db, &store, "kept.png", b"k")
        .unwrap()
        .object_key
        .clone();
    committed
        .commit(
            &mut db,
            &Expense::new("2024-01-01".into(), "V".into(), String::new(), dec!(1)),
        )
        .unwrap();

    let mut live = ReceiptSession::new();
    let fresh = live
        .upload(&db, &store, "fresh.png", b"f")
        .unwrap()
        .object_key
        .clone();

    store.put("receipts/orphan.png", b"o").unwrap();
    store.put("other/unrelated.bin", b"x").unwrap();

    let report = sweep(&db, &store, Duration::hours(24), chrono::Utc::now()).unwrap();
    assert_eq!(report.stale_records, 0);
    assert_eq!(report.orphan_objects, 1);
    assert_eq!(
        store.keys(),
        vec!["other/unrelated.bin".to_string(), fresh, kept]
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_sweep_removes_stale_pending() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "old.png", b"o").unwrap();

    let later = chrono::Utc::now() + Duration::hours(48);
    let report = sweep(&db, &store, Duration::hours(24), later).unwrap();
    assert_eq!(report.stale_records, 1);
    assert_eq!(report.orphan_objects, 0);
    assert!(store.keys().is_empty());
    assert!(db.get_pending_receipts().unwrap().is_empty());
}

#[test]
fn test_sweep_counts_failures_and_keeps_records() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let mut session = ReceiptSession::new();
    session.upload(&db, &store, "old.png", b"o").unwrap();
    store.fail_deletes.set(true);

    let later = chrono::Utc::now() + Duration::hours(48);
    let report = sweep(&db, &store, Duration::hours(24), later).unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.stale_records, 0);
    assert_eq!(db.get_pending_receipts().unwrap().len(), 1);
}

#[test]
fn test_sweep_on_empty_store_is_clean() {
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::default();
    let report = sweep(&db, &store, Duration::hours(1), chrono::Utc::now()).unwrap();
    assert!(report.is_clean());
}

// ── Filesystem store ──────────────────────────────────────────

#[test]
fn test_fs_store_roundtrip_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::open(&dir.path().join("objects")).unwrap();

    store.put("receipts/a.png", b"aaa").unwrap();
    store.put("receipts/b.png", b"bbb").unwrap();
    store.put("misc/c.txt", b"ccc").unwrap();

    assert_eq!(store.get("receipts/a.png").unwrap(), b"aaa");
    assert!(store.exists("misc/c.txt").unwrap());
    assert_eq!(
        store.list(RECEIPT_PREFIX).unwrap(),
        vec!["receipts/a.png", "receipts/b.png"]
    );

    store.put("receipts/a.png", b"new").unwrap();
    assert_eq!(store.get("receipts/a.png").unwrap(), b"new");
}

#[test]
fn test_fs_store_delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::open(dir.path()).unwrap();
    store.put("receipts/x.jpg", b"x").unwrap();
    store.delete("receipts/x.jpg").unwrap();
    store.delete("receipts/x.jpg").unwrap();
    assert!(!store.exists("receipts/x.jpg").unwrap());
    assert!(matches!(
        store.get("receipts/x.jpg"),
        Err(ReceiptError::NotFound(_))
    ));
}

#[test]
fn test_fs_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::open(&dir.path().join("objects")).unwrap();
    for key in ["", "/etc/passwd", "../outside", "receipts/../../x", "a//b", "a\\b", "receipts/.hidden"] {
        assert!(
            matches!(store.put(key, b"x"), Err(ReceiptError::InvalidKey(_))),
            "key {key:?} should be rejected"
        );
    }
    assert!(!dir.path().join("outside").exists());
}

#[test]
fn test_fs_store_list_skips_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::open(dir.path()).unwrap();
    store.put("receipts/a.png", b"a").unwrap();
    std::fs::write(dir.path().join("receipts").join(".leftover.tmp"), b"t").unwrap();
    assert_eq!(store.list("").unwrap(), vec!["receipts/a.png"]);
}

// ── Parsers ───────────────────────────────────────────────────

#[test]
fn test_text_parser_reads_receipt() {
    let parser = TextParser::new().unwrap();
    let parsed = parser.parse(RECEIPT_TXT.as_bytes(), "cafe.txt").unwrap();
    assert_eq!(parsed.vendor.as_deref(), Some("CORNER CAFE"));
    assert_eq!(parsed.date.as_deref(), Some("2024-03-14"));
    assert_eq!(parsed.total, Some(dec!(8.37)));
    assert_eq!(parsed.items.len(), 2);
    assert_eq!(parsed.items[0].description, "Flat white");
    assert_eq!(parsed.items[1].amount, dec!(3.25));
}

#[test]
fn test_text_parser_us_date() {
    let parser = TextParser::new().unwrap();
    let parsed = parser
        .parse(b"HARDWARE BARN\n3/7/2024\nTotal: $19.99\n", "r.txt")
        .unwrap();
    assert_eq!(parsed.date.as_deref(), Some("2024-03-07"));
    assert_eq!(parsed.total, Some(dec!(19.99)));
}

#[test]
fn test_text_parser_rejects_binary_and_noise() {
    let parser = TextParser::new().unwrap();
    assert!(matches!(
        parser.parse(&[0xff, 0xfe, 0x00], "img.jpg"),
        Err(ReceiptError::UnsupportedType(_))
    ));
    assert!(matches!(
        parser.parse(b"hello there", "note.txt"),
        Err(ReceiptError::Unrecognized)
    ));
}

#[test]
fn test_parsed_receipt_from_json() {
    let json = r#"{"vendor":"Deli","date":"2024-02-02","total":"12.40",
                  "items":[{"description":"Soup","amount":"5.40"},{"description":"Bread","amount":7}]}"#;
    let parsed: ParsedReceipt = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.total, Some(dec!(12.40)));
    assert_eq!(parsed.items[1].amount, dec!(7));

    let sparse: ParsedReceipt = serde_json::from_str("{}").unwrap();
    assert!(sparse.is_empty());
}

#[test]
fn test_parsed_receipt_to_draft() {
    let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let parsed = ParsedReceipt {
        vendor: Some("Deli".into()),
        date: Some("not a date".into()),
        total: None,
        items: vec![
            crate::models::LineItem {
                description: "Soup".into(),
                amount: dec!(5.40),
            },
            crate::models::LineItem {
                description: "Bread".into(),
                amount: dec!(2),
            },
        ],
    };
    let draft = parsed.to_draft(today);
    assert_eq!(draft.date, "2024-05-01");
    assert_eq!(draft.vendor, "Deli");
    assert_eq!(draft.amount, dec!(7.40));
    assert_eq!(draft.line_items.len(), 2);
}

#[test]
fn test_parser_from_command_defaults_to_text() {
    let parser = parser_from_command(None).unwrap();
    let parsed = parser.parse(RECEIPT_TXT.as_bytes(), "r.txt").unwrap();
    assert_eq!(parsed.total, Some(dec!(8.37)));
    assert!(parser_from_command(Some("   ")).is_ok());
}

#[cfg(unix)]
#[test]
fn test_command_parser_reports_failure() {
    let parser = CommandParser::new("false".into(), Vec::new());
    assert!(matches!(
        parser.parse(b"x", "r.jpg"),
        Err(ReceiptError::Extraction(_))
    ));
    let missing = CommandParser::new("junkyard-no-such-extractor".into(), Vec::new());
    assert!(matches!(
        missing.parse(b"x", "r.jpg"),
        Err(ReceiptError::Extraction(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_command_parser_decodes_stdout() {
    let script = r#"printf '{"vendor":"Shell Shop","total":3.5}'"#;
    let parser = CommandParser::new("sh".into(), vec!["-c".into(), script.into()]);
    let parsed = parser.parse(b"x", "r.jpg").unwrap();
    assert_eq!(parsed.vendor.as_deref(), Some("Shell Shop"));
    assert_eq!(parsed.total, Some(dec!(3.5)));
}

#[cfg(unix)]
#[test]
fn test_command_parser_cleans_up_scratch_file() {
    // the extractor reports the path it was given as the vendor
    let script = r#"printf '{"vendor":"%s","total":1}' "$0""#;
    let parser = CommandParser::new("sh".into(), vec!["-c".into(), script.into()]);
    let parsed = parser.parse(b"x", "r.txt").unwrap();
    let scratch = parsed.vendor.unwrap();
    assert!(scratch.ends_with(".txt"));
    assert!(!std::path::Path::new(&scratch).exists());
}

#[cfg(unix)]
#[test]
fn test_command_parser_tolerates_vanished_scratch_file() {
    let script = r#"rm -f "$0"; printf '{"vendor":"Kiosk","total":2}'"#;
    let parser = CommandParser::new("sh".into(), vec!["-c".into(), script.into()]);
    let parsed = parser.parse(b"x", "r.txt").unwrap();
    assert_eq!(parsed.vendor.as_deref(), Some("Kiosk"));
}

#[test]
fn test_receipt_extension() {
    assert_eq!(receipt_extension("Scan.PDF").unwrap(), "pdf");
    assert!(receipt_extension("noext").is_err());
}
