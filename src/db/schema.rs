/// Tables for budgets, expense reports, receipts and share links.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS periods (
    month       TEXT PRIMARY KEY,
    total       TEXT NOT NULL DEFAULT '0',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    month   TEXT NOT NULL REFERENCES periods(month) ON DELETE CASCADE,
    name    TEXT NOT NULL,
    goal    TEXT NOT NULL DEFAULT '0',
    total   TEXT NOT NULL DEFAULT '0',
    color   TEXT NOT NULL DEFAULT '',
    UNIQUE(month, name COLLATE NOCASE)
);

CREATE TABLE IF NOT EXISTS recurring_expenses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    description     TEXT NOT NULL,
    amount          TEXT NOT NULL,
    category_name   TEXT NOT NULL,
    day_of_month    INTEGER NOT NULL DEFAULT 1,
    active          BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS entries (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id   INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    date          TEXT NOT NULL,
    description   TEXT NOT NULL,
    amount        TEXT NOT NULL,
    recurring_id  INTEGER REFERENCES recurring_expenses(id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_categories_month ON categories(month);
CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category_id);
CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);

CREATE TABLE IF NOT EXISTS expenses (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    date         TEXT NOT NULL,
    vendor       TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    amount       TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'Pending',
    receipt_key  TEXT,
    line_items   TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_status ON expenses(status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_expenses_receipt ON expenses(receipt_key) WHERE receipt_key IS NOT NULL;

CREATE TABLE IF NOT EXISTS pending_receipts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL UNIQUE,
    object_key  TEXT NOT NULL UNIQUE,
    file_name   TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS share_links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    token       TEXT NOT NULL UNIQUE,
    label       TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    expires_at  TEXT,
    revoked     BOOLEAN NOT NULL DEFAULT 0
);
"#;

/// `MIGRATIONS[n]` takes `user_version` from n to n + 1.
pub(crate) const MIGRATIONS: &[&str] = &[SCHEMA_V1];

pub(crate) const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;
