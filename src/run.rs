mod cli;
mod tui;

pub(crate) use cli::as_cli;
pub(crate) use tui::as_tui;

use crate::config::Config;
use crate::receipts::{ObjectStore, ReceiptParser};

/// Everything a front-end needs next to the database.
pub(crate) struct Services {
    pub(crate) config: Config,
    pub(crate) store: Box<dyn ObjectStore>,
    pub(crate) parser: Box<dyn ReceiptParser>,
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().display().to_string())
            .unwrap_or_else(|| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellexpand() {
        assert_eq!(shellexpand("/tmp/x.csv"), "/tmp/x.csv");
        assert_eq!(shellexpand("x.csv"), "x.csv");
        let expanded = shellexpand("~/x.csv");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/x.csv"));
    }
}
