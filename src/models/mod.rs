mod category;
mod entry;
mod expense;
mod pending_receipt;
mod period;
mod recurring;
mod share_link;

pub use category::Category;
pub use entry::{Entry, EntryUpdate};
pub use expense::{Expense, ExpenseStatus, ExpenseTotals, LineItem};
pub use pending_receipt::PendingReceipt;
pub use period::{Period, PeriodSummary};
pub use recurring::RecurringExpense;
pub use share_link::ShareLink;
