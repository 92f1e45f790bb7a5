mod batch;
mod dispatcher;
pub mod eligibility;
pub mod ticker;

pub use batch::{BatchWrite, WriteBatch};
pub use dispatcher::{DispatchReport, ReminderDispatcher};
