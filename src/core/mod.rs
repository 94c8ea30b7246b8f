pub mod diff;
pub mod models;
pub mod monitor;
pub mod notifications;
pub mod source;
pub mod summary;

pub use models::{Job, JobDetail, JobFile, Snapshot, Transition};
pub use monitor::{CycleError, CycleOutcome, StatusMonitor};
pub use notifications::{ChatId, DeliveryError, Notifier};
pub use source::{AuthError, Credentials, FetchError, JobSource, SessionToken};
