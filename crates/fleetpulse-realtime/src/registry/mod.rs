//! Observer topology: who watches which tenant or driver.

pub mod directory;
pub mod session;
pub mod topic;

pub use directory::SessionRegistry;
pub use session::ObserverSession;
pub use topic::WatchTopic;
