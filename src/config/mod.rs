//! Configuration types and loading for projektflow

mod loader;
mod sevdesk;
mod store;

pub use loader::ProjektflowConfig;
pub use sevdesk::SevdeskConfig;
pub use store::StoreConfig;
