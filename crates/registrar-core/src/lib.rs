pub mod config;
pub mod consensus;
pub mod crawler;
pub mod directory;
pub mod error;
pub mod genesis;
pub mod height;
pub mod history;
pub mod pool;
pub mod refresh;
pub mod registry;
pub mod rpc;
pub mod types;

pub use config::RefreshConfig;
pub use error::CoreError;
pub use refresh::{ChainReport, Registrar};
pub use registry::RegistryLayout;
pub use types::{LightRoot, Peer, PeerSet};
