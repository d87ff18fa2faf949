mod config;
mod provision;
mod setup;
mod stats;

pub use config::ConfigCommand;
pub use provision::ProvisionArgs;
pub use setup::SetupArgs;
pub use stats::StatsArgs;

pub use config::handle_config;
pub use provision::handle_provision;
pub use setup::handle_setup;
pub use stats::handle_stats;
