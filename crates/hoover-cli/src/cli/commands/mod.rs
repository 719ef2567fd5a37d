//! CLI command handlers, one file per command.

mod crawl;
mod dead;
mod revive;
mod status;
mod work;

pub use crawl::run_crawl;
pub use dead::run_dead;
pub use revive::run_revive;
pub use status::run_status;
pub use work::run_work;
