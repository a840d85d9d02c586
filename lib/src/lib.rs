//! graphpub publishes versioned datasets by moving graph-structured records
//! from staging graphs into a public store, under a strict one-at-a-time
//! release ordering and a revision/deprecation chain.

pub mod config;
pub mod consts;
pub mod dataset;
pub mod notify;
pub mod queue;
pub mod snapshot;
pub mod store;
pub mod term;
pub mod transfer;
pub mod util;
pub mod worker;

pub use config::Config;
pub use queue::{ReleaseQueue, ReleaseTask, TaskStatus};
pub use store::{HttpClient, OxigraphClient, SparqlClient};
pub use term::{Term, Triple};

/// Initializes logging for the graphpub library.
///
/// Checks for the `GRAPHPUB_LOG` environment variable; if set, `RUST_LOG`
/// is set to its value. The logger initialization (e.g. `env_logger::init()`)
/// must be called after this function for the level to take effect.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("GRAPHPUB_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
