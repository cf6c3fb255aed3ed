//! Gear catalog and pack composition.
//!
//! Items are grouped into packs with per-item quantities and worn counts,
//! tagged with pack-scoped labels, duplicated transactionally, shared via
//! short ids and summarised by weight.

pub mod db;
pub mod error;
pub mod ids;
pub mod settings;
pub mod weights;

use anyhow::Result;

pub use db::{
    models::{
        Category, Item, ItemLabel, Membership, NewItem, Pack, PackItem, PackLabel,
        PackSummary, User,
    },
    Database,
};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use ids::{new_pack_id, new_short_id, new_short_id_with, ShortIdConfig};
pub use settings::Settings;
pub use weights::{aggregate_weights, WeightSummary, WeightUnit};

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(settings.log_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // A second call (tests, embedding hosts) keeps the first logger.
    if builder.try_init().is_ok() {
        log::info!("gearpack logging initialized");
    }
}

/// Open the store described by `settings`, running migrations as needed.
pub fn open(settings: &Settings) -> Result<Database> {
    Database::with_short_id_config(settings.database_path.clone(), settings.short_id)
}
