//! geosketch-core: shared types for the GeoSketch share-link toolkit
//!
//! - `config`: TOML configuration schema
//! - `error`: crate-wide error type
//! - `types`: collaborator traits between the link codec and the application
//! - `wkt`: WKT geometry parsing and rendering (GeoJSON via serde)
//! - `table`: the tab-separated feature table exchanged in share links

pub mod config;
pub mod error;
pub mod table;
pub mod types;
pub mod wkt;

pub use error::{GeosketchError, GeosketchResult};
pub use table::{Feature, FeatureTable, GeometryFilter};
pub use types::{PasswordPrompt, PayloadSink, PayloadSource, PromptPurpose};
pub use wkt::{Geometry, GeometryKind};
