//! The pipeline stages, in execution order.

mod decompile;
mod download;
mod mappings;
mod remap;
mod repository;
mod resources;

pub use self::decompile::Decompile;
pub use self::download::Download;
pub use self::mappings::{FetchMcpMappings, FetchSrgMappings, LIVE_MAPPING_FILES};
pub use self::remap::ApplyMappings;
pub use self::repository::{
    apply_patches, generate_patches, initialize_repository, safeguard, workflow,
};
pub use self::resources::extract_resources;
