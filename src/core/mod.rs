pub mod logging;

// Backend calls: edge-function gateway + response normalization
pub mod gateway;

// Async list loaders and the resources built on them
pub mod resource;
pub mod environments;
pub mod campaigns;
pub mod sessions;

pub mod workspace;
pub mod encounter;
pub mod admin;
