/// Archive discovery, extraction, and the store's filesystem primitives.
pub mod fs;
