//! Pure display derivations over API results. Nothing here performs I/O.

pub mod batch;
pub mod format;
pub mod news;
pub mod normalize;
pub mod timeline;
pub mod words;

pub use normalize::{clamp01, clamp_text, pct, to01, to_pct};
