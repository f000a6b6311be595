//! Pure indicator functions over close-price sequences.

pub mod ema;

pub use ema::ema;
