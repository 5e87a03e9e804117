//! Stream scheduling utilities

mod ticker;

pub use ticker::Ticker;
