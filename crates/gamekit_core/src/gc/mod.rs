//! Epoch-based reclamation and the lock-free structures built on it.

mod epoch;
mod index_map;

pub use epoch::{Epoch, EpochCollector};
pub use index_map::ConcurrentIndexMap;
