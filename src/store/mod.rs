pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::{Fault, MemoryStore};
