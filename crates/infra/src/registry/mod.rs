//! Job registry implementations

mod memory;

pub use memory::InMemoryJobRegistry;
