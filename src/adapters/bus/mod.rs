//! Bus Adapters - In-process Message Transport

pub mod memory;

pub use memory::MemoryBus;
