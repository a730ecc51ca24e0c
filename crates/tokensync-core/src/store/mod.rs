// # Record Store Implementations
//
// This module provides implementations of the RecordStore trait for
// different persistence strategies.

pub mod memory;
pub mod yaml_dir;

pub use memory::MemoryStore;
pub use yaml_dir::YamlDirStore;
