pub mod file;
pub mod memory;

pub use file::PersistentCache;
pub use memory::SessionCache;
