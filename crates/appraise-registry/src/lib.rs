mod registry;
mod shared;

pub use registry::CapabilityRegistry;
pub use shared::SharedRegistry;
