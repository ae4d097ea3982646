pub mod base;
pub mod buffer;
pub mod context;
pub mod encode;
pub mod format;
pub mod material;
pub mod pool;
pub mod quad;

pub use context::EntityBlockRenderContext;
