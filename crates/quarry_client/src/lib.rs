pub mod error;
pub mod render_worker;
pub mod renderer;
pub mod settings;

pub use error::RenderError;
