use crate::renderer::format::{ElementUsage, VertexElementType};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("model failed to render: {0}")]
    Model(String),
    #[error(
        "{usage:?} element of {component_count} x {element_type:?} ({byte_size} bytes) has no encoding"
    )]
    UnsupportedElement {
        usage: ElementUsage,
        element_type: VertexElementType,
        component_count: u8,
        byte_size: u32,
    },
}
