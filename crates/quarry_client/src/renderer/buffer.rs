use quarry_shared::block::RenderLayer;
use rustc_hash::FxHashMap;

use crate::renderer::format::VertexFormat;

/// Destination for encoded vertices.
pub trait VertexSink {
    fn format(&self) -> &VertexFormat;

    /// Appends one vertex; `words` is exactly one stride of the sink's format.
    fn push_vertex(&mut self, words: &[u32]);
}

/// Hands out the sink for a render layer.
pub trait BufferSource {
    fn buffer(&mut self, layer: RenderLayer) -> &mut dyn VertexSink;
}

#[derive(Debug, Clone)]
pub struct VertexBuffer {
    format: &'static VertexFormat,
    data: Vec<u32>,
}

impl VertexBuffer {
    pub fn new(format: &'static VertexFormat) -> Self {
        Self {
            format,
            data: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.format.vertex_stride_ints() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Words of the `index`-th vertex.
    pub fn vertex(&self, index: usize) -> Option<&[u32]> {
        let stride = self.format.vertex_stride_ints() as usize;
        self.data.get(index * stride..(index + 1) * stride)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl VertexSink for VertexBuffer {
    fn format(&self) -> &VertexFormat {
        self.format
    }

    fn push_vertex(&mut self, words: &[u32]) {
        debug_assert_eq!(words.len(), self.format.vertex_stride_ints() as usize);
        self.data.extend_from_slice(words);
    }
}

/// One [`VertexBuffer`] per render layer, created on first use.
#[derive(Debug, Clone)]
pub struct LayeredBuffers {
    format: &'static VertexFormat,
    buffers: FxHashMap<RenderLayer, VertexBuffer>,
}

impl LayeredBuffers {
    pub fn new(format: &'static VertexFormat) -> Self {
        Self {
            format,
            buffers: FxHashMap::default(),
        }
    }

    pub fn get(&self, layer: RenderLayer) -> Option<&VertexBuffer> {
        self.buffers.get(&layer)
    }

    pub fn vertex_count(&self, layer: RenderLayer) -> usize {
        self.get(layer).map_or(0, VertexBuffer::vertex_count)
    }

    pub fn total_vertex_count(&self) -> usize {
        self.buffers.values().map(VertexBuffer::vertex_count).sum()
    }
}

impl BufferSource for LayeredBuffers {
    fn buffer(&mut self, layer: RenderLayer) -> &mut dyn VertexSink {
        let format = self.format;
        self.buffers
            .entry(layer)
            .or_insert_with(|| VertexBuffer::new(format))
    }
}

#[cfg(test)]
mod tests {
    use quarry_shared::block::RenderLayer;

    use super::{BufferSource, LayeredBuffers, VertexBuffer, VertexSink};
    use crate::renderer::format::TERRAIN_FORMAT;

    #[test]
    fn buffer_counts_whole_vertices() {
        let mut buffer = VertexBuffer::new(&TERRAIN_FORMAT);
        assert!(buffer.is_empty());
        buffer.push_vertex(&[1, 2, 3, 4, 5, 6, 7, 8]);
        buffer.push_vertex(&[9; 8]);

        assert_eq!(buffer.vertex_count(), 2);
        assert_eq!(buffer.vertex(1), Some(&[9u32; 8][..]));
        assert_eq!(buffer.vertex(2), None);
        assert_eq!(buffer.as_bytes().len(), 64);
        assert_eq!(&buffer.as_bytes()[..4], &1u32.to_ne_bytes());

        buffer.clear();
        assert_eq!(buffer.vertex_count(), 0);
    }

    #[test]
    fn layered_buffers_keep_layers_apart() {
        let mut buffers = LayeredBuffers::new(&TERRAIN_FORMAT);
        buffers.buffer(RenderLayer::Cutout).push_vertex(&[0; 8]);
        buffers.buffer(RenderLayer::Solid).push_vertex(&[0; 8]);
        buffers.buffer(RenderLayer::Solid).push_vertex(&[0; 8]);

        assert_eq!(buffers.vertex_count(RenderLayer::Solid), 2);
        assert_eq!(buffers.vertex_count(RenderLayer::Cutout), 1);
        assert_eq!(buffers.vertex_count(RenderLayer::Translucent), 0);
        assert!(buffers.get(RenderLayer::Translucent).is_none());
        assert_eq!(buffers.total_vertex_count(), 3);
    }
}
