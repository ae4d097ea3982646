//! Byte-exact vertex layouts and the calls that bind them.
//!
//! A [`VertexFormat`] is an ordered list of elements. Element order fixes the
//! byte offsets, the generic attribute indices and the shader attribute
//! locations, so the same descriptor serves raw buffers, direct memory, VAOs
//! and wgpu pipelines.

use std::sync::LazyLock;

use tracing::info;

use crate::error::RenderError;
use crate::settings;

const GL_BYTE: u32 = 0x1400;
const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_SHORT: u32 = 0x1402;
const GL_UNSIGNED_SHORT: u32 = 0x1403;
const GL_INT: u32 = 0x1404;
const GL_UNSIGNED_INT: u32 = 0x1405;
const GL_FLOAT: u32 = 0x1406;
const GL_HALF_FLOAT: u32 = 0x140B;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl VertexElementType {
    pub const fn gl_constant(self) -> u32 {
        match self {
            VertexElementType::Byte => GL_BYTE,
            VertexElementType::UnsignedByte => GL_UNSIGNED_BYTE,
            VertexElementType::Short => GL_SHORT,
            VertexElementType::UnsignedShort => GL_UNSIGNED_SHORT,
            VertexElementType::Int => GL_INT,
            VertexElementType::UnsignedInt => GL_UNSIGNED_INT,
            VertexElementType::HalfFloat => GL_HALF_FLOAT,
            VertexElementType::Float => GL_FLOAT,
        }
    }

    pub const fn component_size(self) -> u32 {
        match self {
            VertexElementType::Byte | VertexElementType::UnsignedByte => 1,
            VertexElementType::Short
            | VertexElementType::UnsignedShort
            | VertexElementType::HalfFloat => 2,
            VertexElementType::Int | VertexElementType::UnsignedInt | VertexElementType::Float => 4,
        }
    }
}

/// What the encoder writes into an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementUsage {
    Position,
    Color,
    Uv,
    Lightmap,
    Normal,
    Material,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexFormatElement {
    /// Shader attribute name. Unnamed elements take layout space but are
    /// never bound by name.
    pub attribute_name: Option<&'static str>,
    pub usage: ElementUsage,
    pub component_count: u8,
    pub element_type: VertexElementType,
    pub normalized: bool,
    /// Component bytes rounded up to a 4-byte boundary.
    pub byte_size: u32,
}

impl VertexFormatElement {
    pub const fn new(
        attribute_name: Option<&'static str>,
        usage: ElementUsage,
        component_count: u8,
        element_type: VertexElementType,
        normalized: bool,
    ) -> Self {
        assert!(
            component_count >= 1 && component_count <= 4,
            "vertex elements have 1 to 4 components"
        );
        let raw = component_count as u32 * element_type.component_size();
        Self {
            attribute_name,
            usage,
            component_count,
            element_type,
            normalized,
            byte_size: (raw + 3) & !3,
        }
    }

    /// The wgpu format covering this element's full byte size, padding
    /// included.
    pub fn wgpu_format(&self) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as F;
        use VertexElementType as T;

        let slots = self.byte_size / self.element_type.component_size();
        let format = match (self.element_type, self.normalized, slots) {
            (T::Float, _, 1) => F::Float32,
            (T::Float, _, 2) => F::Float32x2,
            (T::Float, _, 3) => F::Float32x3,
            (T::Float, _, 4) => F::Float32x4,
            (T::HalfFloat, _, 2) => F::Float16x2,
            (T::HalfFloat, _, 4) => F::Float16x4,
            (T::UnsignedByte, true, 4) => F::Unorm8x4,
            (T::UnsignedByte, false, 4) => F::Uint8x4,
            (T::Byte, true, 4) => F::Snorm8x4,
            (T::Byte, false, 4) => F::Sint8x4,
            (T::UnsignedShort, true, 2) => F::Unorm16x2,
            (T::UnsignedShort, false, 2) => F::Uint16x2,
            (T::UnsignedShort, true, 4) => F::Unorm16x4,
            (T::UnsignedShort, false, 4) => F::Uint16x4,
            (T::Short, true, 2) => F::Snorm16x2,
            (T::Short, false, 2) => F::Sint16x2,
            (T::Short, true, 4) => F::Snorm16x4,
            (T::Short, false, 4) => F::Sint16x4,
            (T::UnsignedInt, false, 1) => F::Uint32,
            (T::UnsignedInt, false, 2) => F::Uint32x2,
            (T::UnsignedInt, false, 3) => F::Uint32x3,
            (T::UnsignedInt, false, 4) => F::Uint32x4,
            (T::Int, false, 1) => F::Sint32,
            (T::Int, false, 2) => F::Sint32x2,
            (T::Int, false, 3) => F::Sint32x3,
            (T::Int, false, 4) => F::Sint32x4,
            _ => return None,
        };
        Some(format)
    }
}

pub const POSITION_3F: VertexFormatElement = VertexFormatElement::new(
    None,
    ElementUsage::Position,
    3,
    VertexElementType::Float,
    false,
);
pub const BASE_RGBA_4UB: VertexFormatElement = VertexFormatElement::new(
    Some("in_color"),
    ElementUsage::Color,
    4,
    VertexElementType::UnsignedByte,
    true,
);
pub const BASE_TEX_2US: VertexFormatElement = VertexFormatElement::new(
    Some("in_uv"),
    ElementUsage::Uv,
    2,
    VertexElementType::UnsignedShort,
    true,
);
pub const LIGHTMAPS_4UB: VertexFormatElement = VertexFormatElement::new(
    Some("in_lightmap"),
    ElementUsage::Lightmap,
    4,
    VertexElementType::UnsignedByte,
    false,
);
pub const NORMAL_3B: VertexFormatElement = VertexFormatElement::new(
    Some("in_normal"),
    ElementUsage::Normal,
    3,
    VertexElementType::Byte,
    true,
);
pub const MATERIAL_2US: VertexFormatElement = VertexFormatElement::new(
    Some("in_material"),
    ElementUsage::Material,
    2,
    VertexElementType::UnsignedShort,
    false,
);

pub static TERRAIN_FORMAT: LazyLock<VertexFormat> = LazyLock::new(|| {
    VertexFormat::new([
        POSITION_3F,
        BASE_RGBA_4UB,
        BASE_TEX_2US,
        LIGHTMAPS_4UB,
        NORMAL_3B,
        MATERIAL_2US,
    ])
});

pub static ENTITY_FORMAT: LazyLock<VertexFormat> = LazyLock::new(|| {
    VertexFormat::new([
        POSITION_3F,
        BASE_RGBA_4UB,
        BASE_TEX_2US,
        LIGHTMAPS_4UB,
        NORMAL_3B,
    ])
});

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeSource {
    /// Offset from the start of the bound buffer object.
    BufferOffset(u64),
    /// Client memory address.
    Address(usize),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributePointer {
    pub index: u32,
    pub component_count: u8,
    pub gl_type: u32,
    pub normalized: bool,
    pub stride: u32,
    pub source: AttributeSource,
}

/// Graphics-API side of attribute binding.
pub trait AttributeBinder {
    /// Enables generic attributes `0..count` and disables every index above.
    fn enable_attributes(&mut self, count: u32);

    fn attribute_pointer(&mut self, pointer: AttributePointer);

    fn bind_attribute_location(&mut self, program: ProgramHandle, index: u32, name: &str);
}

/// Tracks how many generic attributes are enabled so a binder only issues
/// the enable/disable calls that change something.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeArrayState {
    enabled: u32,
}

impl AttributeArrayState {
    pub fn enabled(&self) -> u32 {
        self.enabled
    }

    pub fn set_enabled(&mut self, count: u32, mut apply: impl FnMut(u32, bool)) {
        let previous = self.enabled;
        if count > previous {
            for index in previous..count {
                apply(index, true);
            }
        } else {
            for index in count..previous {
                apply(index, false);
            }
        }
        self.enabled = count;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexFormat {
    elements: Box<[VertexFormatElement]>,
    offsets: Box<[u32]>,
    vertex_stride_bytes: u32,
    vertex_stride_ints: u32,
}

impl VertexFormat {
    pub fn new(elements: impl Into<Vec<VertexFormatElement>>) -> Self {
        let elements = elements.into().into_boxed_slice();
        debug_assert!(!elements.is_empty(), "vertex format needs at least one element");

        let mut offsets = Vec::with_capacity(elements.len());
        let mut bytes = 0u32;
        for element in elements.iter() {
            offsets.push(bytes);
            bytes += element.byte_size;
        }

        Self {
            elements,
            offsets: offsets.into_boxed_slice(),
            vertex_stride_bytes: bytes,
            vertex_stride_ints: bytes / 4,
        }
    }

    pub fn vertex_stride_bytes(&self) -> u32 {
        self.vertex_stride_bytes
    }

    pub fn vertex_stride_ints(&self) -> u32 {
        self.vertex_stride_ints
    }

    pub fn attribute_count(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn elements(&self) -> &[VertexFormatElement] {
        &self.elements
    }

    pub fn offset_of(&self, index: usize) -> Option<u32> {
        self.offsets.get(index).copied()
    }

    /// Enables generic vertex attributes and binds their location.
    /// For buffer objects not wrapped in a VAO.
    pub fn enable_and_bind_attributes<B: AttributeBinder + ?Sized>(
        &self,
        binder: &mut B,
        buffer_offset: u64,
    ) {
        binder.enable_attributes(self.attribute_count());
        self.bind_attribute_locations(binder, buffer_offset);
    }

    /// Enables generic vertex attributes and points every element into
    /// `memory`. For client-side scratch memory, not buffer objects.
    pub fn enable_direct<B: AttributeBinder + ?Sized>(&self, binder: &mut B, memory: &[u8]) {
        binder.enable_attributes(self.attribute_count());
        let base = memory.as_ptr() as usize;

        for (index, (element, offset)) in self.elements.iter().zip(self.offsets.iter()).enumerate() {
            let pointer = self.pointer(
                index as u32,
                element,
                AttributeSource::Address(base + *offset as usize),
            );
            if settings::log_gl_state_changes() {
                info!(
                    "GlState: glVertexAttribPointer({}, {}, {}, {}, {}) [direct non-VBO]",
                    pointer.index,
                    pointer.component_count,
                    pointer.gl_type,
                    pointer.normalized,
                    pointer.stride
                );
            }
            binder.attribute_pointer(pointer);
        }
    }

    pub fn disable_direct<B: AttributeBinder + ?Sized>(binder: &mut B) {
        binder.enable_attributes(0);
    }

    /// Binds attribute locations without enabling them. For use with VAOs,
    /// which own enablement; otherwise call
    /// [`enable_and_bind_attributes`](Self::enable_and_bind_attributes).
    pub fn bind_attribute_locations<B: AttributeBinder + ?Sized>(
        &self,
        binder: &mut B,
        buffer_offset: u64,
    ) {
        for (index, (element, offset)) in self.elements.iter().zip(self.offsets.iter()).enumerate() {
            if element.attribute_name.is_none() {
                continue;
            }

            let pointer = self.pointer(
                index as u32,
                element,
                AttributeSource::BufferOffset(buffer_offset + u64::from(*offset)),
            );
            if settings::log_gl_state_changes() {
                info!(
                    "GlState: glVertexAttribPointer({}, {}, {}, {}, {}, {})",
                    pointer.index,
                    pointer.component_count,
                    pointer.gl_type,
                    pointer.normalized,
                    pointer.stride,
                    buffer_offset + u64::from(*offset)
                );
            }
            binder.attribute_pointer(pointer);
        }
    }

    /// Binds shader attribute names. Index 0 stays with position.
    pub fn bind_program_attributes<B: AttributeBinder + ?Sized>(
        &self,
        binder: &mut B,
        program: ProgramHandle,
    ) {
        let mut index = 1;
        for element in self.elements.iter() {
            if let Some(name) = element.attribute_name {
                binder.bind_attribute_location(program, index, name);
                index += 1;
            }
        }
    }

    /// Attributes for a wgpu pipeline; shader location is the element index.
    pub fn wgpu_attributes(&self) -> Result<Vec<wgpu::VertexAttribute>, RenderError> {
        self.elements
            .iter()
            .zip(self.offsets.iter())
            .enumerate()
            .map(|(index, (element, offset))| {
                let format = element
                    .wgpu_format()
                    .ok_or(RenderError::UnsupportedElement {
                        usage: element.usage,
                        element_type: element.element_type,
                        component_count: element.component_count,
                        byte_size: element.byte_size,
                    })?;
                Ok(wgpu::VertexAttribute {
                    format,
                    offset: u64::from(*offset),
                    shader_location: index as u32,
                })
            })
            .collect()
    }

    pub fn buffer_layout<'a>(
        &self,
        attributes: &'a [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: wgpu::BufferAddress::from(self.vertex_stride_bytes),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    fn pointer(
        &self,
        index: u32,
        element: &VertexFormatElement,
        source: AttributeSource,
    ) -> AttributePointer {
        AttributePointer {
            index,
            component_count: element.component_count,
            gl_type: element.element_type.gl_constant(),
            normalized: element.normalized,
            stride: self.vertex_stride_bytes,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingBinder {
        state: AttributeArrayState,
        toggles: Vec<(u32, bool)>,
        pointers: Vec<AttributePointer>,
        locations: Vec<(ProgramHandle, u32, String)>,
    }

    impl AttributeBinder for RecordingBinder {
        fn enable_attributes(&mut self, count: u32) {
            let toggles = &mut self.toggles;
            self.state
                .set_enabled(count, |index, enabled| toggles.push((index, enabled)));
        }

        fn attribute_pointer(&mut self, pointer: AttributePointer) {
            self.pointers.push(pointer);
        }

        fn bind_attribute_location(&mut self, program: ProgramHandle, index: u32, name: &str) {
            self.locations.push((program, index, name.to_string()));
        }
    }

    fn unnamed(count: u8, element_type: VertexElementType) -> VertexFormatElement {
        VertexFormatElement::new(None, ElementUsage::Position, count, element_type, false)
    }

    #[test]
    fn stride_is_the_sum_of_element_sizes_and_offsets_are_prefix_sums() {
        let elements = vec![
            POSITION_3F,
            BASE_RGBA_4UB,
            unnamed(1, VertexElementType::Short),
            BASE_TEX_2US,
            unnamed(3, VertexElementType::HalfFloat),
        ];
        let sizes: Vec<u32> = elements.iter().map(|element| element.byte_size).collect();
        assert_eq!(sizes, vec![12, 4, 4, 4, 8]);

        let format = VertexFormat::new(elements);
        assert_eq!(format.attribute_count(), 5);
        assert_eq!(format.vertex_stride_bytes(), sizes.iter().sum::<u32>());
        assert_eq!(format.vertex_stride_ints(), 8);
        for index in 0..sizes.len() {
            let expected: u32 = sizes[..index].iter().sum();
            assert_eq!(format.offset_of(index), Some(expected));
        }
        assert_eq!(format.offset_of(5), None);
    }

    #[test]
    fn terrain_format_packs_into_eight_ints() {
        assert_eq!(TERRAIN_FORMAT.vertex_stride_bytes(), 32);
        assert_eq!(TERRAIN_FORMAT.vertex_stride_ints(), 8);
        assert_eq!(TERRAIN_FORMAT.attribute_count(), 6);
        assert_eq!(ENTITY_FORMAT.vertex_stride_bytes(), 28);
        assert_eq!(NORMAL_3B.byte_size, 4);
    }

    #[test]
    fn element_types_report_gl_type_codes() {
        assert_eq!(VertexElementType::Float.gl_constant(), 0x1406);
        assert_eq!(VertexElementType::UnsignedByte.gl_constant(), 0x1401);
        assert_eq!(VertexElementType::UnsignedShort.gl_constant(), 0x1403);
        assert_eq!(VertexElementType::Byte.gl_constant(), 0x1400);
        assert_eq!(VertexElementType::HalfFloat.gl_constant(), 0x140B);
    }

    #[test]
    fn buffer_binding_skips_unnamed_elements_but_keeps_their_space() {
        let mut binder = RecordingBinder::default();
        TERRAIN_FORMAT.enable_and_bind_attributes(&mut binder, 256);

        assert_eq!(binder.state.enabled(), 6);
        let bound: Vec<(u32, AttributeSource)> = binder
            .pointers
            .iter()
            .map(|pointer| (pointer.index, pointer.source))
            .collect();
        assert_eq!(
            bound,
            vec![
                (1, AttributeSource::BufferOffset(256 + 12)),
                (2, AttributeSource::BufferOffset(256 + 16)),
                (3, AttributeSource::BufferOffset(256 + 20)),
                (4, AttributeSource::BufferOffset(256 + 24)),
                (5, AttributeSource::BufferOffset(256 + 28)),
            ]
        );
        assert!(binder.pointers.iter().all(|pointer| pointer.stride == 32));
        let color = binder.pointers[0];
        assert_eq!(color.component_count, 4);
        assert_eq!(color.gl_type, 0x1401);
        assert!(color.normalized);
    }

    #[test]
    fn location_binding_leaves_enablement_alone() {
        let mut binder = RecordingBinder::default();
        TERRAIN_FORMAT.bind_attribute_locations(&mut binder, 0);
        assert!(binder.toggles.is_empty());
        assert_eq!(binder.state.enabled(), 0);
        assert_eq!(binder.pointers.len(), 5);
    }

    #[test]
    fn direct_binding_points_every_element_into_memory() {
        let mut binder = RecordingBinder::default();
        let scratch = vec![0u8; 4 * 32];
        let base = scratch.as_ptr() as usize;
        TERRAIN_FORMAT.enable_direct(&mut binder, &scratch);

        assert_eq!(binder.state.enabled(), 6);
        let bound: Vec<(u32, AttributeSource)> = binder
            .pointers
            .iter()
            .map(|pointer| (pointer.index, pointer.source))
            .collect();
        assert_eq!(
            bound,
            vec![
                (0, AttributeSource::Address(base)),
                (1, AttributeSource::Address(base + 12)),
                (2, AttributeSource::Address(base + 16)),
                (3, AttributeSource::Address(base + 20)),
                (4, AttributeSource::Address(base + 24)),
                (5, AttributeSource::Address(base + 28)),
            ]
        );
        assert_eq!(binder.pointers[0].gl_type, 0x1406);
    }

    #[test]
    fn disable_then_enable_matches_a_single_enable() {
        let mut fresh = RecordingBinder::default();
        TERRAIN_FORMAT.enable_and_bind_attributes(&mut fresh, 0);

        let mut reentered = RecordingBinder::default();
        VertexFormat::disable_direct(&mut reentered);
        VertexFormat::disable_direct(&mut reentered);
        TERRAIN_FORMAT.enable_and_bind_attributes(&mut reentered, 0);

        assert_eq!(reentered.state.enabled(), fresh.state.enabled());
        assert_eq!(reentered.toggles, fresh.toggles);
        assert_eq!(reentered.pointers, fresh.pointers);
    }

    #[test]
    fn disable_turns_off_everything_previously_enabled() {
        let mut binder = RecordingBinder::default();
        ENTITY_FORMAT.enable_and_bind_attributes(&mut binder, 0);
        binder.toggles.clear();
        VertexFormat::disable_direct(&mut binder);
        assert_eq!(binder.state.enabled(), 0);
        assert_eq!(
            binder.toggles,
            (0..5).map(|index| (index, false)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn program_attributes_start_at_one_and_keep_element_order() {
        let format = VertexFormat::new([
            POSITION_3F,
            BASE_TEX_2US,
            unnamed(2, VertexElementType::Float),
            BASE_RGBA_4UB,
            NORMAL_3B,
        ]);
        let mut binder = RecordingBinder::default();
        format.bind_program_attributes(&mut binder, ProgramHandle(7));

        let bound: Vec<(u32, &str)> = binder
            .locations
            .iter()
            .map(|(program, index, name)| {
                assert_eq!(*program, ProgramHandle(7));
                (*index, name.as_str())
            })
            .collect();
        assert_eq!(bound, vec![(1, "in_uv"), (2, "in_color"), (3, "in_normal")]);
    }

    #[test]
    fn wgpu_layout_matches_offsets_and_stride() {
        let attributes = TERRAIN_FORMAT
            .wgpu_attributes()
            .expect("terrain format maps to wgpu");
        let layout = TERRAIN_FORMAT.buffer_layout(&attributes);

        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
        let formats: Vec<wgpu::VertexFormat> =
            layout.attributes.iter().map(|attribute| attribute.format).collect();
        assert_eq!(
            formats,
            vec![
                wgpu::VertexFormat::Float32x3,
                wgpu::VertexFormat::Unorm8x4,
                wgpu::VertexFormat::Unorm16x2,
                wgpu::VertexFormat::Uint8x4,
                wgpu::VertexFormat::Snorm8x4,
                wgpu::VertexFormat::Uint16x2,
            ]
        );
        for (index, attribute) in layout.attributes.iter().enumerate() {
            assert_eq!(attribute.shader_location, index as u32);
            assert_eq!(Some(attribute.offset as u32), TERRAIN_FORMAT.offset_of(index));
        }
    }

    #[test]
    fn wgpu_mapping_rejects_shapes_without_a_vertex_format() {
        let normalized_ints = VertexFormatElement::new(
            Some("in_weights"),
            ElementUsage::Material,
            2,
            VertexElementType::UnsignedInt,
            true,
        );
        let format = VertexFormat::new([POSITION_3F, normalized_ints]);
        let err = format
            .wgpu_attributes()
            .expect_err("normalized 32-bit ints have no wgpu format");
        assert!(matches!(
            err,
            RenderError::UnsupportedElement {
                usage: ElementUsage::Material,
                ..
            }
        ));
    }
}
