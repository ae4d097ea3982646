use glam::{Mat3, Mat4};
use quarry_shared::light::{block_byte, overlay_u, overlay_v, sky_byte};

use crate::error::RenderError;
use crate::renderer::buffer::VertexSink;
use crate::renderer::format::{ElementUsage, VertexElementType, VertexFormatElement};
use crate::renderer::quad::QuadEditor;

/// Transform state for one draw plus the scratch vertex it encodes into.
#[derive(Debug, Clone)]
pub struct EncodingContext {
    matrix: Mat4,
    normal_matrix: Mat3,
    scratch: Vec<u32>,
}

impl Default for EncodingContext {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            scratch: Vec::with_capacity(16),
        }
    }
}

impl EncodingContext {
    pub fn prepare(&mut self, transform: &Mat4) {
        self.matrix = *transform;
        self.normal_matrix = Mat3::from_mat4(*transform).inverse().transpose();
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Writes the quad's four vertices into `sink`, each attribute in the
    /// order the sink's format lists it.
    pub fn encode_quad(
        &mut self,
        quad: &QuadEditor,
        overlay: u32,
        sink: &mut dyn VertexSink,
    ) -> Result<(), RenderError> {
        let normal = self.normal_matrix.mul_vec3(quad.normal).normalize_or_zero();
        let material = u32::from(quad.material.index())
            | (u32::from(overlay_u(overlay)) | u32::from(overlay_v(overlay)) << 8) << 16;

        for corner in 0..4 {
            self.scratch.clear();
            for element in sink.format().elements() {
                check_shape(element)?;
                match element.usage {
                    ElementUsage::Position => {
                        let position = self.matrix.transform_point3(quad.positions[corner]);
                        self.scratch.extend_from_slice(&[
                            position.x.to_bits(),
                            position.y.to_bits(),
                            position.z.to_bits(),
                        ]);
                    }
                    ElementUsage::Color => self.scratch.push(argb_to_abgr(quad.colors[corner])),
                    ElementUsage::Uv => {
                        let uv = quad.uvs[corner];
                        self.scratch.push(unorm16(uv.x) | unorm16(uv.y) << 16);
                    }
                    ElementUsage::Lightmap => {
                        let light = quad.lightmaps[corner];
                        let ao = (quad.ao[corner].clamp(0.0, 1.0) * 255.0).round() as u32;
                        self.scratch.push(
                            u32::from(block_byte(light))
                                | u32::from(sky_byte(light)) << 8
                                | ao << 16,
                        );
                    }
                    ElementUsage::Normal => {
                        self.scratch
                            .push(snorm8(normal.x) | snorm8(normal.y) << 8 | snorm8(normal.z) << 16);
                    }
                    ElementUsage::Material => self.scratch.push(material),
                }
            }
            sink.push_vertex(&self.scratch);
        }

        Ok(())
    }
}

/// Element shapes the encoder knows how to fill.
fn check_shape(element: &VertexFormatElement) -> Result<(), RenderError> {
    use VertexElementType as T;

    let supported = match element.usage {
        ElementUsage::Position => {
            element.element_type == T::Float && element.component_count == 3
        }
        ElementUsage::Color | ElementUsage::Lightmap => {
            element.element_type == T::UnsignedByte && element.component_count == 4
        }
        ElementUsage::Uv | ElementUsage::Material => {
            element.element_type == T::UnsignedShort && element.component_count == 2
        }
        ElementUsage::Normal => element.element_type == T::Byte && element.component_count == 3,
    };

    if supported {
        Ok(())
    } else {
        Err(RenderError::UnsupportedElement {
            usage: element.usage,
            element_type: element.element_type,
            component_count: element.component_count,
            byte_size: element.byte_size,
        })
    }
}

/// ARGB to the little-endian RGBA byte order the color attribute reads.
fn argb_to_abgr(argb: u32) -> u32 {
    let a = argb >> 24 & 0xFF;
    let r = argb >> 16 & 0xFF;
    let g = argb >> 8 & 0xFF;
    let b = argb & 0xFF;
    r | g << 8 | b << 16 | a << 24
}

fn unorm16(value: f32) -> u32 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u32
}

fn snorm8(value: f32) -> u32 {
    ((value.clamp(-1.0, 1.0) * 127.0).round() as i8) as u8 as u32
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use quarry_shared::coords::Direction;
    use quarry_shared::light::{pack_light, pack_overlay};

    use super::{argb_to_abgr, EncodingContext};
    use crate::error::RenderError;
    use crate::renderer::buffer::{VertexBuffer, VertexSink};
    use crate::renderer::format::{
        ElementUsage, VertexElementType, VertexFormat, VertexFormatElement, POSITION_3F,
        TERRAIN_FORMAT,
    };
    use crate::renderer::material::{Preset, RenderMaterial};
    use crate::renderer::quad::{BakedQuad, QuadEditor};

    fn up_quad() -> QuadEditor {
        let mut quad = QuadEditor::default();
        quad.load(&BakedQuad::cube_face(Direction::Up, 0).with_color(0x8011_2233));
        quad
    }

    #[test]
    fn color_is_reordered_for_byte_reads() {
        assert_eq!(argb_to_abgr(0x8011_2233), 0x8033_2211);
        assert_eq!(argb_to_abgr(0x8011_2233).to_le_bytes(), [0x11, 0x22, 0x33, 0x80]);
    }

    #[test]
    fn terrain_vertex_layout_is_byte_exact() {
        let mut encoder = EncodingContext::default();
        encoder.prepare(&Mat4::from_translation(Vec3::new(10.0, 0.0, -2.0)));
        let mut quad = up_quad();
        quad.lightmaps = [pack_light(5, 15); 4];
        quad.ao = [1.0, 0.5, 0.0, 1.0];
        quad.material = RenderMaterial {
            preset: Preset::Solid,
            ..RenderMaterial::DEFAULT
        };
        let mut buffer = VertexBuffer::new(&TERRAIN_FORMAT);

        encoder
            .encode_quad(&quad, pack_overlay(6, 3), &mut buffer)
            .expect("terrain format encodes");
        assert_eq!(buffer.vertex_count(), 4);

        let second = buffer.vertex(1).expect("second vertex");
        assert_eq!(f32::from_bits(second[0]), 10.0);
        assert_eq!(f32::from_bits(second[1]), 1.0);
        assert_eq!(f32::from_bits(second[2]), -1.0);
        assert_eq!(second[3].to_le_bytes(), [0x11, 0x22, 0x33, 0x80]);
        assert_eq!(second[4], 65535 << 16);
        assert_eq!(second[5].to_le_bytes(), [5 << 4, 15 << 4, 128, 0]);
        assert_eq!(second[6].to_le_bytes(), [0, 127, 0, 0]);
        assert_eq!(second[7], 1 | (6 | 3 << 8) << 16);

        let third = buffer.vertex(2).expect("third vertex");
        assert_eq!(third[5].to_le_bytes()[2], 0);
    }

    #[test]
    fn formats_without_an_element_simply_omit_it() {
        static POSITION_ONLY: std::sync::LazyLock<VertexFormat> =
            std::sync::LazyLock::new(|| VertexFormat::new([POSITION_3F]));
        let mut encoder = EncodingContext::default();
        encoder.prepare(&Mat4::IDENTITY);
        let mut buffer = VertexBuffer::new(&POSITION_ONLY);

        encoder
            .encode_quad(&up_quad(), 0, &mut buffer)
            .expect("position-only format encodes");
        assert_eq!(buffer.words().len(), 12);
        assert_eq!(buffer.format().vertex_stride_ints(), 3);
    }

    #[test]
    fn unknown_element_shapes_are_rejected() {
        static FLOAT_COLOR: std::sync::LazyLock<VertexFormat> = std::sync::LazyLock::new(|| {
            VertexFormat::new([
                POSITION_3F,
                VertexFormatElement::new(
                    Some("in_color"),
                    ElementUsage::Color,
                    4,
                    VertexElementType::Float,
                    false,
                ),
            ])
        });
        let mut encoder = EncodingContext::default();
        let mut buffer = VertexBuffer::new(&FLOAT_COLOR);

        let err = encoder
            .encode_quad(&up_quad(), 0, &mut buffer)
            .expect_err("float colors are not encodable");
        assert!(matches!(
            err,
            RenderError::UnsupportedElement {
                usage: ElementUsage::Color,
                element_type: VertexElementType::Float,
                ..
            }
        ));
        assert!(buffer.is_empty());
    }
}
