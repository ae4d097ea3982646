use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3};
use quarry_shared::coords::{BlockPos, Direction};
use rustc_hash::FxHasher;

use crate::error::RenderError;
use crate::renderer::base::BlockInputContext;
use crate::renderer::material::RenderMaterial;

const WHITE: u32 = 0xFFFF_FFFF;
const FACE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

/// One baked quad: four corners in model space, counter-clockwise seen from
/// the front.
#[derive(Clone, Debug, PartialEq)]
pub struct BakedQuad {
    pub positions: [Vec3; 4],
    pub uvs: [Vec2; 4],
    /// ARGB per corner.
    pub colors: [u32; 4],
    /// Baked-in packed light per corner, usually zero.
    pub lightmaps: [u32; 4],
    pub face: Direction,
    pub cull_face: Option<Direction>,
    pub sprite: u32,
    pub material: RenderMaterial,
}

impl BakedQuad {
    /// Full face of the unit cube on `face`, culled against the neighbor on
    /// that side.
    pub fn cube_face(face: Direction, sprite: u32) -> Self {
        let positions = match face {
            Direction::Down => [
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            Direction::Up => [
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            Direction::North => [
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            Direction::South => [
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
            ],
            Direction::West => [
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            Direction::East => [
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
        };

        Self {
            positions,
            uvs: FACE_UVS,
            colors: [WHITE; 4],
            lightmaps: [0; 4],
            face,
            cull_face: Some(face),
            sprite,
            material: RenderMaterial::DEFAULT,
        }
    }

    pub fn with_material(mut self, material: RenderMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_color(mut self, argb: u32) -> Self {
        self.colors = [argb; 4];
        self
    }

    pub fn without_cull_face(mut self) -> Self {
        self.cull_face = None;
        self
    }

    pub fn normal(&self) -> Vec3 {
        face_normal(&self.positions)
    }
}

fn face_normal(positions: &[Vec3; 4]) -> Vec3 {
    (positions[2] - positions[0])
        .cross(positions[3] - positions[1])
        .normalize_or_zero()
}

/// Working copy of the quad being emitted. Reused for every quad a context
/// emits.
#[derive(Clone, Debug)]
pub struct QuadEditor {
    pub positions: [Vec3; 4],
    pub uvs: [Vec2; 4],
    pub colors: [u32; 4],
    pub lightmaps: [u32; 4],
    /// AO shade per corner, 1.0 is unoccluded.
    pub ao: [f32; 4],
    pub normal: Vec3,
    pub face: Direction,
    pub cull_face: Option<Direction>,
    pub sprite: u32,
    pub material: RenderMaterial,
}

impl Default for QuadEditor {
    fn default() -> Self {
        Self {
            positions: [Vec3::ZERO; 4],
            uvs: [Vec2::ZERO; 4],
            colors: [WHITE; 4],
            lightmaps: [0; 4],
            ao: [1.0; 4],
            normal: Vec3::Y,
            face: Direction::Up,
            cull_face: None,
            sprite: 0,
            material: RenderMaterial::DEFAULT,
        }
    }
}

impl QuadEditor {
    pub fn load(&mut self, quad: &BakedQuad) {
        self.positions = quad.positions;
        self.uvs = quad.uvs;
        self.colors = quad.colors;
        self.lightmaps = quad.lightmaps;
        self.ao = [1.0; 4];
        self.normal = face_normal(&quad.positions);
        self.face = quad.face;
        self.cull_face = quad.cull_face;
        self.sprite = quad.sprite;
        self.material = quad.material;
    }
}

/// Receives the quads of a model, in the order the model produces them.
pub trait QuadSink {
    fn emit(&mut self, quad: &BakedQuad) -> Result<(), RenderError>;
}

pub trait BakedModel: Send + Sync {
    fn use_ambient_occlusion(&self) -> bool;

    /// Emits this model's quads for the block described by `input`.
    fn render_as_block(
        &self,
        input: &BlockInputContext,
        emitter: &mut dyn QuadSink,
    ) -> Result<(), RenderError>;
}

/// Model with one or more fixed quad lists. The variant is picked from the
/// block position and the context's seed.
#[derive(Clone, Debug)]
pub struct SimpleModel {
    variants: Vec<Vec<BakedQuad>>,
    ambient_occlusion: bool,
}

impl SimpleModel {
    pub fn new(quads: Vec<BakedQuad>, ambient_occlusion: bool) -> Self {
        Self::with_variants(vec![quads], ambient_occlusion)
    }

    pub fn with_variants(variants: Vec<Vec<BakedQuad>>, ambient_occlusion: bool) -> Self {
        debug_assert!(!variants.is_empty(), "model needs at least one variant");
        Self {
            variants,
            ambient_occlusion,
        }
    }

    pub fn cube(sprite: u32, ambient_occlusion: bool) -> Self {
        let quads = Direction::ALL
            .into_iter()
            .map(|face| BakedQuad::cube_face(face, sprite))
            .collect();
        Self::new(quads, ambient_occlusion)
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    pub fn select_variant(&self, pos: BlockPos, seed: u64) -> &[BakedQuad] {
        if self.variants.len() == 1 {
            return &self.variants[0];
        }
        let mut hasher = FxHasher::default();
        pos.hash(&mut hasher);
        seed.hash(&mut hasher);
        let index = (hasher.finish() % self.variants.len() as u64) as usize;
        &self.variants[index]
    }
}

impl BakedModel for SimpleModel {
    fn use_ambient_occlusion(&self) -> bool {
        self.ambient_occlusion
    }

    fn render_as_block(
        &self,
        input: &BlockInputContext,
        emitter: &mut dyn QuadSink,
    ) -> Result<(), RenderError> {
        for quad in self.select_variant(input.pos(), input.random_seed()) {
            emitter.emit(quad)?;
        }
        Ok(())
    }
}
