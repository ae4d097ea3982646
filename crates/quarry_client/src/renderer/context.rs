use std::sync::Arc;

use glam::{DVec3, Mat4};
use quarry_shared::block::{BlockState, BlockView, RenderLayer};
use quarry_shared::coords::BlockPos;
use quarry_shared::entity::EntitySource;

use crate::error::RenderError;
use crate::renderer::base::{
    compute_flat_simple, BaseBlockRenderer, BlockInputContext, BlockRenderHooks,
};
use crate::renderer::buffer::{BufferSource, VertexSink};
use crate::renderer::material::{MaterialFinder, MaterialMap, Preset};
use crate::renderer::quad::{BakedModel, QuadEditor};

/// Seed handed to models for variant selection. Entity-drawn blocks always
/// pick the same variant.
pub const ENTITY_BLOCK_SEED: u64 = 42;

/// Lighting hooks for blocks drawn by entities: one light value for the whole
/// draw and never any ambient occlusion.
#[derive(Debug, Default)]
struct EntityLighting {
    light: u32,
}

impl BlockRenderHooks for EntityLighting {
    fn brightness(&self) -> u32 {
        self.light
    }

    /// Boundary faces take the entity's light too, never the world's.
    fn fast_brightness(&self, _input: &BlockInputContext, _pos: BlockPos) -> u32 {
        self.light
    }

    fn adjust_material(&self, finder: &mut MaterialFinder) {
        finder.disable_ao(true);
    }

    fn compute_ao(&self, _input: &BlockInputContext, _quad: &mut QuadEditor) {}

    fn compute_flat(&self, input: &BlockInputContext, quad: &mut QuadEditor) {
        compute_flat_simple(self, input, quad);
    }
}

/// Renders blocks that are carried by, or stand in for, an entity: falling
/// blocks, minecarts with a block inside, item frame contents.
///
/// One instance per thread is kept in [`pool`](crate::renderer::pool).
#[derive(Default)]
pub struct EntityBlockRenderContext {
    base: BaseBlockRenderer,
    lighting: EntityLighting,
    pos: BlockPos,
    world: Option<Arc<dyn BlockView>>,
    tick_delta: f32,
    active_layer: Option<RenderLayer>,
}

impl EntityBlockRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tick_delta(&mut self, tick_delta: f32) {
        self.tick_delta = if tick_delta.is_nan() {
            0.0
        } else {
            tick_delta.clamp(0.0, 1.0)
        };
    }

    pub fn tick_delta(&self) -> f32 {
        self.tick_delta
    }

    /// Places the context at the entity's interpolated eye position and
    /// captures its world. `None` leaves position and world as they were.
    pub fn set_pos_and_world_from_entity(&mut self, entity: Option<&dyn EntitySource>) {
        let Some(entity) = entity else {
            return;
        };
        let t = f64::from(self.tick_delta);
        let eye = DVec3::new(
            lerp(t, entity.previous_position().x, entity.position().x),
            lerp(t, entity.previous_position().y, entity.position().y)
                + f64::from(entity.eye_height()),
            lerp(t, entity.previous_position().z, entity.position().z),
        );
        self.pos.set_containing(eye);
        self.world = Some(entity.world());
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn has_world(&self) -> bool {
        self.world.is_some()
    }

    /// Light passed to the most recent render call.
    pub fn brightness(&self) -> u32 {
        self.lighting.light
    }

    pub fn base(&self) -> &BaseBlockRenderer {
        &self.base
    }

    /// Layer currently being written, set only while a render call runs.
    pub fn active_layer(&self) -> Option<RenderLayer> {
        self.active_layer
    }

    /// Draws `model` as `state` at the position set from the entity.
    pub fn render_block(
        &mut self,
        model: &dyn BakedModel,
        state: BlockState,
        transform: &Mat4,
        consumers: &mut dyn BufferSource,
        overlay: u32,
        light: u32,
    ) -> Result<(), RenderError> {
        let layer = state.entity_render_layer();
        self.begin(layer, transform, light);
        self.base.prepare_for_block(
            state,
            self.pos,
            model.use_ambient_occlusion(),
            ENTITY_BLOCK_SEED,
            overlay,
        );
        self.emit(model, consumers.buffer(layer))
    }

    /// Draws the block model shown inside an item frame. The frame's block
    /// position is used as is, with no interpolation or eye offset.
    pub fn render_item_frame(
        &mut self,
        model: &dyn BakedModel,
        transform: &Mat4,
        consumers: &mut dyn BufferSource,
        overlay: u32,
        light: u32,
        frame: &dyn EntitySource,
    ) -> Result<(), RenderError> {
        let layer = RenderLayer::Solid;
        self.begin(layer, transform, light);
        self.pos.set_containing(frame.position());
        self.base
            .prepare_for_block(BlockState::AIR, self.pos, false, ENTITY_BLOCK_SEED, overlay);
        self.base.set_material_map(MaterialMap::default_map());
        self.base.set_default_preset(Preset::Solid);
        self.emit(model, consumers.buffer(layer))
    }

    fn begin(&mut self, layer: RenderLayer, transform: &Mat4, light: u32) {
        self.active_layer = Some(layer);
        self.lighting.light = light;
        self.base.prepare_encoding(transform);
        self.base.input_mut().prepare_for_world(self.world.clone(), false);
    }

    fn emit(
        &mut self,
        model: &dyn BakedModel,
        sink: &mut dyn VertexSink,
    ) -> Result<(), RenderError> {
        let result = self.base.render_model(&self.lighting, model, sink);
        self.base.release();
        self.active_layer = None;
        result
    }
}

impl std::fmt::Debug for EntityBlockRenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBlockRenderContext")
            .field("pos", &self.pos)
            .field("has_world", &self.world.is_some())
            .field("tick_delta", &self.tick_delta)
            .field("light", &self.lighting.light)
            .field("active_layer", &self.active_layer)
            .finish_non_exhaustive()
    }
}

fn lerp(t: f64, start: f64, end: f64) -> f64 {
    start + t * (end - start)
}
