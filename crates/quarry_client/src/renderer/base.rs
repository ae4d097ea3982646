//! Generic block quad-emission driver.
//!
//! The driver resolves each quad's material, lights it and encodes it. The
//! points where render contexts differ are collected in
//! [`BlockRenderHooks`].

use std::sync::Arc;

use glam::Mat4;
use quarry_shared::block::{BlockState, BlockView};
use quarry_shared::coords::{BlockPos, Direction};
use quarry_shared::light::{max_brightness, FULL_BRIGHT};

use crate::error::RenderError;
use crate::renderer::buffer::VertexSink;
use crate::renderer::encode::EncodingContext;
use crate::renderer::material::{MaterialFinder, MaterialMap, Preset, RenderMaterial};
use crate::renderer::quad::{BakedModel, BakedQuad, QuadEditor, QuadSink};
use crate::settings;

/// Data source handed to a model while it renders as a block.
#[derive(Clone, Default)]
pub struct BlockInputContext {
    world: Option<Arc<dyn BlockView>>,
    fake_world: bool,
    block_state: BlockState,
    pos: BlockPos,
    seed: u64,
    overlay: u32,
}

impl BlockInputContext {
    pub fn prepare_for_world(&mut self, world: Option<Arc<dyn BlockView>>, fake_world: bool) {
        self.world = world;
        self.fake_world = fake_world;
    }

    pub fn prepare_for_block(&mut self, state: BlockState, pos: BlockPos, seed: u64, overlay: u32) {
        self.block_state = state;
        self.pos = pos;
        self.seed = seed;
        self.overlay = overlay;
    }

    pub fn world(&self) -> Option<&dyn BlockView> {
        self.world.as_deref()
    }

    pub fn is_fake_world(&self) -> bool {
        self.fake_world
    }

    pub fn block_state(&self) -> BlockState {
        self.block_state
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn random_seed(&self) -> u64 {
        self.seed
    }

    pub fn overlay(&self) -> u32 {
        self.overlay
    }

    /// Drops the world reference once a render call is over.
    pub fn release(&mut self) {
        self.world = None;
    }
}

impl std::fmt::Debug for BlockInputContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockInputContext")
            .field("has_world", &self.world.is_some())
            .field("fake_world", &self.fake_world)
            .field("block_state", &self.block_state)
            .field("pos", &self.pos)
            .field("seed", &self.seed)
            .field("overlay", &self.overlay)
            .finish()
    }
}

/// Extension points of the emission driver.
pub trait BlockRenderHooks {
    /// Light for faces that are not flush with the block boundary.
    fn brightness(&self) -> u32;

    /// Light sampled at `pos`, used for faces flush with the block boundary.
    fn fast_brightness(&self, input: &BlockInputContext, pos: BlockPos) -> u32 {
        input.world().map_or(FULL_BRIGHT, |world| world.brightness(pos))
    }

    /// Called after the driver's own material adjustments.
    fn adjust_material(&self, _finder: &mut MaterialFinder) {}

    fn compute_ao(&self, input: &BlockInputContext, quad: &mut QuadEditor);

    fn compute_flat(&self, input: &BlockInputContext, quad: &mut QuadEditor);
}

/// One light value for the whole quad, merged into any baked-in light.
pub fn compute_flat_simple<H: BlockRenderHooks + ?Sized>(
    hooks: &H,
    input: &BlockInputContext,
    quad: &mut QuadEditor,
) {
    let light = flat_brightness(hooks, input, quad);
    for corner in 0..4 {
        quad.lightmaps[corner] = max_brightness(quad.lightmaps[corner], light);
        quad.ao[corner] = 1.0;
    }
}

fn flat_brightness<H: BlockRenderHooks + ?Sized>(
    hooks: &H,
    input: &BlockInputContext,
    quad: &QuadEditor,
) -> u32 {
    match quad.cull_face {
        Some(face) => hooks.fast_brightness(input, input.pos().relative(face)),
        None => hooks.brightness(),
    }
}

fn diffuse_shade(face: Direction) -> f32 {
    match face {
        Direction::Down => 0.5,
        Direction::Up => 1.0,
        Direction::North | Direction::South => 0.8,
        Direction::West | Direction::East => 0.6,
    }
}

fn shade_argb(argb: u32, shade: f32) -> u32 {
    let scale = |channel: u32| ((channel as f32 * shade).round() as u32).min(255);
    let a = argb & 0xFF00_0000;
    let r = scale(argb >> 16 & 0xFF);
    let g = scale(argb >> 8 & 0xFF);
    let b = scale(argb & 0xFF);
    a | r << 16 | g << 8 | b
}

/// Per-draw emission state shared by every quad of one model.
#[derive(Debug)]
pub struct EmitState {
    encoder: EncodingContext,
    finder: MaterialFinder,
    quad: QuadEditor,
    material_map: Arc<MaterialMap>,
    default_ao: bool,
    default_preset: Preset,
}

impl Default for EmitState {
    fn default() -> Self {
        Self {
            encoder: EncodingContext::default(),
            finder: MaterialFinder::default(),
            quad: QuadEditor::default(),
            material_map: MaterialMap::default_map(),
            default_ao: true,
            default_preset: Preset::Default,
        }
    }
}

impl EmitState {
    fn resolve_material<H: BlockRenderHooks + ?Sized>(
        &mut self,
        hooks: &H,
        input: &BlockInputContext,
    ) -> RenderMaterial {
        let finder = &mut self.finder;
        finder.copy_from(&self.quad.material);
        if let Some(mapped) = self.material_map.get(self.quad.sprite) {
            finder.copy_from(mapped);
        }

        if finder.current_preset() == Preset::Default {
            let preset = match self.default_preset {
                Preset::Default => Preset::from_layer(input.block_state().layer),
                preset => preset,
            };
            finder.preset(preset);
        }
        if !self.default_ao {
            finder.disable_ao(true);
        }
        if finder.is_emissive() {
            finder.disable_ao(true).disable_diffuse(true);
        }

        hooks.adjust_material(finder);
        finder.find()
    }
}

/// Quad sink bound to one draw: every emitted quad goes through material
/// resolution, lighting and encoding into `sink`.
pub struct BlockEmitter<'a, H: BlockRenderHooks + ?Sized> {
    input: &'a BlockInputContext,
    hooks: &'a H,
    state: &'a mut EmitState,
    sink: &'a mut dyn VertexSink,
}

impl<H: BlockRenderHooks + ?Sized> QuadSink for BlockEmitter<'_, H> {
    fn emit(&mut self, quad: &BakedQuad) -> Result<(), RenderError> {
        self.state.quad.load(quad);
        let material = self.state.resolve_material(self.hooks, self.input);
        let editor = &mut self.state.quad;
        editor.material = material;

        if material.ao_enabled() && settings::smooth_lighting() {
            self.hooks.compute_ao(self.input, editor);
        } else {
            self.hooks.compute_flat(self.input, editor);
        }

        if material.emissive() {
            editor.lightmaps = [FULL_BRIGHT; 4];
        }
        if material.diffuse_enabled() {
            let shade = diffuse_shade(editor.face);
            for color in &mut editor.colors {
                *color = shade_argb(*color, shade);
            }
        }

        self.state
            .encoder
            .encode_quad(&self.state.quad, self.input.overlay(), self.sink)
    }
}

/// State and driver shared by block render contexts.
#[derive(Debug, Default)]
pub struct BaseBlockRenderer {
    input: BlockInputContext,
    emit: EmitState,
}

impl BaseBlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &BlockInputContext {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut BlockInputContext {
        &mut self.input
    }

    pub fn prepare_encoding(&mut self, transform: &Mat4) {
        self.emit.encoder.prepare(transform);
    }

    /// Full block setup: input data, the block's material map, the model's
    /// AO default and the default preset.
    pub fn prepare_for_block(
        &mut self,
        state: BlockState,
        pos: BlockPos,
        model_ao: bool,
        seed: u64,
        overlay: u32,
    ) {
        self.input.prepare_for_block(state, pos, seed, overlay);
        self.emit.material_map = MaterialMap::for_block(state.block);
        self.emit.default_ao = model_ao;
        self.emit.default_preset = Preset::Default;
    }

    pub fn set_material_map(&mut self, map: Arc<MaterialMap>) {
        self.emit.material_map = map;
    }

    pub fn material_map(&self) -> &Arc<MaterialMap> {
        &self.emit.material_map
    }

    pub fn set_default_ao(&mut self, default_ao: bool) {
        self.emit.default_ao = default_ao;
    }

    pub fn default_ao(&self) -> bool {
        self.emit.default_ao
    }

    pub fn set_default_preset(&mut self, preset: Preset) {
        self.emit.default_preset = preset;
    }

    pub fn default_preset(&self) -> Preset {
        self.emit.default_preset
    }

    /// Runs `model` against the prepared input, writing into `sink`.
    pub fn render_model<H: BlockRenderHooks + ?Sized>(
        &mut self,
        hooks: &H,
        model: &dyn BakedModel,
        sink: &mut dyn VertexSink,
    ) -> Result<(), RenderError> {
        let Self { input, emit } = self;
        let input = &*input;
        let mut emitter = BlockEmitter {
            input,
            hooks,
            state: emit,
            sink,
        };
        model.render_as_block(input, &mut emitter)
    }

    pub fn release(&mut self) {
        self.input.release();
    }
}
