use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::coords::BlockPos;
use crate::light::FULL_BRIGHT;

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: Self = Self(0);
}

/// Output buffer category a block draws into.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderLayer {
    #[default]
    Solid,
    CutoutMipped,
    Cutout,
    Translucent,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 4] = [
        RenderLayer::Solid,
        RenderLayer::CutoutMipped,
        RenderLayer::Cutout,
        RenderLayer::Translucent,
    ];
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub block: BlockId,
    pub layer: RenderLayer,
    #[serde(default)]
    pub light_emission: u8,
}

impl BlockState {
    pub const AIR: Self = Self {
        block: BlockId::AIR,
        layer: RenderLayer::Solid,
        light_emission: 0,
    };

    pub const fn new(block: BlockId, layer: RenderLayer) -> Self {
        Self {
            block,
            layer,
            light_emission: 0,
        }
    }

    pub fn is_air(&self) -> bool {
        self.block == BlockId::AIR
    }

    /// Layer used when the state is drawn by an entity rather than baked into
    /// terrain. Entity buffers have no mipped cutout pass.
    pub fn entity_render_layer(&self) -> RenderLayer {
        match self.layer {
            RenderLayer::CutoutMipped => RenderLayer::Cutout,
            other => other,
        }
    }
}

/// Read access to world state around a rendered block.
pub trait BlockView: Send + Sync {
    fn block_state(&self, pos: BlockPos) -> BlockState;

    /// Packed light at `pos`.
    fn brightness(&self, pos: BlockPos) -> u32;
}

/// A world with nothing in it and full light everywhere.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyView;

impl BlockView for EmptyView {
    fn block_state(&self, _pos: BlockPos) -> BlockState {
        BlockState::AIR
    }

    fn brightness(&self, _pos: BlockPos) -> u32 {
        FULL_BRIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockId, BlockState, BlockView, EmptyView, RenderLayer};
    use crate::coords::BlockPos;
    use crate::light::FULL_BRIGHT;

    #[test]
    fn air_state_is_air() {
        assert!(BlockState::AIR.is_air());
        assert!(!BlockState::new(BlockId(3), RenderLayer::Solid).is_air());
    }

    #[test]
    fn entity_layer_folds_mipped_cutout() {
        let leaves = BlockState::new(BlockId(8), RenderLayer::CutoutMipped);
        let glass = BlockState::new(BlockId(12), RenderLayer::Translucent);
        assert_eq!(leaves.entity_render_layer(), RenderLayer::Cutout);
        assert_eq!(glass.entity_render_layer(), RenderLayer::Translucent);
    }

    #[test]
    fn empty_view_is_air_and_fully_lit() {
        let view = EmptyView;
        let pos = BlockPos::new(4, -60, 12);
        assert_eq!(view.block_state(pos), BlockState::AIR);
        assert_eq!(view.brightness(pos), FULL_BRIGHT);
    }
}
