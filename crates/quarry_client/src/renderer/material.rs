use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use bitflags::bitflags;
use quarry_shared::block::{BlockId, RenderLayer};
use rustc_hash::FxHashMap;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u16 {
        const DISABLE_AO = 1 << 0;
        const DISABLE_DIFFUSE = 1 << 1;
        const EMISSIVE = 1 << 2;
    }
}

/// Blend/cutout preset. `Default` defers to the block's render layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Preset {
    #[default]
    Default,
    Solid,
    CutoutMipped,
    Cutout,
    Translucent,
}

impl Preset {
    pub fn from_layer(layer: RenderLayer) -> Self {
        match layer {
            RenderLayer::Solid => Preset::Solid,
            RenderLayer::CutoutMipped => Preset::CutoutMipped,
            RenderLayer::Cutout => Preset::Cutout,
            RenderLayer::Translucent => Preset::Translucent,
        }
    }

    const fn bits(self) -> u16 {
        match self {
            Preset::Default => 0,
            Preset::Solid => 1,
            Preset::CutoutMipped => 2,
            Preset::Cutout => 3,
            Preset::Translucent => 4,
        }
    }

    const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Preset::Default),
            1 => Some(Preset::Solid),
            2 => Some(Preset::CutoutMipped),
            3 => Some(Preset::Cutout),
            4 => Some(Preset::Translucent),
            _ => None,
        }
    }
}

const PRESET_BITS: u32 = 3;
const PRESET_MASK: u16 = (1 << PRESET_BITS) - 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderMaterial {
    pub preset: Preset,
    pub flags: MaterialFlags,
}

impl RenderMaterial {
    pub const DEFAULT: Self = Self {
        preset: Preset::Default,
        flags: MaterialFlags::empty(),
    };

    pub fn ao_enabled(&self) -> bool {
        !self.flags.contains(MaterialFlags::DISABLE_AO)
    }

    pub fn diffuse_enabled(&self) -> bool {
        !self.flags.contains(MaterialFlags::DISABLE_DIFFUSE)
    }

    pub fn emissive(&self) -> bool {
        self.flags.contains(MaterialFlags::EMISSIVE)
    }

    /// Value written to the material vertex attribute.
    pub fn index(&self) -> u16 {
        self.preset.bits() | self.flags.bits() << PRESET_BITS
    }

    pub fn from_index(index: u16) -> Option<Self> {
        let preset = Preset::from_bits(index & PRESET_MASK)?;
        let flags = MaterialFlags::from_bits(index >> PRESET_BITS)?;
        Some(Self { preset, flags })
    }
}

/// Mutable material under construction for one quad.
#[derive(Copy, Clone, Debug, Default)]
pub struct MaterialFinder {
    preset: Preset,
    flags: MaterialFlags,
}

impl MaterialFinder {
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn copy_from(&mut self, material: &RenderMaterial) -> &mut Self {
        self.preset = material.preset;
        self.flags = material.flags;
        self
    }

    pub fn preset(&mut self, preset: Preset) -> &mut Self {
        self.preset = preset;
        self
    }

    pub fn current_preset(&self) -> Preset {
        self.preset
    }

    pub fn disable_ao(&mut self, disable: bool) -> &mut Self {
        self.flags.set(MaterialFlags::DISABLE_AO, disable);
        self
    }

    pub fn disable_diffuse(&mut self, disable: bool) -> &mut Self {
        self.flags.set(MaterialFlags::DISABLE_DIFFUSE, disable);
        self
    }

    pub fn emissive(&mut self, emissive: bool) -> &mut Self {
        self.flags.set(MaterialFlags::EMISSIVE, emissive);
        self
    }

    pub fn is_emissive(&self) -> bool {
        self.flags.contains(MaterialFlags::EMISSIVE)
    }

    pub fn find(&self) -> RenderMaterial {
        RenderMaterial {
            preset: self.preset,
            flags: self.flags,
        }
    }
}

static DEFAULT_MAP: LazyLock<Arc<MaterialMap>> = LazyLock::new(|| Arc::new(MaterialMap::default()));

static BLOCK_MAPS: LazyLock<RwLock<FxHashMap<BlockId, Arc<MaterialMap>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

/// Per-sprite material overrides for one block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialMap {
    by_sprite: FxHashMap<u32, RenderMaterial>,
}

impl MaterialMap {
    /// The map that overrides nothing.
    pub fn default_map() -> Arc<MaterialMap> {
        Arc::clone(&DEFAULT_MAP)
    }

    pub fn with_override(mut self, sprite: u32, material: RenderMaterial) -> Self {
        self.by_sprite.insert(sprite, material);
        self
    }

    pub fn get(&self, sprite: u32) -> Option<&RenderMaterial> {
        self.by_sprite.get(&sprite)
    }

    pub fn is_default(&self) -> bool {
        self.by_sprite.is_empty()
    }

    /// Registered map for `block`, or the default map.
    pub fn for_block(block: BlockId) -> Arc<MaterialMap> {
        let maps = BLOCK_MAPS.read().unwrap_or_else(PoisonError::into_inner);
        maps.get(&block).cloned().unwrap_or_else(Self::default_map)
    }

    pub fn register(block: BlockId, map: MaterialMap) {
        let mut maps = BLOCK_MAPS.write().unwrap_or_else(PoisonError::into_inner);
        maps.insert(block, Arc::new(map));
    }
}
