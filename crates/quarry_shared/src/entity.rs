use std::sync::Arc;

use glam::DVec3;

use crate::block::BlockView;

/// What the block renderer reads from an entity that carries or is a block.
pub trait EntitySource {
    /// Position at the start of the current tick.
    fn previous_position(&self) -> DVec3;

    fn position(&self) -> DVec3;

    fn eye_height(&self) -> f32;

    fn world(&self) -> Arc<dyn BlockView>;
}

/// Owned copy of the entity state needed for one draw.
#[derive(Clone)]
pub struct EntitySnapshot {
    pub previous_position: DVec3,
    pub position: DVec3,
    pub eye_height: f32,
    pub world: Arc<dyn BlockView>,
}

impl EntitySnapshot {
    pub fn stationary(position: DVec3, world: Arc<dyn BlockView>) -> Self {
        Self {
            previous_position: position,
            position,
            eye_height: 0.0,
            world,
        }
    }

    pub fn capture(entity: &dyn EntitySource) -> Self {
        Self {
            previous_position: entity.previous_position(),
            position: entity.position(),
            eye_height: entity.eye_height(),
            world: entity.world(),
        }
    }
}

impl std::fmt::Debug for EntitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySnapshot")
            .field("previous_position", &self.previous_position)
            .field("position", &self.position)
            .field("eye_height", &self.eye_height)
            .finish_non_exhaustive()
    }
}

impl EntitySource for EntitySnapshot {
    fn previous_position(&self) -> DVec3 {
        self.previous_position
    }

    fn position(&self) -> DVec3 {
        self.position
    }

    fn eye_height(&self) -> f32 {
        self.eye_height
    }

    fn world(&self) -> Arc<dyn BlockView> {
        Arc::clone(&self.world)
    }
}
