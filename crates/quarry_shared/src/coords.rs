use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub const fn offset(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::new(0, -1, 0),
            Direction::Up => IVec3::new(0, 1, 0),
            Direction::North => IVec3::new(0, 0, -1),
            Direction::South => IVec3::new(0, 0, 1),
            Direction::West => IVec3::new(-1, 0, 0),
            Direction::East => IVec3::new(1, 0, 0),
        }
    }
}

impl BlockPos {
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing the given world-space point.
    pub fn containing(point: DVec3) -> Self {
        let floored = point.floor();
        Self {
            x: floored.x as i32,
            y: floored.y as i32,
            z: floored.z as i32,
        }
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    /// Overwrites this position in place with the block containing `point`.
    pub fn set_containing(&mut self, point: DVec3) -> &mut Self {
        *self = Self::containing(point);
        self
    }

    pub fn relative(self, direction: Direction) -> Self {
        self + Self::from(direction.offset())
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for BlockPos {
    fn from(value: IVec3) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: Self) -> Self::Output {
        BlockPos {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for BlockPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: Self) -> Self::Output {
        BlockPos {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for BlockPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::{BlockPos, Direction};

    #[test]
    fn containing_floors_toward_negative_infinity() {
        assert_eq!(
            BlockPos::containing(DVec3::new(1.9, 64.0, -0.1)),
            BlockPos::new(1, 64, -1)
        );
        assert_eq!(
            BlockPos::containing(DVec3::new(-3.0, -0.5, 7.999)),
            BlockPos::new(-3, -1, 7)
        );
    }

    #[test]
    fn set_containing_reuses_the_same_value() {
        let mut pos = BlockPos::new(5, 5, 5);
        pos.set_containing(DVec3::new(0.5, 1.5, 2.5));
        assert_eq!(pos, BlockPos::new(0, 1, 2));
        pos.set(-4, 3, 9);
        assert_eq!(pos, BlockPos::new(-4, 3, 9));
    }

    #[test]
    fn block_pos_arithmetic_is_component_wise() {
        let a = BlockPos::new(10, -2, 4);
        let b = BlockPos::new(-3, 8, 1);

        assert_eq!(a + b, BlockPos::new(7, 6, 5));
        assert_eq!(a - b, BlockPos::new(13, -10, 3));

        let mut c = a;
        c += b;
        assert_eq!(c, BlockPos::new(7, 6, 5));
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn relative_steps_one_block_along_the_face_normal() {
        let pos = BlockPos::new(0, 0, 0);
        assert_eq!(pos.relative(Direction::Up), BlockPos::new(0, 1, 0));
        assert_eq!(pos.relative(Direction::North), BlockPos::new(0, 0, -1));
        assert_eq!(pos.relative(Direction::East), BlockPos::new(1, 0, 0));
        for direction in Direction::ALL {
            let stepped = pos.relative(direction);
            assert_eq!((stepped - pos).as_ivec3(), direction.offset());
        }
    }
}
