pub mod block;
pub mod coords;
pub mod entity;
pub mod light;
