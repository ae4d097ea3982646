//! Packed light and overlay coordinates.
//!
//! Light is packed as `block << 4 | sky << 20`, so each channel occupies the
//! low byte of one 16-bit half in the 0..=240 range.

pub const MAX_LIGHT_LEVEL: u8 = 15;
pub const FULL_BRIGHT: u32 = pack_light(MAX_LIGHT_LEVEL, MAX_LIGHT_LEVEL);
pub const NO_OVERLAY: u32 = pack_overlay(0, 10);

pub const fn pack_light(block: u8, sky: u8) -> u32 {
    let block = if block > MAX_LIGHT_LEVEL { MAX_LIGHT_LEVEL } else { block };
    let sky = if sky > MAX_LIGHT_LEVEL { MAX_LIGHT_LEVEL } else { sky };
    (block as u32) << 4 | (sky as u32) << 20
}

pub const fn block_light(packed: u32) -> u8 {
    ((packed >> 4) & 0xF) as u8
}

pub const fn sky_light(packed: u32) -> u8 {
    ((packed >> 20) & 0xF) as u8
}

/// Block-channel byte as stored in a lightmap attribute (0..=255).
pub const fn block_byte(packed: u32) -> u8 {
    (packed & 0xFF) as u8
}

/// Sky-channel byte as stored in a lightmap attribute (0..=255).
pub const fn sky_byte(packed: u32) -> u8 {
    ((packed >> 16) & 0xFF) as u8
}

/// Component-wise maximum of two packed light values.
pub fn max_brightness(a: u32, b: u32) -> u32 {
    if a == 0 {
        return b;
    }
    if b == 0 {
        return a;
    }
    let low = (a & 0xFFFF).max(b & 0xFFFF);
    let high = (a >> 16).max(b >> 16);
    low | high << 16
}

pub const fn pack_overlay(u: u8, v: u8) -> u32 {
    u as u32 | (v as u32) << 16
}

pub const fn overlay_u(packed: u32) -> u8 {
    (packed & 0xFFFF) as u8
}

pub const fn overlay_v(packed: u32) -> u8 {
    (packed >> 16) as u8
}
