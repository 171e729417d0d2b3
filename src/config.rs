//! Compile-time engine caps and dimensions.
//!
//! `settings.json` (see [`crate::settings`]) may override the window
//! size and shadow map resolution at startup; everything else here is
//! a hard cap baked into uniform layouts and allocator pool sizes.

/// Default window size in logical pixels.
pub const WINDOW_WIDTH: u32 = 1024;
pub const WINDOW_HEIGHT: u32 = 768;

/// Offscreen (shadow / framebuffer) targets render at twice the
/// window resolution, matching high-DPI surfaces.
pub const FRAMEBUFFER_WIDTH: u32 = WINDOW_WIDTH * 2;
pub const FRAMEBUFFER_HEIGHT: u32 = WINDOW_HEIGHT * 2;

/// Shadow layer pool sizes. These are baked into the light uniform
/// array lengths in `shader/lit.wgsl`; changing one without the other
/// is a pipeline validation error.
pub const MAX_CONE_LIGHTS: usize = 2;
pub const MAX_POINT_LIGHTS: usize = 6;

/// Cube shadow maps use one sub-layer per face.
pub const POINT_SHADOW_FACES: usize = 6;

/// Glyph budget per flush; characters beyond this are dropped.
pub const MAX_TEXT_CHARS: usize = 10240;
/// Advisory cap on a single HUD string.
pub const MAX_TEXT_LENGTH: usize = 80;

/// HUD glyph cell metrics derived from the window grid.
pub const TEXT_HEIGHT: f32 = WINDOW_HEIGHT as f32 / 26.0;
pub const TEXT_WIDTH: f32 = WINDOW_WIDTH as f32 / 80.0;

/// Glyph atlas covers single-byte codepoints 0..=254.
pub const ATLAS_GLYPHS: usize = 255;

/// Default swap interval (0 = uncapped). Cycled at runtime with V.
pub const SWAP_INTERVAL: u32 = 0;

/// Minimum milliseconds between two transitions of a key toggle.
pub const TOGGLE_DEBOUNCE_MS: u64 = 500;
