//! Audio format conversion utilities.
//!
//! Float samples from the audio server become signed 16-bit PCM:
//! - Sample conversion (f32 → i16, scale 32768, no clamping)
//! - Channel interleaving (frame-major)
//! - Optional byte-order inversion

mod convert;

pub use convert::{f32_to_i16, i16_to_f32, interleave, swap_bytes, SampleConverter};
