//! Transform engine interface and the spectral engine behind it.

pub mod engine;
pub mod envelope;
pub mod params;
pub mod phase_vocoder;
pub mod spectral;

pub use engine::TransformEngine;
pub use params::{semitones_to_factor, PitchParams};
pub use spectral::SpectralStretch;
