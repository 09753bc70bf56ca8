//! Core types, buffer views, windows and DSP building blocks.

pub mod fft;
pub mod ring_buffer;
pub mod types;
pub mod view;
pub mod window;

pub use types::*;
pub use view::{Channel, ChannelMut, ChannelView, ChannelViewMut};
