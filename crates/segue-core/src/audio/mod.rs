//! Audio output
//!
//! - [`start_audio_output`]: cpal stream that owns the engine's render half
//! - [`BounceSink`]: offline rendering to a WAV file
//! - [`get_output_devices`]: device listing for configuration

mod bounce;
mod config;
mod cpal_backend;
mod device;
mod error;

pub use bounce::{BounceSink, RenderSink};
pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
};
pub use cpal_backend::{start_audio_output, AudioSystem, CpalAudioHandle};
pub use device::{find_device_by_id, get_default_device, get_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
