//! Offline render sinks
//!
//! Headless rendering pulls blocks from the engine and hands them to a
//! [`RenderSink`] instead of a device callback.

use super::error::{AudioError, AudioResult};
use crate::types::{StereoBuffer, StereoSample};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Consumer of rendered blocks
pub trait RenderSink: Send {
    fn write_block(&mut self, frames: &[StereoSample]) -> AudioResult<()>;

    /// Flush and close; called once when rendering ends
    fn finish(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// Collects rendered audio in memory
impl RenderSink for StereoBuffer {
    fn write_block(&mut self, frames: &[StereoSample]) -> AudioResult<()> {
        for &frame in frames {
            self.push(frame);
        }
        Ok(())
    }
}

/// Writes rendered audio to a 32-bit float stereo WAV file
pub struct BounceSink {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    frames_written: u64,
}

impl BounceSink {
    pub fn create(path: &Path, sample_rate: u32) -> AudioResult<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| AudioError::bounce(path, e))?;
        log::info!("Bouncing to {:?} at {} Hz", path, sample_rate);
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl RenderSink for BounceSink {
    fn write_block(&mut self, frames: &[StereoSample]) -> AudioResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(AudioError::bounce(&self.path, "file already finalized"));
        };
        for frame in frames {
            writer
                .write_sample(frame.left)
                .and_then(|_| writer.write_sample(frame.right))
                .map_err(|e| AudioError::bounce(&self.path, e))?;
        }
        self.frames_written += frames.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> AudioResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| AudioError::bounce(&self.path, e))?;
            log::info!(
                "Wrote {} frames to {:?}",
                self.frames_written,
                self.path
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bounce_writes_wav() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mix.wav");

        let mut sink = BounceSink::create(&path, 8000).unwrap();
        sink.write_block(&[StereoSample::new(0.5, -0.5); 100]).unwrap();
        sink.write_block(&[StereoSample::silence(); 50]).unwrap();
        assert_eq!(sink.frames_written(), 150);
        sink.finish().unwrap();
        assert!(sink.write_block(&[StereoSample::silence()]).is_err());

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.duration(), 150);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 0.5);
        assert_eq!(samples[1], -0.5);
    }

    #[test]
    fn test_buffer_sink_collects() {
        let mut sink = StereoBuffer::default();
        sink.write_block(&[StereoSample::mono(0.1); 3]).unwrap();
        sink.write_block(&[StereoSample::mono(0.2); 2]).unwrap();
        assert_eq!(sink.len(), 5);
        assert_eq!(sink[4], StereoSample::mono(0.2));
    }
}
