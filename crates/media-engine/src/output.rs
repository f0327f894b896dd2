// crates/media-engine/src/output.rs
//! Destinations for decoded samples.
//!
//! Writing blocks for roughly the real-time length of the samples, which is
//! what paces the playback thread. Outputs are created and used on that
//! thread only.

use crate::error::EngineResult;
use std::thread;
use std::time::{Duration, Instant};

pub trait AudioOutput {
    /// Queues interleaved samples, blocking while the output is full
    fn write(&mut self, samples: Vec<f32>, frames: usize, sample_rate: u32) -> EngineResult<()>;

    /// Drops anything queued but not yet audible
    fn flush(&mut self) {}
}

/// Output that plays nothing and only keeps real-time pace
pub struct SilentOutput {
    clock: Option<Instant>,
    written: Duration,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self {
            clock: None,
            written: Duration::ZERO,
        }
    }
}

impl Default for SilentOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for SilentOutput {
    fn write(&mut self, _samples: Vec<f32>, frames: usize, sample_rate: u32) -> EngineResult<()> {
        if sample_rate == 0 {
            return Ok(());
        }
        let start = *self.clock.get_or_insert_with(Instant::now);
        self.written += Duration::from_secs_f64(frames as f64 / f64::from(sample_rate));

        let due = start + self.written;
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.clock = None;
        self.written = Duration::ZERO;
    }
}

/// Opens the output used by the streaming backend
pub(crate) fn open_output(sample_rate: u32, channels: u16) -> Box<dyn AudioOutput> {
    #[cfg(feature = "device-output")]
    {
        match device::DeviceOutput::new(sample_rate, channels) {
            Ok(output) => return Box::new(output),
            Err(e) => log::warn!("Audio device unavailable, playing silently: {}", e),
        }
    }
    #[cfg(not(feature = "device-output"))]
    log::debug!(
        "Device output disabled, pacing {} Hz x{} silently",
        sample_rate,
        channels
    );
    Box::new(SilentOutput::new())
}

#[cfg(feature = "device-output")]
mod device {
    use super::AudioOutput;
    use crate::error::{EngineError, EngineResult};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, Stream, StreamConfig};
    use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

    /// Audio output on the default device
    pub struct DeviceOutput {
        tx: Sender<Vec<f32>>,
        rx: Receiver<Vec<f32>>,
        _stream: Stream,
        device_name: String,
    }

    impl DeviceOutput {
        pub fn new(sample_rate: u32, channels: u16) -> EngineResult<Self> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| EngineError::OutputError("No output device".to_string()))?;
            let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

            let config = StreamConfig {
                channels,
                sample_rate: SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let (tx, rx) = bounded::<Vec<f32>>(4);
            let callback_rx = rx.clone();
            let mut buffer: Vec<f32> = Vec::new();
            let mut position = 0;
            let error_device = device_name.clone();

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for sample in data.iter_mut() {
                            while position >= buffer.len() {
                                match callback_rx.try_recv() {
                                    Ok(next) => {
                                        buffer = next;
                                        position = 0;
                                    }
                                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                                        break;
                                    }
                                }
                            }

                            if position < buffer.len() {
                                *sample = buffer[position];
                                position += 1;
                            } else {
                                *sample = 0.0;
                            }
                        }
                    },
                    move |err| {
                        log::error!("Audio output error on device '{}': {}", error_device, err);
                    },
                    None,
                )
                .map_err(|e| EngineError::OutputError(format!("Failed to build stream: {}", e)))?;

            stream
                .play()
                .map_err(|e| EngineError::OutputError(format!("Failed to start stream: {}", e)))?;

            log::info!("Audio playback started on device: {}", device_name);
            Ok(Self {
                tx,
                rx,
                _stream: stream,
                device_name,
            })
        }
    }

    impl AudioOutput for DeviceOutput {
        fn write(&mut self, samples: Vec<f32>, _frames: usize, _rate: u32) -> EngineResult<()> {
            self.tx
                .send(samples)
                .map_err(|_| EngineError::OutputError("Audio stream closed".to_string()))
        }

        fn flush(&mut self) {
            while self.rx.try_recv().is_ok() {}
        }
    }

    impl Drop for DeviceOutput {
        fn drop(&mut self) {
            log::info!("Audio playback stopped on device: {}", self.device_name);
        }
    }
}
