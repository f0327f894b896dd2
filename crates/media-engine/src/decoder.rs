// FILE: crates/media-engine/src/decoder.rs

use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

/// Decoder over an audio asset, buffered or streamed
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    spec: SignalSpec,
    duration_secs: Option<f64>,
}

/// Interleaved f32 samples of one packet
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub spec: SignalSpec,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        let channels = self.spec.channels.count().max(1);
        self.samples.len() / channels
    }

    pub fn duration_secs(&self) -> f64 {
        if self.spec.rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.spec.rate)
    }
}

struct OpenedTrack {
    reader: Box<dyn FormatReader>,
    track_id: u32,
    sample_rate: Option<u32>,
    time_base: Option<TimeBase>,
    n_frames: Option<u64>,
}

fn open_reader(source: Box<dyn MediaSource>, extension: Option<&str>) -> EngineResult<OpenedTrack> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

    let reader = probed.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::DecodeError("No audio track found".to_string()))?;

    Ok(OpenedTrack {
        track_id: track.id,
        sample_rate: track.codec_params.sample_rate,
        time_base: track.codec_params.time_base,
        n_frames: track.codec_params.n_frames,
        reader,
    })
}

fn ticks_to_secs(ticks: u64, time_base: Option<TimeBase>, sample_rate: Option<u32>) -> Option<f64> {
    if let Some(tb) = time_base {
        let time = tb.calc_time(ticks);
        return Some(time.seconds as f64 + time.frac);
    }
    sample_rate
        .filter(|r| *r > 0)
        .map(|r| ticks as f64 / f64::from(r))
}

/// Measures the playable length of an asset.
///
/// Returns as soon as the container header declares a frame count, so only
/// the head of a streamed source is read. Otherwise walks every packet
/// summing their durations.
pub fn measure_duration(source: Box<dyn MediaSource>, extension: Option<&str>) -> EngineResult<f64> {
    let mut track = open_reader(source, extension)?;

    if let Some(secs) = track
        .n_frames
        .and_then(|n| ticks_to_secs(n, track.time_base, track.sample_rate))
    {
        return Ok(secs);
    }

    let mut ticks: u64 = 0;
    loop {
        match track.reader.next_packet() {
            Ok(packet) if packet.track_id() == track.track_id => ticks += packet.dur(),
            Ok(_) => continue,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(EngineError::DecodeError(format!("Failed to read packet: {}", e))),
        }
    }

    match ticks_to_secs(ticks, track.time_base, track.sample_rate) {
        Some(secs) if secs > 0.0 => Ok(secs),
        _ => Err(EngineError::DecodeError(
            "Could not determine duration".to_string(),
        )),
    }
}

impl AudioDecoder {
    pub fn from_bytes(bytes: Bytes, extension: Option<&str>) -> EngineResult<Self> {
        Self::open(Box::new(Cursor::new(bytes)), extension)
    }

    /// Probes the container; blocks until a streamed source has its header
    pub fn open(source: Box<dyn MediaSource>, extension: Option<&str>) -> EngineResult<Self> {
        let track = open_reader(source, extension)?;

        let codec_params = track
            .reader
            .tracks()
            .iter()
            .find(|t| t.id == track.track_id)
            .map(|t| t.codec_params.clone())
            .ok_or_else(|| EngineError::DecodeError("No audio track found".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::DecodeError(format!("Failed to create decoder: {}", e)))?;

        let spec = SignalSpec::new(
            codec_params.sample_rate.unwrap_or(44100),
            codec_params.channels.unwrap_or_default(),
        );

        let duration_secs = track
            .n_frames
            .and_then(|n| ticks_to_secs(n, track.time_base, track.sample_rate));

        Ok(Self {
            reader: track.reader,
            decoder,
            track_id: track.track_id,
            spec,
            duration_secs,
        })
    }

    /// Duration declared by the container, if any
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    pub fn decode_next(&mut self) -> EngineResult<Option<DecodedAudio>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(EngineError::DecodeError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Decode error, skipping packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(EngineError::DecodeError(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let samples = interleave(decoded);

            return Ok(Some(DecodedAudio { samples, spec }));
        }
    }

    pub fn spec(&self) -> &SignalSpec {
        &self.spec
    }

    pub fn seek(&mut self, time_secs: f64) -> EngineResult<()> {
        let sample_rate = self.spec.rate;
        let timestamp = (time_secs.max(0.0) * f64::from(sample_rate)) as u64;

        self.reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: timestamp,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| EngineError::SeekError(format!("Failed to seek: {}", e)))?;

        self.decoder.reset();

        Ok(())
    }
}

fn interleave(decoded: AudioBufferRef<'_>) -> Vec<f32> {
    let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
    sample_buf.copy_interleaved_ref(decoded);
    sample_buf.samples().to_vec()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit mono PCM WAV of the given length, filled with a quiet ramp
    pub(crate) fn wav_bytes(sample_rate: u32, seconds: f64) -> Bytes {
        let frames = (f64::from(sample_rate) * seconds) as u32;
        let data_len = frames * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            let sample = ((i % 64) as i16 - 32) * 8;
            out.extend_from_slice(&sample.to_le_bytes());
        }
        Bytes::from(out)
    }

    #[test]
    fn test_measure_wav_duration() {
        let secs = measure_duration(Box::new(Cursor::new(wav_bytes(8000, 2.0))), Some("wav")).unwrap();
        assert!((secs - 2.0).abs() < 0.01, "got {}", secs);
    }

    #[test]
    fn test_measure_rejects_garbage() {
        let garbage = Cursor::new(Bytes::from_static(b"definitely not audio"));
        let result = measure_duration(Box::new(garbage), Some("mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_all_frames() {
        let mut decoder = AudioDecoder::from_bytes(wav_bytes(8000, 0.5), Some("wav")).unwrap();
        assert_eq!(decoder.spec().rate, 8000);
        assert!((decoder.duration_secs().unwrap() - 0.5).abs() < 0.01);

        let mut frames = 0;
        while let Some(decoded) = decoder.decode_next().unwrap() {
            frames += decoded.frames();
        }
        assert_eq!(frames, 4000);
    }

    #[test]
    fn test_seek_back_to_start() {
        let mut decoder = AudioDecoder::from_bytes(wav_bytes(8000, 0.5), Some("wav")).unwrap();
        while decoder.decode_next().unwrap().is_some() {}

        decoder.seek(0.0).unwrap();
        assert!(decoder.decode_next().unwrap().is_some());
    }
}
