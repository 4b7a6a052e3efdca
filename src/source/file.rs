// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Decodes audio files into in-memory 16-bit PCM for freeform events.
//!
//! Uses symphonia to support WAV, MP3, FLAC and other formats. Files whose
//! sample rate differs from the engine rate are converted with linear
//! interpolation, which is sufficient for one-shots.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use crate::project::{AudioData, SampleStorage};

/// Errors from loading an audio file into memory.
#[derive(Debug, thiserror::Error)]
pub enum FileLoadError {
    #[error("audio file error: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    #[error("audio file contains no frames")]
    Empty,
}

/// Loads an audio file fully into memory as interleaved signed 16-bit PCM
/// at the given sample rate.
pub fn load_audio_file<P: AsRef<Path>>(
    path: P,
    target_sample_rate: u32,
) -> Result<AudioData, FileLoadError> {
    // Open the file (include path in error so the user sees which file failed).
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{}: {}", path_ref.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // A hint helps the format registry guess the container.
    let mut hint = Hint::new();
    if let Some(extension) = path_ref.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FileLoadError::Unsupported("no audio track found".to_string()))?;
    let track_id = track.id;
    let params = &track.codec_params;

    let source_sample_rate = params
        .sample_rate
        .ok_or_else(|| FileLoadError::Unsupported("sample rate not specified".to_string()))?;
    let mut channel_count: Option<u16> = params.channels.map(|c| c.count() as u16);

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(params, &decoder_opts)?;

    // Decode the whole file to interleaved f32.
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames = 0;
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count.get_or_insert(spec.channels.count() as u16);
                // Packet sizes can vary, so grow the conversion buffer as needed.
                if sample_buf.is_none() || decoded.capacity() > buf_frames {
                    buf_frames = decoded.capacity();
                    sample_buf = Some(SampleBuffer::new(buf_frames as u64, spec));
                }
                let buf = sample_buf.as_mut().expect("sample buffer allocated above");
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = ?path_ref, error = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let channel_count = channel_count
        .ok_or_else(|| FileLoadError::Unsupported("channel count not specified".to_string()))?;
    if channel_count == 0 || samples.is_empty() {
        return Err(FileLoadError::Empty);
    }

    if source_sample_rate != target_sample_rate {
        debug!(
            path = ?path_ref,
            source_rate = source_sample_rate,
            target_rate = target_sample_rate,
            "Converting sample rate"
        );
        samples = resample_linear(
            &samples,
            channel_count,
            source_sample_rate,
            target_sample_rate,
        );
    }

    let mut pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect();
    let frame_count = pcm.len() / channel_count as usize;
    if frame_count == 0 {
        return Err(FileLoadError::Empty);
    }
    // Drop any trailing partial frame from a truncated stream.
    pcm.truncate(frame_count * channel_count as usize);

    info!(
        path = ?path_ref,
        channels = channel_count,
        frames = frame_count,
        sample_rate = target_sample_rate,
        "Audio file loaded"
    );

    Ok(AudioData::new(
        SampleStorage::Owned(pcm),
        channel_count,
        frame_count,
    ))
}

/// Converts interleaved samples between sample rates with linear
/// interpolation.
fn resample_linear(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let idx0 = source_frame * channels + channel;
            let idx1 = (source_frame + 1) * channels + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_load_wav_round_trips_samples() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = vec![0, 8192, -8192, 16384, -16384, 32767];
        testutil::write_wav_i16(&path, &samples, 1, 44100);

        let data = load_audio_file(&path, 44100).expect("load should succeed");
        assert_eq!(data.channel_count(), 1);
        assert_eq!(data.frame_count(), samples.len());
        assert_eq!(data.samples(), &samples[..]);
    }

    #[test]
    fn test_load_stereo_wav() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stereo.wav");
        // Interleaved L/R pairs with distinct channels.
        let samples: Vec<i16> = vec![100, -100, 200, -200, 300, -300];
        testutil::write_wav_i16(&path, &samples, 2, 44100);

        let data = load_audio_file(&path, 44100).expect("load should succeed");
        assert_eq!(data.channel_count(), 2);
        assert_eq!(data.frame_count(), 3);
        assert_eq!(data.samples(), &samples[..]);
    }

    #[test]
    fn test_load_converts_sample_rate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("slow.wav");
        let samples: Vec<i16> = vec![0; 1000];
        testutil::write_wav_i16(&path, &samples, 1, 22050);

        let data = load_audio_file(&path, 44100).expect("load should succeed");
        assert_eq!(data.channel_count(), 1);
        // Doubling the rate roughly doubles the frame count.
        assert!(data.frame_count() >= 1999 && data.frame_count() <= 2001);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_audio_file("/nonexistent/missing.wav", 44100);
        assert!(matches!(result, Err(FileLoadError::Io(_))));
    }

    #[test]
    fn test_resample_preserves_channel_identity() {
        // L constant 1.0, R constant -1.0.
        let samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let output = resample_linear(&samples, 2, 44100, 48000);

        assert!(output.len() >= samples.len());
        for frame in output.chunks(2) {
            assert!((frame[0] - 1.0).abs() < 1e-6);
            assert!((frame[1] + 1.0).abs() < 1e-6);
        }
    }
}
