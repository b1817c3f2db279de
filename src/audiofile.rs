// File: audiofile.rs
// This file contains functionality for reading from and writing to audio files,
// and for loading a file as a mono analysis signal.

use std::path::Path;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::error::{AudioError, AudioErrorType};
use crate::operations;
use crate::signal::Signal;

/// Represents an audio format (fixed or float)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    F32,
    F64,
    S8,
    S16,
    S24,
    S32,
    U8,
    U16,
    U24,
    U32,
}

/// Represents an audio file. Samples are always stored in f64 format,
/// regardless of their original format.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub audio_format: AudioFormat,
    pub bits_per_sample: u32,
    pub duration: f64,
    pub num_channels: usize,
    pub num_frames: usize,
    pub sample_rate: u32,
    pub samples: Vec<Vec<f64>>,
}

impl AudioFile {
    /// Creates a mono `AudioFile` from a sample vector
    pub fn new_mono(audio_format: AudioFormat, sample_rate: u32, samples: Vec<f64>) -> AudioFile {
        let num_frames = samples.len();
        AudioFile {
            audio_format,
            bits_per_sample: bits_per_sample(audio_format),
            duration: num_frames as f64 / sample_rate as f64,
            num_channels: 1,
            num_frames,
            sample_rate,
            samples: vec![samples],
        }
    }
}

/// Controls how `load` turns an audio file into a `Signal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Resample to this rate; `None` keeps the file's native rate
    pub sample_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { sample_rate: Some(22050) }
    }
}

fn bits_per_sample(audio_format: AudioFormat) -> u32 {
    match audio_format {
        AudioFormat::S8 | AudioFormat::U8 => 8,
        AudioFormat::S16 | AudioFormat::U16 => 16,
        AudioFormat::S24 | AudioFormat::U24 => 24,
        AudioFormat::S32 | AudioFormat::U32 | AudioFormat::F32 => 32,
        AudioFormat::F64 => 64,
    }
}

fn buffer_format(buf: &AudioBufferRef) -> AudioFormat {
    match buf {
        AudioBufferRef::F32(_) => AudioFormat::F32,
        AudioBufferRef::F64(_) => AudioFormat::F64,
        AudioBufferRef::S8(_) => AudioFormat::S8,
        AudioBufferRef::S16(_) => AudioFormat::S16,
        AudioBufferRef::S24(_) => AudioFormat::S24,
        AudioBufferRef::S32(_) => AudioFormat::S32,
        AudioBufferRef::U8(_) => AudioFormat::U8,
        AudioBufferRef::U16(_) => AudioFormat::U16,
        AudioBufferRef::U24(_) => AudioFormat::U24,
        AudioBufferRef::U32(_) => AudioFormat::U32,
    }
}

/// Reads an audio file. It can take WAV or AIFF files, as well as other formats
/// supported by symphonia. Only local paths are accepted.
///
/// # Example
///
/// ```no_run
/// let audio = aus_features::read("myaudio.wav").unwrap();
/// println!("{} channels at {} Hz", audio.num_channels, audio.sample_rate);
/// ```
pub fn read(path: impl AsRef<Path>) -> Result<AudioFile, AudioError> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();
    if path_str.starts_with("http://") || path_str.starts_with("https://") {
        return Err(AudioError::new(
            AudioErrorType::UnsupportedSource,
            format!("Cannot load {}: only local files are supported.", path_str),
        ));
    }

    let src = match std::fs::File::open(path) {
        Ok(x) => x,
        Err(err) => {
            return Err(AudioError::new(
                AudioErrorType::FileInaccessible,
                format!("File {} could not be opened: {}", path_str, err),
            ))
        }
    };

    // We need to make a media source stream before opening the file. Symphonia will automatically detect
    // the file format and codec used. The extension is only a hint.
    let mss = MediaSourceStream::new(Box::new(src), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = match symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts) {
        Ok(x) => x,
        Err(err) => {
            return Err(AudioError::new(
                AudioErrorType::UnsupportedFormat,
                format!("File {} is not in a supported format: {}", path_str, err),
            ))
        }
    };
    let mut format = probed.format;

    // We'll retrieve the first track in the file.
    let track = match format.tracks().iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL) {
        Some(x) => x,
        None => {
            return Err(AudioError::new(
                AudioErrorType::NoAudioTrack,
                format!("File {} has no supported audio tracks.", path_str),
            ))
        }
    };
    let decoder_options: DecoderOptions = Default::default();
    let mut decoder = match symphonia::default::get_codecs().make(&track.codec_params, &decoder_options) {
        Ok(x) => x,
        Err(err) => {
            return Err(AudioError::new(
                AudioErrorType::UnsupportedFormat,
                format!("File {} uses an unsupported codec: {}", path_str, err),
            ))
        }
    };
    let track_id = track.id;

    let mut audio = AudioFile {
        audio_format: AudioFormat::F32,
        bits_per_sample: track.codec_params.bits_per_sample.unwrap_or(0),
        duration: 0.0,
        num_channels: track.codec_params.channels.map_or(0, |channels| channels.count()),
        num_frames: 0,
        sample_rate: track.codec_params.sample_rate.unwrap_or(0),
        samples: Vec::new(),
    };
    audio.samples.resize_with(audio.num_channels, Default::default);

    // Next we'll start a decode loop for the track
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // quit at the end of the file
            Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(err) => {
                return Err(AudioError::new(
                    AudioErrorType::FileCorrupt,
                    format!("File {} could not be read: {}", path_str, err),
                ))
            }
        };

        while !format.metadata().is_latest() {
            format.metadata().pop();
        }

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                audio.audio_format = buffer_format(&decoded);
                let decoded_rate = decoded.spec().rate;
                let decoded_channels = decoded.spec().channels.count();
                if audio.sample_rate == 0 {
                    audio.sample_rate = decoded_rate;
                }
                if audio.samples.len() < decoded_channels {
                    audio.num_channels = decoded_channels;
                    audio.samples.resize_with(audio.num_channels, Default::default);
                }

                // convert whatever the decoder produced to f64
                let mut buf: AudioBuffer<f64> = decoded.make_equivalent();
                decoded.convert(&mut buf);
                for (channel_idx, plane) in buf.planes().planes().iter().enumerate() {
                    audio.samples[channel_idx].extend_from_slice(plane);
                }
            }
            // skip over packets that fail to decode
            Err(Error::IoError(_)) => continue,
            Err(Error::DecodeError(err)) => {
                log::debug!("skipping undecodable packet: {}", err);
                continue;
            }
            Err(err) => {
                return Err(AudioError::new(
                    AudioErrorType::FileCorrupt,
                    format!("File {} could not be decoded: {}", path_str, err),
                ))
            }
        }
    }

    if audio.bits_per_sample == 0 {
        audio.bits_per_sample = bits_per_sample(audio.audio_format);
    }
    check_channel_lengths(&audio.samples, &path_str)?;
    audio.num_frames = audio.samples.first().map_or(0, |channel| channel.len());
    if audio.num_frames == 0 || audio.sample_rate == 0 {
        return Err(AudioError::new(
            AudioErrorType::FileCorrupt,
            format!("File {} contains no audio.", path_str),
        ));
    }
    audio.duration = audio.num_frames as f64 / audio.sample_rate as f64;
    Ok(audio)
}

/// Fails with `FileCorrupt` unless every channel holds the same number of frames
fn check_channel_lengths(samples: &[Vec<f64>], path_str: &str) -> Result<(), AudioError> {
    if let Some(first) = samples.first() {
        if let Some((idx, channel)) = samples.iter().enumerate().find(|(_, channel)| channel.len() != first.len()) {
            return Err(AudioError::new(
                AudioErrorType::FileCorrupt,
                format!(
                    "File {} has channels of different lengths: channel 0 has {} frames, channel {} has {}.",
                    path_str, first.len(), idx, channel.len()
                ),
            ));
        }
    }
    Ok(())
}

/// Writes an audio file to WAV with hound. Float formats are written as 32-bit float,
/// fixed formats as signed integers of the same bit depth.
pub fn write(path: impl AsRef<Path>, audio: &AudioFile) -> Result<(), AudioError> {
    let path = path.as_ref();
    let write_error = |err: hound::Error| {
        AudioError::new(
            AudioErrorType::WriteFailed,
            format!("File {} could not be written: {}", path.to_string_lossy(), err),
        )
    };

    let (bits, sample_format) = match audio.audio_format {
        AudioFormat::F32 | AudioFormat::F64 => (32, hound::SampleFormat::Float),
        AudioFormat::S8 | AudioFormat::U8 => (8, hound::SampleFormat::Int),
        AudioFormat::S16 | AudioFormat::U16 => (16, hound::SampleFormat::Int),
        AudioFormat::S24 | AudioFormat::U24 => (24, hound::SampleFormat::Int),
        AudioFormat::S32 | AudioFormat::U32 => (32, hound::SampleFormat::Int),
    };
    let spec = hound::WavSpec {
        channels: audio.num_channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: bits,
        sample_format,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(write_error)?;
    let max_level = (1i64 << (bits - 1)) as f64 - 1.0;
    for frame_idx in 0..audio.num_frames {
        for channel in audio.samples.iter() {
            let sample = channel[frame_idx].clamp(-1.0, 1.0);
            match sample_format {
                hound::SampleFormat::Float => writer.write_sample(sample as f32).map_err(write_error)?,
                hound::SampleFormat::Int => match bits {
                    8 => writer.write_sample((sample * max_level).round() as i8).map_err(write_error)?,
                    16 => writer.write_sample((sample * max_level).round() as i16).map_err(write_error)?,
                    _ => writer.write_sample((sample * max_level).round() as i32).map_err(write_error)?,
                },
            }
        }
    }
    writer.finalize().map_err(write_error)?;
    Ok(())
}

/// Mixes an audio file down to mono
///
/// This will average all channels into the first one, and delete
/// the remaining channels. It is performed in-place, so you will
/// lose data! A channel shorter than the first counts as silence past its end.
pub fn mixdown(audiofile: &mut AudioFile) {
    if audiofile.samples.len() > 1 {
        let num_channels = audiofile.samples.len() as f64;
        let (first, rest) = audiofile.samples.split_at_mut(1);
        for frame_idx in 0..first[0].len() {
            let sum: f64 = rest.iter().filter_map(|channel| channel.get(frame_idx)).sum();
            first[0][frame_idx] = (first[0][frame_idx] + sum) / num_channels;
        }
        audiofile.samples.truncate(1);
        audiofile.num_channels = 1;
    }
}

/// Loads an audio file as a mono analysis signal, resampling it if the options ask for it.
/// Loading the same file twice with the same options yields identical samples.
///
/// # Example
///
/// ```no_run
/// use aus_features::{load, LoadOptions};
/// let signal = load("myaudio.wav", &LoadOptions::default()).unwrap();
/// assert_eq!(signal.sample_rate(), 22050);
/// ```
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Signal, AudioError> {
    let mut audio = read(path.as_ref())?;
    log::info!(
        "read {}: {} channels, {} frames at {} Hz",
        path.as_ref().to_string_lossy(), audio.num_channels, audio.num_frames, audio.sample_rate
    );
    mixdown(&mut audio);
    let native_rate = audio.sample_rate;
    let mut samples = audio.samples.swap_remove(0);

    let sample_rate = match options.sample_rate {
        Some(target) if target != native_rate => {
            log::debug!("resampling from {} Hz to {} Hz", native_rate, target);
            samples = operations::resample(&samples, native_rate, target)?;
            target
        }
        _ => native_rate,
    };

    Signal::new(samples, sample_rate)
        .map_err(|err| AudioError::new(AudioErrorType::FileCorrupt, err.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn tone(len: usize, sample_rate: u32) -> Vec<f64> {
        (0..len).map(|n| 0.5 * f64::sin(2.0 * PI * 440.0 * n as f64 / sample_rate as f64)).collect()
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let audio = AudioFile::new_mono(AudioFormat::S16, 8000, tone(4000, 8000));
        write(&path, &audio).unwrap();

        let read_back = read(&path).unwrap();
        assert_eq!(read_back.num_channels, 1);
        assert_eq!(read_back.sample_rate, 8000);
        assert_eq!(read_back.num_frames, 4000);
        assert_eq!(read_back.audio_format, AudioFormat::S16);
        for (a, b) in audio.samples[0].iter().zip(read_back.samples[0].iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mixdown_averages_channels() {
        let mut audio = AudioFile::new_mono(AudioFormat::F32, 8000, vec![1.0, 0.5, 0.0]);
        audio.samples.push(vec![0.0, 0.5, -1.0]);
        audio.num_channels = 2;
        mixdown(&mut audio);
        assert_eq!(audio.num_channels, 1);
        assert_eq!(audio.samples, vec![vec![0.5, 0.5, -0.5]]);
    }

    #[test]
    fn test_ragged_channels_are_corrupt() {
        let samples = vec![vec![0.0; 1024], vec![0.0; 1024], vec![0.0; 512]];
        let err = check_channel_lengths(&samples, "ragged.wav").unwrap_err();
        assert_eq!(err.error_type, AudioErrorType::FileCorrupt);
        assert!(err.error_msg.contains("channel 2 has 512"));
        assert!(check_channel_lengths(&samples[..2], "even.wav").is_ok());
    }

    #[test]
    fn test_mixdown_short_channel() {
        let mut audio = AudioFile::new_mono(AudioFormat::F32, 8000, vec![1.0, 1.0, 1.0]);
        audio.samples.push(vec![1.0]);
        audio.num_channels = 2;
        mixdown(&mut audio);
        assert_eq!(audio.samples, vec![vec![1.0, 0.5, 0.5]]);
    }

    #[test]
    fn test_missing_file() {
        let err = read("/definitely/not/here.wav").unwrap_err();
        assert_eq!(err.error_type, AudioErrorType::FileInaccessible);
    }

    #[test]
    fn test_url_rejected() {
        let err = load("https://example.com/audio.wav", &LoadOptions::default()).unwrap_err();
        assert_eq!(err.error_type, AudioErrorType::UnsupportedSource);
    }

    #[test]
    fn test_not_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"this is not a wave file at all").unwrap();
        let err = read(&path).unwrap_err();
        assert_eq!(err.error_type, AudioErrorType::UnsupportedFormat);
    }

    #[test]
    fn test_load_resamples_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let mut audio = AudioFile::new_mono(AudioFormat::F32, 44100, tone(44100, 44100));
        audio.samples.push(tone(44100, 44100));
        audio.num_channels = 2;
        write(&path, &audio).unwrap();

        let signal = load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(signal.sample_rate(), 22050);
        assert_eq!(signal.len(), 22050);

        let native = load(&path, &LoadOptions { sample_rate: None }).unwrap();
        assert_eq!(native.sample_rate(), 44100);
        assert_eq!(native.len(), 44100);
    }
}
