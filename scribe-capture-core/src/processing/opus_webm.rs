//! Production encoder for the preferred container: Opus frames muxed
//! into WebM. Speech-oriented settings: 48 kHz mono, VoIP application,
//! VBR with in-band FEC.

use crate::models::error::CaptureError;
use crate::models::format::{RecordingFormat, StreamFormat, WEBM_MIME};
use crate::traits::track_encoder::{EncodedTrack, EncoderFactory, TrackEncoder};

use super::resample::{downmix_to_mono, resample_linear};
use super::webm::WebmWriter;

/// Opus operates at 48 kHz; device audio is resampled to this rate.
pub const CODEC_RATE: u32 = 48_000;

/// 20 ms frames at the codec rate.
const FRAME_SAMPLES: usize = 960;
const FRAME_MS: u64 = 20;

/// Speech-appropriate target bitrate.
const TARGET_BITRATE: i32 = 32_000;

/// libopus lookahead at 48 kHz, declared as `OpusHead` pre-skip and the
/// track's codec delay.
const PRE_SKIP: u16 = 312;

/// Upper bound on a single encoded Opus packet.
const MAX_PACKET_BYTES: usize = 4_000;

/// Incremental Opus-in-WebM encoder for one capture session.
pub struct OpusWebmEncoder {
    encoder: opus::Encoder,
    input: StreamFormat,
    /// Mono samples at the codec rate awaiting a full frame.
    pending: Vec<f32>,
    writer: WebmWriter,
    frames_written: u64,
    finalized: bool,
}

impl OpusWebmEncoder {
    pub fn new(input: StreamFormat) -> Result<Self, CaptureError> {
        let mut encoder =
            opus::Encoder::new(CODEC_RATE, opus::Channels::Mono, opus::Application::Voip)
                .map_err(|e| CaptureError::EncodingFailed(format!("opus init: {e}")))?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(TARGET_BITRATE))
            .map_err(|e| CaptureError::EncodingFailed(format!("opus bitrate: {e}")))?;
        encoder
            .set_vbr(true)
            .map_err(|e| CaptureError::EncodingFailed(format!("opus vbr: {e}")))?;
        encoder
            .set_inband_fec(true)
            .map_err(|e| CaptureError::EncodingFailed(format!("opus fec: {e}")))?;

        Ok(Self {
            encoder,
            input,
            pending: Vec::new(),
            writer: WebmWriter::new(1, PRE_SKIP, input.sample_rate),
            frames_written: 0,
            finalized: false,
        })
    }

    fn encode_ready_frames(&mut self) -> Result<(), CaptureError> {
        while self.pending.len() >= FRAME_SAMPLES {
            let pcm: Vec<i16> = self.pending[..FRAME_SAMPLES]
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .collect();
            self.pending.drain(..FRAME_SAMPLES);

            let mut packet = vec![0u8; MAX_PACKET_BYTES];
            let len = self
                .encoder
                .encode(&pcm, &mut packet)
                .map_err(|e| CaptureError::EncodingFailed(format!("opus encode: {e}")))?;
            packet.truncate(len);

            self.writer
                .add_block(self.frames_written * FRAME_MS, packet);
            self.frames_written += 1;
        }
        Ok(())
    }
}

impl TrackEncoder for OpusWebmEncoder {
    fn push(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        if self.finalized {
            return Err(CaptureError::EncodingFailed(
                "push after finalize".to_string(),
            ));
        }
        let mono = downmix_to_mono(samples, self.input.channels as usize);
        let resampled = resample_linear(&mono, self.input.sample_rate, CODEC_RATE);
        self.pending.extend_from_slice(&resampled);
        self.encode_ready_frames()
    }

    fn finalize(&mut self) -> Result<EncodedTrack, CaptureError> {
        if self.finalized {
            return Err(CaptureError::EncodingFailed(
                "encoder already finalized".to_string(),
            ));
        }
        self.finalized = true;

        // Pad the last partial frame with silence so no audio is dropped.
        if !self.pending.is_empty() {
            self.pending.resize(FRAME_SAMPLES, 0.0);
            self.encode_ready_frames()?;
        }

        let duration_ms = (self.frames_written * FRAME_MS) as f64;
        let bytes = self.writer.finish(duration_ms);
        Ok(EncodedTrack {
            bytes,
            duration_secs: duration_ms / 1_000.0,
        })
    }
}

/// The encoder facility of this runtime: WebM only, like any one runtime
/// encodes only its own containers. The negotiator never selects the MP4
/// fallback for identities this backend reports.
pub struct OpusEncoderFactory;

impl EncoderFactory for OpusEncoderFactory {
    fn supports(&self, format: &RecordingFormat) -> bool {
        format.container_mime == WEBM_MIME
    }

    fn create(
        &self,
        format: &RecordingFormat,
        input: StreamFormat,
    ) -> Result<Box<dyn TrackEncoder>, CaptureError> {
        if !self.supports(format) {
            return Err(CaptureError::EncodingFailed(format!(
                "this runtime has no encoder for {}",
                format.container_mime
            )));
        }
        Ok(Box::new(OpusWebmEncoder::new(input)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::webm::probe_duration_ms;

    fn sine(rate: u32, secs: f64) -> Vec<f32> {
        let count = (rate as f64 * secs) as usize;
        (0..count)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / rate as f32).sin() * 0.4)
            .collect()
    }

    #[test]
    fn one_second_of_audio_encodes_to_one_second_of_container() {
        let input = StreamFormat::mono(48_000);
        let mut enc = OpusWebmEncoder::new(input).expect("encoder");

        enc.push(&sine(48_000, 1.0)).expect("push");
        let track = enc.finalize().expect("finalize");

        assert!(!track.bytes.is_empty());
        assert!((track.duration_secs - 1.0).abs() <= 0.02);

        let probed = probe_duration_ms(&track.bytes).expect("duration");
        assert!((probed / 1_000.0 - 1.0).abs() <= 0.02);
    }

    #[test]
    fn non_codec_rates_are_resampled_not_stretched() {
        let input = StreamFormat::mono(44_100);
        let mut enc = OpusWebmEncoder::new(input).expect("encoder");

        enc.push(&sine(44_100, 0.5)).expect("push");
        let track = enc.finalize().expect("finalize");

        assert!((track.duration_secs - 0.5).abs() <= 0.02);
    }

    #[test]
    fn stereo_input_is_downmixed() {
        let input = StreamFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        let mut enc = OpusWebmEncoder::new(input).expect("encoder");

        // 0.25 s of interleaved stereo frames.
        let interleaved: Vec<f32> = sine(48_000, 0.25)
            .into_iter()
            .flat_map(|s| [s, -s])
            .collect();
        enc.push(&interleaved).expect("push");
        let track = enc.finalize().expect("finalize");

        assert!((track.duration_secs - 0.25).abs() <= 0.02);
    }

    #[test]
    fn finalize_is_single_shot() {
        let mut enc = OpusWebmEncoder::new(StreamFormat::mono(48_000)).expect("encoder");
        enc.finalize().expect("first finalize");

        assert!(enc.finalize().is_err());
        assert!(enc.push(&[0.0; 64]).is_err());
    }

    #[test]
    fn factory_rejects_the_fallback_container() {
        let factory = OpusEncoderFactory;
        let fallback = RecordingFormat::fallback();

        assert!(!factory.supports(&fallback));
        let err = match factory.create(&fallback, StreamFormat::mono(48_000)) {
            Ok(_) => panic!("expected the fallback container to be unsupported"),
            Err(e) => e,
        };
        assert!(matches!(err, CaptureError::EncodingFailed(_)));
    }

    #[test]
    fn factory_supports_the_preferred_container() {
        let factory = OpusEncoderFactory;
        assert!(factory.supports(&RecordingFormat::preferred()));
        assert!(factory
            .create(&RecordingFormat::preferred(), StreamFormat::mono(44_100))
            .is_ok());
    }
}
