use crate::{SAMPLE_RATE, WAV_HEADER_LEN, WAV_MIME_TYPE, decode_wav, encode_wav, quantize};

use std::io::Cursor;

/// WHAT: The header is the canonical 44-byte mono 16-bit PCM layout
/// WHY: Files must open in any standard audio tool
#[test]
fn given_samples_when_encoding_then_header_fields_exact() {
    // Given: Three samples at 44.1 kHz
    let samples = [0.0, 0.5, -0.5];

    // When: Encoding
    let encoded = encode_wav(&samples, SAMPLE_RATE).unwrap();
    let bytes = encoded.bytes();

    // Then: Header fields match the PCM layout
    let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);

    assert_eq!(bytes.len(), WAV_HEADER_LEN + 6);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32_at(4), 36 + 6);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(u32_at(16), 16);
    assert_eq!(u16_at(20), 1); // linear PCM
    assert_eq!(u16_at(22), 1); // mono
    assert_eq!(u32_at(24), SAMPLE_RATE);
    assert_eq!(u32_at(28), SAMPLE_RATE * 2);
    assert_eq!(u16_at(32), 2);
    assert_eq!(u16_at(34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(u32_at(40), 6);
    assert_eq!(encoded.mime_type(), WAV_MIME_TYPE);
    assert_eq!(encoded.size_bytes(), bytes.len());
}

/// WHAT: Full-scale and over-range samples quantize to +-32767
/// WHY: Clamping must prevent wraparound to the opposite sign
#[test]
fn given_extreme_samples_when_quantizing_then_clamped_without_wraparound() {
    assert_eq!(quantize(1.0), 32767);
    assert_eq!(quantize(1.5), 32767);
    assert_eq!(quantize(-1.0), -32767);
    assert_eq!(quantize(-3.0), -32767);
    assert_eq!(quantize(f32::NAN), 0);
    assert_eq!(quantize(0.5), 16384); // round(16383.5)
}

/// WHAT: The last sample of a full-scale clip is encoded as 32767
/// WHY: Checks quantization as it lands in the data chunk
#[test]
fn given_full_scale_clip_when_encoding_then_data_bytes_are_max() {
    let encoded = encode_wav(&[1.0, 1.0], SAMPLE_RATE).unwrap();
    let bytes = encoded.bytes();
    let last = i16::from_le_bytes([bytes[46], bytes[47]]);
    assert_eq!(last, i16::MAX);
}

/// WHAT: A standard decoder reads back the same count and values
/// WHY: Round-trip within one quantization step proves the container is valid
#[test]
fn given_encoded_clip_when_reading_with_hound_then_samples_match() {
    // Given: A ramp of 1000 samples
    let input: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0) - 1.0).collect();
    let encoded = encode_wav(&input, SAMPLE_RATE).unwrap();

    // When: Decoding with hound directly
    let mut reader = hound::WavReader::new(Cursor::new(encoded.bytes())).unwrap();
    let spec = reader.spec();
    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();

    // Then: Spec and samples agree within one step
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(decoded.len(), input.len());
    for (got, want) in decoded.iter().zip(&input) {
        let back = f32::from(*got) / 32767.0;
        assert!((back - want).abs() <= 1.0 / 32767.0 + 1e-6);
    }
}

/// WHAT: decode_wav keeps the first channel of stereo float files
/// WHY: Playback waveforms must work for any WAV, not just our own
#[test]
fn given_stereo_float_wav_when_decoding_then_first_channel_kept() {
    // Given: A stereo float WAV written by hound
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(0.25f32).unwrap();
            writer.write_sample(-0.75f32).unwrap();
        }
        writer.finalize().unwrap();
    }

    // When: Decoding
    let decoded = decode_wav(cursor.get_ref()).unwrap();

    // Then: Ten left-channel samples
    assert_eq!(decoded.sample_rate, 48_000);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.samples, vec![0.25; 10]);
}

/// WHAT: Garbage bytes fail with EncodingFailure
/// WHY: Corrupt stored audio must be detectable so callers can fall back
#[test]
fn given_garbage_when_decoding_then_error() {
    assert!(decode_wav(b"definitely not a wav file").is_err());
}

/// WHAT: An empty clip still encodes a valid header
/// WHY: Encoding is total over its input
#[test]
fn given_no_samples_when_encoding_then_header_only() {
    let encoded = encode_wav(&[], SAMPLE_RATE).unwrap();
    assert_eq!(encoded.size_bytes(), WAV_HEADER_LEN);
    assert!(decode_wav(encoded.bytes()).unwrap().samples.is_empty());
}
