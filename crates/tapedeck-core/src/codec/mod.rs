mod playback_waveform;
mod wav;

pub use {
    playback_waveform::{
        PLAYBACK_WAVEFORM_POINTS, PlaybackWaveform, decimate, playback_waveform,
        playback_waveform_or_snapshot,
    },
    wav::{
        DecodedAudio, EncodedAudio, WAV_HEADER_LEN, WAV_MIME_TYPE, decode_wav, encode_wav,
        quantize,
    },
};
