mod playback_waveform;
mod wav;
