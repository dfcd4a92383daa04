mod block;
mod output;
mod resampler;
