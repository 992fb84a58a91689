pub mod biquad;
pub mod dsp_chain;
pub mod remix;
pub mod resampler;

pub use dsp_chain::DspChain;
