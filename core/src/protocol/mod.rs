pub mod decoder;
pub mod window;

pub use decoder::{decode, decode_text, DecodeResult, Decoded, MalformedMessage, DATA_WINDOW_TAG};
pub use window::{AlignedSample, DataWindow, EventFlag, Prediction, CHANNEL_LABELS};
