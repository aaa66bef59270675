pub mod options;
pub mod progress;

pub use options::EncoderOptions;
pub use progress::{Progress, ProgressCallback};
