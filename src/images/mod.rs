mod pipeline;

pub use pipeline::{EncodedPhoto, ImagePipeline, PhotoDest, JPEG_QUALITY, MAX_LONG_SIDE};
