pub mod pipeline;
pub mod video;
