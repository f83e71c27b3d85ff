pub mod canvas;
pub mod compose;
pub mod ffmpeg;
pub mod text;
