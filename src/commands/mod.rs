pub mod intent;
pub mod render;
