pub mod dithering;
pub mod image;
pub mod kernel;
pub mod strategy;
