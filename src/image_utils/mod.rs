pub mod compositing;
pub mod image_conversion;
pub mod image_io;
