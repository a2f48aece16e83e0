pub mod clip_range;
pub mod codec;
pub mod disparity;
pub mod parameter_store;
pub mod parameters;
pub mod slot;
pub mod validation;
