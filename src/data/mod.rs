pub mod bars;
pub mod histogram;
pub mod render;
pub mod timing;
pub mod viewport;
