pub mod histogram;
pub mod map;
pub mod panels;
