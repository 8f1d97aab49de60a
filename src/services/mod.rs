pub mod classification;
pub mod flood_zones;
pub mod geometry;
pub mod map;
pub mod projection;
pub mod seed;
pub mod sensors;
pub mod validation;
pub mod view_state;
