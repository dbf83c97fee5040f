pub mod track_point;
pub mod track;
pub mod accumulator;
pub mod pace;
pub mod route;
pub mod format;
