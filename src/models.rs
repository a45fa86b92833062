pub mod game;
pub mod psn;
