pub mod command;
pub mod game;
pub mod session;
