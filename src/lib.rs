pub mod editor;
pub mod engine;
pub mod player;
pub mod renderer;
pub mod types;

mod menubar;
