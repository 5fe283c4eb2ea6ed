pub mod app;
pub mod context;
pub mod terminal;
pub mod tools;
