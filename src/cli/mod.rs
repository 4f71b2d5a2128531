pub mod assets;
pub mod history;
pub mod setup;
pub mod sync;
pub mod ui;
