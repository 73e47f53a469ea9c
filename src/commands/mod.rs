pub mod session;
pub mod settings;
pub mod sync;
pub mod target;
