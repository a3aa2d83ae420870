pub mod console;
pub mod ops;
