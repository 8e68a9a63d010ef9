pub mod controller;

pub use controller::DictationController;
