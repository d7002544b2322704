pub mod cors;
pub mod greeting;
