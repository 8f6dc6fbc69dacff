pub mod import;
pub mod normalize;
pub mod verify;
