pub mod evaluation;
pub mod upload;
