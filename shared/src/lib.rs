pub mod enrich;
pub mod intrinsic;
pub mod log;
pub mod openapi;
