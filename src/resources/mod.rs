pub mod backend;
pub mod bucket;
pub mod memory;
mod object;
pub mod s3;
