pub mod local;

pub mod factory;

pub mod gcs;
pub mod s3;

mod upload;
