//! Upstream S3 access.
//!
//! [`ObjectStore`] is the seam between the object handlers and S3: handlers
//! only ever see plain-data inputs and outputs, and [`S3ObjectStore`] turns
//! those into typed `aws-sdk-s3` calls.

pub mod clients;
pub mod object_store;

pub use clients::AwsClients;
pub use object_store::{
    GetObjectInput, GetObjectOutput, ObjectHeaders, ObjectStore, PutObjectInput,
    PutObjectOutput, S3Error, S3ObjectStore, SseCustomer,
};
