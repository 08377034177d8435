// Resume documents: blobs in S3, metadata in `resumes`.

pub mod handlers;
pub mod storage;
