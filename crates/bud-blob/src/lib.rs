mod error;
pub use error::BlobError;

mod upload;
pub use upload::BlobUpload;

mod service;
pub use service::BlobService;

mod bulk;
pub use bulk::bulk_upload;

pub use object_store;
