mod provider;
pub use provider::BlobProvider;
