pub mod impl_fake;
#[cfg(feature = "tract")]
pub mod impl_tract_onnx;
pub mod interface;
pub mod metadata;
pub mod snapshot;
#[cfg(feature = "tract")]
pub mod tract;
