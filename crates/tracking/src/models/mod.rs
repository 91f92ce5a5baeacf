mod upload;

pub use self::upload::{STATUS_UPLOADED, UploadRecord};
pub(crate) use self::upload::UploadRow;
