use crate::error::{Error, ErrorKind};
use coverup_thumbnail::Resolution;
use exn::ResultExt;
use time::UtcDateTime;

/// Status written for every completed upload. Records are only ever created
/// after the object store acknowledged the write.
pub const STATUS_UPLOADED: &str = "uploaded";

/// Durable proof that one (book, resolution) pair has been uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub book_id: u64,
    pub resolution: Resolution,
    /// Object key the cover was uploaded to.
    pub key: String,
    pub uploaded_at: UtcDateTime,
    /// Uploaded size in bytes.
    pub size: u64,
    /// Entity tag returned by the object store, if any.
    pub etag: Option<String>,
    pub status: String,
}
impl UploadRecord {
    /// A record for an upload that completed just now.
    pub fn new(book_id: u64, resolution: Resolution, key: impl Into<String>, size: u64) -> Self {
        Self {
            book_id,
            resolution,
            key: key.into(),
            uploaded_at: UtcDateTime::now(),
            size,
            etag: None,
            status: STATUS_UPLOADED.to_string(),
        }
    }

    pub fn with_etag(mut self, etag: Option<impl Into<String>>) -> Self {
        self.etag = etag.map(Into::into);
        self
    }

    pub fn with_uploaded_at(mut self, uploaded_at: UtcDateTime) -> Self {
        self.uploaded_at = uploaded_at;
        self
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UploadRow {
    pub(crate) book_id: i64,
    pub(crate) resolution: String,
    pub(crate) destination_key: String,
    pub(crate) uploaded_at: i64,
    pub(crate) file_size: i64,
    pub(crate) etag: Option<String>,
    pub(crate) status: String,
}
impl TryFrom<&UploadRecord> for UploadRow {
    type Error = Error;
    fn try_from(record: &UploadRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            book_id: i64::try_from(record.book_id).or_raise(|| ErrorKind::InvalidData("book id"))?,
            resolution: record.resolution.to_string(),
            destination_key: record.key.clone(),
            uploaded_at: record.uploaded_at.unix_timestamp(),
            file_size: i64::try_from(record.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            etag: record.etag.clone(),
            status: record.status.clone(),
        })
    }
}
impl TryFrom<UploadRow> for UploadRecord {
    type Error = Error;
    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            book_id: u64::try_from(row.book_id).or_raise(|| ErrorKind::InvalidData("book id"))?,
            resolution: row.resolution.parse::<Resolution>().or_raise(|| ErrorKind::InvalidData("resolution"))?,
            key: row.destination_key,
            uploaded_at: UtcDateTime::from_unix_timestamp(row.uploaded_at)
                .or_raise(|| ErrorKind::InvalidData("upload date"))?,
            size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            etag: row.etag,
            status: row.status,
        })
    }
}
