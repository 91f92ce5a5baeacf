use crate::error::{Error, ErrorKind};
use derive_more::Display;
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// Calibre always stores a book's cover under this name in the book's directory.
pub const COVER_FILENAME: &str = "cover.jpg";

/// Which books a run operates on.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    #[display("all books")]
    All,
    #[display("book {_0}")]
    Book(u64),
}

/// A book that Calibre says has a cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: u64,
    /// Display only.
    pub title: String,
    /// Book directory, relative to the library root.
    pub path: PathBuf,
}
impl Book {
    pub fn cover_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.path).join(COVER_FILENAME)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) path: String,
}
impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("book id"))?,
            title: row.title,
            // Calibre always writes forward slashes, regardless of platform.
            path: row.path.split('/').filter(|segment| !segment.is_empty()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_path() {
        let row = BookRow { id: 59, title: "Dune".to_string(), path: "Frank Herbert/Dune (59)".to_string() };
        let book = Book::try_from(row).unwrap();
        assert_eq!(
            book.cover_path("/srv/library"),
            Path::new("/srv/library").join("Frank Herbert").join("Dune (59)").join("cover.jpg")
        );
    }

    #[test]
    fn test_negative_id() {
        let row = BookRow { id: -1, title: String::new(), path: "x".to_string() };
        let err = Book::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("book id")));
    }
}
