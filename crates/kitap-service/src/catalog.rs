//! # Catalog
//!
//! Read-only access to books with their author and genre names.

use tracing::debug;

use kitap_core::BookView;
use kitap_db::Database;

use crate::error::{ServiceError, ServiceResult};

/// Catalog reads.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Every book, oldest first.
    pub async fn get_all(&self) -> ServiceResult<Vec<BookView>> {
        Ok(self.db.books().list_views().await?)
    }

    /// One book, or `NotFound`.
    pub async fn get_by_id(&self, book_id: &str) -> ServiceResult<BookView> {
        debug!(book_id = %book_id, "Fetching book");

        self.db
            .books()
            .get_view(book_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "Book".to_string(),
                id: book_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use kitap_core::NewBook;
    use kitap_db::DbConfig;

    #[tokio::test]
    async fn test_get_all_and_by_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = CatalogService::new(db.clone());

        assert!(catalog.get_all().await.unwrap().is_empty());

        let author = db.authors().create("Ілияс Есенберлин").await.unwrap();
        let genre = db.genres().create("Тарихи роман").await.unwrap();
        let book = db
            .books()
            .create(&NewBook {
                title: "Көшпенділер".to_string(),
                year: 1971,
                image_ref: "koshpendiler.jpg".to_string(),
                pdf_ref: "koshpendiler.pdf".to_string(),
                price: 5000,
                author_id: author.id.clone(),
                genre_id: genre.id,
                owner_user_id: None,
            })
            .await
            .unwrap();

        let all = catalog.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].author_id, author.id);
        assert_eq!(all[0].author_name, "Ілияс Есенберлин");
        assert_eq!(all[0].genre_name, "Тарихи роман");

        assert_eq!(catalog.get_by_id(&book.id).await.unwrap().title, "Көшпенділер");

        let err = catalog.get_by_id("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
