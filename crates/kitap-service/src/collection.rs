//! # Collections
//!
//! Favorites and cart on behalf of a user.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add(kind, user, book)                                                 │
//! │    book unknown            ──► BookNotFound                            │
//! │    pair already present    ──► AlreadyExists   (add is NOT idempotent) │
//! │    otherwise               ──► CollectionItem { .., book: Some(view) } │
//! │                                                                         │
//! │  remove(kind, entry, user)                                             │
//! │    entry missing or owned by someone else ──► NotFound                 │
//! │                                                                         │
//! │  list(kind, user, with_book)                                           │
//! │    oldest first, book projection only when asked for                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_for_session` variants run the auth guard and take the user from
//! the session.

use std::sync::Arc;

use tracing::info;

use kitap_core::{CollectionItem, CollectionKind};
use kitap_db::{Database, DbError};

use crate::auth::SessionManager;
use crate::error::{ServiceError, ServiceResult};
use crate::session::SessionStore;

/// Favorite and cart operations.
pub struct CollectionService<S> {
    db: Database,
    sessions: Arc<SessionManager<S>>,
}

impl<S: SessionStore> CollectionService<S> {
    pub fn new(db: Database, sessions: Arc<SessionManager<S>>) -> Self {
        CollectionService { db, sessions }
    }

    /// Adds a book to one of the user's collections.
    pub async fn add(
        &self,
        kind: CollectionKind,
        user_id: &str,
        book_id: &str,
    ) -> ServiceResult<CollectionItem> {
        let entry = self
            .db
            .collection(kind)
            .add(user_id, book_id)
            .await
            .map_err(|err| match err {
                DbError::UniqueViolation { .. } => ServiceError::AlreadyExists {
                    what: kind.entity().to_string(),
                },
                // The session outlived its user
                DbError::ReferenceNotFound { ref entity, .. } if entity == "User" => {
                    ServiceError::Unauthenticated
                }
                other => ServiceError::from(other),
            })?;

        info!(%kind, user_id = %user_id, book_id = %book_id, "Added to collection");

        let book = self.db.books().get_view(book_id).await?;
        Ok(CollectionItem::new(entry, book))
    }

    /// Removes an entry the user owns.
    pub async fn remove(
        &self,
        kind: CollectionKind,
        entry_id: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        self.db
            .collection(kind)
            .remove_owned(entry_id, user_id)
            .await?;

        info!(%kind, user_id = %user_id, entry_id = %entry_id, "Removed from collection");
        Ok(())
    }

    /// Lists the user's entries, oldest first.
    pub async fn list(
        &self,
        kind: CollectionKind,
        user_id: &str,
        with_book: bool,
    ) -> ServiceResult<Vec<CollectionItem>> {
        let repo = self.db.collection(kind);

        if with_book {
            return Ok(repo.list_items_for_user(user_id).await?);
        }

        Ok(repo
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(CollectionItem::from)
            .collect())
    }

    /// [`add`](Self::add) for the session's user.
    pub async fn add_for_session(
        &self,
        token: Option<&str>,
        kind: CollectionKind,
        book_id: &str,
    ) -> ServiceResult<CollectionItem> {
        let user_id = self.sessions.require_auth(token).await?;
        self.add(kind, &user_id, book_id).await
    }

    /// [`remove`](Self::remove) for the session's user.
    pub async fn remove_for_session(
        &self,
        token: Option<&str>,
        kind: CollectionKind,
        entry_id: &str,
    ) -> ServiceResult<()> {
        let user_id = self.sessions.require_auth(token).await?;
        self.remove(kind, entry_id, &user_id).await
    }

    /// [`list`](Self::list) for the session's user.
    pub async fn list_for_session(
        &self,
        token: Option<&str>,
        kind: CollectionKind,
        with_book: bool,
    ) -> ServiceResult<Vec<CollectionItem>> {
        let user_id = self.sessions.require_auth(token).await?;
        self.list(kind, &user_id, with_book).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::session::MemorySessionStore;
    use kitap_core::{NewBook, NewUser, User};
    use kitap_db::DbConfig;

    struct Fixture {
        db: Database,
        collections: CollectionService<MemorySessionStore>,
        user: User,
        book_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sessions = Arc::new(SessionManager::new(db.clone(), MemorySessionStore::new()));

        let user = db
            .users()
            .create(&NewUser {
                email: "a@x.com".to_string(),
                username: "alice".to_string(),
                password_hash: "$argon2id$v=19$test".to_string(),
            })
            .await
            .unwrap();

        let author = db.authors().create("Мұхтар Әуезов").await.unwrap();
        let genre = db.genres().create("Роман").await.unwrap();
        let book = db
            .books()
            .create(&NewBook {
                title: "Абай жолы".to_string(),
                year: 1942,
                image_ref: "abai.jpg".to_string(),
                pdf_ref: "abai.pdf".to_string(),
                price: 3500,
                author_id: author.id,
                genre_id: genre.id,
                owner_user_id: None,
            })
            .await
            .unwrap();

        Fixture {
            collections: CollectionService::new(db.clone(), sessions),
            db,
            user,
            book_id: book.id,
        }
    }

    #[tokio::test]
    async fn test_add_embeds_book() {
        let f = fixture().await;

        let item = f
            .collections
            .add(CollectionKind::Cart, &f.user.id, &f.book_id)
            .await
            .unwrap();

        assert_eq!(item.user_id, f.user.id);
        assert_eq!(item.book.as_ref().unwrap().author_name, "Мұхтар Әуезов");
    }

    #[tokio::test]
    async fn test_add_errors() {
        let f = fixture().await;
        let favorites = CollectionKind::Favorite;

        let err = f
            .collections
            .add(favorites, &f.user.id, "00000000-0000-4000-8000-000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BookNotFound(_)));

        f.collections.add(favorites, &f.user.id, &f.book_id).await.unwrap();
        let err = f
            .collections
            .add(favorites, &f.user.id, &f.book_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists { ref what } if what == "Favorite"));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert_eq!(f.db.favorites().count_for_user(&f.user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_with_and_without_book() {
        let f = fixture().await;
        f.collections
            .add(CollectionKind::Favorite, &f.user.id, &f.book_id)
            .await
            .unwrap();

        let bare = f
            .collections
            .list(CollectionKind::Favorite, &f.user.id, false)
            .await
            .unwrap();
        assert_eq!(bare.len(), 1);
        assert!(bare[0].book.is_none());

        let full = f
            .collections
            .list(CollectionKind::Favorite, &f.user.id, true)
            .await
            .unwrap();
        assert_eq!(full[0].book.as_ref().unwrap().title, "Абай жолы");

        assert!(f
            .collections
            .list(CollectionKind::Cart, &f.user.id, true)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_session_guard() {
        let f = fixture().await;
        let item = f
            .collections
            .add(CollectionKind::Cart, &f.user.id, &f.book_id)
            .await
            .unwrap();

        let err = f
            .collections
            .remove_for_session(None, CollectionKind::Cart, &item.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));

        f.collections
            .remove(CollectionKind::Cart, &item.id, &f.user.id)
            .await
            .unwrap();

        let err = f
            .collections
            .remove(CollectionKind::Cart, &item.id, &f.user.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
