//! # Catalog Seeder
//!
//! Loads the Kazakh-literature starter catalog into a database.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p kitap-db --bin seed
//!
//! # Specify database path
//! cargo run -p kitap-db --bin seed -- --db ./data/kitap.db
//!
//! # More output
//! RUST_LOG=debug cargo run -p kitap-db --bin seed
//! ```
//!
//! ## Idempotent
//! Running it twice changes nothing the second time:
//! - genres and authors are get-or-create by name
//! - a book is skipped when a book with the same title exists
//!
//! Seeded books have no owner.

use std::env;

use anyhow::Context;
use kitap_core::validation::validate_book;
use kitap_core::{new_id, NewBook};
use kitap_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const GENRES: &[&str] = &[
    "Тарихи",
    "Поэзия",
    "Роман",
    "Повесть",
    "Философия",
    "Тарихи роман",
    "Автобиографиялық шығарма",
    "Тарихи повесть",
    "Биографиялық роман",
    "Тарихи зерттеу",
];

struct SeedBook {
    title: &'static str,
    author: &'static str,
    year: i32,
    genre: &'static str,
    image: &'static str,
    pdf: &'static str,
    price: i64,
}

impl SeedBook {
    fn new_book(&self, author_id: String, genre_id: String) -> NewBook {
        NewBook {
            title: self.title.to_string(),
            year: self.year,
            image_ref: self.image.to_string(),
            pdf_ref: self.pdf.to_string(),
            price: self.price,
            author_id,
            genre_id,
            owner_user_id: None,
        }
    }
}

const BOOKS: &[SeedBook] = &[
    SeedBook {
        title: "Қазақ хандығының құрылу тарихы",
        author: "Кәрібаев Берекет Бақытжанұлы",
        year: 2022,
        genre: "Тарихи зерттеу",
        image: "kaztarih.jpg",
        pdf: "kaztarih.pdf",
        price: 4500,
    },
    SeedBook {
        title: "Құлагер: поэмалар",
        author: "Ілияс Жансүгіров",
        year: 1994,
        genre: "Поэзия",
        image: "kulager.jpg",
        pdf: "kulager.pdf",
        price: 2000,
    },
    SeedBook {
        title: "Абайдың қара сөздері",
        author: "Абай Құнанбайұлы",
        year: 1855,
        genre: "Философия",
        image: "abaikara.jpeg",
        pdf: "abaikara.pdf",
        price: 3500,
    },
    SeedBook {
        title: "Қараш - Қараш оқиғасы",
        author: "Мұхтар Әуезов",
        year: 1927,
        genre: "Повесть",
        image: "karash.jpeg",
        pdf: "karash.pdf",
        price: 2800,
    },
    SeedBook {
        title: "Оян, қазақ!",
        author: "Міржақып Дулатов",
        year: 1909,
        genre: "Поэзия",
        image: "oyankaz.jpg",
        pdf: "oyankaz.pdf",
        price: 1800,
    },
    SeedBook {
        title: "Менің атым Қожа",
        author: "Бердібек Соқпақбаев",
        year: 1957,
        genre: "Повесть",
        image: "kozha.jpg",
        pdf: "kozha.pdf",
        price: 2200,
    },
    SeedBook {
        title: "Көшпенділер",
        author: "Ілияс Есенберлин",
        year: 1971,
        genre: "Тарихи роман",
        image: "koshpendiler.jpg",
        pdf: "koshpendiler.pdf",
        price: 5000,
    },
    SeedBook {
        title: "Махаббат, қызық мол жылдар",
        author: "Әзілхан Нұршайықов",
        year: 1970,
        genre: "Роман",
        image: "mahabbat.jpg",
        pdf: "mahabbat.pdf",
        price: 3300,
    },
    SeedBook {
        title: "Қан мен тер",
        author: "Әбдіжәміл Нұрпейісов",
        year: 1970,
        genre: "Роман",
        image: "qanmenter.jpg",
        pdf: "qanmenter.pdf",
        price: 4500,
    },
    SeedBook {
        title: "Ұшқан ұя",
        author: "Бауыржан Момышұлы",
        year: 1975,
        genre: "Автобиографиялық шығарма",
        image: "ushkanuya.jpg",
        pdf: "ushkanuya.pdf",
        price: 2700,
    },
    SeedBook {
        title: "Қилы заман",
        author: "Мұхтар Әуезов",
        year: 1928,
        genre: "Тарихи повесть",
        image: "qilyzaman.jpg",
        pdf: "qilyzaman.pdf",
        price: 3200,
    },
    SeedBook {
        title: "Шоқан асулары",
        author: "Сәуірбек Бақбергенов",
        year: 1983,
        genre: "Биографиялық роман",
        image: "shokan.png",
        pdf: "shokan.pdf",
        price: 2900,
    },
];

/// Checks every catalog entry before anything is written, so a bad entry
/// cannot leave a half-seeded database.
fn check_catalog() -> anyhow::Result<()> {
    for entry in BOOKS {
        validate_book(&entry.new_book(new_id(), new_id()))
            .with_context(|| format!("invalid seed book '{}'", entry.title))?;
    }

    Ok(())
}

/// Seeds `db`; returns (inserted, skipped).
async fn seed(db: &Database) -> anyhow::Result<(usize, usize)> {
    check_catalog()?;

    for name in GENRES {
        db.genres().get_or_create(name).await?;
    }

    let mut inserted = 0;
    let mut skipped = 0;

    for entry in BOOKS {
        if db.books().find_by_title(entry.title).await?.is_some() {
            skipped += 1;
            continue;
        }

        let author = db.authors().get_or_create(entry.author).await?;
        let genre = db.genres().get_or_create(entry.genre).await?;

        db.books()
            .create(&entry.new_book(author.id, genre.id))
            .await
            .with_context(|| format!("inserting '{}'", entry.title))?;

        inserted += 1;
    }

    Ok((inserted, skipped))
}

fn print_help() {
    println!("Qazaq Kitap catalog seeder");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: ./data/kitap.db)");
    println!("  -h, --help         Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./data/kitap.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--db" => {
                db_path = args
                    .get(i + 1)
                    .cloned()
                    .context("--db needs a path")?;
                i += 1;
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    let (inserted, skipped) = seed(&db).await?;

    info!(
        db = %db_path,
        inserted,
        skipped,
        total = db.books().count().await?,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_are_valid() {
        check_catalog().unwrap();
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (inserted, skipped) = seed(&db).await.unwrap();
        assert_eq!((inserted, skipped), (BOOKS.len(), 0));

        let (inserted, skipped) = seed(&db).await.unwrap();
        assert_eq!((inserted, skipped), (0, BOOKS.len()));

        assert_eq!(db.books().count().await.unwrap(), BOOKS.len() as i64);
        assert_eq!(db.genres().list().await.unwrap().len(), GENRES.len());
    }
}
