use std::{fs, path::PathBuf};

use clap::Args;
use serde::Deserialize;
use tome_app::{
    context::AppContext,
    domain::{catalog::models::NewBook, users::models::UserId},
};
use tracing::info;

const DEFAULT_FIXTURE: &str = include_str!("../../fixtures/books.yml");

/// Account that owns seeded books.
const SEED_ADMIN: &str = "ADMIN";

#[derive(Debug, Args)]
pub(crate) struct SeedArgs {
    /// YAML book fixture; the bundled catalog is used when omitted
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct BooksFixture {
    books: Vec<BookFixture>,
}

#[derive(Debug, Deserialize)]
struct BookFixture {
    title: String,
    author: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cover_image: String,
    #[serde(default)]
    published_year: i32,
    price: u64,
    #[serde(default)]
    stock: u32,
}

fn parse_fixture(contents: &str) -> Result<BooksFixture, serde_norway::Error> {
    serde_norway::from_str(contents)
}

pub(crate) async fn run(context: &AppContext, args: SeedArgs) -> Result<(), String> {
    let contents = match &args.fixture {
        Some(path) => fs::read_to_string(path)
            .map_err(|error| format!("failed to read {}: {error}", path.display()))?,
        None => DEFAULT_FIXTURE.to_string(),
    };

    let fixture =
        parse_fixture(&contents).map_err(|error| format!("failed to parse fixture: {error}"))?;

    let admin = UserId::from(SEED_ADMIN);

    let existing = context
        .catalog
        .list_books(true)
        .await
        .map_err(|error| format!("failed to list books: {error}"))?;

    let mut added = 0_usize;
    let mut skipped = 0_usize;

    for entry in fixture.books {
        if existing
            .iter()
            .any(|book| book.title == entry.title && book.author == entry.author)
        {
            skipped += 1;
            continue;
        }

        let book = context
            .catalog
            .add_book(
                &admin,
                NewBook {
                    title: entry.title,
                    author: entry.author,
                    genre: entry.genre,
                    description: entry.description,
                    cover_image: entry.cover_image,
                    published_year: entry.published_year,
                    price: entry.price,
                },
            )
            .await
            .map_err(|error| format!("failed to add book: {error}"))?;

        if entry.stock > 0 {
            context
                .orders
                .set_book_stock(&admin, book.id, entry.stock)
                .await
                .map_err(|error| format!("failed to stock {}: {error}", book.title))?;
        }

        added += 1;
    }

    info!(added, skipped, "seeded catalog");

    println!("books added: {added}, already present: {skipped}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn bundled_fixture_parses() -> TestResult {
        let fixture = parse_fixture(DEFAULT_FIXTURE)?;

        assert!(!fixture.books.is_empty());
        assert!(fixture.books.iter().all(|book| book.price > 0));

        Ok(())
    }

    #[test]
    fn optional_fields_default() -> TestResult {
        let fixture = parse_fixture(
            "books:\n  - title: Demian\n    author: Hermann Hesse\n    price: 9000\n",
        )?;

        let book = fixture.books.first().ok_or("missing book")?;

        assert_eq!(book.stock, 0);
        assert!(book.genre.is_empty());

        Ok(())
    }
}
