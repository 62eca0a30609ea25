use clap::{Args, Subcommand};
use tome_app::{
    context::AppContext,
    domain::{
        catalog::models::{Book, BookStatus, BookUuid, NewBook},
        users::models::UserId,
    },
};

use super::table;

#[derive(Debug, Args)]
pub(crate) struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Debug, Subcommand)]
enum BooksSubcommand {
    List(ListBooksArgs),
    Add(AddBookArgs),
    Stock(StockArgs),
    Approve(ApproveArgs),
}

#[derive(Debug, Args)]
struct ListBooksArgs {
    /// Include requests still awaiting approval
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Args)]
struct AddBookArgs {
    /// Acting user; admins add approved books, everyone else files a request
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    title: String,

    #[arg(long)]
    author: String,

    #[arg(long, default_value = "")]
    genre: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    cover_image: String,

    #[arg(long, default_value_t = 0)]
    published_year: i32,

    /// Unit price in won
    #[arg(long)]
    price: u64,
}

#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("change").required(true))]
struct StockArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    book: BookUuid,

    /// New stock level
    #[arg(long, group = "change")]
    set: Option<u32>,

    /// Signed change to the stock level
    #[arg(long, group = "change", allow_negative_numbers = true)]
    adjust: Option<i64>,
}

#[derive(Debug, Args)]
struct ApproveArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    book: BookUuid,
}

pub(crate) async fn run(context: &AppContext, command: BooksCommand) -> Result<(), String> {
    match command.command {
        BooksSubcommand::List(args) => list(context, args).await,
        BooksSubcommand::Add(args) => add(context, args).await,
        BooksSubcommand::Stock(args) => stock(context, args).await,
        BooksSubcommand::Approve(args) => approve(context, args).await,
    }
}

async fn list(context: &AppContext, args: ListBooksArgs) -> Result<(), String> {
    let books = context
        .catalog
        .list_books(args.all)
        .await
        .map_err(|error| format!("failed to list books: {error}"))?;

    if books.is_empty() {
        println!("no books found");
        return Ok(());
    }

    println!(
        "{}",
        table::render(
            ["Id", "Title", "Author", "Price", "Stock", "Rating", "Status"],
            books.iter().map(book_row),
            &[3, 4, 5],
        )
    );

    Ok(())
}

async fn add(context: &AppContext, args: AddBookArgs) -> Result<(), String> {
    let book = context
        .catalog
        .add_book(
            &UserId::from(args.caller),
            NewBook {
                title: args.title,
                author: args.author,
                genre: args.genre,
                description: args.description,
                cover_image: args.cover_image,
                published_year: args.published_year,
                price: args.price,
            },
        )
        .await
        .map_err(|error| format!("failed to add book: {error}"))?;

    println!("book_id: {}", book.id);
    println!("status: {}", status_label(book.status));

    Ok(())
}

async fn stock(context: &AppContext, args: StockArgs) -> Result<(), String> {
    let caller = UserId::from(args.caller);

    let book = match (args.set, args.adjust) {
        (Some(stock), _) => context.orders.set_book_stock(&caller, args.book, stock).await,
        (None, Some(delta)) => {
            context
                .orders
                .adjust_book_stock(&caller, args.book, delta)
                .await
        }
        (None, None) => return Err("either --set or --adjust is required".to_string()),
    }
    .map_err(|error| format!("failed to change stock: {error}"))?;

    println!("{}: {} in stock", book.title, book.stock);

    Ok(())
}

async fn approve(context: &AppContext, args: ApproveArgs) -> Result<(), String> {
    let book = context
        .catalog
        .approve_book(&UserId::from(args.caller), args.book)
        .await
        .map_err(|error| format!("failed to approve book: {error}"))?;

    println!("{} is {}", book.title, status_label(book.status));

    Ok(())
}

fn book_row(book: &Book) -> [String; 7] {
    [
        book.id.to_string(),
        book.title.clone(),
        book.author.clone(),
        book.price.to_string(),
        book.stock.to_string(),
        book.average_rating()
            .map_or_else(|| "-".to_string(), |rating| format!("{rating:.1}")),
        status_label(book.status).to_string(),
    ]
}

const fn status_label(status: BookStatus) -> &'static str {
    match status {
        BookStatus::Approved => "approved",
        BookStatus::Pending => "pending",
    }
}
