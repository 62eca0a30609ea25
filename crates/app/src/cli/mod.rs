use clap::{Parser, Subcommand};
use tome_app::{
    config::{DatabaseConfig, LoggingConfig},
    context::AppContext,
    observability,
};

mod books;
mod orders;
mod purchases;
mod seed;
mod table;
mod users;

#[derive(Debug, Parser)]
#[command(name = "tome-app", about = "Tome bookstore CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the default accounts and load a book fixture
    Seed(seed::SeedArgs),
    Books(books::BooksCommand),
    Orders(orders::OrdersCommand),
    Purchases(purchases::PurchasesCommand),
    Users(users::UsersCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_logging(&self.logging).map_err(|error| error.to_string())?;

        let context = AppContext::from_database_url(&self.database.database_url)
            .await
            .map_err(|error| format!("failed to open database: {error}"))?;

        match self.command {
            Commands::Seed(args) => seed::run(&context, args).await,
            Commands::Books(command) => books::run(&context, command).await,
            Commands::Orders(command) => orders::run(&context, command).await,
            Commands::Purchases(command) => purchases::run(&context, command).await,
            Commands::Users(command) => users::run(&context, command).await,
        }
    }
}
