use clap::{Args, Subcommand};
use tome_app::{
    context::AppContext,
    domain::{purchases::models::PurchaseUuid, users::models::UserId},
};

use super::table;

#[derive(Debug, Args)]
pub(crate) struct PurchasesCommand {
    #[command(subcommand)]
    command: PurchasesSubcommand,
}

#[derive(Debug, Subcommand)]
enum PurchasesSubcommand {
    List(ListPurchasesArgs),
    Cancel(PurchaseIdsArgs),
    Return(PurchaseIdsArgs),
}

#[derive(Debug, Args)]
struct ListPurchasesArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    /// Whose records to list; defaults to the acting user
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    include_cancelled: bool,
}

#[derive(Debug, Args)]
struct PurchaseIdsArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    /// Unit record ids, all for the same book
    #[arg(required = true)]
    ids: Vec<PurchaseUuid>,
}

pub(crate) async fn run(context: &AppContext, command: PurchasesCommand) -> Result<(), String> {
    match command.command {
        PurchasesSubcommand::List(args) => list(context, args).await,
        PurchasesSubcommand::Cancel(args) => cancel(context, args).await,
        PurchasesSubcommand::Return(args) => return_units(context, args).await,
    }
}

async fn list(context: &AppContext, args: ListPurchasesArgs) -> Result<(), String> {
    let caller = UserId::from(args.caller);
    let user = args.user.map_or_else(|| caller.clone(), UserId::from);

    let records = context
        .orders
        .list_user_purchases(&caller, &user, args.include_cancelled)
        .await
        .map_err(|error| format!("failed to list purchases: {error}"))?;

    if records.is_empty() {
        println!("no purchases found for {user}");
        return Ok(());
    }

    println!(
        "{}",
        table::render(
            ["Id", "Book", "Purchased", "Status"],
            records.iter().map(|record| {
                [
                    record.id.to_string(),
                    record.book_id.to_string(),
                    record.purchase_date.to_string(),
                    record.status.to_string(),
                ]
            }),
            &[],
        )
    );

    Ok(())
}

async fn cancel(context: &AppContext, args: PurchaseIdsArgs) -> Result<(), String> {
    let cancelled = context
        .orders
        .cancel_purchases(&UserId::from(args.caller), args.ids)
        .await
        .map_err(|error| format!("failed to cancel purchases: {error}"))?;

    println!("cancelled: {}", cancelled.len());

    Ok(())
}

async fn return_units(context: &AppContext, args: PurchaseIdsArgs) -> Result<(), String> {
    let refund = context
        .orders
        .return_purchases(&UserId::from(args.caller), args.ids)
        .await
        .map_err(|error| format!("failed to return purchases: {error}"))?;

    println!("refund: {refund}");

    Ok(())
}
