use clap::{Args, Subcommand, ValueEnum};
use tome::status::OrderStatus;
use tome_app::{
    context::AppContext,
    domain::{
        catalog::models::BookUuid,
        orders::models::{CheckoutLine, LineSelection, Order, OrderId, PaymentInfo, PaymentMethod},
        users::models::UserId,
    },
};

use super::table;

#[derive(Debug, Args)]
pub(crate) struct OrdersCommand {
    #[command(subcommand)]
    command: OrdersSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrdersSubcommand {
    Checkout(CheckoutArgs),
    List(ListOrdersArgs),
    Show(OrderArgs),
    Advance(AdvanceArgs),
    CancelLines(CancelLinesArgs),
    Cancel(OrderArgs),
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    /// Book and quantity as `<book uuid>:<quantity>`; repeatable
    #[arg(long = "line", value_name = "BOOK:QTY", value_parser = parse_checkout_line, required = true)]
    lines: Vec<CheckoutLine>,

    /// Payment method (card, transfer, phone, kakao)
    #[arg(long, default_value = "card")]
    payment_method: PaymentMethod,

    #[arg(long)]
    recipient: String,

    #[arg(long)]
    phone: String,

    #[arg(long)]
    address: String,

    #[arg(long, default_value = "")]
    detail_address: String,

    #[arg(long)]
    zip_code: String,

    #[arg(long)]
    delivery_request: Option<String>,
}

#[derive(Debug, Args)]
struct ListOrdersArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    /// Whose orders to list; defaults to the acting user
    #[arg(long, conflicts_with = "all")]
    user: Option<String>,

    /// Every order in the store (admin only)
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    order: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NextStatus {
    Paid,
    Shipped,
    Delivered,
}

impl From<NextStatus> for OrderStatus {
    fn from(status: NextStatus) -> Self {
        match status {
            NextStatus::Paid => Self::Paid,
            NextStatus::Shipped => Self::Shipped,
            NextStatus::Delivered => Self::Delivered,
        }
    }
}

#[derive(Debug, Args)]
struct AdvanceArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    order: String,

    #[arg(long, value_enum)]
    to: NextStatus,
}

#[derive(Debug, Args)]
struct CancelLinesArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    order: String,

    /// Zero-based line index and quantity as `<index>:<quantity>`; repeatable
    #[arg(long = "line", value_name = "INDEX:QTY", value_parser = parse_line_selection, required = true)]
    lines: Vec<LineSelection>,
}

pub(crate) async fn run(context: &AppContext, command: OrdersCommand) -> Result<(), String> {
    match command.command {
        OrdersSubcommand::Checkout(args) => checkout(context, args).await,
        OrdersSubcommand::List(args) => list(context, args).await,
        OrdersSubcommand::Show(args) => show(context, args).await,
        OrdersSubcommand::Advance(args) => advance(context, args).await,
        OrdersSubcommand::CancelLines(args) => cancel_lines(context, args).await,
        OrdersSubcommand::Cancel(args) => cancel(context, args).await,
    }
}

async fn checkout(context: &AppContext, args: CheckoutArgs) -> Result<(), String> {
    let payment = PaymentInfo {
        payment_method: args.payment_method,
        recipient: args.recipient,
        phone: args.phone,
        address: args.address,
        detail_address: args.detail_address,
        zip_code: args.zip_code,
        delivery_request: args.delivery_request,
    };

    let order = context
        .orders
        .complete_checkout(&UserId::from(args.caller), args.lines, payment)
        .await
        .map_err(|error| format!("failed to check out: {error}"))?;

    print_order(&order);

    Ok(())
}

async fn list(context: &AppContext, args: ListOrdersArgs) -> Result<(), String> {
    let caller = UserId::from(args.caller);

    let orders = if args.all {
        context.orders.list_all_orders(&caller).await
    } else {
        let user = args.user.map_or_else(|| caller.clone(), UserId::from);

        context.orders.list_user_orders(&caller, &user).await
    }
    .map_err(|error| format!("failed to list orders: {error}"))?;

    if orders.is_empty() {
        println!("no orders found");
        return Ok(());
    }

    println!(
        "{}",
        table::render(
            ["Order", "User", "Placed", "Items", "Total", "Fee", "Final", "Status"],
            orders.iter().map(|order| {
                [
                    order.order_id.to_string(),
                    order.user_id.to_string(),
                    order.created_at.to_string(),
                    order.units().to_string(),
                    order.total_amount.to_string(),
                    order.delivery_fee.to_string(),
                    order.final_amount.to_string(),
                    order.status.to_string(),
                ]
            }),
            &[3, 4, 5, 6],
        )
    );

    Ok(())
}

async fn show(context: &AppContext, args: OrderArgs) -> Result<(), String> {
    let order = context
        .orders
        .get_order(&UserId::from(args.caller), &OrderId::from(args.order.as_str()))
        .await
        .map_err(|error| format!("failed to load order: {error}"))?;

    print_order(&order);

    Ok(())
}

async fn advance(context: &AppContext, args: AdvanceArgs) -> Result<(), String> {
    let order = context
        .orders
        .advance_order_status(
            &UserId::from(args.caller),
            &OrderId::from(args.order.as_str()),
            args.to.into(),
        )
        .await
        .map_err(|error| format!("failed to advance order: {error}"))?;

    println!("{} is now {}", order.order_id, order.status);

    Ok(())
}

async fn cancel_lines(context: &AppContext, args: CancelLinesArgs) -> Result<(), String> {
    let order = context
        .orders
        .cancel_order_lines(
            &UserId::from(args.caller),
            &OrderId::from(args.order.as_str()),
            args.lines,
        )
        .await
        .map_err(|error| format!("failed to cancel order lines: {error}"))?;

    print_order(&order);

    Ok(())
}

async fn cancel(context: &AppContext, args: OrderArgs) -> Result<(), String> {
    let order = context
        .orders
        .cancel_whole_order(
            &UserId::from(args.caller),
            &OrderId::from(args.order.as_str()),
        )
        .await
        .map_err(|error| format!("failed to cancel order: {error}"))?;

    println!("{} is now {}", order.order_id, order.status);

    Ok(())
}

fn print_order(order: &Order) {
    println!("order_id: {}", order.order_id);
    println!("user_id: {}", order.user_id);
    println!("status: {}", order.status);
    println!("placed_at: {}", order.created_at);
    println!("payment: {}", order.payment.payment_method);
    println!(
        "ship_to: {} {}, {} ({})",
        order.payment.address,
        order.payment.detail_address,
        order.payment.recipient,
        order.payment.zip_code
    );

    println!(
        "{}",
        table::render(
            ["#", "Title", "Author", "Price", "Qty", "Subtotal"],
            order.items.iter().enumerate().map(|(index, item)| {
                [
                    index.to_string(),
                    item.title.clone(),
                    item.author.clone(),
                    item.price.to_string(),
                    item.quantity.to_string(),
                    item.price
                        .saturating_mul(u64::from(item.quantity))
                        .to_string(),
                ]
            }),
            &[0, 3, 4, 5],
        )
    );

    println!("total_amount: {}", order.total_amount);
    println!("delivery_fee: {}", order.delivery_fee);
    println!("final_amount: {}", order.final_amount);
}

fn parse_checkout_line(value: &str) -> Result<CheckoutLine, String> {
    let (book, quantity) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <book uuid>:<quantity>, got `{value}`"))?;

    Ok(CheckoutLine {
        book: book
            .parse::<BookUuid>()
            .map_err(|error| format!("invalid book id `{book}`: {error}"))?,
        quantity: quantity
            .parse()
            .map_err(|error| format!("invalid quantity `{quantity}`: {error}"))?,
    })
}

fn parse_line_selection(value: &str) -> Result<LineSelection, String> {
    let (index, quantity) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <index>:<quantity>, got `{value}`"))?;

    Ok(LineSelection {
        index: index
            .parse()
            .map_err(|error| format!("invalid line index `{index}`: {error}"))?,
        quantity: quantity
            .parse()
            .map_err(|error| format!("invalid quantity `{quantity}`: {error}"))?,
    })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn checkout_lines_parse_book_and_quantity() -> TestResult {
        let line = parse_checkout_line("0190b2f4-6c1e-7a3d-9f00-1d2c3b4a5e6f:2")?;

        assert_eq!(line.quantity, 2);
        assert_eq!(
            line.book.to_string(),
            "0190b2f4-6c1e-7a3d-9f00-1d2c3b4a5e6f"
        );

        Ok(())
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(parse_checkout_line("not-a-line").is_err());
        assert!(parse_checkout_line("not-a-uuid:1").is_err());
        assert!(parse_line_selection("0:many").is_err());
    }

    #[test]
    fn line_selections_parse_index_and_quantity() -> TestResult {
        let selection = parse_line_selection("1:3")?;

        assert_eq!(selection.index, 1);
        assert_eq!(selection.quantity, 3);

        Ok(())
    }
}
