use clap::{Args, Subcommand};
use tome_app::{
    context::AppContext,
    domain::users::models::{NewUser, UserId},
};

use super::table;

#[derive(Debug, Args)]
pub(crate) struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Debug, Subcommand)]
enum UsersSubcommand {
    Register(RegisterArgs),
    List,
    Suspend(SuspendArgs),
}

#[derive(Debug, Args)]
struct RegisterArgs {
    #[arg(long)]
    id: String,

    #[arg(long, env = "TOME_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct SuspendArgs {
    #[arg(long = "as", value_name = "USER")]
    caller: String,

    #[arg(long)]
    user: String,

    /// Suspension length in days; 0 lifts an existing suspension
    #[arg(long)]
    days: u32,
}

pub(crate) async fn run(context: &AppContext, command: UsersCommand) -> Result<(), String> {
    match command.command {
        UsersSubcommand::Register(args) => register(context, args).await,
        UsersSubcommand::List => list(context).await,
        UsersSubcommand::Suspend(args) => suspend(context, args).await,
    }
}

async fn register(context: &AppContext, args: RegisterArgs) -> Result<(), String> {
    let user = context
        .users
        .register(NewUser {
            id: UserId::from(args.id),
            password: args.password,
            email: args.email,
            name: args.name,
            ..NewUser::default()
        })
        .await
        .map_err(|error| format!("failed to register user: {error}"))?;

    println!("user_id: {}", user.id);

    Ok(())
}

async fn list(context: &AppContext) -> Result<(), String> {
    let users = context
        .users
        .list_users()
        .await
        .map_err(|error| format!("failed to list users: {error}"))?;

    println!(
        "{}",
        table::render(
            ["Id", "Role", "Name", "Email", "Wishlist", "Suspended until"],
            users.iter().map(|user| {
                [
                    user.id.to_string(),
                    if user.is_admin() { "admin" } else { "user" }.to_string(),
                    user.name.clone().unwrap_or_default(),
                    user.email.clone().unwrap_or_default(),
                    user.wishlist.len().to_string(),
                    user.suspension_until
                        .map_or_else(|| "-".to_string(), |until| until.to_string()),
                ]
            }),
            &[4],
        )
    );

    Ok(())
}

async fn suspend(context: &AppContext, args: SuspendArgs) -> Result<(), String> {
    let user = context
        .users
        .suspend_user(
            &UserId::from(args.caller),
            &UserId::from(args.user),
            args.days,
        )
        .await
        .map_err(|error| format!("failed to suspend user: {error}"))?;

    match user.suspension_until {
        Some(until) => println!("{} is suspended until {until}", user.id),
        None => println!("{} is not suspended", user.id),
    }

    Ok(())
}
