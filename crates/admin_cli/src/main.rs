use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Engine, ReceiptFilter, User, UserStatus};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "receipt_desk_admin")]
#[command(about = "Admin utilities for the receipt desk (bootstrap owners, whitelist, export)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./receipt_desk.db?mode=rwc"
    )]
    database_url: String,

    /// User id the actor-checked commands run as.
    #[arg(long, env = "RECEIPT_DESK_ACTOR")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(UserArgs),
    Whitelist(WhitelistArgs),
    Category(CategoryArgs),
    /// Print the CSV export of all matching receipts to stdout.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct UserArgs {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Make the signed-in user with this email an approved owner.
    Owner {
        #[arg(long)]
        email: String,
    },
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Set a user's status, bypassing role checks.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        status: StatusArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Approved,
    Denied,
}

impl From<StatusArg> for UserStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => UserStatus::Pending,
            StatusArg::Approved => UserStatus::Approved,
            StatusArg::Denied => UserStatus::Denied,
        }
    }
}

#[derive(Args, Debug)]
struct WhitelistArgs {
    #[command(subcommand)]
    command: WhitelistCommand,
}

#[derive(Subcommand, Debug)]
enum WhitelistCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        note: Option<String>,
    },
    Remove {
        #[arg(long)]
        email: String,
    },
    List,
}

#[derive(Args, Debug)]
struct CategoryArgs {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    List {
        #[arg(long)]
        include_inactive: bool,
    },
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    owner: Option<String>,
    /// First receipt date, inclusive (`YYYY-MM-DD`).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last receipt date, inclusive (`YYYY-MM-DD`).
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    include_deleted: bool,
}

fn require_actor(actor: Option<&str>) -> Result<&str, Box<dyn Error + Send + Sync>> {
    actor.ok_or_else(|| "--actor (or RECEIPT_DESK_ACTOR) is required for this command".into())
}

fn print_user(user: &User) {
    println!(
        "{}\t{}\t{}\t{}\t{}",
        user.id,
        user.email,
        user.role.as_str(),
        user.status.as_str(),
        user.display_name
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let actor = cli.actor.as_deref();

    match cli.command {
        Command::User(UserArgs { command }) => match command {
            UserCommand::Owner { email } => {
                let user = engine.bootstrap_owner(&email).await?;
                println!("owner: {} ({})", user.id, user.email);
            }
            UserCommand::List { status } => {
                let users = engine
                    .list_users(require_actor(actor)?, status.map(UserStatus::from))
                    .await?;
                for user in &users {
                    print_user(user);
                }
            }
            UserCommand::Status { id, status } => {
                let user = engine.force_user_status(&id, status.into()).await?;
                print_user(&user);
            }
        },
        Command::Whitelist(WhitelistArgs { command }) => {
            let actor = require_actor(actor)?;
            match command {
                WhitelistCommand::Add { email, note } => {
                    let entry = engine
                        .add_whitelist_entry(actor, &email, note.as_deref())
                        .await?;
                    println!("whitelisted: {}", entry.email);
                }
                WhitelistCommand::Remove { email } => {
                    engine.remove_whitelist_entry(actor, &email).await?;
                    println!("removed: {email}");
                }
                WhitelistCommand::List => {
                    for entry in engine.list_whitelist(actor).await? {
                        println!("{}\t{}\t{}", entry.email, entry.created_by, entry.note);
                    }
                }
            }
        }
        Command::Category(CategoryArgs { command }) => {
            let actor = require_actor(actor)?;
            match command {
                CategoryCommand::Create { name } => {
                    let category = engine.create_category(actor, &name).await?;
                    println!("created category: {} ({})", category.name, category.id);
                }
                CategoryCommand::List { include_inactive } => {
                    for category in engine.list_categories(actor, include_inactive).await? {
                        let state = if category.is_active { "active" } else { "inactive" };
                        println!("{}\t{}\t{state}", category.id, category.name);
                    }
                }
            }
        }
        Command::Export(args) => {
            let filter = ReceiptFilter {
                owner_user_id: args.owner,
                date_from: args.from,
                date_to: args.to,
                include_deleted: args.include_deleted,
                ..Default::default()
            };
            print!("{}", engine.export_all_receipts(&filter).await?);
        }
    }

    Ok(())
}
