use std::{error::Error, io::Write, sync::Arc};

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{DEFAULT_ALPHA, Engine, HttpLedgerApi, LedgerConfig};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "budgetsync_admin")]
#[command(about = "Admin utilities for budgetsync (users, one-off syncs, forecasts)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./budgetsync.db?mode=rwc"
    )]
    database_url: String,

    #[command(flatten)]
    ledger: LedgerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LedgerArgs {
    #[arg(long, env = "BUDGETSYNC__LEDGER__BASE_URL", default_value = "https://api.ynab.com/v1")]
    base_url: String,
    #[arg(
        long,
        env = "BUDGETSYNC__LEDGER__TOKEN_URL",
        default_value = "https://app.ynab.com/oauth/token"
    )]
    token_url: String,
    #[arg(long, env = "BUDGETSYNC__LEDGER__CLIENT_ID", default_value = "")]
    client_id: String,
    #[arg(long, env = "BUDGETSYNC__LEDGER__CLIENT_SECRET", default_value = "", hide_env_values = true)]
    client_secret: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Sync one user now, ignoring the scheduler interval.
    Sync(SyncArgs),
    /// Run one scheduler tick.
    Batch,
    /// Recompute spending patterns of a budget for a year.
    Patterns(BudgetYearArgs),
    /// Print the monthly category history of a budget.
    History(BudgetYearArgs),
    /// Print the end-of-month forecast of a budget.
    Forecast(ForecastArgs),
    Cursors(Cursors),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(EmailArgs),
    /// Store a refresh token; prompts for it when not given.
    Connect(UserConnectArgs),
    Disconnect(EmailArgs),
}

#[derive(Args, Debug)]
struct EmailArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct UserConnectArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    refresh_token: Option<String>,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct BudgetYearArgs {
    #[arg(long)]
    budget: Uuid,
    #[arg(long)]
    year: i32,
}

#[derive(Args, Debug)]
struct ForecastArgs {
    #[arg(long)]
    budget: Uuid,
    /// Reference day, defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
}

#[derive(Args, Debug)]
struct Cursors {
    #[command(subcommand)]
    command: CursorsCommand,
}

#[derive(Subcommand, Debug)]
enum CursorsCommand {
    /// Force a full pull of every entity kind on the next sync.
    Reset(CursorsResetArgs),
}

#[derive(Args, Debug)]
struct CursorsResetArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    budget: Uuid,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_secret(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn build_engine(
    db: DatabaseConnection,
    ledger: LedgerArgs,
) -> Result<Engine, Box<dyn Error + Send + Sync>> {
    let api = HttpLedgerApi::new(
        reqwest::Client::new(),
        LedgerConfig {
            base_url: ledger.base_url,
            token_url: ledger.token_url,
            client_id: ledger.client_id,
            client_secret: ledger.client_secret,
        },
    );
    Ok(Engine::builder()
        .database(db)
        .ledger(Arc::new(api))
        .build()
        .await?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter("budgetsync_admin=info,engine=info")
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = build_engine(db, cli.ledger).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let user_id = engine.create_user(&args.email, Utc::now()).await?;
            println!("created user: {} ({user_id})", args.email);
        }
        Command::User(User {
            command: UserCommand::Connect(args),
        }) => {
            let user = engine.user_by_email(&args.email).await?;
            let refresh_token = match args.refresh_token {
                Some(token) => token,
                None => prompt_secret("Refresh token: ")?,
            };
            engine.connect_user(user.id, &refresh_token).await?;
            println!("connected user: {}", args.email);
        }
        Command::User(User {
            command: UserCommand::Disconnect(args),
        }) => {
            let user = engine.user_by_email(&args.email).await?;
            engine.clear_connection(user.id).await?;
            println!("disconnected user: {}", args.email);
        }
        Command::Sync(args) => {
            let user = engine.user_by_email(&args.email).await?;
            let report = engine.sync_user(user.id, Utc::now()).await?;
            print_json(&report)?;
        }
        Command::Batch => {
            let report = engine.run_due_batch(Utc::now()).await?;
            print_json(&report)?;
        }
        Command::Patterns(args) => {
            let outcome = engine
                .recompute_spending_patterns(args.budget, args.year)
                .await?;
            print_json(&outcome)?;
        }
        Command::History(args) => {
            let rows = engine.category_history(args.budget, args.year).await?;
            print_json(&rows)?;
        }
        Command::Forecast(args) => {
            let today = args.date.unwrap_or_else(|| Utc::now().date_naive());
            let forecast = engine.forecast_budget(args.budget, today, args.alpha).await?;
            print_json(&forecast)?;
        }
        Command::Cursors(Cursors {
            command: CursorsCommand::Reset(args),
        }) => {
            let user = engine.user_by_email(&args.email).await?;
            let reset = engine.reset_cursors(user.id, args.budget).await?;
            println!("reset {reset} cursors");
        }
    }

    Ok(())
}
