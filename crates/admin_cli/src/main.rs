use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{CreateProjectCmd, Engine, EngineError, ProjectStatus};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "sitebook_admin")]
#[command(about = "Admin utilities for Sitebook (bootstrap users/projects, repair totals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./sitebook.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Project(Project),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Project {
    #[command(subcommand)]
    command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    Create(ProjectCreateArgs),
    /// Rebuild income/expense/balance from the active transactions.
    Recompute(ProjectRecomputeArgs),
}

#[derive(Args, Debug)]
struct ProjectCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    code: String,
    /// Budget in minor units (cents).
    #[arg(long, default_value_t = 0)]
    budget_minor: i64,
    #[arg(long, default_value = "PLANNED")]
    status: String,
}

#[derive(Args, Debug)]
struct ProjectRecomputeArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    id: Uuid,
}

fn parse_status(raw: &str) -> Result<ProjectStatus, String> {
    ProjectStatus::try_from(raw.to_uppercase().as_str()).map_err(|err| err.to_string())
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

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
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

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
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

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if engine.user_exists(&args.username).await? {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;
            match engine.create_user(&args.username, &password).await {
                Ok(()) => println!("created user: {}", args.username),
                Err(EngineError::ExistingKey(_)) => {
                    eprintln!("user already exists: {}", args.username);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Project(Project {
            command: ProjectCommand::Create(args),
        }) => {
            if !engine.user_exists(&args.owner).await? {
                eprintln!("user not found: {}", args.owner);
                std::process::exit(1);
            }

            let status = match parse_status(&args.status) {
                Ok(v) => v,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };

            let project = engine
                .create_project(
                    CreateProjectCmd::new(&args.owner, &args.title, &args.code)
                        .budget_minor(args.budget_minor)
                        .status(status),
                )
                .await?;
            println!("created project: {} {} ({})", project.code, project.title, project.id);
        }
        Command::Project(Project {
            command: ProjectCommand::Recompute(args),
        }) => {
            let before = engine.project(args.id, &args.owner).await?.totals;
            let project = engine
                .recompute_project_totals(args.id, &args.owner)
                .await?;
            let after = project.totals;
            if before == after {
                println!("totals already consistent for {}", project.code);
            } else {
                println!(
                    "rewrote totals for {}: income {} -> {}, expense {} -> {}, balance {} -> {}",
                    project.code,
                    before.total_income_minor,
                    after.total_income_minor,
                    before.total_expense_minor,
                    after.total_expense_minor,
                    before.balance_minor,
                    after.balance_minor,
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_case_insensitive() {
        assert_eq!(parse_status("active"), Ok(ProjectStatus::Active));
        assert_eq!(parse_status("ON_HOLD"), Ok(ProjectStatus::OnHold));
        assert!(parse_status("archived").is_err());
    }

    #[test]
    fn cli_parses_recompute() {
        let cli = Cli::try_parse_from([
            "sitebook_admin",
            "--database-url",
            "sqlite::memory:",
            "project",
            "recompute",
            "--owner",
            "alice",
            "--id",
            "6f0c1f5e-8a4b-4b8e-9a49-0e6f9a1f2b3c",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Project(Project {
                command: ProjectCommand::Recompute(_)
            })
        ));
    }
}
