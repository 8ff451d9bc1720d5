use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: migration [up [N]|down [N]|fresh|status|pending]";

enum Action {
    Up(Option<u32>),
    Down(Option<u32>),
    Fresh,
    Status,
    Pending,
}

fn parse_action(mut args: impl Iterator<Item = String>) -> Option<Action> {
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = match args.next() {
        Some(raw) => Some(raw.parse::<u32>().ok()?),
        None => None,
    };

    match (cmd.as_str(), steps) {
        ("up", steps) => Some(Action::Up(steps)),
        ("down", steps) => Some(Action::Down(steps.or(Some(1)))),
        ("fresh", None) => Some(Action::Fresh),
        ("status", None) => Some(Action::Status),
        ("pending", None) => Some(Action::Pending),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(action) = parse_action(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./sitebook.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match action {
        Action::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Action::Down(steps) => migration::Migrator::down(&db, steps).await?,
        Action::Fresh => migration::Migrator::fresh(&db).await?,
        Action::Status => migration::Migrator::status(&db).await?,
        Action::Pending => {
            let pending = migration::Migrator::get_pending_migrations(&db).await?;
            for m in &pending {
                println!("{}", m.name());
            }
            if !pending.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
