use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod board;
mod board_command;
mod config;
mod console;
mod countdown;
mod datetime;
mod discord;
mod logger;
mod notify_command;
mod persistence;
mod repository;
mod skyhook;
mod skyhook_command;
mod timer;

use board_command::{BoardArgs, BoardCommand};
use discord::DiscordWebhook;
use notify_command::NotifyCommand;
use repository::SqliteSkyhookRepository;
use skyhook_command::{run_notify, SkyhookAction, SkyhookArgs, SkyhookCommand};

/// skyhookのカウントダウンを管理するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- board add --system Jita --planet IV --countdown 1:12
/// $ cargo run -- board watch
/// $ cargo run -- skyhook add --system Jita --planet 4 --at 2024-10-01T18:30
/// $ cargo run -- skyhook notify --every 60
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short, long, help = "Shows debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    #[clap(about = "Manages the local countdown board")]
    Board(BoardArgs),
    #[clap(about = "Manages stored skyhook timers and their Discord alerts")]
    Skyhook(SkyhookArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::setup_logger(args.verbose)?;

    match args.subcommand {
        SubCommands::Board(board) => {
            let command = BoardCommand::new(board.file());
            command.run(board.action, &mut io::stdout()).await?;
        }
        SubCommands::Skyhook(skyhook) => skyhook_command(skyhook).await?,
    }

    Ok(())
}

/// `skyhook`サブコマンドの処理を行う。
async fn skyhook_command(args: SkyhookArgs) -> Result<()> {
    let database_url = config::database_url()?;
    let repository = SqliteSkyhookRepository::connect(&database_url)
        .await
        .context("Failed to open skyhook timer database")?;
    let command = SkyhookCommand::new(&repository);
    let mut stdout = io::stdout();

    match args.action {
        SkyhookAction::Add(add) => {
            command.add(add, &mut stdout).await?;
        }
        SkyhookAction::List => command.list(&mut stdout).await?,
        SkyhookAction::Delete { id } => command.delete(id, &mut stdout).await?,
        SkyhookAction::Notify(notify) => {
            let webhook = DiscordWebhook::new(config::webhook_url()?)?;
            let notify_command = NotifyCommand::new(&repository, &webhook);
            run_notify(&notify_command, notify.every).await?;
        }
    }

    Ok(())
}
