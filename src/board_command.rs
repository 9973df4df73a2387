use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::board::TimerBoard;
use crate::config;
use crate::console::{ConsolePresenter, ConsoleTable};
use crate::datetime;
use crate::persistence::{load_board, save_board};
use crate::timer::{TimerEdit, TimerLabels};

/// 画面を消してカーソルを左上に戻すエスケープシーケンス。
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// タイマーボードを操作するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct BoardArgs {
    #[clap(
        short = 'f',
        long = "file",
        help = "Sets the file to save timers to [default: timers.json]",
        parse(from_os_str)
    )]
    file: Option<PathBuf>,

    #[clap(subcommand)]
    pub action: BoardAction,
}

impl BoardArgs {
    /// 保存ファイルのパスを返す。
    pub fn file(&self) -> PathBuf {
        config::board_file(self.file.clone())
    }
}

/// タイマーボードに対する操作。
#[derive(Debug, clap::Subcommand)]
pub enum BoardAction {
    #[clap(about = "Adds a new timer")]
    Add(AddTimerArgs),
    #[clap(about = "Shows all timers")]
    List,
    #[clap(about = "Starts or resumes a timer")]
    Start { position: usize },
    #[clap(about = "Pauses a running timer")]
    Stop { position: usize },
    #[clap(about = "Clears a timer back to idle")]
    Reset { position: usize },
    #[clap(about = "Changes the labels or the countdown of a timer")]
    Edit(EditTimerArgs),
    #[clap(about = "Removes a timer from the board")]
    Delete { position: usize },
    #[clap(about = "Shows the board and refreshes it every second while timers are running")]
    Watch,
}

/// `add`の引数。
#[derive(Debug, Default, clap::Args)]
pub struct AddTimerArgs {
    #[clap(long, default_value = "")]
    system: String,
    #[clap(long, default_value = "")]
    planet: String,
    #[clap(long, default_value = "")]
    moon: String,
    #[clap(long, default_value = "")]
    skyhook: String,
    #[clap(long, help = "Countdown in the format DD:HH", default_value = "")]
    countdown: String,
}

/// `edit`の引数。指定しなかった項目は変更しない。
#[derive(Debug, Default, clap::Args)]
pub struct EditTimerArgs {
    position: usize,
    #[clap(long)]
    system: Option<String>,
    #[clap(long)]
    planet: Option<String>,
    #[clap(long)]
    moon: Option<String>,
    #[clap(long)]
    skyhook: Option<String>,
    #[clap(long, help = "Countdown in the format DD:HH")]
    countdown: Option<String>,
}

impl From<EditTimerArgs> for TimerEdit {
    fn from(args: EditTimerArgs) -> Self {
        Self {
            system: args.system,
            planet: args.planet,
            moon: args.moon,
            skyhook: args.skyhook,
            countdown_time: args.countdown,
        }
    }
}

pub struct BoardCommand {
    path: PathBuf,
}

impl BoardCommand {
    /// 新しい`BoardCommand`を返す。
    ///
    /// # Arguments
    /// * `path` - タイマーボードの保存ファイル
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `board`サブコマンドの処理を行う。
    ///
    /// 保存ファイルからボードを読み込み、実行中のタイマーを現在時間まで進めてから操作を適用する。
    /// 操作が成功した場合は最後にボードを保存する。
    ///
    /// # Arguments
    ///
    /// * `action` - ボードに対する操作
    /// * `writer` - ボードの表示先
    pub async fn run<W: Write>(&self, action: BoardAction, writer: &mut W) -> Result<()> {
        let mut board = load_board(&self.path).context("Failed to load timers")?;
        let now = datetime::now();
        for position in board.tick_all(&now) {
            info!("Timer {} expired while the board was closed", position);
        }

        let result = match action {
            BoardAction::Add(args) => {
                let position = board.add(
                    TimerLabels {
                        system: args.system,
                        planet: args.planet,
                        moon: args.moon,
                        skyhook: args.skyhook,
                    },
                    args.countdown,
                );
                writeln!(writer, "Added timer {}.", position).context("Failed to write output")
            }
            BoardAction::List => show(&board, writer),
            BoardAction::Start { position } => board
                .start(position, &now)
                .with_context(|| format!("Failed to start timer {}", position))
                .and_then(|_| show(&board, writer)),
            BoardAction::Stop { position } => board
                .stop(position, &now)
                .with_context(|| format!("Failed to stop timer {}", position))
                .and_then(|_| show(&board, writer)),
            BoardAction::Reset { position } => board
                .reset(position)
                .with_context(|| format!("Failed to reset timer {}", position))
                .and_then(|_| show(&board, writer)),
            BoardAction::Edit(args) => {
                let position = args.position;
                board
                    .edit(position, args.into())
                    .with_context(|| format!("Failed to edit timer {}", position))
                    .and_then(|_| show(&board, writer))
            }
            BoardAction::Delete { position } => {
                board
                    .delete(position)
                    .with_context(|| format!("Failed to delete timer {}", position))
                    .and_then(|timer| {
                        writeln!(writer, "Deleted timer {} ({}).", position, timer.labels.system)
                            .context("Failed to write output")
                    })
            }
            BoardAction::Watch => watch(&mut board, writer).await,
        };
        result?;

        save_board(&self.path, &board).context("Failed to save timers")
    }
}

fn show<W: Write>(board: &TimerBoard, writer: &mut W) -> Result<()> {
    ConsoleTable::new(writer).show_board(board, &datetime::now())
}

/// 1秒ごとにタイマーを進めてボードを再表示する。
///
/// Ctrl-Cが押されるか、実行中のタイマーが無くなったら終了する。
async fn watch<W: Write>(board: &mut TimerBoard, writer: &mut W) -> Result<()> {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping watch.");
                return Ok(());
            }
        }

        let now = datetime::now();
        for position in board.tick_all(&now) {
            info!("Timer {} expired", position);
        }
        write!(writer, "{}", CLEAR_SCREEN).context("Failed to clear screen")?;
        ConsoleTable::new(&mut *writer).show_board(board, &now)?;
        writer.flush().context("Failed to flush output")?;

        if !board.has_running() {
            debug!("No running timers left.");
            return Ok(());
        }
    }
}
