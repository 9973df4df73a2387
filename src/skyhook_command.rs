use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use log::{error, info};

use crate::datetime;
use crate::discord::Notifier;
use crate::notify_command::NotifyCommand;
use crate::repository::SkyhookRepository;
use crate::skyhook::{parse_countdown_time, SkyhookTimer, SkyhookTimerForm};

/// skyhookタイマーを操作するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct SkyhookArgs {
    #[clap(subcommand)]
    pub action: SkyhookAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum SkyhookAction {
    #[clap(about = "Registers a new skyhook timer")]
    Add(AddSkyhookArgs),
    #[clap(about = "Shows all skyhook timers")]
    List,
    #[clap(about = "Deletes a skyhook timer")]
    Delete { id: i64 },
    #[clap(about = "Sends Discord alerts for timers about to expire")]
    Notify(NotifyArgs),
}

/// `add`の引数。フォームの各項目に対応する。
#[derive(Debug, clap::Args)]
pub struct AddSkyhookArgs {
    #[clap(short = 's', long = "system", help = "EVE system name")]
    eve_system: String,
    #[clap(short = 'p', long = "planet", help = "Planet number")]
    planet_number: i64,
    #[clap(
        long = "at",
        help = "Countdown time in the format YYYY-MM-DDTHH:MM (local time) or RFC 3339",
        parse(try_from_str = parse_countdown_time),
    )]
    countdown_time: Option<DateTime<Utc>>,
    #[clap(long, default_value = "0")]
    days: i64,
    #[clap(long, default_value = "0")]
    hours: i64,
    #[clap(long, default_value = "0")]
    minutes: i64,
}

impl From<AddSkyhookArgs> for SkyhookTimerForm {
    fn from(args: AddSkyhookArgs) -> Self {
        Self {
            eve_system: args.eve_system,
            planet_number: args.planet_number,
            countdown_time: args.countdown_time,
            days: args.days,
            hours: args.hours,
            minutes: args.minutes,
        }
    }
}

/// `notify`の引数。
#[derive(Debug, clap::Args)]
pub struct NotifyArgs {
    #[clap(
        long = "every",
        help = "Keeps running and checks the timers every N seconds"
    )]
    pub every: Option<u64>,
}

pub struct SkyhookCommand<'a, R: SkyhookRepository> {
    repository: &'a R,
}

impl<'a, R: SkyhookRepository> SkyhookCommand<'a, R> {
    /// 新しい`SkyhookCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - skyhookタイマーを保存しているリポジトリ
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// フォームを検証してタイマーを登録する。
    pub async fn add<W: Write>(&self, args: AddSkyhookArgs, writer: &mut W) -> Result<SkyhookTimer> {
        let form = SkyhookTimerForm::from(args);
        let new_timer = form
            .validate(&datetime::now())
            .context("Invalid skyhook timer")?;
        let timer = self
            .repository
            .create(&new_timer)
            .await
            .context("Failed to save skyhook timer")?;
        writeln!(writer, "Added skyhook timer {}: {}.", timer.id, timer.name())
            .context("Failed to write output")?;

        Ok(timer)
    }

    /// 登録されているタイマーを期限の早い順に表示する。
    pub async fn list<W: Write>(&self, writer: &mut W) -> Result<()> {
        let timers = self
            .repository
            .list_all()
            .await
            .context("Failed to retrieve skyhook timers")?;
        if timers.is_empty() {
            writeln!(writer, "No skyhook timers.").context("Failed to write output")?;
            return Ok(());
        }

        let now = datetime::now();
        for timer in timers {
            writeln!(
                writer,
                "{:>4}  {:<20} {:<16} {:<16} {}",
                timer.id,
                timer.name(),
                timer
                    .countdown_time
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
                timer.format_remaining(&now),
                if timer.notified_at.is_some() {
                    "notified"
                } else {
                    ""
                },
            )
            .with_context(|| format!("Failed to write skyhook timer: {:?}", timer))?;
        }

        Ok(())
    }

    pub async fn delete<W: Write>(&self, id: i64, writer: &mut W) -> Result<()> {
        let deleted = self.repository.delete(id).await?;
        if !deleted {
            anyhow::bail!("No skyhook timer with id {}", id);
        }
        writeln!(writer, "Deleted skyhook timer {}.", id).context("Failed to write output")
    }
}

/// 通知タスクを実行する。
///
/// `every`が指定された場合は、Ctrl-Cが押されるまで指定秒ごとに繰り返す。
/// 繰り返し中の失敗はログに出力して次の実行を待つ。
pub async fn run_notify<R: SkyhookRepository, N: Notifier>(
    command: &NotifyCommand<'_, R, N>,
    every: Option<u64>,
) -> Result<()> {
    let Some(every) = every else {
        command.run().await?;
        return Ok(());
    };

    let mut interval = tokio::time::interval(Duration::from_secs(every.max(1)));
    info!("Checking skyhook timers every {} seconds.", every.max(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping notifier.");
                return Ok(());
            }
        }
        if let Err(err) = command.run().await {
            error!("Skyhook notification run failed: {:#}", err);
        }
    }
}
