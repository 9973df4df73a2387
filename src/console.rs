use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::board::TimerBoard;
use crate::timer::Timer;

/// Consoleにタイマーボードを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイマーボードを表示する。
    ///
    /// # Arguments
    ///
    /// * `board` - 表示するタイマーボード
    /// * `now` - 残り時間の計算に使う現在時間
    fn show_board(&mut self, board: &TimerBoard, now: &DateTime<Utc>) -> Result<()>;
}

/// タイマーボードを固定幅の表形式で表示する。
pub struct ConsoleTable<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleTable<'a, W> {
    /// 新しい`ConsoleTable`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    fn write_row(&mut self, position: usize, timer: &Timer, now: &DateTime<Utc>) -> Result<()> {
        writeln!(
            self.writer,
            "{:>3}  {:<15} {:<15} {:<15} {:<15} {:<10} {:<8} {}",
            position,
            timer.labels.system,
            timer.labels.planet,
            timer.labels.moon,
            timer.labels.skyhook,
            timer.countdown_time,
            timer.state(),
            timer.display(now),
        )
        .with_context(|| format!("Failed to write timer row: {:?}", timer))
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleTable<'a, W> {
    fn show_board(&mut self, board: &TimerBoard, now: &DateTime<Utc>) -> Result<()> {
        if board.is_empty() {
            writeln!(self.writer, "No timers.").context("Failed to write empty board")?;
            return Ok(());
        }

        writeln!(
            self.writer,
            "{:>3}  {:<15} {:<15} {:<15} {:<15} {:<10} {:<8} {}",
            "#", "System", "Planet", "Moon", "Skyhook", "DD:HH", "State", "Remaining"
        )
        .context("Failed to write header")?;
        for (index, timer) in board.timers().iter().enumerate() {
            self.write_row(index + 1, timer, now)?;
        }

        Ok(())
    }
}
