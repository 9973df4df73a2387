use chrono::{DateTime, Utc};

use crate::countdown::CountdownError;
use crate::timer::{Timer, TimerEdit, TimerLabels};

/// タイマーボード操作のエラー。
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("no timer at position {position} (board has {len})")]
    NotFound { position: usize, len: usize },
    #[error(transparent)]
    Countdown(#[from] CountdownError),
}

/// 複数のタイマーを表示順に保持する。
///
/// 各操作は1始まりの位置でタイマーを指定する。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerBoard {
    timers: Vec<Timer>,
}

impl TimerBoard {
    pub fn new(timers: Vec<Timer>) -> Self {
        Self { timers }
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// タイマーを末尾に追加し、その位置を返す。
    pub fn add(&mut self, labels: TimerLabels, countdown_time: impl Into<String>) -> usize {
        self.timers.push(Timer::new(labels, countdown_time));
        self.timers.len()
    }

    pub fn get(&self, position: usize) -> Result<&Timer, BoardError> {
        let len = self.timers.len();
        position
            .checked_sub(1)
            .and_then(|index| self.timers.get(index))
            .ok_or(BoardError::NotFound { position, len })
    }

    fn get_mut(&mut self, position: usize) -> Result<&mut Timer, BoardError> {
        let len = self.timers.len();
        position
            .checked_sub(1)
            .and_then(|index| self.timers.get_mut(index))
            .ok_or(BoardError::NotFound { position, len })
    }

    pub fn start(&mut self, position: usize, now: &DateTime<Utc>) -> Result<(), BoardError> {
        self.get_mut(position)?.start(now)?;
        Ok(())
    }

    pub fn stop(&mut self, position: usize, now: &DateTime<Utc>) -> Result<(), BoardError> {
        self.get_mut(position)?.stop(now);
        Ok(())
    }

    pub fn reset(&mut self, position: usize) -> Result<(), BoardError> {
        self.get_mut(position)?.reset();
        Ok(())
    }

    /// タイマーのラベルとカウントダウン入力を書き換える。
    pub fn edit(&mut self, position: usize, edit: TimerEdit) -> Result<(), BoardError> {
        self.get_mut(position)?.edit(edit);
        Ok(())
    }

    /// タイマーを削除して返す。後ろのタイマーの位置は1つずつ繰り上がる。
    pub fn delete(&mut self, position: usize) -> Result<Timer, BoardError> {
        self.get(position)?;
        Ok(self.timers.remove(position - 1))
    }

    /// 実行中のタイマーをすべて進め、期限切れになったタイマーの位置を返す。
    pub fn tick_all(&mut self, now: &DateTime<Utc>) -> Vec<usize> {
        self.timers
            .iter_mut()
            .enumerate()
            .filter(|(_, timer)| timer.running)
            .filter_map(|(index, timer)| {
                timer.tick(now);
                (!timer.running).then_some(index + 1)
            })
            .collect()
    }

    pub fn has_running(&self) -> bool {
        self.timers.iter().any(|timer| timer.running)
    }
}
