use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::board::TimerBoard;
use crate::timer::Timer;

/// 保存ファイルからタイマーボードを読み込む。
///
/// ファイルが存在しない場合は空のボードを返す。
///
/// # Arguments
///
/// * `path` - JSONの保存ファイル
pub fn load_board(path: &Path) -> Result<TimerBoard> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("No saved timers at {}", path.display());
            return Ok(TimerBoard::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let timers: Vec<Timer> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse saved timers in {}", path.display()))?;
    info!("Loaded {} timers from {}", timers.len(), path.display());

    Ok(TimerBoard::new(timers))
}

/// タイマーボードを保存ファイルへ書き込む。
///
/// 一時ファイルに書き込んでからリネームするため、書き込み途中のファイルは残らない。
pub fn save_board(path: &Path, board: &TimerBoard) -> Result<()> {
    let data = serde_json::to_string(board.timers()).context("Failed to serialize timers")?;
    let tmp_path = temporary_path(path);
    fs::write(&tmp_path, data)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    info!("Saved {} timers to {}", board.len(), path.display());

    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
