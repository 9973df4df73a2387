use std::{env, path::PathBuf};

use anyhow::{Context, Result};

pub const ENV_WEBHOOK_URL: &str = "SKYHOOK_WEBHOOK_URL";
pub const ENV_DATABASE_URL: &str = "SKYHOOK_DATABASE_URL";
pub const ENV_BOARD_FILE: &str = "TIMERBOARD_FILE";

const DEFAULT_BOARD_FILE: &str = "timers.json";
const DATA_DIR_NAME: &str = "skyhook-timers";

/// Discordのwebhook URLを取得する。
///
/// 環境変数`SKYHOOK_WEBHOOK_URL`が設定されていない場合はエラーを返す。
pub fn webhook_url() -> Result<String> {
    env::var(ENV_WEBHOOK_URL).with_context(|| format!("{} must be set", ENV_WEBHOOK_URL))
}

/// skyhookタイマーを保存するデータベースのURLを取得する。
///
/// 環境変数`SKYHOOK_DATABASE_URL`が未設定の場合は、ユーザーのデータディレクトリ配下の
/// SQLiteファイルを利用する。
pub fn database_url() -> Result<String> {
    if let Ok(url) = env::var(ENV_DATABASE_URL) {
        return Ok(url);
    }

    let dir = dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    Ok(sqlite_url(&dir.join("skyhook.db")))
}

/// タイマーボードの保存ファイルを決める。
///
/// 引数 > 環境変数`TIMERBOARD_FILE` > カレントディレクトリの`timers.json`の順に優先する。
pub fn board_file(cli_value: Option<PathBuf>) -> PathBuf {
    cli_value
        .or_else(|| env::var_os(ENV_BOARD_FILE).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BOARD_FILE))
}

/// ファイルが無ければ作成するSQLiteの接続URL。
fn sqlite_url(path: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}
