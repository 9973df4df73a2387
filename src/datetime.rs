use chrono::{DateTime, Utc};

/// 現在のUTC時間を取得する。
#[cfg(not(test))]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// UNIX時間(秒、小数部はミリ秒まで)に変換する。
///
/// タイマーボードの保存ファイルは開始時刻を浮動小数点のUNIX時間で持つため、この形式に揃える。
pub fn epoch_seconds(datetime: &DateTime<Utc>) -> f64 {
    datetime.timestamp_millis() as f64 / 1000.0
}


#[cfg(test)]
pub use mock_clock::now;
