use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::countdown::{format_clock, parse_countdown, CountdownError};
use crate::datetime::epoch_seconds;

/// タイマーに付けるラベル。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerLabels {
    pub system: String,
    pub planet: String,
    pub moon: String,
    pub skyhook: String,
}

/// タイマーの編集内容。`None`の項目は変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEdit {
    pub system: Option<String>,
    pub planet: Option<String>,
    pub moon: Option<String>,
    pub skyhook: Option<String>,
    pub countdown_time: Option<String>,
}

/// タイマーの状態。保存はせず、フィールドから導出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Stopped,
    Expired,
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Stopped => "stopped",
            TimerState::Expired => "expired",
        };
        f.pad(text)
    }
}

/// タイマーボードの1行分のカウントダウン。
///
/// フィールド名は保存ファイルのキーと一致させている。
/// 時刻はUNIX時間(秒)、経過時間と目標時間は秒で持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    #[serde(flatten)]
    pub labels: TimerLabels,
    /// `DD:HH`形式の入力値。
    pub countdown_time: String,
    pub running: bool,
    pub elapsed: f64,
    pub start_time: Option<f64>,
    #[serde(deserialize_with = "deserialize_target_time")]
    pub target_time: u64,
}

/// 負の日数で開始されたファイルの`target_time`は0として読み込む。
fn deserialize_target_time<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    })
}

impl Timer {
    /// 新しい`Timer`を返す。
    pub fn new(labels: TimerLabels, countdown_time: impl Into<String>) -> Self {
        Self {
            labels,
            countdown_time: countdown_time.into(),
            running: false,
            elapsed: 0.0,
            start_time: None,
            target_time: 0,
        }
    }

    /// 開始時刻からの経過も含めた合計経過時間(秒)を返す。
    pub fn total_elapsed(&self, now: &DateTime<Utc>) -> f64 {
        match (self.running, self.start_time) {
            (true, Some(start)) => self.elapsed + (epoch_seconds(now) - start),
            _ => self.elapsed,
        }
    }

    /// 残り時間(秒)を返す。負にはならない。
    pub fn remaining(&self, now: &DateTime<Utc>) -> f64 {
        (self.target_time as f64 - self.total_elapsed(now)).max(0.0)
    }

    pub fn state(&self) -> TimerState {
        if self.running {
            TimerState::Running
        } else if self.target_time > 0 && self.elapsed >= self.target_time as f64 {
            TimerState::Expired
        } else if self.start_time.is_none() && self.elapsed == 0.0 {
            TimerState::Idle
        } else {
            TimerState::Stopped
        }
    }

    /// タイマーを開始する。
    ///
    /// `countdown_time`をパースして目標時間を設定する。入力が不正な場合は状態を変えずにエラーを返す。
    /// 実行中の場合は何もしない。期限切れの場合は経過時間を0に戻してやり直す。
    pub fn start(&mut self, now: &DateTime<Utc>) -> Result<(), CountdownError> {
        if self.running {
            return Ok(());
        }
        let input = parse_countdown(&self.countdown_time)?;
        let target = input
            .seconds()
            .ok_or(CountdownError::DaysOutOfRange(input.days))?;

        if self.state() == TimerState::Expired {
            self.elapsed = 0.0;
        }
        self.target_time = target;
        self.start_time = Some(epoch_seconds(now));
        self.running = true;
        Ok(())
    }

    /// タイマーを一時停止し、経過時間を積算する。実行中でなければ何もしない。
    pub fn stop(&mut self, now: &DateTime<Utc>) {
        if !self.running {
            return;
        }
        self.elapsed = self.total_elapsed(now);
        self.running = false;
    }

    /// ラベルとカウントダウン入力を書き換える。
    ///
    /// 新しいカウントダウンは次に開始したときに使われる。実行中の目標時間は変わらない。
    pub fn edit(&mut self, edit: TimerEdit) {
        let labels = &mut self.labels;
        for (field, value) in [
            (&mut labels.system, edit.system),
            (&mut labels.planet, edit.planet),
            (&mut labels.moon, edit.moon),
            (&mut labels.skyhook, edit.skyhook),
            (&mut self.countdown_time, edit.countdown_time),
        ] {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    /// すべての積算値と目標時間を0に戻す。
    pub fn reset(&mut self) {
        self.start_time = None;
        self.running = false;
        self.elapsed = 0.0;
        self.target_time = 0;
    }

    /// 残り時間を再計算し、表示用の文字列を返す。
    ///
    /// 実行中に残り時間が0以下になった場合は期限切れとして停止する。
    pub fn tick(&mut self, now: &DateTime<Utc>) -> String {
        if self.running && self.target_time as f64 - self.total_elapsed(now) <= 0.0 {
            self.elapsed = self.target_time as f64;
            self.running = false;
        }
        self.display(now)
    }

    /// `DD:HH:MM:SS`形式の残り時間。
    pub fn display(&self, now: &DateTime<Utc>) -> String {
        format_clock(self.remaining(now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::{Timer, TimerEdit, TimerLabels, TimerState};
    use crate::countdown::CountdownError;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
    }

    fn dummy_timer(countdown: &str) -> Timer {
        Timer::new(
            TimerLabels {
                system: "Jita".to_string(),
                planet: "IV".to_string(),
                moon: "4".to_string(),
                skyhook: "Alpha".to_string(),
            },
            countdown,
        )
    }

    #[test]
    fn test_new_timer_is_idle() {
        let timer = dummy_timer("0:1");
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.display(&base_time()), "00:00:00:00");
    }

    #[test]
    fn test_start_sets_target() {
        let mut timer = dummy_timer("1:2");
        timer.start(&base_time()).unwrap();

        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.target_time, 86_400 + 2 * 3_600);
        assert_eq!(timer.display(&base_time()), "01:02:00:00");
    }

    #[rstest]
    #[case::not_a_number("abc", CountdownError::Format("abc".to_string()))]
    #[case::hours_out_of_range("3:24", CountdownError::HoursOutOfRange(24))]
    #[case::days_out_of_range(
        "999999999999999999:5",
        CountdownError::DaysOutOfRange(999_999_999_999_999_999)
    )]
    fn test_start_rejects_invalid_input(#[case] input: &str, #[case] expected: CountdownError) {
        let mut timer = dummy_timer(input);
        let before = timer.clone();

        assert_eq!(timer.start(&base_time()), Err(expected));
        assert_eq!(timer, before);
    }

    #[test]
    fn test_start_running_timer_is_noop() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();
        let before = timer.clone();

        timer.start(&(base_time() + Duration::minutes(10))).unwrap();

        assert_eq!(timer, before);
    }

    #[test]
    fn test_stop_folds_elapsed() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();
        timer.stop(&(base_time() + Duration::minutes(10)));

        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.elapsed, 600.0);
        // 停止中は時間が進んでも残り時間は変わらない
        assert_eq!(timer.display(&(base_time() + Duration::hours(5))), "00:00:50:00");
    }

    #[test]
    fn test_resume_after_stop_keeps_elapsed() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();
        timer.stop(&(base_time() + Duration::minutes(10)));
        timer.start(&(base_time() + Duration::minutes(30))).unwrap();

        assert_eq!(
            timer.display(&(base_time() + Duration::minutes(40))),
            "00:00:40:00"
        );
    }

    #[test]
    fn test_reset_from_running() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();
        timer.reset();

        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.target_time, 0);
        assert_eq!(timer.elapsed, 0.0);
        assert_eq!(timer.start_time, None);
    }

    #[test]
    fn test_tick_counts_down() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();

        assert_eq!(timer.tick(&(base_time() + Duration::seconds(1))), "00:00:59:59");
        assert!(timer.running);
    }

    /// 目標3600秒のタイマーが3600秒後に期限切れになることを確認する。
    #[test]
    fn test_tick_expires() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();

        let text = timer.tick(&(base_time() + Duration::seconds(3600)));

        assert_eq!(text, "00:00:00:00");
        assert!(!timer.running);
        assert_eq!(timer.state(), TimerState::Expired);
    }

    #[test]
    fn test_tick_long_past_expiry_clamps_to_zero() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();

        assert_eq!(timer.tick(&(base_time() + Duration::days(3))), "00:00:00:00");
        assert_eq!(timer.remaining(&(base_time() + Duration::days(4))), 0.0);
    }

    #[test]
    fn test_restart_after_expiry() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();
        timer.tick(&(base_time() + Duration::hours(2)));

        timer.start(&(base_time() + Duration::hours(3))).unwrap();

        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(
            timer.display(&(base_time() + Duration::hours(3))),
            "00:01:00:00"
        );
    }

    #[test]
    fn test_edit_changes_only_given_fields() {
        let mut timer = dummy_timer("3:24");

        timer.edit(TimerEdit {
            moon: Some("7".to_string()),
            countdown_time: Some("3:23".to_string()),
            ..Default::default()
        });

        assert_eq!(timer.labels.system, "Jita");
        assert_eq!(timer.labels.moon, "7");
        assert_eq!(timer.countdown_time, "3:23");
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn test_edit_running_timer_keeps_target() {
        let mut timer = dummy_timer("0:1");
        timer.start(&base_time()).unwrap();

        timer.edit(TimerEdit {
            countdown_time: Some("0:5".to_string()),
            ..Default::default()
        });

        assert_eq!(timer.target_time, 3_600);
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[rstest]
    #[case::negative_days(-86_400.0, 0)]
    #[case::integer(3_600.0, 3_600)]
    fn test_deserialize_target_time(#[case] target_time: f64, #[case] expected: u64) {
        let json = serde_json::json!({
            "system": "Jita",
            "planet": "",
            "moon": "",
            "skyhook": "",
            "countdown_time": "-1:0",
            "running": false,
            "elapsed": 0,
            "start_time": null,
            "target_time": target_time,
        });

        let timer: Timer = serde_json::from_value(json).unwrap();

        assert_eq!(timer.target_time, expected);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(dummy_timer("1:2")).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        keys.sort_unstable();

        assert_eq!(
            keys,
            vec![
                "countdown_time",
                "elapsed",
                "moon",
                "planet",
                "running",
                "skyhook",
                "start_time",
                "system",
                "target_time"
            ]
        );
    }
}
