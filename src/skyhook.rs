use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

/// 保存済みのskyhookタイマー。
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SkyhookTimer {
    pub id: i64,
    pub eve_system: String,
    pub planet_number: i64,
    pub countdown_time: DateTime<Utc>,
    /// 通知を送った時間。未通知の場合は`None`。
    pub notified_at: Option<DateTime<Utc>>,
}

impl SkyhookTimer {
    /// 通知に使う`<system> - Planet <n>`形式の名前。
    pub fn name(&self) -> String {
        format!("{} - Planet {}", self.eve_system, self.planet_number)
    }

    /// 期限までの残り時間を返す。期限切れの場合は`None`。
    pub fn time_remaining(&self, now: &DateTime<Utc>) -> Option<Duration> {
        let remaining = self.countdown_time - *now;
        (remaining > Duration::zero()).then_some(remaining)
    }

    pub fn days_remaining(&self, now: &DateTime<Utc>) -> i64 {
        self.remaining_seconds(now) / 86_400
    }

    pub fn hours_remaining(&self, now: &DateTime<Utc>) -> i64 {
        self.remaining_seconds(now) % 86_400 / 3_600
    }

    pub fn minutes_remaining(&self, now: &DateTime<Utc>) -> i64 {
        self.remaining_seconds(now) % 3_600 / 60
    }

    pub fn seconds_remaining(&self, now: &DateTime<Utc>) -> i64 {
        self.remaining_seconds(now) % 60
    }

    /// 残り時間を`1d 2h 3m 4s`形式で返す。
    ///
    /// 0の単位は省略し、期限切れの場合は`Time expired`とする。
    pub fn format_remaining(&self, now: &DateTime<Utc>) -> String {
        if self.time_remaining(now).is_none() {
            return "Time expired".to_string();
        }

        let units = [
            (self.days_remaining(now), "d"),
            (self.hours_remaining(now), "h"),
            (self.minutes_remaining(now), "m"),
            (self.seconds_remaining(now), "s"),
        ];
        let parts: Vec<String> = units
            .iter()
            .filter(|(value, _)| *value > 0)
            .map(|(value, unit)| format!("{}{}", value, unit))
            .collect();
        if parts.is_empty() {
            // 1秒未満
            return "0s".to_string();
        }

        parts.join(" ")
    }

    fn remaining_seconds(&self, now: &DateTime<Utc>) -> i64 {
        self.time_remaining(now)
            .map(|remaining| remaining.num_seconds())
            .unwrap_or(0)
    }
}

/// 保存前のskyhookタイマー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSkyhookTimer {
    pub eve_system: String,
    pub planet_number: i64,
    pub countdown_time: DateTime<Utc>,
}

/// 入力フォームの検証エラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("EVE system is required")]
    MissingSystem,
    #[error("EVE system must be at most 100 characters")]
    SystemTooLong,
    #[error("planet number must be at least 1, got {0}")]
    InvalidPlanet(i64),
    #[error("days must be at least 0, got {0}")]
    InvalidDays(i64),
    #[error("hours must be between 0 and 23, got {0}")]
    InvalidHours(i64),
    #[error("minutes must be between 0 and 59, got {0}")]
    InvalidMinutes(i64),
    #[error("either a countdown time or a non-zero days/hours/minutes offset is required")]
    MissingCountdown,
    #[error("countdown of {0} days is too far in the future")]
    CountdownOutOfRange(i64),
}

const MAX_SYSTEM_LEN: usize = 100;

/// skyhookタイマーの入力フォーム。
///
/// 期限は`countdown_time`で直接指定するか、`days`/`hours`/`minutes`で現在からの相対時間として指定する。
/// 両方指定された場合は`countdown_time`を優先する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkyhookTimerForm {
    pub eve_system: String,
    pub planet_number: i64,
    pub countdown_time: Option<DateTime<Utc>>,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl SkyhookTimerForm {
    /// 入力を検証し、保存可能な`NewSkyhookTimer`を返す。
    ///
    /// # Arguments
    ///
    /// * `now` - 相対時間で指定された場合の基準時間
    pub fn validate(&self, now: &DateTime<Utc>) -> Result<NewSkyhookTimer, FormError> {
        let eve_system = self.eve_system.trim();
        if eve_system.is_empty() {
            return Err(FormError::MissingSystem);
        }
        if eve_system.chars().count() > MAX_SYSTEM_LEN {
            return Err(FormError::SystemTooLong);
        }
        if self.planet_number < 1 {
            return Err(FormError::InvalidPlanet(self.planet_number));
        }
        if self.days < 0 {
            return Err(FormError::InvalidDays(self.days));
        }
        if !(0..=23).contains(&self.hours) {
            return Err(FormError::InvalidHours(self.hours));
        }
        if !(0..=59).contains(&self.minutes) {
            return Err(FormError::InvalidMinutes(self.minutes));
        }

        let countdown_time = match self.countdown_time {
            Some(countdown_time) => countdown_time,
            None => {
                let offset = Duration::try_days(self.days)
                    .and_then(|days| days.checked_add(&Duration::hours(self.hours)))
                    .and_then(|offset| offset.checked_add(&Duration::minutes(self.minutes)))
                    .ok_or(FormError::CountdownOutOfRange(self.days))?;
                if offset == Duration::zero() {
                    return Err(FormError::MissingCountdown);
                }
                now.checked_add_signed(offset)
                    .ok_or(FormError::CountdownOutOfRange(self.days))?
            }
        };

        Ok(NewSkyhookTimer {
            eve_system: eve_system.to_string(),
            planet_number: self.planet_number,
            countdown_time,
        })
    }
}

/// 期限の入力をパースする。
///
/// HTMLの`datetime-local`形式(`YYYY-MM-DDTHH:MM`、Localタイムゾーン)とRFC 3339を受け付ける。
pub fn parse_countdown_time(s: &str) -> anyhow::Result<DateTime<Utc>> {
    use anyhow::Context;

    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.to_utc());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| format!("Failed to parse countdown time: {}", s))?;
    let datetime = Local
        .from_local_datetime(&naive)
        .single()
        .context("Failed to convert to DateTime<Local>")?
        .to_utc();

    Ok(datetime)
}
