const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;

/// カウントダウン入力(`DD:HH`)が不正な場合のエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CountdownError {
    #[error("countdown must be in DD:HH format, got {0:?}")]
    Format(String),
    #[error("hours must be between 0 and 23, got {0}")]
    HoursOutOfRange(u64),
    #[error("countdown of {0} days is too long")]
    DaysOutOfRange(u64),
}

/// パース済みのカウントダウン入力。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownInput {
    pub days: u64,
    pub hours: u64,
}

impl CountdownInput {
    /// 目標時間を秒で返す。分と秒は持たない。
    ///
    /// `u64`に収まらない場合は`None`。
    pub fn seconds(&self) -> Option<u64> {
        self.days
            .checked_mul(SECONDS_PER_DAY)?
            .checked_add(self.hours.checked_mul(SECONDS_PER_HOUR)?)
    }
}

/// `DD:HH`形式のカウントダウン入力をパースする。
///
/// `:`で区切った2つの整数で、時間は0以上24未満でなければならない。
/// 合計の秒数が`u64`に収まらない日数はエラーとする。
///
/// # Examples
///
/// ```
/// let input = parse_countdown("3:5").unwrap();
/// assert_eq!(input.seconds(), Some(3 * 86400 + 5 * 3600));
/// ```
pub fn parse_countdown(input: &str) -> Result<CountdownInput, CountdownError> {
    let parts: Vec<&str> = input.trim().split(':').collect();
    let [days, hours] = parts.as_slice() else {
        return Err(CountdownError::Format(input.to_string()));
    };
    let days = days
        .trim()
        .parse::<u64>()
        .map_err(|_| CountdownError::Format(input.to_string()))?;
    let hours = hours
        .trim()
        .parse::<u64>()
        .map_err(|_| CountdownError::Format(input.to_string()))?;
    if hours >= 24 {
        return Err(CountdownError::HoursOutOfRange(hours));
    }
    let input = CountdownInput { days, hours };
    if input.seconds().is_none() {
        return Err(CountdownError::DaysOutOfRange(days));
    }

    Ok(input)
}

/// 秒数を`DD:HH:MM:SS`形式の文字列に変換する。
///
/// 小数部は切り捨て、負の値は0として扱う。
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    let days = total / SECONDS_PER_DAY;
    let hours = total % SECONDS_PER_DAY / SECONDS_PER_HOUR;
    let minutes = total % SECONDS_PER_HOUR / 60;
    let seconds = total % 60;

    format!("{:02}:{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}
