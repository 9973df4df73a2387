use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::datetime;
use crate::discord::{Notifier, SkyhookAlert};
use crate::repository::SkyhookRepository;
use crate::skyhook::SkyhookTimer;

/// 通知する残り時間の上限(この値を含む)。
const ALERT_WINDOW_END_MINUTES: i64 = 30;
/// 通知する残り時間の下限(この値を含まない)。
const ALERT_WINDOW_START_MINUTES: i64 = 29;

/// 残り時間が通知する範囲`(29分, 30分]`に入っているかを判定する。
pub fn is_in_alert_window(remaining: Duration) -> bool {
    remaining > Duration::minutes(ALERT_WINDOW_START_MINUTES)
        && remaining <= Duration::minutes(ALERT_WINDOW_END_MINUTES)
}

/// 期限が近いskyhookタイマーを通知するタスク。
pub struct NotifyCommand<'a, R: SkyhookRepository, N: Notifier> {
    repository: &'a R,
    notifier: &'a N,
}

impl<'a, R: SkyhookRepository, N: Notifier> NotifyCommand<'a, R, N> {
    /// 新しい`NotifyCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - skyhookタイマーを保存しているリポジトリ
    /// * `notifier` - 通知の送信先
    pub fn new(repository: &'a R, notifier: &'a N) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// すべてのタイマーを確認し、期限まで30分を切ったタイマーを通知する。
    ///
    /// 通知済みのタイマーは再度通知しない。送信に失敗したタイマーは通知済みにせず、
    /// 次回の実行で再送する。送信した件数を返す。
    pub async fn run(&self) -> Result<usize> {
        let now = datetime::now();
        let timers = self
            .repository
            .list_all()
            .await
            .context("Failed to retrieve skyhook timers")?;
        debug!("Checking {} skyhook timers", timers.len());

        let mut sent = 0;
        for timer in timers.iter().filter(|timer| should_notify(timer, &now)) {
            let alert = SkyhookAlert {
                timer_name: timer.name(),
                eve_system: timer.eve_system.clone(),
                time_remaining: timer.format_remaining(&now),
            };
            if let Err(err) = self.notifier.send(&alert).await {
                warn!("Failed to notify skyhook timer {}: {:#}", timer.id, err);
                continue;
            }
            self.repository
                .mark_notified(timer.id, now)
                .await
                .with_context(|| format!("Failed to record notification for timer {}", timer.id))?;
            sent += 1;
        }
        info!("Sent {} skyhook alerts.", sent);

        Ok(sent)
    }
}

fn should_notify(timer: &SkyhookTimer, now: &DateTime<Utc>) -> bool {
    if timer.notified_at.is_some() {
        return false;
    }
    timer
        .time_remaining(now)
        .map(is_in_alert_window)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::{always, eq};
    use rstest::rstest;

    use super::{is_in_alert_window, NotifyCommand};
    use crate::datetime::mock_clock;
    use crate::discord::MockNotifier;
    use crate::repository::MockSkyhookRepository;
    use crate::skyhook::SkyhookTimer;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
    }

    fn dummy_timer(id: i64, remaining: Duration) -> SkyhookTimer {
        SkyhookTimer {
            id,
            eve_system: "Jita".to_string(),
            planet_number: 4,
            countdown_time: base_time() + remaining,
            notified_at: None,
        }
    }

    #[rstest]
    #[case::just_inside(Duration::minutes(29) + Duration::seconds(59), true)]
    #[case::upper_bound(Duration::minutes(30), true)]
    #[case::above_window(Duration::minutes(30) + Duration::seconds(1), false)]
    #[case::lower_bound(Duration::minutes(29), false)]
    #[case::below_window(Duration::minutes(28) + Duration::seconds(59), false)]
    fn test_is_in_alert_window(#[case] remaining: Duration, #[case] expected: bool) {
        assert_eq!(is_in_alert_window(remaining), expected);
    }

    /// 通知範囲のタイマーだけが通知され、通知済みとして記録されることを確認する。
    #[tokio::test]
    async fn test_run_notifies_timers_in_window() {
        mock_clock::freeze(base_time());
        let mut repository = MockSkyhookRepository::new();
        repository.expect_list_all().times(1).returning(|| {
            Ok(vec![
                dummy_timer(1, Duration::minutes(29) + Duration::seconds(59)),
                dummy_timer(2, Duration::minutes(30) + Duration::seconds(1)),
                dummy_timer(3, Duration::minutes(28) + Duration::seconds(59)),
                dummy_timer(4, Duration::minutes(-1)),
            ])
        });
        repository
            .expect_mark_notified()
            .with(eq(1), eq(base_time()))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|alert| {
                alert.timer_name == "Jita - Planet 4"
                    && alert.eve_system == "Jita"
                    && alert.time_remaining == "29m 59s"
            })
            .times(1)
            .returning(|_| Ok(()));

        let command = NotifyCommand::new(&repository, &notifier);
        let sent = command.run().await.unwrap();

        assert_eq!(sent, 1);
        mock_clock::unfreeze();
    }

    #[tokio::test]
    async fn test_run_skips_already_notified() {
        mock_clock::freeze(base_time());
        let mut repository = MockSkyhookRepository::new();
        repository.expect_list_all().times(1).returning(|| {
            let mut timer = dummy_timer(1, Duration::minutes(29) + Duration::seconds(30));
            timer.notified_at = Some(base_time() - Duration::seconds(30));
            Ok(vec![timer])
        });
        repository.expect_mark_notified().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();

        let command = NotifyCommand::new(&repository, &notifier);

        assert_eq!(command.run().await.unwrap(), 0);
        mock_clock::unfreeze();
    }

    /// 送信に失敗したタイマーは通知済みにせず、他のタイマーの通知は続けることを確認する。
    #[tokio::test]
    async fn test_run_continues_after_send_failure() {
        mock_clock::freeze(base_time());
        let mut repository = MockSkyhookRepository::new();
        repository.expect_list_all().times(1).returning(|| {
            Ok(vec![
                dummy_timer(1, Duration::minutes(29) + Duration::seconds(10)),
                dummy_timer(2, Duration::minutes(29) + Duration::seconds(20)),
            ])
        });
        repository
            .expect_mark_notified()
            .with(eq(2), always())
            .times(1)
            .returning(|_, _| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|alert| alert.time_remaining == "29m 10s")
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));
        notifier
            .expect_send()
            .withf(|alert| alert.time_remaining == "29m 20s")
            .times(1)
            .returning(|_| Ok(()));

        let command = NotifyCommand::new(&repository, &notifier);

        assert_eq!(command.run().await.unwrap(), 1);
        mock_clock::unfreeze();
    }

    #[tokio::test]
    async fn test_run_repository_error() {
        let mut repository = MockSkyhookRepository::new();
        repository
            .expect_list_all()
            .times(1)
            .returning(|| Err(anyhow!("database is locked")));
        let notifier = MockNotifier::new();

        let command = NotifyCommand::new(&repository, &notifier);

        assert!(command.run().await.is_err());
    }
}
