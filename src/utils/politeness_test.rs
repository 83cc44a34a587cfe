// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use async_trait::async_trait;

/// 固定返回值的 robots 策略
struct StaticRobots {
    disallow: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl RobotsPolicy for StaticRobots {
    async fn disallowed(&self, _url: &str, _agent: &str) -> anyhow::Result<bool> {
        Ok(self.disallow)
    }

    async fn delay(&self, _url: &str, _agent: &str) -> anyhow::Result<Option<Duration>> {
        Ok(self.delay)
    }
}

fn controller(disallow: bool, delay: Option<Duration>) -> PolitenessController {
    PolitenessController::new(
        Arc::new(StaticRobots { disallow, delay }),
        HostThrottle::new(),
        "harvestrs",
        Duration::ZERO,
    )
}

#[tokio::test]
async fn test_disallowed_uri_is_rejected() {
    let stop = StopSignal::new();
    let politeness = controller(true, None);
    assert_eq!(
        politeness.admit("http://x.org/a", &stop).await,
        Admission::Disallowed
    );
    assert!(politeness.throttle().is_empty());
}

#[tokio::test]
async fn test_ignore_robots_overrides_disallow() {
    let stop = StopSignal::new();
    let politeness = controller(true, None).ignore_robots(true);
    assert_eq!(
        politeness.admit("http://x.org/a", &stop).await,
        Admission::Allowed
    );
}

#[tokio::test]
async fn test_fetch_time_recorded_before_request() {
    let stop = StopSignal::new();
    let politeness = controller(false, None);
    politeness.admit("http://x.org/a", &stop).await;
    assert_eq!(politeness.throttle().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_fetch_waits_for_crawl_delay() {
    let stop = StopSignal::new();
    let politeness = controller(false, Some(Duration::from_secs(5)));

    politeness.admit("http://x.org/a", &stop).await;
    let start = tokio::time::Instant::now();
    politeness.admit("http://x.org/b", &stop).await;
    assert!(start.elapsed() >= Duration::from_secs(4));

    // Other hosts are not delayed
    let start = tokio::time::Instant::now();
    politeness.admit("http://y.org/a", &stop).await;
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_wait_abandons_fetch() {
    let stop = StopSignal::new();
    let politeness = controller(false, Some(Duration::from_secs(30)));
    assert_eq!(
        politeness.admit("http://x.org/a", &stop).await,
        Admission::Allowed
    );

    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.stop();
    });

    let start = tokio::time::Instant::now();
    assert_eq!(
        politeness.admit("http://x.org/b", &stop).await,
        Admission::Interrupted
    );
    assert!(start.elapsed() < Duration::from_secs(30));

    // The abandoned fetch is not recorded, so the host is still throttled
    assert!(!politeness
        .throttle()
        .remaining("x.org", Duration::from_secs(30), Instant::now())
        .is_zero());
}

#[tokio::test]
async fn test_prune_idle_hosts_respects_retention() {
    let stop = StopSignal::new();
    let politeness = controller(false, None);
    politeness.admit("http://x.org/a", &stop).await;
    politeness.admit("http://y.org/a", &stop).await;

    assert_eq!(politeness.prune_idle_hosts(), 0);
    assert_eq!(politeness.throttle().len(), 2);

    let politeness = politeness.with_host_retention(Duration::ZERO);
    assert_eq!(politeness.prune_idle_hosts(), 2);
    assert!(politeness.throttle().is_empty());
}

#[tokio::test]
async fn test_ignore_throttle_skips_bookkeeping() {
    let stop = StopSignal::new();
    let politeness = controller(false, Some(Duration::from_secs(60))).ignore_throttle(true);
    politeness.admit("http://x.org/a", &stop).await;
    politeness.admit("http://x.org/b", &stop).await;
    assert!(politeness.throttle().is_empty());
}
