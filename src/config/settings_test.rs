// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::collectors::FetchConfig;

#[test]
fn test_defaults_cover_every_section() {
    let settings: Settings = Settings::builder()
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(settings.visit.revisit_window_hours, 240);
    assert_eq!(settings.visit.revisit_window(), chrono::Duration::hours(240));
    assert_eq!(settings.visit.fetch_timeout(), Duration::from_secs(30));
    assert_eq!(settings.map.batch_size, 10);
    assert_eq!(settings.robots.cache_capacity, 1024);
    assert_eq!(settings.robots.cache_ttl(), Duration::from_secs(3600));
    assert_eq!(settings.robots.max_crawl_delay(), Duration::from_secs(60));
    assert_eq!(settings.scan.poll_interval(), chrono::Duration::seconds(60));
    assert_eq!(settings.scan.timeout(), chrono::Duration::hours(24));
    assert!(!settings.visit.user_agent.is_empty());
}

#[test]
fn test_overrides_take_precedence() {
    let settings: Settings = Settings::builder()
        .unwrap()
        .set_override("visit.revisit_window_hours", 1)
        .unwrap()
        .set_override("map.batch_size", 3)
        .unwrap()
        .set_override("database.url", "sqlite::memory:")
        .unwrap()
        .set_override("visit.user_agent", "acme-harvester/2.0")
        .unwrap()
        .set_override("visit.fetch_timeout_secs", 5)
        .unwrap()
        .set_override("robots.max_crawl_delay_secs", 10)
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(settings.visit.revisit_window(), chrono::Duration::hours(1));
    assert_eq!(settings.map.batch_size, 3);
    assert_eq!(settings.database.url, "sqlite::memory:");
    assert_eq!(settings.robots.max_crawl_delay(), Duration::from_secs(10));

    let fetch = FetchConfig::from(&settings.visit);
    assert_eq!(fetch.user_agent, "acme-harvester/2.0");
    assert_eq!(fetch.timeout, Duration::from_secs(5));
}
