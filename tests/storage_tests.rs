//! Storage backend tests
//!
//! Tests for SeaOrmStorage using temporary SQLite databases.

use std::collections::HashSet;
use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use geotrail::config::init_config;
use geotrail::errors::GeotrailError;
use geotrail::storage::backend::{PageRequest, SeaOrmStorage};
use geotrail::storage::GeolocationRecord;
use geotrail::utils::TimeParser;
use tempfile::TempDir;

// 确保 config 只初始化一次
static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// 创建测试用的记录
fn record(ip: &str, city: &str, timestamp: DateTime<Utc>) -> GeolocationRecord {
    GeolocationRecord {
        city: Some(city.to_string()),
        country_name: Some("United States".to_string()),
        ..GeolocationRecord::new(ip)
    }
    .stamp(timestamp)
}

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (SeaOrmStorage, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (storage, temp_dir)
}

fn ids(records: &[GeolocationRecord]) -> HashSet<String> {
    records.iter().filter_map(|r| r.id.clone()).collect()
}

// =============================================================================
// 写入
// =============================================================================

#[tokio::test]
async fn test_save_assigns_distinct_ids() {
    let (storage, _dir) = create_temp_storage().await;
    let now = Utc::now();

    let first = storage.save(record("8.8.8.8", "Mountain View", now)).await.unwrap();
    let second = storage.save(record("8.8.8.8", "Mountain View", now)).await.unwrap();

    assert!(first.id.is_some());
    assert!(second.id.is_some());
    assert_ne!(first.id, second.id);
    assert_eq!(storage.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_save_without_timestamp_is_rejected() {
    let (storage, _dir) = create_temp_storage().await;

    let result = storage.save(GeolocationRecord::new("1.1.1.1")).await;
    assert!(matches!(result, Err(GeotrailError::Store(_))));
    assert_eq!(storage.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_save_ignores_caller_supplied_id() {
    let (storage, _dir) = create_temp_storage().await;

    let mut input = record("1.1.1.1", "Sydney", Utc::now());
    input.id = Some("caller-chosen".to_string());

    let saved = storage.save(input).await.unwrap();
    assert_ne!(saved.id.as_deref(), Some("caller-chosen"));
}

#[tokio::test]
async fn test_field_values_round_trip() {
    let (storage, _dir) = create_temp_storage().await;

    let input = GeolocationRecord {
        id: None,
        ip: "8.8.8.8".to_string(),
        city: Some("Mountain View".to_string()),
        region: Some("California".to_string()),
        country_name: Some("United States".to_string()),
        postal: Some("94043".to_string()),
        latitude: Some("37.42301".to_string()),
        longitude: Some("-122.083352".to_string()),
        timezone: Some("America/Los_Angeles".to_string()),
        timestamp: Some(at(2024, 3, 14, 15, 9, 26)),
    };

    let saved = storage.save(input.clone()).await.unwrap();
    let history = storage.find_by_ip("8.8.8.8").await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0], saved);
    assert_eq!(
        GeolocationRecord {
            id: None,
            ..history[0].clone()
        },
        input
    );
}

#[tokio::test]
async fn test_missing_fields_stay_null() {
    let (storage, _dir) = create_temp_storage().await;

    storage
        .save(GeolocationRecord::new("9.9.9.9").stamp(Utc::now()))
        .await
        .unwrap();

    let history = storage.find_by_ip("9.9.9.9").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].city.is_none());
    assert!(history[0].timezone.is_none());
}

// =============================================================================
// 按 IP 查询
// =============================================================================

#[tokio::test]
async fn test_find_by_ip_returns_exactly_saved_set() {
    let (storage, _dir) = create_temp_storage().await;
    let base = at(2024, 5, 1, 12, 0, 0);

    let mut saved = Vec::new();
    for i in 0..4 {
        saved.push(
            storage
                .save(record("8.8.8.8", "Mountain View", base + Duration::minutes(i)))
                .await
                .unwrap(),
        );
    }
    storage
        .save(record("1.1.1.1", "Sydney", base))
        .await
        .unwrap();

    let history = storage.find_by_ip("8.8.8.8").await.unwrap();
    assert_eq!(ids(&history), ids(&saved));
    assert!(history.iter().all(|r| r.ip == "8.8.8.8"));

    // 按时间升序
    let timestamps: Vec<_> = history.iter().map(|r| r.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn test_find_by_unknown_ip_is_empty() {
    let (storage, _dir) = create_temp_storage().await;
    assert!(storage.find_by_ip("203.0.113.7").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_range_includes_both_boundary_days() {
    let (storage, _dir) = create_temp_storage().await;
    let ip = "8.8.8.8";

    let before = storage.save(record(ip, "a", at(2023, 12, 31, 23, 59, 59))).await.unwrap();
    let first_instant = storage.save(record(ip, "b", at(2024, 1, 1, 0, 0, 0))).await.unwrap();
    let middle = storage.save(record(ip, "c", at(2024, 1, 2, 8, 30, 0))).await.unwrap();
    let last_second = storage.save(record(ip, "d", at(2024, 1, 3, 23, 59, 59))).await.unwrap();
    let after = storage.save(record(ip, "e", at(2024, 1, 4, 0, 0, 0))).await.unwrap();

    let range = TimeParser::parse_day_range(Some("01.01.2024"), Some("01.03.2024"), "%m.%d.%Y")
        .unwrap()
        .unwrap();
    let found = storage
        .find_by_ip_and_timestamp_between(ip, &range)
        .await
        .unwrap();

    let found_ids = ids(&found);
    assert_eq!(found_ids, ids(&[first_instant, middle, last_second]));
    assert!(!found_ids.contains(before.id.as_deref().unwrap()));
    assert!(!found_ids.contains(after.id.as_deref().unwrap()));
}

#[tokio::test]
async fn test_range_excludes_later_record() {
    let (storage, _dir) = create_temp_storage().await;
    let ip = "192.0.2.10";

    // T1 < T2 < T3，区间覆盖 T1、T2 所在日期
    let t1 = storage.save(record(ip, "t1", at(2024, 6, 10, 9, 0, 0))).await.unwrap();
    let t2 = storage.save(record(ip, "t2", at(2024, 6, 11, 18, 0, 0))).await.unwrap();
    storage.save(record(ip, "t3", at(2024, 6, 14, 7, 0, 0))).await.unwrap();

    let range = TimeParser::parse_day_range(Some("06.10.2024"), Some("06.12.2024"), "%m.%d.%Y")
        .unwrap()
        .unwrap();
    let found = storage
        .find_by_ip_and_timestamp_between(ip, &range)
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(ids(&found), ids(&[t1, t2]));
}

#[tokio::test]
async fn test_range_is_scoped_to_ip() {
    let (storage, _dir) = create_temp_storage().await;
    let when = at(2024, 2, 2, 2, 2, 2);

    storage.save(record("8.8.8.8", "x", when)).await.unwrap();
    storage.save(record("1.1.1.1", "y", when)).await.unwrap();

    let range = TimeParser::parse_day_range(Some("02.01.2024"), Some("02.28.2024"), "%m.%d.%Y")
        .unwrap()
        .unwrap();
    let found = storage
        .find_by_ip_and_timestamp_between("1.1.1.1", &range)
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ip, "1.1.1.1");
}

// =============================================================================
// 全局查询
// =============================================================================

#[tokio::test]
async fn test_distinct_ips() {
    let (storage, _dir) = create_temp_storage().await;
    let now = Utc::now();

    for ip in ["8.8.8.8", "1.1.1.1", "8.8.8.8", "9.9.9.9", "1.1.1.1"] {
        storage.save(record(ip, "c", now)).await.unwrap();
    }

    let ips: HashSet<String> = storage.distinct_ips().await.unwrap().into_iter().collect();
    let expected: HashSet<String> = ["8.8.8.8", "1.1.1.1", "9.9.9.9"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(ips, expected);
}

#[tokio::test]
async fn test_latest_per_ip_sorted_descending() {
    let (storage, _dir) = create_temp_storage().await;
    let base = at(2024, 4, 1, 0, 0, 0);

    // 每个 IP 两条记录，后一条为最新
    storage.save(record("10.0.0.1", "old", base)).await.unwrap();
    storage.save(record("10.0.0.2", "old", base + Duration::hours(1))).await.unwrap();
    storage.save(record("10.0.0.3", "old", base + Duration::hours(2))).await.unwrap();
    let latest_1 = storage.save(record("10.0.0.1", "new", base + Duration::hours(5))).await.unwrap();
    let latest_2 = storage.save(record("10.0.0.2", "new", base + Duration::hours(3))).await.unwrap();
    let latest_3 = storage.save(record("10.0.0.3", "new", base + Duration::hours(4))).await.unwrap();

    let all = storage.find_latest_per_ip(None).await.unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(
        all.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        vec![latest_1.id, latest_3.id, latest_2.id]
    );
    assert!(all.iter().all(|r| r.city.as_deref() == Some("new")));
}

#[tokio::test]
async fn test_latest_per_ip_paging() {
    let (storage, _dir) = create_temp_storage().await;
    let base = at(2024, 4, 1, 0, 0, 0);

    for i in 0..5 {
        let ip = format!("10.0.1.{}", i);
        storage
            .save(record(&ip, "c", base + Duration::minutes(i)))
            .await
            .unwrap();
    }

    let first = storage
        .find_latest_per_ip(Some(PageRequest::of(0, 2)))
        .await
        .unwrap();
    assert_eq!(
        first.iter().map(|r| r.ip.as_str()).collect::<Vec<_>>(),
        vec!["10.0.1.4", "10.0.1.3"]
    );

    let second = storage
        .find_latest_per_ip(Some(PageRequest::of(1, 2)))
        .await
        .unwrap();
    assert_eq!(
        second.iter().map(|r| r.ip.as_str()).collect::<Vec<_>>(),
        vec!["10.0.1.2", "10.0.1.1"]
    );

    let beyond = storage
        .find_latest_per_ip(Some(PageRequest::of(5, 2)))
        .await
        .unwrap();
    assert!(beyond.is_empty());
}

#[tokio::test]
async fn test_latest_on_empty_store_is_empty() {
    let (storage, _dir) = create_temp_storage().await;
    assert!(storage.find_latest_per_ip(None).await.unwrap().is_empty());
    assert!(
        storage
            .find_latest_per_ip(Some(PageRequest::of(0, 10)))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_latest_per_ip_same_timestamp_yields_one_row() {
    let (storage, _dir) = create_temp_storage().await;
    let ts = at(2024, 4, 2, 8, 0, 0);

    storage.save(record("10.0.3.1", "a", ts)).await.unwrap();
    storage.save(record("10.0.3.1", "b", ts)).await.unwrap();
    storage.save(record("10.0.3.2", "c", ts - Duration::hours(1))).await.unwrap();

    let all = storage.find_latest_per_ip(None).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.ip.as_str()).collect::<Vec<_>>(),
        vec!["10.0.3.1", "10.0.3.2"]
    );
}

#[tokio::test]
async fn test_latest_per_ip_with_many_distinct_ips() {
    use geotrail::storage::backend::record_to_active_model;
    use migration::entities::geolocation;
    use sea_orm::EntityTrait;

    const IPS: u32 = 40_000;

    let (storage, _dir) = create_temp_storage().await;
    let base = at(2024, 5, 1, 0, 0, 0);

    // 超过 SQLite 单语句 32766 个绑定变量的上限
    let rows: Vec<_> = (0..IPS)
        .map(|i| {
            let ip = format!("10.{}.{}.{}", i >> 16, (i >> 8) & 0xff, i & 0xff);
            let ts = base + Duration::seconds(i as i64);
            record_to_active_model(&GeolocationRecord::new(&ip), &format!("bulk-{:05}", i), ts)
        })
        .collect();
    for chunk in rows.chunks(1000) {
        geolocation::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(storage.get_db())
            .await
            .unwrap();
    }
    // 最新 IP 另有一条更旧的记录
    storage.save(record("10.0.156.63", "older", base)).await.unwrap();

    let page = storage
        .find_latest_per_ip(Some(PageRequest::of(0, 3)))
        .await
        .unwrap();
    assert_eq!(
        page.iter().map(|r| r.ip.as_str()).collect::<Vec<_>>(),
        vec!["10.0.156.63", "10.0.156.62", "10.0.156.61"]
    );
    assert_eq!(page[0].id.as_deref(), Some("bulk-39999"));

    let last = storage
        .find_latest_per_ip(Some(PageRequest::of(IPS as u64 / 3, 3)))
        .await
        .unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].ip, "10.0.0.0");
}

#[tokio::test]
async fn test_page_offset_overflow_is_store_error() {
    let (storage, _dir) = create_temp_storage().await;
    storage.save(record("10.0.4.1", "a", at(2024, 6, 1, 0, 0, 0))).await.unwrap();
    let range = TimeParser::parse_day_range(Some("06.01.2024"), Some("06.01.2024"), "%m.%d.%Y")
        .unwrap()
        .unwrap();

    for page in [
        PageRequest::of(u64::MAX, 2),
        PageRequest::of(2, u64::MAX / 2),
        PageRequest::of(0, u64::MAX),
    ] {
        assert!(matches!(
            storage.find_by_timestamp_between(&range, Some(page)).await,
            Err(GeotrailError::Store(_))
        ));
        assert!(matches!(
            storage.find_latest_per_ip(Some(page)).await,
            Err(GeotrailError::Store(_))
        ));
    }
}

#[tokio::test]
async fn test_timestamp_between_across_ips_descending_and_paged() {
    let (storage, _dir) = create_temp_storage().await;

    storage.save(record("10.0.2.1", "a", at(2024, 8, 1, 1, 0, 0))).await.unwrap();
    storage.save(record("10.0.2.2", "b", at(2024, 8, 1, 2, 0, 0))).await.unwrap();
    storage.save(record("10.0.2.1", "c", at(2024, 8, 2, 3, 0, 0))).await.unwrap();
    storage.save(record("10.0.2.3", "d", at(2024, 8, 9, 0, 0, 0))).await.unwrap();

    let range = TimeParser::parse_day_range(Some("08.01.2024"), Some("08.02.2024"), "%m.%d.%Y")
        .unwrap()
        .unwrap();

    let all = storage.find_by_timestamp_between(&range, None).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.city.as_deref().unwrap()).collect::<Vec<_>>(),
        vec!["c", "b", "a"]
    );

    let page0 = storage
        .find_by_timestamp_between(&range, Some(PageRequest::of(0, 2)))
        .await
        .unwrap();
    assert_eq!(
        page0.iter().map(|r| r.city.as_deref().unwrap()).collect::<Vec<_>>(),
        vec!["c", "b"]
    );

    let page1 = storage
        .find_by_timestamp_between(&range, Some(PageRequest::of(1, 2)))
        .await
        .unwrap();
    assert_eq!(
        page1.iter().map(|r| r.city.as_deref().unwrap()).collect::<Vec<_>>(),
        vec!["a"]
    );
}

#[tokio::test]
async fn test_backend_config() {
    let (storage, _dir) = create_temp_storage().await;
    assert_eq!(storage.get_backend_config().await.storage_type, "sqlite");
}
