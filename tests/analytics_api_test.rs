// ==========================================
// AnalyticsApi 集成测试
// ==========================================
// 测试目标: 基于 SQLite 订单库的端到端瓶颈分析
// 覆盖: 评分、分桶、热力图、参数回退、存储失败兜底
// ==========================================

mod test_helpers;

use order_bottleneck_analytics::domain::{Order, Resolution, MAX_TIME_BUCKETS};
use test_helpers::{build_api, create_test_db, order_with_history, seed_orders};

const JAN_START: &str = "2024-01-01";
const JAN_END: &str = "2024-01-31";

#[test]
fn test_transition_within_expected_duration_has_no_bottleneck() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[order_with_history(
            "A-1",
            "2024-01-10T00:00:00Z",
            &[("Initiated", "2024-01-10T00:00:00Z"), ("Requests Sent", "2024-01-10T10:00:00Z")],
        )],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("day"));
    assert!(!result.is_error());
    assert_eq!(result.stage_transitions.len(), 1);

    let t = &result.stage_transitions[0];
    assert!((t.duration - 10.0).abs() < 1e-9);
    assert_eq!(t.delay, 0.0);
    assert_eq!(result.bottleneck_scores["Initiated"], 0.0);
    assert_eq!(result.average_delays["Initiated"], 0.0);
    assert!(result.time_series_data.data["Initiated"]
        .values()
        .all(|cell| cell.count == 0 && cell.intensity == 0.0));
}

#[test]
fn test_transition_over_expected_duration_scores_stage() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[order_with_history(
            "B-1",
            "2024-01-10T00:00:00Z",
            &[("Initiated", "2024-01-10T00:00:00Z"), ("Requests Sent", "2024-01-12T02:00:00Z")],
        )],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("day"));
    let t = &result.stage_transitions[0];
    assert!((t.duration - 50.0).abs() < 1e-9);
    assert!((t.delay - 26.0).abs() < 1e-9);

    let score = result.bottleneck_scores["Initiated"];
    assert!((score - 2.0833).abs() < 1e-3);
    assert_eq!(result.sorted_bottlenecks[0].stage, "Initiated");
    assert!((result.average_delays["Initiated"] - 26.0).abs() < 1e-9);

    let cell = result.time_series_data.data["Initiated"]["2024-01-10"];
    assert_eq!(cell.count, 1);
    assert!((cell.total_delay - 26.0).abs() < 1e-9);
    assert_eq!(cell.intensity, 1.0);
}

#[test]
fn test_score_is_normalized_by_transitions_leaving_stage() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[
            order_with_history(
                "N-1",
                "2024-01-10T00:00:00Z",
                &[("Initiated", "2024-01-10T00:00:00Z"), ("Requests Sent", "2024-01-10T10:00:00Z")],
            ),
            order_with_history(
                "N-2",
                "2024-01-11T00:00:00Z",
                &[("Initiated", "2024-01-11T00:00:00Z"), ("Requests Sent", "2024-01-13T02:00:00Z")],
            ),
        ],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), None);
    let expected = (50.0 / 24.0) / 2.0;
    assert!((result.bottleneck_scores["Initiated"] - expected).abs() < 1e-9);
    assert_eq!(result.metadata.orders_with_transitions, 2);
}

#[test]
fn test_january_day_resolution_has_31_buckets() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("day"));
    let buckets = &result.time_series_data.time_buckets;

    assert_eq!(buckets.len(), 31);
    assert_eq!(buckets[0].key, "2024-01-01");
    assert_eq!(buckets[30].key, "2024-01-31");
    assert!(buckets.windows(2).all(|w| w[0].key < w[1].key));

    // 每个阶段都有完整的一行
    for row in result.time_series_data.data.values() {
        assert_eq!(row.len(), 31);
    }
    assert_eq!(result.metadata.analysis_start_date, "2024-01-01T00:00:00.000Z");
    assert_eq!(result.metadata.analysis_end_date, "2024-01-31T23:59:59.999Z");
}

#[test]
fn test_order_without_any_history_counts_but_yields_no_transitions() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[
            Order::new("D-1", "2024-01-15T00:00:00Z", "Initiated"),
            Order::new("D-2", "", "Initiated"),
        ],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("day"));
    assert!(!result.is_error());
    assert_eq!(result.metadata.total_orders_analyzed, 2);
    assert_eq!(result.metadata.orders_with_transitions, 0);
    assert!(result.stage_transitions.is_empty());
    assert!(result.bottleneck_scores.values().all(|s| *s == 0.0));
}

#[test]
fn test_hour_resolution_over_two_years_is_downgraded() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let result = api.analyze_bottlenecks(Some("2023-01-01"), Some("2024-12-31"), Some("hour"));

    assert!(!result.is_error());
    assert!(result.time_series_data.time_buckets.len() <= MAX_TIME_BUCKETS);
    assert_eq!(result.metadata.resolution, Resolution::Hour);
    assert_eq!(result.metadata.effective_resolution, Resolution::Week);
    assert!(!result.metadata.heat_map_truncated);
    // 周桶 key 为周一
    assert_eq!(result.time_series_data.time_buckets[0].key, "2022-12-26");
}

#[test]
fn test_truncated_heat_map_still_scores_full_range() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[order_with_history(
            "OLD-1",
            "2016-01-05T00:00:00Z",
            &[("Paid", "2016-01-05T00:00:00Z"), ("In Progress", "2016-01-10T00:00:00Z")],
        )],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some("2015-01-01"), Some("2024-12-31"), Some("week"));

    assert_eq!(result.time_series_data.time_buckets.len(), MAX_TIME_BUCKETS);
    assert!(result.metadata.heat_map_truncated);
    assert!(result.bottleneck_scores["Paid"] > 0.0);
    // 截断范围之外的延迟不进入热力图
    assert!(result.time_series_data.data["Paid"]
        .values()
        .all(|cell| cell.count == 0));
}

#[test]
fn test_inverted_dates_fall_back_to_default_window() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let result = api.analyze_bottlenecks(Some("2024-03-01"), Some("2024-01-01"), Some("day"));

    assert!(!result.is_error());
    assert!(result.metadata.analysis_start_date < result.metadata.analysis_end_date);
    let buckets = result.time_series_data.time_buckets.len();
    assert!(buckets > 80 && buckets <= 93, "unexpected bucket count {buckets}");
}

#[test]
fn test_unsupported_resolution_falls_back_to_day() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("fortnight"));
    assert_eq!(result.metadata.resolution, Resolution::Day);
    assert_eq!(result.time_series_data.time_buckets.len(), 31);
}

#[test]
fn test_malformed_events_are_skipped_not_fatal() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    seed_orders(
        &repo,
        &[
            order_with_history(
                "M-1",
                "2024-01-05T00:00:00Z",
                &[
                    ("Initiated", "2024-01-05T00:00:00Z"),
                    ("Requests Sent", "not a timestamp"),
                    ("Quoted", "2024-01-07T00:00:00Z"),
                ],
            ),
            order_with_history(
                "M-2",
                "2024-01-06T00:00:00Z",
                &[
                    ("On Hold", "2024-01-06T00:00:00Z"),
                    ("Accepted", "2024-01-08T00:00:00Z"),
                ],
            ),
        ],
    )
    .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), None);
    assert!(!result.is_error());
    assert_eq!(result.metadata.total_orders_analyzed, 2);
    assert_eq!(result.stage_transitions.len(), 1);
    assert_eq!(result.stage_transitions[0].from_stage, "Initiated");
    assert_eq!(result.stage_transitions[0].to_stage, "Quoted");
    assert_eq!(result.metadata.skipped_events, 1);
    assert!(!result.bottleneck_scores.contains_key("On Hold"));
}

#[test]
fn test_storage_failure_returns_canonical_empty_result() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let conn = test_helpers::open_test_connection(&db_path).unwrap();
    conn.lock()
        .unwrap()
        .execute_batch("DROP TABLE order_status_history;")
        .unwrap();

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("week"));

    assert!(result.is_error());
    assert!(result.metadata.message.is_some());
    assert!(result.bottleneck_scores.is_empty());
    assert!(result.sorted_bottlenecks.is_empty());
    assert!(result.time_series_data.time_buckets.is_empty());
    assert!(result.time_series_data.data.is_empty());
    assert_eq!(result.metadata.resolution, Resolution::Week);
    assert_eq!(result.metadata.analysis_start_date, "2024-01-01T00:00:00.000Z");
}

#[test]
fn test_result_invariants_hold_on_mixed_data() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, repo) = build_api(&db_path).expect("Failed to build api");

    let mut orders = Vec::new();
    for i in 0..20 {
        let day = i % 28 + 1;
        let hours = [5, 30, 60, 100][i % 4];
        let start = format!("2024-01-{:02}T00:00:00Z", day);
        let mid = format!("2024-01-{:02}T{:02}:00:00Z", day, hours % 24);
        let end = format!("2024-02-{:02}T00:00:00Z", day);
        orders.push(order_with_history(
            &format!("P-{i}"),
            &start,
            &[("Initiated", start.as_str()), ("Requests Sent", mid.as_str()), ("Quoted", end.as_str())],
        ));
    }
    seed_orders(&repo, &orders).unwrap();

    let result = api.analyze_bottlenecks(Some("2024-01-01"), Some("2024-02-29"), Some("day"));
    assert!(!result.is_error());

    assert!(result.bottleneck_scores.values().all(|s| *s >= 0.0));
    assert!(result
        .sorted_bottlenecks
        .windows(2)
        .all(|w| w[0].score >= w[1].score));

    for t in &result.stage_transitions {
        assert!(t.duration >= 0.0);
        assert!((t.delay - (t.duration - t.expected_duration).max(0.0)).abs() < 1e-9);
    }

    for row in result.time_series_data.data.values() {
        for cell in row.values() {
            assert!((0.0..=1.0).contains(&cell.intensity));
            if cell.count == 0 {
                assert_eq!(cell.intensity, 0.0);
            }
        }
    }
}

#[test]
fn test_result_serializes_with_camel_case_fields() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let result = api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), Some("day"));
    let json = serde_json::to_value(&result).unwrap();

    for key in [
        "bottleneckScores",
        "sortedBottlenecks",
        "averageDelays",
        "stageTransitions",
        "timeSeriesData",
        "metadata",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json["timeSeriesData"].get("timeBuckets").is_some());
    assert_eq!(json["metadata"]["resolution"], "day");
    assert_eq!(json["metadata"]["totalOrdersAnalyzed"], 0);
    assert_eq!(json["metadata"]["ordersWithTransitions"], 0);
}

#[test]
fn test_extreme_dates_fall_back_to_default_window() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    let far_future = api.analyze_bottlenecks(Some("2024-01-01"), Some("+262142-12-31"), Some("day"));
    assert!(!far_future.is_error());
    assert!(far_future.time_series_data.time_buckets.len() <= MAX_TIME_BUCKETS);

    let far_past = api.analyze_bottlenecks(None, Some("-262143-01-01"), Some("day"));
    assert!(!far_past.is_error());
    assert!(!far_past.time_series_data.time_buckets.is_empty());
}

#[test]
fn test_default_window_requests_bypass_cache() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let (api, _repo) = build_api(&db_path).expect("Failed to build api");

    api.analyze_bottlenecks(None, None, None);
    api.analyze_bottlenecks(None, Some("garbage"), None);
    let stats = api.cache_stats().unwrap();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.misses, 0);

    api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), None);
    api.analyze_bottlenecks(Some(JAN_START), Some(JAN_END), None);
    let stats = api.cache_stats().unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
}
