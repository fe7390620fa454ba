// ==========================================
// 加权评分集成测试
// ==========================================
// 场景: 分配结果 → 评分上下文 → 默认注册表评分 / 权重方案覆写
// ==========================================


use coverage_roster::config::{config_keys, ConfigManager};
use coverage_roster::domain::history::HistoricalAssignmentRecord;
use coverage_roster::domain::leave::LeaveRecord;
use coverage_roster::domain::types::{ConflictPolicy, DateWindow, LeaveKind, WeightBand};
use coverage_roster::engine::{CoverageOrchestrator, RestrictionOutcome};
use std::sync::Arc;
use test_helpers::{d, position, seed_roster, setup_repos, worker};

fn build_orchestrator() -> (
    tempfile::NamedTempFile,
    Arc<ConfigManager>,
    CoverageOrchestrator<ConfigManager>,
) {
    let (temp_file, conn, repos) = setup_repos().unwrap();
    seed_roster(
        &repos,
        &[
            worker("W1", "PL-1", "Z1"),
            worker("W2", "PL-2", "Z1"),
            worker("W3", "PL-3", "Z1"),
        ],
        &[
            position("SV-1", Some("PL-1"), Some("PL-3"), 1),
            position("SV-2", Some("PL-2"), None, 2),
        ],
    )
    .unwrap();
    let config = Arc::new(ConfigManager::from_connection(conn).unwrap());
    let orchestrator = CoverageOrchestrator::new(repos, config.clone());
    (temp_file, config, orchestrator)
}

fn score_of(outcome: &RestrictionOutcome) -> f64 {
    match outcome {
        RestrictionOutcome::Scored { score, .. } => *score,
        RestrictionOutcome::Failed { reason } => panic!("restriction failed: {}", reason),
    }
}

#[test]
fn test_greedy_outcome_scores_with_default_registry() {
    let (_tmp, _config, orchestrator) = build_orchestrator();
    let window = DateWindow::new(d(1), d(3));
    orchestrator
        .repositories()
        .leave_repo
        .write_day(&LeaveRecord::rest("W2", d(2), LeaveKind::Base))
        .unwrap();

    let outcome = orchestrator.run_assignment(window).unwrap();
    assert_eq!(outcome.covered.len(), 5);

    let plan = orchestrator
        .plan_reconciliation(window, ConflictPolicy::AddNewOnly)
        .unwrap();
    let context = orchestrator.planning_context(window, &plan).unwrap();
    let report = orchestrator.score(&outcome.covered, &context).unwrap();

    assert!(!report.has_failures());
    assert!(report.weights_balanced());
    assert_eq!(report.results.len(), 11);
    assert_eq!(score_of(&report.get("one_assignment_per_day").unwrap().outcome), 100.0);
    assert_eq!(score_of(&report.get("no_leave_conflict").unwrap().outcome), 100.0);

    // 6 个需求中 5 个被覆盖
    let coverage = score_of(&report.get("coverage_complete").unwrap().outcome);
    assert!((coverage - 500.0 / 6.0).abs() < 1e-9);

    let bands = report.by_band();
    assert_eq!(bands.get(&WeightBand::Critical).map(Vec::len), Some(7));
    assert_eq!(bands.get(&WeightBand::Important).map(Vec::len), Some(3));
    assert_eq!(bands.get(&WeightBand::Equity).map(Vec::len), Some(1));
    assert!(report.total > 0.0 && report.total <= 100.0);
}

#[test]
fn test_add_new_only_exclusions_penalise_double_booking() {
    let (_tmp, _config, orchestrator) = build_orchestrator();
    let window = DateWindow::new(d(1), d(1));
    let outcome = orchestrator.run_assignment(window).unwrap();

    // W1 在 6/1 已有历史分配
    let existing = outcome
        .covered
        .iter()
        .find(|a| a.worker_id == "W1")
        .map(HistoricalAssignmentRecord::from_candidate)
        .unwrap();
    orchestrator
        .repositories()
        .history_repo
        .append_schedule(&[existing])
        .unwrap();

    let plan = orchestrator
        .plan_reconciliation(window, ConflictPolicy::AddNewOnly)
        .unwrap();
    let context = orchestrator.planning_context(window, &plan).unwrap();
    let report = orchestrator.score(&outcome.covered, &context).unwrap();
    assert_eq!(score_of(&report.get("no_leave_conflict").unwrap().outcome), 50.0);

    // ReplaceAll 预演撤回后不再冲突,且库内历史不变
    let plan = orchestrator
        .plan_reconciliation(window, ConflictPolicy::ReplaceAll)
        .unwrap();
    let context = orchestrator.planning_context(window, &plan).unwrap();
    let report = orchestrator.score(&outcome.covered, &context).unwrap();
    assert_eq!(score_of(&report.get("no_leave_conflict").unwrap().outcome), 100.0);
    assert_eq!(orchestrator.repositories().history_repo.count().unwrap(), 1);
}

#[test]
fn test_scoring_profile_overrides_weights() {
    let (_tmp, config, orchestrator) = build_orchestrator();
    config
        .set_global_config_value(
            config_keys::SCORING_PROFILE,
            r#"{"profile_id":"equity-heavy","weights":{"balanced_distribution":0.5},"disabled":["coverage_complete"]}"#,
        )
        .unwrap();

    let registry = orchestrator.build_registry().unwrap();
    assert_eq!(registry.len(), 10);
    let balanced = registry
        .restrictions()
        .iter()
        .find(|r| r.name == "balanced_distribution")
        .unwrap();
    assert_eq!(balanced.weight, 0.5);
    assert_eq!(balanced.band(), WeightBand::Critical);
}

#[test]
fn test_invalid_profile_weight_is_rejected() {
    let (_tmp, config, orchestrator) = build_orchestrator();
    config
        .set_global_config_value(
            config_keys::SCORING_PROFILE,
            r#"{"weights":{"zone_change_equity":1.5}}"#,
        )
        .unwrap();

    assert!(orchestrator.build_registry().is_err());
}
