// ==========================================
// 覆盖分配端到端测试
// ==========================================
// 场景: 建库 → 写入人员/岗位/休假 → 分配 → 保存结果 → 缺口检测
// ==========================================


use coverage_roster::config::ConfigManager;
use coverage_roster::domain::assignment::{SlotStatus, UncoveredReason};
use coverage_roster::domain::leave::LeaveRecord;
use coverage_roster::domain::types::{DateWindow, LeaveKind, SlotPriority};
use coverage_roster::engine::CoverageOrchestrator;
use std::sync::Arc;
use test_helpers::{d, position, seed_roster, setup_repos, worker};

fn build_orchestrator() -> (
    tempfile::NamedTempFile,
    CoverageOrchestrator<ConfigManager>,
) {
    let (temp_file, conn, repos) = setup_repos().unwrap();
    seed_roster(
        &repos,
        &[
            worker("W1", "PL-1", "Z1"),
            worker("W2", "PL-2", "Z2"),
            worker("W3", "PL-3", "Z1"),
            worker("W4", "PL-4", "Z1"),
        ],
        &[
            position("SV-1", Some("PL-1"), Some("PL-3"), 1),
            position("SV-2", Some("PL-1"), None, 2),
            position("SV-3", Some("PL-9"), None, 3),
            position("SV-4", Some("PL-4"), None, 4),
        ],
    )
    .unwrap();

    repos
        .leave_repo
        .write_day(&LeaveRecord::substitution("W1", d(1), "W2"))
        .unwrap();
    repos
        .leave_repo
        .write_day(&LeaveRecord::rest("W4", d(2), LeaveKind::Manual))
        .unwrap();

    let config = ConfigManager::from_connection(conn).unwrap();
    (temp_file, CoverageOrchestrator::new(repos, Arc::new(config)))
}

#[test]
fn test_assignment_resolves_substitutes_and_records_reasons() {
    let (_tmp, orchestrator) = build_orchestrator();
    let window = DateWindow::new(d(1), d(2));

    let outcome = orchestrator.run_assignment(window).unwrap();

    assert_eq!(outcome.covered.len(), 3);
    assert_eq!(outcome.uncovered.len(), 5);

    // 6/1: 主槽位 W1 休假由 W2 顶班,继承 W2 的区域
    let sv1 = outcome
        .covered
        .iter()
        .find(|a| a.date == d(1) && a.position_code == "SV-1")
        .unwrap();
    assert_eq!(sv1.worker_id, "W2");
    assert_eq!(sv1.priority_used, SlotPriority::Primary);
    assert_eq!(sv1.covered_slot, "PL-1");
    assert_eq!(sv1.zone.as_deref(), Some("Z2"));
    assert!(sv1.is_zone_change);
    assert!(!sv1.is_shift_change);
    assert_eq!(sv1.duration_hours, 8.0);

    // SV-2 与 SV-1 共用 PL-1,当日有效人员已被占用
    let sv2 = outcome
        .uncovered
        .iter()
        .find(|u| u.date == d(1) && u.position_code == "SV-2")
        .unwrap();
    assert_eq!(
        sv2.reason,
        UncoveredReason::EffectiveWorkerAlreadyAssigned {
            slot: SlotPriority::Primary,
            worker_id: "W2".to_string(),
        }
    );

    // 6/2: W4 休假且无人顶班
    let sv4 = outcome
        .uncovered
        .iter()
        .find(|u| u.date == d(2) && u.position_code == "SV-4")
        .unwrap();
    assert_eq!(sv4.reason.code(), "on_leave_unsubstituted");

    let by_reason = outcome.uncovered_by_reason();
    assert_eq!(by_reason.get("slot_not_found"), Some(&2));
    assert_eq!(by_reason.get("effective_worker_already_assigned"), Some(&2));
}

#[test]
fn test_assignment_does_not_touch_counters() {
    let (_tmp, orchestrator) = build_orchestrator();
    orchestrator
        .run_assignment(DateWindow::new(d(1), d(2)))
        .unwrap();

    for w in orchestrator.repositories().worker_repo.list_all().unwrap() {
        assert_eq!(w.counters.annual_hours(), 0.0);
        assert_eq!(w.counters.zone_changes(), 0);
        assert!(w.last_record_id.is_none());
    }
    assert_eq!(orchestrator.repositories().history_repo.count().unwrap(), 0);
}

#[test]
fn test_persist_coverage_replaces_previous_batch() {
    let (_tmp, orchestrator) = build_orchestrator();
    let window = DateWindow::new(d(1), d(2));
    let outcome = orchestrator.run_assignment(window).unwrap();

    let first = orchestrator.persist_coverage(&outcome).unwrap();
    assert_eq!(first.cleared_assignments, 0);
    assert_eq!(first.saved_assignments, 3);
    assert_eq!(first.saved_gaps, 5);

    let second = orchestrator.persist_coverage(&outcome).unwrap();
    assert_eq!(second.cleared_assignments, 3);
    assert_eq!(second.cleared_gaps, 5);

    let coverage_repo = &orchestrator.repositories().coverage_repo;
    let stored = coverage_repo.list_assignments(window).unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().any(|a| a.worker_id == "W2" && a.date == d(1)));

    let gaps = coverage_repo.list_gaps(DateWindow::new(d(2), d(2))).unwrap();
    assert_eq!(gaps.len(), 3);
    assert!(gaps
        .iter()
        .any(|g| g.position_code == "SV-4" && g.reason_code == "on_leave_unsubstituted"));
}

#[test]
fn test_detect_gaps_ignores_occupancy() {
    let (_tmp, orchestrator) = build_orchestrator();

    let gaps = orchestrator
        .detect_gaps(DateWindow::new(d(1), d(2)))
        .unwrap();

    // SV-2 在分配中因占用未覆盖,但槽位本身可解析,不算缺口
    assert!(gaps.iter().all(|g| g.position_code != "SV-2"));
    assert_eq!(gaps.len(), 3);

    let sv4 = gaps
        .iter()
        .find(|g| g.date == d(2) && g.position_code == "SV-4")
        .unwrap();
    assert_eq!(
        sv4.primary_status,
        SlotStatus::OnLeave {
            worker_id: "W4".to_string()
        }
    );
    assert_eq!(sv4.secondary_status, SlotStatus::Invalid);
}
