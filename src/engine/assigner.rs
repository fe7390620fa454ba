// ==========================================
// 服务覆盖排班系统 - 贪心覆盖分配引擎
// ==========================================
// 职责: 按日、按岗位为每个岗位确定覆盖人员
// 输入: 岗位序列 (调用方顺序) + 日期序列
// 输出: CoverageOutcome (已覆盖 + 带原因的未覆盖)
// 红线: 日期严格按时间顺序;岗位按调用方顺序;同输入同输出
// 红线: 同一人员同一日期最多覆盖一个岗位 (占用集合)
// 红线: 只接受岗位主/次槽位指向的人员,不做临时匹配
// ==========================================

use crate::domain::assignment::{
    CandidateAssignment, CoverageOutcome, UncoveredPosition, UncoveredReason,
};
use crate::domain::position::Position;
use crate::domain::types::SlotPriority;
use crate::domain::worker::Worker;
use crate::engine::resolver::{EffectiveWorkerResolver, Resolution};
use crate::engine::roster::RosterSnapshot;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// 单个槽位的评估结果
enum SlotOutcome {
    Accepted(CandidateAssignment),
    Rejected(UncoveredReason),
    /// 数据完整性问题: 中止该岗位当日处理,不再评估后续槽位
    Aborted(UncoveredReason),
}

// ==========================================
// CoverageAssigner - 贪心覆盖分配引擎
// ==========================================
pub struct CoverageAssigner<'a> {
    snapshot: &'a RosterSnapshot,
    resolver: EffectiveWorkerResolver<'a>,
    default_shift_hours: f64,
}

impl<'a> CoverageAssigner<'a> {
    pub fn new(snapshot: &'a RosterSnapshot, default_shift_hours: f64) -> Self {
        Self {
            snapshot,
            resolver: EffectiveWorkerResolver::new(snapshot),
            default_shift_hours,
        }
    }

    /// 单次贪心分配 (无回溯)
    #[instrument(skip(self, positions, dates), fields(
        positions_count = positions.len(),
        dates_count = dates.len()
    ))]
    pub fn assign(&self, positions: &[Position], dates: &[NaiveDate]) -> CoverageOutcome {
        let mut dates: Vec<NaiveDate> = dates.to_vec();
        dates.sort();
        dates.dedup();

        let mut outcome = CoverageOutcome::default();

        for date in dates {
            let mut occupied: HashSet<String> = HashSet::new();

            for position in positions {
                match self.assign_position(position, date, &occupied) {
                    Ok(assignment) => {
                        occupied.insert(assignment.worker_id.clone());
                        outcome.covered.push(assignment);
                    }
                    Err(reason) => {
                        debug!(
                            date = %date,
                            position_code = %position.position_code,
                            reason_code = reason.code(),
                            "岗位未覆盖"
                        );
                        outcome.uncovered.push(UncoveredPosition {
                            date,
                            position_code: position.position_code.clone(),
                            reason,
                            rotation: position.rotation.clone(),
                            qualifications: position.required_qualifications.clone(),
                            line: position.line.clone(),
                            zone: position.zone.clone(),
                        });
                    }
                }
            }
        }

        info!(
            covered = outcome.covered.len(),
            uncovered = outcome.uncovered.len(),
            coverage_pct = outcome.coverage_pct(),
            "覆盖分配完成"
        );
        outcome
    }

    /// 按优先级依次评估主/次槽位
    ///
    /// 未覆盖原因取最后一个被评估槽位的原因 (次槽位存在时覆盖主槽位原因)
    fn assign_position(
        &self,
        position: &Position,
        date: NaiveDate,
        occupied: &HashSet<String>,
    ) -> Result<CandidateAssignment, UncoveredReason> {
        let mut last_reason: Option<UncoveredReason> = None;

        for priority in [SlotPriority::Primary, SlotPriority::Secondary] {
            let Some(reference) = position.slot(priority) else {
                continue;
            };

            match self.evaluate_slot(position, priority, reference, date, occupied) {
                SlotOutcome::Accepted(assignment) => return Ok(assignment),
                SlotOutcome::Rejected(reason) => last_reason = Some(reason),
                SlotOutcome::Aborted(reason) => return Err(reason),
            }
        }

        Err(last_reason.unwrap_or(UncoveredReason::NoCandidateSlots))
    }

    fn evaluate_slot(
        &self,
        position: &Position,
        priority: SlotPriority,
        reference: &str,
        date: NaiveDate,
        occupied: &HashSet<String>,
    ) -> SlotOutcome {
        let worker_id = match self.resolver.resolve_slot(reference, date) {
            Resolution::NotFound { reference } => {
                return SlotOutcome::Rejected(UncoveredReason::SlotNotFound {
                    slot: priority,
                    reference,
                })
            }
            Resolution::Uncovered { home_worker_id } => {
                return SlotOutcome::Rejected(UncoveredReason::OnLeaveUnsubstituted {
                    slot: priority,
                    worker_id: home_worker_id,
                })
            }
            Resolution::Effective { worker_id, .. } => worker_id,
        };

        let Some(worker) = self.snapshot.worker(&worker_id) else {
            return SlotOutcome::Aborted(UncoveredReason::EffectiveWorkerNotFound {
                slot: priority,
                worker_id,
            });
        };

        if occupied.contains(&worker.worker_id) {
            return SlotOutcome::Rejected(UncoveredReason::EffectiveWorkerAlreadyAssigned {
                slot: priority,
                worker_id,
            });
        }

        SlotOutcome::Accepted(self.build_assignment(position, priority, reference, date, worker))
    }

    /// 生成候选分配: zone/rotation/group 取自有效人员,资质/线路取自岗位
    fn build_assignment(
        &self,
        position: &Position,
        priority: SlotPriority,
        reference: &str,
        date: NaiveDate,
        worker: &Worker,
    ) -> CandidateAssignment {
        CandidateAssignment {
            date,
            position_code: position.position_code.clone(),
            worker_id: worker.worker_id.clone(),
            priority_used: priority,
            covered_slot: reference.to_string(),
            duration_hours: position.duration_or(self.default_shift_hours),
            is_zone_change: differs(position.zone.as_deref(), worker.zone.as_deref()),
            is_shift_change: differs(position.rotation.as_deref(), worker.rotation.as_deref()),
            zone: worker.zone.clone(),
            rotation: worker.rotation.clone(),
            member_group: worker.member_group.clone(),
            qualifications: position.required_qualifications.clone(),
            line: position.line.clone(),
        }
    }
}

/// 两侧均有值且不同
fn differs(position_value: Option<&str>, worker_value: Option<&str>) -> bool {
    match (position_value, worker_value) {
        (Some(p), Some(w)) => !p.trim().is_empty() && !w.trim().is_empty() && p.trim() != w.trim(),
        _ => false,
    }
}
