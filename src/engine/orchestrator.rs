// ==========================================
// 服务覆盖排班系统 - 引擎编排器
// ==========================================
// 用途: 协调 解析 → 分配 → (外部优化器评分) → 对账 → 持久化
// 红线: 对账策略由调用方显式传入;plan 与 commit 分离
// ==========================================

use crate::config::{RosterConfigReader, RosterSettings};
use crate::domain::assignment::{CandidateAssignment, CoverageGap, CoverageOutcome, SlotStatus};
use crate::domain::history::HistoricalAssignmentRecord;
use crate::domain::position::Position;
use crate::domain::reconciliation::{ReconciliationPlan, RetractionReport};
use crate::domain::types::{ConflictPolicy, DateWindow, SlotPriority};
use crate::engine::assigner::CoverageAssigner;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::reconciliation::Reconciler;
use crate::engine::repositories::RosterRepositories;
use crate::engine::resolver::{EffectiveWorkerResolver, Resolution};
use crate::engine::roster::RosterSnapshot;
use crate::engine::scoring::{
    default_registry, CandidateSchedule, PlanningContext, RestrictionRegistry, ScoreReport,
};
use crate::repository::CoverageSaveSummary;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// CoverageOrchestrator - 引擎编排器
// ==========================================
pub struct CoverageOrchestrator<C>
where
    C: RosterConfigReader,
{
    repos: RosterRepositories,
    config: Arc<C>,
    reconciler: Reconciler,
}

impl<C> CoverageOrchestrator<C>
where
    C: RosterConfigReader,
{
    pub fn new(repos: RosterRepositories, config: Arc<C>) -> Self {
        Self {
            repos,
            config,
            reconciler: Reconciler::new(),
        }
    }

    pub fn repositories(&self) -> &RosterRepositories {
        &self.repos
    }

    /// 读取本次运行的配置快照
    pub fn settings(&self) -> EngineResult<RosterSettings> {
        RosterSettings::load(self.config.as_ref()).map_err(EngineError::config)
    }

    pub fn load_snapshot(&self, window: DateWindow) -> EngineResult<RosterSnapshot> {
        Ok(RosterSnapshot::load(&self.repos, window)?)
    }

    // ==========================================
    // 覆盖分配
    // ==========================================

    /// 对窗口执行贪心覆盖分配 (不落库)
    #[instrument(skip(self), fields(start = %window.start, end = %window.end))]
    pub fn run_assignment(&self, window: DateWindow) -> EngineResult<CoverageOutcome> {
        let settings = self.settings()?;
        let snapshot = self.load_snapshot(window)?;
        let assigner = CoverageAssigner::new(&snapshot, settings.default_shift_hours);
        Ok(assigner.assign(snapshot.positions(), &window.dates()))
    }

    /// 清空并写入覆盖结果表
    pub fn persist_coverage(&self, outcome: &CoverageOutcome) -> EngineResult<CoverageSaveSummary> {
        let summary = self.repos.coverage_repo.replace_all(outcome)?;
        info!(
            saved_assignments = summary.saved_assignments,
            saved_gaps = summary.saved_gaps,
            "覆盖结果已保存"
        );
        Ok(summary)
    }

    /// 覆盖缺口检测: 不考虑占用,两个槽位都无法解析到有效人员的 (日期, 岗位)
    pub fn detect_gaps(&self, window: DateWindow) -> EngineResult<Vec<CoverageGap>> {
        let snapshot = self.load_snapshot(window)?;
        let resolver = EffectiveWorkerResolver::new(&snapshot);

        let mut gaps = Vec::new();
        for date in window.dates() {
            for position in snapshot.positions() {
                let primary_status =
                    slot_status(&snapshot, &resolver, position, SlotPriority::Primary, date);
                let secondary_status =
                    slot_status(&snapshot, &resolver, position, SlotPriority::Secondary, date);
                if !primary_status.is_covered() && !secondary_status.is_covered() {
                    gaps.push(CoverageGap {
                        date,
                        position_code: position.position_code.clone(),
                        primary_status,
                        secondary_status,
                    });
                }
            }
        }

        info!(gaps = gaps.len(), "覆盖缺口检测完成");
        Ok(gaps)
    }

    // ==========================================
    // 历史对账
    // ==========================================

    /// 生成对账计划 (无副作用)
    pub fn plan_reconciliation(
        &self,
        window: DateWindow,
        policy: ConflictPolicy,
    ) -> EngineResult<ReconciliationPlan> {
        let book = self.repos.history_repo.load_book()?;
        Ok(self.reconciler.plan(&book, window, policy))
    }

    /// 提交对账计划 (ReplaceAll 单事务;失败整体回滚)
    pub fn commit_reconciliation(&self, plan: &ReconciliationPlan) -> EngineResult<RetractionReport> {
        self.reconciler.commit(&self.repos.history_repo, plan)
    }

    // ==========================================
    // 评分
    // ==========================================

    /// 构建评分上下文
    ///
    /// - Exclude: 附带排除表
    /// - Replace: 在内存副本上预演撤回 (计数器、历史),不触碰持久化
    pub fn planning_context(
        &self,
        window: DateWindow,
        plan: &ReconciliationPlan,
    ) -> EngineResult<PlanningContext> {
        let settings = self.settings()?;
        let snapshot = self.load_snapshot(window)?;
        let book = self.repos.history_repo.load_book()?;
        let mut context = PlanningContext::from_snapshot(&snapshot, book, &settings);

        match plan {
            ReconciliationPlan::Exclude(map) => {
                context = context.with_exclusions(map.clone());
            }
            ReconciliationPlan::Replace(retraction) => {
                self.reconciler.apply_in_memory(
                    retraction,
                    &mut context.history,
                    &mut context.workers,
                )?;
            }
            ReconciliationPlan::NoOverlap { .. } => {}
        }
        Ok(context)
    }

    /// 按配置中的权重方案构建注册表
    pub fn build_registry(&self) -> EngineResult<RestrictionRegistry> {
        let settings = self.settings()?;
        Ok(default_registry(&settings.scoring_profile)?)
    }

    /// 评估候选排班
    pub fn score(
        &self,
        assignments: &[CandidateAssignment],
        context: &PlanningContext,
    ) -> EngineResult<ScoreReport> {
        let registry = self.build_registry()?;
        let report = registry.evaluate(&CandidateSchedule::new(assignments, context));
        info!(
            total = report.total,
            weight_sum = report.weight_sum,
            failed = report.failed().count(),
            "候选排班评分完成"
        );
        Ok(report)
    }

    // ==========================================
    // 提交排班
    // ==========================================

    /// 提交已选定的排班: 写入历史并累加计数器
    pub fn commit_schedule(&self, assignments: &[CandidateAssignment]) -> EngineResult<usize> {
        let records: Vec<HistoricalAssignmentRecord> = assignments
            .iter()
            .map(HistoricalAssignmentRecord::from_candidate)
            .collect();
        Ok(self.repos.history_repo.append_schedule(&records)?)
    }
}

/// 单个槽位在指定日期的状态 (顶班人员不在人员表时视为无效)
fn slot_status(
    snapshot: &RosterSnapshot,
    resolver: &EffectiveWorkerResolver<'_>,
    position: &Position,
    priority: SlotPriority,
    date: NaiveDate,
) -> SlotStatus {
    let Some(reference) = position.slot(priority) else {
        return SlotStatus::Invalid;
    };
    let resolution = resolver.resolve_slot(reference, date);
    if let Resolution::Effective { worker_id, .. } = &resolution {
        if snapshot.worker(worker_id).is_none() {
            return SlotStatus::Invalid;
        }
    }
    resolution.to_slot_status()
}
