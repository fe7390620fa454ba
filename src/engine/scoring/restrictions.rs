// ==========================================
// 服务覆盖排班系统 - 内置约束
// ==========================================
// 权重 (默认合计 1.00):
//   critical : one_assignment_per_day 0.18 / schedulable_group_only 0.13 /
//              no_leave_conflict 0.13 / required_qualification 0.10 /
//              annual_hours_cap 0.10 / coverage_complete 0.10 /
//              line_correct 0.10
//   important: max_consecutive_days 0.08 / zone_change_equity 0.03 /
//              shift_change_equity 0.03
//   equity   : balanced_distribution 0.02
// 评分: 0~100;引用的人员/岗位不存在时该项失败
// ==========================================

use crate::config::ScoringProfile;
use crate::domain::history::{mean, population_stddev};
use crate::engine::scoring::context::CandidateSchedule;
use crate::engine::scoring::registry::RestrictionRegistry;
use crate::engine::scoring::{RestrictionError, ScoringError};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRestriction {
    OneAssignmentPerDay,
    SchedulableGroupOnly,
    NoLeaveConflict,
    RequiredQualification,
    AnnualHoursCap,
    CoverageComplete,
    LineCorrect,
    MaxConsecutiveDays,
    ZoneChangeEquity,
    ShiftChangeEquity,
    BalancedDistribution,
}

/// 内置约束 (注册顺序)
pub fn builtin_restrictions() -> [BuiltinRestriction; 11] {
    use BuiltinRestriction::*;
    [
        OneAssignmentPerDay,
        SchedulableGroupOnly,
        NoLeaveConflict,
        RequiredQualification,
        AnnualHoursCap,
        CoverageComplete,
        LineCorrect,
        MaxConsecutiveDays,
        ZoneChangeEquity,
        ShiftChangeEquity,
        BalancedDistribution,
    ]
}

impl BuiltinRestriction {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinRestriction::OneAssignmentPerDay => "one_assignment_per_day",
            BuiltinRestriction::SchedulableGroupOnly => "schedulable_group_only",
            BuiltinRestriction::NoLeaveConflict => "no_leave_conflict",
            BuiltinRestriction::RequiredQualification => "required_qualification",
            BuiltinRestriction::AnnualHoursCap => "annual_hours_cap",
            BuiltinRestriction::CoverageComplete => "coverage_complete",
            BuiltinRestriction::LineCorrect => "line_correct",
            BuiltinRestriction::MaxConsecutiveDays => "max_consecutive_days",
            BuiltinRestriction::ZoneChangeEquity => "zone_change_equity",
            BuiltinRestriction::ShiftChangeEquity => "shift_change_equity",
            BuiltinRestriction::BalancedDistribution => "balanced_distribution",
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            BuiltinRestriction::OneAssignmentPerDay => 0.18,
            BuiltinRestriction::SchedulableGroupOnly => 0.13,
            BuiltinRestriction::NoLeaveConflict => 0.13,
            BuiltinRestriction::RequiredQualification => 0.10,
            BuiltinRestriction::AnnualHoursCap => 0.10,
            BuiltinRestriction::CoverageComplete => 0.10,
            BuiltinRestriction::LineCorrect => 0.10,
            BuiltinRestriction::MaxConsecutiveDays => 0.08,
            BuiltinRestriction::ZoneChangeEquity => 0.03,
            BuiltinRestriction::ShiftChangeEquity => 0.03,
            BuiltinRestriction::BalancedDistribution => 0.02,
        }
    }

    pub fn evaluate(&self, schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
        match self {
            BuiltinRestriction::OneAssignmentPerDay => one_assignment_per_day(schedule),
            BuiltinRestriction::SchedulableGroupOnly => schedulable_group_only(schedule),
            BuiltinRestriction::NoLeaveConflict => no_leave_conflict(schedule),
            BuiltinRestriction::RequiredQualification => required_qualification(schedule),
            BuiltinRestriction::AnnualHoursCap => annual_hours_cap(schedule),
            BuiltinRestriction::CoverageComplete => coverage_complete(schedule),
            BuiltinRestriction::LineCorrect => line_correct(schedule),
            BuiltinRestriction::MaxConsecutiveDays => max_consecutive_days(schedule),
            BuiltinRestriction::ZoneChangeEquity => change_equity(schedule, ChangeKind::Zone),
            BuiltinRestriction::ShiftChangeEquity => change_equity(schedule, ChangeKind::Shift),
            BuiltinRestriction::BalancedDistribution => balanced_distribution(schedule),
        }
    }
}

/// 按权重方案构建默认注册表 (停用项跳过,未覆写项用默认权重)
pub fn default_registry(profile: &ScoringProfile) -> Result<RestrictionRegistry, ScoringError> {
    let mut registry = RestrictionRegistry::new();
    for restriction in builtin_restrictions() {
        if profile.is_disabled(restriction.name()) {
            continue;
        }
        let weight = profile
            .weight_for(restriction.name())
            .unwrap_or_else(|| restriction.default_weight());
        registry.register(restriction.name(), weight, move |schedule| {
            restriction.evaluate(schedule)
        })?;
    }
    Ok(registry)
}

// ==========================================
// 评估函数
// ==========================================

fn ratio_score(ok: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        ok as f64 / total as f64 * 100.0
    }
}

fn one_assignment_per_day(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let distinct: HashSet<(&str, NaiveDate)> = schedule
        .assignments
        .iter()
        .map(|a| (a.worker_id.as_str(), a.date))
        .collect();
    Ok(ratio_score(distinct.len(), schedule.assignments.len()))
}

fn schedulable_group_only(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let mut ok = 0;
    for a in schedule.assignments {
        if ctx.worker(&a.worker_id)?.member_group == ctx.schedulable_group {
            ok += 1;
        }
    }
    Ok(ratio_score(ok, schedule.assignments.len()))
}

fn no_leave_conflict(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ok = schedule
        .assignments
        .iter()
        .filter(|a| !schedule.context.is_unavailable(&a.worker_id, a.date))
        .count();
    Ok(ratio_score(ok, schedule.assignments.len()))
}

fn required_qualification(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let mut ok = 0;
    for a in schedule.assignments {
        let position = ctx.position(&a.position_code)?;
        if ctx
            .worker(&a.worker_id)?
            .has_qualifications(&position.required_qualifications)
        {
            ok += 1;
        }
    }
    Ok(ratio_score(ok, schedule.assignments.len()))
}

fn annual_hours_cap(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let by_worker = schedule.by_worker();
    let mut ok = 0;
    for (worker_id, assignments) in &by_worker {
        let worker = ctx.worker(worker_id)?;
        let projected = worker.counters.annual_hours()
            + assignments.iter().map(|a| a.duration_hours).sum::<f64>();
        if projected <= worker.effective_hour_cap(ctx.default_annual_cap) {
            ok += 1;
        }
    }
    Ok(ratio_score(ok, by_worker.len()))
}

fn coverage_complete(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let demand = &schedule.context.demand;
    let covered: HashSet<(NaiveDate, &str)> = schedule
        .assignments
        .iter()
        .filter(|a| demand.contains(&(a.date, a.position_code.clone())))
        .map(|a| (a.date, a.position_code.as_str()))
        .collect();
    Ok(ratio_score(covered.len(), demand.len()))
}

/// 分配的岗位线路在人员可上岗线路内
fn line_correct(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let mut ok = 0;
    for a in schedule.assignments {
        if ctx.worker(&a.worker_id)?.serves_line(a.line.as_deref()) {
            ok += 1;
        }
    }
    Ok(ratio_score(ok, schedule.assignments.len()))
}

/// 连续上班天数 (含历史记录)
fn max_consecutive_days(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let limit = ctx.max_consecutive_days as usize;
    let by_worker = schedule.by_worker();
    let mut ok = 0;

    for (worker_id, assignments) in &by_worker {
        let mut dates: BTreeSet<NaiveDate> = assignments.iter().map(|a| a.date).collect();
        if let Some(history) = ctx.history.get(worker_id) {
            dates.extend(history.assignments().iter().map(|r| r.date));
        }
        if longest_run(&dates) <= limit {
            ok += 1;
        }
    }
    Ok(ratio_score(ok, by_worker.len()))
}

fn longest_run(dates: &BTreeSet<NaiveDate>) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        current = match previous {
            Some(p) if p.succ_opt() == Some(date) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }
    longest
}

#[derive(Clone, Copy)]
enum ChangeKind {
    Zone,
    Shift,
}

/// 参与排班组内人员的累计变更次数越均衡越高: 100 / (1 + 标准差)
fn change_equity(schedule: &CandidateSchedule<'_>, kind: ChangeKind) -> Result<f64, RestrictionError> {
    let ctx = schedule.context;
    let by_worker = schedule.by_worker();

    let mut totals = Vec::new();
    for worker in ctx
        .workers
        .values()
        .filter(|w| w.member_group == ctx.schedulable_group)
    {
        let base = match kind {
            ChangeKind::Zone => worker.counters.zone_changes(),
            ChangeKind::Shift => worker.counters.shift_changes(),
        };
        let added = by_worker
            .get(worker.worker_id.as_str())
            .map(|list| {
                list.iter()
                    .filter(|a| match kind {
                        ChangeKind::Zone => a.is_zone_change,
                        ChangeKind::Shift => a.is_shift_change,
                    })
                    .count()
            })
            .unwrap_or(0);
        totals.push(base as f64 + added as f64);
    }

    if totals.is_empty() {
        return Ok(100.0);
    }
    Ok(100.0 / (1.0 + population_stddev(totals.into_iter())))
}

/// 每人分配数量的变异系数越小越高: 100 * (1 - cv)
fn balanced_distribution(schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
    let counts: Vec<f64> = schedule
        .by_worker()
        .values()
        .map(|list| list.len() as f64)
        .collect();
    if counts.is_empty() {
        return Ok(100.0);
    }

    let m = mean(counts.iter().copied());
    let cv = population_stddev(counts.into_iter()) / m;
    Ok((100.0 * (1.0 - cv)).clamp(0.0, 100.0))
}
