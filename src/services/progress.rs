//! 学习进度计算
//!
//! 进度百分比只在这里计算，选课、课时变更、进度校正都走同一个函数。

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::storage::{Enrollment, EnrollmentStatus, ProgressUpdate};

/// `completed * 100 / total` 向下取整；total 为 0 时为 0。
/// 只有全部完成才会得到 100。
pub fn completion_percentage(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    (completed * 100 / total) as i32
}

/// 根据当前课时和已完成课时计算选课记录应有的进度状态
///
/// 已发证书的选课记录始终保持 completed。
pub fn evaluate(
    enrollment: &Enrollment,
    lesson_ids: &[String],
    completed_ids: &[String],
    now: DateTime<Utc>,
) -> ProgressUpdate {
    let current: HashSet<&str> = lesson_ids.iter().map(String::as_str).collect();
    let completed = completed_ids
        .iter()
        .map(String::as_str)
        .filter(|id| current.contains(id))
        .collect::<HashSet<_>>()
        .len();
    let total = current.len();
    let percentage = completion_percentage(completed, total);

    let finished = percentage == 100 || enrollment.certificate_id.is_some();
    let (status, completed_at) = if finished {
        (
            EnrollmentStatus::Completed,
            Some(enrollment.completed_at.unwrap_or(now)),
        )
    } else {
        (EnrollmentStatus::Active, None)
    };

    ProgressUpdate {
        completed_lessons: completed as i32,
        total_lessons: total as i32,
        completion_percentage: percentage,
        status,
        completed_at,
    }
}

/// 存储中的值是否与计算结果不一致
pub fn is_stale(enrollment: &Enrollment, update: &ProgressUpdate) -> bool {
    enrollment.completed_lessons != update.completed_lessons
        || enrollment.total_lessons != update.total_lessons
        || enrollment.completion_percentage != update.completion_percentage
        || enrollment.status != update.status
        || enrollment.completed_at.is_some() != update.completed_at.is_some()
}
