// ==========================================
// 学校报名管理系统 - 编号生成器
// ==========================================
// 报名编号: {YYYYMMDD}{seq:3}, 按日期前缀递增
// 学号:     {year:4}{seq:4},   按学年前缀递增 (year 取自目标学期)
// 红线: 唯一性由数据库唯一索引保证, 兜底编号同样经过唯一性检查
// ==========================================

use crate::config::EnrollmentPolicy;
use crate::domain::types::SemesterId;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::repository::error::RepositoryResult;
use crate::repository::{EnrollmentRepository, StudentRepository};
use chrono::NaiveDate;
use rand::Rng;
use rusqlite::Transaction;
use std::time::Duration;

/// 报名编号唯一索引列
pub const ENROLLMENT_CODE_COLUMN: &str = "enrollment.enrollment_code";
/// 学号唯一索引列
pub const STUDENT_CODE_COLUMN: &str = "student.student_code";

// ==========================================
// CodeRetryPolicy - 冲突重试策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRetryPolicy {
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl CodeRetryPolicy {
    pub fn from_policy(policy: &EnrollmentPolicy) -> Self {
        let min = policy.code_retry_backoff_min_ms;
        let max = policy.code_retry_backoff_max_ms.max(min);
        Self {
            max_attempts: policy.code_retry_max_attempts.max(1),
            backoff_min: Duration::from_millis(min),
            backoff_max: Duration::from_millis(max),
        }
    }

    /// 不退避 (测试用)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    /// 随机退避时长, 落在 [backoff_min, backoff_max] 内
    pub fn backoff(&self) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for CodeRetryPolicy {
    fn default() -> Self {
        Self::from_policy(&EnrollmentPolicy::default())
    }
}

// ==========================================
// CodeGenerator - 编号生成器
// ==========================================
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn enrollment_code_prefix(date: NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }

    pub fn format_enrollment_code(date: NaiveDate, seq: u32) -> String {
        format!("{}{:03}", Self::enrollment_code_prefix(date), seq)
    }

    pub fn student_code_prefix(semester: &SemesterId) -> String {
        format!("{:04}", semester.code_year())
    }

    pub fn format_student_code(semester: &SemesterId, seq: u32) -> String {
        format!("{}{:04}", Self::student_code_prefix(semester), seq)
    }

    /// 时间戳兜底学号 (碰撞保证较弱, 仍需通过唯一索引)
    pub fn fallback_student_code(semester: &SemesterId, epoch_millis: i64) -> String {
        format!(
            "{}{:04}",
            Self::student_code_prefix(semester),
            epoch_millis.rem_euclid(10_000)
        )
    }

    /// 下一个报名编号候选
    ///
    /// # 参数
    /// - attempt: 第几次尝试 (0 起), 冲突重试时在最大流水号之后顺延
    pub fn next_enrollment_code(
        tx: &Transaction,
        date: NaiveDate,
        attempt: u32,
    ) -> RepositoryResult<String> {
        let prefix = Self::enrollment_code_prefix(date);
        let max = EnrollmentRepository::max_code_sequence_tx(tx, &prefix)?.unwrap_or(0);
        Ok(Self::format_enrollment_code(date, max + 1 + attempt))
    }

    /// 下一个学号候选
    pub fn next_student_code(
        tx: &Transaction,
        semester: &SemesterId,
        attempt: u32,
    ) -> RepositoryResult<String> {
        let prefix = Self::student_code_prefix(semester);
        let max = StudentRepository::max_code_sequence_tx(tx, &prefix)?.unwrap_or(0);
        Ok(Self::format_student_code(semester, max + 1 + attempt))
    }

    /// 带冲突重试的编号发放
    ///
    /// # 流程
    /// 1. candidate(attempt) 生成候选编号, persist(code) 写入
    /// 2. 写入违反 unique_column 唯一索引 → 随机退避后重试
    /// 3. 重试耗尽 → 若有 fallback 则再尝试一次兜底编号
    /// 4. 仍冲突 → CodeGenerationExhausted
    ///
    /// 其他错误原样返回
    pub fn issue_with_retry<C, P, F>(
        policy: &CodeRetryPolicy,
        kind: &str,
        unique_column: &str,
        mut candidate: C,
        mut persist: P,
        fallback: Option<F>,
    ) -> EnrollmentResult<String>
    where
        C: FnMut(u32) -> RepositoryResult<String>,
        P: FnMut(&str) -> RepositoryResult<()>,
        F: FnOnce() -> String,
    {
        for attempt in 0..policy.max_attempts {
            let code = candidate(attempt)?;
            match persist(&code) {
                Ok(()) => return Ok(code),
                Err(e) if e.is_unique_violation_on(unique_column) => {
                    let wait = policy.backoff();
                    tracing::warn!(
                        kind = %kind,
                        code = %code,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "编号冲突, 退避后重试"
                    );
                    std::thread::sleep(wait);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(fallback) = fallback {
            let code = fallback();
            match persist(&code) {
                Ok(()) => {
                    tracing::warn!(kind = %kind, code = %code, "重试耗尽, 使用时间戳兜底编号");
                    return Ok(code);
                }
                Err(e) if e.is_unique_violation_on(unique_column) => {
                    tracing::warn!(kind = %kind, code = %code, "兜底编号仍冲突");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EnrollmentError::CodeGenerationExhausted {
            kind: kind.to_string(),
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Term;
    use crate::repository::error::RepositoryError;
    use rusqlite::Connection;
    use std::cell::RefCell;

    fn unique_violation(column: &str) -> RepositoryError {
        RepositoryError::UniqueConstraintViolation(format!("UNIQUE constraint failed: {}", column))
    }

    #[test]
    fn test_code_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        assert_eq!(CodeGenerator::format_enrollment_code(date, 7), "20250903007");

        let semester = SemesterId::new(2025, Term::Second);
        assert_eq!(CodeGenerator::format_student_code(&semester, 12), "20250012");
        assert_eq!(
            CodeGenerator::fallback_student_code(&semester, 1_700_000_123_456),
            "20253456"
        );
    }

    #[test]
    fn test_backoff_within_window() {
        let policy = CodeRetryPolicy::default();
        for _ in 0..20 {
            let wait = policy.backoff();
            assert!(wait >= Duration::from_millis(100) && wait <= Duration::from_millis(300));
        }
        assert_eq!(CodeRetryPolicy::immediate(3).backoff(), Duration::ZERO);
    }

    #[test]
    fn test_next_codes_follow_max_sequence() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"INSERT INTO student (id, id_number, student_code, name, enrollment_year,
                   enrollment_semester, created_at, updated_at)
               VALUES ('s1', '110101199001011237', '20250041', '张三', 2025, '2025-2026-1',
                   '2025-09-01 00:00:00', '2025-09-01 00:00:00'),
                      ('s2', '110101199001011245', '20240099', '李四', 2024, '2024-2025-1',
                   '2024-09-01 00:00:00', '2024-09-01 00:00:00');"#,
        )
        .unwrap();

        let tx = conn.transaction().unwrap();
        let semester = SemesterId::new(2025, Term::First);
        assert_eq!(CodeGenerator::next_student_code(&tx, &semester, 0).unwrap(), "20250042");
        assert_eq!(CodeGenerator::next_student_code(&tx, &semester, 2).unwrap(), "20250044");
        assert_eq!(
            CodeGenerator::next_student_code(&tx, &SemesterId::new(2026, Term::First), 0).unwrap(),
            "20260001"
        );

        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(CodeGenerator::next_enrollment_code(&tx, date, 0).unwrap(), "20250901001");
    }

    #[test]
    fn test_retry_until_success() {
        let attempts = RefCell::new(Vec::new());
        let code = CodeGenerator::issue_with_retry(
            &CodeRetryPolicy::immediate(5),
            "学号",
            STUDENT_CODE_COLUMN,
            |attempt| Ok(format!("2025000{}", attempt + 1)),
            |code| {
                attempts.borrow_mut().push(code.to_string());
                if attempts.borrow().len() < 3 {
                    Err(unique_violation(STUDENT_CODE_COLUMN))
                } else {
                    Ok(())
                }
            },
            None::<fn() -> String>,
        )
        .unwrap();

        assert_eq!(code, "20250003");
        assert_eq!(attempts.borrow().len(), 3);
    }

    #[test]
    fn test_fallback_still_checked_for_uniqueness() {
        let result = CodeGenerator::issue_with_retry(
            &CodeRetryPolicy::immediate(2),
            "学号",
            STUDENT_CODE_COLUMN,
            |_| Ok("20250001".to_string()),
            |_| Err(unique_violation(STUDENT_CODE_COLUMN)),
            Some(|| "20259999".to_string()),
        );
        assert!(matches!(
            result,
            Err(EnrollmentError::CodeGenerationExhausted { attempts: 2, .. })
        ));

        let persisted = RefCell::new(Vec::new());
        let code = CodeGenerator::issue_with_retry(
            &CodeRetryPolicy::immediate(2),
            "学号",
            STUDENT_CODE_COLUMN,
            |_| Ok("20250001".to_string()),
            |code| {
                persisted.borrow_mut().push(code.to_string());
                if code == "20259999" {
                    Ok(())
                } else {
                    Err(unique_violation(STUDENT_CODE_COLUMN))
                }
            },
            Some(|| "20259999".to_string()),
        )
        .unwrap();
        assert_eq!(code, "20259999");
        assert_eq!(persisted.borrow().len(), 3);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let calls = RefCell::new(0);
        let result = CodeGenerator::issue_with_retry(
            &CodeRetryPolicy::immediate(5),
            "报名编号",
            ENROLLMENT_CODE_COLUMN,
            |_| Ok("20250901001".to_string()),
            |_| {
                *calls.borrow_mut() += 1;
                Err(unique_violation("student.id_number"))
            },
            None::<fn() -> String>,
        );
        assert!(matches!(
            result,
            Err(EnrollmentError::Repository(RepositoryError::UniqueConstraintViolation(_)))
        ));
        assert_eq!(*calls.borrow(), 1);
    }
}
