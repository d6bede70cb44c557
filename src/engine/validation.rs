// ==========================================
// 学校报名管理系统 - 报名请求校验器
// ==========================================
// 职责: 报名提交的字段格式与数量校验
// 红线: 校验在任何写入之前完成, 每个错误都带字段名
// ==========================================

use crate::domain::enrollment::SubmitRequest;
use crate::domain::student::StudentProfile;
use crate::domain::types::SemesterId;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use chrono::NaiveDate;
use std::collections::HashSet;

const MAX_NAME_CHARS: usize = 50;
const ID_NUMBER_LEN: usize = 18;
const PHONE_LEN: usize = 11;

// ==========================================
// ValidatedRequest - 已校验的请求
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub id_number: String, // 已规范化 (末位 X 大写)
    pub profile: StudentProfile,
    pub course_ids: Vec<String>,
    pub semester: Option<SemesterId>,
    pub study_period_start: Option<NaiveDate>,
    pub study_period_end: Option<NaiveDate>,
    pub remarks: Option<String>,
}

// ==========================================
// RequestValidator - 请求校验器
// ==========================================
pub struct RequestValidator {
    max_courses_per_submission: usize,
}

impl RequestValidator {
    pub fn new(max_courses_per_submission: usize) -> Self {
        Self {
            max_courses_per_submission: max_courses_per_submission.max(1),
        }
    }

    /// 校验报名请求
    ///
    /// # 规则
    /// - name: 非空, 不超过 50 字
    /// - idNumber: 17 位数字 + 数字或 X
    /// - contactPhone / emergencyPhone: 可选, 1 开头的 11 位数字
    /// - selectedCourses: 1..=上限, 不可重复
    /// - semester: 可选, 须为合法学期
    /// - studyPeriodStart <= studyPeriodEnd
    pub fn validate(&self, request: &SubmitRequest) -> EnrollmentResult<ValidatedRequest> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(EnrollmentError::validation("name", "姓名不能为空"));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(EnrollmentError::validation(
                "name",
                format!("姓名不能超过 {} 个字符", MAX_NAME_CHARS),
            ));
        }

        let id_number = normalize_id_number(&request.id_number)?;

        let contact_phone = validate_phone("contactPhone", request.contact_phone.as_deref())?;
        let emergency_phone = validate_phone("emergencyPhone", request.emergency_phone.as_deref())?;

        let course_ids = self.validate_course_ids(&request.selected_courses)?;

        let semester = match request.semester.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(SemesterId::parse(raw).ok_or_else(|| {
                EnrollmentError::validation("semester", format!("学期格式错误: {}", raw))
            })?),
        };

        if let (Some(start), Some(end)) = (request.study_period_start, request.study_period_end) {
            if start > end {
                return Err(EnrollmentError::validation(
                    "studyPeriodStart",
                    "学习开始日期不能晚于结束日期",
                ));
            }
        }

        let mut profile = request.profile();
        profile.contact_phone = contact_phone;
        profile.emergency_phone = emergency_phone;

        Ok(ValidatedRequest {
            id_number,
            profile,
            course_ids,
            semester,
            study_period_start: request.study_period_start,
            study_period_end: request.study_period_end,
            remarks: non_blank(request.remarks.as_deref()),
        })
    }

    fn validate_course_ids(&self, selected: &[String]) -> EnrollmentResult<Vec<String>> {
        let ids: Vec<String> = selected.iter().map(|id| id.trim().to_string()).collect();

        if ids.is_empty() {
            return Err(EnrollmentError::validation("selectedCourses", "请至少选择一门课程"));
        }
        if ids.len() > self.max_courses_per_submission {
            return Err(EnrollmentError::validation(
                "selectedCourses",
                format!("每次最多选择 {} 门课程", self.max_courses_per_submission),
            ));
        }
        if ids.iter().any(|id| id.is_empty()) {
            return Err(EnrollmentError::validation("selectedCourses", "课程ID不能为空"));
        }

        let mut seen = HashSet::new();
        if !ids.iter().all(|id| seen.insert(id.as_str())) {
            return Err(EnrollmentError::validation("selectedCourses", "不能重复选择同一门课程"));
        }

        Ok(ids)
    }
}

/// 身份证号格式校验并规范化
///
/// 只校验格式, 不校验末位校验码
pub fn normalize_id_number(raw: &str) -> EnrollmentResult<String> {
    let id_number = raw.trim().to_uppercase();
    if id_number.is_empty() {
        return Err(EnrollmentError::validation("idNumber", "身份证号不能为空"));
    }

    let chars: Vec<char> = id_number.chars().collect();
    let well_formed = chars.len() == ID_NUMBER_LEN
        && chars[..ID_NUMBER_LEN - 1].iter().all(|c| c.is_ascii_digit())
        && (chars[ID_NUMBER_LEN - 1].is_ascii_digit() || chars[ID_NUMBER_LEN - 1] == 'X');

    if !well_formed {
        return Err(EnrollmentError::validation("idNumber", "身份证号格式错误"));
    }
    Ok(id_number)
}

/// 日志中脱敏显示身份证号
pub fn mask_id_number(id_number: &str) -> String {
    let chars: Vec<char> = id_number.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

fn validate_phone(field: &str, raw: Option<&str>) -> EnrollmentResult<Option<String>> {
    let Some(phone) = non_blank(raw) else {
        return Ok(None);
    };
    let valid = phone.len() == PHONE_LEN
        && phone.starts_with('1')
        && phone.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(EnrollmentError::validation(field, "手机号格式错误"));
    }
    Ok(Some(phone))
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
