//! # 수업 일정 계산 서비스
//!
//! 그룹의 주간 반복 규칙(요일, 시작 시각, 수업 길이)과 유효 기간(start_date ~ end_date)으로부터
//! **앞으로 N주 동안의 구체적인 수업 날짜/시각**을 계산합니다.
//!
//! 이 모듈은 DB를 전혀 건드리지 않는 순수 계산만 담당합니다.
//! "오늘" 날짜도 인자로 받으므로 테스트에서 결과가 항상 같습니다.
//! 실제 저장(이미 있는 날짜는 건너뛰기)은 `db::lessons::generate_lessons_for_group`이 합니다.
//!
//! ## 계산 방법
//! ```text
//! anchor = max(오늘, start_date)
//! first  = anchor 이후(당일 포함) 첫 번째 weekly_day 요일
//! 후보   = first, first+7일, first+14일, ... (weeks_ahead개)
//! end_date가 있으면 그 이후 후보는 버림
//! ```

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::error::AppError;
use crate::models::Group;

/// DB에 저장하는 날짜 형식
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// DB에 저장하는 수업 시작/종료 시각 형식 (현지 시각, 시간대 없음)
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// 한 번에 생성할 수 있는 최대 주 수
pub const MAX_WEEKS_AHEAD: u32 = 52;
/// 수업 길이 상한 (분)
const MAX_DURATION_MINUTES: i64 = 12 * 60;

/// 반복 규칙/날짜 검증 에러
///
/// 모두 사용자의 입력 문제이므로 HTTP 400(BadRequest)으로 변환됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Некоректний день тижня: {0} (очікується число від 1 до 7)")]
    InvalidWeekday(i64),

    #[error("Некоректний час початку «{0}» (очікується ГГ:ХХ)")]
    InvalidStartTime(String),

    #[error("Некоректна тривалість заняття: {0} хв")]
    InvalidDuration(i64),

    #[error("Некоректна дата «{0}» (очікується РРРР-ММ-ДД)")]
    InvalidDate(String),

    #[error("Дата завершення не може бути раніше дати початку")]
    InvertedWindow,

    #[error("Кількість тижнів має бути від 1 до 52, отримано {0}")]
    InvalidWeeksAhead(u32),

    #[error("Дата {0} поза періодом навчання групи")]
    OutsideWindow(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// "YYYY-MM-DD" 문자열을 날짜로 파싱합니다. 연도는 네 자리(1 ~ 9999)만 허용합니다.
pub fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .filter(|date| (1..=9999).contains(&date.year()))
        .ok_or_else(|| ScheduleError::InvalidDate(value.to_string()))
}

/// 날짜를 DB 저장 형식("YYYY-MM-DD")으로 변환합니다.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 선택적인 날짜 문자열을 검증합니다. None이나 빈 문자열은 None으로 취급합니다.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, ScheduleError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(v).map(Some),
    }
}

/// 그룹의 주간 반복 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// ISO 요일 번호: 1 = 월요일 … 7 = 일요일
    pub weekly_day: u32,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
}

impl RecurrenceRule {
    /// 원시 필드 값에서 반복 규칙을 만들고 검증합니다.
    pub fn new(
        weekly_day: i64,
        start_time: &str,
        duration_minutes: i64,
    ) -> Result<Self, ScheduleError> {
        if !(1..=7).contains(&weekly_day) {
            return Err(ScheduleError::InvalidWeekday(weekly_day));
        }

        // "16:00"과 "16:00:00" 둘 다 허용
        let trimmed = start_time.trim();
        let start_time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| ScheduleError::InvalidStartTime(start_time.to_string()))?;

        if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(ScheduleError::InvalidDuration(duration_minutes));
        }

        Ok(Self {
            weekly_day: weekly_day as u32,
            start_time,
            duration_minutes,
        })
    }

    /// DB에서 읽은 그룹의 규칙을 검증합니다.
    pub fn from_group(group: &Group) -> Result<Self, ScheduleError> {
        Self::new(group.weekly_day, &group.start_time, group.duration_minutes)
    }

    /// 특정 날짜에 이 규칙을 적용한 수업 시각을 계산합니다.
    ///
    /// 종료 시각이 chrono가 표현할 수 있는 범위를 넘으면 `InvalidDate`.
    pub fn slot(&self, date: NaiveDate) -> Result<PlannedLesson, ScheduleError> {
        let start = date.and_time(self.start_time);
        let end = start
            .checked_add_signed(Duration::minutes(self.duration_minutes))
            .ok_or_else(|| ScheduleError::InvalidDate(format_date(date)))?;
        Ok(PlannedLesson { date, start, end })
    }

    /// `from` 당일 또는 그 이후의 첫 번째 수업 요일
    fn first_on_or_after(&self, from: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        let current = from.weekday().number_from_monday();
        let offset = (self.weekly_day + 7 - current) % 7;
        from.checked_add_days(Days::new(offset as u64))
            .ok_or_else(|| ScheduleError::InvalidDate(format_date(from)))
    }
}

/// 그룹의 수업 유효 기간. 양 끝 모두 선택 사항이며 경계일을 포함합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ValidityWindow {
    pub fn new(
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        let start_date = parse_optional_date(start_date)?;
        let end_date = parse_optional_date(end_date)?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(ScheduleError::InvertedWindow);
            }
        }
        Ok(Self { start_date, end_date })
    }

    pub fn from_group(group: &Group) -> Result<Self, ScheduleError> {
        Self::new(group.start_date.as_deref(), group.end_date.as_deref())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// 계산된 수업 한 회차
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLesson {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PlannedLesson {
    pub fn date_string(&self) -> String {
        format_date(self.date)
    }

    pub fn start_string(&self) -> String {
        self.start.format(DATETIME_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(DATETIME_FORMAT).to_string()
    }
}

/// 앞으로 `weeks_ahead`주 동안의 수업 후보를 계산합니다.
///
/// # 매개변수
/// - `today`: 기준일. 그룹의 start_date가 더 미래라면 start_date부터 시작합니다.
/// - `weeks_ahead`: 1 ~ 52
///
/// # 반환값
/// 날짜 오름차순의 수업 목록. end_date 이후의 후보는 포함되지 않으므로
/// 결과가 `weeks_ahead`개보다 적을 수 있습니다.
pub fn plan_lessons(
    rule: &RecurrenceRule,
    window: &ValidityWindow,
    today: NaiveDate,
    weeks_ahead: u32,
) -> Result<Vec<PlannedLesson>, ScheduleError> {
    if !(1..=MAX_WEEKS_AHEAD).contains(&weeks_ahead) {
        return Err(ScheduleError::InvalidWeeksAhead(weeks_ahead));
    }

    let anchor = match window.start_date {
        Some(start) if start > today => start,
        _ => today,
    };
    let first = rule.first_on_or_after(anchor)?;

    let mut planned = Vec::with_capacity(weeks_ahead as usize);
    for week in 0..weeks_ahead as u64 {
        let date = first
            .checked_add_days(Days::new(week * 7))
            .ok_or_else(|| ScheduleError::InvalidDate(format_date(first)))?;
        if window.end_date.is_some_and(|end| date > end) {
            break;
        }
        planned.push(rule.slot(date)?);
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn tuesday_rule() -> RecurrenceRule {
        RecurrenceRule::new(2, "16:00", 90).unwrap()
    }

    #[test]
    fn three_tuesdays_from_a_monday() {
        // 2026-10-19 is a Monday
        let planned = plan_lessons(
            &tuesday_rule(),
            &ValidityWindow::default(),
            date("2026-10-19"),
            3,
        )
        .unwrap();

        let dates: Vec<String> = planned.iter().map(|p| p.date_string()).collect();
        assert_eq!(dates, vec!["2026-10-20", "2026-10-27", "2026-11-03"]);
        for lesson in &planned {
            assert_eq!(lesson.end - lesson.start, Duration::minutes(90));
            assert_eq!(lesson.start.time(), NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        }
        assert_eq!(planned[0].start_string(), "2026-10-20T16:00:00");
        assert_eq!(planned[0].end_string(), "2026-10-20T17:30:00");
    }

    #[test]
    fn today_counts_when_it_is_the_lesson_day() {
        let planned = plan_lessons(
            &tuesday_rule(),
            &ValidityWindow::default(),
            date("2026-10-20"),
            2,
        )
        .unwrap();
        assert_eq!(planned[0].date, date("2026-10-20"));
        assert_eq!(planned[1].date, date("2026-10-27"));
    }

    #[test]
    fn future_start_date_is_the_anchor() {
        let window = ValidityWindow::new(Some("2026-11-01"), None).unwrap();
        let planned = plan_lessons(&tuesday_rule(), &window, date("2026-10-19"), 2).unwrap();
        assert_eq!(planned[0].date, date("2026-11-03"));
        assert_eq!(planned[1].date, date("2026-11-10"));
    }

    #[test]
    fn end_date_truncates_the_window() {
        let window = ValidityWindow::new(None, Some("2026-10-27")).unwrap();
        let planned = plan_lessons(&tuesday_rule(), &window, date("2026-10-19"), 8).unwrap();
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|p| window.contains(p.date)));
    }

    #[test]
    fn finished_group_plans_nothing() {
        let window = ValidityWindow::new(Some("2026-01-01"), Some("2026-06-30")).unwrap();
        let planned = plan_lessons(&tuesday_rule(), &window, date("2026-10-19"), 8).unwrap();
        assert!(planned.is_empty());
    }

    #[test]
    fn lesson_may_run_past_midnight() {
        let rule = RecurrenceRule::new(7, "23:30", 60).unwrap();
        let lesson = rule.slot(date("2026-10-25")).unwrap();
        assert_eq!(lesson.end_string(), "2026-10-26T00:30:00");
    }

    #[test]
    fn rejects_malformed_rules() {
        assert_eq!(
            RecurrenceRule::new(0, "16:00", 90),
            Err(ScheduleError::InvalidWeekday(0))
        );
        assert_eq!(
            RecurrenceRule::new(8, "16:00", 90),
            Err(ScheduleError::InvalidWeekday(8))
        );
        assert!(matches!(
            RecurrenceRule::new(2, "4pm", 90),
            Err(ScheduleError::InvalidStartTime(_))
        ));
        assert_eq!(
            RecurrenceRule::new(2, "16:00", 0),
            Err(ScheduleError::InvalidDuration(0))
        );
        assert!(RecurrenceRule::new(2, "16:00:00", 45).is_ok());
    }

    #[test]
    fn rejects_bad_windows_and_week_counts() {
        assert_eq!(
            ValidityWindow::new(Some("2026-12-01"), Some("2026-09-01")),
            Err(ScheduleError::InvertedWindow)
        );
        assert!(matches!(
            ValidityWindow::new(Some("01.09.2026"), None),
            Err(ScheduleError::InvalidDate(_))
        ));
        assert_eq!(
            plan_lessons(&tuesday_rule(), &ValidityWindow::default(), date("2026-10-19"), 0),
            Err(ScheduleError::InvalidWeeksAhead(0))
        );
        assert_eq!(
            plan_lessons(&tuesday_rule(), &ValidityWindow::default(), date("2026-10-19"), 53),
            Err(ScheduleError::InvalidWeeksAhead(53))
        );
    }

    #[test]
    fn dates_beyond_four_digit_years_are_rejected() {
        assert!(matches!(
            parse_date("+262142-12-28"),
            Err(ScheduleError::InvalidDate(_))
        ));
        assert!(parse_date("9999-12-31").is_ok());
    }

    #[test]
    fn planning_near_the_calendar_limit_fails_instead_of_overflowing() {
        // 이미 DB에 저장된 극단적인 날짜는 parse_date를 거치지 않을 수 있습니다.
        let window = ValidityWindow {
            start_date: NaiveDate::from_ymd_opt(262142, 12, 28),
            end_date: None,
        };
        let result = plan_lessons(&tuesday_rule(), &window, date("2026-10-19"), 3);
        assert!(matches!(result, Err(ScheduleError::InvalidDate(_))));

        let late = RecurrenceRule::new(5, "23:00", 120).unwrap();
        assert!(matches!(
            late.slot(NaiveDate::MAX),
            Err(ScheduleError::InvalidDate(_))
        ));
    }

    #[test]
    fn blank_dates_are_treated_as_unset() {
        let window = ValidityWindow::new(Some(""), Some("  ")).unwrap();
        assert_eq!(window, ValidityWindow::default());
    }
}
