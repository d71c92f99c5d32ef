//! Onboarding wizard state machine — tracks which step the user is on and
//! owns the profile being accumulated.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::model::{BirthDate, Gender, Goal, ProfileUpdate, UserProfile, WorkoutFrequency};

/// Earliest accepted birth year.
pub const MIN_BIRTH_YEAR: u16 = 1900;

/// The steps of the onboarding wizard.
///
/// Progresses linearly: Gender → Goal → WorkoutFrequency → BirthDate →
/// BodyMetrics → Generating. Every step but the terminal one can go back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    Gender,
    Goal,
    WorkoutFrequency,
    BirthDate,
    BodyMetrics,
    Generating,
}

impl OnboardingStep {
    /// 1-based step number; `Generating` is 6.
    pub fn number(&self) -> u8 {
        match self {
            Self::Gender => 1,
            Self::Goal => 2,
            Self::WorkoutFrequency => 3,
            Self::BirthDate => 4,
            Self::BodyMetrics => 5,
            Self::Generating => 6,
        }
    }

    /// Whether this step is terminal (generation has started).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Generating)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Gender => Some(Goal),
            Goal => Some(WorkoutFrequency),
            WorkoutFrequency => Some(BirthDate),
            BirthDate => Some(BodyMetrics),
            BodyMetrics => Some(Generating),
            Generating => None,
        }
    }

    /// Get the previous step. `Gender` has none, and `Generating` cannot be
    /// left.
    pub fn previous(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Gender | Generating => None,
            Goal => Some(Gender),
            WorkoutFrequency => Some(Goal),
            BirthDate => Some(WorkoutFrequency),
            BodyMetrics => Some(BirthDate),
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gender => "gender",
            Self::Goal => "goal",
            Self::WorkoutFrequency => "workout_frequency",
            Self::BirthDate => "birth_date",
            Self::BodyMetrics => "body_metrics",
            Self::Generating => "generating",
        };
        write!(f, "{s}")
    }
}

/// Result of asking the wizard to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the given step.
    Advanced(OnboardingStep),
    /// The current step is incomplete (or terminal); nothing changed.
    Blocked,
}

/// One onboarding session: the current step plus the profile it owns.
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    step: OnboardingStep,
    profile: UserProfile,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Whether a step's completion predicate holds for the current profile.
    pub fn is_step_complete(&self, step: OnboardingStep) -> bool {
        let p = &self.profile;
        match step {
            OnboardingStep::Gender => p.gender.is_some(),
            OnboardingStep::Goal => p.goal.is_some(),
            OnboardingStep::WorkoutFrequency => p.workout_frequency.is_some(),
            OnboardingStep::BirthDate => p.birth_date.is_some(),
            OnboardingStep::BodyMetrics => {
                p.height.as_deref().is_some_and(|h| !h.is_empty())
                    && p.weight.as_deref().is_some_and(|w| !w.is_empty())
            }
            OnboardingStep::Generating => false,
        }
    }

    /// Whether `advance` would currently move forward.
    pub fn can_advance(&self) -> bool {
        !self.step.is_terminal() && self.is_step_complete(self.step)
    }

    pub fn select_gender(&mut self, gender: Gender) -> Result<(), ValidationError> {
        self.apply(ProfileUpdate {
            gender: Some(gender),
            ..Default::default()
        })
    }

    pub fn select_goal(&mut self, goal: Goal) -> Result<(), ValidationError> {
        self.apply(ProfileUpdate {
            goal: Some(goal),
            ..Default::default()
        })
    }

    pub fn select_workout_frequency(
        &mut self,
        frequency: WorkoutFrequency,
    ) -> Result<(), ValidationError> {
        self.apply(ProfileUpdate {
            workout_frequency: Some(frequency),
            ..Default::default()
        })
    }

    /// Validate and store the birth date from raw day/month/year input.
    pub fn enter_birth_date(
        &mut self,
        day: &str,
        month: &str,
        year: &str,
    ) -> Result<BirthDate, ValidationError> {
        let date = parse_birth_date(day, month, year, current_year())?;
        self.apply(ProfileUpdate {
            birth_date: Some(date),
            ..Default::default()
        })?;
        Ok(date)
    }

    /// Store height (feet) and weight (kg) as entered.
    pub fn enter_body_metrics(&mut self, height: &str, weight: &str) -> Result<(), ValidationError> {
        let (height, weight) = parse_body_metrics(height, weight)?;
        self.apply(ProfileUpdate {
            height: Some(height),
            weight: Some(weight),
            ..Default::default()
        })
    }

    fn apply(&mut self, update: ProfileUpdate) -> Result<(), ValidationError> {
        if self.step.is_terminal() {
            return Err(ValidationError::WizardClosed);
        }
        self.profile.merge(update);
        Ok(())
    }

    /// Move forward if the current step is complete. A blocked move is a
    /// no-op.
    pub fn advance(&mut self) -> StepOutcome {
        if !self.can_advance() {
            return StepOutcome::Blocked;
        }
        match self.step.next() {
            Some(next) => {
                tracing::debug!(from = %self.step, to = %next, "Onboarding step advanced");
                self.step = next;
                StepOutcome::Advanced(next)
            }
            None => StepOutcome::Blocked,
        }
    }

    /// Move back one step. Never touches the profile. Returns the step the
    /// wizard is on afterwards; refused once generation has started.
    pub fn back(&mut self) -> Result<OnboardingStep, ValidationError> {
        if self.step.is_terminal() {
            return Err(ValidationError::WizardClosed);
        }
        if let Some(prev) = self.step.previous() {
            self.step = prev;
        }
        Ok(self.step)
    }

    /// Hand the profile over for generation. Only succeeds once the wizard
    /// reached `Generating`; otherwise the wizard is returned unchanged.
    pub fn into_profile(self) -> Result<UserProfile, Wizard> {
        if self.step.is_terminal() {
            Ok(self.profile)
        } else {
            Err(self)
        }
    }
}

/// Current calendar year (UTC).
pub fn current_year() -> u16 {
    use chrono::Datelike;
    chrono::Utc::now().year().clamp(0, u16::MAX as i32) as u16
}

/// Parse a birth date from raw day/month/year strings.
///
/// Rejects non-numeric or zero parts, day > 31, month > 12, and years
/// outside `MIN_BIRTH_YEAR..=current_year`. Month length and leap years are
/// not checked.
pub fn parse_birth_date(
    day: &str,
    month: &str,
    year: &str,
    current_year: u16,
) -> Result<BirthDate, ValidationError> {
    let day = parse_part(day, "day")?;
    let month = parse_part(month, "month")?;
    let year = parse_part(year, "year")?;

    if day > 31 {
        return Err(invalid_date(format!("day {day} is greater than 31")));
    }
    if month > 12 {
        return Err(invalid_date(format!("month {month} is greater than 12")));
    }
    if year < u32::from(MIN_BIRTH_YEAR) {
        return Err(invalid_date(format!("year {year} is before {MIN_BIRTH_YEAR}")));
    }
    if year > u32::from(current_year) {
        return Err(invalid_date(format!("year {year} is in the future")));
    }

    Ok(BirthDate {
        year: year as u16,
        month: month as u8,
        day: day as u8,
    })
}

fn parse_part(raw: &str, name: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(0) => Err(invalid_date(format!("{name} must not be zero"))),
        Ok(v) => Ok(v),
        Err(_) => Err(invalid_date(format!("{name} {trimmed:?} is not a number"))),
    }
}

fn invalid_date(reason: String) -> ValidationError {
    ValidationError::InvalidDate { reason }
}

/// Both height and weight are required; their numeric format is not
/// enforced.
pub fn parse_body_metrics(height: &str, weight: &str) -> Result<(String, String), ValidationError> {
    let height = height.trim();
    let weight = weight.trim();
    if height.is_empty() {
        return Err(ValidationError::MissingField { field: "height" });
    }
    if weight.is_empty() {
        return Err(ValidationError::MissingField { field: "weight" });
    }
    Ok((height.to_string(), weight.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: u16 = 2026;

    fn walk_to(step: OnboardingStep) -> Wizard {
        let mut w = Wizard::new();
        while w.step() != step {
            match w.step() {
                OnboardingStep::Gender => w.select_gender(Gender::Male).unwrap(),
                OnboardingStep::Goal => w.select_goal(Goal::Lose).unwrap(),
                OnboardingStep::WorkoutFrequency => {
                    w.select_workout_frequency(WorkoutFrequency::Medium).unwrap()
                }
                OnboardingStep::BirthDate => {
                    w.enter_birth_date("12", "4", "1995").unwrap();
                }
                OnboardingStep::BodyMetrics => w.enter_body_metrics("5.9", "80").unwrap(),
                OnboardingStep::Generating => unreachable!(),
            }
            assert!(matches!(w.advance(), StepOutcome::Advanced(_)));
        }
        w
    }

    #[test]
    fn next_walks_all_steps() {
        use OnboardingStep::*;
        let expected = [Goal, WorkoutFrequency, BirthDate, BodyMetrics, Generating];
        let mut current = Gender;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            assert_eq!(next.number(), current.number() + 1);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn default_step_is_gender() {
        assert_eq!(OnboardingStep::default(), OnboardingStep::Gender);
        assert_eq!(Wizard::new().step(), OnboardingStep::Gender);
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [Gender, Goal, WorkoutFrequency, BirthDate, BodyMetrics, Generating] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "mismatch for {step:?}");
        }
    }

    #[test]
    fn advance_blocked_until_step_complete() {
        let mut w = Wizard::new();
        assert_eq!(w.advance(), StepOutcome::Blocked);
        assert_eq!(w.step(), OnboardingStep::Gender);

        w.select_gender(Gender::Other).unwrap();
        assert_eq!(w.advance(), StepOutcome::Advanced(OnboardingStep::Goal));
        assert_eq!(w.advance(), StepOutcome::Blocked);
        assert_eq!(w.step(), OnboardingStep::Goal);
    }

    #[test]
    fn each_step_blocks_iff_predicate_false() {
        use OnboardingStep::*;
        for step in [Gender, Goal, WorkoutFrequency, BirthDate, BodyMetrics] {
            let mut w = Wizard::new();
            w.step = step;
            assert!(!w.is_step_complete(step));
            assert_eq!(w.advance(), StepOutcome::Blocked, "{step} should block");

            let complete = walk_to(step.next().unwrap());
            let mut w = Wizard {
                step,
                profile: complete.profile().clone(),
            };
            assert!(w.is_step_complete(step));
            assert_eq!(w.advance(), StepOutcome::Advanced(step.next().unwrap()));
        }
    }

    #[test]
    fn back_never_mutates_profile() {
        let mut w = walk_to(OnboardingStep::BodyMetrics);
        let before = w.profile().clone();
        assert_eq!(w.back().unwrap(), OnboardingStep::BirthDate);
        assert_eq!(w.back().unwrap(), OnboardingStep::WorkoutFrequency);
        assert_eq!(w.back().unwrap(), OnboardingStep::Goal);
        assert_eq!(w.back().unwrap(), OnboardingStep::Gender);
        assert_eq!(w.back().unwrap(), OnboardingStep::Gender);
        assert_eq!(w.profile(), &before);

        // Previously entered answers still satisfy the predicates.
        assert_eq!(w.advance(), StepOutcome::Advanced(OnboardingStep::Goal));
    }

    #[test]
    fn generating_is_irreversible() {
        let mut w = walk_to(OnboardingStep::Generating);
        assert_eq!(w.back(), Err(ValidationError::WizardClosed));
        assert_eq!(w.advance(), StepOutcome::Blocked);
        assert_eq!(
            w.select_gender(Gender::Female),
            Err(ValidationError::WizardClosed)
        );
        assert_eq!(w.step(), OnboardingStep::Generating);

        let profile = w.into_profile().unwrap();
        assert_eq!(profile.gender, Some(Gender::Male));
        assert_eq!(profile.weight.as_deref(), Some("80"));
    }

    #[test]
    fn into_profile_refused_before_generating() {
        let w = walk_to(OnboardingStep::BodyMetrics);
        let w = w.into_profile().unwrap_err();
        assert_eq!(w.step(), OnboardingStep::BodyMetrics);
    }

    #[test]
    fn birth_date_boundaries() {
        let d = parse_birth_date("31", "12", "1900", YEAR).unwrap();
        assert_eq!(d.to_string(), "1900-12-31");

        assert!(parse_birth_date("32", "12", "1990", YEAR).is_err());
        assert!(parse_birth_date("1", "13", "1990", YEAR).is_err());
        assert!(parse_birth_date("1", "1", "1899", YEAR).is_err());
        assert!(parse_birth_date("1", "1", "2027", YEAR).is_err());
        assert!(parse_birth_date("1", "1", "2026", YEAR).is_ok());
    }

    #[test]
    fn birth_date_rejects_non_numeric_and_zero() {
        assert!(matches!(
            parse_birth_date("ab", "1", "1990", YEAR),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(parse_birth_date("1", "x", "1990", YEAR).is_err());
        assert!(parse_birth_date("1", "1", "", YEAR).is_err());
        assert!(parse_birth_date("0", "1", "1990", YEAR).is_err());
        assert!(parse_birth_date("-1", "1", "1990", YEAR).is_err());
    }

    #[test]
    fn birth_date_does_not_check_month_length() {
        let d = parse_birth_date("31", "2", "2001", YEAR).unwrap();
        assert_eq!(d.to_string(), "2001-02-31");
    }

    #[test]
    fn invalid_birth_date_leaves_step_incomplete() {
        let mut w = walk_to(OnboardingStep::BirthDate);
        assert!(w.enter_birth_date("32", "1", "1990").is_err());
        assert!(!w.is_step_complete(OnboardingStep::BirthDate));
        assert_eq!(w.advance(), StepOutcome::Blocked);
    }

    #[test]
    fn next_year_is_rejected_by_wizard() {
        let mut w = walk_to(OnboardingStep::BirthDate);
        let next_year = (current_year() + 1).to_string();
        assert!(w.enter_birth_date("1", "1", &next_year).is_err());
    }

    #[test]
    fn body_metrics_require_both_values() {
        assert_eq!(
            parse_body_metrics("", "80"),
            Err(ValidationError::MissingField { field: "height" })
        );
        assert_eq!(
            parse_body_metrics("5.9", "  "),
            Err(ValidationError::MissingField { field: "weight" })
        );
        assert_eq!(
            parse_body_metrics(" 5.9 ", "80").unwrap(),
            ("5.9".to_string(), "80".to_string())
        );
    }
}
