use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use super::super::domain::{Category, EducationLevel, Scholarship, StudentProfile};
use super::{CheckOutcome, Criterion, EligibilityCheck};

const UNRESTRICTED_WORDS: [&str; 4] = ["all", "any", "everyone", "anyone"];
/// Words that may surround an unrestricted marker, as in "open to all categories".
const FILLER_WORDS: [&str; 16] = [
    "open", "to", "for", "of", "category", "categories", "year", "years", "study", "course",
    "courses", "stream", "streams", "level", "levels", "students",
];

pub(crate) fn run_checks(
    profile: &StudentProfile,
    scholarship: &Scholarship,
    today: NaiveDate,
) -> Vec<EligibilityCheck> {
    vec![
        check_cgpa(profile, scholarship),
        check_income(profile, scholarship),
        check_category(profile, scholarship),
        check_course(profile, scholarship),
        check_year(profile, scholarship, today),
        check_education_level(profile, scholarship),
        check_deadline(scholarship, today),
    ]
}

fn check(criterion: Criterion, outcome: CheckOutcome, note: impl Into<String>) -> EligibilityCheck {
    EligibilityCheck {
        criterion,
        outcome,
        note: note.into(),
    }
}

fn check_cgpa(profile: &StudentProfile, scholarship: &Scholarship) -> EligibilityCheck {
    let Some(min_cgpa) = scholarship.min_cgpa else {
        return check(Criterion::Cgpa, CheckOutcome::Unrestricted, "no minimum CGPA");
    };
    match profile.cgpa {
        None => check(
            Criterion::Cgpa,
            CheckOutcome::Unknown,
            format!("requires CGPA {min_cgpa:.2}; profile has no CGPA"),
        ),
        Some(cgpa) if cgpa >= min_cgpa => check(
            Criterion::Cgpa,
            CheckOutcome::Satisfied,
            format!("CGPA {cgpa:.2} meets minimum {min_cgpa:.2}"),
        ),
        Some(cgpa) => check(
            Criterion::Cgpa,
            CheckOutcome::Unsatisfied,
            format!("CGPA {cgpa:.2} below minimum {min_cgpa:.2}"),
        ),
    }
}

fn check_income(profile: &StudentProfile, scholarship: &Scholarship) -> EligibilityCheck {
    let Some(max_income) = scholarship.max_income else {
        return check(Criterion::Income, CheckOutcome::Unrestricted, "no income ceiling");
    };
    match profile.income {
        None => check(
            Criterion::Income,
            CheckOutcome::Unknown,
            format!("family income must not exceed {max_income:.0}; profile has no income"),
        ),
        Some(income) if income <= max_income => check(
            Criterion::Income,
            CheckOutcome::Satisfied,
            format!("family income {income:.0} within ceiling {max_income:.0}"),
        ),
        Some(income) => check(
            Criterion::Income,
            CheckOutcome::Unsatisfied,
            format!("family income {income:.0} exceeds ceiling {max_income:.0}"),
        ),
    }
}

fn words(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// `None` for a blank restriction or one that only says "any"/"all" in some phrasing.
fn blank_or_open(restriction: Option<&String>) -> Option<&str> {
    let text = restriction.map(|value| value.trim()).unwrap_or_default();
    if text.is_empty() {
        return None;
    }
    let restriction_words = words(text);
    let marked = restriction_words
        .iter()
        .any(|word| UNRESTRICTED_WORDS.contains(&word.as_str()));
    let only_markers = restriction_words.iter().all(|word| {
        UNRESTRICTED_WORDS.contains(&word.as_str()) || FILLER_WORDS.contains(&word.as_str())
    });
    if marked && only_markers {
        return None;
    }
    Some(text)
}

fn check_category(profile: &StudentProfile, scholarship: &Scholarship) -> EligibilityCheck {
    let Some(restriction) = blank_or_open(scholarship.category_restriction.as_ref())
        .filter(|restriction| !restriction.eq_ignore_ascii_case("open"))
    else {
        return check(Criterion::Category, CheckOutcome::Unrestricted, "open to all categories");
    };
    let Some(category) = profile.category else {
        return check(
            Criterion::Category,
            CheckOutcome::Unknown,
            format!("restricted to {restriction}; profile has no category"),
        );
    };
    let allowed: BTreeSet<&'static str> = words(restriction)
        .iter()
        .filter_map(|word| Category::parse(word))
        .map(Category::label)
        .collect();
    if allowed.contains(category.label()) {
        check(
            Criterion::Category,
            CheckOutcome::Satisfied,
            format!("category {} accepted ({restriction})", category.label()),
        )
    } else {
        check(
            Criterion::Category,
            CheckOutcome::Unsatisfied,
            format!("restricted to {restriction}, profile category {}", category.label()),
        )
    }
}

/// Lowercase alphanumerics only: "B.Tech" -> "btech".
fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn course_alternatives(restriction: &str) -> Vec<String> {
    restriction
        .to_lowercase()
        .replace(" or ", "/")
        .split(['/', ',', ';', '|', '&'])
        .map(compact)
        .filter(|alternative| !alternative.is_empty())
        .collect()
}

fn course_matches(course: &str, alternative: &str) -> bool {
    let course_words: Vec<String> = course
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '(' || ch == ')')
        .map(compact)
        .filter(|word| !word.is_empty())
        .collect();
    let course_compact = compact(course);
    course_words.iter().any(|word| word == alternative)
        || course_compact == alternative
        || (alternative.len() >= 5 && course_compact.contains(alternative))
}

fn check_course(profile: &StudentProfile, scholarship: &Scholarship) -> EligibilityCheck {
    let Some(restriction) = blank_or_open(scholarship.course_restriction.as_ref()) else {
        return check(Criterion::Course, CheckOutcome::Unrestricted, "open to all courses");
    };
    let Some(course) = profile
        .course
        .as_deref()
        .map(str::trim)
        .filter(|course| !course.is_empty())
    else {
        return check(
            Criterion::Course,
            CheckOutcome::Unknown,
            format!("restricted to {restriction}; profile has no course"),
        );
    };
    if course_alternatives(restriction)
        .iter()
        .any(|alternative| course_matches(course, alternative))
    {
        check(
            Criterion::Course,
            CheckOutcome::Satisfied,
            format!("course {course} accepted ({restriction})"),
        )
    } else {
        check(
            Criterion::Course,
            CheckOutcome::Unsatisfied,
            format!("restricted to {restriction}, profile course {course}"),
        )
    }
}

/// Years of study named by a restriction such as "1st & 2nd year" or "final year".
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct YearRequirement {
    pub years: BTreeSet<u8>,
    pub final_year: bool,
}

pub(crate) fn parse_year_requirement(restriction: &str) -> YearRequirement {
    let mut requirement = YearRequirement::default();
    for word in words(restriction) {
        let year = match word.as_str() {
            "first" | "i" => Some(1),
            "second" | "ii" => Some(2),
            "third" | "iii" => Some(3),
            "fourth" | "iv" => Some(4),
            "fifth" | "v" => Some(5),
            "final" | "last" => {
                requirement.final_year = true;
                None
            }
            other => {
                let digits = other
                    .strip_suffix("st")
                    .or_else(|| other.strip_suffix("nd"))
                    .or_else(|| other.strip_suffix("rd"))
                    .or_else(|| other.strip_suffix("th"))
                    .unwrap_or(other);
                digits.parse::<u8>().ok().filter(|year| (1..=6).contains(year))
            }
        };
        if let Some(year) = year {
            requirement.years.insert(year);
        }
    }
    requirement
}

/// The calendar year in which the academic year containing `today` ends (June rollover).
fn academic_year_end(today: NaiveDate) -> i32 {
    if today.month() <= 6 {
        today.year()
    } else {
        today.year() + 1
    }
}

fn check_year(profile: &StudentProfile, scholarship: &Scholarship, today: NaiveDate) -> EligibilityCheck {
    let Some(restriction) = blank_or_open(scholarship.year_restriction.as_ref()) else {
        return check(Criterion::Year, CheckOutcome::Unrestricted, "open to every year of study");
    };
    let requirement = parse_year_requirement(restriction);
    if requirement.years.is_empty() && !requirement.final_year {
        return check(
            Criterion::Year,
            CheckOutcome::Unknown,
            format!("could not interpret year restriction '{restriction}'"),
        );
    }

    let year_match = profile
        .year_of_study
        .map(|year| requirement.years.contains(&year));
    let final_match = if requirement.final_year {
        profile
            .graduation_year
            .map(|graduation| graduation == academic_year_end(today))
    } else {
        None
    };

    match (year_match, final_match) {
        (Some(true), _) | (_, Some(true)) => check(
            Criterion::Year,
            CheckOutcome::Satisfied,
            format!("year of study accepted ({restriction})"),
        ),
        (None, _) if !requirement.years.is_empty() => check(
            Criterion::Year,
            CheckOutcome::Unknown,
            format!("restricted to {restriction}; profile has no year of study"),
        ),
        (_, None) if requirement.final_year => check(
            Criterion::Year,
            CheckOutcome::Unknown,
            format!("restricted to {restriction}; profile has no graduation year"),
        ),
        _ => check(
            Criterion::Year,
            CheckOutcome::Unsatisfied,
            format!("restricted to {restriction}"),
        ),
    }
}

fn level_words(level: EducationLevel) -> &'static [&'static str] {
    match level {
        EducationLevel::HighSchool => &[
            "school", "highschool", "hs", "10th", "11th", "12th", "intermediate",
        ],
        EducationLevel::Undergraduate => &[
            "ug", "undergraduate", "undergrad", "bachelor", "bachelors", "diploma",
        ],
        EducationLevel::Postgraduate => &["pg", "postgraduate", "master", "masters"],
        EducationLevel::Phd => &["phd", "doctoral", "doctorate"],
    }
}

fn mentioned_levels(restriction: &str) -> Vec<EducationLevel> {
    let restriction_words = words(restriction);
    let joined = compact(restriction);
    [
        EducationLevel::HighSchool,
        EducationLevel::Undergraduate,
        EducationLevel::Postgraduate,
        EducationLevel::Phd,
    ]
    .into_iter()
    .filter(|level| {
        let synonyms = level_words(*level);
        restriction_words
            .iter()
            .any(|word| synonyms.contains(&word.as_str()))
            || joined.contains(&compact(level.label()))
    })
    .collect()
}

fn check_education_level(profile: &StudentProfile, scholarship: &Scholarship) -> EligibilityCheck {
    let Some(restriction) = blank_or_open(Some(&scholarship.education_level)) else {
        return check(
            Criterion::EducationLevel,
            CheckOutcome::Unrestricted,
            "open to every education level",
        );
    };
    let mentioned = mentioned_levels(restriction);
    let level = profile.education_level;
    if mentioned.is_empty() {
        check(
            Criterion::EducationLevel,
            CheckOutcome::Unknown,
            format!("could not interpret education level '{restriction}'"),
        )
    } else if mentioned.contains(&level) {
        check(
            Criterion::EducationLevel,
            CheckOutcome::Satisfied,
            format!("{} accepted ({restriction})", level.label()),
        )
    } else {
        check(
            Criterion::EducationLevel,
            CheckOutcome::Unsatisfied,
            format!("restricted to {restriction}, profile level {}", level.label()),
        )
    }
}

fn check_deadline(scholarship: &Scholarship, today: NaiveDate) -> EligibilityCheck {
    match scholarship.days_until_deadline(today) {
        None => check(Criterion::Deadline, CheckOutcome::Unrestricted, "no published deadline"),
        Some(days) if days >= 0 => check(
            Criterion::Deadline,
            CheckOutcome::Satisfied,
            format!("open, {days} day(s) left"),
        ),
        Some(days) => check(
            Criterion::Deadline,
            CheckOutcome::Unsatisfied,
            format!("closed {} day(s) ago", -days),
        ),
    }
}
