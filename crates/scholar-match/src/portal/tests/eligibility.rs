use chrono::{Duration, NaiveDate};

use super::common::*;
use crate::portal::domain::{Category, NewScholarship, StudentProfile, UserId};
use crate::portal::eligibility::{CheckOutcome, Criterion, EligibilityEngine, MatchPolicy};

fn restricted_listing() -> NewScholarship {
    NewScholarship {
        amount: Some(50_000.0),
        deadline: Some(date(2025, 9, 30)),
        education_level: Some("UG".to_string()),
        min_cgpa: Some(7.5),
        max_income: Some(300_000.0),
        course_restriction: Some("B.Tech/BE".to_string()),
        category_restriction: Some("OBC/SC/ST".to_string()),
        year_restriction: Some("1st & 2nd year".to_string()),
        ..listing("Tech Merit Award", "Karnataka Board")
    }
}

fn outcome(
    engine: &EligibilityEngine,
    profile: &StudentProfile,
    listing: NewScholarship,
    criterion: Criterion,
) -> CheckOutcome {
    let report = engine.assess(profile, &stored("sch-1", listing), today());
    report
        .checks
        .iter()
        .find(|check| check.criterion == criterion)
        .map(|check| check.outcome)
        .expect("criterion checked")
}

#[test]
fn matching_student_satisfies_every_restriction() {
    let engine = EligibilityEngine::default();
    let report = engine.assess(&student(), &stored("sch-1", restricted_listing()), today());

    assert!(report.eligible);
    assert_eq!(report.checks.len(), 7);
    assert!(report
        .checks
        .iter()
        .all(|check| check.outcome == CheckOutcome::Satisfied));
}

#[test]
fn each_failed_restriction_is_reported() {
    let engine = EligibilityEngine::default();
    let mut profile = student();
    profile.cgpa = Some(6.9);
    profile.income = Some(450_000.0);

    let report = engine.assess(&profile, &stored("sch-1", restricted_listing()), today());
    let failing: Vec<Criterion> = report.failing().map(|check| check.criterion).collect();

    assert!(!report.eligible);
    assert_eq!(failing, vec![Criterion::Cgpa, Criterion::Income]);
}

#[test]
fn unknown_profile_fields_block_a_match_unless_policy_allows() {
    let profile = StudentProfile::empty(UserId("student-2".to_string()), now());
    let listing = NewScholarship {
        min_cgpa: Some(7.0),
        ..listing("Merit Award", "Ministry")
    };
    let scholarship = stored("sch-1", listing);

    let strict = EligibilityEngine::default().assess(&profile, &scholarship, today());
    assert!(!strict.eligible);
    assert_eq!(
        strict.unknown().map(|check| check.criterion).collect::<Vec<_>>(),
        vec![Criterion::Cgpa]
    );

    let lenient = EligibilityEngine::new(MatchPolicy {
        unknown_is_eligible: true,
        ..MatchPolicy::default()
    })
    .assess(&profile, &scholarship, today());
    assert!(lenient.eligible);
}

#[test]
fn closed_listings_only_match_when_policy_includes_them() {
    let listing = NewScholarship {
        deadline: Some(today() - Duration::days(1)),
        ..listing("Last Year Award", "Trust")
    };
    let scholarship = stored("sch-1", listing);

    assert!(!EligibilityEngine::default()
        .assess(&student(), &scholarship, today())
        .eligible);
    assert!(EligibilityEngine::new(MatchPolicy {
        include_closed: true,
        ..MatchPolicy::default()
    })
    .assess(&student(), &scholarship, today())
    .eligible);
}

#[test]
fn deadline_today_is_still_open() {
    let listing = NewScholarship {
        deadline: Some(today()),
        ..listing("Closing Award", "Trust")
    };
    let engine = EligibilityEngine::default();
    assert_eq!(
        outcome(&engine, &student(), listing, Criterion::Deadline),
        CheckOutcome::Satisfied
    );
}

#[test]
fn category_restrictions_are_tokenized() {
    let engine = EligibilityEngine::default();
    let mut sc_student = student();
    sc_student.category = Some(Category::Sc);

    let open = NewScholarship {
        category_restriction: Some("Open".to_string()),
        ..listing("Open Award", "Trust")
    };
    assert_eq!(
        outcome(&engine, &sc_student, open, Criterion::Category),
        CheckOutcome::Unrestricted
    );

    let general_obc = NewScholarship {
        category_restriction: Some("General, OBC".to_string()),
        ..listing("General Award", "Trust")
    };
    assert_eq!(
        outcome(&engine, &sc_student, general_obc, Criterion::Category),
        CheckOutcome::Unsatisfied
    );

    let all = NewScholarship {
        category_restriction: Some("All categories".to_string()),
        ..listing("Universal Award", "Trust")
    };
    assert_eq!(
        outcome(&engine, &sc_student, all, Criterion::Category),
        CheckOutcome::Unrestricted
    );
}

#[test]
fn final_year_restriction_uses_graduation_year() {
    let engine = EligibilityEngine::default();
    let final_year = || NewScholarship {
        year_restriction: Some("Final year".to_string()),
        ..listing("Final Year Award", "Trust")
    };

    let mut graduating = student();
    graduating.year_of_study = Some(4);
    graduating.graduation_year = Some(2026);
    assert_eq!(
        outcome(&engine, &graduating, final_year(), Criterion::Year),
        CheckOutcome::Satisfied
    );

    assert_eq!(
        outcome(&engine, &student(), final_year(), Criterion::Year),
        CheckOutcome::Unsatisfied
    );
}

#[test]
fn missing_year_of_study_is_unknown_even_with_a_final_year_clause() {
    let engine = EligibilityEngine::default();
    let second_or_final = || NewScholarship {
        year_restriction: Some("2nd or final year".to_string()),
        ..listing("Progression Award", "Trust")
    };

    let mut undeclared = student();
    undeclared.year_of_study = None;
    assert_eq!(
        outcome(&engine, &undeclared, second_or_final(), Criterion::Year),
        CheckOutcome::Unknown
    );

    let mut third_year = student();
    third_year.year_of_study = Some(3);
    assert_eq!(
        outcome(&engine, &third_year, second_or_final(), Criterion::Year),
        CheckOutcome::Unsatisfied
    );

    let mut graduating = undeclared.clone();
    graduating.graduation_year = Some(2026);
    assert_eq!(
        outcome(&engine, &graduating, second_or_final(), Criterion::Year),
        CheckOutcome::Satisfied
    );
}

#[test]
fn open_wording_only_lifts_a_restriction_when_nothing_else_is_named() {
    let engine = EligibilityEngine::default();
    let mut general = student();
    general.category = Some(Category::General);

    let mixed = NewScholarship {
        category_restriction: Some("SC/ST, any year".to_string()),
        ..listing("Reserved Award", "Trust")
    };
    assert_eq!(
        outcome(&engine, &general, mixed, Criterion::Category),
        CheckOutcome::Unsatisfied
    );

    let phrased = NewScholarship {
        category_restriction: Some("Open to all".to_string()),
        ..listing("Open Award", "Trust")
    };
    assert_eq!(
        outcome(&engine, &general, phrased, Criterion::Category),
        CheckOutcome::Unrestricted
    );
}

#[test]
fn course_restriction_mismatch_is_unsatisfied() {
    let engine = EligibilityEngine::default();
    let listing = NewScholarship {
        course_restriction: Some("MBBS or BDS".to_string()),
        ..listing("Medical Award", "Health Ministry")
    };
    assert_eq!(
        outcome(&engine, &student(), listing, Criterion::Course),
        CheckOutcome::Unsatisfied
    );
}

#[test]
fn ranking_orders_eligible_listings_by_award() {
    let engine = EligibilityEngine::default();
    let scholarships = vec![
        stored(
            "sch-1",
            NewScholarship {
                amount: Some(10_000.0),
                ..listing("Small Award", "Trust")
            },
        ),
        stored(
            "sch-2",
            NewScholarship {
                amount: None,
                ..listing("Unpriced Award", "Trust")
            },
        ),
        stored(
            "sch-3",
            NewScholarship {
                amount: Some(75_000.0),
                ..listing("Large Award", "Trust")
            },
        ),
        stored(
            "sch-4",
            NewScholarship {
                amount: Some(90_000.0),
                min_cgpa: Some(9.5),
                ..listing("Topper Award", "Trust")
            },
        ),
    ];

    let ranked = engine.rank(Some(&student()), scholarships.clone(), today());
    let titles: Vec<&str> = ranked
        .iter()
        .map(|entry| entry.scholarship.title.as_str())
        .collect();

    assert_eq!(titles, vec!["Large Award", "Small Award", "Unpriced Award"]);
    assert!(ranked.iter().all(|entry| entry.report.is_some()));
    assert_eq!(engine.count_eligible(&student(), &scholarships, today()), 3);
}

#[test]
fn equal_awards_rank_by_earliest_deadline() {
    let engine = EligibilityEngine::default();
    let award = |id: &str, title: &str, deadline: Option<NaiveDate>| {
        stored(
            id,
            NewScholarship {
                amount: Some(25_000.0),
                deadline,
                ..listing(title, "Trust")
            },
        )
    };
    let scholarships = vec![
        award("sch-1", "Alpha Award", None),
        award("sch-2", "Beta Award", Some(date(2025, 12, 31))),
        award("sch-3", "Gamma Award", Some(date(2025, 9, 15))),
        award("sch-4", "Delta Award", Some(date(2025, 9, 15))),
    ];

    let ranked = engine.rank(Some(&student()), scholarships, today());
    let titles: Vec<&str> = ranked
        .iter()
        .map(|entry| entry.scholarship.title.as_str())
        .collect();

    assert_eq!(
        titles,
        vec!["Delta Award", "Gamma Award", "Beta Award", "Alpha Award"]
    );
}

#[test]
fn anonymous_ranking_returns_newest_listings() {
    let engine = EligibilityEngine::new(MatchPolicy {
        anonymous_limit: 2,
        ..MatchPolicy::default()
    });
    let scholarships: Vec<_> = (1..=3i64)
        .map(|day| {
            let mut scholarship =
                stored(&format!("sch-{day}"), listing(&format!("Award {day}"), "Trust"));
            scholarship.created_at = now() - Duration::days(10 - day);
            scholarship
        })
        .collect();

    let ranked = engine.rank(None, scholarships, today());
    let ids: Vec<&str> = ranked
        .iter()
        .map(|entry| entry.scholarship.id.0.as_str())
        .collect();

    assert_eq!(ids, vec!["sch-3", "sch-2"]);
    assert!(ranked.iter().all(|entry| entry.report.is_none()));
}
