use chrono::Duration;

use super::common::*;
use crate::portal::domain::{ApplicationStatus, NewScholarship, ScholarshipId, UserId};
use crate::portal::profile::ProfileUpdate;

fn create(portal: &crate::portal::Portal<ScriptedModel>, listing: NewScholarship) -> ScholarshipId {
    portal
        .catalog
        .create(listing, now())
        .expect("listing created")
        .id
}

#[test]
fn summary_counts_tracked_listings_and_urgent_deadlines() {
    let (portal, _) = build_portal(ScriptedModel::default());
    let user = UserId("student-1".to_string());

    let closing_soon = create(
        &portal,
        NewScholarship {
            deadline: Some(today() + Duration::days(3)),
            ..listing("Closing Soon Award", "Trust")
        },
    );
    let closing_today = create(
        &portal,
        NewScholarship {
            deadline: Some(today()),
            ..listing("Closing Today Award", "Trust")
        },
    );
    let later = create(
        &portal,
        NewScholarship {
            deadline: Some(today() + Duration::days(30)),
            ..listing("Later Award", "Trust")
        },
    );
    let applied = create(
        &portal,
        NewScholarship {
            deadline: Some(today() + Duration::days(2)),
            ..listing("Applied Award", "Trust")
        },
    );
    portal
        .catalog
        .insert(listing("Archive Award", "Old Trust"), now() - Duration::days(30))
        .expect("old listing stored");

    for id in [&closing_soon, &closing_today, &later] {
        portal
            .tracker
            .toggle_save(&user, id, now())
            .expect("saved");
    }
    portal
        .tracker
        .set_status(&user, &applied, ApplicationStatus::Applied, now())
        .expect("applied");

    let summary = portal.dashboard.summary(&user, now()).expect("summary");

    assert_eq!(summary.saved, 3);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.total_scholarships, 5);
    assert_eq!(summary.new_this_week, 4);
    assert_eq!(summary.matching, 0);
    let urgent: Vec<(&str, i64)> = summary
        .urgent
        .iter()
        .map(|entry| (entry.title.as_str(), entry.days_left))
        .collect();
    assert_eq!(
        urgent,
        vec![("Closing Today Award", 0), ("Closing Soon Award", 3)]
    );
    assert_eq!(summary.profile.score, 0);
    assert_eq!(summary.profile.missing.len(), 10);
}

#[test]
fn summary_matching_follows_the_profile() {
    let (portal, _) = build_portal(ScriptedModel::default());
    let user = UserId("student-1".to_string());
    create(
        &portal,
        NewScholarship {
            min_cgpa: Some(7.0),
            ..listing("Merit Award", "Trust")
        },
    );
    create(
        &portal,
        NewScholarship {
            min_cgpa: Some(9.0),
            ..listing("Topper Award", "Trust")
        },
    );

    portal
        .profiles
        .upsert(
            &user,
            Some("asha@example.com"),
            ProfileUpdate {
                name: Some("Asha Verma".to_string()),
                cgpa: Some(8.0),
                ..ProfileUpdate::default()
            },
            now(),
        )
        .expect("profile stored");

    let summary = portal.dashboard.summary(&user, now()).expect("summary");
    assert_eq!(summary.matching, 1);
    assert_eq!(summary.profile.score, 20);
    assert!(summary.profile.missing.contains(&"Annual income"));
}
