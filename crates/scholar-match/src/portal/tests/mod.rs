mod common;
mod dashboard;
mod eligibility;
