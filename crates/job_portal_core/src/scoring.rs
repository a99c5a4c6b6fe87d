//! crates/job_portal_core/src/scoring.rs
//!
//! Match scoring between a profile and a job, and the ordering of the job feed.
//!
//! The score is the share of a job's required skills and certifications that
//! the profile covers, as a percentage. Skills weigh 70% and certifications
//! 30%; when a job lists only one kind of requirement, that kind carries the
//! whole score. A job with no requirements scores 100.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domain::{Job, Profile};

pub const SKILL_WEIGHT: f64 = 0.7;
pub const CERTIFICATION_WEIGHT: f64 = 0.3;

/// Jobs posted longer ago than this are archived and hidden from the default feed.
pub const ARCHIVE_AFTER_DAYS: i64 = 30;

/// Lowercases and trims every entry, dropping blanks and duplicates.
pub fn normalize<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn coverage(have: &BTreeSet<String>, required: &BTreeSet<String>) -> f64 {
    let matched = required.intersection(have).count();
    matched as f64 / required.len() as f64
}

/// Scores raw skill and certification lists against a job, in `[0, 100]`.
pub fn score_lists<S: AsRef<str>>(skills: &[S], certifications: &[S], job: &Job) -> f64 {
    let required_skills = normalize(&job.required_skills);
    let required_certs = normalize(&job.required_certifications);

    let raw = match (required_skills.is_empty(), required_certs.is_empty()) {
        (true, true) => 1.0,
        (false, true) => coverage(&normalize(skills), &required_skills),
        (true, false) => coverage(&normalize(certifications), &required_certs),
        (false, false) => {
            SKILL_WEIGHT * coverage(&normalize(skills), &required_skills)
                + CERTIFICATION_WEIGHT * coverage(&normalize(certifications), &required_certs)
        }
    };

    round_to_tenth((raw * 100.0).clamp(0.0, 100.0))
}

/// Scores a profile against a job. A missing profile covers nothing.
pub fn match_score(profile: Option<&Profile>, job: &Job) -> f64 {
    match profile {
        Some(profile) => score_lists(&profile.skills, &profile.certifications, job),
        None => score_lists::<&str>(&[], &[], job),
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A job paired with its score for one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredJob {
    pub job: Job,
    pub score: f64,
}

/// Feed order: score descending, then newest posting, then external id.
pub fn feed_order(a: &ScoredJob, b: &ScoredJob) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.job.posted_at.cmp(&a.job.posted_at))
        .then_with(|| a.job.external_id.cmp(&b.job.external_id))
}

/// Scores every job against `profile` and sorts them into feed order.
pub fn rank_feed(profile: Option<&Profile>, jobs: Vec<Job>) -> Vec<ScoredJob> {
    let mut scored: Vec<ScoredJob> = jobs
        .into_iter()
        .map(|job| {
            let score = match_score(profile, &job);
            ScoredJob { job, score }
        })
        .collect();
    scored.sort_by(feed_order);
    scored
}

/// Optional narrowing of the feed.
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub role: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    /// Show only archived postings instead of only active ones.
    pub archived: bool,
}

fn contains_ignore_case(haystack: &str, needle: &Option<String>) -> bool {
    match needle.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

impl FeedFilter {
    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        let threshold = now - Duration::days(ARCHIVE_AFTER_DAYS);
        let is_archived = job.posted_at < threshold;
        if is_archived != self.archived {
            return false;
        }

        let skill_ok = match self.skill.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(_) => job
                .required_skills
                .iter()
                .any(|s| contains_ignore_case(s, &self.skill)),
        };

        skill_ok
            && contains_ignore_case(&job.role, &self.role)
            && contains_ignore_case(&job.location, &self.location)
    }

    pub fn apply(&self, jobs: Vec<Job>, now: DateTime<Utc>) -> Vec<Job> {
        jobs.into_iter().filter(|job| self.matches(job, now)).collect()
    }
}

/// Skills and certifications commonly expected for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefaults {
    pub role: &'static str,
    pub skills: &'static [&'static str],
    pub certifications: &'static [&'static str],
}

static ROLE_DEFAULTS: &[RoleDefaults] = &[
    RoleDefaults {
        role: "Chef",
        skills: &["Cooking", "Food Safety", "Inventory Management"],
        certifications: &["Food Handler Certification"],
    },
    RoleDefaults {
        role: "Cashier",
        skills: &["Customer Service", "Cash Handling", "Food Safety"],
        certifications: &["Food Handler Certification"],
    },
    RoleDefaults {
        role: "Driver",
        skills: &["Driving", "Customer Service", "Food Safety"],
        certifications: &["Driver's License"],
    },
    RoleDefaults {
        role: "Marketing Specialist",
        skills: &["Marketing", "Customer Service", "Food Safety"],
        certifications: &["Marketing Certification"],
    },
    RoleDefaults {
        role: "Food Safety Inspector",
        skills: &["Food Safety", "Inventory Management"],
        certifications: &["Food Safety Certification"],
    },
    RoleDefaults {
        role: "Fire Safety Inspector",
        skills: &["Gas leak tests", "City code adherence"],
        certifications: &["CGLI Inspector"],
    },
];

/// Suggested requirements for a role, for display only. Scoring never consults
/// this table; unknown roles return `None`.
pub fn role_defaults(role: &str) -> Option<&'static RoleDefaults> {
    let role = role.trim();
    ROLE_DEFAULTS
        .iter()
        .find(|defaults| defaults.role.eq_ignore_ascii_case(role))
}
