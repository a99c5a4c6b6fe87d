//! crates/job_portal_core/src/seed.rs
//!
//! Built-in sample postings, used when the employer API is disabled and to
//! seed an empty cache when the employer API cannot be reached.

use chrono::{DateTime, Duration, Utc};

use crate::domain::JobPosting;

struct Sample {
    id: &'static str,
    title: &'static str,
    role: &'static str,
    company: &'static str,
    location: &'static str,
    description: &'static str,
    skills: &'static [&'static str],
    certifications: &'static [&'static str],
    age_days: i64,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "1001",
        title: "Sous Chef",
        role: "Chef",
        company: "Culinary Collective",
        location: "New York, NY",
        description: "Support lead chef with daily kitchen operations and menu execution.",
        skills: &["Cooking", "Food Safety", "Inventory Management"],
        certifications: &["Food Handler Certification"],
        age_days: 2,
    },
    Sample {
        id: "1002",
        title: "Front Desk Cashier",
        role: "Cashier",
        company: "Gourmet Market",
        location: "Chicago, IL",
        description: "Assist guests with purchases, manage the register, and maintain customer satisfaction.",
        skills: &["Customer Service", "Cash Handling", "Food Safety"],
        certifications: &["Food Handler Certification"],
        age_days: 5,
    },
    Sample {
        id: "1003",
        title: "Delivery Driver",
        role: "Driver",
        company: "FastBite",
        location: "Los Angeles, CA",
        description: "Deliver gourmet meals across the metro area ensuring safety and quality.",
        skills: &["Driving", "Customer Service", "Food Safety"],
        certifications: &["Driver's License"],
        age_days: 1,
    },
    Sample {
        id: "1004",
        title: "Regional Marketing Specialist",
        role: "Marketing Specialist",
        company: "TasteWave",
        location: "Austin, TX",
        description: "Develop campaigns and manage brand engagement initiatives.",
        skills: &["Marketing", "Customer Service", "Food Safety"],
        certifications: &["Marketing Certification"],
        age_days: 3,
    },
    Sample {
        id: "1005",
        title: "Food Safety Inspector",
        role: "Food Safety Inspector",
        company: "SafeServe Inc.",
        location: "Seattle, WA",
        description: "Inspect partner facilities to maintain compliance with safety standards.",
        skills: &["Food Safety", "Inventory Management"],
        certifications: &["Food Safety Certification"],
        age_days: 4,
    },
    Sample {
        id: "1006",
        title: "Fire Safety Inspector",
        role: "Fire Safety Inspector",
        company: "SecureHeat",
        location: "Denver, CO",
        description: "Perform safety inspections and ensure adherence to municipal codes.",
        skills: &["Gas leak tests", "City code adherence"],
        certifications: &["CGLI Inspector"],
        age_days: 6,
    },
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The sample postings, dated relative to `now`.
pub fn sample_postings(now: DateTime<Utc>) -> Vec<JobPosting> {
    SAMPLES
        .iter()
        .map(|sample| JobPosting {
            external_id: sample.id.to_string(),
            title: sample.title.to_string(),
            role: sample.role.to_string(),
            company: Some(sample.company.to_string()),
            location: sample.location.to_string(),
            description: Some(sample.description.to_string()),
            required_skills: to_strings(sample.skills),
            required_certifications: to_strings(sample.certifications),
            posted_at: Some(now - Duration::days(sample.age_days)),
        })
        .collect()
}
