//! crates/job_portal_core/src/profiles.rs
//!
//! Profile editing. Only the owning user ever reaches these operations; the web
//! layer passes the authenticated user id.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::Profile;
use crate::error::ProfileError;
use crate::ports::DatabaseService;

/// Fields a user submits when saving their profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub experience: Option<String>,
    pub resume_link: Option<String>,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
}

/// Splits `"a, b ,,c"` into `["a", "b", "c"]`.
pub fn parse_comma_separated(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trims, drops blanks and duplicates, and sorts.
pub fn normalize_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().to_string())
        .filter(|e| !e.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn clean(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct ProfileService {
    db: Arc<dyn DatabaseService>,
}

impl ProfileService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Profile, ProfileError> {
        self.db
            .get_profile(user_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }

    /// Creates or replaces the user's profile.
    pub async fn upsert(&self, user_id: Uuid, draft: ProfileDraft) -> Result<Profile, ProfileError> {
        let resume_link = clean(draft.resume_link);
        if let Some(link) = &resume_link {
            if !(link.starts_with("http://") || link.starts_with("https://")) {
                return Err(ProfileError::InvalidResumeLink);
            }
        }

        let profile = Profile {
            user_id,
            headline: clean(draft.headline),
            summary: clean(draft.summary),
            experience: clean(draft.experience),
            resume_link,
            skills: normalize_entries(draft.skills),
            certifications: normalize_entries(draft.certifications),
            updated_at: Utc::now(),
        };
        self.db.save_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), ProfileError> {
        if self.db.delete_profile(user_id).await? {
            Ok(())
        } else {
            Err(ProfileError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_input_is_split_and_trimmed() {
        assert_eq!(
            parse_comma_separated(" Cooking, Food Safety ,, "),
            vec!["Cooking".to_string(), "Food Safety".to_string()]
        );
    }

    #[test]
    fn entries_are_deduplicated_and_sorted() {
        assert_eq!(
            normalize_entries(["Driving", " Cooking ", "Driving", ""]),
            vec!["Cooking".to_string(), "Driving".to_string()]
        );
    }
}
