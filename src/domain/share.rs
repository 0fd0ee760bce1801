// Share settings and the links derived from them
use super::ids::DashboardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShareError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("'{0}' is already shared with")]
    AlreadyShared(String),
    #[error("'{0}' is not shared with")]
    NotShared(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    View,
    Edit,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedUser {
    pub email: String,
    pub role: ShareRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareSettings {
    pub is_public: bool,
    pub allow_embedding: bool,
    pub access_level: AccessLevel,
    pub shared_users: Vec<SharedUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareSettings {
    pub fn add_user(&mut self, email: &str, role: ShareRole) -> Result<(), ShareError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ShareError::EmptyEmail);
        }
        if self.shared_users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(ShareError::AlreadyShared(email.to_string()));
        }
        self.shared_users.push(SharedUser {
            email: email.to_string(),
            role,
        });
        Ok(())
    }

    pub fn remove_user(&mut self, email: &str) -> Result<SharedUser, ShareError> {
        let index = self
            .shared_users
            .iter()
            .position(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .ok_or_else(|| ShareError::NotShared(email.to_string()))?;
        Ok(self.shared_users.remove(index))
    }

    pub fn set_role(&mut self, email: &str, role: ShareRole) -> Result<(), ShareError> {
        let user = self
            .shared_users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .ok_or_else(|| ShareError::NotShared(email.to_string()))?;
        user.role = role;
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_code: Option<String>,
}

impl ShareLinks {
    pub fn new(origin: &str, id: &DashboardId, settings: &ShareSettings) -> Self {
        let origin = origin.trim_end_matches('/');
        let embed_code = settings.allow_embedding.then(|| {
            format!(
                "<iframe src=\"{}/embed/dashboard/{}\" width=\"800\" height=\"600\" frameborder=\"0\"></iframe>",
                origin, id
            )
        });
        Self {
            url: format!("{}/dashboard/{}", origin, id),
            embed_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_links_only_embed_when_allowed() {
        let id = DashboardId::new("abc");
        let mut settings = ShareSettings::default();
        let links = ShareLinks::new("https://bi.example.com/", &id, &settings);
        assert_eq!(links.url, "https://bi.example.com/dashboard/abc");
        assert_eq!(links.embed_code, None);

        settings.allow_embedding = true;
        let links = ShareLinks::new("https://bi.example.com", &id, &settings);
        assert_eq!(
            links.embed_code.as_deref(),
            Some("<iframe src=\"https://bi.example.com/embed/dashboard/abc\" width=\"800\" height=\"600\" frameborder=\"0\"></iframe>")
        );
    }

    #[test]
    fn test_user_management() {
        let mut settings = ShareSettings::default();
        assert_eq!(settings.add_user("  ", ShareRole::Viewer), Err(ShareError::EmptyEmail));
        settings.add_user(" ana@example.com ", ShareRole::Viewer).unwrap();
        assert_eq!(
            settings.add_user("ANA@example.com", ShareRole::Editor),
            Err(ShareError::AlreadyShared("ANA@example.com".to_string()))
        );
        settings.set_role("ana@example.com", ShareRole::Admin).unwrap();
        assert_eq!(settings.shared_users[0].role, ShareRole::Admin);
        assert_eq!(settings.remove_user("ana@example.com").unwrap().email, "ana@example.com");
        assert!(settings.shared_users.is_empty());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut settings = ShareSettings::default();
        assert!(!settings.is_expired(now));
        settings.expires_at = Some(now - Duration::hours(1));
        assert!(settings.is_expired(now));
    }
}
