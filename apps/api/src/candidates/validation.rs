use serde::Deserialize;

use crate::classifier::CandidateProfile;
use crate::errors::AppError;

/// Body of `POST /api/candidates`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidateRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub years_of_exp: i32,
    pub skills: Vec<String>,
}

/// Accepts `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.ends_with('.'),
        None => false,
    }
}

impl CreateCandidateRequest {
    /// Validates the request and returns the profile to persist. Every
    /// violation is reported at once.
    pub fn into_profile(self) -> Result<CandidateProfile, AppError> {
        let mut problems: Vec<&str> = Vec::new();

        if self.first_name.trim().is_empty() {
            problems.push("First name is required");
        }
        if self.last_name.trim().is_empty() {
            problems.push("Last name is required");
        }
        if !is_valid_email(self.email.trim()) {
            problems.push("Invalid email address");
        }
        if self.years_of_exp < 0 {
            problems.push("Years of experience must be non-negative");
        }
        if self.skills.iter().any(|s| s.trim().is_empty()) {
            problems.push("Skill names cannot be empty");
        } else if self.skills.is_empty() {
            problems.push("At least one skill is required");
        }

        if !problems.is_empty() {
            return Err(AppError::Validation(problems.join("; ")));
        }

        let mut skills: Vec<String> = Vec::with_capacity(self.skills.len());
        for skill in self.skills {
            let skill = skill.trim().to_string();
            if !skills.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
                skills.push(skill);
            }
        }

        Ok(CandidateProfile {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            years_of_exp: self.years_of_exp,
            skills,
        })
    }
}
