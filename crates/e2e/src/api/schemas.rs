//! Response shapes for the RealWorld user endpoints and dashboard API

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;

use super::validator::{FieldIssue, TypeSchema};

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

pub fn is_email(candidate: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(candidate))
}

/// `{ "user": { ... } }` returned by register and login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub token: String,
}

impl TypeSchema for UserEnvelope {
    fn refine(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        if !is_email(&self.user.email) {
            issues.push(FieldIssue::new(["user", "email"], "Invalid email address"));
        }
        issues
    }
}

/// JSON Schema for the register/login response
pub fn user_schema() -> Value {
    json!({
        "type": "object",
        "required": ["user"],
        "properties": {
            "user": {
                "type": "object",
                "required": ["username", "email", "bio", "image", "token"],
                "properties": {
                    "username": {"type": "string"},
                    "email": {"type": "string"},
                    "bio": {"type": ["string", "null"]},
                    "image": {"type": ["string", "null"]},
                    "token": {"type": "string"}
                }
            }
        }
    })
}

/// JSON Schema for quest status updates
pub fn update_quest_status_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "message": {"type": "string"}
        },
        "required": ["message"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResponseValidator;
    use test_case::test_case;

    #[test_case("tester@gmail.com", true ; "plain")]
    #[test_case("a.b+c@sub.example.org", true ; "tagged subdomain")]
    #[test_case("missing-at.example.com", false ; "no at sign")]
    #[test_case("x@nodot", false ; "no dot in domain")]
    #[test_case("sp ace@x.io", false ; "whitespace")]
    fn test_email_check(candidate: &str, expected: bool) {
        assert_eq!(is_email(candidate), expected);
    }

    #[test]
    fn test_user_envelope_refinement() {
        let v = ResponseValidator::new();
        let body = json!({"user": {"username": "u", "email": "bad", "bio": null, "image": null, "token": "t"}});
        let err = v.validate_type::<UserEnvelope>(&body).unwrap_err();
        assert!(err.message.contains("Invalid email address"));

        let ok = json!({"user": {"username": "u", "email": "u@x.io", "bio": null, "image": "i", "token": "t"}});
        assert!(v.validate_type::<UserEnvelope>(&ok).is_ok());
        assert!(v.validate_schema(&user_schema(), &ok).is_ok());
    }

    #[test]
    fn test_quest_status_schema() {
        let v = ResponseValidator::new();
        assert!(v
            .validate_schema(&update_quest_status_schema(), &json!({"message": "updated"}))
            .is_ok());
        assert!(v
            .validate_schema(&update_quest_status_schema(), &json!({"msg": "updated"}))
            .is_err());
    }
}
