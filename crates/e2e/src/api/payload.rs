//! Request payload builders for the RealWorld API

use serde_json::{json, Value};

use playtype_common::DataGenerator;

/// Registration body with a random username and email
pub fn register_user() -> Value {
    json!({
        "user": {
            "username": DataGenerator::replace_symbols("testuser???????"),
            "email": DataGenerator::replace_symbols("tester???????@gmail.com"),
            "password": "password"
        }
    })
}

pub fn login_user(email: &str, password: &str) -> Value {
    json!({
        "user": {
            "email": email,
            "password": password
        }
    })
}

/// Article body with generated title and text
pub fn create_article(tags: &[&str]) -> Value {
    json!({
        "article": {
            "title": DataGenerator::sentence(),
            "description": DataGenerator::sentence(),
            "body": DataGenerator::paragraph(),
            "tagList": tags
        }
    })
}
