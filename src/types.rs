/// Shared wire types for the TourDesk auth surface

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Access/refresh credentials, always stored and replaced together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Admin,
    Seller,
}

/// Denormalized snapshot of the signed-in principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Value,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Fields the backend adds that we carry along untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `POST /auth/login` and `POST /auth/register` payload
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub user: SessionUser,
    pub tokens: TokenPair,
}

/// `POST /auth/refresh` payload
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
    pub tokens: TokenPair,
}

/// `GET /auth/me` payload
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_user_keeps_unknown_fields() {
        let user: SessionUser = serde_json::from_value(json!({
            "id": 7,
            "name": "Ana",
            "email": "ana@example.com",
            "role": "seller",
            "companyId": 3,
            "phone": "555-0100"
        }))
        .unwrap();

        assert_eq!(user.role, Role::Seller);
        assert_eq!(user.company_id, Some(json!(3)));
        assert_eq!(user.extra.get("phone"), Some(&json!("555-0100")));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["phone"], json!("555-0100"));
        assert_eq!(back["companyId"], json!(3));
    }

    #[test]
    fn test_token_pair_uses_camel_case_keys() {
        let pair: TokenPair =
            serde_json::from_value(json!({ "accessToken": "a", "refreshToken": "r" })).unwrap();
        assert_eq!(pair, TokenPair::new("a", "r"));
    }
}
