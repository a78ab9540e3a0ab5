use serde::{Deserialize, Serialize};

use crate::contract::{
    error::RemoteError,
    model::{Company, RemoteUser, User, UserDraft, UserId, UserPatch},
};

/// Wire shape of a user. Everything is optional because the remote echoes
/// whatever it likes; unknown fields (username, phone, address...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyDto {
    #[serde(default)]
    pub name: String,
}

impl From<&UserDraft> for UserDto {
    fn from(draft: &UserDraft) -> Self {
        Self {
            id: None,
            name: Some(draft.name.clone()),
            email: Some(draft.email.clone()),
            company: Some(CompanyDto {
                name: draft.company.name.clone(),
            }),
        }
    }
}

impl From<UserDto> for RemoteUser {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id.map(UserId),
            fields: UserPatch {
                name: dto.name,
                email: dto.email,
                company: dto.company.map(|c| Company::new(c.name)),
            },
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = RemoteError;

    /// Listed records must carry an id; missing text fields become empty.
    fn try_from(dto: UserDto) -> Result<Self, Self::Error> {
        let id = dto
            .id
            .ok_or_else(|| RemoteError::decode("user record without id"))?;
        Ok(User {
            id: UserId(id),
            name: dto.name.unwrap_or_default(),
            email: dto.email.unwrap_or_default(),
            company: Company::new(dto.company.map(|c| c.name).unwrap_or_default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_record_ignores_extra_fields() {
        let dto: UserDto = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Leanne Graham",
            "username": "Bret",
            "email": "Sincere@april.biz",
            "address": { "city": "Gwenborough" },
            "company": { "name": "Romaguera-Crona", "bs": "harness" }
        }))
        .unwrap();

        let user = User::try_from(dto).unwrap();
        assert_eq!(user.id, UserId(1));
        assert_eq!(user.name, "Leanne Graham");
        assert_eq!(user.company.name, "Romaguera-Crona");
    }

    #[test]
    fn listed_record_without_id_is_rejected() {
        let dto: UserDto = serde_json::from_value(serde_json::json!({ "name": "X" })).unwrap();
        assert!(matches!(
            User::try_from(dto),
            Err(RemoteError::Decode { .. })
        ));
    }

    #[test]
    fn missing_company_becomes_empty() {
        let dto: UserDto =
            serde_json::from_value(serde_json::json!({ "id": 4, "name": "Y", "email": "y@x" }))
                .unwrap();
        let user = User::try_from(dto).unwrap();
        assert_eq!(user.company_label(), "N/A");
    }

    #[test]
    fn draft_serializes_without_id() {
        let body = serde_json::to_value(UserDto::from(&UserDraft::new("Bo", "bo@x.com", "Co")))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "name": "Bo", "email": "bo@x.com", "company": { "name": "Co" } })
        );
    }
}
