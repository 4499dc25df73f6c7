use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::AuthUser;
use crate::resource::ListItem;

/// An account as shown on the users page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub created_at: String,
}

impl From<AuthUser> for AdminUser {
    fn from(user: AuthUser) -> Self {
        let metadata = |key: &str| {
            user.user_metadata
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let name = metadata("full_name")
            .or_else(|| {
                user.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Kullanıcı".to_string());

        let phone = user
            .phone
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| metadata("phone"))
            .unwrap_or_else(|| "-".to_string());

        Self {
            id: user.id,
            name,
            email: user.email,
            phone,
            created_at: user.created_at,
        }
    }
}

impl ListItem for AdminUser {
    type Id = String;
    const LABEL: &'static str = "user";

    fn id(&self) -> &String {
        &self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.name.as_str())];
        fields.extend(self.email.as_deref().map(Cow::Borrowed));
        fields.push(Cow::Borrowed(self.phone.as_str()));
        fields
    }
}
