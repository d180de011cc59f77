//! External auth-provider links owned by a user.

use serde::{Deserialize, Serialize};

use catalog_core::{AccountId, UserId};

use crate::db::query::define_fields;

/// A user's account at an external identity provider.
///
/// `(provider, provider_account_id)` is unique. Accounts are deleted with
/// their user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    /// Provider account type (e.g. `"oauth"`, `"email"`).
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    /// Access token expiry as seconds since the Unix epoch.
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

/// Input for linking an account to a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    pub user_id: UserId,
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub session_state: Option<String>,
}

impl CreateAccountInput {
    /// Account link with no tokens.
    #[must_use]
    pub fn new(
        user_id: UserId,
        account_type: impl Into<String>,
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            account_type: account_type.into(),
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            refresh_token: None,
            access_token: None,
            expires_at: None,
            token_type: None,
            scope: None,
            id_token: None,
            session_state: None,
        }
    }
}

/// Input for updating an account (typically a token refresh).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountInput {
    pub user_id: Option<UserId>,
    pub account_type: Option<String>,
    pub provider: Option<String>,
    pub provider_account_id: Option<String>,
    pub refresh_token: Option<Option<String>>,
    pub access_token: Option<Option<String>>,
    pub expires_at: Option<Option<i64>>,
    pub token_type: Option<Option<String>>,
    pub scope: Option<Option<String>>,
    pub id_token: Option<Option<String>>,
    pub session_state: Option<Option<String>>,
}

define_fields! {
    /// Filterable columns of [`Account`].
    pub enum AccountField {
        Id => ("id", Int),
        UserId => ("user_id", Int),
        AccountType => ("account_type", Text),
        Provider => ("provider", Text),
        ProviderAccountId => ("provider_account_id", Text),
        RefreshToken => ("refresh_token", Text),
        AccessToken => ("access_token", Text),
        ExpiresAt => ("expires_at", Int),
        TokenType => ("token_type", Text),
        Scope => ("scope", Text),
        IdToken => ("id_token", Text),
        SessionState => ("session_state", Text),
    }
}
