use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account classification assigned at provisioning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtendedRole {
    Admin,
    SuperAdmin,
    Customer,
    Supplier,
    Marketer,
}

impl ExtendedRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtendedRole::Admin => "ADMIN",
            ExtendedRole::SuperAdmin => "SUPER_ADMIN",
            ExtendedRole::Customer => "CUSTOMER",
            ExtendedRole::Supplier => "SUPPLIER",
            ExtendedRole::Marketer => "MARKETER",
        }
    }
}

/// The back-office user whose permissions are being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdminUser {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub is_active: bool,
    pub role_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_role: Option<ExtendedRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_super_admin: Option<bool>,
}

impl AdminUser {
    pub fn new(id: Uuid, name: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: String::new(),
            is_active: true,
            role_id: role_id.into(),
            extended_role: None,
            is_super_admin: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_extended_role(mut self, extended_role: ExtendedRole) -> Self {
        self.extended_role = Some(extended_role);
        self
    }

    pub fn with_super_admin_flag(mut self, flag: bool) -> Self {
        self.is_super_admin = Some(flag);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// True when provisioning marked this account as a superuser, either
    /// through the explicit flag or the `SUPER_ADMIN` classification.
    pub fn claims_super_admin(&self) -> bool {
        self.is_super_admin == Some(true) || self.extended_role == Some(ExtendedRole::SuperAdmin)
    }
}
