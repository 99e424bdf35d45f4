use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Protectable areas of the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Dashboard,
    Orders,
    Quotes,
    Customers,
    Products,
    Categories,
    Inventory,
    Suppliers,
    Marketers,
    Reports,
    Notifications,
    Users,
    Roles,
    ActivityLog,
    Settings,
    SettingsGeneral,
    SettingsBackup,
    SettingsApi,
}

/// Operations that can be performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
    Reject,
    Export,
    Import,
    Configure,
    ManageStatus,
    ManageUsers,
    ManageRoles,
    RunBackup,
    ManageApi,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl Resource {
    pub const ALL: [Resource; 18] = [
        Resource::Dashboard,
        Resource::Orders,
        Resource::Quotes,
        Resource::Customers,
        Resource::Products,
        Resource::Categories,
        Resource::Inventory,
        Resource::Suppliers,
        Resource::Marketers,
        Resource::Reports,
        Resource::Notifications,
        Resource::Users,
        Resource::Roles,
        Resource::ActivityLog,
        Resource::Settings,
        Resource::SettingsGeneral,
        Resource::SettingsBackup,
        Resource::SettingsApi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Dashboard => "dashboard",
            Resource::Orders => "orders",
            Resource::Quotes => "quotes",
            Resource::Customers => "customers",
            Resource::Products => "products",
            Resource::Categories => "categories",
            Resource::Inventory => "inventory",
            Resource::Suppliers => "suppliers",
            Resource::Marketers => "marketers",
            Resource::Reports => "reports",
            Resource::Notifications => "notifications",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::ActivityLog => "activity_log",
            Resource::Settings => "settings",
            Resource::SettingsGeneral => "settings_general",
            Resource::SettingsBackup => "settings_backup",
            Resource::SettingsApi => "settings_api",
        }
    }

    /// Human-readable name shown on the access denied panel.
    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::Dashboard => "Dashboard",
            Resource::Orders => "Orders",
            Resource::Quotes => "Quotes",
            Resource::Customers => "Customers",
            Resource::Products => "Products",
            Resource::Categories => "Categories",
            Resource::Inventory => "Inventory",
            Resource::Suppliers => "Suppliers",
            Resource::Marketers => "Marketers",
            Resource::Reports => "Reports",
            Resource::Notifications => "Notifications",
            Resource::Users => "Users",
            Resource::Roles => "Roles & Permissions",
            Resource::ActivityLog => "Activity Log",
            Resource::Settings => "Settings",
            Resource::SettingsGeneral => "General Settings",
            Resource::SettingsBackup => "Backup Settings",
            Resource::SettingsApi => "API Settings",
        }
    }

    /// Actions that make sense for this resource.
    ///
    /// This table drives the role editor only. Permission checks never consult it.
    pub fn available_actions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            Resource::Dashboard => &[View],
            Resource::Orders => &[View, Create, Edit, Delete, Approve, Reject, Export, ManageStatus],
            Resource::Quotes => &[View, Create, Edit, Delete, Approve, Reject, Export],
            Resource::Customers => &[View, Create, Edit, Delete, Approve, Reject, Export, Import, ManageStatus],
            Resource::Products => &[View, Create, Edit, Delete, Export, Import],
            Resource::Categories => &[View, Create, Edit, Delete],
            Resource::Inventory => &[View, Edit, Export, Import],
            Resource::Suppliers => &[View, Create, Edit, Delete, Approve, Reject, ManageStatus],
            Resource::Marketers => &[View, Create, Edit, Delete, ManageStatus],
            Resource::Reports => &[View, Export],
            Resource::Notifications => &[View, Create, Delete],
            Resource::Users => &[View, Create, Edit, Delete, ManageStatus, ManageUsers],
            Resource::Roles => &[View, Create, Edit, Delete, ManageRoles],
            Resource::ActivityLog => &[View, Export],
            Resource::Settings => &[View, Edit, Configure],
            Resource::SettingsGeneral => &[View, Edit, Configure, ManageApi],
            Resource::SettingsBackup => &[View, RunBackup, Configure],
            Resource::SettingsApi => &[View, Configure, ManageApi],
        }
    }

    pub fn supports(&self, action: Action) -> bool {
        self.available_actions().contains(&action)
    }
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Approve,
        Action::Reject,
        Action::Export,
        Action::Import,
        Action::Configure,
        Action::ManageStatus,
        Action::ManageUsers,
        Action::ManageRoles,
        Action::RunBackup,
        Action::ManageApi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Export => "export",
            Action::Import => "import",
            Action::Configure => "configure",
            Action::ManageStatus => "manage_status",
            Action::ManageUsers => "manage_users",
            Action::ManageRoles => "manage_roles",
            Action::RunBackup => "run_backup",
            Action::ManageApi => "manage_api",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseError::UnknownResource(s.to_string()))
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

/// Builds the `resource:action` key used by effective permission entries.
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource, action)
}

/// Splits a `resource:action` key. Unknown halves are errors, never panics.
pub fn parse_permission_key(key: &str) -> Result<(Resource, Action), ParseError> {
    let (resource, action) = key
        .split_once(':')
        .ok_or_else(|| ParseError::UnknownResource(key.to_string()))?;
    Ok((resource.parse()?, action.parse()?))
}
