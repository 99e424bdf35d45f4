//! Authorization engine for the back office.
//!
//! - resource x action permission model
//! - role, group and override grants with override > group > role precedence
//! - superuser bypass
//! - fail-closed session state with last-request-wins loading
//! - guards and navigation visibility derived from that state

mod effective;
mod evaluator;
mod guards;
mod loader;
mod menu;
mod model;
mod principal;
mod role;
mod state;

pub use effective::{Effect, EffectivePermission, Grant, PermissionSource, RawGrants};
pub use evaluator::{resolve, EntrySource, PermissionResolver, ResolveContext, SourceResolver, StaticRoleGrants};
pub use guards::{AccessDenied, AccessDeniedGuard, Decision, Guard, PermissionGuard, RedirectGuard, Rendered};
pub use loader::{DirectoryLoader, LoadError, LoadedPermissions, PermissionLoader};
pub use menu::{derive_menu, MenuEntry, MenuMap, MenuVisibility, NAVIGATION};
pub use model::{parse_permission_key, permission_key, Action, ParseError, Resource};
pub use principal::{AdminUser, ExtendedRole};
pub use role::{Role, RolePermission, SUPER_ADMIN_CODE};
pub use state::{AccessControl, AccessSnapshot};
