use super::effective::{Effect, EffectivePermission, PermissionSource, RawGrants};
use super::model::{parse_permission_key, Action, Resource};
use super::principal::AdminUser;
use super::role::Role;

/// Inputs a source resolver may consult.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub role: Option<&'a Role>,
    pub entries: &'a [EffectivePermission],
}

/// One link of the precedence chain. Returns `None` when the source has no
/// opinion on the pair, letting the next link decide.
pub trait SourceResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn effect(&self, ctx: &ResolveContext<'_>, resource: Resource, action: Action) -> Option<Effect>;
}

/// Effective-permission entries tagged with a given source. Within one
/// source a DENY entry beats an ALLOW entry for the same key.
#[derive(Debug, Clone, Copy)]
pub struct EntrySource(pub PermissionSource);

impl SourceResolver for EntrySource {
    fn name(&self) -> &'static str {
        match self.0 {
            PermissionSource::Override => "override",
            PermissionSource::Group => "group",
            PermissionSource::Role => "role_entry",
        }
    }

    fn effect(&self, ctx: &ResolveContext<'_>, resource: Resource, action: Action) -> Option<Effect> {
        let mut found = None;
        for entry in ctx
            .entries
            .iter()
            .filter(|e| e.source == self.0 && e.matches(resource, action))
        {
            if entry.effect == Effect::Deny {
                return Some(Effect::Deny);
            }
            found = Some(entry.effect);
        }
        found
    }
}

/// The role's static `{resource, actions}` list.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRoleGrants;

impl SourceResolver for StaticRoleGrants {
    fn name(&self) -> &'static str {
        "role_static"
    }

    fn effect(&self, ctx: &ResolveContext<'_>, resource: Resource, action: Action) -> Option<Effect> {
        ctx.role
            .filter(|role| role.grants(resource, action))
            .map(|_| Effect::Allow)
    }
}

/// Decides permission checks for a principal.
///
/// Evaluation order:
/// 1. missing or inactive principal -> deny
/// 2. superuser role -> allow
/// 3. override entries, group entries, role entries, static role grants;
///    the first source with an opinion decides
/// 4. deny
pub struct PermissionResolver {
    chain: Vec<Box<dyn SourceResolver>>,
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(|s| s.name()).collect();
        f.debug_struct("PermissionResolver").field("chain", &names).finish()
    }
}

impl PermissionResolver {
    pub fn new() -> Self {
        Self {
            chain: vec![
                Box::new(EntrySource(PermissionSource::Override)),
                Box::new(EntrySource(PermissionSource::Group)),
                Box::new(EntrySource(PermissionSource::Role)),
                Box::new(StaticRoleGrants),
            ],
        }
    }

    /// Inserts a resolver ahead of `position` in the chain.
    pub fn with_source_at(mut self, position: usize, source: Box<dyn SourceResolver>) -> Self {
        let position = position.min(self.chain.len());
        self.chain.insert(position, source);
        self
    }

    pub fn has_permission(
        &self,
        principal: Option<&AdminUser>,
        role: Option<&Role>,
        entries: &[EffectivePermission],
        resource: Resource,
        action: Action,
    ) -> bool {
        let principal = match principal {
            Some(p) if p.is_active => p,
            Some(p) => {
                tracing::debug!(user_id = %p.id, %resource, %action, "inactive principal denied");
                return false;
            }
            None => return false,
        };

        if role.map(Role::is_superuser).unwrap_or(false) {
            tracing::debug!(user_id = %principal.id, %resource, %action, "super_admin bypass");
            return true;
        }

        let ctx = ResolveContext { role, entries };
        for source in &self.chain {
            if let Some(effect) = source.effect(&ctx, resource, action) {
                tracing::debug!(
                    user_id = %principal.id,
                    %resource,
                    %action,
                    source = source.name(),
                    effect = ?effect,
                    "permission decided"
                );
                return effect.is_allow();
            }
        }

        tracing::debug!(user_id = %principal.id, %resource, %action, "permission denied");
        false
    }

    /// String form of [`has_permission`](Self::has_permission). Unknown
    /// resource or action names deny.
    pub fn has_permission_key(
        &self,
        principal: Option<&AdminUser>,
        role: Option<&Role>,
        entries: &[EffectivePermission],
        key: &str,
    ) -> bool {
        match parse_permission_key(key) {
            Ok((resource, action)) => self.has_permission(principal, role, entries, resource, action),
            Err(err) => {
                tracing::debug!(key, error = %err, "unknown permission key denied");
                false
            }
        }
    }
}

/// Flattens a principal's role, group and override grants into entries.
/// Missing or inactive principals resolve to nothing.
pub fn resolve(principal: Option<&AdminUser>, role: Option<&Role>, grants: &RawGrants) -> Vec<EffectivePermission> {
    match principal {
        Some(p) if p.is_active => {}
        _ => return Vec::new(),
    }

    let mut entries = Vec::new();
    if let Some(role) = role {
        for perm in &role.permissions {
            for action in &perm.actions {
                entries.push(EffectivePermission::new(
                    perm.resource,
                    *action,
                    PermissionSource::Role,
                    Effect::Allow,
                ));
            }
        }
    }
    entries.extend(grants.groups.iter().map(|g| EffectivePermission::from_grant(g, PermissionSource::Group)));
    entries.extend(
        grants
            .overrides
            .iter()
            .map(|g| EffectivePermission::from_grant(g, PermissionSource::Override)),
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::effective::Grant;
    use uuid::Uuid;

    fn admin() -> AdminUser {
        AdminUser::new(Uuid::new_v4(), "Admin", "role-admin")
    }

    fn editor_role() -> Role {
        Role::new("role-editor", "EDITOR", "Editor").grant(Resource::Orders, [Action::View, Action::Edit])
    }

    fn entry(resource: Resource, action: Action, source: PermissionSource, effect: Effect) -> EffectivePermission {
        EffectivePermission::new(resource, action, source, effect)
    }

    #[test]
    fn inactive_principal_is_denied_everything() {
        let resolver = PermissionResolver::new();
        let user = admin().inactive();
        let role = Role::new("role-super", "SUPER_ADMIN", "Super").super_admin();
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(!resolver.has_permission(Some(&user), Some(&role), &[], resource, action));
            }
        }
        assert!(resolve(Some(&user), Some(&role), &RawGrants::default()).is_empty());
    }

    #[test]
    fn missing_principal_is_denied() {
        let resolver = PermissionResolver::new();
        assert!(!resolver.has_permission(None, Some(&editor_role()), &[], Resource::Orders, Action::View));
    }

    #[test]
    fn superuser_allows_without_entries() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = Role::new("role-super-admin", "SUPER_ADMIN", "Super Admin").system();
        assert!(resolver.has_permission(Some(&user), Some(&role), &[], Resource::SettingsGeneral, Action::ManageApi));
        assert!(resolver.has_permission(Some(&user), Some(&role), &[], Resource::Dashboard, Action::RunBackup));
    }

    #[test]
    fn default_deny_for_ungranted_resource() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = editor_role();
        for action in Action::ALL {
            assert!(!resolver.has_permission(Some(&user), Some(&role), &[], Resource::Customers, action));
        }
    }

    #[test]
    fn override_allow_grants_what_role_lacks() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = Role::new("role-viewer", "VIEWER", "Viewer");
        let entries = [entry(Resource::Orders, Action::Edit, PermissionSource::Override, Effect::Allow)];
        assert!(resolver.has_permission(Some(&user), Some(&role), &entries, Resource::Orders, Action::Edit));
    }

    #[test]
    fn override_deny_revokes_role_grant() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = editor_role();
        let entries = [entry(Resource::Orders, Action::Edit, PermissionSource::Override, Effect::Deny)];
        assert!(!resolver.has_permission(Some(&user), Some(&role), &entries, Resource::Orders, Action::Edit));
        assert!(resolver.has_permission(Some(&user), Some(&role), &entries, Resource::Orders, Action::View));
    }

    #[test]
    fn override_beats_group_beats_role() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = editor_role();

        let group_deny = [entry(Resource::Orders, Action::View, PermissionSource::Group, Effect::Deny)];
        assert!(!resolver.has_permission(Some(&user), Some(&role), &group_deny, Resource::Orders, Action::View));

        let both = [
            entry(Resource::Orders, Action::View, PermissionSource::Group, Effect::Deny),
            entry(Resource::Orders, Action::View, PermissionSource::Override, Effect::Allow),
        ];
        assert!(resolver.has_permission(Some(&user), Some(&role), &both, Resource::Orders, Action::View));
    }

    #[test]
    fn deny_wins_within_one_source() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let entries = [
            entry(Resource::Quotes, Action::Approve, PermissionSource::Group, Effect::Allow),
            entry(Resource::Quotes, Action::Approve, PermissionSource::Group, Effect::Deny),
        ];
        assert!(!resolver.has_permission(Some(&user), None, &entries, Resource::Quotes, Action::Approve));
    }

    #[test]
    fn admin_role_without_orders_cannot_approve() {
        let resolver = PermissionResolver::new();
        let user = admin().with_extended_role(crate::authz::ExtendedRole::Admin);
        let role = Role::new("role-admin", "ADMIN", "ADMIN")
            .system()
            .grant(Resource::Customers, [Action::View]);
        assert!(!resolver.has_permission(Some(&user), Some(&role), &[], Resource::Orders, Action::Approve));
    }

    #[test]
    fn unknown_keys_deny_without_panicking() {
        let resolver = PermissionResolver::new();
        let user = admin();
        let role = Role::new("role-super", "SUPER_ADMIN", "Super").super_admin();
        assert!(!resolver.has_permission_key(Some(&user), Some(&role), &[], "warehouse:view"));
        assert!(!resolver.has_permission_key(Some(&user), Some(&role), &[], "garbage"));
        assert!(resolver.has_permission_key(Some(&user), Some(&role), &[], "orders:view"));
    }

    #[test]
    fn resolve_tags_every_source() {
        let user = admin();
        let grants = RawGrants {
            groups: vec![Grant::allow(Resource::Reports, Action::Export)],
            overrides: vec![Grant::deny(Resource::Orders, Action::Edit)],
        };
        let entries = resolve(Some(&user), Some(&editor_role()), &grants);

        assert_eq!(entries.len(), 4);
        assert!(entries
            .iter()
            .any(|e| e.permission_key == "reports:export" && e.source == PermissionSource::Group));
        assert!(entries
            .iter()
            .any(|e| e.permission_key == "orders:edit" && e.source == PermissionSource::Override && e.effect == Effect::Deny));

        let resolver = PermissionResolver::new();
        assert!(!resolver.has_permission(Some(&user), Some(&editor_role()), &entries, Resource::Orders, Action::Edit));
        assert!(resolver.has_permission(Some(&user), Some(&editor_role()), &entries, Resource::Reports, Action::Export));
    }

    struct FrozenOrders;

    impl SourceResolver for FrozenOrders {
        fn name(&self) -> &'static str {
            "frozen_orders"
        }

        fn effect(&self, _ctx: &ResolveContext<'_>, resource: Resource, _action: Action) -> Option<Effect> {
            (resource == Resource::Orders).then_some(Effect::Deny)
        }
    }

    #[test]
    fn extra_source_can_be_inserted() {
        let resolver = PermissionResolver::new().with_source_at(0, Box::new(FrozenOrders));
        let user = admin();
        let entries = [entry(Resource::Orders, Action::View, PermissionSource::Override, Effect::Allow)];
        assert!(!resolver.has_permission(Some(&user), Some(&editor_role()), &entries, Resource::Orders, Action::View));
        assert!(format!("{resolver:?}").contains("frozen_orders"));
    }
}
