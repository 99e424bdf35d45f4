//! View guards over [`AccessControl`].
//!
//! Guards only read the published snapshot. They never fail: a missing
//! principal or permission degrades to rendering nothing, an access denied
//! panel, or a redirect.

use std::sync::atomic::{AtomicU64, Ordering};

use super::loader::PermissionLoader;
use super::model::{Action, Resource};
use super::state::{AccessControl, AccessSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    /// Permissions are still loading; render nothing yet.
    Pending,
    Redirect(String),
}

pub trait Guard {
    fn check(&self, resource: Resource, action: Action) -> Decision;
}

fn permission_decision<L: PermissionLoader>(access: &AccessControl<L>, resource: Resource, action: Action) -> Decision {
    let snapshot = access.snapshot();
    if snapshot.loading {
        Decision::Pending
    } else if snapshot.has_permission(access.resolver(), resource, action) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Renders children only when the check passes.
#[derive(Debug, Clone)]
pub struct PermissionGuard<L> {
    access: AccessControl<L>,
}

impl<L: PermissionLoader> PermissionGuard<L> {
    pub fn new(access: AccessControl<L>) -> Self {
        Self { access }
    }

    /// `children` when allowed, nothing otherwise.
    pub fn render<T>(&self, resource: Resource, action: Action, children: impl FnOnce() -> T) -> Option<T> {
        match self.check(resource, action) {
            Decision::Allow => Some(children()),
            _ => None,
        }
    }

    /// `children` when allowed, `fallback` when denied, nothing while loading.
    pub fn render_or<T>(
        &self,
        resource: Resource,
        action: Action,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Option<T> {
        match self.check(resource, action) {
            Decision::Allow => Some(children()),
            Decision::Pending => None,
            Decision::Deny | Decision::Redirect(_) => Some(fallback()),
        }
    }
}

impl<L: PermissionLoader> Guard for PermissionGuard<L> {
    fn check(&self, resource: Resource, action: Action) -> Decision {
        permission_decision(&self.access, resource, action)
    }
}

/// Payload of the access denied panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub resource: Resource,
    pub resource_name: &'static str,
    pub home_path: String,
}

impl AccessDenied {
    /// Hands the home path to the router.
    pub fn go_home(&self, navigate: impl FnOnce(&str)) {
        navigate(&self.home_path);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    Content(T),
    Pending,
    Denied(AccessDenied),
}

/// Replaces protected content with an access denied panel.
#[derive(Debug, Clone)]
pub struct AccessDeniedGuard<L> {
    access: AccessControl<L>,
    home_path: String,
}

impl<L: PermissionLoader> AccessDeniedGuard<L> {
    pub fn new(access: AccessControl<L>, home_path: impl Into<String>) -> Self {
        Self {
            access,
            home_path: home_path.into(),
        }
    }

    pub fn render<T>(&self, resource: Resource, action: Action, children: impl FnOnce() -> T) -> Rendered<T> {
        match self.check(resource, action) {
            Decision::Allow => Rendered::Content(children()),
            Decision::Pending => Rendered::Pending,
            Decision::Deny | Decision::Redirect(_) => Rendered::Denied(self.denied(resource)),
        }
    }

    pub fn denied(&self, resource: Resource) -> AccessDenied {
        AccessDenied {
            resource,
            resource_name: resource.display_name(),
            home_path: self.home_path.clone(),
        }
    }
}

impl<L: PermissionLoader> Guard for AccessDeniedGuard<L> {
    fn check(&self, resource: Resource, action: Action) -> Decision {
        permission_decision(&self.access, resource, action)
    }
}

/// Sends unauthenticated sessions to the login path, once.
///
/// The guard fires after loading settles with no principal. It stays quiet
/// for the rest of that unauthenticated period; a later sign-out starts a new
/// period and fires again, whether or not the guard was consulted in between.
#[derive(Debug)]
pub struct RedirectGuard<L> {
    access: AccessControl<L>,
    login_path: String,
    /// `principal_since + 1` of the period already redirected; 0 for none.
    redirected_for: AtomicU64,
}

impl<L: PermissionLoader> RedirectGuard<L> {
    pub fn new(access: AccessControl<L>, login_path: impl Into<String>) -> Self {
        Self {
            access,
            login_path: login_path.into(),
            redirected_for: AtomicU64::new(0),
        }
    }

    /// True for the first caller in an unauthenticated period.
    fn claim(&self, snapshot: &AccessSnapshot) -> bool {
        let period = snapshot.principal_since + 1;
        if self.redirected_for.swap(period, Ordering::SeqCst) == period {
            return false;
        }
        tracing::info!(path = %self.login_path, "redirecting unauthenticated session");
        true
    }

    /// Returns the redirect target the first time the session is found
    /// unauthenticated; `None` otherwise.
    pub fn poll(&self) -> Option<String> {
        let snapshot = self.access.snapshot();
        if snapshot.loading || snapshot.principal.is_some() {
            return None;
        }
        self.claim(&snapshot).then(|| self.login_path.clone())
    }

    /// Calls `navigate` if [`poll`](Self::poll) yields a target.
    pub fn enforce(&self, navigate: impl FnOnce(&str)) -> bool {
        match self.poll() {
            Some(path) => {
                navigate(&path);
                true
            }
            None => false,
        }
    }
}

impl<L: PermissionLoader> Guard for RedirectGuard<L> {
    /// `Redirect` is issued once per unauthenticated period, `Deny` after.
    fn check(&self, resource: Resource, action: Action) -> Decision {
        let snapshot = self.access.snapshot();
        if snapshot.loading {
            Decision::Pending
        } else if snapshot.principal.is_none() {
            if self.claim(&snapshot) {
                Decision::Redirect(self.login_path.clone())
            } else {
                Decision::Deny
            }
        } else if snapshot.has_permission(self.access.resolver(), resource, action) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::Notify;
    use uuid::Uuid;

    use crate::authz::{AdminUser, DirectoryLoader};
    use crate::directory::{Directory, DirectorySeed, DEMO_ADMIN_ID};

    async fn admin_session() -> AccessControl<DirectoryLoader> {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let admin = directory.principal(DEMO_ADMIN_ID).await.unwrap();
        let ac = AccessControl::new(DirectoryLoader::new(directory));
        ac.set_principal(Some(admin)).await.unwrap();
        ac
    }

    #[tokio::test]
    async fn conditional_guard_renders_children_or_fallback() {
        let ac = admin_session().await;
        let guard = PermissionGuard::new(ac);

        assert_eq!(guard.render(Resource::Customers, Action::Edit, || "edit"), Some("edit"));
        assert_eq!(guard.render(Resource::Orders, Action::Approve, || "approve"), None);
        assert_eq!(
            guard.render_or(Resource::Orders, Action::Approve, || "approve", || "nope"),
            Some("nope")
        );
    }

    #[tokio::test]
    async fn guards_render_nothing_while_loading() {
        let ac = AccessControl::new(DirectoryLoader::new(Arc::new(Directory::new(DirectorySeed::builtin()))));
        let guard = PermissionGuard::new(ac.clone());
        let denied = AccessDeniedGuard::new(ac.clone(), "/");

        assert_eq!(guard.check(Resource::Dashboard, Action::View), Decision::Pending);
        assert_eq!(guard.render_or(Resource::Dashboard, Action::View, || 1, || 2), None);
        assert_eq!(denied.render(Resource::Dashboard, Action::View, || 1), Rendered::Pending);
    }

    #[tokio::test]
    async fn access_denied_guard_names_the_resource() {
        let ac = admin_session().await;
        let guard = AccessDeniedGuard::new(ac, "/admin");

        match guard.render(Resource::ActivityLog, Action::View, || ()) {
            Rendered::Denied(panel) => {
                assert_eq!(panel.resource_name, "Activity Log");
                let mut went = None;
                panel.go_home(|path| went = Some(path.to_string()));
                assert_eq!(went.as_deref(), Some("/admin"));
            }
            other => panic!("expected denied panel, got {other:?}"),
        }
        assert_eq!(guard.render(Resource::Products, Action::View, || 7), Rendered::Content(7));
    }

    #[tokio::test]
    async fn redirect_fires_once_per_unauthenticated_period() {
        let ac = admin_session().await;
        let guard = RedirectGuard::new(ac.clone(), "/login");
        assert_eq!(guard.poll(), None);
        assert_eq!(guard.check(Resource::Customers, Action::View), Decision::Allow);

        ac.set_principal(None).await.unwrap();
        assert!(!ac.has_permission(Resource::Customers, Action::View));

        let mut hits = 0;
        for _ in 0..3 {
            if guard.enforce(|path| assert_eq!(path, "/login")) {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
        assert_eq!(guard.check(Resource::Customers, Action::View), Decision::Deny);

        // a new principal re-arms the guard
        let someone = AdminUser::new(Uuid::new_v4(), "Temp", "role-viewer");
        ac.set_principal(Some(someone)).await.unwrap();
        assert_eq!(guard.poll(), None);
        ac.set_principal(None).await.unwrap();
        assert_eq!(guard.poll(), Some("/login".to_string()));
        assert_eq!(guard.poll(), None);
    }

    #[tokio::test]
    async fn redirect_rearms_without_being_polled_while_signed_in() {
        let ac = admin_session().await;
        let guard = RedirectGuard::new(ac.clone(), "/login");

        ac.set_principal(None).await.unwrap();
        assert_eq!(guard.poll(), Some("/login".to_string()));

        let someone = AdminUser::new(Uuid::new_v4(), "Temp", "role-viewer");
        ac.set_principal(Some(someone)).await.unwrap();
        ac.set_principal(None).await.unwrap();

        assert_eq!(guard.poll(), Some("/login".to_string()));
        assert_eq!(guard.poll(), None);
    }

    #[tokio::test]
    async fn check_redirects_once_then_denies() {
        let ac = admin_session().await;
        let guard = RedirectGuard::new(ac.clone(), "/login");

        ac.set_principal(None).await.unwrap();
        assert_eq!(guard.check(Resource::Orders, Action::View), Decision::Redirect("/login".into()));
        assert_eq!(guard.check(Resource::Orders, Action::View), Decision::Deny);
        assert_eq!(guard.poll(), None);

        // refreshing an empty session is not a new sign-out
        ac.refresh().await;
        assert_eq!(guard.check(Resource::Orders, Action::View), Decision::Deny);

        let someone = AdminUser::new(Uuid::new_v4(), "Temp", "role-viewer");
        ac.set_principal(Some(someone)).await.unwrap();
        ac.set_principal(None).await.unwrap();
        assert_eq!(guard.check(Resource::Orders, Action::View), Decision::Redirect("/login".into()));
    }

    #[tokio::test]
    async fn redirect_waits_for_loading_to_finish() {
        struct Stalled(Arc<Notify>);

        #[async_trait::async_trait]
        impl PermissionLoader for Stalled {
            async fn load(&self, _: &AdminUser) -> Result<crate::authz::LoadedPermissions, crate::authz::LoadError> {
                self.0.notified().await;
                Ok(Default::default())
            }
        }

        let ac = AccessControl::new(Stalled(Arc::new(Notify::new())));
        let guard = RedirectGuard::new(ac.clone(), "/login");
        assert_eq!(guard.poll(), None);
        assert_eq!(guard.check(Resource::Orders, Action::View), Decision::Pending);

        ac.set_principal(None).await.unwrap();
        assert_eq!(guard.poll(), Some("/login".to_string()));
    }
}
