//! Session-scoped access-control state.
//!
//! One [`AccessControl`] exists per authenticated session. It owns the current
//! principal, its resolved role and effective permissions, and publishes every
//! change as an [`AccessSnapshot`] on a watch channel that guards and menus
//! read from.
//!
//! Every principal change or refresh issues a new request token. A load result
//! is applied only while its token is still the latest one, so a slow load for
//! a previous principal can never overwrite newer state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::effective::EffectivePermission;
use super::evaluator::PermissionResolver;
use super::loader::{LoadError, LoadedPermissions, PermissionLoader};
use super::model::{Action, Resource};
use super::principal::AdminUser;
use super::role::Role;

/// Immutable view of the access-control state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub principal: Option<AdminUser>,
    pub role: Option<Role>,
    pub effective: Vec<EffectivePermission>,
    pub loading: bool,
    /// Latest issued request token.
    pub request: u64,
    /// Request token at which the current principal was assigned.
    pub principal_since: u64,
    /// Bumped on every published change.
    pub revision: u64,
}

impl AccessSnapshot {
    fn idle() -> Self {
        Self {
            principal: None,
            role: None,
            effective: Vec::new(),
            loading: true,
            request: 0,
            principal_since: 0,
            revision: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.principal.is_some()
    }

    pub fn is_super_admin(&self) -> bool {
        !self.loading
            && self.principal.as_ref().map(|p| p.is_active).unwrap_or(false)
            && self.role.as_ref().map(Role::is_superuser).unwrap_or(false)
    }

    /// Denies while loading; otherwise defers to the resolver.
    pub fn has_permission(&self, resolver: &PermissionResolver, resource: Resource, action: Action) -> bool {
        if self.loading {
            return false;
        }
        resolver.has_permission(self.principal.as_ref(), self.role.as_ref(), &self.effective, resource, action)
    }

    pub fn can_access(&self, resolver: &PermissionResolver, resource: Resource) -> bool {
        self.has_permission(resolver, resource, Action::View)
    }
}

struct Shared<L> {
    loader: L,
    resolver: PermissionResolver,
    load_timeout: Option<Duration>,
    state: watch::Sender<AccessSnapshot>,
}

impl<L: PermissionLoader> Shared<L> {
    /// Starts a new request for `next` and returns its token.
    fn begin(&self, next: Option<AdminUser>) -> u64 {
        let mut token = 0;
        self.state.send_modify(|s| {
            s.request += 1;
            token = s.request;
            if s.principal != next {
                s.principal_since = token;
            }
            s.principal = next;
            s.role = None;
            s.effective.clear();
            s.loading = true;
            s.revision += 1;
        });
        token
    }

    async fn run_load(&self, token: u64, principal: Option<AdminUser>) {
        let outcome = match &principal {
            None => Ok(LoadedPermissions::default()),
            Some(p) => match self.load_timeout {
                Some(limit) => tokio::time::timeout(limit, self.loader.load(p))
                    .await
                    .unwrap_or(Err(LoadError::TimedOut)),
                None => self.loader.load(p).await,
            },
        };
        self.apply(token, principal.as_ref(), outcome);
    }

    fn apply(&self, token: u64, principal: Option<&AdminUser>, outcome: Result<LoadedPermissions, LoadError>) {
        let user_id = principal.map(|p| p.id.to_string()).unwrap_or_else(|| "-".to_string());
        let applied = self.state.send_if_modified(|s| {
            if s.request != token {
                return false;
            }
            match outcome {
                Ok(loaded) => {
                    s.role = loaded.role;
                    s.effective = loaded.effective;
                }
                Err(err) => {
                    tracing::error!(user_id = %user_id, error = %err, "permission load failed");
                    s.role = None;
                    s.effective.clear();
                }
            }
            s.loading = false;
            s.revision += 1;
            true
        });

        if applied {
            tracing::debug!(user_id = %user_id, token, "permissions published");
        } else {
            tracing::debug!(user_id = %user_id, token, "discarding stale permission load");
        }
    }
}

/// Access-control service for one session. Cloning shares the same state.
pub struct AccessControl<L> {
    shared: Arc<Shared<L>>,
}

impl<L> Clone for AccessControl<L> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<L> std::fmt::Debug for AccessControl<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.shared.state.borrow();
        f.debug_struct("AccessControl")
            .field("principal", &s.principal.as_ref().map(|p| p.id))
            .field("loading", &s.loading)
            .field("request", &s.request)
            .finish()
    }
}

impl<L: PermissionLoader> AccessControl<L> {
    /// Starts idle: no principal, loading, every check denied.
    pub fn new(loader: L) -> Self {
        Self::with_load_timeout(loader, None)
    }

    /// Like [`new`](Self::new), failing loads closed once `load_timeout` elapses.
    pub fn with_load_timeout(loader: L, load_timeout: Option<Duration>) -> Self {
        let (state, _) = watch::channel(AccessSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                loader,
                resolver: PermissionResolver::new(),
                load_timeout,
                state,
            }),
        }
    }

    /// Swaps the principal and schedules a load for it on the tokio runtime.
    ///
    /// `None` clears the session; the state settles as unauthenticated.
    pub fn set_principal(&self, principal: Option<AdminUser>) -> JoinHandle<()> {
        match &principal {
            Some(p) => tracing::info!(user_id = %p.id, role_id = %p.role_id, "principal changed"),
            None => tracing::info!("principal cleared"),
        }
        let token = self.shared.begin(principal.clone());
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.run_load(token, principal).await })
    }

    /// Reloads role and grants for the current principal.
    ///
    /// The load runs on its own task: dropping this future stops the wait,
    /// not the load, so the state still settles.
    pub async fn refresh(&self) {
        let principal = self.shared.state.borrow().principal.clone();
        let token = self.shared.begin(principal.clone());
        let shared = Arc::clone(&self.shared);
        let load = tokio::spawn(async move { shared.run_load(token, principal).await });
        if let Err(err) = load.await {
            tracing::error!(error = %err, "permission refresh task failed");
        }
    }

    /// Waits until no load is pending. Never returns while idle.
    pub async fn ready(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|s| !s.loading).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<AccessSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.shared.resolver
    }

    pub fn principal(&self) -> Option<AdminUser> {
        self.shared.state.borrow().principal.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.shared.state.borrow().role.clone()
    }

    pub fn effective_permissions(&self) -> Vec<EffectivePermission> {
        self.shared.state.borrow().effective.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    pub fn is_super_admin(&self) -> bool {
        self.shared.state.borrow().is_super_admin()
    }

    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.shared
            .state
            .borrow()
            .has_permission(&self.shared.resolver, resource, action)
    }

    /// String form of [`has_permission`](Self::has_permission); unknown names deny.
    pub fn has_permission_key(&self, resource: &str, action: &str) -> bool {
        match (resource.parse::<Resource>(), action.parse::<Action>()) {
            (Ok(resource), Ok(action)) => self.has_permission(resource, action),
            _ => false,
        }
    }

    pub fn can_access(&self, resource: Resource) -> bool {
        self.has_permission(resource, Action::View)
    }
}
