//! One access-control state per authenticated session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{AccessControl, AccessDeniedGuard, Action, DirectoryLoader, Rendered, Resource};
use crate::directory::Directory;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

pub type Session = AccessControl<DirectoryLoader>;

#[derive(Clone)]
pub struct SessionRegistry {
    directory: Arc<Directory>,
    load_timeout: Option<Duration>,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new(directory: Arc<Directory>, load_timeout: Option<Duration>) -> Self {
        Self {
            directory,
            load_timeout,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the session for `user_id`, creating it on first use.
    ///
    /// The principal is re-read from the directory on every call; a changed
    /// account (deactivated, moved to another role) triggers a reload. Users
    /// missing from the directory get a throwaway unauthenticated session and
    /// any session cached for them is ended.
    pub async fn session_for(&self, user_id: Uuid) -> Session {
        let Some(principal) = self.directory.principal(user_id).await else {
            self.end(user_id).await;
            let session = self.create();
            session.set_principal(None);
            return session;
        };

        let existing = self.sessions.read().await.get(&user_id).cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                let mut sessions = self.sessions.write().await;
                match sessions.get(&user_id) {
                    Some(session) => session.clone(),
                    None => {
                        let session = self.create();
                        sessions.insert(user_id, session.clone());
                        tracing::debug!(user_id = %user_id, "session created");
                        session.set_principal(Some(principal));
                        return session;
                    }
                }
            }
        };

        if session.principal().as_ref() != Some(&principal) {
            session.set_principal(Some(principal));
        }
        session
    }

    fn create(&self) -> Session {
        AccessControl::with_load_timeout(DirectoryLoader::new(self.directory.clone()), self.load_timeout)
    }

    /// Reloads every live session whose principal holds `role_id`.
    pub async fn refresh_role_holders(&self, role_id: &str) {
        let sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        for session in sessions {
            let holds = session.principal().map(|p| p.role_id == role_id).unwrap_or(false);
            if holds {
                session.refresh().await;
            }
        }
    }

    /// Clears and forgets the session for `user_id`. Returns whether one existed.
    pub async fn end(&self, user_id: Uuid) -> bool {
        match self.sessions.write().await.remove(&user_id) {
            Some(session) => {
                session.set_principal(None);
                tracing::debug!(user_id = %user_id, "session ended");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// An authenticated caller whose permissions have finished loading.
pub struct AdminSession {
    pub user_id: Uuid,
    pub access: Session,
    home_path: String,
}

impl AdminSession {
    /// Ok when the session may perform `action` on `resource`.
    pub fn require(&self, resource: Resource, action: Action) -> AppResult<()> {
        let guard = AccessDeniedGuard::new(self.access.clone(), self.home_path.clone());
        match guard.render(resource, action, || ()) {
            Rendered::Content(()) => Ok(()),
            Rendered::Denied(panel) => {
                tracing::info!(user_id = %self.user_id, %resource, %action, "access denied");
                Err(AppError::AccessDenied {
                    resource_name: panel.resource_name.to_string(),
                    home_path: panel.home_path,
                })
            }
            Rendered::Pending => Err(AppError::access_denied(resource, self.home_path.clone())),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let access = state.sessions.session_for(auth.user_id).await;
        access.ready().await;

        if !access.snapshot().is_authenticated() {
            return Err(AppError::login_required(state.authz.login_path.clone()));
        }

        Ok(AdminSession {
            user_id: auth.user_id,
            access,
            home_path: state.authz.home_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::AdminUser;
    use crate::directory::{DirectorySeed, DEMO_ADMIN_ID};

    #[tokio::test]
    async fn sessions_are_reused_and_track_account_changes() {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let registry = SessionRegistry::new(directory.clone(), None);

        let first = registry.session_for(DEMO_ADMIN_ID).await;
        first.ready().await;
        assert!(first.can_access(Resource::Customers));

        let admin = directory.principal(DEMO_ADMIN_ID).await.unwrap();
        directory.upsert_principal(admin.inactive()).await;

        let second = registry.session_for(DEMO_ADMIN_ID).await;
        second.ready().await;
        assert_eq!(registry.len().await, 1);
        assert!(!first.can_access(Resource::Customers));
        assert_eq!(first.principal().map(|p| p.is_active), Some(false));
    }

    #[tokio::test]
    async fn unknown_user_settles_unauthenticated_without_caching() {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let registry = SessionRegistry::new(directory, None);

        for _ in 0..3 {
            let session = registry.session_for(Uuid::new_v4()).await;
            session.ready().await;
            assert!(!session.snapshot().is_authenticated());
        }
        assert_eq!(registry.len().await, 0);
        assert!(!registry.end(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn removed_account_drops_its_session() {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let registry = SessionRegistry::new(directory.clone(), None);

        let stranger = Uuid::new_v4();
        directory.upsert_principal(AdminUser::new(stranger, "Temp", "role-viewer")).await;
        let session = registry.session_for(stranger).await;
        session.ready().await;
        assert_eq!(registry.len().await, 1);

        directory.remove_principal(stranger).await;
        let again = registry.session_for(stranger).await;
        again.ready().await;
        assert!(!again.snapshot().is_authenticated());
        assert!(session.principal().is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn end_clears_and_forgets() {
        let directory = Arc::new(Directory::new(DirectorySeed::builtin()));
        let registry = SessionRegistry::new(directory, None);

        let session = registry.session_for(DEMO_ADMIN_ID).await;
        session.ready().await;
        assert!(registry.end(DEMO_ADMIN_ID).await);
        assert_eq!(registry.len().await, 0);

        session.ready().await;
        assert!(!session.snapshot().is_authenticated());
        assert!(!registry.end(DEMO_ADMIN_ID).await);
    }
}
