use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::auth::services::AuthService;
use crate::cache::{CacheError, ProfileCache};
use crate::error::{AppError, Result};
use crate::users::{ProfileField, UserRecord, UserStore};

/// Profile reads and writes on top of the user store.
///
/// Reads are cache-aside through `ProfileCache`. Writes go to the store first
/// and only then drop the cached snapshot, so the snapshot is gone once the
/// write is visible.
///
/// This does not close every window: a reader that loaded the row before the
/// commit can still fill the cache after the delete. That stale snapshot
/// lives until the user TTL runs out.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserStore>,
    auth: AuthService,
    profiles: ProfileCache,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserStore>, auth: AuthService, profiles: ProfileCache) -> Self {
        Self {
            users,
            auth,
            profiles,
        }
    }

    #[instrument(skip_all)]
    pub async fn get_profile(&self, token: &str) -> Result<UserRecord> {
        let username = self.auth.resolve(token).await?;

        match self.profiles.get(&username).await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => debug!(username, "profile cache miss"),
            Err(e) => warn!(error = %e, username, "profile cache read failed, reading store"),
        }

        let user = match self.users.find_by_username(&username).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                // A live session for a user the store does not know.
                error!(username, "session resolves to a missing user");
                return Err(AppError::NotFound);
            }
            Err(e) => {
                error!(error = %e, username, "get_profile find_by_username failed");
                return Err(e.into());
            }
        };

        if let Err(e) = self.profiles.set(&user).await {
            warn!(error = %e, username, "profile cache fill failed");
        }
        Ok(user)
    }

    /// Registers a user. The cache is filled by the first `get_profile`.
    #[instrument(skip(self, raw_password))]
    pub async fn create_profile(
        &self,
        username: &str,
        raw_password: &str,
        nickname: &str,
    ) -> Result<UserRecord> {
        match self.users.find_by_username(username).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                warn!(username, "username already registered");
                return Err(AppError::AlreadyExists);
            }
            Err(e) => {
                error!(error = %e, username, "create_profile find_by_username failed");
                return Err(e.into());
            }
        }

        let user = self
            .users
            .create_user(username, raw_password, nickname)
            .await
            .map_err(|e| {
                let e = AppError::from(e);
                if e.is_internal() {
                    error!(error = %e, username, "create_user failed");
                } else {
                    warn!(error = %e, username, "create_user lost registration race");
                }
                e
            })?;

        info!(username, id = user.id, "user registered");
        Ok(user)
    }

    /// Applies one field. A non-empty nickname wins over the picture path when
    /// both are given.
    pub async fn edit_profile(
        &self,
        token: &str,
        nickname: Option<&str>,
        picture_path: Option<&str>,
    ) -> Result<String> {
        let committed = self.apply_edit(token, nickname, picture_path).await?;
        match committed.stale_cache {
            Some(e) => Err(e.into()),
            None => Ok(committed.username),
        }
    }

    /// Like `edit_profile`, but an `Ok` means the store write committed even
    /// if the snapshot could not be dropped afterwards.
    #[instrument(skip(self, token))]
    pub async fn apply_edit(
        &self,
        token: &str,
        nickname: Option<&str>,
        picture_path: Option<&str>,
    ) -> Result<Committed> {
        let username = self.auth.resolve(token).await?;

        let (field, value) = match (nickname.filter(|n| !n.is_empty()), picture_path) {
            (Some(n), _) => (ProfileField::Nickname, n),
            (None, Some(p)) => (ProfileField::PicturePath, p),
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "nickname or picture_path is required".into(),
                ))
            }
        };

        let version = self
            .users
            .update_field(&username, field, value)
            .await
            .map_err(|e| {
                let e = AppError::from(e);
                if e.is_internal() {
                    error!(error = %e, username, column = field.column(), "update_field failed");
                } else {
                    warn!(error = %e, username, column = field.column(), "update_field not applied");
                }
                e
            })?;

        info!(username, column = field.column(), version, "profile updated");

        // The row is committed; the snapshot must go.
        let stale_cache = match self.profiles.del(&username).await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, username, "profile cache invalidation failed");
                Some(e)
            }
        };
        Ok(Committed {
            username,
            stale_cache,
        })
    }
}

/// A profile write that reached the store.
#[derive(Debug)]
pub struct Committed {
    pub username: String,
    /// Set when the cached snapshot could not be invalidated.
    pub stale_cache: Option<CacheError>,
}
