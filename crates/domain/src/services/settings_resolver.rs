//! Scoped settings resolution.
//!
//! Every read and write goes through [`SettingsResolver::resolve_scope`],
//! which turns a [`TenantContext`] plus optional explicit ids into the
//! `(user, workspace)` pair rows are stored under:
//!
//! 1. An explicit user id wins. Without one, single-tenant installs always
//!    resolve to the company account. Otherwise the principal's owner is
//!    used, and anonymous requests fall back to the first super admin.
//! 2. Super admin owners have no workspace. Other owners use the explicit
//!    workspace, then the principal's current workspace, then their own.
//! 3. Single-tenant reads merge the tenant-wide rows under the workspace
//!    rows.
//!
//! Raw row sets are cached per `(kind, user, workspace)` and the written
//! entry is invalidated on every upsert. Other processes may serve stale
//! values until the TTL expires.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::store::{SettingsStore, UserDirectory};
use crate::error::DomainError;
use crate::models::setting::{keys, FALLBACK_LANGUAGE};
use crate::models::{
    ResolvedScope, ScopeRequest, SettingsKind, SettingsMap, TenantContext, User, UserRole,
};

/// Default lifetime of a cached row set.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default number of cached row sets.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: SettingsKind,
    user_id: i64,
    workspace_id: Option<i64>,
}

pub struct SettingsResolver {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn SettingsStore>,
    cache: Cache<CacheKey, SettingsMap>,
}

impl SettingsResolver {
    pub fn new(users: Arc<dyn UserDirectory>, store: Arc<dyn SettingsStore>) -> Self {
        Self::with_cache(users, store, DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache(
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn SettingsStore>,
        ttl: Duration,
        capacity: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            users,
            store,
            cache,
        }
    }

    /// Works out which stored scope a request refers to.
    ///
    /// Returns `None` while bootstrapping or when no account exists to
    /// resolve to.
    pub async fn resolve_scope(
        &self,
        ctx: &TenantContext,
        scope: ScopeRequest,
    ) -> Result<Option<ResolvedScope>, DomainError> {
        if ctx.bootstrapping {
            return Ok(None);
        }

        let merge_tenant_wide = ctx.is_single_tenant();

        if let Some(user_id) = scope.user_id {
            let resolved = match self.users.find_by_id(user_id).await? {
                Some(owner) => self.scope_for_owner(ctx, &owner, scope.workspace_id),
                // Unknown accounts have no role to reason about; take the ids as given.
                None => ResolvedScope {
                    user_id,
                    workspace_id: scope.workspace_id,
                    merge_tenant_wide: false,
                },
            };
            return Ok(Some(with_merge(resolved, merge_tenant_wide)));
        }

        if ctx.is_single_tenant() {
            let Some(company) = self.users.first_with_role(UserRole::Company).await? else {
                return Ok(None);
            };
            let resolved = ResolvedScope {
                user_id: company.id,
                workspace_id: scope.workspace_id.or(company.current_workspace_id),
                merge_tenant_wide: false,
            };
            return Ok(Some(with_merge(resolved, merge_tenant_wide)));
        }

        let owner = match &ctx.principal {
            Some(principal) if principal.owner_id() == principal.id => Some(principal.clone()),
            Some(principal) => self.users.find_by_id(principal.owner_id()).await?,
            None => self.users.first_with_role(UserRole::SuperAdmin).await?,
        };

        Ok(owner.map(|owner| {
            with_merge(
                self.scope_for_owner(ctx, &owner, scope.workspace_id),
                merge_tenant_wide,
            )
        }))
    }

    fn scope_for_owner(
        &self,
        ctx: &TenantContext,
        owner: &User,
        explicit_workspace: Option<i64>,
    ) -> ResolvedScope {
        let workspace_id = if owner.is_super_admin() {
            None
        } else {
            explicit_workspace.or_else(|| match &ctx.principal {
                Some(p) if p.owner_id() == owner.id => {
                    p.current_workspace_id.or(owner.current_workspace_id)
                }
                _ => owner.current_workspace_id,
            })
        };

        ResolvedScope {
            user_id: owner.id,
            workspace_id,
            merge_tenant_wide: false,
        }
    }

    /// All settings visible to the request, with `defaultLanguage` backfilled.
    pub async fn all(
        &self,
        ctx: &TenantContext,
        scope: ScopeRequest,
    ) -> Result<SettingsMap, DomainError> {
        let Some(resolved) = self.resolve_scope(ctx, scope).await? else {
            return Ok(SettingsMap::new());
        };

        let mut settings = self.load_scoped(SettingsKind::General, resolved).await?;

        if !settings.contains_key(keys::DEFAULT_LANGUAGE) {
            let lang = ctx
                .principal
                .as_ref()
                .and_then(|p| p.lang.as_deref())
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or(FALLBACK_LANGUAGE);
            settings.insert(keys::DEFAULT_LANGUAGE.to_string(), lang.to_string());
        }

        Ok(settings)
    }

    /// A single value, or `default` when the key is unset.
    pub async fn get(
        &self,
        ctx: &TenantContext,
        key: &str,
        default: &str,
        scope: ScopeRequest,
    ) -> Result<String, DomainError> {
        let settings = self.all(ctx, scope).await?;
        Ok(settings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    /// Upserts one value. Returns `false` when there is no scope to write to.
    pub async fn set(
        &self,
        ctx: &TenantContext,
        key: &str,
        value: &str,
        scope: ScopeRequest,
        ignore_workspace: bool,
    ) -> Result<bool, DomainError> {
        self.write(ctx, SettingsKind::General, &[(key, value)], scope, ignore_workspace)
            .await
    }

    /// Upserts several values into the same scope.
    pub async fn set_many(
        &self,
        ctx: &TenantContext,
        entries: &[(&str, &str)],
        scope: ScopeRequest,
        ignore_workspace: bool,
    ) -> Result<bool, DomainError> {
        self.write(ctx, SettingsKind::General, entries, scope, ignore_workspace)
            .await
    }

    /// Payment settings for the request's scope.
    ///
    /// A company without any payment settings uses the first super admin's
    /// tenant-wide payment settings.
    pub async fn payment_settings(
        &self,
        ctx: &TenantContext,
        scope: ScopeRequest,
    ) -> Result<SettingsMap, DomainError> {
        let Some(resolved) = self.resolve_scope(ctx, scope).await? else {
            return Ok(SettingsMap::new());
        };

        let settings = self.load_scoped(SettingsKind::Payment, resolved).await?;
        if !settings.is_empty() {
            return Ok(settings);
        }

        let Some(owner) = self.users.find_by_id(resolved.user_id).await? else {
            return Ok(settings);
        };
        if owner.role != UserRole::Company {
            return Ok(settings);
        }

        match self.users.first_with_role(UserRole::SuperAdmin).await? {
            Some(admin) => self.load_cached(SettingsKind::Payment, admin.id, None).await,
            None => Ok(settings),
        }
    }

    pub async fn set_payment_many(
        &self,
        ctx: &TenantContext,
        entries: &[(&str, &str)],
        scope: ScopeRequest,
        ignore_workspace: bool,
    ) -> Result<bool, DomainError> {
        self.write(ctx, SettingsKind::Payment, entries, scope, ignore_workspace)
            .await
    }

    /// Upserts `entries` one by one. The cached scope is invalidated even when
    /// a later key fails, since earlier keys are already stored.
    async fn write(
        &self,
        ctx: &TenantContext,
        kind: SettingsKind,
        entries: &[(&str, &str)],
        scope: ScopeRequest,
        ignore_workspace: bool,
    ) -> Result<bool, DomainError> {
        let Some(resolved) = self.resolve_scope(ctx, scope).await? else {
            tracing::warn!(kind = %kind, "Settings write skipped: no scope to write to");
            return Ok(false);
        };

        let workspace_id = if ignore_workspace {
            None
        } else {
            resolved.workspace_id
        };

        let mut written = 0usize;
        let mut outcome = Ok(());
        for (key, value) in entries {
            if let Err(e) = self
                .store
                .upsert(kind, resolved.user_id, workspace_id, key, value)
                .await
            {
                outcome = Err(e);
                break;
            }
            written += 1;
        }

        self.cache
            .invalidate(&CacheKey {
                kind,
                user_id: resolved.user_id,
                workspace_id,
            })
            .await;

        if let Err(e) = outcome {
            tracing::warn!(
                kind = %kind,
                user_id = resolved.user_id,
                workspace_id = ?workspace_id,
                keys = written,
                error = %e,
                "Settings write failed part way"
            );
            return Err(e.into());
        }

        tracing::debug!(
            kind = %kind,
            user_id = resolved.user_id,
            workspace_id = ?workspace_id,
            keys = written,
            "Settings written"
        );

        Ok(true)
    }

    async fn load_scoped(
        &self,
        kind: SettingsKind,
        scope: ResolvedScope,
    ) -> Result<SettingsMap, DomainError> {
        if scope.merge_tenant_wide && scope.workspace_id.is_some() {
            let mut merged = self.load_cached(kind, scope.user_id, None).await?;
            let overrides = self
                .load_cached(kind, scope.user_id, scope.workspace_id)
                .await?;
            merged.extend(overrides);
            return Ok(merged);
        }

        self.load_cached(kind, scope.user_id, scope.workspace_id)
            .await
    }

    async fn load_cached(
        &self,
        kind: SettingsKind,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> Result<SettingsMap, DomainError> {
        let key = CacheKey {
            kind,
            user_id,
            workspace_id,
        };
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let rows = self.store.load(kind, user_id, workspace_id).await?;
        self.cache.insert(key, rows.clone()).await;
        Ok(rows)
    }
}

fn with_merge(mut scope: ResolvedScope, merge_tenant_wide: bool) -> ResolvedScope {
    scope.merge_tenant_wide = merge_tenant_wide;
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantMode;
    use crate::services::memory::InMemoryStore;

    fn user(id: i64, role: UserRole, created_by: Option<i64>, workspace: Option<i64>) -> User {
        User {
            id,
            name: format!("user{}", id),
            email: format!("user{}@taskly.test", id),
            role,
            created_by,
            current_workspace_id: workspace,
            lang: None,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, SettingsResolver) {
        let store = Arc::new(InMemoryStore::new());
        store.add_user(user(1, UserRole::SuperAdmin, None, None)).await;
        store.add_user(user(2, UserRole::Company, Some(1), Some(20))).await;
        store.add_user(user(3, UserRole::Member, Some(2), Some(21))).await;
        store.add_user(user(4, UserRole::Company, Some(1), Some(40))).await;
        let resolver = SettingsResolver::new(store.clone(), store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_set_then_read_round_trip() {
        let (_, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::Saas);
        let scope = ScopeRequest::for_user(2).with_workspace(20);

        assert!(resolver.set(&ctx, "k", "v", scope, false).await.unwrap());
        let settings = resolver.all(&ctx, scope).await.unwrap();
        assert_eq!(settings.get("k").map(String::as_str), Some("v"));
        assert_eq!(resolver.get(&ctx, "k", "x", scope).await.unwrap(), "v");
        assert_eq!(resolver.get(&ctx, "missing", "x", scope).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_member_resolves_to_company_owner() {
        let (_, resolver) = setup().await;
        let member = user(3, UserRole::Member, Some(2), Some(21));
        let ctx = TenantContext::authenticated(member, TenantMode::Saas);

        let scope = resolver
            .resolve_scope(&ctx, ScopeRequest::inferred())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scope.user_id, 2);
        assert_eq!(scope.workspace_id, Some(21));
        assert!(!scope.merge_tenant_wide);
    }

    #[tokio::test]
    async fn test_company_defaults_to_current_workspace() {
        let (_, resolver) = setup().await;
        let company = user(2, UserRole::Company, Some(1), Some(20));
        let ctx = TenantContext::authenticated(company, TenantMode::Saas);

        let scope = resolver
            .resolve_scope(&ctx, ScopeRequest::inferred())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((scope.user_id, scope.workspace_id), (2, Some(20)));

        let scope = resolver
            .resolve_scope(&ctx, ScopeRequest::inferred().with_workspace(22))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scope.workspace_id, Some(22));
    }

    #[tokio::test]
    async fn test_super_admin_has_no_workspace() {
        let (_, resolver) = setup().await;
        let admin = user(1, UserRole::SuperAdmin, None, Some(99));
        let ctx = TenantContext::authenticated(admin, TenantMode::Saas);

        let scope = resolver
            .resolve_scope(&ctx, ScopeRequest::inferred().with_workspace(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((scope.user_id, scope.workspace_id), (1, None));
    }

    #[tokio::test]
    async fn test_anonymous_saas_resolves_to_super_admin() {
        let (_, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::Saas);
        let scope = resolver
            .resolve_scope(&ctx, ScopeRequest::inferred())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((scope.user_id, scope.workspace_id), (1, None));
    }

    #[tokio::test]
    async fn test_single_tenant_default_resolution_is_stable() {
        let (_, resolver) = setup().await;
        let first = TenantContext::anonymous(TenantMode::SingleTenant);
        let member = user(3, UserRole::Member, Some(2), Some(21));
        let second = TenantContext::authenticated(member, TenantMode::SingleTenant);

        let a = resolver
            .resolve_scope(&first, ScopeRequest::inferred())
            .await
            .unwrap()
            .unwrap();
        let b = resolver
            .resolve_scope(&second, ScopeRequest::inferred())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!((a.user_id, a.workspace_id), (2, Some(20)));
        assert!(a.merge_tenant_wide);
    }

    #[tokio::test]
    async fn test_single_tenant_reads_see_writes_without_ids() {
        let (_, resolver) = setup().await;
        let writer = TenantContext::anonymous(TenantMode::SingleTenant);
        let reader = TenantContext::anonymous(TenantMode::SingleTenant);

        resolver
            .set(&writer, "site_title", "Acme", ScopeRequest::inferred(), false)
            .await
            .unwrap();
        let settings = resolver.all(&reader, ScopeRequest::inferred()).await.unwrap();
        assert_eq!(settings.get("site_title").map(String::as_str), Some("Acme"));
    }

    #[tokio::test]
    async fn test_single_tenant_workspace_overrides_tenant_wide() {
        let (_, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::SingleTenant);
        let scope = ScopeRequest::inferred();

        resolver.set(&ctx, "color", "blue", scope, true).await.unwrap();
        resolver.set(&ctx, "seo_title", "Acme", scope, true).await.unwrap();
        resolver.set(&ctx, "color", "red", scope, false).await.unwrap();

        let settings = resolver.all(&ctx, scope).await.unwrap();
        assert_eq!(settings.get("color").map(String::as_str), Some("red"));
        assert_eq!(settings.get("seo_title").map(String::as_str), Some("Acme"));
    }

    #[tokio::test]
    async fn test_saas_does_not_merge_tenant_wide() {
        let (_, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::Saas);
        let scope = ScopeRequest::for_user(2).with_workspace(20);

        resolver.set(&ctx, "captcha", "on", scope, true).await.unwrap();
        let settings = resolver.all(&ctx, scope).await.unwrap();
        assert!(!settings.contains_key("captcha"));

        let tenant_wide = resolver
            .all(&ctx, ScopeRequest::for_user(1))
            .await
            .unwrap();
        assert!(!tenant_wide.contains_key("captcha"));
    }

    #[tokio::test]
    async fn test_bootstrapping_returns_empty_without_storage() {
        let (store, resolver) = setup().await;
        let ctx = TenantContext::bootstrapping(TenantMode::Saas);

        let settings = resolver.all(&ctx, ScopeRequest::for_user(2)).await.unwrap();
        assert!(settings.is_empty());
        assert!(!resolver
            .set(&ctx, "k", "v", ScopeRequest::for_user(2), false)
            .await
            .unwrap());
        assert_eq!(store.settings_loads(), 0);
    }

    #[tokio::test]
    async fn test_default_language_backfill() {
        let (_, resolver) = setup().await;
        let mut member = user(3, UserRole::Member, Some(2), Some(21));
        member.lang = Some("fr".to_string());
        let ctx = TenantContext::authenticated(member, TenantMode::Saas);

        let settings = resolver.all(&ctx, ScopeRequest::inferred()).await.unwrap();
        assert_eq!(
            settings.get(keys::DEFAULT_LANGUAGE).map(String::as_str),
            Some("fr")
        );

        let anon = TenantContext::anonymous(TenantMode::Saas);
        let settings = resolver.all(&anon, ScopeRequest::inferred()).await.unwrap();
        assert_eq!(
            settings.get(keys::DEFAULT_LANGUAGE).map(String::as_str),
            Some("en")
        );
    }

    #[tokio::test]
    async fn test_stored_default_language_wins() {
        let (_, resolver) = setup().await;
        let mut company = user(2, UserRole::Company, Some(1), Some(20));
        company.lang = Some("de".to_string());
        let ctx = TenantContext::authenticated(company, TenantMode::Saas);

        resolver
            .set(&ctx, keys::DEFAULT_LANGUAGE, "es", ScopeRequest::inferred(), false)
            .await
            .unwrap();
        let settings = resolver.all(&ctx, ScopeRequest::inferred()).await.unwrap();
        assert_eq!(
            settings.get(keys::DEFAULT_LANGUAGE).map(String::as_str),
            Some("es")
        );
    }

    #[tokio::test]
    async fn test_reads_are_cached_and_writes_invalidate() {
        let (store, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::Saas);
        let scope = ScopeRequest::for_user(4).with_workspace(40);

        resolver.all(&ctx, scope).await.unwrap();
        resolver.all(&ctx, scope).await.unwrap();
        assert_eq!(store.settings_loads(), 1);

        resolver.set(&ctx, "k", "v2", scope, false).await.unwrap();
        let settings = resolver.all(&ctx, scope).await.unwrap();
        assert_eq!(settings.get("k").map(String::as_str), Some("v2"));
        assert_eq!(store.settings_loads(), 2);
    }

    #[tokio::test]
    async fn test_payment_settings_fall_back_to_super_admin() {
        let (_, resolver) = setup().await;
        let ctx = TenantContext::anonymous(TenantMode::Saas);

        resolver
            .set_payment_many(
                &ctx,
                &[("stripe_key", "pk_admin")],
                ScopeRequest::for_user(1),
                true,
            )
            .await
            .unwrap();

        let company = resolver
            .payment_settings(&ctx, ScopeRequest::for_user(2))
            .await
            .unwrap();
        assert_eq!(company.get("stripe_key").map(String::as_str), Some("pk_admin"));

        resolver
            .set_payment_many(&ctx, &[("stripe_key", "pk_own")], ScopeRequest::for_user(2), false)
            .await
            .unwrap();
        let company = resolver
            .payment_settings(&ctx, ScopeRequest::for_user(2))
            .await
            .unwrap();
        assert_eq!(company.get("stripe_key").map(String::as_str), Some("pk_own"));
    }

    #[tokio::test]
    async fn test_no_accounts_resolves_to_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = SettingsResolver::new(store.clone(), store.clone());
        let ctx = TenantContext::anonymous(TenantMode::SingleTenant);

        assert!(resolver
            .resolve_scope(&ctx, ScopeRequest::inferred())
            .await
            .unwrap()
            .is_none());
        assert!(resolver.all(&ctx, ScopeRequest::inferred()).await.unwrap().is_empty());
    }

    struct FailOnKey {
        inner: Arc<InMemoryStore>,
        key: &'static str,
    }

    #[async_trait::async_trait]
    impl SettingsStore for FailOnKey {
        async fn load(
            &self,
            kind: SettingsKind,
            user_id: i64,
            workspace_id: Option<i64>,
        ) -> Result<SettingsMap, crate::error::StoreError> {
            self.inner.load(kind, user_id, workspace_id).await
        }

        async fn upsert(
            &self,
            kind: SettingsKind,
            user_id: i64,
            workspace_id: Option<i64>,
            key: &str,
            value: &str,
        ) -> Result<(), crate::error::StoreError> {
            if key == self.key {
                return Err(crate::error::StoreError::Database("disk full".to_string()));
            }
            self.inner.upsert(kind, user_id, workspace_id, key, value).await
        }
    }

    #[tokio::test]
    async fn test_partial_write_failure_still_invalidates_cache() {
        let (store, _) = setup().await;
        let failing = Arc::new(FailOnKey {
            inner: store.clone(),
            key: "b",
        });
        let resolver = SettingsResolver::new(store.clone(), failing);
        let ctx = TenantContext::anonymous(TenantMode::Saas);
        let scope = ScopeRequest::for_user(4).with_workspace(40);

        resolver.set(&ctx, "a", "old", scope, false).await.unwrap();
        assert_eq!(resolver.get(&ctx, "a", "", scope).await.unwrap(), "old");

        let result = resolver
            .set_many(&ctx, &[("a", "new"), ("b", "x")], scope, false)
            .await;
        assert!(result.is_err());

        assert_eq!(resolver.get(&ctx, "a", "", scope).await.unwrap(), "new");
    }
}
