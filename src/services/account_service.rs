//! 账户服务：账户的增删改查，所有单条操作都经过归属检查

use crate::{
    auth::{gateway::Identity, ownership::ensure_access},
    error::AppError,
    models::account::*,
    repository::AccountStore,
};
use std::sync::Arc;
use validator::Validate;

pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// 列出当前用户自己的账户（超级用户也只看到自己的）
    pub async fn list(
        &self,
        identity: &Identity,
        query: &AccountQuery,
    ) -> Result<AccountListResponse, AppError> {
        let filter = AccountFilter::for_owner(identity.id(), query);

        let total = self.accounts.count(&filter).await?;
        let accounts = self.accounts.list(&filter).await?;

        Ok(AccountListResponse {
            accounts: accounts.into_iter().map(AccountResponse::from).collect(),
            total,
            skip: filter.skip,
            limit: filter.limit,
        })
    }

    pub async fn create(
        &self,
        identity: &Identity,
        req: CreateAccountRequest,
    ) -> Result<Account, AppError> {
        req.validate()?;
        self.ensure_name_available(identity.id(), &req.name, None).await?;

        let account = self.accounts.create(identity.id(), &req).await?;
        tracing::info!(user_id = identity.id(), account_id = account.id, "Account created");
        Ok(account)
    }

    /// 获取单个账户；不存在或不属于当前用户都返回 NotFound
    pub async fn get(&self, identity: &Identity, id: i64) -> Result<Account, AppError> {
        let account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Account"))?;

        ensure_access(identity, account)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        req: UpdateAccountRequest,
    ) -> Result<Account, AppError> {
        req.validate()?;
        let account = self.get(identity, id).await?;

        // 更新后仍为有效账户时，名称不能与其他有效账户重复
        let name = req.name.as_deref().unwrap_or(&account.name);
        let renamed = name != account.name;
        let reactivated = req.is_active == Some(true) && !account.is_active;
        let stays_active = req.is_active.unwrap_or(account.is_active);
        if stays_active && (renamed || reactivated) {
            self.ensure_name_available(account.user_id, name, Some(account.id))
                .await?;
        }

        let updated = self
            .accounts
            .update(account.id, &req)
            .await?
            .ok_or_else(|| AppError::not_found("Account"))?;

        tracing::info!(user_id = identity.id(), account_id = id, "Account updated");
        Ok(updated)
    }

    /// 重新启用已软删除的账户
    pub async fn activate(&self, identity: &Identity, id: i64) -> Result<Account, AppError> {
        let req = UpdateAccountRequest {
            is_active: Some(true),
            ..Default::default()
        };
        self.update(identity, id, req).await
    }

    /// 软删除
    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        let account = self.get(identity, id).await?;

        if !self.accounts.deactivate(account.id).await? {
            return Err(AppError::not_found("Account"));
        }

        tracing::info!(user_id = identity.id(), account_id = id, "Account deactivated");
        Ok(())
    }

    pub fn account_types() -> Vec<AccountTypeInfo> {
        AccountType::ALL
            .iter()
            .map(|t| AccountTypeInfo {
                value: t.as_str(),
                label: t.label(),
            })
            .collect()
    }

    async fn ensure_name_available(
        &self,
        owner_id: i64,
        name: &str,
        except: Option<i64>,
    ) -> Result<(), AppError> {
        match self.accounts.find_active_by_name(owner_id, name).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::validation(format!(
                "Account with name '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::{NewUser, User},
        repository::{MemoryStore, UserStore},
    };

    async fn identity(store: &MemoryStore, email: &str, superuser: bool) -> Identity {
        let user: User = UserStore::create(
            store,
            &NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            },
        )
        .await
        .unwrap();
        store.set_superuser(user.id, superuser);
        Identity::new(UserStore::find_by_id(store, user.id).await.unwrap().unwrap())
    }

    fn create_request(name: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            name: name.to_string(),
            account_type: AccountType::Checking,
            bank_name: Some("ACME Bank".to_string()),
            account_number: Some("1234567890".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_ownership_matrix() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let owner = identity(&store, "owner@x.com", false).await;
        let other = identity(&store, "other@x.com", false).await;
        let admin = identity(&store, "admin@x.com", true).await;

        let account = service.create(&owner, create_request("Main")).await.unwrap();

        assert_eq!(service.get(&owner, account.id).await.unwrap().id, account.id);
        assert_eq!(service.get(&admin, account.id).await.unwrap().id, account.id);
        assert!(matches!(
            service.get(&other, account.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.update(&other, account.id, UpdateAccountRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(&other, account.id).await,
            Err(AppError::NotFound(_))
        ));

        service.delete(&admin, account.id).await.unwrap();
        assert!(!service.get(&owner, account.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_duplicate_active_name_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let owner = identity(&store, "owner@x.com", false).await;
        let other = identity(&store, "other@x.com", false).await;

        let first = service.create(&owner, create_request("Main")).await.unwrap();
        let err = service.create(&owner, create_request("Main")).await.unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref msg) if msg == "Account with name 'Main' already exists")
        );

        // other users may reuse the name
        service.create(&other, create_request("Main")).await.unwrap();

        // after soft delete the name is free again
        service.delete(&owner, first.id).await.unwrap();
        service.create(&owner, create_request("Main")).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_checks_duplicates_but_allows_same_name() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let owner = identity(&store, "owner@x.com", false).await;

        let main = service.create(&owner, create_request("Main")).await.unwrap();
        service.create(&owner, create_request("Savings")).await.unwrap();

        let same = UpdateAccountRequest {
            name: Some("Main".to_string()),
            ..Default::default()
        };
        service.update(&owner, main.id, same).await.unwrap();

        let clash = UpdateAccountRequest {
            name: Some("Savings".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&owner, main.id, clash).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reactivation_checks_duplicate_names() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let owner = identity(&store, "owner@x.com", false).await;

        let old = service.create(&owner, create_request("Main")).await.unwrap();
        service.delete(&owner, old.id).await.unwrap();
        let replacement = service.create(&owner, create_request("Main")).await.unwrap();

        let reactivate = UpdateAccountRequest {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&owner, old.id, reactivate).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.activate(&owner, old.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(!service.get(&owner, old.id).await.unwrap().is_active);

        // renaming while reactivating resolves the clash
        let renamed = UpdateAccountRequest {
            name: Some("Main (old)".to_string()),
            is_active: Some(true),
            ..Default::default()
        };
        let restored = service.update(&owner, old.id, renamed).await.unwrap();
        assert!(restored.is_active);

        // once the replacement is gone the plain activation succeeds
        service.delete(&owner, replacement.id).await.unwrap();
        assert!(service.activate(&owner, replacement.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_list_scoped_to_caller() {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let owner = identity(&store, "owner@x.com", false).await;
        let admin = identity(&store, "admin@x.com", true).await;

        service.create(&owner, create_request("A")).await.unwrap();
        service.create(&owner, create_request("B")).await.unwrap();

        let mine = service.list(&owner, &AccountQuery::default()).await.unwrap();
        assert_eq!(mine.total, 2);
        assert_eq!(mine.accounts.len(), 2);

        let admins = service.list(&admin, &AccountQuery::default()).await.unwrap();
        assert_eq!(admins.total, 0);
    }

    #[test]
    fn test_account_types_catalogue() {
        let types = AccountService::account_types();
        assert_eq!(types.len(), 5);
        assert_eq!(types[0].value, "checking");
        assert_eq!(types[4].label, "Line of Credit");
    }
}
