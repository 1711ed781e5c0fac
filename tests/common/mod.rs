#![allow(dead_code)]

use chrono::NaiveDate;
use tempfile::TempDir;

use quartermaster::audit::MemoryAudit;
use quartermaster::authz::Principal;
use quartermaster::store::{SqliteStore, Store};
use quartermaster::types::{Asset, Label, NewAsset, NewUser, RoleName, Scope, User};

/// A per-test database plus an in-memory audit sink. The temp dir is
/// held so the database file outlives the store.
pub struct TestEnv {
    pub store: SqliteStore,
    pub audit: MemoryAudit,
    _dir: TempDir,
}

pub fn env() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("quartermaster.db")).unwrap();
    store.initialize().unwrap();
    TestEnv {
        store,
        audit: MemoryAudit::new(),
        _dir: dir,
    }
}

impl TestEnv {
    pub fn label(&self, name: &str) -> Label {
        self.store.create_label(name).unwrap()
    }

    pub fn user(&self, name: &str) -> User {
        self.store
            .create_user(&NewUser {
                name: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "hash".to_string(),
                password_salt: "salt".to_string(),
            })
            .unwrap()
    }

    pub fn user_with_labels(&self, name: &str, labels: &[&Label]) -> User {
        let user = self.user(name);
        for label in labels {
            self.store.add_user_label(user.id, label.id).unwrap();
        }
        user
    }

    pub fn asset(&self, tag: &str) -> Asset {
        self.store
            .create_asset(&NewAsset {
                tag: tag.to_string(),
                name: format!("Asset {tag}"),
                description: "integration fixture".to_string(),
                purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                purchase_cost: 1200.0,
                maintenance_rate_days: 90,
            })
            .unwrap()
    }

    pub fn asset_with_labels(&self, tag: &str, labels: &[&Label]) -> Asset {
        let asset = self.asset(tag);
        for label in labels {
            self.store.add_asset_label(asset.id, label.id).unwrap();
        }
        asset
    }

    pub fn grant(&self, user: &User, role: RoleName, scope: &str) {
        self.store
            .create_role(user.id, role, &Scope::parse(scope))
            .unwrap();
    }

    pub fn principal(&self, user: &User) -> Principal {
        Principal::load(&self.store, user.id).unwrap()
    }

    /// A user holding every role under the wildcard scope.
    pub fn admin(&self, name: &str) -> Principal {
        let user = self.user(name);
        for role in RoleName::ALL {
            self.grant(&user, role, "*");
        }
        self.principal(&user)
    }
}
