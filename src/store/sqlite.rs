use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::Result;
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, mainly for tests and ephemeral use.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| {
        tracing::error!("Invalid date in database: '{}' - {}", s, e);
        Utc::now().date_naive()
    })
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conv_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

const USER_COLS: &str = "id, name, email, password_hash, password_salt, disabled, deleted, \
                         created_at, must_reset_password";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        password_salt: row.get(4)?,
        disabled: row.get(5)?,
        deleted: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        must_reset_password: row.get(8)?,
    })
}

const ASSET_COLS: &str = "id, tag, name, description, status, purchase_date, purchase_cost, \
                          created_at, last_maintenance, maintenance_rate_days, deleted";

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let status: String = row.get(4)?;
    Ok(Asset {
        id: row.get(0)?,
        tag: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: AssetStatus::parse(&status)
            .ok_or_else(|| conv_err(4, format!("invalid asset status: {status}")))?,
        purchase_date: parse_date(&row.get::<_, String>(5)?),
        purchase_cost: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        last_maintenance: parse_datetime(&row.get::<_, String>(8)?),
        maintenance_rate_days: row.get(9)?,
        deleted: row.get(10)?,
    })
}

fn role_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Role> {
    let role: String = row.get(2)?;
    Ok(Role {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: RoleName::parse(&role)
            .ok_or_else(|| conv_err(2, format!("unknown role name: {role}")))?,
        scope: Scope::parse(&row.get::<_, String>(3)?),
    })
}

fn link_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetLink> {
    let relation: String = row.get(3)?;
    Ok(AssetLink {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        linked_id: row.get(2)?,
        relation: LinkRelation::parse(&relation)
            .ok_or_else(|| conv_err(3, format!("invalid link relation: {relation}")))?,
    })
}

const ASSIGNMENT_COLS: &str =
    "id, asset_id, user_id, assigned_by_id, assigned_at, due_date, returned_at, request_id";

fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        user_id: row.get(2)?,
        assigned_by_id: row.get(3)?,
        assigned_at: parse_datetime(&row.get::<_, String>(4)?),
        due_date: parse_date(&row.get::<_, String>(5)?),
        returned_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
        request_id: row.get(7)?,
    })
}

const REQUEST_COLS: &str =
    "id, user_id, asset_id, status, justification, requested_at, approved_by";

fn request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Request> {
    let status: String = row.get(3)?;
    Ok(Request {
        id: row.get(0)?,
        user_id: row.get(1)?,
        asset_id: row.get(2)?,
        status: RequestStatus::parse(&status)
            .ok_or_else(|| conv_err(3, format!("invalid request status: {status}")))?,
        justification: row.get(4)?,
        requested_at: parse_datetime(&row.get::<_, String>(5)?),
        approved_by: row.get(6)?,
    })
}

/// Renders the label-visibility predicate for an entity: true when no
/// label attached to the entity falls outside the scope set. Entities
/// with no labels at all pass vacuously.
fn scope_predicate(mapping: &str, fk: &str, outer: &str, n: usize) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM {mapping} m WHERE m.{fk} = {outer} \
         AND m.label_id NOT IN ({}))",
        placeholders(n)
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Label operations

    fn create_label(&self, name: &str) -> Result<Label> {
        let conn = self.conn();
        conn.execute("INSERT INTO labels (name) VALUES (?1)", params![name])?;
        Ok(Label {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_label(&self, id: i64) -> Result<Option<Label>> {
        let conn = self.conn();
        let label = conn
            .query_row(
                "SELECT id, name FROM labels WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Label {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(label)
    }

    fn get_label_by_name(&self, name: &str) -> Result<Option<Label>> {
        let conn = self.conn();
        let label = conn
            .query_row(
                "SELECT id, name FROM labels WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Label {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(label)
    }

    fn list_labels(&self) -> Result<Vec<Label>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM labels ORDER BY name")?;
        let labels = stmt
            .query_map([], |row| {
                Ok(Label {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    fn delete_label(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM labels WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn label_ids_by_names(&self, names: &[String]) -> Result<Vec<i64>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let sql = format!(
            "SELECT id FROM labels WHERE name IN ({})",
            placeholders(names.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(
                params_from_iter(names.iter().map(|n| Value::from(n.clone()))),
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    fn label_has_relationships(&self, label_id: i64) -> Result<bool> {
        let attached = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM asset_labels WHERE label_id = ?1)
                 OR EXISTS (SELECT 1 FROM user_labels WHERE label_id = ?1)",
            params![label_id],
            |row| row.get(0),
        )?;
        Ok(attached)
    }

    // Label mapping operations

    fn add_asset_label(&self, asset_id: i64, label_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO asset_labels (asset_id, label_id) VALUES (?1, ?2)",
            params![asset_id, label_id],
        )?;
        Ok(())
    }

    fn remove_asset_label(&self, asset_id: i64, label_id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM asset_labels WHERE asset_id = ?1 AND label_id = ?2",
            params![asset_id, label_id],
        )?;
        Ok(changed > 0)
    }

    fn has_asset_label(&self, asset_id: i64, label_id: i64) -> Result<bool> {
        let present = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM asset_labels WHERE asset_id = ?1 AND label_id = ?2)",
            params![asset_id, label_id],
            |row| row.get(0),
        )?;
        Ok(present)
    }

    fn asset_labels(&self, asset_id: i64) -> Result<Vec<Label>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT l.id, l.name FROM labels l
             JOIN asset_labels al ON al.label_id = l.id
             WHERE al.asset_id = ?1 ORDER BY l.name",
        )?;
        let labels = stmt
            .query_map(params![asset_id], |row| {
                Ok(Label {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    fn add_user_label(&self, user_id: i64, label_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO user_labels (user_id, label_id) VALUES (?1, ?2)",
            params![user_id, label_id],
        )?;
        Ok(())
    }

    fn remove_user_label(&self, user_id: i64, label_id: i64) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM user_labels WHERE user_id = ?1 AND label_id = ?2",
            params![user_id, label_id],
        )?;
        Ok(changed > 0)
    }

    fn has_user_label(&self, user_id: i64, label_id: i64) -> Result<bool> {
        let present = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM user_labels WHERE user_id = ?1 AND label_id = ?2)",
            params![user_id, label_id],
            |row| row.get(0),
        )?;
        Ok(present)
    }

    fn user_labels(&self, user_id: i64) -> Result<Vec<Label>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT l.id, l.name FROM labels l
             JOIN user_labels ul ON ul.label_id = l.id
             WHERE ul.user_id = ?1 ORDER BY l.name",
        )?;
        let labels = stmt
            .query_map(params![user_id], |row| {
                Ok(Label {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (name, email, password_hash, password_salt, disabled, deleted,
                                created_at, must_reset_password)
             VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, 1)",
            params![
                user.name,
                user.email,
                user.password_hash,
                user.password_salt,
                format_datetime(&now),
            ],
        )?;
        Ok(User {
            id: conn.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            password_salt: user.password_salt.clone(),
            disabled: false,
            deleted: false,
            created_at: now,
            must_reset_password: true,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE name = ?1"),
                params![name],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self, scope: Option<&[i64]>, include_deleted: bool) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !include_deleted {
            clauses.push("deleted = 0".to_string());
        }
        if let Some(ids) = scope {
            clauses.push(scope_predicate(
                "user_labels",
                "user_id",
                "users.id",
                ids.len(),
            ));
            values.extend(ids.iter().map(|id| Value::from(*id)));
        }

        let mut sql = format!("SELECT {USER_COLS} FROM users");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(values), user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET name = ?1, email = ?2, password_hash = ?3, password_salt = ?4,
                              disabled = ?5, deleted = ?6, must_reset_password = ?7
             WHERE id = ?8",
            params![
                user.name,
                user.email,
                user.password_hash,
                user.password_salt,
                user.disabled,
                user.deleted,
                user.must_reset_password,
                user.id,
            ],
        )?;
        Ok(())
    }

    // Role grant operations

    fn create_role(&self, user_id: i64, role: RoleName, scope: &Scope) -> Result<Role> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO roles (user_id, role, scope) VALUES (?1, ?2, ?3)",
            params![user_id, role.as_str(), scope.as_str()],
        )?;
        Ok(Role {
            id: conn.last_insert_rowid(),
            user_id,
            role,
            scope: scope.clone(),
        })
    }

    fn get_role(&self, user_id: i64, role: RoleName, scope: &Scope) -> Result<Option<Role>> {
        let conn = self.conn();
        let grant = conn
            .query_row(
                "SELECT id, user_id, role, scope FROM roles
                 WHERE user_id = ?1 AND role = ?2 AND scope = ?3 LIMIT 1",
                params![user_id, role.as_str(), scope.as_str()],
                role_from_row,
            )
            .optional()?;
        Ok(grant)
    }

    fn delete_role(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM roles WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, user_id, role, scope FROM roles WHERE user_id = ?1 ORDER BY id")?;
        let roles = stmt
            .query_map(params![user_id], role_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    fn scopes_for_role(&self, user_id: i64, role: RoleName) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT DISTINCT scope FROM roles WHERE user_id = ?1 AND role = ?2")?;
        let scopes = stmt
            .query_map(params![user_id, role.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(scopes)
    }

    // Asset operations

    fn create_asset(&self, asset: &NewAsset) -> Result<Asset> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO assets (tag, name, description, status, purchase_date, purchase_cost,
                                 created_at, last_maintenance, maintenance_rate_days, deleted)
             VALUES (?1, ?2, ?3, 'Available', ?4, ?5, ?6, ?6, ?7, 0)",
            params![
                asset.tag,
                asset.name,
                asset.description,
                format_date(&asset.purchase_date),
                asset.purchase_cost,
                format_datetime(&now),
                asset.maintenance_rate_days,
            ],
        )?;
        Ok(Asset {
            id: conn.last_insert_rowid(),
            tag: asset.tag.clone(),
            name: asset.name.clone(),
            description: asset.description.clone(),
            status: AssetStatus::Available,
            purchase_date: asset.purchase_date,
            purchase_cost: asset.purchase_cost,
            created_at: now,
            last_maintenance: now,
            maintenance_rate_days: asset.maintenance_rate_days,
            deleted: false,
        })
    }

    fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        let conn = self.conn();
        let asset = conn
            .query_row(
                &format!("SELECT {ASSET_COLS} FROM assets WHERE id = ?1"),
                params![id],
                asset_from_row,
            )
            .optional()?;
        Ok(asset)
    }

    fn get_asset_by_tag(&self, tag: &str) -> Result<Option<Asset>> {
        let conn = self.conn();
        let asset = conn
            .query_row(
                &format!("SELECT {ASSET_COLS} FROM assets WHERE tag = ?1"),
                params![tag],
                asset_from_row,
            )
            .optional()?;
        Ok(asset)
    }

    fn list_assets(&self, scope: Option<&[i64]>, include_deleted: bool) -> Result<Vec<Asset>> {
        let conn = self.conn();
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !include_deleted {
            clauses.push("deleted = 0".to_string());
        }
        if let Some(ids) = scope {
            clauses.push(scope_predicate(
                "asset_labels",
                "asset_id",
                "assets.id",
                ids.len(),
            ));
            values.extend(ids.iter().map(|id| Value::from(*id)));
        }

        let mut sql = format!("SELECT {ASSET_COLS} FROM assets");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let assets = stmt
            .query_map(params_from_iter(values), asset_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn list_assets_by_status(
        &self,
        status: AssetStatus,
        scope: Option<&[i64]>,
    ) -> Result<Vec<Asset>> {
        let conn = self.conn();
        let mut clauses = vec!["status = ?".to_string(), "deleted = 0".to_string()];
        let mut values: Vec<Value> = vec![Value::from(status.as_str().to_string())];

        if let Some(ids) = scope {
            clauses.push(scope_predicate(
                "asset_labels",
                "asset_id",
                "assets.id",
                ids.len(),
            ));
            values.extend(ids.iter().map(|id| Value::from(*id)));
        }

        let sql = format!(
            "SELECT {ASSET_COLS} FROM assets WHERE {} ORDER BY id",
            clauses.join(" AND ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let assets = stmt
            .query_map(params_from_iter(values), asset_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn update_asset(&self, asset: &Asset) -> Result<()> {
        self.conn().execute(
            "UPDATE assets SET tag = ?1, name = ?2, description = ?3, status = ?4,
                               purchase_date = ?5, purchase_cost = ?6, last_maintenance = ?7,
                               maintenance_rate_days = ?8, deleted = ?9
             WHERE id = ?10",
            params![
                asset.tag,
                asset.name,
                asset.description,
                asset.status.as_str(),
                format_date(&asset.purchase_date),
                asset.purchase_cost,
                format_datetime(&asset.last_maintenance),
                asset.maintenance_rate_days,
                asset.deleted,
                asset.id,
            ],
        )?;
        Ok(())
    }

    fn transition_asset_status(
        &self,
        id: i64,
        from: AssetStatus,
        to: AssetStatus,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE assets SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id, from.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn set_asset_status(&self, id: i64, status: AssetStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE assets SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    fn complete_maintenance(&self, id: i64, finished_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE assets SET status = 'Available', last_maintenance = ?1
             WHERE id = ?2 AND status = 'Maintenance'",
            params![format_datetime(&finished_at), id],
        )?;
        Ok(changed > 0)
    }

    // Asset link operations

    fn create_link(
        &self,
        asset_id: i64,
        linked_id: i64,
        relation: LinkRelation,
    ) -> Result<AssetLink> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO asset_links (asset_id, linked_id, relation) VALUES (?1, ?2, ?3)",
            params![asset_id, linked_id, relation.as_str()],
        )?;
        Ok(AssetLink {
            id: conn.last_insert_rowid(),
            asset_id,
            linked_id,
            relation,
        })
    }

    fn get_link(&self, asset_id: i64, linked_id: i64) -> Result<Option<AssetLink>> {
        let conn = self.conn();
        let link = conn
            .query_row(
                "SELECT id, asset_id, linked_id, relation FROM asset_links
                 WHERE asset_id = ?1 AND linked_id = ?2 LIMIT 1",
                params![asset_id, linked_id],
                link_from_row,
            )
            .optional()?;
        Ok(link)
    }

    fn delete_link(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM asset_links WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn links_from_asset(&self, asset_id: i64) -> Result<Vec<AssetLink>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, asset_id, linked_id, relation FROM asset_links
             WHERE asset_id = ?1 ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![asset_id], link_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    fn links_to_asset(&self, asset_id: i64) -> Result<Vec<AssetLink>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, asset_id, linked_id, relation FROM asset_links
             WHERE linked_id = ?1 ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![asset_id], link_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    // Assignment operations

    fn create_assignment(&self, assignment: &NewAssignment) -> Result<Assignment> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO assignments (asset_id, user_id, assigned_by_id, assigned_at,
                                      due_date, returned_at, request_id)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
            params![
                assignment.asset_id,
                assignment.user_id,
                assignment.assigned_by_id,
                format_datetime(&now),
                format_date(&assignment.due_date),
                assignment.request_id,
            ],
        )?;
        Ok(Assignment {
            id: conn.last_insert_rowid(),
            asset_id: assignment.asset_id,
            user_id: assignment.user_id,
            assigned_by_id: assignment.assigned_by_id,
            assigned_at: now,
            due_date: assignment.due_date,
            returned_at: None,
            request_id: assignment.request_id,
        })
    }

    fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        let conn = self.conn();
        let assignment = conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLS} FROM assignments WHERE id = ?1"),
                params![id],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    fn active_assignment_for_asset(&self, asset_id: i64) -> Result<Option<Assignment>> {
        let conn = self.conn();
        let assignment = conn
            .query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLS} FROM assignments
                     WHERE asset_id = ?1 AND returned_at IS NULL LIMIT 1"
                ),
                params![asset_id],
                assignment_from_row,
            )
            .optional()?;
        Ok(assignment)
    }

    fn assignments_for_user(&self, user_id: i64) -> Result<Vec<Assignment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLS} FROM assignments
             WHERE user_id = ?1 OR assigned_by_id = ?1 ORDER BY id"
        ))?;
        let assignments = stmt
            .query_map(params![user_id], assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    fn assignments_due_within(&self, user_id: i64, due_in_days: i64) -> Result<Vec<Assignment>> {
        let cutoff = Utc::now().date_naive() + chrono::Days::new(due_in_days.max(0) as u64);
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLS} FROM assignments
             WHERE (user_id = ?1 OR assigned_by_id = ?1)
               AND returned_at IS NULL
               AND due_date <= ?2
             ORDER BY due_date"
        ))?;
        let assignments = stmt
            .query_map(params![user_id, format_date(&cutoff)], assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assignments)
    }

    fn mark_assignment_returned(&self, id: i64, returned_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE assignments SET returned_at = ?1 WHERE id = ?2 AND returned_at IS NULL",
            params![format_datetime(&returned_at), id],
        )?;
        Ok(changed > 0)
    }

    fn set_assignment_due_date(&self, id: i64, due_date: NaiveDate) -> Result<()> {
        self.conn().execute(
            "UPDATE assignments SET due_date = ?1 WHERE id = ?2",
            params![format_date(&due_date), id],
        )?;
        Ok(())
    }

    // Request operations

    fn create_request(&self, request: &NewRequest) -> Result<Request> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO requests (user_id, asset_id, status, justification, requested_at,
                                   approved_by)
             VALUES (?1, ?2, 'Pending', ?3, ?4, NULL)",
            params![
                request.user_id,
                request.asset_id,
                request.justification,
                format_datetime(&now),
            ],
        )?;
        Ok(Request {
            id: conn.last_insert_rowid(),
            user_id: request.user_id,
            asset_id: request.asset_id,
            status: RequestStatus::Pending,
            justification: request.justification.clone(),
            requested_at: now,
            approved_by: None,
        })
    }

    fn get_request(&self, id: i64) -> Result<Option<Request>> {
        let conn = self.conn();
        let request = conn
            .query_row(
                &format!("SELECT {REQUEST_COLS} FROM requests WHERE id = ?1"),
                params![id],
                request_from_row,
            )
            .optional()?;
        Ok(request)
    }

    fn list_requests(&self, scope: Option<&[i64]>) -> Result<Vec<Request>> {
        let conn = self.conn();
        let mut sql = format!("SELECT {REQUEST_COLS} FROM requests");
        let mut values: Vec<Value> = Vec::new();

        if let Some(ids) = scope {
            // Requests carry no labels of their own; the predicate runs
            // over the labels of the referenced asset.
            sql.push_str(&format!(
                " WHERE {}",
                scope_predicate("asset_labels", "asset_id", "requests.asset_id", ids.len())
            ));
            values.extend(ids.iter().map(|id| Value::from(*id)));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params_from_iter(values), request_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    fn requests_by_user(&self, user_id: i64) -> Result<Vec<Request>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUEST_COLS} FROM requests WHERE user_id = ?1 ORDER BY id"
        ))?;
        let requests = stmt
            .query_map(params![user_id], request_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    fn transition_request_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        approved_by: Option<i64>,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE requests SET status = ?1, approved_by = COALESCE(?2, approved_by)
             WHERE id = ?3 AND status = ?4",
            params![to.as_str(), approved_by, id, from.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn close(&self) -> Result<()> {
        self.conn().execute_batch("PRAGMA optimize")?;
        Ok(())
    }
}
