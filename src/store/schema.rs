pub const SCHEMA: &str = r#"
-- Labels are the unit of authorization scoping; a flat namespace of
-- opaque names (hierarchy conventions like 'department:HR' live in the
-- name itself)
CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Users are soft-deleted only; credentials are opaque to this schema
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    password_salt TEXT NOT NULL,
    disabled INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    must_reset_password INTEGER NOT NULL DEFAULT 1
);

-- Role grants: (role, scope) pairs per user. scope is a label name or
-- '*'. Deliberately no uniqueness constraint: duplicate grants create
-- duplicate rows
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    role TEXT NOT NULL,
    scope TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_roles_user_role ON roles(user_id, role);

CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Available'
        CHECK (status IN ('Available', 'In Use', 'Maintenance', 'Reserved')),
    purchase_date TEXT NOT NULL,
    purchase_cost REAL NOT NULL,
    created_at TEXT NOT NULL,
    last_maintenance TEXT NOT NULL,
    maintenance_rate_days INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

-- Many-to-many label mappings, one table per labelable entity
CREATE TABLE IF NOT EXISTS asset_labels (
    asset_id INTEGER NOT NULL REFERENCES assets(id),
    label_id INTEGER NOT NULL REFERENCES labels(id),
    PRIMARY KEY (asset_id, label_id)
);

CREATE TABLE IF NOT EXISTS user_labels (
    user_id INTEGER NOT NULL REFERENCES users(id),
    label_id INTEGER NOT NULL REFERENCES labels(id),
    PRIMARY KEY (user_id, label_id)
);

-- Directed edges between assets; the inverse view is derived by query
CREATE TABLE IF NOT EXISTS asset_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id INTEGER NOT NULL REFERENCES assets(id),
    linked_id INTEGER NOT NULL REFERENCES assets(id),
    relation TEXT NOT NULL
        CHECK (relation IN ('License', 'Consumable', 'Peripheral'))
);

CREATE INDEX IF NOT EXISTS idx_asset_links_asset ON asset_links(asset_id);

-- Borrow requests
CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    asset_id INTEGER NOT NULL REFERENCES assets(id),
    status TEXT NOT NULL DEFAULT 'Pending'
        CHECK (status IN ('Pending', 'Approved', 'Rejected', 'Fulfilled')),
    justification TEXT NOT NULL,
    requested_at TEXT NOT NULL,
    approved_by INTEGER REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_requests_user ON requests(user_id);

-- Checkout records; returned_at IS NULL marks the active assignment.
-- The at-most-one-active-per-asset invariant is enforced by the
-- lifecycle transitions, not by a constraint here
CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id INTEGER NOT NULL REFERENCES assets(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    assigned_by_id INTEGER NOT NULL REFERENCES users(id),
    assigned_at TEXT NOT NULL,
    due_date TEXT NOT NULL,
    returned_at TEXT,
    request_id INTEGER REFERENCES requests(id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_asset ON assignments(asset_id);
CREATE INDEX IF NOT EXISTS idx_assignments_user ON assignments(user_id);
"#;
