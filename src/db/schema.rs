//! Database schema and migrations.
//!
//! Migrations run in order; `schema_version` records how many have been
//! applied.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users and sessions
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,                -- UUID v4
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,                   -- Argon2 hash
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE sessions (
    id          TEXT PRIMARY KEY,                -- opaque cookie token
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at  INTEGER NOT NULL,                -- unix seconds
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_sessions_user ON sessions(user_id);
"#,
    // v2: organisations, memberships and invites
    r#"
CREATE TABLE organisations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    creator_id  TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE org_members (
    org_id      INTEGER NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role        TEXT NOT NULL DEFAULT 'viewer',  -- 'editor', 'viewer'
    joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (org_id, user_id)
);

CREATE INDEX idx_org_members_user ON org_members(user_id);

CREATE TABLE org_invites (
    org_id      INTEGER NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    invited_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (org_id, user_id)
);

CREATE INDEX idx_org_invites_user ON org_invites(user_id);
"#,
    // v3: folder and file hierarchy
    r#"
CREATE TABLE folders (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id            INTEGER NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    uploader_id       TEXT REFERENCES users(id) ON DELETE SET NULL,
    name              TEXT NOT NULL,
    parent_folder_id  INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    created_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Root-level rows have a NULL parent; IFNULL makes them collide too.
CREATE UNIQUE INDEX idx_folders_sibling_name
    ON folders(org_id, IFNULL(parent_folder_id, 0), name);
CREATE INDEX idx_folders_parent ON folders(parent_folder_id);

CREATE TABLE files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id       INTEGER NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    uploader_id  TEXT REFERENCES users(id) ON DELETE SET NULL,
    folder_id    INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    file_type    TEXT NOT NULL,                  -- extension including the dot
    size         INTEGER NOT NULL DEFAULT 0,
    uploaded_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_files_sibling_name
    ON files(org_id, IFNULL(folder_id, 0), name);
CREATE INDEX idx_files_folder ON files(folder_id);
"#,
    // v4: notifications
    r#"
CREATE TABLE notifications (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    org_id        INTEGER NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    actor_id      TEXT REFERENCES users(id) ON DELETE SET NULL,
    kind          TEXT NOT NULL,
    message       TEXT NOT NULL,
    payload_id    TEXT NOT NULL,
    payload_name  TEXT NOT NULL,
    is_read       INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_notifications_user ON notifications(user_id, is_read);
"#,
];
