// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tablero_app::{
    Address, AddressFormInput, AddressUid, AppSetting, Attachment, AttachmentUid,
    AttachmentUpload, BoardKind, Comment, CommentFormInput, CommentUid, Company,
    CompanyFormInput, CompanyUid, DateField, InlinePatch, ItemOption, Payment, PaymentStatus,
    PaymentUid, PointEntry, PointEntryFormInput, PointEntryUid, PointKind, Post, PostFormInput,
    PostUid, ScreenKind, SettingKey, SettingValue, ShopItem, ShopItemFormInput, ShopItemUid,
    SortDirection, SortMove, User, UserFormInput, UserGrade, UserUid,
};
use tablero_sync::{ListQuery, PageData, allowed_sort_keys, default_sort_key};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

pub const APP_NAME: &str = "tablero";
pub const MAX_UPLOAD_SIZE: i64 = 20 << 20;

const USER_COLUMNS: &str = "id, uid, login_id, name, email, phone, grade, is_use, created_at";
const COMPANY_COLUMNS: &str = "id, uid, name, business_no, ceo_name, phone, city, is_use, created_at";
const POST_COLUMNS: &str =
    "id, uid, board, user_uid, title, body, view_count, is_visible, is_use, created_at, expired_at";
const COMMENT_COLUMNS: &str = "id, uid, post_uid, user_uid, body, is_visible, is_use, created_at";
const PAYMENT_COLUMNS: &str =
    "id, uid, user_uid, order_no, amount_cents, card_name, card_last4, status, is_use, paid_at, created_at";
const POINT_COLUMNS: &str =
    "id, uid, user_uid, kind, amount, reason, is_use, created_at, expired_at";
const SHOP_ITEM_COLUMNS: &str =
    "id, uid, name, price_cents, stock, sort_order, is_use, created_at";
const ITEM_OPTION_COLUMNS: &str =
    "id, uid, item_uid, name, extra_cents, sort_order, is_use, created_at";
const ADDRESS_COLUMNS: &str =
    "id, uid, user_uid, label, recipient, postal_code, line1, line2, is_default, is_use, created_at";
const ATTACHMENT_COLUMNS: &str =
    "id, uid, owner_uid, file_name, mime_type, size_bytes, sha256, stored_path, is_use, created_at";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "users",
        &["id", "uid", "login_id", "name", "grade", "is_use", "created_at"],
    ),
    (
        "companies",
        &["id", "uid", "name", "business_no", "is_use", "created_at"],
    ),
    (
        "posts",
        &[
            "id",
            "uid",
            "board",
            "user_uid",
            "title",
            "view_count",
            "is_visible",
            "is_use",
            "created_at",
            "expired_at",
        ],
    ),
    (
        "comments",
        &["id", "uid", "post_uid", "user_uid", "body", "is_visible", "is_use", "created_at"],
    ),
    (
        "payments",
        &[
            "id",
            "uid",
            "user_uid",
            "order_no",
            "amount_cents",
            "status",
            "is_use",
            "paid_at",
            "created_at",
        ],
    ),
    (
        "points",
        &["id", "uid", "user_uid", "kind", "amount", "is_use", "created_at", "expired_at"],
    ),
    (
        "shop_items",
        &["id", "uid", "name", "price_cents", "stock", "sort_order", "is_use", "created_at"],
    ),
    (
        "item_options",
        &["id", "uid", "item_uid", "name", "extra_cents", "sort_order", "is_use", "created_at"],
    ),
    (
        "addresses",
        &[
            "id",
            "uid",
            "user_uid",
            "recipient",
            "postal_code",
            "line1",
            "is_default",
            "is_use",
            "created_at",
        ],
    ),
    (
        "attachments",
        &[
            "id",
            "uid",
            "owner_uid",
            "file_name",
            "mime_type",
            "size_bytes",
            "sha256",
            "stored_path",
            "data",
            "is_use",
            "created_at",
        ],
    ),
    ("settings", &["key", "value", "updated_at"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_users_login_id",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_login_id ON users (login_id);",
    },
    RequiredIndex {
        name: "idx_users_is_use",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_users_is_use ON users (is_use);",
    },
    RequiredIndex {
        name: "idx_companies_is_use",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_companies_is_use ON companies (is_use);",
    },
    RequiredIndex {
        name: "idx_posts_board",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_posts_board ON posts (board);",
    },
    RequiredIndex {
        name: "idx_posts_user_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_posts_user_uid ON posts (user_uid);",
    },
    RequiredIndex {
        name: "idx_posts_is_use",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_posts_is_use ON posts (is_use);",
    },
    RequiredIndex {
        name: "idx_comments_post_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_comments_post_uid ON comments (post_uid);",
    },
    RequiredIndex {
        name: "idx_comments_is_use",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_comments_is_use ON comments (is_use);",
    },
    RequiredIndex {
        name: "idx_payments_user_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_payments_user_uid ON payments (user_uid);",
    },
    RequiredIndex {
        name: "idx_payments_status",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_payments_status ON payments (status);",
    },
    RequiredIndex {
        name: "idx_points_user_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_points_user_uid ON points (user_uid);",
    },
    RequiredIndex {
        name: "idx_shop_items_sort_order",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_shop_items_sort_order ON shop_items (sort_order);",
    },
    RequiredIndex {
        name: "idx_item_options_item_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_item_options_item_uid ON item_options (item_uid);",
    },
    RequiredIndex {
        name: "idx_addresses_user_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_addresses_user_uid ON addresses (user_uid);",
    },
    RequiredIndex {
        name: "idx_attachments_owner_uid",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_attachments_owner_uid ON attachments (owner_uid);",
    },
];

// Payments arrive from the gateway, not from a create form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub uid: PaymentUid,
    pub user_uid: UserUid,
    pub order_no: String,
    pub amount_cents: i64,
    pub card_name: String,
    pub card_last4: String,
    pub status: PaymentStatus,
    pub paid_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
struct Conditions {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl Conditions {
    fn new() -> Self {
        Self::default()
    }

    fn raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_owned());
    }

    fn eq_text(&mut self, column: &str, value: &str) {
        self.clauses.push(format!("{column} = ?"));
        self.args.push(Value::Text(value.to_owned()));
    }

    fn eq_flag(&mut self, column: &str, value: bool) {
        self.clauses.push(format!("{column} = ?"));
        self.args.push(Value::Integer(i64::from(value)));
    }

    fn like_any(&mut self, columns: &[&str], needle: &str) {
        let pattern = format!("%{needle}%");
        let mut parts = Vec::with_capacity(columns.len());
        for column in columns {
            parts.push(format!("{column} LIKE ?"));
            self.args.push(Value::Text(pattern.clone()));
        }
        self.clauses.push(format!("({})", parts.join(" OR ")));
    }

    fn date_range(
        &mut self,
        column: &str,
        start: Option<time::Date>,
        end: Option<time::Date>,
    ) {
        if let Some(start) = start {
            self.clauses.push(format!("date({column}) >= date(?)"));
            self.args
                .push(Value::Text(tablero_sync::format_date(start)));
        }
        if let Some(end) = end {
            self.clauses.push(format!("date({column}) <= date(?)"));
            self.args.push(Value::Text(tablero_sync::format_date(end)));
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

pub struct Store {
    conn: Connection,
    max_upload_size: i64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_upload_size: MAX_UPLOAD_SIZE,
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_upload_size: MAX_UPLOAD_SIZE,
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        self.seed_defaults()?;
        Ok(())
    }

    pub fn seed_defaults(&self) -> Result<()> {
        let now = now_rfc3339()?;
        for key in SettingKey::ALL {
            let value = default_setting_value(key);
            let storage = value
                .to_storage(key)
                .ok_or_else(|| anyhow!("default for {} has the wrong kind", key.as_str()))?;
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![key.as_str(), storage, now],
                )
                .with_context(|| format!("insert default setting {}", key.as_str()))?;
        }
        Ok(())
    }

    pub fn set_max_upload_size(&mut self, value: i64) -> Result<()> {
        if value <= 0 {
            bail!("max upload size must be positive, got {value}");
        }
        self.max_upload_size = value;
        Ok(())
    }

    pub fn max_upload_size(&self) -> i64 {
        self.max_upload_size
    }

    // --- users ---

    pub fn list_users(&self, query: &ListQuery) -> Result<PageData<User>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["login_id", "name", "email"], &filter.q);
        }
        if let Some(grade) = filter.extra.get("grade") {
            cond.eq_text("grade", grade);
        }
        cond.date_range("created_at", filter.start_date, filter.end_date);
        self.page_query(ScreenKind::Users, "users", USER_COLUMNS, &base, &cond, query, map_user)
    }

    pub fn get_user(&self, uid: &UserUid) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_user)
            .optional()
            .context("query user")?
            .ok_or_else(|| anyhow!("user {uid} not found"))
    }

    pub fn create_user(&self, form: &UserFormInput) -> Result<UserUid> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO users (uid, login_id, name, email, phone, grade, is_use, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
                ",
                params![
                    form.uid.as_str(),
                    form.login_id,
                    form.name,
                    form.email,
                    form.phone,
                    form.grade.as_str(),
                    now
                ],
            )
            .with_context(|| format!("insert user {}", form.login_id))?;
        Ok(form.uid.clone())
    }

    pub fn update_user(&self, uid: &UserUid, form: &UserFormInput) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE users
                SET login_id = ?1, name = ?2, email = ?3, phone = ?4, grade = ?5
                WHERE uid = ?6
                ",
                params![
                    form.login_id,
                    form.name,
                    form.email,
                    form.phone,
                    form.grade.as_str(),
                    uid.as_str()
                ],
            )
            .context("update user")?;
        if updated == 0 {
            bail!("user {uid} not found");
        }
        Ok(())
    }

    // --- companies ---

    pub fn list_companies(&self, query: &ListQuery) -> Result<PageData<Company>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["name", "business_no", "ceo_name"], &filter.q);
        }
        if let Some(city) = filter.extra.get("city") {
            cond.eq_text("city", city);
        }
        cond.date_range("created_at", filter.start_date, filter.end_date);
        self.page_query(
            ScreenKind::Companies,
            "companies",
            COMPANY_COLUMNS,
            &base,
            &cond,
            query,
            map_company,
        )
    }

    pub fn get_company(&self, uid: &CompanyUid) -> Result<Company> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_company)
            .optional()
            .context("query company")?
            .ok_or_else(|| anyhow!("company {uid} not found"))
    }

    pub fn create_company(&self, form: &CompanyFormInput) -> Result<CompanyUid> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO companies (uid, name, business_no, ceo_name, phone, city, is_use, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
                ",
                params![
                    form.uid.as_str(),
                    form.name,
                    form.business_no,
                    form.ceo_name,
                    form.phone,
                    form.city,
                    now
                ],
            )
            .with_context(|| format!("insert company {}", form.name))?;
        Ok(form.uid.clone())
    }

    pub fn update_company(&self, uid: &CompanyUid, form: &CompanyFormInput) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE companies
                SET name = ?1, business_no = ?2, ceo_name = ?3, phone = ?4, city = ?5
                WHERE uid = ?6
                ",
                params![
                    form.name,
                    form.business_no,
                    form.ceo_name,
                    form.phone,
                    form.city,
                    uid.as_str()
                ],
            )
            .context("update company")?;
        if updated == 0 {
            bail!("company {uid} not found");
        }
        Ok(())
    }

    // --- posts ---

    pub fn list_posts(&self, query: &ListQuery) -> Result<PageData<Post>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["title", "body"], &filter.q);
        }
        if let Some(board) = filter.extra.get("board") {
            cond.eq_text("board", board);
        }
        if let Some(user_uid) = filter.extra.get("user_uid") {
            cond.eq_text("user_uid", user_uid);
        }
        if let Some(visible) = filter.extra.get("visible") {
            cond.eq_flag("is_visible", visible == "1" || visible == "true");
        }
        let date_column = match filter.date_field {
            DateField::Created => "created_at",
            DateField::Expired => "expired_at",
        };
        cond.date_range(date_column, filter.start_date, filter.end_date);
        self.page_query(ScreenKind::Posts, "posts", POST_COLUMNS, &base, &cond, query, map_post)
    }

    pub fn get_post(&self, uid: &PostUid) -> Result<Post> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_post)
            .optional()
            .context("query post")?
            .ok_or_else(|| anyhow!("post {uid} not found"))
    }

    pub fn create_post(&self, form: &PostFormInput) -> Result<PostUid> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO posts (uid, board, user_uid, title, body, view_count, is_visible, is_use, created_at, expired_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 1, ?7, ?8)
                ",
                params![
                    form.uid.as_str(),
                    form.board.as_str(),
                    form.user_uid.as_str(),
                    form.title,
                    form.body,
                    i64::from(form.is_visible),
                    now,
                    form.expired_at.map(format_timestamp).transpose()?
                ],
            )
            .with_context(|| format!("insert post {}", form.title))?;
        Ok(form.uid.clone())
    }

    pub fn update_post(&self, uid: &PostUid, form: &PostFormInput) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE posts
                SET board = ?1, user_uid = ?2, title = ?3, body = ?4, is_visible = ?5, expired_at = ?6
                WHERE uid = ?7
                ",
                params![
                    form.board.as_str(),
                    form.user_uid.as_str(),
                    form.title,
                    form.body,
                    i64::from(form.is_visible),
                    form.expired_at.map(format_timestamp).transpose()?,
                    uid.as_str()
                ],
            )
            .context("update post")?;
        if updated == 0 {
            bail!("post {uid} not found");
        }
        Ok(())
    }

    // --- comments ---

    pub fn list_comments(&self, query: &ListQuery) -> Result<PageData<Comment>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["body"], &filter.q);
        }
        if let Some(post_uid) = filter.extra.get("post_uid") {
            cond.eq_text("post_uid", post_uid);
        }
        if let Some(user_uid) = filter.extra.get("user_uid") {
            cond.eq_text("user_uid", user_uid);
        }
        if let Some(visible) = filter.extra.get("visible") {
            cond.eq_flag("is_visible", visible == "1" || visible == "true");
        }
        cond.date_range("created_at", filter.start_date, filter.end_date);
        self.page_query(
            ScreenKind::Comments,
            "comments",
            COMMENT_COLUMNS,
            &base,
            &cond,
            query,
            map_comment,
        )
    }

    pub fn get_comment(&self, uid: &CommentUid) -> Result<Comment> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_comment)
            .optional()
            .context("query comment")?
            .ok_or_else(|| anyhow!("comment {uid} not found"))
    }

    pub fn create_comment(&self, form: &CommentFormInput) -> Result<CommentUid> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO comments (uid, post_uid, user_uid, body, is_visible, is_use, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
                ",
                params![
                    form.uid.as_str(),
                    form.post_uid.as_str(),
                    form.user_uid.as_str(),
                    form.body,
                    i64::from(form.is_visible),
                    now
                ],
            )
            .context("insert comment")?;
        Ok(form.uid.clone())
    }

    pub fn update_comment(&self, uid: &CommentUid, form: &CommentFormInput) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE comments
                SET post_uid = ?1, user_uid = ?2, body = ?3, is_visible = ?4
                WHERE uid = ?5
                ",
                params![
                    form.post_uid.as_str(),
                    form.user_uid.as_str(),
                    form.body,
                    i64::from(form.is_visible),
                    uid.as_str()
                ],
            )
            .context("update comment")?;
        if updated == 0 {
            bail!("comment {uid} not found");
        }
        Ok(())
    }

    // --- payments ---

    pub fn list_payments(&self, query: &ListQuery) -> Result<PageData<Payment>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["order_no", "card_name"], &filter.q);
        }
        if let Some(status) = filter.extra.get("status") {
            cond.eq_text("status", status);
        }
        if let Some(user_uid) = filter.extra.get("user_uid") {
            cond.eq_text("user_uid", user_uid);
        }
        // Period filters on payments range over the settlement date.
        cond.date_range("paid_at", filter.start_date, filter.end_date);
        self.page_query(
            ScreenKind::Payments,
            "payments",
            PAYMENT_COLUMNS,
            &base,
            &cond,
            query,
            map_payment,
        )
    }

    pub fn get_payment(&self, uid: &PaymentUid) -> Result<Payment> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_payment)
            .optional()
            .context("query payment")?
            .ok_or_else(|| anyhow!("payment {uid} not found"))
    }

    pub fn create_payment(&self, payment: &NewPayment) -> Result<PaymentUid> {
        if payment.amount_cents <= 0 {
            bail!("payment amount must be positive");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO payments (uid, user_uid, order_no, amount_cents, card_name, card_last4, status, is_use, paid_at, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
                ",
                params![
                    payment.uid.as_str(),
                    payment.user_uid.as_str(),
                    payment.order_no,
                    payment.amount_cents,
                    payment.card_name,
                    payment.card_last4,
                    payment.status.as_str(),
                    format_timestamp(payment.paid_at)?,
                    now
                ],
            )
            .with_context(|| format!("insert payment {}", payment.order_no))?;
        Ok(payment.uid.clone())
    }

    // --- points ---

    pub fn list_points(&self, query: &ListQuery) -> Result<PageData<PointEntry>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["reason"], &filter.q);
        }
        if let Some(kind) = filter.extra.get("kind") {
            cond.eq_text("kind", kind);
        }
        if let Some(user_uid) = filter.extra.get("user_uid") {
            cond.eq_text("user_uid", user_uid);
        }
        let date_column = match filter.date_field {
            DateField::Created => "created_at",
            DateField::Expired => "expired_at",
        };
        cond.date_range(date_column, filter.start_date, filter.end_date);
        self.page_query(ScreenKind::Points, "points", POINT_COLUMNS, &base, &cond, query, map_point)
    }

    pub fn get_point_entry(&self, uid: &PointEntryUid) -> Result<PointEntry> {
        let sql = format!("SELECT {POINT_COLUMNS} FROM points WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_point)
            .optional()
            .context("query point entry")?
            .ok_or_else(|| anyhow!("point entry {uid} not found"))
    }

    pub fn create_point_entry(&self, form: &PointEntryFormInput) -> Result<PointEntryUid> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO points (uid, user_uid, kind, amount, reason, is_use, created_at, expired_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
                ",
                params![
                    form.uid.as_str(),
                    form.user_uid.as_str(),
                    form.kind.as_str(),
                    form.amount,
                    form.reason,
                    now,
                    form.expired_at.map(format_timestamp).transpose()?
                ],
            )
            .context("insert point entry")?;
        Ok(form.uid.clone())
    }

    pub fn update_point_entry(&self, uid: &PointEntryUid, form: &PointEntryFormInput) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE points
                SET user_uid = ?1, kind = ?2, amount = ?3, reason = ?4, expired_at = ?5
                WHERE uid = ?6
                ",
                params![
                    form.user_uid.as_str(),
                    form.kind.as_str(),
                    form.amount,
                    form.reason,
                    form.expired_at.map(format_timestamp).transpose()?,
                    uid.as_str()
                ],
            )
            .context("update point entry")?;
        if updated == 0 {
            bail!("point entry {uid} not found");
        }
        Ok(())
    }

    // --- shop items ---

    pub fn list_shop_items(&self, query: &ListQuery) -> Result<PageData<ShopItem>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["name"], &filter.q);
        }
        cond.date_range("created_at", filter.start_date, filter.end_date);
        self.page_query(
            ScreenKind::ShopItems,
            "shop_items",
            SHOP_ITEM_COLUMNS,
            &base,
            &cond,
            query,
            map_shop_item,
        )
    }

    pub fn get_shop_item(&self, uid: &ShopItemUid) -> Result<ShopItem> {
        let sql = format!("SELECT {SHOP_ITEM_COLUMNS} FROM shop_items WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_shop_item)
            .optional()
            .context("query shop item")?
            .ok_or_else(|| anyhow!("shop item {uid} not found"))
    }

    pub fn create_shop_item(&self, form: &ShopItemFormInput) -> Result<ShopItemUid> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        let next_order: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM shop_items WHERE is_use = 1",
                [],
                |row| row.get(0),
            )
            .context("next sort order")?;
        let now = now_rfc3339()?;
        tx.execute(
            "
            INSERT INTO shop_items (uid, name, price_cents, stock, sort_order, is_use, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            ",
            params![
                form.uid.as_str(),
                form.name,
                form.price_cents,
                form.stock,
                next_order,
                now
            ],
        )
        .with_context(|| format!("insert shop item {}", form.name))?;
        insert_item_options(&tx, &form.uid, &form.options, &now)?;
        tx.commit().context("commit shop item insert")?;
        Ok(form.uid.clone())
    }

    pub fn update_shop_item(&self, uid: &ShopItemUid, form: &ShopItemFormInput) -> Result<()> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        let updated = tx
            .execute(
                "UPDATE shop_items SET name = ?1, price_cents = ?2, stock = ?3 WHERE uid = ?4",
                params![form.name, form.price_cents, form.stock, uid.as_str()],
            )
            .context("update shop item")?;
        if updated == 0 {
            bail!("shop item {uid} not found");
        }
        // Sub-form semantics: the submitted option rows replace the old
        // set wholesale.
        tx.execute(
            "DELETE FROM item_options WHERE item_uid = ?1",
            params![uid.as_str()],
        )
        .context("clear item options")?;
        let now = now_rfc3339()?;
        insert_item_options(&tx, uid, &form.options, &now)?;
        tx.commit().context("commit shop item update")?;
        Ok(())
    }

    pub fn list_item_options(&self, item_uid: &ShopItemUid) -> Result<Vec<ItemOption>> {
        let sql = format!(
            "SELECT {ITEM_OPTION_COLUMNS} FROM item_options WHERE item_uid = ?1 ORDER BY sort_order ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare item options query")?;
        let rows = stmt
            .query_map(params![item_uid.as_str()], map_item_option)
            .context("query item options")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect item options")
    }

    // The `list_sort` action: swap with the neighbor in the requested
    // direction. Returns false at the edge of the list.
    pub fn move_shop_item(&self, uid: &ShopItemUid, direction: SortMove) -> Result<bool> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        let current: Option<(i64, i64)> = tx
            .query_row(
                "SELECT id, sort_order FROM shop_items WHERE uid = ?1 AND is_use = 1",
                params![uid.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("query item order")?;
        let Some((item_id, item_order)) = current else {
            bail!("shop item {uid} not found");
        };

        let neighbor_sql = match direction {
            SortMove::Up => {
                "SELECT id, sort_order FROM shop_items WHERE is_use = 1 AND sort_order < ?1 ORDER BY sort_order DESC LIMIT 1"
            }
            SortMove::Down => {
                "SELECT id, sort_order FROM shop_items WHERE is_use = 1 AND sort_order > ?1 ORDER BY sort_order ASC LIMIT 1"
            }
        };
        let neighbor: Option<(i64, i64)> = tx
            .query_row(neighbor_sql, params![item_order], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()
            .context("query neighbor order")?;
        let Some((neighbor_id, neighbor_order)) = neighbor else {
            return Ok(false);
        };

        tx.execute(
            "UPDATE shop_items SET sort_order = ?1 WHERE id = ?2",
            params![neighbor_order, item_id],
        )
        .context("reorder item")?;
        tx.execute(
            "UPDATE shop_items SET sort_order = ?1 WHERE id = ?2",
            params![item_order, neighbor_id],
        )
        .context("reorder neighbor")?;
        tx.commit().context("commit reorder")?;
        debug!(uid = uid.as_str(), ?direction, "shop item reordered");
        Ok(true)
    }

    // Live sort_order values stay a dense 1..n sequence.
    pub fn reindex_shop_items(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        let ids: Vec<i64> = {
            let mut stmt = tx
                .prepare("SELECT id FROM shop_items WHERE is_use = 1 ORDER BY sort_order ASC, id ASC")
                .context("prepare reindex query")?;
            let rows = stmt
                .query_map([], |row| row.get(0))
                .context("query item ids")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("collect item ids")?
        };
        for (position, id) in ids.iter().enumerate() {
            tx.execute(
                "UPDATE shop_items SET sort_order = ?1 WHERE id = ?2",
                params![(position + 1) as i64, id],
            )
            .context("reassign sort order")?;
        }
        tx.commit().context("commit reindex")
    }

    // --- addresses ---

    pub fn list_addresses(&self, query: &ListQuery) -> Result<PageData<Address>> {
        let filter = &query.filter;
        let base = visibility_conditions(filter);
        let mut cond = base.clone();
        if !filter.q.is_empty() {
            cond.like_any(&["recipient", "line1", "postal_code"], &filter.q);
        }
        if let Some(user_uid) = filter.extra.get("user_uid") {
            cond.eq_text("user_uid", user_uid);
        }
        cond.date_range("created_at", filter.start_date, filter.end_date);
        self.page_query(
            ScreenKind::Addresses,
            "addresses",
            ADDRESS_COLUMNS,
            &base,
            &cond,
            query,
            map_address,
        )
    }

    pub fn get_address(&self, uid: &AddressUid) -> Result<Address> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_address)
            .optional()
            .context("query address")?
            .ok_or_else(|| anyhow!("address {uid} not found"))
    }

    pub fn create_address(&self, form: &AddressFormInput) -> Result<AddressUid> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        if form.is_default {
            clear_default_address(&tx, &form.user_uid, None)?;
        }
        let now = now_rfc3339()?;
        tx.execute(
            "
            INSERT INTO addresses (uid, user_uid, label, recipient, postal_code, line1, line2, is_default, is_use, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
            ",
            params![
                form.uid.as_str(),
                form.user_uid.as_str(),
                form.label,
                form.recipient,
                form.postal_code,
                form.line1,
                form.line2,
                i64::from(form.is_default),
                now
            ],
        )
        .context("insert address")?;
        tx.commit().context("commit address insert")?;
        Ok(form.uid.clone())
    }

    pub fn update_address(&self, uid: &AddressUid, form: &AddressFormInput) -> Result<()> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        if form.is_default {
            clear_default_address(&tx, &form.user_uid, Some(uid))?;
        }
        let updated = tx
            .execute(
                "
                UPDATE addresses
                SET user_uid = ?1, label = ?2, recipient = ?3, postal_code = ?4, line1 = ?5, line2 = ?6, is_default = ?7
                WHERE uid = ?8
                ",
                params![
                    form.user_uid.as_str(),
                    form.label,
                    form.recipient,
                    form.postal_code,
                    form.line1,
                    form.line2,
                    i64::from(form.is_default),
                    uid.as_str()
                ],
            )
            .context("update address")?;
        if updated == 0 {
            bail!("address {uid} not found");
        }
        tx.commit().context("commit address update")
    }

    // --- lifecycle (single and bulk delete/restore) ---

    pub fn delete_rows(&self, screen: ScreenKind, uids: &[String]) -> Result<usize> {
        let Some(table) = table_for(screen) else {
            bail!("{} rows cannot be deleted", screen.as_str());
        };
        let affected = self.set_use_flag(table, uids, false)?;
        if screen == ScreenKind::ShopItems {
            self.reindex_shop_items()?;
        }
        debug!(screen = screen.as_str(), affected, "rows soft-deleted");
        Ok(affected)
    }

    pub fn restore_rows(&self, screen: ScreenKind, uids: &[String]) -> Result<usize> {
        let Some(table) = table_for(screen) else {
            bail!("{} rows cannot be restored", screen.as_str());
        };
        let affected = self.set_use_flag(table, uids, true)?;
        if screen == ScreenKind::ShopItems {
            self.reindex_shop_items()?;
        }
        Ok(affected)
    }

    fn set_use_flag(&self, table: &str, uids: &[String], value: bool) -> Result<usize> {
        let tx = self.conn.unchecked_transaction().context("begin transaction")?;
        let sql = format!("UPDATE {table} SET is_use = ?1 WHERE uid = ?2 AND is_use = ?3");
        let mut affected = 0;
        for uid in uids {
            affected += tx
                .execute(&sql, params![i64::from(value), uid, i64::from(!value)])
                .with_context(|| format!("flip is_use for {uid}"))?;
        }
        tx.commit().context("commit lifecycle change")?;
        Ok(affected)
    }

    // The `list_update` action: one field patched straight from the list
    // row.
    pub fn apply_inline_patch(&self, uid: &str, patch: &InlinePatch) -> Result<()> {
        if let InlinePatch::ItemPrice(cents) = patch
            && *cents < 0
        {
            bail!("price cannot be negative");
        }
        if let InlinePatch::ItemStock(count) = patch
            && *count < 0
        {
            bail!("stock cannot be negative");
        }

        let affected = match patch {
            InlinePatch::PostVisible(value) => self.conn.execute(
                "UPDATE posts SET is_visible = ?1 WHERE uid = ?2",
                params![i64::from(*value), uid],
            ),
            InlinePatch::CommentVisible(value) => self.conn.execute(
                "UPDATE comments SET is_visible = ?1 WHERE uid = ?2",
                params![i64::from(*value), uid],
            ),
            InlinePatch::UserGrade(grade) => self.conn.execute(
                "UPDATE users SET grade = ?1 WHERE uid = ?2",
                params![grade.as_str(), uid],
            ),
            InlinePatch::PaymentStatus(status) => self.conn.execute(
                "UPDATE payments SET status = ?1 WHERE uid = ?2",
                params![status.as_str(), uid],
            ),
            InlinePatch::ItemPrice(cents) => self.conn.execute(
                "UPDATE shop_items SET price_cents = ?1 WHERE uid = ?2",
                params![*cents, uid],
            ),
            InlinePatch::ItemStock(count) => self.conn.execute(
                "UPDATE shop_items SET stock = ?1 WHERE uid = ?2",
                params![*count, uid],
            ),
        }
        .context("apply inline patch")?;
        if affected == 0 {
            bail!("no {} row with uid {uid}", patch.applies_to().as_str());
        }
        debug!(uid, screen = patch.applies_to().as_str(), "inline patch applied");
        Ok(())
    }

    // --- attachments ---

    pub fn insert_attachment(&self, upload: &AttachmentUpload) -> Result<Attachment> {
        let size = upload.data.len() as i64;
        if size > self.max_upload_size {
            bail!(
                "file {} is {size} bytes; the upload limit is {} bytes",
                upload.file_name,
                self.max_upload_size
            );
        }
        let checksum = checksum_sha256(&upload.data);
        let stored_path = format!("uploads/{}/{}", upload.owner_uid, upload.file_name);
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO attachments (uid, owner_uid, file_name, mime_type, size_bytes, sha256, stored_path, data, is_use, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
                ",
                params![
                    upload.uid.as_str(),
                    upload.owner_uid,
                    upload.file_name,
                    upload.mime_type,
                    size,
                    checksum,
                    stored_path,
                    upload.data,
                    now
                ],
            )
            .with_context(|| format!("insert attachment {}", upload.file_name))?;
        debug!(uid = upload.uid.as_str(), size, "attachment stored");
        self.get_attachment(&upload.uid)
    }

    pub fn get_attachment(&self, uid: &AttachmentUid) -> Result<Attachment> {
        let sql = format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE uid = ?1");
        self.conn
            .query_row(&sql, params![uid.as_str()], map_attachment)
            .optional()
            .context("query attachment")?
            .ok_or_else(|| anyhow!("attachment {uid} not found"))
    }

    pub fn list_attachments_for(&self, owner_uid: &str) -> Result<Vec<Attachment>> {
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE owner_uid = ?1 AND is_use = 1 ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare attachments query")?;
        let rows = stmt
            .query_map(params![owner_uid], map_attachment)
            .context("query attachments")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect attachments")
    }

    pub fn attachment_data(&self, uid: &AttachmentUid) -> Result<Vec<u8>> {
        self.conn
            .query_row(
                "SELECT data FROM attachments WHERE uid = ?1",
                params![uid.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("query attachment data")?
            .ok_or_else(|| anyhow!("attachment {uid} not found"))
    }

    pub fn delete_attachment(&self, uid: &AttachmentUid) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE attachments SET is_use = 0 WHERE uid = ?1 AND is_use = 1",
                params![uid.as_str()],
            )
            .context("delete attachment")?;
        if affected == 0 {
            bail!("attachment {uid} not found");
        }
        Ok(())
    }

    // Writes the blob to the local extraction cache, verifying the stored
    // checksum on the way out.
    pub fn extract_attachment(&self, uid: &AttachmentUid) -> Result<PathBuf> {
        let attachment = self.get_attachment(uid)?;
        let data = self.attachment_data(uid)?;
        if checksum_sha256(&data) != attachment.checksum_sha256 {
            bail!(
                "attachment {uid} failed its checksum; the stored blob is corrupt"
            );
        }
        let dir = upload_cache_dir()?;
        let target = dir.join(format!("{}-{}", uid.as_str(), attachment.file_name));
        fs::write(&target, &data)
            .with_context(|| format!("write attachment to {}", target.display()))?;
        set_private_permissions(&target)?;
        Ok(target)
    }

    // --- settings ---

    pub fn get_setting(&self, key: SettingKey) -> Result<Option<SettingValue>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("query setting")?;
        Ok(raw.and_then(|raw| SettingValue::parse_for_key(key, &raw)))
    }

    pub fn put_setting(&self, key: SettingKey, value: SettingValue) -> Result<()> {
        let storage = value
            .to_storage(key)
            .ok_or_else(|| anyhow!("setting {} rejects that value kind", key.as_str()))?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key.as_str(), storage, now],
            )
            .context("store setting")?;
        Ok(())
    }

    pub fn list_settings(&self) -> Result<Vec<AppSetting>> {
        let mut settings = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            let value = self
                .get_setting(key)?
                .unwrap_or_else(|| default_setting_value(key));
            settings.push(AppSetting { key, value });
        }
        Ok(settings)
    }

    // --- demo data ---

    pub fn seed_demo_data(&self) -> Result<()> {
        const DEMO_NAMES: [&str; 8] = [
            "Avery Walker",
            "Jordan Hill",
            "Taylor Evans",
            "Riley Gray",
            "Morgan Reed",
            "Casey Price",
            "Quinn Foster",
            "Parker Brooks",
        ];
        const DEMO_COMPANIES: [&str; 4] =
            ["Summit Trading", "Greenleaf Foods", "Apex Supply", "Heritage Labs"];
        const DEMO_TITLES: [&str; 6] = [
            "Welcome to the back office",
            "Maintenance window this weekend",
            "Updated refund policy",
            "Spring membership event",
            "Double points week",
            "New arrivals in the shop",
        ];
        const DEMO_ITEMS: [&str; 5] =
            ["Gift Box", "Ceramic Mug", "Canvas Tote", "Water Bottle", "Notebook Set"];
        const DEMO_CARDS: [&str; 4] = ["Shinhan", "Kookmin", "Hana", "Woori"];

        let mut user_uids = Vec::with_capacity(DEMO_NAMES.len());
        for (index, name) in DEMO_NAMES.iter().enumerate() {
            let login = name.to_lowercase().replace(' ', ".");
            let uid = self.create_user(&UserFormInput {
                uid: UserUid::generate(),
                login_id: format!("{login}{index}"),
                name: (*name).to_owned(),
                email: format!("{login}@example.com"),
                phone: format!("010-0000-{index:04}"),
                grade: match index % 5 {
                    0 => UserGrade::Vip,
                    4 => UserGrade::Admin,
                    _ => UserGrade::Normal,
                },
            })?;
            user_uids.push(uid);
        }

        for (index, name) in DEMO_COMPANIES.iter().enumerate() {
            self.create_company(&CompanyFormInput {
                uid: CompanyUid::generate(),
                name: (*name).to_owned(),
                business_no: format!("123-45-{index:05}"),
                ceo_name: DEMO_NAMES[index % DEMO_NAMES.len()].to_owned(),
                phone: format!("02-1234-{index:04}"),
                city: "Seoul".to_owned(),
            })?;
        }

        let mut post_uids = Vec::new();
        for (index, title) in DEMO_TITLES.iter().enumerate() {
            let board = BoardKind::ALL[index % BoardKind::ALL.len()];
            let uid = self.create_post(&PostFormInput {
                uid: PostUid::generate(),
                board,
                user_uid: user_uids[index % user_uids.len()].clone(),
                title: (*title).to_owned(),
                body: "Details inside.".to_owned(),
                is_visible: true,
                expired_at: (board == BoardKind::Event)
                    .then(|| OffsetDateTime::now_utc() + Duration::from_secs(30 * 24 * 60 * 60)),
            })?;
            post_uids.push(uid);
        }

        for index in 0..post_uids.len() * 3 {
            self.create_comment(&CommentFormInput {
                uid: CommentUid::generate(),
                post_uid: post_uids[index % post_uids.len()].clone(),
                user_uid: user_uids[index % user_uids.len()].clone(),
                body: "Thanks for the update.".to_owned(),
                is_visible: index % 7 != 0,
            })?;
        }

        for index in 0..20 {
            self.create_payment(&NewPayment {
                uid: PaymentUid::generate(),
                user_uid: user_uids[index % user_uids.len()].clone(),
                order_no: format!("ORD-{:06}", 100_000 + index),
                amount_cents: ((index as i64 % 9) + 1) * 1_500,
                card_name: DEMO_CARDS[index % DEMO_CARDS.len()].to_owned(),
                card_last4: format!("{:04}", 1_000 + index * 37 % 9_000),
                status: match index % 10 {
                    0 => PaymentStatus::Refunded,
                    1 => PaymentStatus::Canceled,
                    _ => PaymentStatus::Paid,
                },
                paid_at: OffsetDateTime::now_utc(),
            })?;
        }

        for index in 0..30 {
            self.create_point_entry(&PointEntryFormInput {
                uid: PointEntryUid::generate(),
                user_uid: user_uids[index % user_uids.len()].clone(),
                kind: if index % 3 == 0 {
                    PointKind::Spend
                } else {
                    PointKind::Earn
                },
                amount: ((index as i64 % 12) + 1) * 100,
                reason: "order reward".to_owned(),
                expired_at: None,
            })?;
        }

        for (index, name) in DEMO_ITEMS.iter().enumerate() {
            self.create_shop_item(&ShopItemFormInput {
                uid: ShopItemUid::generate(),
                name: (*name).to_owned(),
                price_cents: ((index as i64) + 1) * 2_500,
                stock: 50 + (index as i64) * 10,
                options: vec![
                    tablero_app::ItemOptionFormInput {
                        uid: tablero_app::ItemOptionUid::generate(),
                        name: "Small".to_owned(),
                        extra_cents: 0,
                    },
                    tablero_app::ItemOptionFormInput {
                        uid: tablero_app::ItemOptionUid::generate(),
                        name: "Large".to_owned(),
                        extra_cents: 500,
                    },
                ],
            })?;
        }

        for (index, user_uid) in user_uids.iter().enumerate() {
            self.create_address(&AddressFormInput {
                uid: AddressUid::generate(),
                user_uid: user_uid.clone(),
                label: "home".to_owned(),
                recipient: DEMO_NAMES[index % DEMO_NAMES.len()].to_owned(),
                postal_code: format!("{:05}", 10_000 + index),
                line1: format!("{} Cedar St", 100 + index),
                line2: String::new(),
                is_default: true,
            })?;
        }

        Ok(())
    }

    // --- shared plumbing ---

    fn page_query<T>(
        &self,
        screen: ScreenKind,
        table: &str,
        columns: &str,
        base: &Conditions,
        cond: &Conditions,
        query: &ListQuery,
        map_row: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<PageData<T>> {
        let filter = &query.filter;
        let total_all = self.count_rows(table, base)?;
        let total_filtered = self.count_rows(table, cond)?;

        let sort_key = if allowed_sort_keys(screen).contains(&filter.sort_by.as_str()) {
            filter.sort_by.as_str()
        } else {
            default_sort_key(screen)
        };
        let dir = match filter.order {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {columns} FROM {table} {} ORDER BY {sort_key} {dir}, id {dir} LIMIT ? OFFSET ?",
            cond.where_sql()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("prepare {table} page query"))?;
        let mut args = cond.args.clone();
        args.push(Value::Integer(filter.limit as i64));
        args.push(Value::Integer(query.offset as i64));
        let rows = stmt
            .query_map(params_from_iter(args.iter()), map_row)
            .with_context(|| format!("query {table} page"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect {table} rows"))?;
        Ok(PageData {
            rows,
            total_all,
            total_filtered,
        })
    }

    fn count_rows(&self, table: &str, cond: &Conditions) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table} {}", cond.where_sql());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(cond.args.iter()), |row| row.get(0))
            .with_context(|| format!("count {table} rows"))?;
        Ok(count.max(0) as u64)
    }
}

// Unless the filter opts into disabled rows, every list and both counts
// see live rows only.
fn visibility_conditions(filter: &tablero_sync::FilterState) -> Conditions {
    let mut base = Conditions::new();
    let include_disabled = filter.extra.get("use").is_some_and(|value| value == "all");
    if !include_disabled {
        base.raw("is_use = 1");
    }
    base
}

const fn table_for(screen: ScreenKind) -> Option<&'static str> {
    match screen {
        ScreenKind::Users => Some("users"),
        ScreenKind::Companies => Some("companies"),
        ScreenKind::Posts => Some("posts"),
        ScreenKind::Comments => Some("comments"),
        ScreenKind::Payments => Some("payments"),
        ScreenKind::Points => Some("points"),
        ScreenKind::ShopItems => Some("shop_items"),
        ScreenKind::Addresses => Some("addresses"),
        ScreenKind::Settings => None,
    }
}

fn insert_item_options(
    tx: &rusqlite::Transaction<'_>,
    item_uid: &ShopItemUid,
    options: &[tablero_app::ItemOptionFormInput],
    now: &str,
) -> Result<()> {
    for (position, option) in options.iter().enumerate() {
        tx.execute(
            "
            INSERT INTO item_options (uid, item_uid, name, extra_cents, sort_order, is_use, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            ",
            params![
                option.uid.as_str(),
                item_uid.as_str(),
                option.name,
                option.extra_cents,
                (position + 1) as i64,
                now
            ],
        )
        .with_context(|| format!("insert item option {}", option.name))?;
    }
    Ok(())
}

// At most one default address per user.
fn clear_default_address(
    tx: &rusqlite::Transaction<'_>,
    user_uid: &UserUid,
    except: Option<&AddressUid>,
) -> Result<()> {
    match except {
        Some(keep) => tx.execute(
            "UPDATE addresses SET is_default = 0 WHERE user_uid = ?1 AND uid != ?2",
            params![user_uid.as_str(), keep.as_str()],
        ),
        None => tx.execute(
            "UPDATE addresses SET is_default = 0 WHERE user_uid = ?1",
            params![user_uid.as_str()],
        ),
    }
    .context("clear previous default address")?;
    Ok(())
}

fn default_setting_value(key: SettingKey) -> SettingValue {
    match key {
        SettingKey::SiteTitle => SettingValue::Text("tablero".to_owned()),
        SettingKey::SignupOpen => SettingValue::Bool(true),
        SettingKey::PointExpiryDays => SettingValue::Int(365),
    }
}

// --- row mapping ---

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let grade_raw: String = row.get(6)?;
    let created_raw: String = row.get(8)?;
    Ok(User {
        idx: row.get(0)?,
        uid: UserUid::new(row.get::<_, String>(1)?),
        login_id: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        grade: UserGrade::parse(&grade_raw).ok_or_else(|| bad_enum(6, &grade_raw))?,
        is_use: row.get::<_, i64>(7)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_company(row: &rusqlite::Row<'_>) -> rusqlite::Result<Company> {
    let created_raw: String = row.get(8)?;
    Ok(Company {
        idx: row.get(0)?,
        uid: CompanyUid::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        business_no: row.get(3)?,
        ceo_name: row.get(4)?,
        phone: row.get(5)?,
        city: row.get(6)?,
        is_use: row.get::<_, i64>(7)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let board_raw: String = row.get(2)?;
    let created_raw: String = row.get(9)?;
    let expired_raw: Option<String> = row.get(10)?;
    Ok(Post {
        idx: row.get(0)?,
        uid: PostUid::new(row.get::<_, String>(1)?),
        board: BoardKind::parse(&board_raw).ok_or_else(|| bad_enum(2, &board_raw))?,
        user_uid: UserUid::new(row.get::<_, String>(3)?),
        title: row.get(4)?,
        body: row.get(5)?,
        view_count: row.get(6)?,
        is_visible: row.get::<_, i64>(7)? != 0,
        is_use: row.get::<_, i64>(8)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
        expired_at: parse_opt_datetime(expired_raw).map_err(to_sql_error)?,
    })
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let created_raw: String = row.get(7)?;
    Ok(Comment {
        idx: row.get(0)?,
        uid: CommentUid::new(row.get::<_, String>(1)?),
        post_uid: PostUid::new(row.get::<_, String>(2)?),
        user_uid: UserUid::new(row.get::<_, String>(3)?),
        body: row.get(4)?,
        is_visible: row.get::<_, i64>(5)? != 0,
        is_use: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_payment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Payment> {
    let status_raw: String = row.get(7)?;
    let paid_raw: String = row.get(9)?;
    let created_raw: String = row.get(10)?;
    Ok(Payment {
        idx: row.get(0)?,
        uid: PaymentUid::new(row.get::<_, String>(1)?),
        user_uid: UserUid::new(row.get::<_, String>(2)?),
        order_no: row.get(3)?,
        amount_cents: row.get(4)?,
        card_name: row.get(5)?,
        card_last4: row.get(6)?,
        status: PaymentStatus::parse(&status_raw).ok_or_else(|| bad_enum(7, &status_raw))?,
        is_use: row.get::<_, i64>(8)? != 0,
        paid_at: parse_datetime(&paid_raw).map_err(to_sql_error)?,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_point(row: &rusqlite::Row<'_>) -> rusqlite::Result<PointEntry> {
    let kind_raw: String = row.get(3)?;
    let created_raw: String = row.get(7)?;
    let expired_raw: Option<String> = row.get(8)?;
    Ok(PointEntry {
        idx: row.get(0)?,
        uid: PointEntryUid::new(row.get::<_, String>(1)?),
        user_uid: UserUid::new(row.get::<_, String>(2)?),
        kind: PointKind::parse(&kind_raw).ok_or_else(|| bad_enum(3, &kind_raw))?,
        amount: row.get(4)?,
        reason: row.get(5)?,
        is_use: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
        expired_at: parse_opt_datetime(expired_raw).map_err(to_sql_error)?,
    })
}

fn map_shop_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShopItem> {
    let created_raw: String = row.get(7)?;
    Ok(ShopItem {
        idx: row.get(0)?,
        uid: ShopItemUid::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        price_cents: row.get(3)?,
        stock: row.get(4)?,
        sort_order: row.get(5)?,
        is_use: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_item_option(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemOption> {
    let created_raw: String = row.get(7)?;
    Ok(ItemOption {
        idx: row.get(0)?,
        uid: tablero_app::ItemOptionUid::new(row.get::<_, String>(1)?),
        item_uid: ShopItemUid::new(row.get::<_, String>(2)?),
        name: row.get(3)?,
        extra_cents: row.get(4)?,
        sort_order: row.get(5)?,
        is_use: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_address(row: &rusqlite::Row<'_>) -> rusqlite::Result<Address> {
    let created_raw: String = row.get(10)?;
    Ok(Address {
        idx: row.get(0)?,
        uid: AddressUid::new(row.get::<_, String>(1)?),
        user_uid: UserUid::new(row.get::<_, String>(2)?),
        label: row.get(3)?,
        recipient: row.get(4)?,
        postal_code: row.get(5)?,
        line1: row.get(6)?,
        line2: row.get(7)?,
        is_default: row.get::<_, i64>(8)? != 0,
        is_use: row.get::<_, i64>(9)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn map_attachment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attachment> {
    let created_raw: String = row.get(9)?;
    Ok(Attachment {
        idx: row.get(0)?,
        uid: AttachmentUid::new(row.get::<_, String>(1)?),
        owner_uid: row.get(2)?,
        file_name: row.get(3)?,
        mime_type: row.get(4)?,
        size_bytes: row.get(5)?,
        checksum_sha256: row.get(6)?,
        stored_path: row.get(7)?,
        is_use: row.get::<_, i64>(8)? != 0,
        created_at: parse_datetime(&created_raw).map_err(to_sql_error)?,
    })
}

fn bad_enum(index: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown stored value {raw:?}"),
        )),
    )
}

// --- paths and schema upkeep ---

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("TABLERO_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TABLERO_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("tablero.db"))
}

pub fn upload_cache_dir() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory; set XDG_CACHE_HOME or platform equivalent")
    })?;
    let dir = cache_root.join(APP_NAME).join("uploads");
    fs::create_dir_all(&dir)
        .with_context(|| format!("create cache directory {}", dir.display()))?;
    Ok(dir)
}

pub fn evict_stale_cache(dir: &Path, ttl_days: i64) -> Result<usize> {
    if ttl_days <= 0 {
        return Ok(0);
    }
    if !dir.exists() {
        return Ok(0);
    }

    let ttl_secs = u64::try_from(ttl_days)
        .ok()
        .and_then(|days| days.checked_mul(24 * 60 * 60))
        .ok_or_else(|| anyhow!("ttl_days is too large: {ttl_days}"))?;
    let ttl = Duration::from_secs(ttl_secs);
    let now = std::time::SystemTime::now();

    let mut removed = 0usize;
    for entry in fs::read_dir(dir).with_context(|| format!("read cache dir {}", dir.display()))? {
        let entry = entry?;
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if metadata.is_dir() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if let Ok(age) = now.duration_since(modified)
            && age > ttl
            && fs::remove_file(entry.path()).is_ok()
        {
            removed += 1;
        }
    }
    Ok(removed)
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!("database path {path:?} contains '?'; remove query parameters and use a plain file path");
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a tablero-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.iter().any(|have| have == column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .with_context(|| format!("check table {table}"))?;
    Ok(count > 0)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("pragma table_info for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("read columns for {table}"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("create index {}", index.name))?;
    }
    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

// --- time and checksum helpers ---

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

pub fn format_timestamp(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{checksum_sha256, parse_datetime, validate_db_path};

    #[test]
    fn db_path_validation_rejects_uris() {
        assert!(validate_db_path(":memory:").is_ok());
        assert!(validate_db_path("/tmp/tablero.db").is_ok());
        assert!(validate_db_path("https://example.com/tablero.db").is_err());
        assert!(validate_db_path("file:/tmp/tablero.db").is_err());
        assert!(validate_db_path("/tmp/tablero.db?mode=ro").is_err());
        assert!(validate_db_path("").is_err());
    }

    #[test]
    fn datetime_parser_accepts_rfc3339_and_space_separated() {
        assert!(parse_datetime("2026-01-09T10:30:00Z").is_ok());
        assert!(parse_datetime("2026-01-09 10:30:00").is_ok());
        assert!(parse_datetime("2026-01-09T10:30:00").is_ok());
        assert!(parse_datetime("not a timestamp").is_err());
    }

    #[test]
    fn checksum_is_lowercase_hex() {
        let digest = checksum_sha256(b"tablero");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(digest, checksum_sha256(b"tablero"));
    }
}
