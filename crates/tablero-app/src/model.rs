// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserGrade {
    Normal,
    Vip,
    Admin,
}

impl UserGrade {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Vip => "vip",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "vip" => Some(Self::Vip),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardKind {
    Notice,
    Faq,
    Event,
    Free,
}

impl BoardKind {
    pub const ALL: [Self; 4] = [Self::Notice, Self::Faq, Self::Event, Self::Free];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Faq => "faq",
            Self::Event => "event",
            Self::Free => "free",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "notice" => Some(Self::Notice),
            "faq" => Some(Self::Faq),
            "event" => Some(Self::Event),
            "free" => Some(Self::Free),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Canceled => "canceled",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paid" => Some(Self::Paid),
            "canceled" => Some(Self::Canceled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    Earn,
    Spend,
}

impl PointKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "earn" => Some(Self::Earn),
            "spend" => Some(Self::Spend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

// Which timestamp a period filter ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateField {
    Created,
    Expired,
}

impl DateField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKind {
    Users,
    Companies,
    Posts,
    Comments,
    Payments,
    Points,
    ShopItems,
    Addresses,
    Settings,
}

impl ScreenKind {
    pub const ALL: [Self; 9] = [
        Self::Users,
        Self::Companies,
        Self::Posts,
        Self::Comments,
        Self::Payments,
        Self::Points,
        Self::ShopItems,
        Self::Addresses,
        Self::Settings,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Companies => "companies",
            Self::Posts => "boards",
            Self::Comments => "comments",
            Self::Payments => "payments",
            Self::Points => "points",
            Self::ShopItems => "shop",
            Self::Addresses => "addresses",
            Self::Settings => "settings",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Companies => "companies",
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Payments => "payments",
            Self::Points => "points",
            Self::ShopItems => "shop_items",
            Self::Addresses => "addresses",
            Self::Settings => "settings",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "users" => Some(Self::Users),
            "companies" => Some(Self::Companies),
            "posts" => Some(Self::Posts),
            "comments" => Some(Self::Comments),
            "payments" => Some(Self::Payments),
            "points" => Some(Self::Points),
            "shop_items" => Some(Self::ShopItems),
            "addresses" => Some(Self::Addresses),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    SiteTitle,
    SignupOpen,
    PointExpiryDays,
}

impl SettingKey {
    pub const ALL: [Self; 3] = [Self::SiteTitle, Self::SignupOpen, Self::PointExpiryDays];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SiteTitle => "site.title",
            Self::SignupOpen => "signup.open",
            Self::PointExpiryDays => "point.expiry_days",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "site.title" => Some(Self::SiteTitle),
            "signup.open" => Some(Self::SignupOpen),
            "point.expiry_days" => Some(Self::PointExpiryDays),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SiteTitle => "site title",
            Self::SignupOpen => "signup open",
            Self::PointExpiryDays => "point expiry days",
        }
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::SiteTitle => SettingValueKind::Text,
            Self::SignupOpen => SettingValueKind::Bool,
            Self::PointExpiryDays => SettingValueKind::Int,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValueKind {
    Bool,
    Int,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(Self::Bool(true)),
                "0" | "false" | "off" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            SettingValueKind::Int => raw.trim().parse().ok().map(Self::Int),
            SettingValueKind::Text => Some(Self::Text(raw.to_owned())),
        }
    }

    pub fn to_storage(&self, key: SettingKey) -> Option<String> {
        match (key.expected_value_kind(), self) {
            (SettingValueKind::Bool, Self::Bool(value)) => {
                Some(if *value { "true" } else { "false" }.to_owned())
            }
            (SettingValueKind::Int, Self::Int(value)) => Some(value.to_string()),
            (SettingValueKind::Text, Self::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "on".to_owned(),
            Self::Bool(false) => "off".to_owned(),
            Self::Int(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: SettingKey,
    pub value: SettingValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: UserUid,
    pub idx: i64,
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub grade: UserGrade,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub uid: CompanyUid,
    pub idx: i64,
    pub name: String,
    pub business_no: String,
    pub ceo_name: String,
    pub phone: String,
    pub city: String,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub uid: PostUid,
    pub idx: i64,
    pub board: BoardKind,
    pub user_uid: UserUid,
    pub title: String,
    pub body: String,
    pub view_count: i64,
    pub is_visible: bool,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub uid: CommentUid,
    pub idx: i64,
    pub post_uid: PostUid,
    pub user_uid: UserUid,
    pub body: String,
    pub is_visible: bool,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub uid: PaymentUid,
    pub idx: i64,
    pub user_uid: UserUid,
    pub order_no: String,
    pub amount_cents: i64,
    pub card_name: String,
    pub card_last4: String,
    pub status: PaymentStatus,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub paid_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEntry {
    pub uid: PointEntryUid,
    pub idx: i64,
    pub user_uid: UserUid,
    pub kind: PointKind,
    pub amount: i64,
    pub reason: String,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub uid: ShopItemUid,
    pub idx: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    pub sort_order: i64,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOption {
    pub uid: ItemOptionUid,
    pub idx: i64,
    pub item_uid: ShopItemUid,
    pub name: String,
    pub extra_cents: i64,
    pub sort_order: i64,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub uid: AddressUid,
    pub idx: i64,
    pub user_uid: UserUid,
    pub label: String,
    pub recipient: String,
    pub postal_code: String,
    pub line1: String,
    pub line2: String,
    pub is_default: bool,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub uid: AttachmentUid,
    pub idx: i64,
    pub owner_uid: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub stored_path: String,
    pub is_use: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// Inline single-field patches applied from a list row without opening the
// edit form (the `list_update` action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlinePatch {
    PostVisible(bool),
    CommentVisible(bool),
    UserGrade(UserGrade),
    PaymentStatus(PaymentStatus),
    ItemPrice(i64),
    ItemStock(i64),
}

impl InlinePatch {
    pub const fn applies_to(&self) -> ScreenKind {
        match self {
            Self::PostVisible(_) => ScreenKind::Posts,
            Self::CommentVisible(_) => ScreenKind::Comments,
            Self::UserGrade(_) => ScreenKind::Users,
            Self::PaymentStatus(_) => ScreenKind::Payments,
            Self::ItemPrice(_) | Self::ItemStock(_) => ScreenKind::ShopItems,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMove {
    Up,
    Down,
}

// Admin identity handed to the UI explicitly instead of through an
// ambient context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub admin_name: String,
    pub grade: UserGrade,
}

impl Session {
    pub fn new(admin_name: impl Into<String>, grade: UserGrade) -> Self {
        Self {
            admin_name: admin_name.into(),
            grade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BoardKind, PaymentStatus, ScreenKind, SettingKey, SettingValue, SortDirection, UserGrade,
    };

    #[test]
    fn enum_string_round_trips() {
        for kind in BoardKind::ALL {
            assert_eq!(BoardKind::parse(kind.as_str()), Some(kind));
        }
        for screen in ScreenKind::ALL {
            assert_eq!(ScreenKind::parse(screen.as_str()), Some(screen));
        }
        assert_eq!(UserGrade::parse("vip"), Some(UserGrade::Vip));
        assert_eq!(PaymentStatus::parse("refunded"), Some(PaymentStatus::Refunded));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(BoardKind::parse("unknown"), None);
    }

    #[test]
    fn bool_setting_parse_and_storage_round_trip() {
        let parsed = SettingValue::parse_for_key(SettingKey::SignupOpen, "true")
            .expect("parse bool setting");
        assert_eq!(parsed, SettingValue::Bool(true));
        assert_eq!(
            parsed.to_storage(SettingKey::SignupOpen),
            Some("true".to_owned())
        );
    }

    #[test]
    fn int_setting_rejects_non_numeric_input() {
        assert!(SettingValue::parse_for_key(SettingKey::PointExpiryDays, "soon").is_none());
        let parsed = SettingValue::parse_for_key(SettingKey::PointExpiryDays, "365")
            .expect("parse int setting");
        assert_eq!(parsed, SettingValue::Int(365));
    }

    #[test]
    fn mismatched_setting_value_type_rejected() {
        let text = SettingValue::Text("hello".to_owned());
        assert!(text.to_storage(SettingKey::SignupOpen).is_none());
    }
}
