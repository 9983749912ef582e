// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::result::FieldErrors;
use crate::{
    AddressUid, AttachmentUid, BoardKind, CommentUid, CompanyUid, ItemOptionUid, PointEntryUid,
    PointKind, PostUid, ShopItemUid, UserGrade, UserUid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    User,
    Company,
    Post,
    Comment,
    PointEntry,
    ShopItem,
    Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFormInput {
    pub uid: UserUid,
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub grade: UserGrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFormInput {
    pub uid: CompanyUid,
    pub name: String,
    pub business_no: String,
    pub ceo_name: String,
    pub phone: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFormInput {
    pub uid: PostUid,
    pub board: BoardKind,
    pub user_uid: UserUid,
    pub title: String,
    pub body: String,
    pub is_visible: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFormInput {
    pub uid: CommentUid,
    pub post_uid: PostUid,
    pub user_uid: UserUid,
    pub body: String,
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointEntryFormInput {
    pub uid: PointEntryUid,
    pub user_uid: UserUid,
    pub kind: PointKind,
    pub amount: i64,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expired_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOptionFormInput {
    pub uid: ItemOptionUid,
    pub name: String,
    pub extra_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItemFormInput {
    pub uid: ShopItemUid,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    pub options: Vec<ItemOptionFormInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFormInput {
    pub uid: AddressUid,
    pub user_uid: UserUid,
    pub label: String,
    pub recipient: String,
    pub postal_code: String,
    pub line1: String,
    pub line2: String,
    pub is_default: bool,
}

// File uploads are validated before the record they belong to exists;
// `owner_uid` is the client-generated uid of that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub uid: AttachmentUid,
    pub owner_uid: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormPayload {
    User(UserFormInput),
    Company(CompanyFormInput),
    Post(PostFormInput),
    Comment(CommentFormInput),
    PointEntry(PointEntryFormInput),
    ShopItem(ShopItemFormInput),
    Address(AddressFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::User(_) => FormKind::User,
            Self::Company(_) => FormKind::Company,
            Self::Post(_) => FormKind::Post,
            Self::Comment(_) => FormKind::Comment,
            Self::PointEntry(_) => FormKind::PointEntry,
            Self::ShopItem(_) => FormKind::ShopItem,
            Self::Address(_) => FormKind::Address,
        }
    }

    pub fn uid(&self) -> &str {
        match self {
            Self::User(form) => form.uid.as_str(),
            Self::Company(form) => form.uid.as_str(),
            Self::Post(form) => form.uid.as_str(),
            Self::Comment(form) => form.uid.as_str(),
            Self::PointEntry(form) => form.uid.as_str(),
            Self::ShopItem(form) => form.uid.as_str(),
            Self::Address(form) => form.uid.as_str(),
        }
    }

    pub fn blank_for(kind: FormKind) -> Self {
        match kind {
            FormKind::User => Self::User(UserFormInput {
                uid: UserUid::generate(),
                login_id: String::new(),
                name: String::new(),
                email: String::new(),
                phone: String::new(),
                grade: UserGrade::Normal,
            }),
            FormKind::Company => Self::Company(CompanyFormInput {
                uid: CompanyUid::generate(),
                name: String::new(),
                business_no: String::new(),
                ceo_name: String::new(),
                phone: String::new(),
                city: String::new(),
            }),
            FormKind::Post => Self::Post(PostFormInput {
                uid: PostUid::generate(),
                board: BoardKind::Notice,
                user_uid: UserUid::new(""),
                title: String::new(),
                body: String::new(),
                is_visible: true,
                expired_at: None,
            }),
            FormKind::Comment => Self::Comment(CommentFormInput {
                uid: CommentUid::generate(),
                post_uid: PostUid::new(""),
                user_uid: UserUid::new(""),
                body: String::new(),
                is_visible: true,
            }),
            FormKind::PointEntry => Self::PointEntry(PointEntryFormInput {
                uid: PointEntryUid::generate(),
                user_uid: UserUid::new(""),
                kind: PointKind::Earn,
                amount: 0,
                reason: String::new(),
                expired_at: None,
            }),
            FormKind::ShopItem => Self::ShopItem(ShopItemFormInput {
                uid: ShopItemUid::generate(),
                name: String::new(),
                price_cents: 0,
                stock: 0,
                options: Vec::new(),
            }),
            FormKind::Address => Self::Address(AddressFormInput {
                uid: AddressUid::generate(),
                user_uid: UserUid::new(""),
                label: String::new(),
                recipient: String::new(),
                postal_code: String::new(),
                line1: String::new(),
                line2: String::new(),
                is_default: false,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        match self {
            Self::User(form) => form.validate(),
            Self::Company(form) => form.validate(),
            Self::Post(form) => form.validate(),
            Self::Comment(form) => form.validate(),
            Self::PointEntry(form) => form.validate(),
            Self::ShopItem(form) => form.validate(),
            Self::Address(form) => form.validate(),
        }
    }
}

impl UserFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.login_id.trim().is_empty() {
            errors.push("login_id", "login id is required");
        }
        if self.name.trim().is_empty() {
            errors.push("name", "name is required");
        }
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            errors.push("email", "email must contain @");
        }
        errors.into_result()
    }
}

impl CompanyFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "company name is required");
        }
        if self.business_no.trim().is_empty() {
            errors.push("business_no", "business number is required");
        }
        errors.into_result()
    }
}

impl PostFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.push("title", "title is required");
        }
        if self.user_uid.as_str().is_empty() {
            errors.push("user_uid", "writer is required");
        }
        if self.board == BoardKind::Event && self.expired_at.is_none() {
            errors.push("expired_at", "event posts need an end date");
        }
        errors.into_result()
    }
}

impl CommentFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.post_uid.as_str().is_empty() {
            errors.push("post_uid", "parent post is required");
        }
        if self.user_uid.as_str().is_empty() {
            errors.push("user_uid", "writer is required");
        }
        if self.body.trim().is_empty() {
            errors.push("body", "comment body is required");
        }
        errors.into_result()
    }
}

impl PointEntryFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.user_uid.as_str().is_empty() {
            errors.push("user_uid", "user is required");
        }
        if self.amount <= 0 {
            errors.push("amount", "point amount must be positive");
        }
        if self.reason.trim().is_empty() {
            errors.push("reason", "reason is required");
        }
        errors.into_result()
    }
}

impl ShopItemFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "item name is required");
        }
        if self.price_cents < 0 {
            errors.push("price_cents", "price cannot be negative");
        }
        if self.stock < 0 {
            errors.push("stock", "stock cannot be negative");
        }
        for option in &self.options {
            if option.name.trim().is_empty() {
                errors.push("options", "every option needs a name");
                break;
            }
        }
        if self.options.iter().any(|option| option.extra_cents < 0) {
            errors.push("options", "option surcharges cannot be negative");
        }
        errors.into_result()
    }
}

impl AddressFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.user_uid.as_str().is_empty() {
            errors.push("user_uid", "user is required");
        }
        if self.recipient.trim().is_empty() {
            errors.push("recipient", "recipient is required");
        }
        if self.postal_code.trim().is_empty() {
            errors.push("postal_code", "postal code is required");
        }
        if self.line1.trim().is_empty() {
            errors.push("line1", "address line is required");
        }
        errors.into_result()
    }
}

impl AttachmentUpload {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.owner_uid.trim().is_empty() {
            errors.push("owner_uid", "owner record is required");
        }
        if self.file_name.trim().is_empty() {
            errors.push("file_name", "file name is required");
        }
        if self.mime_type.trim().is_empty() {
            errors.push("mime_type", "MIME type is required");
        }
        if self.data.is_empty() {
            errors.push("data", "file content is empty");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AttachmentUpload, FormKind, FormPayload, ItemOptionFormInput, PointEntryFormInput,
        PostFormInput,
    };
    use crate::{AttachmentUid, BoardKind, ItemOptionUid, PointEntryUid, PointKind, PostUid, UserUid};
    use time::macros::datetime;

    #[test]
    fn blank_payload_generates_a_uid_up_front() {
        let payload = FormPayload::blank_for(FormKind::Post);
        assert!(!payload.uid().is_empty());

        let second = FormPayload::blank_for(FormKind::Post);
        assert_ne!(payload.uid(), second.uid());
    }

    #[test]
    fn post_validation_collects_every_field_error() {
        let form = PostFormInput {
            uid: PostUid::generate(),
            board: BoardKind::Event,
            user_uid: UserUid::new(""),
            title: String::new(),
            body: String::new(),
            is_visible: true,
            expired_at: None,
        };
        let errors = form.validate().expect_err("invalid post should fail");
        assert_eq!(errors.len(), 3);
        assert!(errors.message_for("title").is_some());
        assert!(errors.message_for("user_uid").is_some());
        assert!(errors.message_for("expired_at").is_some());
    }

    #[test]
    fn event_post_with_end_date_passes() {
        let form = PostFormInput {
            uid: PostUid::generate(),
            board: BoardKind::Event,
            user_uid: UserUid::new("u-1"),
            title: "Spring sale".to_owned(),
            body: String::new(),
            is_visible: true,
            expired_at: Some(datetime!(2026-03-31 0:00 UTC)),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn point_entry_rejects_non_positive_amount() {
        let form = PointEntryFormInput {
            uid: PointEntryUid::generate(),
            user_uid: UserUid::new("u-1"),
            kind: PointKind::Earn,
            amount: 0,
            reason: "signup bonus".to_owned(),
            expired_at: None,
        };
        let errors = form.validate().expect_err("zero amount should fail");
        assert!(errors.message_for("amount").is_some());
    }

    #[test]
    fn shop_item_rejects_unnamed_option() {
        let mut payload = match FormPayload::blank_for(FormKind::ShopItem) {
            FormPayload::ShopItem(form) => form,
            other => panic!("unexpected payload {other:?}"),
        };
        payload.name = "Gift box".to_owned();
        payload.options.push(ItemOptionFormInput {
            uid: ItemOptionUid::generate(),
            name: String::new(),
            extra_cents: 500,
        });
        let errors = payload.validate().expect_err("unnamed option should fail");
        assert!(errors.message_for("options").is_some());
    }

    #[test]
    fn attachment_upload_requires_content() {
        let upload = AttachmentUpload {
            uid: AttachmentUid::generate(),
            owner_uid: "p-1".to_owned(),
            file_name: "banner.png".to_owned(),
            mime_type: "image/png".to_owned(),
            data: Vec::new(),
        };
        let errors = upload.validate().expect_err("empty upload should fail");
        assert!(errors.message_for("data").is_some());
    }
}
