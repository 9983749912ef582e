// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tablero_actions::Client;
use tablero_app::{
    ActionError, Address, AddressFormInput, AddressUid, AppSetting, Attachment, AttachmentUid,
    AttachmentUpload, Comment, CommentFormInput, CommentUid, Company, CompanyFormInput,
    CompanyUid, FormPayload, InlinePatch, ItemOption, ItemOptionFormInput, Payment, PointEntry,
    PointEntryFormInput, PointEntryUid, Post, PostFormInput, PostUid, ScreenKind, ShopItem,
    ShopItemFormInput, ShopItemUid, SortMove, User, UserFormInput, UserUid,
};
use tablero_db::Store;
use tablero_sync::{ListQuery, PageData};
use tablero_tui::{
    BackofficeRuntime, RowView, address_row, comment_row, company_row, payment_row, point_row,
    post_row, shop_item_row, user_row,
};

fn to_action_error(error: anyhow::Error) -> ActionError {
    ActionError::failed(format!("{error:#}"))
}

fn user_form(user: &User) -> UserFormInput {
    UserFormInput {
        uid: user.uid.clone(),
        login_id: user.login_id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        grade: user.grade,
    }
}

fn company_form(company: &Company) -> CompanyFormInput {
    CompanyFormInput {
        uid: company.uid.clone(),
        name: company.name.clone(),
        business_no: company.business_no.clone(),
        ceo_name: company.ceo_name.clone(),
        phone: company.phone.clone(),
        city: company.city.clone(),
    }
}

fn post_form(post: &Post) -> PostFormInput {
    PostFormInput {
        uid: post.uid.clone(),
        board: post.board,
        user_uid: post.user_uid.clone(),
        title: post.title.clone(),
        body: post.body.clone(),
        is_visible: post.is_visible,
        expired_at: post.expired_at,
    }
}

fn comment_form(comment: &Comment) -> CommentFormInput {
    CommentFormInput {
        uid: comment.uid.clone(),
        post_uid: comment.post_uid.clone(),
        user_uid: comment.user_uid.clone(),
        body: comment.body.clone(),
        is_visible: comment.is_visible,
    }
}

fn point_form(entry: &PointEntry) -> PointEntryFormInput {
    PointEntryFormInput {
        uid: entry.uid.clone(),
        user_uid: entry.user_uid.clone(),
        kind: entry.kind,
        amount: entry.amount,
        reason: entry.reason.clone(),
        expired_at: entry.expired_at,
    }
}

fn item_form(item: &ShopItem, options: &[ItemOption]) -> ShopItemFormInput {
    ShopItemFormInput {
        uid: item.uid.clone(),
        name: item.name.clone(),
        price_cents: item.price_cents,
        stock: item.stock,
        options: options
            .iter()
            .map(|option| ItemOptionFormInput {
                uid: option.uid.clone(),
                name: option.name.clone(),
                extra_cents: option.extra_cents,
            })
            .collect(),
    }
}

fn address_form(address: &Address) -> AddressFormInput {
    AddressFormInput {
        uid: address.uid.clone(),
        user_uid: address.user_uid.clone(),
        label: address.label.clone(),
        recipient: address.recipient.clone(),
        postal_code: address.postal_code.clone(),
        line1: address.line1.clone(),
        line2: address.line2.clone(),
        is_default: address.is_default,
    }
}

// Serves the action surface straight from the embedded SQLite store.
pub struct StoreRuntime<'a> {
    store: &'a Store,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl BackofficeRuntime for StoreRuntime<'_> {
    fn fetch_page(
        &mut self,
        screen: ScreenKind,
        query: &ListQuery,
    ) -> Result<PageData<RowView>, ActionError> {
        let page = match screen {
            ScreenKind::Users => self
                .store
                .list_users(query)
                .map(|page| page.map(|user| user_row(&user))),
            ScreenKind::Companies => self
                .store
                .list_companies(query)
                .map(|page| page.map(|company| company_row(&company))),
            ScreenKind::Posts => self
                .store
                .list_posts(query)
                .map(|page| page.map(|post| post_row(&post))),
            ScreenKind::Comments => self
                .store
                .list_comments(query)
                .map(|page| page.map(|comment| comment_row(&comment))),
            ScreenKind::Payments => self
                .store
                .list_payments(query)
                .map(|page| page.map(|payment| payment_row(&payment))),
            ScreenKind::Points => self
                .store
                .list_points(query)
                .map(|page| page.map(|entry| point_row(&entry))),
            ScreenKind::ShopItems => self
                .store
                .list_shop_items(query)
                .map(|page| page.map(|item| shop_item_row(&item))),
            ScreenKind::Addresses => self
                .store
                .list_addresses(query)
                .map(|page| page.map(|address| address_row(&address))),
            ScreenKind::Settings => {
                return Err(ActionError::failed("settings are not a paged list"));
            }
        };
        page.map_err(to_action_error)
    }

    fn fetch_row(&mut self, screen: ScreenKind, uid: &str) -> Result<RowView, ActionError> {
        let row = match screen {
            ScreenKind::Users => self.store.get_user(&UserUid::new(uid)).map(|u| user_row(&u)),
            ScreenKind::Companies => self
                .store
                .get_company(&CompanyUid::new(uid))
                .map(|c| company_row(&c)),
            ScreenKind::Posts => self.store.get_post(&PostUid::new(uid)).map(|p| post_row(&p)),
            ScreenKind::Comments => self
                .store
                .get_comment(&CommentUid::new(uid))
                .map(|c| comment_row(&c)),
            ScreenKind::Payments => self
                .store
                .get_payment(&tablero_app::PaymentUid::new(uid))
                .map(|p| payment_row(&p)),
            ScreenKind::Points => self
                .store
                .get_point_entry(&PointEntryUid::new(uid))
                .map(|e| point_row(&e)),
            ScreenKind::ShopItems => self
                .store
                .get_shop_item(&ShopItemUid::new(uid))
                .map(|i| shop_item_row(&i)),
            ScreenKind::Addresses => self
                .store
                .get_address(&AddressUid::new(uid))
                .map(|a| address_row(&a)),
            ScreenKind::Settings => {
                return Err(ActionError::failed("settings have no rows"));
            }
        };
        row.map_err(to_action_error)
    }

    fn load_form(&mut self, screen: ScreenKind, uid: &str) -> Result<FormPayload, ActionError> {
        let payload = match screen {
            ScreenKind::Users => self
                .store
                .get_user(&UserUid::new(uid))
                .map(|user| FormPayload::User(user_form(&user))),
            ScreenKind::Companies => self
                .store
                .get_company(&CompanyUid::new(uid))
                .map(|company| FormPayload::Company(company_form(&company))),
            ScreenKind::Posts => self
                .store
                .get_post(&PostUid::new(uid))
                .map(|post| FormPayload::Post(post_form(&post))),
            ScreenKind::Comments => self
                .store
                .get_comment(&CommentUid::new(uid))
                .map(|comment| FormPayload::Comment(comment_form(&comment))),
            ScreenKind::Points => self
                .store
                .get_point_entry(&PointEntryUid::new(uid))
                .map(|entry| FormPayload::PointEntry(point_form(&entry))),
            ScreenKind::ShopItems => {
                let item_uid = ShopItemUid::new(uid);
                self.store.get_shop_item(&item_uid).and_then(|item| {
                    let options = self.store.list_item_options(&item_uid)?;
                    Ok(FormPayload::ShopItem(item_form(&item, &options)))
                })
            }
            ScreenKind::Addresses => self
                .store
                .get_address(&AddressUid::new(uid))
                .map(|address| FormPayload::Address(address_form(&address))),
            ScreenKind::Payments | ScreenKind::Settings => {
                return Err(ActionError::failed(format!(
                    "{} rows have no edit form",
                    screen.label()
                )));
            }
        };
        payload.map_err(to_action_error)
    }

    fn submit_create(&mut self, payload: &FormPayload) -> Result<(), ActionError> {
        payload.validate().map_err(ActionError::Validation)?;
        let result = match payload {
            FormPayload::User(form) => self.store.create_user(form).map(|_| ()),
            FormPayload::Company(form) => self.store.create_company(form).map(|_| ()),
            FormPayload::Post(form) => self.store.create_post(form).map(|_| ()),
            FormPayload::Comment(form) => self.store.create_comment(form).map(|_| ()),
            FormPayload::PointEntry(form) => self.store.create_point_entry(form).map(|_| ()),
            FormPayload::ShopItem(form) => self.store.create_shop_item(form).map(|_| ()),
            FormPayload::Address(form) => self.store.create_address(form).map(|_| ()),
        };
        result.map_err(to_action_error)
    }

    fn submit_update(&mut self, uid: &str, payload: &FormPayload) -> Result<(), ActionError> {
        payload.validate().map_err(ActionError::Validation)?;
        let result = match payload {
            FormPayload::User(form) => self.store.update_user(&UserUid::new(uid), form),
            FormPayload::Company(form) => self.store.update_company(&CompanyUid::new(uid), form),
            FormPayload::Post(form) => self.store.update_post(&PostUid::new(uid), form),
            FormPayload::Comment(form) => self.store.update_comment(&CommentUid::new(uid), form),
            FormPayload::PointEntry(form) => {
                self.store.update_point_entry(&PointEntryUid::new(uid), form)
            }
            FormPayload::ShopItem(form) => {
                self.store.update_shop_item(&ShopItemUid::new(uid), form)
            }
            FormPayload::Address(form) => self.store.update_address(&AddressUid::new(uid), form),
        };
        result.map_err(to_action_error)
    }

    fn delete_rows(&mut self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        self.store.delete_rows(screen, uids).map_err(to_action_error)
    }

    fn restore_rows(&mut self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        self.store.restore_rows(screen, uids).map_err(to_action_error)
    }

    fn inline_patch(
        &mut self,
        _screen: ScreenKind,
        uid: &str,
        patch: &InlinePatch,
    ) -> Result<(), ActionError> {
        self.store.apply_inline_patch(uid, patch).map_err(to_action_error)
    }

    fn move_item(&mut self, uid: &str, direction: SortMove) -> Result<bool, ActionError> {
        self.store
            .move_shop_item(&ShopItemUid::new(uid), direction)
            .map_err(to_action_error)
    }

    fn list_settings(&mut self) -> Result<Vec<AppSetting>, ActionError> {
        self.store.list_settings().map_err(to_action_error)
    }

    fn put_setting(&mut self, setting: &AppSetting) -> Result<(), ActionError> {
        self.store
            .put_setting(setting.key, setting.value.clone())
            .map_err(to_action_error)
    }

    fn list_attachments(&mut self, owner_uid: &str) -> Result<Vec<Attachment>, ActionError> {
        self.store
            .list_attachments_for(owner_uid)
            .map_err(to_action_error)
    }

    fn upload_attachment(
        &mut self,
        upload: &AttachmentUpload,
    ) -> Result<Attachment, ActionError> {
        upload.validate().map_err(ActionError::Validation)?;
        self.store.insert_attachment(upload).map_err(to_action_error)
    }

    fn delete_attachment(&mut self, uid: &str) -> Result<(), ActionError> {
        self.store
            .delete_attachment(&AttachmentUid::new(uid))
            .map_err(to_action_error)
    }
}

// Serves the same surface over HTTP action envelopes.
pub struct RemoteRuntime {
    client: Client,
}

impl RemoteRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl BackofficeRuntime for RemoteRuntime {
    fn fetch_page(
        &mut self,
        screen: ScreenKind,
        query: &ListQuery,
    ) -> Result<PageData<RowView>, ActionError> {
        match screen {
            ScreenKind::Users => self
                .client
                .list::<User>(screen, query)
                .map(|page| page.map(|user| user_row(&user))),
            ScreenKind::Companies => self
                .client
                .list::<Company>(screen, query)
                .map(|page| page.map(|company| company_row(&company))),
            ScreenKind::Posts => self
                .client
                .list::<Post>(screen, query)
                .map(|page| page.map(|post| post_row(&post))),
            ScreenKind::Comments => self
                .client
                .list::<Comment>(screen, query)
                .map(|page| page.map(|comment| comment_row(&comment))),
            ScreenKind::Payments => self
                .client
                .list::<Payment>(screen, query)
                .map(|page| page.map(|payment| payment_row(&payment))),
            ScreenKind::Points => self
                .client
                .list::<PointEntry>(screen, query)
                .map(|page| page.map(|entry| point_row(&entry))),
            ScreenKind::ShopItems => self
                .client
                .list::<ShopItem>(screen, query)
                .map(|page| page.map(|item| shop_item_row(&item))),
            ScreenKind::Addresses => self
                .client
                .list::<Address>(screen, query)
                .map(|page| page.map(|address| address_row(&address))),
            ScreenKind::Settings => Err(ActionError::failed("settings are not a paged list")),
        }
    }

    fn fetch_row(&mut self, screen: ScreenKind, uid: &str) -> Result<RowView, ActionError> {
        match screen {
            ScreenKind::Users => self
                .client
                .show::<User>(screen, uid)
                .map(|user| user_row(&user)),
            ScreenKind::Companies => self
                .client
                .show::<Company>(screen, uid)
                .map(|company| company_row(&company)),
            ScreenKind::Posts => self
                .client
                .show::<Post>(screen, uid)
                .map(|post| post_row(&post)),
            ScreenKind::Comments => self
                .client
                .show::<Comment>(screen, uid)
                .map(|comment| comment_row(&comment)),
            ScreenKind::Payments => self
                .client
                .show::<Payment>(screen, uid)
                .map(|payment| payment_row(&payment)),
            ScreenKind::Points => self
                .client
                .show::<PointEntry>(screen, uid)
                .map(|entry| point_row(&entry)),
            ScreenKind::ShopItems => self
                .client
                .show::<ShopItem>(screen, uid)
                .map(|item| shop_item_row(&item)),
            ScreenKind::Addresses => self
                .client
                .show::<Address>(screen, uid)
                .map(|address| address_row(&address)),
            ScreenKind::Settings => Err(ActionError::failed("settings have no rows")),
        }
    }

    fn load_form(&mut self, screen: ScreenKind, uid: &str) -> Result<FormPayload, ActionError> {
        match screen {
            ScreenKind::Users => self
                .client
                .show::<User>(screen, uid)
                .map(|user| FormPayload::User(user_form(&user))),
            ScreenKind::Companies => self
                .client
                .show::<Company>(screen, uid)
                .map(|company| FormPayload::Company(company_form(&company))),
            ScreenKind::Posts => self
                .client
                .show::<Post>(screen, uid)
                .map(|post| FormPayload::Post(post_form(&post))),
            ScreenKind::Comments => self
                .client
                .show::<Comment>(screen, uid)
                .map(|comment| FormPayload::Comment(comment_form(&comment))),
            ScreenKind::Points => self
                .client
                .show::<PointEntry>(screen, uid)
                .map(|entry| FormPayload::PointEntry(point_form(&entry))),
            ScreenKind::ShopItems => {
                let item = self.client.show::<ShopItem>(screen, uid)?;
                let options = self.client.item_options(uid)?;
                Ok(FormPayload::ShopItem(item_form(&item, &options)))
            }
            ScreenKind::Addresses => self
                .client
                .show::<Address>(screen, uid)
                .map(|address| FormPayload::Address(address_form(&address))),
            ScreenKind::Payments | ScreenKind::Settings => Err(ActionError::failed(format!(
                "{} rows have no edit form",
                screen.label()
            ))),
        }
    }

    fn submit_create(&mut self, payload: &FormPayload) -> Result<(), ActionError> {
        payload.validate().map_err(ActionError::Validation)?;
        let screen = screen_for_payload(payload);
        match payload {
            FormPayload::User(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::Company(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::Post(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::Comment(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::PointEntry(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::ShopItem(form) => self.client.create(screen, form).map(|_| ()),
            FormPayload::Address(form) => self.client.create(screen, form).map(|_| ()),
        }
    }

    fn submit_update(&mut self, uid: &str, payload: &FormPayload) -> Result<(), ActionError> {
        payload.validate().map_err(ActionError::Validation)?;
        let screen = screen_for_payload(payload);
        match payload {
            FormPayload::User(form) => self.client.update(screen, uid, form),
            FormPayload::Company(form) => self.client.update(screen, uid, form),
            FormPayload::Post(form) => self.client.update(screen, uid, form),
            FormPayload::Comment(form) => self.client.update(screen, uid, form),
            FormPayload::PointEntry(form) => self.client.update(screen, uid, form),
            FormPayload::ShopItem(form) => self.client.update(screen, uid, form),
            FormPayload::Address(form) => self.client.update(screen, uid, form),
        }
    }

    fn delete_rows(&mut self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        self.client.delete(screen, uids)
    }

    fn restore_rows(&mut self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError> {
        self.client.restore(screen, uids)
    }

    fn inline_patch(
        &mut self,
        screen: ScreenKind,
        uid: &str,
        patch: &InlinePatch,
    ) -> Result<(), ActionError> {
        self.client.list_update(screen, uid, patch)
    }

    fn move_item(&mut self, uid: &str, direction: SortMove) -> Result<bool, ActionError> {
        self.client.list_sort(uid, direction)
    }

    fn list_settings(&mut self) -> Result<Vec<AppSetting>, ActionError> {
        self.client.settings_list()
    }

    fn put_setting(&mut self, setting: &AppSetting) -> Result<(), ActionError> {
        self.client.settings_put(setting)
    }

    fn list_attachments(&mut self, owner_uid: &str) -> Result<Vec<Attachment>, ActionError> {
        self.client.list_files(owner_uid)
    }

    fn upload_attachment(
        &mut self,
        upload: &AttachmentUpload,
    ) -> Result<Attachment, ActionError> {
        self.client.upload(upload)
    }

    fn delete_attachment(&mut self, uid: &str) -> Result<(), ActionError> {
        self.client.delete_file(uid)
    }
}

fn screen_for_payload(payload: &FormPayload) -> ScreenKind {
    match payload {
        FormPayload::User(_) => ScreenKind::Users,
        FormPayload::Company(_) => ScreenKind::Companies,
        FormPayload::Post(_) => ScreenKind::Posts,
        FormPayload::Comment(_) => ScreenKind::Comments,
        FormPayload::PointEntry(_) => ScreenKind::Points,
        FormPayload::ShopItem(_) => ScreenKind::ShopItems,
        FormPayload::Address(_) => ScreenKind::Addresses,
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::Result;
    use tablero_app::{
        ActionError, AppSetting, FormKind, FormPayload, ScreenKind, SettingKey, SettingValue,
    };
    use tablero_db::Store;
    use tablero_sync::{FilterState, ListQuery};
    use tablero_testkit::BackofficeFaker;
    use tablero_tui::BackofficeRuntime;

    fn open_store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        Ok(store)
    }

    #[test]
    fn create_list_and_edit_round_trip_through_the_runtime() -> Result<()> {
        let store = open_store()?;
        let mut runtime = StoreRuntime::new(&store);
        let mut faker = BackofficeFaker::new(21);

        let form = faker.user();
        runtime
            .submit_create(&FormPayload::User(form.clone()))
            .map_err(|error| anyhow::anyhow!("create failed: {error}"))?;

        let query = ListQuery::first_page(FilterState::default_for(ScreenKind::Users));
        let page = runtime
            .fetch_page(ScreenKind::Users, &query)
            .map_err(|error| anyhow::anyhow!("list failed: {error}"))?;
        assert_eq!(page.total_filtered, 1);
        assert_eq!(page.rows[0].uid, form.uid.as_str());

        let loaded = runtime
            .load_form(ScreenKind::Users, form.uid.as_str())
            .map_err(|error| anyhow::anyhow!("load failed: {error}"))?;
        let FormPayload::User(mut editable) = loaded else {
            panic!("unexpected payload kind");
        };
        editable.name = "Renamed".to_owned();
        runtime
            .submit_update(form.uid.as_str(), &FormPayload::User(editable))
            .map_err(|error| anyhow::anyhow!("update failed: {error}"))?;

        let row = runtime
            .fetch_row(ScreenKind::Users, form.uid.as_str())
            .map_err(|error| anyhow::anyhow!("fetch row failed: {error}"))?;
        assert!(row.cells.contains(&"Renamed".to_owned()));
        Ok(())
    }

    #[test]
    fn invalid_payload_is_rejected_as_validation_error() -> Result<()> {
        let store = open_store()?;
        let mut runtime = StoreRuntime::new(&store);

        let blank = FormPayload::blank_for(FormKind::User);
        let error = runtime
            .submit_create(&blank)
            .expect_err("blank user should fail validation");
        assert!(matches!(error, ActionError::Validation(_)));
        Ok(())
    }

    #[test]
    fn settings_round_trip_through_the_runtime() -> Result<()> {
        let store = open_store()?;
        let mut runtime = StoreRuntime::new(&store);

        let listed = runtime
            .list_settings()
            .map_err(|error| anyhow::anyhow!("list settings failed: {error}"))?;
        assert_eq!(listed.len(), SettingKey::ALL.len());

        runtime
            .put_setting(&AppSetting {
                key: SettingKey::SiteTitle,
                value: SettingValue::Text("Back Office".to_owned()),
            })
            .map_err(|error| anyhow::anyhow!("put setting failed: {error}"))?;
        assert_eq!(
            store.get_setting(SettingKey::SiteTitle)?,
            Some(SettingValue::Text("Back Office".to_owned()))
        );
        Ok(())
    }

    #[test]
    fn paged_list_is_not_available_for_settings() -> Result<()> {
        let store = open_store()?;
        let mut runtime = StoreRuntime::new(&store);
        let query = ListQuery::first_page(FilterState::default_for(ScreenKind::Settings));
        assert!(runtime.fetch_page(ScreenKind::Settings, &query).is_err());
        Ok(())
    }
}
