// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tablero_app::{
    AttachmentUid, AttachmentUpload, BoardKind, InlinePatch, PaymentStatus, PaymentUid, PostUid,
    ScreenKind, SettingKey, SettingValue, SortDirection, SortMove, UserGrade, UserUid,
};
use tablero_db::{NewPayment, Store};
use tablero_sync::{FilterState, ListQuery};
use tablero_testkit::{BackofficeFaker, reference_now};
use time::macros::date;

fn open_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

fn query_for(screen: ScreenKind) -> ListQuery {
    ListQuery::first_page(FilterState::default_for(screen))
}

#[test]
fn bootstrap_seeds_default_settings() -> Result<()> {
    let store = open_store()?;

    let title = store.get_setting(SettingKey::SiteTitle)?.expect("title");
    assert_eq!(title, SettingValue::Text("tablero".to_owned()));
    assert_eq!(
        store.get_setting(SettingKey::SignupOpen)?,
        Some(SettingValue::Bool(true))
    );
    assert_eq!(
        store.get_setting(SettingKey::PointExpiryDays)?,
        Some(SettingValue::Int(365))
    );
    Ok(())
}

#[test]
fn bootstrap_twice_is_idempotent() -> Result<()> {
    let store = open_store()?;
    store.bootstrap()?;
    Ok(())
}

#[test]
fn created_user_keeps_its_client_generated_uid() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(1);

    let form = faker.user();
    let uid = store.create_user(&form)?;
    assert_eq!(uid, form.uid);

    let fetched = store.get_user(&uid)?;
    assert_eq!(fetched.login_id, form.login_id);
    assert_eq!(fetched.grade, form.grade);
    assert!(fetched.is_use);
    assert!(fetched.idx > 0);
    Ok(())
}

#[test]
fn duplicate_login_id_is_rejected() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(2);

    let mut first = faker.user();
    first.login_id = "same.login".to_owned();
    store.create_user(&first)?;

    let mut second = faker.user();
    second.login_id = "same.login".to_owned();
    assert!(store.create_user(&second).is_err());
    Ok(())
}

#[test]
fn user_list_filters_and_counts_share_one_filter_set() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(3);

    for _ in 0..7 {
        let mut form = faker.user();
        form.grade = UserGrade::Normal;
        store.create_user(&form)?;
    }
    for _ in 0..3 {
        let mut form = faker.user();
        form.grade = UserGrade::Vip;
        store.create_user(&form)?;
    }

    let mut query = query_for(ScreenKind::Users);
    query
        .filter
        .extra
        .insert("grade".to_owned(), "vip".to_owned());
    let page = store.list_users(&query)?;

    assert_eq!(page.total_all, 10);
    assert_eq!(page.total_filtered, 3);
    assert_eq!(page.rows.len(), 3);
    assert!(page.rows.iter().all(|user| user.grade == UserGrade::Vip));
    Ok(())
}

#[test]
fn free_text_search_matches_name_and_login() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(4);

    let mut target = faker.user();
    target.name = "Sora Kim".to_owned();
    store.create_user(&target)?;
    for _ in 0..4 {
        store.create_user(&faker.user())?;
    }

    let mut query = query_for(ScreenKind::Users);
    query.filter.q = "Sora".to_owned();
    let page = store.list_users(&query)?;
    assert_eq!(page.total_filtered, 1);
    assert_eq!(page.rows[0].name, "Sora Kim");
    Ok(())
}

#[test]
fn pagination_respects_limit_and_offset() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(5);

    for _ in 0..25 {
        store.create_user(&faker.user())?;
    }

    let mut query = query_for(ScreenKind::Users);
    query.filter.limit = 10;
    let first = store.list_users(&query)?;
    assert_eq!(first.rows.len(), 10);
    assert_eq!(first.total_filtered, 25);

    query.offset = 20;
    let last = store.list_users(&query)?;
    assert_eq!(last.rows.len(), 5);

    // No overlap between the pages.
    let first_uids: Vec<_> = first.rows.iter().map(|user| user.uid.clone()).collect();
    assert!(last.rows.iter().all(|user| !first_uids.contains(&user.uid)));
    Ok(())
}

#[test]
fn sort_by_name_ascending_orders_rows() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(6);

    for name in ["Charlie", "Alice", "Bob"] {
        let mut form = faker.user();
        form.name = name.to_owned();
        store.create_user(&form)?;
    }

    let mut query = query_for(ScreenKind::Users);
    query.filter.sort_by = "name".to_owned();
    query.filter.order = SortDirection::Asc;
    let page = store.list_users(&query)?;
    let names: Vec<_> = page.rows.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
    Ok(())
}

#[test]
fn bulk_delete_hides_rows_and_shrinks_both_counts() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(7);

    let mut uids = Vec::new();
    for _ in 0..5 {
        uids.push(store.create_user(&faker.user())?);
    }

    let victims: Vec<String> = uids[..3].iter().map(|uid| uid.as_str().to_owned()).collect();
    let affected = store.delete_rows(ScreenKind::Users, &victims)?;
    assert_eq!(affected, 3);

    let page = store.list_users(&query_for(ScreenKind::Users))?;
    assert_eq!(page.total_all, 2);
    assert_eq!(page.total_filtered, 2);

    // Deleting the same rows again touches nothing.
    assert_eq!(store.delete_rows(ScreenKind::Users, &victims)?, 0);

    // The disabled rows are still reachable with the `use=all` filter.
    let mut all_query = query_for(ScreenKind::Users);
    all_query
        .filter
        .extra
        .insert("use".to_owned(), "all".to_owned());
    let everything = store.list_users(&all_query)?;
    assert_eq!(everything.total_filtered, 5);

    let restored = store.restore_rows(ScreenKind::Users, &victims)?;
    assert_eq!(restored, 3);
    let page = store.list_users(&query_for(ScreenKind::Users))?;
    assert_eq!(page.total_all, 5);
    Ok(())
}

#[test]
fn post_filters_cover_board_visibility_and_period() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(8);

    let author = store.create_user(&faker.user())?;
    for board in BoardKind::ALL {
        let mut form = faker.post(board, &author);
        form.is_visible = board != BoardKind::Free;
        store.create_post(&form)?;
    }

    let mut query = query_for(ScreenKind::Posts);
    query
        .filter
        .extra
        .insert("board".to_owned(), "notice".to_owned());
    let notices = store.list_posts(&query)?;
    assert_eq!(notices.total_filtered, 1);
    assert_eq!(notices.total_all, 4);

    let mut hidden_query = query_for(ScreenKind::Posts);
    hidden_query
        .filter
        .extra
        .insert("visible".to_owned(), "false".to_owned());
    let hidden = store.list_posts(&hidden_query)?;
    assert_eq!(hidden.total_filtered, 1);
    assert_eq!(hidden.rows[0].board, BoardKind::Free);

    // Seeded posts were created "now"; a period far in the past matches
    // nothing.
    let mut period_query = query_for(ScreenKind::Posts);
    period_query.filter.start_date = Some(date!(2001 - 01 - 01));
    period_query.filter.end_date = Some(date!(2001 - 12 - 31));
    let none = store.list_posts(&period_query)?;
    assert_eq!(none.total_filtered, 0);
    assert_eq!(none.total_all, 4);
    Ok(())
}

#[test]
fn comment_crud_round_trips() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(9);

    let author = store.create_user(&faker.user())?;
    let post_uid = store.create_post(&faker.post(BoardKind::Free, &author))?;
    let mut comment = faker.comment(&post_uid, &author);
    comment.body = "First!".to_owned();
    let uid = store.create_comment(&comment)?;

    let mut updated = comment.clone();
    updated.body = "Edited.".to_owned();
    store.update_comment(&uid, &updated)?;
    assert_eq!(store.get_comment(&uid)?.body, "Edited.");

    let mut query = query_for(ScreenKind::Comments);
    query
        .filter
        .extra
        .insert("post_uid".to_owned(), post_uid.as_str().to_owned());
    let page = store.list_comments(&query)?;
    assert_eq!(page.total_filtered, 1);
    Ok(())
}

#[test]
fn payment_filters_by_status_and_settlement_period() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(10);

    let payer = store.create_user(&faker.user())?;
    for index in 0..6 {
        let (order_no, amount_cents, card_name, card_last4, _, _) = faker.payment_fields();
        store.create_payment(&NewPayment {
            uid: PaymentUid::generate(),
            user_uid: payer.clone(),
            order_no,
            amount_cents,
            card_name,
            card_last4,
            status: if index < 2 {
                PaymentStatus::Canceled
            } else {
                PaymentStatus::Paid
            },
            paid_at: reference_now(),
        })?;
    }

    let mut query = query_for(ScreenKind::Payments);
    query
        .filter
        .extra
        .insert("status".to_owned(), "canceled".to_owned());
    let canceled = store.list_payments(&query)?;
    assert_eq!(canceled.total_filtered, 2);
    assert_eq!(canceled.total_all, 6);

    let mut period = query_for(ScreenKind::Payments);
    period.filter.start_date = Some(date!(2026 - 01 - 01));
    period.filter.end_date = Some(date!(2026 - 01 - 31));
    let in_january = store.list_payments(&period)?;
    assert_eq!(in_january.total_filtered, 6);
    Ok(())
}

#[test]
fn zero_amount_payment_is_rejected() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(11);
    let payer = store.create_user(&faker.user())?;

    let result = store.create_payment(&NewPayment {
        uid: PaymentUid::generate(),
        user_uid: payer,
        order_no: "ORD-000001".to_owned(),
        amount_cents: 0,
        card_name: String::new(),
        card_last4: String::new(),
        status: PaymentStatus::Paid,
        paid_at: reference_now(),
    });
    assert!(result.is_err());
    Ok(())
}

#[test]
fn inline_patches_update_single_fields() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(12);

    let author = store.create_user(&faker.user())?;
    let post_uid = store.create_post(&faker.post(BoardKind::Notice, &author))?;

    store.apply_inline_patch(post_uid.as_str(), &InlinePatch::PostVisible(false))?;
    assert!(!store.get_post(&post_uid)?.is_visible);

    store.apply_inline_patch(author.as_str(), &InlinePatch::UserGrade(UserGrade::Vip))?;
    assert_eq!(store.get_user(&author)?.grade, UserGrade::Vip);

    let item_uid = store.create_shop_item(&faker.shop_item(0))?;
    store.apply_inline_patch(item_uid.as_str(), &InlinePatch::ItemPrice(9_900))?;
    assert_eq!(store.get_shop_item(&item_uid)?.price_cents, 9_900);

    assert!(
        store
            .apply_inline_patch(item_uid.as_str(), &InlinePatch::ItemPrice(-1))
            .is_err()
    );
    assert!(
        store
            .apply_inline_patch("missing-uid", &InlinePatch::PostVisible(true))
            .is_err()
    );
    Ok(())
}

#[test]
fn shop_items_keep_a_dense_sort_order() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(13);

    let mut uids = Vec::new();
    for _ in 0..4 {
        uids.push(store.create_shop_item(&faker.shop_item(0))?);
    }

    let orders: Vec<i64> = store
        .list_shop_items(&query_for(ScreenKind::ShopItems))?
        .rows
        .iter()
        .map(|item| item.sort_order)
        .collect();
    // Default order for the shop screen is sort_order descending.
    assert_eq!(orders, vec![4, 3, 2, 1]);

    store.delete_rows(ScreenKind::ShopItems, &[uids[1].as_str().to_owned()])?;
    let orders: Vec<i64> = store
        .list_shop_items(&query_for(ScreenKind::ShopItems))?
        .rows
        .iter()
        .map(|item| item.sort_order)
        .collect();
    assert_eq!(orders, vec![3, 2, 1]);
    Ok(())
}

#[test]
fn move_shop_item_swaps_neighbors_and_stops_at_edges() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(14);

    let first = store.create_shop_item(&faker.shop_item(0))?;
    let second = store.create_shop_item(&faker.shop_item(0))?;

    // `first` holds sort_order 1; it cannot move further up.
    assert!(!store.move_shop_item(&first, SortMove::Up)?);

    assert!(store.move_shop_item(&first, SortMove::Down)?);
    assert_eq!(store.get_shop_item(&first)?.sort_order, 2);
    assert_eq!(store.get_shop_item(&second)?.sort_order, 1);

    assert!(!store.move_shop_item(&first, SortMove::Down)?);
    Ok(())
}

#[test]
fn updating_a_shop_item_replaces_its_options() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(15);

    let mut form = faker.shop_item(2);
    let uid = store.create_shop_item(&form)?;
    assert_eq!(store.list_item_options(&uid)?.len(), 2);

    form.options = faker.shop_item(3).options;
    store.update_shop_item(&uid, &form)?;

    let options = store.list_item_options(&uid)?;
    assert_eq!(options.len(), 3);
    let orders: Vec<i64> = options.iter().map(|option| option.sort_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn only_one_default_address_per_user() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(16);

    let user = store.create_user(&faker.user())?;
    let mut first = faker.address(&user);
    first.is_default = true;
    let first_uid = store.create_address(&first)?;

    let mut second = faker.address(&user);
    second.is_default = true;
    let second_uid = store.create_address(&second)?;

    assert!(!store.get_address(&first_uid)?.is_default);
    assert!(store.get_address(&second_uid)?.is_default);

    let mut updated = first.clone();
    updated.is_default = true;
    store.update_address(&first_uid, &updated)?;
    assert!(store.get_address(&first_uid)?.is_default);
    assert!(!store.get_address(&second_uid)?.is_default);
    Ok(())
}

#[test]
fn attachment_can_precede_its_owner_record() -> Result<()> {
    let store = open_store()?;
    let mut faker = BackofficeFaker::new(17);

    // The client generated the post uid before submitting the form; the
    // upload binds to it while the post does not exist yet.
    let author = store.create_user(&faker.user())?;
    let post_uid = PostUid::generate();
    let upload = AttachmentUpload {
        uid: AttachmentUid::generate(),
        owner_uid: post_uid.as_str().to_owned(),
        file_name: "banner.png".to_owned(),
        mime_type: "image/png".to_owned(),
        data: vec![0x89, 0x50, 0x4E, 0x47],
    };
    let stored = store.insert_attachment(&upload)?;
    assert_eq!(stored.size_bytes, 4);
    assert_eq!(stored.stored_path, format!("uploads/{post_uid}/banner.png"));

    let mut form = faker.post(BoardKind::Event, &author);
    form.uid = post_uid.clone();
    store.create_post(&form)?;

    let attached = store.list_attachments_for(post_uid.as_str())?;
    assert_eq!(attached.len(), 1);
    assert_eq!(store.attachment_data(&stored.uid)?, upload.data);

    store.delete_attachment(&stored.uid)?;
    assert!(store.list_attachments_for(post_uid.as_str())?.is_empty());
    assert!(store.delete_attachment(&stored.uid).is_err());
    Ok(())
}

#[test]
fn extract_writes_the_blob_and_verifies_its_checksum() -> Result<()> {
    let store = open_store()?;
    let upload = AttachmentUpload {
        uid: AttachmentUid::generate(),
        owner_uid: "p-1".to_owned(),
        file_name: "notes.txt".to_owned(),
        mime_type: "text/plain".to_owned(),
        data: b"hello tablero".to_vec(),
    };
    let stored = store.insert_attachment(&upload)?;

    let path = store.extract_attachment(&stored.uid)?;
    assert_eq!(std::fs::read(&path)?, upload.data);
    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn oversized_attachment_is_rejected() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    store.set_max_upload_size(8)?;

    let upload = AttachmentUpload {
        uid: AttachmentUid::generate(),
        owner_uid: "p-1".to_owned(),
        file_name: "big.bin".to_owned(),
        mime_type: "application/octet-stream".to_owned(),
        data: vec![0; 16],
    };
    let error = store.insert_attachment(&upload).expect_err("too big");
    assert!(error.to_string().contains("upload limit"));
    Ok(())
}

#[test]
fn settings_reject_mismatched_value_kinds() -> Result<()> {
    let store = open_store()?;

    store.put_setting(SettingKey::SiteTitle, SettingValue::Text("Admin".to_owned()))?;
    assert_eq!(
        store.get_setting(SettingKey::SiteTitle)?,
        Some(SettingValue::Text("Admin".to_owned()))
    );

    assert!(
        store
            .put_setting(SettingKey::SignupOpen, SettingValue::Text("maybe".to_owned()))
            .is_err()
    );

    let listed = store.list_settings()?;
    assert_eq!(listed.len(), SettingKey::ALL.len());
    Ok(())
}

#[test]
fn missing_records_error_with_the_uid() -> Result<()> {
    let store = open_store()?;
    let missing = UserUid::new("nope");
    let error = store.get_user(&missing).expect_err("should be missing");
    assert!(error.to_string().contains("nope"));
    Ok(())
}

#[test]
fn demo_seed_populates_every_screen() -> Result<()> {
    let store = open_store()?;
    store.seed_demo_data()?;

    assert!(store.list_users(&query_for(ScreenKind::Users))?.total_all > 0);
    assert!(store.list_companies(&query_for(ScreenKind::Companies))?.total_all > 0);
    assert!(store.list_posts(&query_for(ScreenKind::Posts))?.total_all > 0);
    assert!(store.list_comments(&query_for(ScreenKind::Comments))?.total_all > 0);
    assert!(store.list_payments(&query_for(ScreenKind::Payments))?.total_all > 0);
    assert!(store.list_points(&query_for(ScreenKind::Points))?.total_all > 0);
    assert!(store.list_shop_items(&query_for(ScreenKind::ShopItems))?.total_all > 0);
    assert!(store.list_addresses(&query_for(ScreenKind::Addresses))?.total_all > 0);
    Ok(())
}
