// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use tablero_app::{
    AddressFormInput, AddressUid, BoardKind, CommentFormInput, CommentUid, CompanyFormInput,
    CompanyUid, ItemOptionFormInput, ItemOptionUid, PaymentStatus, PointEntryFormInput,
    PointEntryUid, PointKind, PostFormInput, PostUid, ShopItemFormInput, ShopItemUid,
    UserFormInput, UserGrade, UserUid,
};
use time::{Duration, OffsetDateTime, macros::datetime};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const COMPANY_ADJECTIVES: [&str; 10] = [
    "Premier", "Central", "Reliable", "Bright", "Quality", "Summit", "Eagle", "Heritage",
    "Greenleaf", "Apex",
];
const COMPANY_SUFFIXES: [&str; 6] = ["Trading", "Logistics", "Foods", "Supply", "Retail", "Labs"];

const CITIES: [&str; 12] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
];

const POST_TITLES: [&str; 12] = [
    "Service maintenance window this weekend",
    "Updated refund policy",
    "How do I change my shipping address?",
    "Spring membership event",
    "New arrivals in the shop",
    "App release notes",
    "Holiday customer support hours",
    "Double points week",
    "Payment methods now supported",
    "Community guidelines refresher",
    "Warehouse move announcement",
    "Year-end clearance",
];

const COMMENT_BODIES: [&str; 10] = [
    "Thanks for the update.",
    "When does this take effect?",
    "This fixed my issue.",
    "Can support reach out to me?",
    "Great news!",
    "Is this available in all regions?",
    "Order arrived quickly, thank you.",
    "The link in the post is broken.",
    "Looking forward to it.",
    "Please add more detail here.",
];

const POINT_REASONS: [&str; 8] = [
    "signup bonus",
    "order reward",
    "review reward",
    "event participation",
    "shop purchase",
    "point expiry adjustment",
    "customer service credit",
    "referral bonus",
];

const ITEM_NAMES: [&str; 12] = [
    "Gift Box",
    "Ceramic Mug",
    "Canvas Tote",
    "Desk Calendar",
    "Sticker Pack",
    "Water Bottle",
    "Notebook Set",
    "Hooded Blanket",
    "Travel Pouch",
    "Enamel Pin",
    "Phone Stand",
    "Keyring",
];

const OPTION_NAMES: [&str; 8] = [
    "Small", "Medium", "Large", "Black", "Ivory", "Forest", "Gift Wrap", "Engraving",
];

const STREET_NAMES: [&str; 12] = [
    "Cedar", "Maple", "Oak", "Pine", "Willow", "Elm", "Birch", "Juniper", "Sunset", "Ridge",
    "Valley", "Lakeview",
];

const CARD_NAMES: [&str; 6] = ["Shinhan", "Kookmin", "Hana", "Woori", "Lotte", "Samsung"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

// Deterministic fixture generator: the same seed always yields the same
// sequence of records, so assertions can rely on generated data.
#[derive(Debug, Clone)]
pub struct BackofficeFaker {
    rng: DeterministicRng,
    serial: u64,
}

impl BackofficeFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            serial: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn next_serial(&mut self) -> u64 {
        self.serial += 1;
        self.serial
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    pub fn created_at(&mut self) -> OffsetDateTime {
        reference_now() - Duration::days(self.rng.int_n(365) as i64)
    }

    pub fn user(&mut self) -> UserFormInput {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let serial = self.next_serial();
        let grade = match self.rng.int_n(10) {
            0 => UserGrade::Admin,
            1 | 2 => UserGrade::Vip,
            _ => UserGrade::Normal,
        };
        UserFormInput {
            uid: UserUid::generate(),
            login_id: format!("{}{}{serial}", first.to_lowercase(), last.to_lowercase()),
            name: format!("{first} {last}"),
            email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
            phone: format!("010-{:04}-{:04}", self.rng.int_n(10_000), self.rng.int_n(10_000)),
            grade,
        }
    }

    pub fn company(&mut self) -> CompanyFormInput {
        let serial = self.next_serial();
        CompanyFormInput {
            uid: CompanyUid::generate(),
            name: format!("{} {} {serial}", self.pick(&COMPANY_ADJECTIVES), self.pick(&COMPANY_SUFFIXES)),
            business_no: format!("{:03}-{:02}-{:05}", self.rng.int_n(1000), self.rng.int_n(100), self.rng.int_n(100_000)),
            ceo_name: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            phone: format!("02-{:04}-{:04}", self.rng.int_n(10_000), self.rng.int_n(10_000)),
            city: self.pick(&CITIES).to_owned(),
        }
    }

    pub fn post(&mut self, board: BoardKind, user_uid: &UserUid) -> PostFormInput {
        let expired_at = if board == BoardKind::Event {
            Some(reference_now() + Duration::days(30 + self.rng.int_n(60) as i64))
        } else {
            None
        };
        PostFormInput {
            uid: PostUid::generate(),
            board,
            user_uid: user_uid.clone(),
            title: self.pick(&POST_TITLES).to_owned(),
            body: "Details inside.".to_owned(),
            is_visible: self.rng.int_n(10) != 0,
            expired_at,
        }
    }

    pub fn comment(&mut self, post_uid: &PostUid, user_uid: &UserUid) -> CommentFormInput {
        CommentFormInput {
            uid: CommentUid::generate(),
            post_uid: post_uid.clone(),
            user_uid: user_uid.clone(),
            body: self.pick(&COMMENT_BODIES).to_owned(),
            is_visible: self.rng.int_n(12) != 0,
        }
    }

    pub fn point_entry(&mut self, user_uid: &UserUid) -> PointEntryFormInput {
        let kind = if self.rng.bool() {
            PointKind::Earn
        } else {
            PointKind::Spend
        };
        PointEntryFormInput {
            uid: PointEntryUid::generate(),
            user_uid: user_uid.clone(),
            kind,
            amount: (1 + self.rng.int_n(50) as i64) * 100,
            reason: self.pick(&POINT_REASONS).to_owned(),
            expired_at: (kind == PointKind::Earn)
                .then(|| reference_now() + Duration::days(365)),
        }
    }

    pub fn shop_item(&mut self, option_count: usize) -> ShopItemFormInput {
        let serial = self.next_serial();
        let options = (0..option_count)
            .map(|index| ItemOptionFormInput {
                uid: ItemOptionUid::generate(),
                name: OPTION_NAMES[(index + self.rng.int_n(OPTION_NAMES.len())) % OPTION_NAMES.len()]
                    .to_owned(),
                extra_cents: (self.rng.int_n(20) as i64) * 50,
            })
            .collect();
        ShopItemFormInput {
            uid: ShopItemUid::generate(),
            name: format!("{} {serial}", self.pick(&ITEM_NAMES)),
            price_cents: (5 + self.rng.int_n(200) as i64) * 100,
            stock: self.rng.int_n(500) as i64,
            options,
        }
    }

    pub fn address(&mut self, user_uid: &UserUid) -> AddressFormInput {
        AddressFormInput {
            uid: AddressUid::generate(),
            user_uid: user_uid.clone(),
            label: if self.rng.bool() { "home" } else { "work" }.to_owned(),
            recipient: format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            postal_code: format!("{:05}", self.rng.int_n(100_000)),
            line1: format!(
                "{} {} St",
                100 + self.rng.int_n(9_900),
                self.pick(&STREET_NAMES)
            ),
            line2: String::new(),
            is_default: false,
        }
    }

    pub fn payment_fields(&mut self) -> (String, i64, String, String, PaymentStatus, OffsetDateTime) {
        let serial = self.next_serial();
        let status = match self.rng.int_n(12) {
            0 => PaymentStatus::Refunded,
            1 | 2 => PaymentStatus::Canceled,
            _ => PaymentStatus::Paid,
        };
        (
            format!("ORD-{:06}", 100_000 + serial),
            (10 + self.rng.int_n(990) as i64) * 100,
            self.pick(&CARD_NAMES).to_owned(),
            format!("{:04}", self.rng.int_n(10_000)),
            status,
            reference_now() - Duration::days(self.rng.int_n(180) as i64),
        )
    }
}

pub fn reference_now() -> OffsetDateTime {
    datetime!(2026-01-09 12:00 UTC)
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("tablero.db");
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::BackofficeFaker;
    use tablero_app::UserGrade;

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut first = BackofficeFaker::new(7);
        let mut second = BackofficeFaker::new(7);
        let a = first.user();
        let b = second.user();
        assert_eq!(a.login_id, b.login_id);
        assert_eq!(a.name, b.name);
        assert_eq!(a.grade, b.grade);
        // uids stay unique regardless of the seed.
        assert_ne!(a.uid, b.uid);
    }

    #[test]
    fn generated_forms_validate() {
        let mut faker = BackofficeFaker::new(42);
        for _ in 0..20 {
            assert!(faker.user().validate().is_ok());
            assert!(faker.company().validate().is_ok());
            assert!(faker.shop_item(3).validate().is_ok());
        }
    }

    #[test]
    fn grades_cover_the_enum_eventually() {
        let mut faker = BackofficeFaker::new(3);
        let mut saw_admin = false;
        let mut saw_vip = false;
        for _ in 0..200 {
            match faker.user().grade {
                UserGrade::Admin => saw_admin = true,
                UserGrade::Vip => saw_vip = true,
                UserGrade::Normal => {}
            }
        }
        assert!(saw_admin);
        assert!(saw_vip);
    }
}
