// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tablero_app::{
    Address, Attachment, Comment, Company, ItemOption, Payment, PointEntry, Post, ShopItem, User,
};

use crate::ListRow;

macro_rules! list_row {
    ($entity:ty) => {
        impl ListRow for $entity {
            fn row_uid(&self) -> &str {
                self.uid.as_str()
            }
        }
    };
}

list_row!(User);
list_row!(Company);
list_row!(Post);
list_row!(Comment);
list_row!(Payment);
list_row!(PointEntry);
list_row!(ShopItem);
list_row!(ItemOption);
list_row!(Address);
list_row!(Attachment);
