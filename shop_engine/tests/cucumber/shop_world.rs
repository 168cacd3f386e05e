use std::collections::HashMap;

use cucumber::World;
use log::*;
use shop_engine::{
    db_types::{Money, NewAddress, OrderId},
    events::EventProducers,
    order_objects::FullOrder,
    test_utils::{create_database, random_db_path, run_migrations},
    AccountApi,
    CartApi,
    CatalogApi,
    CouponApi,
    OrderFlowApi,
    ShopError,
    SqliteDatabase,
    WalletApi,
};

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub system: Option<ShopSystem>,
    pub categories: HashMap<String, i64>,
    pub products: HashMap<String, i64>,
    pub offers: HashMap<String, i64>,
    pub coupons: HashMap<String, i64>,
    pub addresses: HashMap<String, i64>,
    pub last_order: Option<FullOrder>,
    pub last_refund: Option<Money>,
    pub last_error: Option<ShopError>,
}

#[derive(Debug)]
pub struct ShopSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub carts: CartApi<SqliteDatabase>,
    pub catalog: CatalogApi<SqliteDatabase>,
    pub coupons: CouponApi<SqliteDatabase>,
    pub accounts: AccountApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
}

impl ShopSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        Self {
            db_path: url,
            orders: OrderFlowApi::new(db.clone(), EventProducers::default()),
            carts: CartApi::new(db.clone()),
            catalog: CatalogApi::new(db.clone()),
            coupons: CouponApi::new(db.clone()),
            accounts: AccountApi::new(db.clone()),
            wallets: WalletApi::new(db.clone()),
            db,
        }
    }
}

impl ShopWorld {
    pub fn system(&self) -> &ShopSystem {
        self.system.as_ref().expect("Shop system not initialised")
    }

    pub fn product_id(&self, name: &str) -> i64 {
        *self.products.get(name).unwrap_or_else(|| panic!("Unknown product {name}"))
    }

    pub fn category_id(&self, name: &str) -> i64 {
        *self.categories.get(name).unwrap_or_else(|| panic!("Unknown category {name}"))
    }

    pub fn order_id(&self) -> OrderId {
        self.last_order.as_ref().expect("No order has been placed").id()
    }

    /// The id of the order item for the named product in the last order
    pub fn item_id(&self, product: &str) -> i64 {
        let order = self.last_order.as_ref().expect("No order has been placed");
        order.items.iter().find(|i| i.name == product).unwrap_or_else(|| panic!("{product} is not in the order")).id
    }

    /// Gives the user a delivery address the first time one is needed.
    pub async fn address_for(&mut self, user: &str) -> i64 {
        if let Some(id) = self.addresses.get(user) {
            return *id;
        }
        let address = NewAddress {
            name: user.to_string(),
            phone: "9845012345".into(),
            locality: "MG Road".into(),
            district: "Bengaluru".into(),
            state: "Karnataka".into(),
            pincode: "560001".into(),
        };
        let address = self.system().accounts.add_address(user, address).await.expect("Error adding address");
        self.addresses.insert(user.to_string(), address.id);
        address.id
    }

    pub fn record<T>(&mut self, result: Result<T, ShopError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Step failed with {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
