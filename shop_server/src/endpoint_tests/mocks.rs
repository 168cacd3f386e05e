use mockall::mock;
use shop_common::Money;
use shop_engine::{
    db_types::{
        Address,
        AddressUpdate,
        Cart,
        NewAddress,
        Order,
        OrderId,
        OrderStatus,
        PaymentStatus,
        QuantityAction,
        ReturnDecision,
        User,
    },
    order_objects::{CheckoutRequest, FullOrder, OrderQueryFilter, PlacedOrder, SettlementResult},
    policy::ShopPolicy,
    report_objects::{OrderSale, ReportWindow, SalesTotals, TopSeller},
    shop_api::{cart_objects::CartView, wallet_objects::ReferralOutcome},
    traits::{AccountManagement, CartManagement, OrderFlowManagement, SalesReporting},
    ShopError,
};

mock! {
    pub CartManager {}
    impl CartManagement for CartManager {
        async fn add_to_cart(&self, user_id: &str, product_id: i64, quantity: i64, policy: &ShopPolicy) -> Result<Cart, ShopError>;
        async fn fetch_cart(&self, user_id: &str) -> Result<CartView, ShopError>;
        async fn remove_from_cart(&self, user_id: &str, item_id: i64) -> Result<Cart, ShopError>;
        async fn update_cart_quantity(&self, user_id: &str, item_id: i64, action: QuantityAction, policy: &ShopPolicy) -> Result<Cart, ShopError>;
    }
}

mock! {
    pub OrderFlowManager {}
    impl Clone for OrderFlowManager {
        fn clone(&self) -> Self;
    }
    impl OrderFlowManagement for OrderFlowManager {
        fn url(&self) -> &str;
        async fn place_order(&self, user_id: &str, request: CheckoutRequest, policy: &ShopPolicy) -> Result<PlacedOrder, ShopError>;
        async fn fetch_order(&self, id: OrderId) -> Result<Option<FullOrder>, ShopError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, ShopError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, ShopError>;
        async fn cancel_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;
        async fn cancel_order_item(&self, id: OrderId, item_id: i64, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;
        async fn request_item_return(&self, id: OrderId, item_id: i64, reason: &str) -> Result<FullOrder, ShopError>;
        async fn resolve_return(&self, id: OrderId, item_id: i64, decision: ReturnDecision, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;
        async fn return_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;
        async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<FullOrder, ShopError>;
        async fn update_item_status(&self, id: OrderId, item_id: i64, status: OrderStatus) -> Result<FullOrder, ShopError>;
        async fn update_payment_status(&self, id: OrderId, status: PaymentStatus, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;
        async fn record_charge(&self, id: OrderId, charge_id: &str, amount: Money) -> Result<Order, ShopError>;
    }
}

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn fetch_or_create_user(&self, user_id: &str) -> Result<User, ShopError>;
        async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ShopError>;
        async fn set_user_blocked(&self, user_id: &str, blocked: bool) -> Result<User, ShopError>;
        async fn add_address(&self, user_id: &str, address: NewAddress) -> Result<Address, ShopError>;
        async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, ShopError>;
        async fn update_address(&self, user_id: &str, address_id: i64, update: AddressUpdate) -> Result<Address, ShopError>;
        async fn delete_address(&self, user_id: &str, address_id: i64) -> Result<(), ShopError>;
        async fn apply_referral(&self, user_id: &str, code: &str, policy: &ShopPolicy) -> Result<ReferralOutcome, ShopError>;
    }
}

mock! {
    pub SalesReporter {}
    impl SalesReporting for SalesReporter {
        async fn fetch_sales_totals(&self, window: ReportWindow) -> Result<SalesTotals, ShopError>;
        async fn fetch_order_sales(&self, window: ReportWindow, page: Option<(i64, i64)>) -> Result<Vec<OrderSale>, ShopError>;
        async fn fetch_top_products(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError>;
        async fn fetch_top_categories(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError>;
    }
}
