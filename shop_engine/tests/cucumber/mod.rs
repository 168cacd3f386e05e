mod setups;
mod shop_world;
mod steps;

pub use shop_world::ShopWorld;
