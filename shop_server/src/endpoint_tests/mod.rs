mod admin;
mod cart;
mod gateway;
mod health;
mod helpers;
mod mocks;
mod orders;
mod reports;
