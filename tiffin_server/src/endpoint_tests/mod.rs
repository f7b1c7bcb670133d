mod admin;
mod helpers;
mod mocks;
mod orders;
mod wallet;
mod webhooks;
