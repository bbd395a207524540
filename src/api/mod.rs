pub mod auth;
pub mod resources;

pub use auth::AuthApi;
pub use resources::{ListQuery, Resource, ResourceApi, SaleLink, SaleLinkApi};
