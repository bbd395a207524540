use clap::ValueEnum;
use serde_json::Value;

use crate::error::GatewayResult;
use crate::gateway::{ApiRequest, Gateway};

/// Percent-encode a caller-supplied id for use as one path segment
fn path_segment(raw: &str) -> String {
    // form encoding writes spaces as '+' and escapes a literal '+'
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Top-level CRUD collections exposed by the TourDesk API
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    Companies,
    Users,
    Vehicles,
    Drivers,
    Customers,
    Trips,
    Sales,
    Accessories,
    Events,
    Notifications,
    Settings,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Companies => "/companies",
            Resource::Users => "/users",
            Resource::Vehicles => "/vehicles",
            Resource::Drivers => "/drivers",
            Resource::Customers => "/customers",
            Resource::Trips => "/trips",
            Resource::Sales => "/sales",
            Resource::Accessories => "/accessories",
            Resource::Events => "/events",
            Resource::Notifications => "/notifications",
            Resource::Settings => "/settings",
        }
    }
}

/// Collections nested under a single sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SaleLink {
    Payments,
    Accessories,
    Customers,
}

impl SaleLink {
    pub fn segment(&self) -> &'static str {
        match self {
            SaleLink::Payments => "payments",
            SaleLink::Accessories => "accessories",
            SaleLink::Customers => "customers",
        }
    }
}

/// Search and pagination for list views
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            request = request.with_query("search", search);
        }
        if let Some(page) = self.page {
            request = request.with_query("page", page);
        }
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit);
        }
        request
    }
}

pub struct ResourceApi<'a> {
    gateway: &'a Gateway,
    resource: Resource,
}

impl<'a> ResourceApi<'a> {
    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.resource.path(), path_segment(id))
    }

    pub async fn list(&self, query: &ListQuery) -> GatewayResult<Value> {
        let request = query.apply(ApiRequest::get(self.resource.path()));
        self.gateway.dispatch(request).await
    }

    pub async fn get(&self, id: &str) -> GatewayResult<Value> {
        self.gateway.dispatch(ApiRequest::get(self.item_path(id))).await
    }

    pub async fn create(&self, body: Value) -> GatewayResult<Value> {
        self.gateway
            .dispatch(ApiRequest::post(self.resource.path()).with_body(body))
            .await
    }

    pub async fn update(&self, id: &str, body: Value) -> GatewayResult<Value> {
        self.gateway
            .dispatch(ApiRequest::put(self.item_path(id)).with_body(body))
            .await
    }

    pub async fn delete(&self, id: &str) -> GatewayResult<Value> {
        self.gateway.dispatch(ApiRequest::delete(self.item_path(id))).await
    }
}

pub struct SaleLinkApi<'a> {
    gateway: &'a Gateway,
    sale_id: String,
    link: SaleLink,
}

impl<'a> SaleLinkApi<'a> {
    fn path(&self) -> String {
        format!("/sales/{}/{}", path_segment(&self.sale_id), self.link.segment())
    }

    pub async fn list(&self) -> GatewayResult<Value> {
        self.gateway.dispatch(ApiRequest::get(self.path())).await
    }

    pub async fn add(&self, body: Value) -> GatewayResult<Value> {
        self.gateway
            .dispatch(ApiRequest::post(self.path()).with_body(body))
            .await
    }

    pub async fn remove(&self, item_id: &str) -> GatewayResult<Value> {
        self.gateway
            .dispatch(ApiRequest::delete(format!("{}/{}", self.path(), path_segment(item_id))))
            .await
    }
}

impl Gateway {
    pub fn resource(&self, resource: Resource) -> ResourceApi<'_> {
        ResourceApi {
            gateway: self,
            resource,
        }
    }

    pub fn sale_links(&self, sale_id: impl Into<String>, link: SaleLink) -> SaleLinkApi<'_> {
        SaleLinkApi {
            gateway: self,
            sale_id: sale_id.into(),
            link,
        }
    }

    /// `GET /dashboard/stats`
    pub async fn dashboard_stats(&self) -> GatewayResult<Value> {
        self.dispatch(ApiRequest::get("/dashboard/stats")).await
    }

    /// `GET /activities/recent`
    pub async fn recent_activity(&self, limit: Option<u32>) -> GatewayResult<Value> {
        let mut request = ApiRequest::get("/activities/recent");
        if let Some(limit) = limit {
            request = request.with_query("limit", limit);
        }
        self.dispatch(request).await
    }

    /// `PUT /notifications/{id}/read`
    pub async fn mark_notification_read(&self, id: &str) -> GatewayResult<Value> {
        self.dispatch(ApiRequest::put(format!("/notifications/{}/read", path_segment(id))))
            .await
    }
}
