// Generic REST operations shared by every resource module.
//
// Paths follow the backend conventions:
//   GET    /{resource}?page=&per_page=&search=
//   GET    /{resource}/{id}
//   POST   /{resource}
//   PUT    /{resource}/{id}
//   DELETE /{resource}/{id}
//   PATCH  /{resource}/{id}/toggle-status
//   POST   /{resource}/{id}/{action}         (post, accept, reject, ...)
//   GET    /{resource}/tree                  (accounts, cost centers)

use chrono::NaiveDate;
use serde_json::Value;

use crate::client::ApiClient;
use crate::envelope::{self, Mutation, Page};
use crate::error::Error;

// ── Query types ──────────────────────────────────────────────────────

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    /// Resource-specific filters (`status=draft`, `employee_id=4`, ...).
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Render as query pairs. Blank search text is omitted.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(3 + self.filters.len());
        if let Some(page) = self.page {
            params.push(("page".into(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page".into(), per_page.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search".into(), search.to_owned()));
        }
        params.extend(self.filters.iter().cloned());
        params
    }
}

/// Parameters of `GET /exchange-rates/effective`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRateQuery {
    pub currency_id: String,
    pub date: Option<NaiveDate>,
}

impl EffectiveRateQuery {
    fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("currency_id".to_owned(), self.currency_id.clone())];
        if let Some(date) = self.date {
            params.push(("date".into(), date.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

// ── Operations ───────────────────────────────────────────────────────

impl ApiClient {
    /// List one page of a resource.
    pub async fn list(&self, resource: &str, query: &ListQuery) -> Result<Page, Error> {
        let value = self.get_with_params(resource, &query.to_params()).await?;
        envelope::page_from_value(value)
    }

    /// Fetch a single record by id.
    pub async fn fetch(&self, resource: &str, id: &str) -> Result<Value, Error> {
        let value = self.get(&format!("{resource}/{id}")).await?;
        Ok(envelope::unwrap_single(value))
    }

    pub async fn create(&self, resource: &str, body: &Value) -> Result<Mutation, Error> {
        let value = self.post(resource, body).await?;
        Ok(envelope::mutation_from_value(value))
    }

    pub async fn update(&self, resource: &str, id: &str, body: &Value) -> Result<Mutation, Error> {
        let value = self.put(&format!("{resource}/{id}"), body).await?;
        Ok(envelope::mutation_from_value(value))
    }

    pub async fn remove(&self, resource: &str, id: &str) -> Result<Mutation, Error> {
        let value = self.delete(&format!("{resource}/{id}")).await?;
        Ok(envelope::mutation_from_value(value))
    }

    /// Flip an entity's active flag without a full update payload.
    pub async fn toggle_status(&self, resource: &str, id: &str) -> Result<Mutation, Error> {
        let value = self
            .patch(&format!("{resource}/{id}/toggle-status"), &serde_json::json!({}))
            .await?;
        Ok(envelope::mutation_from_value(value))
    }

    /// Domain action endpoint such as `journal-entries/{id}/post`.
    pub async fn action(
        &self,
        resource: &str,
        id: &str,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Mutation, Error> {
        let empty = serde_json::json!({});
        let value = self
            .post(&format!("{resource}/{id}/{action}"), body.unwrap_or(&empty))
            .await?;
        Ok(envelope::mutation_from_value(value))
    }

    /// Full hierarchy of a tree resource (accounts, cost centers).
    pub async fn tree(&self, resource: &str) -> Result<Vec<Value>, Error> {
        let value = self.get(&format!("{resource}/tree")).await?;
        Ok(envelope::page_from_value(value)?.items)
    }

    /// Rate in force for a currency on a date (today when omitted).
    pub async fn effective_exchange_rate(&self, query: &EffectiveRateQuery) -> Result<Value, Error> {
        let value = self
            .get_with_params("exchange-rates/effective", &query.to_params())
            .await?;
        Ok(envelope::unwrap_single(value))
    }

    /// Current role → account links.
    pub async fn account_links(&self) -> Result<Vec<Value>, Error> {
        let value = self.get("account-links").await?;
        Ok(envelope::page_from_value(value)?.items)
    }

    /// Submit a batch of account-link changes (`{links: [{key, account_id}]}`).
    pub async fn save_account_links(&self, links: &Value) -> Result<Mutation, Error> {
        let value = self
            .post("account-links", &serde_json::json!({ "links": links }))
            .await?;
        Ok(envelope::mutation_from_value(value))
    }
}
