// REST repository implementation - PostgREST-style tables over HTTP
use crate::application::dashboard_repository::{
    DashboardDraft, DashboardRepository, DashboardRow, TemplateRow, VersionRow,
};
use crate::domain::data_source::DataSource;
use crate::domain::ids::DashboardId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const DASHBOARDS: &str = "dashboards";
const VERSIONS: &str = "dashboard_versions";
const TEMPLATES: &str = "dashboard_templates";
const DATA_SOURCES: &str = "data_sources";

#[derive(Debug, Clone)]
pub struct RestDashboardRepository {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: DashboardId,
}

#[derive(Debug, Deserialize)]
struct VersionNumber {
    version_number: u32,
}

impl RestDashboardRepository {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// `<base>/rest/v1/<table>?k=v&...` with encoded values.
    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    async fn check(response: Response, table: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Request to {} failed with status {}: {}", table, status, body);
        }
        Ok(response)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let url = self.table_url(table, query);
        tracing::debug!("GET {}", url);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", table))?;

        Self::check(response, table)
            .await?
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("Failed to parse {} response", table))
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<Response> {
        let url = self.table_url(table, query);
        tracing::debug!("{} {}", method, url);
        let response = self
            .request(method, &url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", table))?;
        Self::check(response, table).await
    }
}

#[async_trait]
impl DashboardRepository for RestDashboardRepository {
    async fn insert_dashboard(&self, draft: &DashboardDraft) -> Result<DashboardId> {
        let rows = self
            .write(Method::POST, DASHBOARDS, &[("select", "id")], draft)
            .await?
            .json::<Vec<IdOnly>>()
            .await
            .context("Failed to parse inserted dashboard")?;

        match rows.into_iter().next() {
            Some(row) => Ok(row.id),
            None => anyhow::bail!("Insert into {} returned no row", DASHBOARDS),
        }
    }

    async fn update_dashboard(&self, id: &DashboardId, draft: &DashboardDraft) -> Result<()> {
        let filter = format!("eq.{}", id);
        let rows = self
            .write(Method::PATCH, DASHBOARDS, &[("id", filter.as_str()), ("select", "id")], draft)
            .await?
            .json::<Vec<IdOnly>>()
            .await
            .context("Failed to parse updated dashboard")?;

        if rows.is_empty() {
            anyhow::bail!("Dashboard {} does not exist", id);
        }
        Ok(())
    }

    async fn get_dashboard(&self, id: &DashboardId) -> Result<Option<DashboardRow>> {
        let filter = format!("eq.{}", id);
        let rows = self
            .select::<DashboardRow>(DASHBOARDS, &[("select", "*"), ("id", filter.as_str())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardRow>> {
        self.select(DASHBOARDS, &[("select", "*"), ("order", "updated_at.desc")])
            .await
    }

    async fn latest_version(&self, id: &DashboardId) -> Result<Option<u32>> {
        let filter = format!("eq.{}", id);
        let rows = self
            .select::<VersionNumber>(
                VERSIONS,
                &[
                    ("select", "version_number"),
                    ("dashboard_id", filter.as_str()),
                    ("order", "version_number.desc"),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows.first().map(|row| row.version_number))
    }

    async fn append_version(&self, version: &VersionRow) -> Result<()> {
        self.write(Method::POST, VERSIONS, &[], version).await?;
        Ok(())
    }

    async fn list_versions(&self, id: &DashboardId) -> Result<Vec<VersionRow>> {
        let filter = format!("eq.{}", id);
        self.select(
            VERSIONS,
            &[
                ("select", "*"),
                ("dashboard_id", filter.as_str()),
                ("order", "version_number.desc"),
            ],
        )
        .await
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        self.select(DATA_SOURCES, &[("select", "*"), ("order", "created_at.desc")])
            .await
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRow>> {
        self.select(
            TEMPLATES,
            &[("select", "*"), ("order", "is_featured.desc,created_at.desc")],
        )
        .await
    }

    async fn insert_template(&self, template: &TemplateRow) -> Result<()> {
        self.write(Method::POST, TEMPLATES, &[], template).await?;
        Ok(())
    }
}
