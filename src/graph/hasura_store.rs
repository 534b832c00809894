//! GraphQL client for a Hasura-backed links store
//!
//! Links carry their payload in a separate `strings` table, reachable both
//! directly and through the `value` relationship on `links`. Type ids are not
//! resolved by name here; they come from configuration.

use crate::core::config::{GraphConfig, ResolvedTypeIds};
use crate::core::error::{PublishError, Result};
use crate::core::traits::GraphStore;
use crate::graph::types::{LinkId, PackageRecord, VersionRecord};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

const LINK_VALUE_QUERY: &str = r#"query LinkValue($id: bigint!) {
  links(where: {id: {_eq: $id}}) { id value }
}"#;

const PACKAGE_NAME_QUERY: &str = r#"query PackageName($id: bigint!) {
  strings(where: {link_id: {_eq: $id}}) { value }
}"#;

const PACKAGE_VERSION_QUERY: &str = r#"query PackageVersion($package: bigint!, $type: bigint!) {
  links(where: {type_id: {_eq: $type}, to_id: {_eq: $package}}) { id value }
}"#;

const TOKENS_QUERY: &str = r#"query Tokens($actor: bigint!, $tree: bigint!, $type: bigint!) {
  links(where: {type_id: {_eq: $type}, up: {tree_id: {_eq: $tree}, parent_id: {_eq: $actor}}}) { id value }
}"#;

const UPDATE_VERSION_MUTATION: &str = r#"mutation UpdatePackageVersion($package: bigint!, $type: bigint!, $version: String!) {
  update_strings(where: {link: {type_id: {_eq: $type}, to_id: {_eq: $package}}}, _set: {value: $version}) { affected_rows }
}"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LinksData {
    links: Vec<LinkRow>,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    id: LinkId,
    value: Option<ValueRow>,
}

#[derive(Debug, Deserialize)]
struct ValueRow {
    value: serde_json::Value,
}

impl LinkRow {
    fn string_value(&self) -> Option<String> {
        match self.value.as_ref().map(|v| &v.value) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StringsData {
    strings: Vec<StringRow>,
}

#[derive(Debug, Deserialize)]
struct StringRow {
    value: String,
}

#[derive(Debug, Deserialize)]
struct UpdateStringsData {
    update_strings: AffectedRows,
}

#[derive(Debug, Deserialize)]
struct AffectedRows {
    affected_rows: u64,
}

/// Graph store speaking GraphQL over HTTP
pub struct HasuraGraphStore {
    client: reqwest::Client,
    url: String,
    secret: Option<SecretString>,
    types: ResolvedTypeIds,
}

impl HasuraGraphStore {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| PublishError::ConfigError("graph.url is not set".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            secret: config
                .secret
                .as_ref()
                .map(|s| SecretString::new(s.clone().into())),
            types: config.types.resolve()?,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let mut request = self.client.post(&self.url).json(&GraphQlRequest { query, variables });
        if let Some(ref secret) = self.secret {
            request = request.header(ADMIN_SECRET_HEADER, secret.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::data_store(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::data_store(format!(
                "GraphQL endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .json::<GraphQlResponse<T>>()
            .await
            .map_err(|e| PublishError::data_store(e.to_string()))?;

        into_data(body)
    }
}

fn into_data<T>(body: GraphQlResponse<T>) -> Result<T> {
    if !body.errors.is_empty() {
        let messages = body
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PublishError::data_store(messages));
    }

    body.data
        .ok_or_else(|| PublishError::data_store("GraphQL response has no data"))
}

#[async_trait]
impl GraphStore for HasuraGraphStore {
    async fn link_value(&self, link_id: LinkId) -> Result<Option<String>> {
        let data: LinksData = self.execute(LINK_VALUE_QUERY, json!({ "id": link_id })).await?;
        Ok(data.links.first().and_then(LinkRow::string_value))
    }

    async fn package(&self, package_id: LinkId) -> Result<Option<PackageRecord>> {
        let data: StringsData = self
            .execute(PACKAGE_NAME_QUERY, json!({ "id": package_id }))
            .await?;

        Ok(data.strings.into_iter().next().map(|row| PackageRecord {
            id: package_id,
            name: row.value,
        }))
    }

    async fn package_version(&self, package_id: LinkId) -> Result<Option<VersionRecord>> {
        let data: LinksData = self
            .execute(
                PACKAGE_VERSION_QUERY,
                json!({ "package": package_id, "type": self.types.package_version }),
            )
            .await?;

        Ok(data.links.iter().find_map(|row| {
            row.string_value().map(|version| VersionRecord {
                id: row.id,
                version,
            })
        }))
    }

    async fn find_tokens(&self, actor_id: LinkId) -> Result<Vec<SecretString>> {
        let data: LinksData = self
            .execute(
                TOKENS_QUERY,
                json!({
                    "actor": actor_id,
                    "tree": self.types.contain_tree,
                    "type": self.types.token,
                }),
            )
            .await?;

        Ok(data
            .links
            .iter()
            .filter_map(LinkRow::string_value)
            .map(|token| SecretString::new(token.into()))
            .collect())
    }

    async fn update_package_version(&self, package_id: LinkId, version: &str) -> Result<()> {
        let data: UpdateStringsData = self
            .execute(
                UPDATE_VERSION_MUTATION,
                json!({
                    "package": package_id,
                    "type": self.types.package_version,
                    "version": version,
                }),
            )
            .await?;

        if data.update_strings.affected_rows == 0 {
            return Err(PublishError::data_store(format!(
                "no version record updated for package {}",
                package_id
            )));
        }

        Ok(())
    }
}
