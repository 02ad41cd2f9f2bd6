use async_trait::async_trait;
use serde_json::Value;

use querysmith_core::api::{SchemaSource, SourceConfig, TableDescription};

use crate::http::{auth, build_client, join_url, parse_json_response, HttpError};

/// Table describes over HTTP: `GET {base_url}{describe_path}`.
pub struct HttpSchemaSource {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    describe_path: String,
}

impl HttpSchemaSource {
    pub fn new(cfg: &SourceConfig) -> anyhow::Result<Self> {
        if !cfg.describe_path.contains("{table}") {
            anyhow::bail!("source.describe_path must contain {{table}}");
        }
        Ok(Self {
            http: build_client(cfg.timeout_ms)?,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.clone(),
            describe_path: cfg.describe_path.clone(),
        })
    }

    fn describe_url(&self, table: &str) -> String {
        join_url(&self.base_url, &self.describe_path.replace("{table}", table))
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn describe(&self, table: &str) -> anyhow::Result<TableDescription> {
        let url = self.describe_url(table);
        tracing::debug!(target: "querysmith.source", stage = "source.describe.in", url = %url);
        let resp = auth(self.http.get(&url), &self.api_key)
            .send()
            .await
            .map_err(|err| HttpError::transport(url.clone(), err))?;
        let mut value = parse_json_response(resp).await?;
        // Some services omit the name on single-table describes.
        if let Value::Object(map) = &mut value {
            map.entry("name")
                .or_insert_with(|| Value::String(table.to_string()));
        }
        let description: TableDescription = serde_json::from_value(value)
            .map_err(|e| anyhow::anyhow!("describe of {table} has an unexpected shape: {e}"))?;
        tracing::debug!(
            target: "querysmith.source",
            stage = "source.describe.out",
            table = %description.name,
            fields = description.fields.len()
        );
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use pretty_assertions::assert_eq;

    fn config(base_url: String) -> SourceConfig {
        SourceConfig {
            base_url,
            ..SourceConfig::default()
        }
    }

    #[test]
    fn test_describe_path_requires_placeholder() {
        let cfg = SourceConfig {
            describe_path: "/describe".to_string(),
            ..SourceConfig::default()
        };
        assert!(HttpSchemaSource::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn test_describe_parses_fields() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/schema/Account/describe")
            .with_status(200)
            .with_body(
                r#"{"fields":[{"name":"Id","type":"id"},{"name":"Industry","type":"picklist","picklistValues":[{"value":"Technology","active":true}]}],
                    "childRelationships":[{"childSObject":"Contact","field":"AccountId","relationshipName":"Contacts"}]}"#,
            )
            .create_async()
            .await;

        let source = HttpSchemaSource::new(&config(server.url())).unwrap();
        let described = source.describe("Account").await.unwrap();
        assert_eq!(described.name, "Account");
        assert_eq!(described.fields.len(), 2);
        assert_eq!(described.fields[1].picklist_values, vec!["Technology".to_string()]);
        assert_eq!(described.child_relationships[0].child_table, "Contact");
    }

    #[tokio::test]
    async fn test_describe_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/schema/Nope/describe")
            .with_status(404)
            .with_body(r#"{"error":"NOT_FOUND"}"#)
            .create_async()
            .await;

        let source = HttpSchemaSource::new(&config(server.url())).unwrap();
        let err = source.describe("Nope").await.unwrap_err();
        assert_eq!(err.downcast_ref::<HttpError>().and_then(HttpError::status), Some(404));
    }
}
