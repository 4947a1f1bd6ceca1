//! Spatial query client: builds feature-service query URLs and performs the
//! network fetch, normalizing transport and body failures into [`SyncError`].

use roadlens_protocol::Envelope;
use roadlens_protocol::ErrorBody;
use roadlens_protocol::FeaturesResponse;
use roadlens_protocol::GEOMETRY_TYPE;
use roadlens_protocol::IN_SR;
use roadlens_protocol::OUT_SR;
use roadlens_protocol::ObjectIdsResponse;
use roadlens_protocol::SPATIAL_REL;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::SyncError;

/// Which of the three query shapes to issue.
#[derive(Clone, Debug)]
pub enum QueryKind {
    /// `returnCountOnly=true`
    Count,
    /// `returnIdsOnly=true`
    Ids,
    /// Full page: geometry, out fields, optional simplification.
    Page {
        out_fields: Vec<String>,
        max_allowable_offset: Option<f64>,
    },
}

/// Parameters for one query against one layer.
#[derive(Clone, Debug)]
pub struct QuerySpec {
    pub kind: QueryKind,
    pub envelope: Envelope,
    /// AND-joined `where` clauses; empty means no `where` parameter.
    pub where_clauses: Vec<String>,
}

impl QuerySpec {
    pub fn count(envelope: Envelope) -> Self {
        Self {
            kind: QueryKind::Count,
            envelope,
            where_clauses: Vec::new(),
        }
    }

    pub fn ids(envelope: Envelope) -> Self {
        Self {
            kind: QueryKind::Ids,
            envelope,
            where_clauses: Vec::new(),
        }
    }

    pub fn page(
        envelope: Envelope,
        out_fields: Vec<String>,
        max_allowable_offset: Option<f64>,
    ) -> Self {
        Self {
            kind: QueryKind::Page {
                out_fields,
                max_allowable_offset,
            },
            envelope,
            where_clauses: Vec::new(),
        }
    }

    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clauses.push(clause.into());
        self
    }
}

/// Builds the GET URL for `{base}{layer_id}/query`.
pub fn build_url(base_url: &str, layer_id: u32, spec: &QuerySpec) -> Result<Url, SyncError> {
    let endpoint = format!("{base_url}{layer_id}/query");
    let mut url =
        Url::parse(&endpoint).map_err(|err| SyncError::Parse(format!("bad endpoint: {err}")))?;

    let geometry = serde_json::to_string(&spec.envelope)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("f", "json")
            .append_pair("spatialRel", SPATIAL_REL)
            .append_pair("geometryType", GEOMETRY_TYPE)
            .append_pair("inSR", &IN_SR.to_string())
            .append_pair("outSR", &OUT_SR.to_string())
            .append_pair("geometry", &geometry);

        if !spec.where_clauses.is_empty() {
            pairs.append_pair("where", &spec.where_clauses.join(" AND "));
        }

        match &spec.kind {
            QueryKind::Count => {
                pairs.append_pair("returnCountOnly", "true");
            }
            QueryKind::Ids => {
                pairs.append_pair("returnIdsOnly", "true");
            }
            QueryKind::Page {
                out_fields,
                max_allowable_offset,
            } => {
                pairs
                    .append_pair("returnGeometry", "true")
                    .append_pair("outFields", &out_fields.join(","));
                if let Some(offset) = max_allowable_offset {
                    pairs.append_pair("maxAllowableOffset", &offset.to_string());
                }
            }
        }
    }
    Ok(url)
}

/// Inclusive id-range clause for one page.
pub fn id_range_clause(object_id_field: &str, first: i64, last: i64) -> String {
    format!("{object_id_field} >= {first} AND {object_id_field} <= {last}")
}

/// Thin wrapper over a shared HTTP client. One instance serves every
/// partition; requests carry no auth and are never retried.
#[derive(Clone, Default)]
pub struct SpatialQueryClient {
    http: reqwest::Client,
}

impl SpatialQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch_ids(&self, url: Url) -> Result<ObjectIdsResponse, SyncError> {
        let body = self.fetch(url).await?;
        parse_body(&body)
    }

    pub async fn fetch_features(&self, url: Url) -> Result<FeaturesResponse, SyncError> {
        let body = self.fetch(url).await?;
        parse_body(&body)
    }

    /// One GET. Non-2xx becomes [`SyncError::Transport`]; the caller decides
    /// what a failed page means (nothing aborts sibling pages here).
    async fn fetch(&self, url: Url) -> Result<String, SyncError> {
        debug!(%url, "spatial query");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Transport {
                status: Some(status),
                message: format!("query returned {status}"),
            });
        }
        Ok(response.text().await?)
    }
}

/// The service reports failures inside a 200 body; surface those as parse
/// errors before attempting the typed decode.
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, SyncError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if let Some(error) = value.get("error") {
        let error: ErrorBody = serde_json::from_value(error.clone())?;
        return Err(SyncError::Parse(format!(
            "service error {}: {}",
            error.code, error.message
        )));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn query_params(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn ids_url_carries_fixed_constants() {
        let spec = QuerySpec::ids(Envelope::new(0.0, 0.0, 1.0, 1.0));
        let url = build_url("https://example.test/MapServer/", 3, &spec).expect("url");
        assert!(url.path().ends_with("/MapServer/3/query"));
        let params = query_params(&url);
        assert_eq!(params["f"], "json");
        assert_eq!(params["spatialRel"], "esriSpatialRelIntersects");
        assert_eq!(params["geometryType"], "esriGeometryEnvelope");
        assert_eq!(params["inSR"], "102100");
        assert_eq!(params["outSR"], "3857");
        assert_eq!(params["returnIdsOnly"], "true");
        assert!(!params.contains_key("where"));
        assert!(params["geometry"].contains("\"wkid\":102100"));
    }

    #[test]
    fn count_url_requests_count_only() {
        let spec = QuerySpec::count(Envelope::new(0.0, 0.0, 1.0, 1.0));
        let url = build_url("https://example.test/MapServer/", 1, &spec).expect("url");
        let params = query_params(&url);
        assert_eq!(params["returnCountOnly"], "true");
        assert!(!params.contains_key("returnIdsOnly"));
        assert!(!params.contains_key("returnGeometry"));
    }

    #[test]
    fn where_clauses_join_with_and() {
        let spec = QuerySpec::page(Envelope::new(0.0, 0.0, 1.0, 1.0), vec!["OBJECTID".into()], None)
            .with_clause("SURFACE_TYPE_CD < 6")
            .with_clause(id_range_clause("OBJECTID", 10, 90));
        let url = build_url("https://example.test/MapServer/", 0, &spec).expect("url");
        let params = query_params(&url);
        assert_eq!(
            params["where"],
            "SURFACE_TYPE_CD < 6 AND OBJECTID >= 10 AND OBJECTID <= 90"
        );
        assert_eq!(params["returnGeometry"], "true");
        assert!(!params.contains_key("maxAllowableOffset"));
    }

    #[test]
    fn page_url_includes_offset_and_fields() {
        let spec = QuerySpec::page(
            Envelope::new(0.0, 0.0, 1.0, 1.0),
            vec!["OBJECTID".into(), "SURFACE_TYPE_CD".into()],
            Some(2.4),
        );
        let url = build_url("https://example.test/MapServer/", 0, &spec).expect("url");
        let params = query_params(&url);
        assert_eq!(params["maxAllowableOffset"], "2.4");
        assert_eq!(params["outFields"], "OBJECTID,SURFACE_TYPE_CD");
    }

    #[test]
    fn service_error_body_is_a_parse_failure() {
        let body = r#"{"error":{"code":400,"message":"Invalid geometry"}}"#;
        let result: Result<ObjectIdsResponse, SyncError> = parse_body(body);
        match result {
            Err(SyncError::Parse(message)) => {
                assert!(message.contains("Invalid geometry"), "message: {message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
