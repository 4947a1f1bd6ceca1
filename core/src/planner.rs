//! Paginated fetch planner: discovers the id set for one partition/layer,
//! slices it into bounded ranges, and fetches every range concurrently.

use futures::future::join_all;
use roadlens_protocol::Envelope;
use roadlens_protocol::RoadVector;
use tracing::debug;
use tracing::warn;

use std::sync::Arc;

use crate::error::SyncError;
use crate::query::QuerySpec;
use crate::query::SpatialQueryClient;
use crate::query::build_url;
use crate::query::id_range_clause;
use crate::registry::Layer;
use crate::registry::Partition;
use crate::sync::SyncRound;
use crate::transform::to_vectors;

/// Upper bound on records per page regardless of what the layer claims to
/// support.
pub const HARD_PAGE_CAP: usize = 1000;

/// Scope of one request chain: one partition/layer pair within one round.
pub struct FetchContext<'a> {
    pub round: Arc<SyncRound>,
    pub partition: &'a Partition,
    pub layer: &'a Layer,
    pub envelope: Envelope,
    pub zoom: u32,
    /// Snapshot of the street-highlighting setting taken at round start.
    pub highlight_streets: bool,
}

/// Inclusive id range covering one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    pub first: i64,
    pub last: i64,
}

/// Partitions an id set into contiguous inclusive ranges of at most
/// `page_size` ids. Ids are sorted ascending first; the service does not
/// guarantee ordering, and deterministic slicing requires it. The ranges
/// cover the set exactly: no gaps, no overlaps, and a boundary id never
/// appears in two ranges.
pub fn plan_ranges(mut ids: Vec<i64>, page_size: usize) -> Vec<IdRange> {
    if ids.is_empty() || page_size == 0 {
        return Vec::new();
    }
    ids.sort_unstable();
    ids.dedup();
    ids.chunks(page_size)
        .filter_map(|chunk| match (chunk.first(), chunk.last()) {
            (Some(&first), Some(&last)) => Some(IdRange { first, last }),
            _ => None,
        })
        .collect()
}

/// Effective page size for a layer.
pub fn page_size(layer: &Layer) -> usize {
    layer.max_page_size.min(HARD_PAGE_CAP)
}

/// Fetches every feature for one partition/layer in the current viewport
/// and maps them to renderable vectors.
///
/// Page failures are isolated: a failed range logs a warning and
/// contributes nothing, never aborting sibling ranges. A cancelled round
/// short-circuits with [`SyncError::Cancelled`], which the caller treats
/// as quietly dropped work rather than a failure.
pub async fn fetch_layer(
    client: &SpatialQueryClient,
    ctx: &FetchContext<'_>,
) -> Result<Vec<RoadVector>, SyncError> {
    if ctx.round.is_cancelled() {
        return Err(SyncError::Cancelled);
    }

    if !ctx.layer.supports_pagination {
        return fetch_page(client, ctx, None).await;
    }

    let mut ids_spec = QuerySpec::ids(ctx.envelope);
    if let Some(clause) = ctx.partition.filter.clause(ctx.zoom) {
        ids_spec = ids_spec.with_clause(clause);
    }
    let ids_url = build_url(&ctx.partition.base_url, ctx.layer.id, &ids_spec)?;
    let ids = client.fetch_ids(ids_url).await?;
    ctx.round.record_completed_request();

    let ranges = plan_ranges(ids.object_ids, page_size(ctx.layer));
    if ranges.is_empty() {
        debug!(
            partition = ctx.partition.code,
            layer = ctx.layer.id,
            "no features in extent"
        );
        return Ok(Vec::new());
    }

    let pages = ranges
        .iter()
        .map(|range| fetch_page(client, ctx, Some(*range)));
    let collected = join_all(pages).await;

    let mut vectors = Vec::new();
    for page in collected {
        match page {
            Ok(mut page_vectors) => vectors.append(&mut page_vectors),
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                // One page's failure must not cost the sibling pages.
                warn!(
                    partition = ctx.partition.code,
                    layer = ctx.layer.id,
                    error = %err,
                    "page fetch failed"
                );
            }
        }
    }
    Ok(vectors)
}

async fn fetch_page(
    client: &SpatialQueryClient,
    ctx: &FetchContext<'_>,
    range: Option<IdRange>,
) -> Result<Vec<RoadVector>, SyncError> {
    // Checkpoint: a superseded round stops issuing requests.
    if ctx.round.is_cancelled() {
        return Err(SyncError::Cancelled);
    }

    let out_fields = ctx
        .layer
        .out_fields
        .iter()
        .map(|field| (*field).to_string())
        .collect();
    let mut spec = QuerySpec::page(
        ctx.envelope,
        out_fields,
        ctx.partition.max_allowable_offset(ctx.zoom),
    );
    if let Some(clause) = ctx.partition.filter.clause(ctx.zoom) {
        spec = spec.with_clause(clause);
    }
    if let Some(range) = range {
        spec = spec.with_clause(id_range_clause(
            ctx.layer.object_id_field,
            range.first,
            range.last,
        ));
    }

    let url = build_url(&ctx.partition.base_url, ctx.layer.id, &spec)?;
    let features = client.fetch_features(url).await?;
    ctx.round.record_completed_request();

    Ok(features
        .features
        .iter()
        .flat_map(|raw| to_vectors(raw, ctx))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranges_partition_the_set_exactly() {
        let ids: Vec<i64> = (1..=2500).collect();
        let ranges = plan_ranges(ids.clone(), 1000);
        assert_eq!(
            ranges,
            vec![
                IdRange { first: 1, last: 1000 },
                IdRange {
                    first: 1001,
                    last: 2000
                },
                IdRange {
                    first: 2001,
                    last: 2500
                },
            ]
        );
        // No id is covered twice and every id is covered once.
        let covered: usize = ids
            .iter()
            .map(|id| {
                ranges
                    .iter()
                    .filter(|r| r.first <= *id && *id <= r.last)
                    .count()
            })
            .sum();
        assert_eq!(covered, ids.len());
    }

    #[test]
    fn unsorted_input_is_sorted_before_slicing() {
        let ranges = plan_ranges(vec![42, 7, 190, 3, 56], 2);
        assert_eq!(
            ranges,
            vec![
                IdRange { first: 3, last: 7 },
                IdRange {
                    first: 42,
                    last: 56
                },
                IdRange {
                    first: 190,
                    last: 190
                },
            ]
        );
    }

    #[test]
    fn exact_multiple_has_no_boundary_duplicates() {
        let ranges = plan_ranges((1..=2000).collect(), 1000);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].last, 1000);
        assert_eq!(ranges[1].first, 1001);
    }

    #[test]
    fn empty_id_set_yields_no_ranges() {
        assert!(plan_ranges(Vec::new(), 1000).is_empty());
    }

    #[test]
    fn single_id_yields_degenerate_range() {
        assert_eq!(
            plan_ranges(vec![17], 1000),
            vec![IdRange {
                first: 17,
                last: 17
            }]
        );
    }

    #[tokio::test]
    async fn superseded_round_reports_cancellation_before_any_request() {
        use std::collections::HashMap;

        use roadlens_protocol::RoadType;

        let partition = Partition {
            code: "KY",
            base_url: "https://example.test/MapServer/".to_string(),
            layers: vec![Layer {
                id: 0,
                road_type_field: "FUNC_CLASS",
                object_id_field: "OBJECTID",
                out_fields: &["OBJECTID", "FUNC_CLASS"],
                max_page_size: 1000,
                supports_pagination: true,
            }],
            classification: crate::registry::ClassificationRule::DirectLookup(HashMap::from([(
                1,
                RoadType::Freeway,
            )])),
            colors: HashMap::from([(RoadType::Freeway, "#c577d2")]),
            max_allowable_offsets: &[],
            filter: crate::registry::FilterRule::None,
            permission: crate::registry::Permission::Everyone,
            hide_streets: false,
        };
        let round = Arc::new(SyncRound::new(1));
        round.supersede();
        let ctx = FetchContext {
            round,
            partition: &partition,
            layer: &partition.layers[0],
            envelope: Envelope::new(0.0, 0.0, 1.0, 1.0),
            zoom: 16,
            highlight_streets: true,
        };

        let client = SpatialQueryClient::new();
        let err = fetch_layer(&client, &ctx)
            .await
            .expect_err("cancelled round");
        assert!(err.is_cancelled());
        assert_eq!(ctx.round.completed_requests(), 0);
    }

    #[test]
    fn page_size_caps_at_one_thousand() {
        let layer = crate::registry::Layer {
            id: 0,
            road_type_field: "T",
            object_id_field: "OBJECTID",
            out_fields: &["OBJECTID"],
            max_page_size: 5000,
            supports_pagination: true,
        };
        assert_eq!(page_size(&layer), HARD_PAGE_CAP);
        let small = crate::registry::Layer {
            max_page_size: 250,
            ..layer
        };
        assert_eq!(page_size(&small), 250);
    }
}
