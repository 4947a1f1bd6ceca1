//! Host-event wiring: checkbox toggles persist settings and resync, move
//! events drive rounds, and the zoom badge survives host DOM rebuilds.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

use roadlens_core::HostEvent;
use roadlens_core::MapHost;
use roadlens_core::Orchestrator;
use roadlens_core::OverlayController;
use roadlens_core::PartitionRegistry;
use roadlens_core::query::SpatialQueryClient;
use roadlens_core::registry::ClassificationRule;
use roadlens_core::registry::FilterRule;
use roadlens_core::registry::Layer;
use roadlens_core::registry::Partition;
use roadlens_core::registry::Permission;
use roadlens_core::settings::SettingsStore;
use roadlens_protocol::Envelope;
use roadlens_protocol::RoadType;
use roadlens_protocol::Settings;

struct FixedHost {
    zoom: u32,
}

impl MapHost for FixedHost {
    fn zoom(&self) -> u32 {
        self.zoom
    }

    fn extent(&self) -> Envelope {
        Envelope::new(0.0, 0.0, 1000.0, 1000.0)
    }

    fn editor_rank(&self) -> u32 {
        6
    }
}

fn street_partition(base_url: String) -> Partition {
    Partition {
        code: "OH",
        base_url,
        layers: vec![Layer {
            id: 0,
            road_type_field: "FUNC_CLASS",
            object_id_field: "OBJECTID",
            out_fields: &["OBJECTID", "FUNC_CLASS"],
            max_page_size: 1000,
            supports_pagination: true,
        }],
        classification: ClassificationRule::DirectLookup(HashMap::from([
            (1, RoadType::Freeway),
            (5, RoadType::Street),
        ])),
        colors: HashMap::from([
            (RoadType::Freeway, "#c577d2"),
            (RoadType::Street, "#eeeeee"),
        ]),
        max_allowable_offsets: &[],
        filter: FilterRule::None,
        permission: Permission::Everyone,
        hide_streets: false,
    }
}

async fn mount_service(server: &MockServer, func_class: i64) {
    Mock::given(method("GET"))
        .and(path("/0/query"))
        .and(query_param("returnIdsOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objectIdFieldName": "OBJECTID",
            "objectIds": [1]
        })))
        .mount(server)
        .await;
    let features: Value = json!({
        "features": [{
            "attributes": { "OBJECTID": 1, "FUNC_CLASS": func_class },
            "geometry": { "paths": [[[0.0, 0.0], [1.0, 1.0]]] }
        }]
    });
    Mock::given(method("GET"))
        .and(path("/0/query"))
        .and(query_param("returnGeometry", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(features))
        .mount(server)
        .await;
}

fn controller(
    server_uri: &str,
    settings: Settings,
    store: SettingsStore,
    zoom: u32,
) -> (Arc<Orchestrator>, OverlayController) {
    let registry =
        PartitionRegistry::with_partitions(vec![street_partition(format!("{server_uri}/"))]);
    let orch = Arc::new(Orchestrator::new(
        registry,
        SpatialQueryClient::new(),
        Arc::new(FixedHost { zoom }),
        settings,
    ));
    let controller = OverlayController::new(orch.clone(), store);
    (orch, controller)
}

#[tokio::test]
async fn move_end_triggers_a_round_and_updates_the_badge() {
    let server = MockServer::start().await;
    mount_service(&server, 1).await;
    let dir = TempDir::new().expect("tempdir");
    let store = SettingsStore::new(dir.path());
    let (orch, mut controller) = controller(&server.uri(), Settings::default(), store, 16);

    controller.handle_event(HostEvent::MoveEnd).await;

    assert_eq!(orch.overlay().lock().await.vectors().len(), 1);
    assert!(controller.badge().is_attached());
    assert_eq!(controller.badge().level(), 16);
    assert_eq!(controller.badge().color(), "#ffffff");
}

#[tokio::test]
async fn overlay_toggle_persists_and_resyncs_when_enabled() {
    let server = MockServer::start().await;
    mount_service(&server, 1).await;
    let dir = TempDir::new().expect("tempdir");
    let store = SettingsStore::new(dir.path());
    let settings = Settings {
        layer_visible: false,
        ..Settings::default()
    };
    let (orch, mut controller) = controller(&server.uri(), settings, store.clone(), 16);

    controller
        .handle_event(HostEvent::OverlayToggled(true))
        .await;

    assert!(orch.overlay().lock().await.is_visible());
    assert_eq!(orch.overlay().lock().await.vectors().len(), 1);
    assert!(store.load().layer_visible);

    controller
        .handle_event(HostEvent::OverlayToggled(false))
        .await;
    assert!(!orch.overlay().lock().await.is_visible());
    assert!(!store.load().layer_visible);
}

#[tokio::test]
async fn highlight_toggle_refetches_and_drops_streets() {
    let server = MockServer::start().await;
    mount_service(&server, 5).await;
    let dir = TempDir::new().expect("tempdir");
    let store = SettingsStore::new(dir.path());
    let (orch, mut controller) = controller(&server.uri(), Settings::default(), store.clone(), 16);

    controller.handle_event(HostEvent::MoveEnd).await;
    assert_eq!(orch.overlay().lock().await.vectors().len(), 1);

    controller
        .handle_event(HostEvent::HighlightToggled(false))
        .await;
    assert!(!store.load().road_type_enabled);
    assert!(orch.overlay().lock().await.vectors().is_empty());
}

#[tokio::test]
async fn actions_cleared_reattaches_the_badge() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");
    let store = SettingsStore::new(dir.path());
    let (_orch, mut controller) = controller(&server.uri(), Settings::default(), store, 14);

    controller.handle_event(HostEvent::ActionsCleared).await;
    assert!(controller.badge().is_attached());
    assert_eq!(controller.badge().level(), 14);
    assert_eq!(controller.badge().color(), "#ffe082");
}
