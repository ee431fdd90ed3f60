use std::sync::Arc;
use std::time::Duration;

use binder::location::LocationProvider;
use binder::map::coordinates::{CameraRegion, WGS84Coordinate};
use binder::search::controller::SuggestionPanel;
use binder::search::test_utils::{MockGeocoder, MockLocation, RecordingCamera, address};
use binder::search::{
  LocationSearchController, LookupStatus, SearchContext, SearchError, SelectedLocation,
  SuggestionCandidate,
};

const PARIS: WGS84Coordinate = WGS84Coordinate {
  lat: 48.8566,
  lon: 2.3522,
};
const PARMA: WGS84Coordinate = WGS84Coordinate {
  lat: 44.8015,
  lon: 10.3279,
};

fn controller_with(
  geocoder: &Arc<MockGeocoder>,
  location: &Arc<MockLocation>,
) -> (LocationSearchController, Arc<RecordingCamera>) {
  let camera = Arc::new(RecordingCamera::new());
  let location: Arc<dyn LocationProvider> = location.clone();
  let context = SearchContext::new(geocoder.clone(), camera.clone(), location);
  (LocationSearchController::new(context), camera)
}

fn search_controller(geocoder: &Arc<MockGeocoder>) -> (LocationSearchController, Arc<RecordingCamera>) {
  controller_with(geocoder, &Arc::new(MockLocation::denied()))
}

fn labels(controller: &LocationSearchController) -> Vec<&str> {
  controller
    .suggestions()
    .iter()
    .map(|s| s.address.as_str())
    .collect()
}

#[tokio::test(start_paused = true)]
async fn short_queries_never_reach_the_network() {
  let geocoder = Arc::new(MockGeocoder::new());
  let (mut controller, _) = search_controller(&geocoder);

  for text in ["", "P", "Pa", "  Pa  "] {
    controller.on_query_changed(text);
    assert_eq!(controller.query(), text);
    assert_eq!(controller.panel(), SuggestionPanel::Hidden);
  }
  tokio::time::sleep(Duration::from_secs(2)).await;

  assert!(controller.check_lookup_results().is_empty());
  assert!(controller.suggestions().is_empty());
  assert!(!controller.is_showing_suggestions());
  assert_eq!(geocoder.network_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn rapid_typing_issues_one_lookup_for_the_final_text() {
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_forward("Paris", vec![PARIS])
      .with_reverse(PARIS, vec![address("Paris", "France")]),
  );
  let (mut controller, _) = search_controller(&geocoder);

  for text in ["Par", "Pari", "Paris"] {
    controller.on_query_changed(text);
    assert_eq!(controller.panel(), SuggestionPanel::Loading);
    tokio::time::advance(Duration::from_millis(100)).await;
  }

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));
  assert_eq!(geocoder.forward_queries(), vec!["Paris".to_string()]);
  assert_eq!(labels(&controller), vec!["Paris, France"]);
  assert!(controller.is_showing_suggestions());

  tokio::time::sleep(Duration::from_secs(2)).await;
  assert!(controller.check_lookup_results().is_empty());
  assert_eq!(geocoder.forward_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn lookup_waits_for_the_quiet_period() {
  let geocoder = Arc::new(MockGeocoder::new().with_forward("Paris", vec![PARIS]));
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  tokio::time::sleep(Duration::from_millis(499)).await;
  assert_eq!(geocoder.forward_calls(), 0);

  tokio::time::sleep(Duration::from_millis(2)).await;
  assert_eq!(geocoder.forward_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn older_lookup_arriving_late_is_discarded() {
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_delayed_forward("Par", vec![PARMA], Duration::from_millis(2000))
      .with_delayed_forward("Paris", vec![PARIS], Duration::from_millis(100))
      .with_reverse(PARMA, vec![address("Parma", "Italy")])
      .with_reverse(PARIS, vec![address("Paris", "France")]),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Par");
  tokio::time::sleep(Duration::from_millis(600)).await;
  assert_eq!(geocoder.forward_queries(), vec!["Par".to_string()]);

  controller.on_query_changed("Paris");
  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));
  assert_eq!(labels(&controller), vec!["Paris, France"]);

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Stale));
  assert_eq!(labels(&controller), vec!["Paris, France"]);
  assert!(controller.is_showing_suggestions());
}

#[tokio::test(start_paused = true)]
async fn shortening_the_query_discards_the_running_lookup() {
  let geocoder = Arc::new(
    MockGeocoder::new().with_delayed_forward("Paris", vec![PARIS], Duration::from_secs(1)),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  tokio::time::sleep(Duration::from_millis(600)).await;
  controller.on_query_changed("Pa");

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Stale));
  assert!(controller.suggestions().is_empty());
  assert_eq!(controller.panel(), SuggestionPanel::Hidden);
}

#[tokio::test(start_paused = true)]
async fn suggestions_keep_geocoder_order() {
  let c1 = WGS84Coordinate::new(10.0, 10.0);
  let c2 = WGS84Coordinate::new(20.0, 20.0);
  let c3 = WGS84Coordinate::new(30.0, 30.0);
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_forward("Springfield", vec![c1, c2, c3])
      .with_delayed_reverse(c1, vec![address("First", "US")], Duration::from_millis(300))
      .with_delayed_reverse(c2, vec![address("Second", "US")], Duration::from_millis(50))
      .with_delayed_reverse(c3, vec![address("Third", "US")], Duration::from_millis(150)),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Springfield");

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));
  assert_eq!(
    labels(&controller),
    vec!["First, US", "Second, US", "Third, US"]
  );
}

#[tokio::test(start_paused = true)]
async fn failed_reverse_lookup_falls_back_to_coordinates() {
  let named = WGS84Coordinate::new(48.8566, 2.3522);
  let unnamed = WGS84Coordinate::new(37.1234, -122.4567);
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_forward("Somewhere", vec![unnamed, named])
      .with_reverse(named, vec![address("Paris", "France")])
      .failing_reverse_at(unnamed),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Somewhere");

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));
  assert_eq!(
    labels(&controller),
    vec!["37.1234, -122.4567", "Paris, France"]
  );
}

#[tokio::test(start_paused = true)]
async fn empty_or_failed_forward_hides_suggestions() {
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_forward("Paris", vec![PARIS])
      .with_reverse(PARIS, vec![address("Paris", "France")]),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));

  controller.on_query_changed("Atlantis");
  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Cleared));
  assert!(controller.suggestions().is_empty());
  assert_eq!(controller.panel(), SuggestionPanel::Hidden);

  let failing = Arc::new(MockGeocoder::new().failing_forward());
  let (mut controller, _) = search_controller(&failing);
  controller.on_query_changed("Paris");
  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Cleared));
  assert!(!controller.is_showing_suggestions());
}

#[tokio::test(start_paused = true)]
async fn blank_submit_is_rejected_without_network() {
  let geocoder = Arc::new(MockGeocoder::new());
  let (mut controller, camera) = search_controller(&geocoder);

  for text in ["", "   "] {
    controller.on_query_changed(text);
    let err = controller.on_submit().await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
    assert_eq!(err.notice().message, "Please enter a location to search");
  }

  assert_eq!(geocoder.network_calls(), 0);
  assert_eq!(camera.animations(), 0);
  assert!(controller.selected_location().is_none());
}

#[tokio::test(start_paused = true)]
async fn submit_keeps_typed_text_as_address() {
  let geocoder = Arc::new(
    MockGeocoder::new().with_forward("paris france", vec![PARIS, PARMA]),
  );
  let (mut controller, camera) = search_controller(&geocoder);

  controller.on_query_changed("paris france");
  let selected = controller.on_submit().await.unwrap();

  assert_eq!(selected.address, "paris france");
  assert_eq!(selected.coordinate(), PARIS);
  assert_eq!(controller.selected_location(), Some(&selected));
  assert_eq!(camera.regions(), vec![CameraRegion::focused_on(PARIS)]);
  assert_eq!(geocoder.reverse_calls(), 0);
  assert!(!controller.is_showing_suggestions());

  // The pending debounce was cancelled by the submit.
  tokio::time::sleep(Duration::from_secs(2)).await;
  assert!(controller.check_lookup_results().is_empty());
  assert_eq!(geocoder.forward_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_reports_not_found_and_failures() {
  let geocoder = Arc::new(MockGeocoder::new());
  let (mut controller, camera) = search_controller(&geocoder);
  controller.on_query_changed("Atlantis");
  let err = controller.on_submit().await.unwrap_err();
  assert!(matches!(err, SearchError::NotFound));
  assert_eq!(err.notice().title, "Not Found");

  let failing = Arc::new(MockGeocoder::new().failing_forward());
  let (mut controller, _) = controller_with(&failing, &Arc::new(MockLocation::denied()));
  controller.on_query_changed("Atlantis");
  let err = controller.on_submit().await.unwrap_err();
  assert!(matches!(err, SearchError::Geocode(_)));
  assert_eq!(err.notice().message, "Failed to search location");

  assert_eq!(camera.animations(), 0);
  assert!(controller.selected_location().is_none());
}

#[tokio::test(start_paused = true)]
async fn picking_a_suggestion_is_synchronous() {
  let geocoder = Arc::new(
    MockGeocoder::new()
      .with_forward("Paris", vec![PARIS])
      .with_reverse(PARIS, vec![address("Paris", "France")]),
  );
  let (mut controller, camera) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Published));
  let calls_before = geocoder.network_calls();

  let candidate = controller.suggestions()[0].clone();
  controller.on_suggestion_picked(candidate.clone());

  let expected: SelectedLocation = candidate.clone().into();
  assert_eq!(controller.selected_location(), Some(&expected));
  assert_eq!(controller.query(), "Paris, France");
  assert!(!controller.is_showing_suggestions());
  assert_eq!(geocoder.network_calls(), calls_before);
  assert_eq!(camera.regions(), vec![CameraRegion::focused_on(PARIS)]);
}

#[tokio::test(start_paused = true)]
async fn picking_discards_suggestions_still_in_flight() {
  let geocoder = Arc::new(
    MockGeocoder::new().with_delayed_forward("Paris", vec![PARIS], Duration::from_secs(1)),
  );
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  tokio::time::sleep(Duration::from_millis(600)).await;
  controller.on_suggestion_picked(SuggestionCandidate {
    address: "Parma, Italy".to_string(),
    latitude: PARMA.lat,
    longitude: PARMA.lon,
  });

  assert_eq!(controller.next_lookup().await, Some(LookupStatus::Stale));
  assert!(!controller.is_showing_suggestions());
  assert_eq!(controller.query(), "Parma, Italy");
}

#[tokio::test(start_paused = true)]
async fn map_tap_names_the_point() {
  let geocoder = Arc::new(MockGeocoder::new().with_reverse(
    PARIS,
    vec![binder::search::AddressComponents {
      street: Some("Rue de Rivoli".to_string()),
      city: Some("Paris".to_string()),
      region: Some("Île-de-France".to_string()),
      country: Some("France".to_string()),
      ..Default::default()
    }],
  ));
  let (mut controller, camera) = search_controller(&geocoder);
  controller.on_query_changed("typed");

  let selected = controller.on_map_tapped(PARIS).await;

  assert_eq!(selected.address, "Rue de Rivoli, Paris, Île-de-France, France");
  assert_eq!(controller.selected_location(), Some(&selected));
  assert_eq!(controller.query(), "typed");
  assert_eq!(camera.animations(), 0);
}

#[tokio::test(start_paused = true)]
async fn map_tap_without_address_is_unknown() {
  let failing = Arc::new(MockGeocoder::new().failing_reverse());
  let (mut controller, _) = search_controller(&failing);
  assert_eq!(
    controller.on_map_tapped(PARMA).await.address,
    "Unknown Location"
  );

  let empty = Arc::new(MockGeocoder::new());
  let (mut controller, _) = search_controller(&empty);
  let selected = controller.on_map_tapped(PARMA).await;
  assert_eq!(selected.address, "Unknown Location");
  assert_eq!(selected.coordinate(), PARMA);
}

#[tokio::test(start_paused = true)]
async fn recenter_requires_permission() {
  let geocoder = Arc::new(MockGeocoder::new());
  let location = Arc::new(MockLocation::denied());
  let (mut controller, camera) = controller_with(&geocoder, &location);

  let err = controller.on_recenter_requested().await.unwrap_err();

  assert!(matches!(err, SearchError::PermissionDenied));
  assert_eq!(err.notice().title, "Permission Denied");
  assert_eq!(location.position_reads(), 0);
  assert_eq!(camera.animations(), 0);
  assert!(controller.selected_location().is_none());
}

#[tokio::test(start_paused = true)]
async fn recenter_reports_missing_fix() {
  let geocoder = Arc::new(MockGeocoder::new());
  let location = Arc::new(MockLocation::unavailable());
  let (mut controller, camera) = controller_with(&geocoder, &location);

  let err = controller.on_recenter_requested().await.unwrap_err();

  assert!(matches!(err, SearchError::Location(_)));
  assert_eq!(err.notice().message, "Failed to get your location");
  assert_eq!(camera.animations(), 0);
}

#[tokio::test(start_paused = true)]
async fn recenter_twice_does_the_same_work_twice() {
  let here = WGS84Coordinate::new(37.788_25, -122.4324);
  let geocoder = Arc::new(MockGeocoder::new().with_reverse(here, vec![address("Home", "US")]));
  let location = Arc::new(MockLocation::at(here));
  let (mut controller, camera) = controller_with(&geocoder, &location);

  let first = controller.on_recenter_requested().await.unwrap();
  assert_eq!(camera.animations(), 1);
  assert_eq!(location.position_reads(), 1);

  let second = controller.on_recenter_requested().await.unwrap();
  assert_eq!(camera.animations(), 2);
  assert_eq!(location.position_reads(), 2);
  assert_eq!(location.permission_requests(), 2);

  assert_eq!(first, second);
  assert_eq!(second.address, "Home, US");
  assert_eq!(camera.regions()[1], CameraRegion::focused_on(here));
}

#[tokio::test(start_paused = true)]
async fn recenter_without_address_is_current_location() {
  let here = WGS84Coordinate::new(37.788_25, -122.4324);
  let geocoder = Arc::new(MockGeocoder::new().failing_reverse());
  let location = Arc::new(MockLocation::at(here));
  let (mut controller, _) = controller_with(&geocoder, &location);

  let selected = controller.on_recenter_requested().await.unwrap();

  assert_eq!(selected.address, "Current Location");
  assert_eq!(selected.coordinate(), here);
}

#[tokio::test(start_paused = true)]
async fn last_selection_wins() {
  let geocoder = Arc::new(MockGeocoder::new().with_forward("Paris", vec![PARIS]));
  let (mut controller, _) = search_controller(&geocoder);

  controller.on_query_changed("Paris");
  controller.on_submit().await.unwrap();
  let tapped = controller.on_map_tapped(PARMA).await;

  assert_eq!(controller.selected_location(), Some(&tapped));
}
