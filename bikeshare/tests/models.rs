use bikeshare::{
    bson::{doc, Bson, DateTime},
    memory::InMemoryStore,
    prelude::*,
};
use serde_json::{json, Value};

/// 2012-01-01T00:00:00Z
const NEW_YEAR_2012: i64 = 1_325_376_000_000;

fn station(id: &str, network_id: &str, longitude: f64, latitude: f64, bikes: i32, free: i32) -> Record {
    doc! {
        "_id": id,
        "name": format!("Station {id}"),
        "network_id": network_id,
        "location": { "type": "Point", "coordinates": [longitude, latitude] },
        "last_stat": {
            "bikes": bikes,
            "free": free,
            "timestamp": DateTime::from_millis(NEW_YEAR_2012),
        },
    }
}

fn velib() -> Record {
    doc! {
        "_id": "velib",
        "name": "Vélib'",
        "city": "Paris",
        "country": "FR",
        "latitude": 48.856614,
        "longitude": 2.3522219,
        "company": "JCDecaux",
    }
}

fn seeded_store() -> DocumentStore<InMemoryStore> {
    DocumentStore::new(InMemoryStore::with_collections([
        ("systems", vec![velib()]),
        (
            "stations",
            vec![
                station("louvre", "velib", 2.3376, 48.8606, 4, 16),
                station("rambla", "bicing", 2.1700, 41.3800, 1, 20),
                station("bastille", "velib", 2.3690, 48.8532, 0, 22),
            ],
        ),
    ]))
}

#[tokio::test]
async fn missing_field_is_an_error() {
    let store = seeded_store();
    let network = Document::<Network, _>::with_data(&store, doc! { "_id": "empty" });

    let err = network.map_data(None).unwrap_err();

    assert!(err.is_field_not_found());
    assert_eq!(err.to_string(), "'Network' object has no attribute 'city'");
    assert!(network.get("company").unwrap_err().is_field_not_found());
}

#[tokio::test]
async fn station_projection_reports_last_stat() {
    let store = seeded_store();
    let mut louvre = Document::<Station, _>::new(&store);
    louvre.read("louvre").await.unwrap();

    let result = louvre.map_data(false).unwrap();

    assert_eq!(
        Value::Object(result),
        json!({
            "id": "louvre",
            "name": "Station louvre",
            "longitude": 2.3376,
            "latitude": 48.8606,
            "free_bikes": 4,
            "empty_slots": 16,
            "timestamp": "2012-01-01T00:00:00Z",
        })
    );

    let result = louvre.map_data(true).unwrap();
    assert_eq!(result["network_id"], json!("velib"));
}

#[tokio::test]
async fn network_projection_and_field_filter() {
    let store = seeded_store();
    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();

    let full = network.map_data(None).unwrap();
    assert_eq!(full["href"], json!("/v2/networks/velib"));
    assert_eq!(
        full["location"],
        json!({ "city": "Paris", "country": "FR", "latitude": 48.856614, "longitude": 2.3522219 })
    );
    assert!(!full.contains_key("license"));
    assert!(!full.contains_key("stations"));

    let filtered = network
        .map_data(Some(["id", "name", "not_a_key"].as_slice()))
        .unwrap();

    assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["id", "name"]);
}

#[tokio::test]
async fn network_license_is_projected_when_present() {
    let mut record = velib();
    record.insert("license", doc! { "name": "Open Database License" });

    let store = DocumentStore::new(InMemoryStore::with_collections([("systems", vec![record])]));
    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();

    let result = network.map_data(None).unwrap();

    assert_eq!(result["license"], json!({ "name": "Open Database License" }));
}

#[tokio::test]
async fn network_with_resolved_stations() {
    let store = seeded_store();
    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();

    assert!(network.stations().is_none());

    network.resolve_stations().await.unwrap();

    let ids = network
        .stations()
        .unwrap()
        .map(|station| station.get("_id").cloned().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![Bson::from("louvre"), Bson::from("bastille")]);

    let result = network.map_data(None).unwrap();
    let stations = result["stations"].as_array().unwrap();

    assert_eq!(stations.len(), 2);
    assert!(stations.iter().all(|station| station.get("network_id").is_none()));
    assert_eq!(stations[1]["free_bikes"], json!(0));

    let filtered = network.map_data(Some(["id", "name"].as_slice())).unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.contains_key("id") && filtered.contains_key("name"));
}

#[tokio::test]
async fn resolved_stations_are_not_persisted() {
    let backend = InMemoryStore::with_collections([
        ("systems", vec![velib()]),
        ("stations", vec![station("louvre", "velib", 2.3376, 48.8606, 4, 16)]),
    ]);
    let store = DocumentStore::new(backend.clone());

    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();
    network.resolve_stations().await.unwrap();
    network.save().await.unwrap();

    let stored = backend
        .find_one("systems", Filter::eq("_id", "velib"))
        .await
        .unwrap()
        .unwrap();

    assert!(!stored.contains_key("stations"));
    assert_eq!(stored, velib());
}

#[tokio::test]
async fn read_replaces_state() {
    let store = seeded_store();
    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();
    network.resolve_stations().await.unwrap();

    network.read("velib").await.unwrap();

    assert!(network.stations().is_none());
}

#[tokio::test]
async fn read_of_unknown_id_fails() {
    let store = seeded_store();
    let mut network = Document::<Network, _>::new(&store);

    let err = network.read("nowhere").await.unwrap_err();

    assert!(matches!(
        err,
        DocumentStoreError::DocumentNotFound(ref id, ref collection)
            if id == "nowhere" && collection == "systems"
    ));
    assert!(network.data().is_empty());
}

#[tokio::test]
async fn save_then_read_round_trips() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut stat = Document::<Stat, _>::new(&store);
    stat.set("station_id", "louvre");
    stat.set("bikes", 7);
    stat.set("free", 13);
    let id = stat.save().await.unwrap();

    assert_eq!(stat.get("_id").unwrap(), &id);

    let mut reloaded = Document::<Stat, _>::new(&store);
    reloaded.read(id.clone()).await.unwrap();

    assert_eq!(reloaded.data(), stat.data());
    assert_eq!(reloaded.map_data(Some(["bikes"].as_slice()))["bikes"], json!(7));
}

#[tokio::test]
async fn new_wrappers_never_share_records() {
    let store = seeded_store();

    let mut first = Document::<Station, _>::new(&store);
    first.set("name", "first");
    let second = Document::<Station, _>::new(&store);

    assert!(second.data().is_empty());
    assert!(!second.contains("name"));
}

#[tokio::test]
async fn find_yields_wrappers_bound_to_the_same_store() {
    let store = seeded_store();

    let stations = Document::<Station, _>::new(&store)
        .find(Query::builder().filter(Filter::eq("network_id", "velib")).sort("_id", SortDirection::Asc).build())
        .await
        .unwrap();

    assert_eq!(stations.len(), 2);

    let names = stations
        .map(|station| {
            assert!(std::ptr::eq(station.store(), &store));
            station.fields().get_str("name").map(str::to_string)
        })
        .collect::<DocumentStoreResult<Vec<_>>>()
        .unwrap();

    assert_eq!(names, vec!["Station bastille", "Station louvre"]);
}

#[tokio::test]
async fn find_with_no_match_is_empty() {
    let store = seeded_store();

    let mut networks = Document::<Network, _>::new(&store)
        .find(Query::filter(Filter::eq("_id", "nowhere")))
        .await
        .unwrap();

    assert!(networks.next().is_none());
}

#[tokio::test]
async fn nearby_returns_at_most_one_hundred_within_distance() {
    let mut stations = (0..120)
        .map(|i| {
            let latitude = 45.0 + f64::from(i) * 0.00002;
            station(&format!("near-{i}"), "bikemi", 10.0, latitude, i % 5, 10)
        })
        .collect::<Vec<_>>();
    stations.extend((0..5).map(|i| station(&format!("far-{i}"), "bikemi", 10.0, 46.0 + f64::from(i), 1, 1)));

    let store = DocumentStore::new(InMemoryStore::with_collections([("stations", stations)]));

    let mut nearby = Nearby::new(&store);
    nearby.near(10.0, 45.0, 500.0).await.unwrap();

    assert_eq!(nearby.stations().len(), 100);

    let result = nearby.map_data().unwrap();
    let near = result["near"].as_array().unwrap();

    assert_eq!(near.len(), 100);
    assert_eq!(near[0]["id"], json!("near-0"));
    assert_eq!(near[0]["distance"], json!(0));

    let distances = near
        .iter()
        .map(|station| station["distance"].as_i64().unwrap())
        .collect::<Vec<_>>();

    assert!(distances.iter().all(|distance| *distance <= 500));
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(near.iter().all(|station| station["network_id"] == json!("bikemi")));
}

#[tokio::test]
async fn nearby_with_nothing_in_range_is_empty() {
    let store = seeded_store();

    let mut nearby = Nearby::new(&store);
    nearby.near(10.0, 45.0, 500.0).await.unwrap();

    assert_eq!(Value::Object(nearby.map_data().unwrap()), json!({ "near": [] }));
}

#[tokio::test]
async fn model_encoder_nests_the_name_under_the_public_name() {
    let store = seeded_store();

    let mut network = Document::<Network, _>::new(&store);
    network.read("velib").await.unwrap();
    let mut louvre = Document::<Station, _>::new(&store);
    louvre.read("louvre").await.unwrap();

    assert_eq!(
        Encoded::from(&network).to_json().unwrap(),
        json!({ "network": { "name": "Vélib'" } })
    );
    assert_eq!(
        Encoded::from(&louvre).to_json_string().unwrap(),
        r#"{"station":{"name":"Station louvre"}}"#
    );
}

#[tokio::test]
async fn model_encoder_keeps_only_the_name_of_a_stat() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut stat = Document::<Stat, _>::new(&store);
    stat.set("station_id", "louvre");
    stat.set("bikes", 7);
    stat.set("free", 13);
    stat.save().await.unwrap();

    assert_eq!(Encoded::from(&stat).public_name(), "stat");
    assert_eq!(Encoded::from(&stat).to_json().unwrap(), json!({ "stat": {} }));

    stat.set("name", "louvre at noon");

    assert_eq!(
        Encoded::from(&stat).to_json_string().unwrap(),
        r#"{"stat":{"name":"louvre at noon"}}"#
    );
}
