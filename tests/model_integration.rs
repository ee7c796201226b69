//! Integration tests for the model layer.
//!
//! These tests build model classes from configuration, the way an
//! application would, and drive them against the mock transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use truck::config::TruckConfig;
use truck::model::{DeleteOptions, ModelClass, ModelError, SaveOptions};
use truck::network::mock::{FailOn, MockTransport};
use truck::network::{Method, TransportError};
use truck::Truck;

// =============================================================================
// Test Fixtures
// =============================================================================

const CONFIG: &str = r#"
api = "https://example-api.dev/api"

[models.section]
fields = ["name", "type", "position"]

[models.section.defaults]
type = "text"

[models.profile]
fields = ["headline"]
dates = []

[models.resume]
fields = ["name", "email"]

[models.resume.has_many.sections]
model = "section"

[models.resume.has_one.profile]
model = "profile"
"#;

struct Fixture {
    mock: MockTransport,
    models: BTreeMap<String, ModelClass>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_mock(MockTransport::new())
    }

    fn with_mock(mock: MockTransport) -> Self {
        let config = TruckConfig::from_toml_str(CONFIG).expect("fixture config is valid");
        let truck = Truck::with_transport(config, Arc::new(mock.clone()));
        let models = truck.define_all().expect("fixture models are valid");
        Self { mock, models }
    }

    fn model(&self, name: &str) -> &ModelClass {
        &self.models[name]
    }
}

fn resume_data() -> Value {
    json!({
        "id": 1,
        "name": "Alex Doe",
        "email": "alex@example.com",
        "created_at": "2024-03-01T09:30:00Z",
        "updated_at": null,
        "sections": [
            { "id": 10, "name": "Experience", "type": "list", "position": 1 },
            { "id": 11, "name": "Education", "position": 2 }
        ],
        "profile": { "id": 5, "headline": "Engineer" }
    })
}

// =============================================================================
// Hydration and URLs
// =============================================================================

#[test]
fn nested_graph_hydrates_with_urls() {
    let fx = Fixture::new();
    let resume = fx.model("resume").make(&resume_data());

    let sections = resume.has_many("sections").unwrap();
    assert_eq!(sections.count(), 2);

    let education = sections.find(11).unwrap();
    assert_eq!(education.get("type"), Some(Value::Null));
    assert_eq!(
        education.api_url(),
        "https://example-api.dev/api/resume/1/section/11"
    );
    assert!(education.parent().unwrap().is(&resume));

    let profile = resume.has_one("profile").unwrap().get().unwrap();
    assert_eq!(profile.api_path(), "/resume/1/profile/5");
}

#[test]
fn serialized_graph_rehydrates_equal() {
    let fx = Fixture::new();
    let resume = fx.model("resume").make(&resume_data());

    let copy = fx.model("resume").make(&resume.to_object());
    assert!(copy.equals(&resume));
    assert!(!copy.is(&resume));
    assert_eq!(
        copy.to_object()["created_at"],
        json!("2024-03-01T09:30:00Z")
    );
}

#[test]
fn new_child_uses_defaults_and_parent_path() {
    let fx = Fixture::new();
    let resume = fx.model("resume").make(&resume_data());

    let draft = resume
        .has_many("sections")
        .unwrap()
        .new(Some(&json!({ "name": "Skills" })));

    assert!(draft.key().is_null());
    assert_eq!(draft.get("type"), Some(json!("text")));
    assert_eq!(draft.api_path(), "/resume/1/section");
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn adding_a_section_posts_under_the_parent() {
    let fx = Fixture::new();
    fx.mock.set_response(
        Method::Post,
        "https://example-api.dev/api/resume/1/section",
        json!({ "id": 12, "name": "Skills", "type": "text", "position": 3 }),
    );
    let resume = fx.model("resume").make(&resume_data());
    let sections = resume.has_many("sections").unwrap();

    let draft = fx.model("section").make(&json!({ "name": "Skills" }));
    let added = sections
        .add(&draft, SaveOptions::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(added.key(), json!(12));
    assert_eq!(sections.count(), 3);
    assert_eq!(fx.mock.request_count(), 1);
    assert_eq!(
        fx.mock.last_request().unwrap().body.unwrap()["name"],
        json!("Skills")
    );
}

#[tokio::test]
async fn failed_add_leaves_collection_unchanged() {
    let fx = Fixture::with_mock(
        MockTransport::new().fail_on(FailOn::Method(Method::Post, TransportError::RateLimited)),
    );
    let resume = fx.model("resume").make(&resume_data());
    let sections = resume.has_many("sections").unwrap();

    let draft = fx.model("section").make(&json!({ "name": "Skills" }));
    let err = sections
        .add(&draft, SaveOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.transport(), Some(&TransportError::RateLimited));
    assert_eq!(sections.count(), 2);
}

#[tokio::test]
async fn save_of_existing_section_puts_and_rehydrates() {
    let fx = Fixture::new();
    fx.mock.set_response(
        Method::Put,
        "https://example-api.dev/api/resume/1/section/10",
        json!({ "id": 10, "name": "Work", "type": "list", "position": 1 }),
    );
    let resume = fx.model("resume").make(&resume_data());
    let sections = resume.has_many("sections").unwrap();

    let experience = sections.find(10).unwrap();
    experience.set("name", "Work");
    experience.save().await.unwrap();

    assert_eq!(sections.find(10).unwrap().get("name"), Some(json!("Work")));
    assert_eq!(sections.count(), 2);
    assert_eq!(fx.mock.last_request().unwrap().method, Method::Put);
}

#[tokio::test]
async fn optimistic_delete_removes_before_request_completes() {
    let fx = Fixture::new();
    let resume = fx.model("resume").make(&resume_data());
    let sections = resume.has_many("sections").unwrap();
    let education = sections.find(11).unwrap();

    let pending = education.delete_with(DeleteOptions { optimistic: true });
    assert_eq!(sections.count(), 1);

    pending.await.unwrap();
    let request = fx.mock.last_request().unwrap();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.url, "https://example-api.dev/api/resume/1/section/11");
}

#[tokio::test]
async fn failed_delete_keeps_the_child() {
    let fx = Fixture::with_mock(MockTransport::new().fail_on(FailOn::Method(
        Method::Delete,
        TransportError::NotFound("gone".into()),
    )));
    let resume = fx.model("resume").make(&resume_data());
    let profile = resume.has_one("profile").unwrap();

    let result = profile.delete().await;
    assert!(matches!(result, Err(ModelError::Transport(_))));
    assert!(profile.exists());
}

#[tokio::test]
async fn offline_clone_never_reaches_the_transport() {
    let fx = Fixture::new();
    let resume = fx.model("resume").make(&resume_data());

    let offline = resume.clone_offline();
    offline
        .has_many("sections")
        .unwrap()
        .find(10)
        .unwrap()
        .delete()
        .await
        .unwrap();
    assert_eq!(offline.has_many("sections").unwrap().count(), 1);

    offline.set("name", "Offline Alex");
    offline.save().await.unwrap();

    assert_eq!(fx.mock.request_count(), 0);
    assert_eq!(offline.get("name"), Some(json!("Offline Alex")));
    assert_eq!(resume.get("name"), Some(json!("Alex Doe")));
    assert_eq!(resume.has_many("sections").unwrap().count(), 2);
}

#[tokio::test]
async fn find_and_index_hydrate_from_backend() {
    let mock = MockTransport::new()
        .respond(
            Method::Get,
            "https://example-api.dev/api/resume/1",
            resume_data(),
        )
        .respond(
            Method::Get,
            "https://example-api.dev/api/section",
            json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }]),
        );
    let fx = Fixture::with_mock(mock);

    let resume = fx.model("resume").find(1).await.unwrap().unwrap();
    assert_eq!(resume.has_many("sections").unwrap().count(), 2);

    let missing = fx.model("resume").find(2).await.unwrap();
    assert!(missing.is_none());

    let sections = fx.model("section").index().await.unwrap();
    assert_eq!(sections.pluck("name"), vec![json!("A"), json!("B")]);
}
