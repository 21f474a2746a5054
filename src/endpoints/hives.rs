use crate::{ApiClient, ApiError, Payload, RequestOptions};
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A beehive owned by a root user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hive {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// The bee species.
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The details needed to register a new hive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHive {
    pub name: String,
    pub location: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NewHive {
    pub fn new<N, L>(name: N, location: L) -> Self
    where
        N: Into<String>,
        L: Into<String>,
    {
        NewHive {
            name: name.into(),
            location: location.into(),
            kind: None,
            size: None,
            status: None,
        }
    }
}

/// A partial update. Only the fields which are set get sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HivePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl HivePatch {
    pub fn is_empty(&self) -> bool { self == &HivePatch::default() }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DeleteHiveOptions {
    /// Ask the backend to remove the hive for good instead of archiving it.
    /// Left to the backend's default when unset.
    pub permanent: Option<bool>,
}

fn hive_path(user_id: u64, hive_id: u64) -> String {
    format!("/{}/hives/{}", user_id, hive_id)
}

/// Fetch every hive owned by a root user.
pub async fn get_all_hives(
    client: &ApiClient,
    user_root_id: u64,
) -> Result<Vec<Hive>, ApiError> {
    let path = format!("/{}/hives/all", user_root_id);

    client.request(&path, RequestOptions::new()).await?.into_json()
}

/// Register a new hive for a root user.
///
/// The body is handed back as-is. Use [`Payload::into_json()`] to get a
/// [`Hive`] when the backend echoes the created record.
pub async fn create_hive(
    client: &ApiClient,
    user_id: u64,
    hive: &NewHive,
) -> Result<Payload, ApiError> {
    let path = format!("/{}/hives", user_id);
    let options = RequestOptions::new().method(Method::POST).json(hive)?;

    client.request(&path, options).await
}

/// Apply a partial update, returning whatever the backend sent back (which
/// may be nothing at all).
pub async fn update_hive(
    client: &ApiClient,
    user_id: u64,
    hive_id: u64,
    patch: &HivePatch,
) -> Result<Payload, ApiError> {
    let options = RequestOptions::new().method(Method::PATCH).json(patch)?;

    client.request(&hive_path(user_id, hive_id), options).await
}

/// Delete a hive, returning whatever the backend sent back (often nothing).
pub async fn delete_hive(
    client: &ApiClient,
    user_id: u64,
    hive_id: u64,
    options: DeleteHiveOptions,
) -> Result<Payload, ApiError> {
    let mut path = hive_path(user_id, hive_id);
    if let Some(permanent) = options.permanent {
        path.push_str(&format!("?permanent={}", permanent));
    }

    client
        .request(&path, RequestOptions::new().method(Method::DELETE))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_server::{self, Canned},
        Session, SessionStore, User,
    };
    use serde_json::json;

    fn client(base_url: String) -> ApiClient {
        let client =
            ApiClient::new(base_url, SessionStore::in_memory()).unwrap();
        client
            .save_auth(&Session::new("t1", User::with_id(1)))
            .unwrap();
        client
    }

    #[test]
    fn patch_only_sends_fields_which_are_set() {
        let patch = HivePatch {
            name: Some(String::from("Colmeia A1")),
            ..Default::default()
        };

        let got = serde_json::to_value(&patch).unwrap();

        assert_eq!(got, json!({ "name": "Colmeia A1" }));
        assert!(HivePatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn hive_type_is_renamed() {
        let src = json!({
            "id": 4,
            "user_id": 1,
            "name": "Colmeia 1",
            "type": "Bombus terrestris",
            "apiary": "north",
        });

        let hive: Hive = serde_json::from_value(src).unwrap();

        assert_eq!(hive.kind.as_deref(), Some("Bombus terrestris"));
        assert_eq!(hive.extra["apiary"], json!("north"));
    }

    #[tokio::test]
    async fn fetch_all_hives_for_a_user() {
        let (base_url, server) = test_server::serve(vec![Canned::json(
            200,
            r#"[{"id": 1, "name": "A1"}, {"id": 2}]"#,
        )])
        .await;

        let hives = get_all_hives(&client(base_url), 42).await.unwrap();

        assert_eq!(hives.len(), 2);
        assert_eq!(hives[0].name.as_deref(), Some("A1"));
        assert_eq!(hives[1].id, 2);
        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/42/hives/all");
        assert_eq!(requests[0].headers["authorization"], "Bearer t1");
    }

    #[tokio::test]
    async fn register_a_new_hive() {
        let (base_url, server) = test_server::serve(vec![Canned::json(
            201,
            r#"{"id": 5, "user_id": 1, "name": "A1", "location": "Farm"}"#,
        )])
        .await;
        let hive = NewHive::new("A1", "Farm");

        let got: Hive = create_hive(&client(base_url), 1, &hive)
            .await
            .unwrap()
            .into_json()
            .unwrap();

        assert_eq!(got.id, 5);
        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/1/hives");
        let body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body, json!({"name": "A1", "location": "Farm"}));
    }

    #[tokio::test]
    async fn update_then_delete_are_routed_independently() {
        let (base_url, server) = test_server::serve(vec![
            Canned::json(200, r#"{"id": 7, "status": "warning"}"#),
            Canned::empty(204),
        ])
        .await;
        let client = client(base_url);
        let patch = HivePatch {
            status: Some(String::from("warning")),
            ..Default::default()
        };

        let updated: Hive = update_hive(&client, 3, 7, &patch)
            .await
            .unwrap()
            .into_json()
            .unwrap();
        let deleted = delete_hive(&client, 3, 7, DeleteHiveOptions::default())
            .await
            .unwrap();

        assert_eq!(updated.status.as_deref(), Some("warning"));
        assert_eq!(deleted, Payload::Text(String::new()));

        let requests = server.await.unwrap();
        let (update, delete) = (&requests[0], &requests[1]);
        assert_eq!(update.method, "PATCH");
        assert_eq!(update.path, "/3/hives/7");
        assert_eq!(update.body, r#"{"status":"warning"}"#);
        assert_eq!(update.headers["content-type"], "application/json");
        assert_eq!(delete.method, "DELETE");
        assert_eq!(delete.path, "/3/hives/7");
        assert_eq!(delete.body, "");
        assert_eq!(delete.headers["content-type"], "application/json");
        assert_eq!(delete.headers["authorization"], "Bearer t1");
    }

    #[tokio::test]
    async fn empty_success_replies_are_not_errors() {
        let (base_url, server) = test_server::serve(vec![
            Canned::empty(204),
            Canned::text(201, "created"),
        ])
        .await;
        let client = client(base_url);
        let patch = HivePatch {
            name: Some(String::from("B2")),
            ..Default::default()
        };

        let updated = update_hive(&client, 3, 7, &patch).await.unwrap();
        let created = create_hive(&client, 3, &NewHive::new("B2", "Farm"))
            .await
            .unwrap();

        assert_eq!(updated, Payload::Text(String::new()));
        assert_eq!(created, Payload::Text(String::from("created")));
        let requests = server.await.unwrap();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(requests[1].method, "POST");
    }

    #[tokio::test]
    async fn permanent_deletes_use_a_query_string() {
        let (base_url, server) =
            test_server::serve(vec![Canned::json(200, r#"{"ok": true}"#)])
                .await;
        let options = DeleteHiveOptions {
            permanent: Some(true),
        };

        let got = delete_hive(&client(base_url), 3, 7, options).await.unwrap();

        assert_eq!(got, Payload::Json(json!({"ok": true})));
        let requests = server.await.unwrap();
        assert_eq!(requests[0].path, "/3/hives/7?permanent=true");
    }
}
