use crate::errors::ApiError;
use crate::metrics_defs::{API_REQUESTS, DELETE_RESTRICTED};
use crate::store::{Store, StoreError, StoredResource};
use axum::extract::{Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use http::header::LOCATION;
use shared::counter;
use shared::model::{Employee, EntityId, Project, TaskItem};
use shared::session::{Sessions, authenticate};
use validator::Validate;

/// `/api/{collection}` routes for every entity. Callers must present a
/// session; role checks are left to the relay.
pub fn router(store: Store, sessions: Sessions) -> Router {
    Router::new()
        .merge(resource_routes::<Employee>())
        .merge(resource_routes::<Project>())
        .merge(resource_routes::<TaskItem>())
        .layer(middleware::from_fn_with_state(sessions, authenticate))
        .layer(middleware::from_fn(record_request))
        .with_state(store)
}

fn resource_routes<R: StoredResource>() -> Router<Store> {
    let collection = R::collection_path();

    Router::new()
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(
            &format!("{collection}/{{id}}"),
            get(get_one::<R>).put(update::<R>).delete(delete::<R>),
        )
}

async fn record_request(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;
    counter!(API_REQUESTS, "method" => method, "status" => response.status().as_u16().to_string())
        .increment(1);
    response
}

async fn list<R: StoredResource>(State(store): State<Store>) -> Json<Vec<R>> {
    Json(store.list::<R>())
}

async fn get_one<R: StoredResource>(
    State(store): State<Store>,
    Path(id): Path<EntityId>,
) -> Result<Json<R>, ApiError> {
    store.get::<R>(id).map(Json).ok_or(ApiError::Store(StoreError::NotFound {
        collection: R::COLLECTION,
        id,
    }))
}

async fn create<R: StoredResource>(
    State(store): State<Store>,
    Json(model): Json<R>,
) -> Result<Response, ApiError> {
    model.validate()?;
    let created = store.insert(model)?;
    tracing::debug!(collection = R::COLLECTION, id = created.id(), "Created");

    let location = R::item_path(created.id());
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(created)).into_response())
}

async fn update<R: StoredResource>(
    State(store): State<Store>,
    Path(id): Path<EntityId>,
    Json(model): Json<R>,
) -> Result<StatusCode, ApiError> {
    if id != model.id() {
        return Err(ApiError::IdMismatch {
            path_id: id,
            body_id: model.id(),
        });
    }
    model.validate()?;
    store.update(id, model)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete<R: StoredResource>(
    State(store): State<Store>,
    Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
    match store.delete::<R>(id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e @ StoreError::Restricted { .. }) => {
            tracing::info!(collection = R::COLLECTION, id, error = %e, "Delete restricted");
            counter!(DELETE_RESTRICTED, "collection" => R::COLLECTION).increment(1);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::header::{CONTENT_TYPE, COOKIE};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use shared::model::Role;
    use shared::session::{SessionEntry, StaticSessionStore};
    use std::sync::Arc;
    use tower::ServiceExt;

    const COOKIE_VALUE: &str = "erms_session=employee-token";

    fn app() -> Router {
        let store = StaticSessionStore::new(vec![SessionEntry {
            token: "employee-token".into(),
            user: "someone@company.com".into(),
            role: Role::Employee,
        }]);
        router(Store::new(), Sessions::new("erms_session", Arc::new(store)))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> http::Request<Body> {
        let builder = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, COOKIE_VALUE);

        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: http::Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = match bytes.is_empty() {
            true => Value::Null,
            false => serde_json::from_slice(&bytes).unwrap(),
        };
        (status, body)
    }

    fn ada() -> Value {
        json!({"name": "Ada", "email": "ada@example.com", "role": "Manager"})
    }

    fn apollo(manager_id: i64) -> Value {
        json!({
            "name": "Apollo",
            "startDate": "2024-01-01",
            "endDate": "2024-06-30",
            "managerId": manager_id
        })
    }

    #[tokio::test]
    async fn test_requires_session() {
        let req = http::Request::builder()
            .uri("/api/employees")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let app = app();

        let (status, body) = send(&app, request("GET", "/api/employees", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, created) = send(&app, request("POST", "/api/employees", Some(ada()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["employeeId"], 1);
        assert_eq!(created["name"], "Ada");

        let (status, fetched) = send(&app, request("GET", "/api/employees/1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let mut renamed = created.clone();
        renamed["name"] = json!("Ada Lovelace");
        let (status, _) = send(&app, request("PUT", "/api/employees/1", Some(renamed))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, fetched) = send(&app, request("GET", "/api/employees/1", None)).await;
        assert_eq!(fetched["name"], "Ada Lovelace");

        let (status, _) = send(&app, request("DELETE", "/api/employees/1", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, request("GET", "/api/employees/1", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error_message"].is_string());
    }

    #[tokio::test]
    async fn test_update_status_contract() {
        let app = app();
        send(&app, request("POST", "/api/employees", Some(ada()))).await;

        let mut body = ada();
        body["employeeId"] = json!(2);
        let (status, _) = send(&app, request("PUT", "/api/employees/1", Some(body.clone()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, request("PUT", "/api/employees/2", Some(body))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request("DELETE", "/api/employees/2", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_and_references() {
        let app = app();

        let invalid = json!({"name": "", "email": "nope", "role": "Employee"});
        let (status, body) = send(&app, request("POST", "/api/employees", Some(invalid))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error_message"].is_string());

        let (status, _) = send(&app, request("POST", "/api/projects", Some(apollo(5)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_restricted_by_references() {
        let app = app();
        send(&app, request("POST", "/api/employees", Some(ada()))).await;
        let (status, project) = send(&app, request("POST", "/api/projects", Some(apollo(1)))).await;
        assert_eq!(status, StatusCode::CREATED);

        let task = json!({
            "name": "Kickoff",
            "projectId": project["projectId"],
            "assignedEmployeeId": 1,
            "priority": "High",
            "status": "In Progress"
        });
        let (status, _) = send(&app, request("POST", "/api/task-items", Some(task))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&app, request("DELETE", "/api/employees/1", None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, request("DELETE", "/api/projects/1", None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, request("DELETE", "/api/task-items/1", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("DELETE", "/api/projects/1", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
