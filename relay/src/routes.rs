use crate::auth::{require_roles, roles_for};
use crate::client::{ApiClient, ForwardedCookie};
use crate::controller::{FormOutcome, RelayController};
use crate::lookups::FormResource;
use crate::view::{Flash, ViewOutcome};
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, FromRequestParts, Path, Query, State};
use axum::routing::get;
use axum::{Router, middleware};
use http::request::Parts;
use serde::Deserialize;
use shared::model::{Employee, EntityId, Project, TaskItem};
use shared::session::{Sessions, authenticate};
use std::convert::Infallible;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Key of a message carried over from a failed delete.
    pub flash: Option<String>,
}

/// Identifier from the route. Absent on the id-less routes and `None` when it
/// is not a number, which the controller answers with "not found".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteId(pub Option<EntityId>);

impl<S> FromRequestParts<S> for RouteId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let id = Path::<EntityId>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|Path(id)| id);
        Ok(Self(id))
    }
}

/// Browser-facing routes for all three entity types.
pub fn router(client: ApiClient, sessions: Sessions) -> Router {
    Router::new()
        .merge(entity_routes::<Employee>(client.clone()))
        .merge(entity_routes::<Project>(client.clone()))
        .merge(entity_routes::<TaskItem>(client))
        .layer(middleware::from_fn_with_state(sessions, authenticate))
}

/// The id-less routes share handlers with the others so a missing identifier
/// is answered with "not found" before any upstream call.
fn entity_routes<R: FormResource>(client: ApiClient) -> Router {
    let base = format!("/{}", R::COLLECTION);

    Router::new()
        .route(&base, get(index::<R>))
        .route(&format!("{base}/details"), get(details::<R>))
        .route(&format!("{base}/details/{{id}}"), get(details::<R>))
        .route(
            &format!("{base}/create"),
            get(create_form::<R>).post(create::<R>),
        )
        .route(&format!("{base}/edit"), get(edit_form::<R>))
        .route(
            &format!("{base}/edit/{{id}}"),
            get(edit_form::<R>).post(edit::<R>),
        )
        .route(&format!("{base}/delete"), get(delete_form::<R>))
        .route(
            &format!("{base}/delete/{{id}}"),
            get(delete_form::<R>).post(delete_confirmed::<R>),
        )
        .route_layer(middleware::from_fn(require_roles(roles_for(
            R::COLLECTION,
        ))))
        .with_state(RelayController::<R>::new(client))
}

/// A body that cannot be read at all binds as an empty form, which then fails
/// validation and is re-rendered like any other invalid submission.
fn form_input<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(input)) => input,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Form body rejected, binding empty form");
            T::default()
        }
    }
}

async fn index<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ViewOutcome<Vec<R>> {
    let flash = query
        .ok()
        .and_then(|Query(query)| query.flash)
        .and_then(|key| Flash::from_key(&key));
    controller.index(&cookie, flash).await
}

async fn details<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    RouteId(id): RouteId,
) -> ViewOutcome<R> {
    controller.details(&cookie, id).await
}

async fn create_form<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
) -> FormOutcome<R> {
    controller.create_form(&cookie).await
}

async fn create<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    form: Result<Form<R::Input>, FormRejection>,
) -> FormOutcome<R> {
    controller.create(&cookie, form_input(form)).await
}

async fn edit_form<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    RouteId(id): RouteId,
) -> FormOutcome<R> {
    controller.edit_form(&cookie, id).await
}

async fn edit<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    RouteId(id): RouteId,
    form: Result<Form<R::Input>, FormRejection>,
) -> FormOutcome<R> {
    controller.edit(&cookie, id, form_input(form)).await
}

async fn delete_form<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    RouteId(id): RouteId,
) -> ViewOutcome<R> {
    controller.delete_form(&cookie, id).await
}

async fn delete_confirmed<R: FormResource>(
    State(controller): State<RelayController<R>>,
    cookie: ForwardedCookie,
    RouteId(id): RouteId,
) -> ViewOutcome<R> {
    controller.delete_confirmed(&cookie, id).await
}
