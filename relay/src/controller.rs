//! The relay controller.
//!
//! One generic implementation serves every entity type. Each action makes at
//! most one mutating call to the resource API and turns the response into a
//! `ViewOutcome`; no error escapes to the browser as a transport failure.

use crate::client::{ApiClient, ForwardedCookie, UpstreamResponse};
use crate::errors::RelayError;
use crate::form::FormInput;
use crate::lookups::FormResource;
use crate::view::{Flash, Lookups, ModelState, ViewOutcome};
use http::StatusCode;
use shared::model::EntityId;
use std::marker::PhantomData;

/// Form views render the submitted text, and carry no model when rendering a
/// blank create form.
pub type FormOutcome<R> = ViewOutcome<Option<<R as FormResource>::Input>>;

enum Fetched<R> {
    Found(R),
    Missing,
    Failed,
}

pub struct RelayController<R> {
    client: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for RelayController<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: FormResource> RelayController<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// Browser-facing list route every successful mutation redirects to.
    pub fn list_location() -> String {
        format!("/{}", R::COLLECTION)
    }

    pub async fn index(
        &self,
        cookie: &ForwardedCookie,
        flash: Option<Flash>,
    ) -> ViewOutcome<Vec<R>> {
        let response = self.client.get(&R::collection_path(), cookie).await;
        let items = match Self::success_body::<Vec<R>>(response) {
            Ok(items) => items.unwrap_or_default(),
            Err(()) => return ViewOutcome::ServiceFailure,
        };

        let mut model_state = ModelState::default();
        if let Some(flash) = flash {
            model_state.add_error(flash.message(R::DISPLAY_NAME));
        }
        ViewOutcome::form("Index", items, Lookups::new(), model_state)
    }

    pub async fn details(&self, cookie: &ForwardedCookie, id: Option<EntityId>) -> ViewOutcome<R> {
        self.show("Details", cookie, id).await
    }

    pub async fn delete_form(
        &self,
        cookie: &ForwardedCookie,
        id: Option<EntityId>,
    ) -> ViewOutcome<R> {
        self.show("Delete", cookie, id).await
    }

    pub async fn create_form(&self, cookie: &ForwardedCookie) -> FormOutcome<R> {
        let lookups = R::load_lookups(&self.client, cookie, None).await;
        ViewOutcome::form("Create", None, lookups, ModelState::default())
    }

    pub async fn create(&self, cookie: &ForwardedCookie, input: R::Input) -> FormOutcome<R> {
        let model = match Self::bind_model(&input) {
            Ok(model) => model,
            Err(model_state) => {
                tracing::debug!(entity = R::COLLECTION, "Create rejected by validation");
                return self.render_form("Create", cookie, input, model_state).await;
            }
        };

        let response = self
            .client
            .post(&R::collection_path(), cookie, &model)
            .await;
        if Self::succeeded(&response) {
            return ViewOutcome::redirect(Self::list_location());
        }

        Self::log_rejection("create", None, &response);
        let mut model_state = ModelState::default();
        model_state.add_error(format!("Failed to create {} via API.", R::DISPLAY_NAME));
        self.render_form("Create", cookie, input, model_state).await
    }

    pub async fn edit_form(&self, cookie: &ForwardedCookie, id: Option<EntityId>) -> FormOutcome<R> {
        let Some(id) = id else {
            return ViewOutcome::NotFound;
        };

        match self.fetch(cookie, id).await {
            Fetched::Found(model) => {
                let input = R::Input::from_entity(&model);
                self.render_form("Edit", cookie, input, ModelState::default())
                    .await
            }
            Fetched::Missing => ViewOutcome::NotFound,
            Fetched::Failed => ViewOutcome::ServiceFailure,
        }
    }

    pub async fn edit(
        &self,
        cookie: &ForwardedCookie,
        route_id: Option<EntityId>,
        input: R::Input,
    ) -> FormOutcome<R> {
        let Some(route_id) = route_id else {
            return ViewOutcome::NotFound;
        };
        if input.id() != Some(route_id) {
            tracing::debug!(
                entity = R::COLLECTION,
                route_id,
                model_id = input.id(),
                "Edit id mismatch"
            );
            return ViewOutcome::NotFound;
        }

        let model = match Self::bind_model(&input) {
            Ok(model) => model,
            Err(model_state) => {
                tracing::debug!(entity = R::COLLECTION, id = route_id, "Edit rejected by validation");
                return self.render_form("Edit", cookie, input, model_state).await;
            }
        };

        let response = self
            .client
            .put(&R::item_path(route_id), cookie, &model)
            .await;
        if Self::succeeded(&response) {
            return ViewOutcome::redirect(Self::list_location());
        }

        Self::log_rejection("update", Some(route_id), &response);
        let mut model_state = ModelState::default();
        model_state.add_error(format!("Failed to update {} via API.", R::DISPLAY_NAME));
        self.render_form("Edit", cookie, input, model_state).await
    }

    /// Redirects to the list whatever the API answers. A failed delete only
    /// adds a flash to the redirect. An id that is not a number is never sent
    /// upstream and counts as a failed delete.
    pub async fn delete_confirmed(
        &self,
        cookie: &ForwardedCookie,
        id: Option<EntityId>,
    ) -> ViewOutcome<R> {
        let deleted = match id {
            Some(id) => {
                let response = self.client.delete(&R::item_path(id), cookie).await;
                let succeeded = Self::succeeded(&response);
                if !succeeded {
                    Self::log_rejection("delete", Some(id), &response);
                }
                succeeded
            }
            None => false,
        };

        ViewOutcome::Redirect {
            location: Self::list_location(),
            flash: (!deleted).then_some(Flash::DeleteFailed),
        }
    }

    async fn show(
        &self,
        view: &'static str,
        cookie: &ForwardedCookie,
        id: Option<EntityId>,
    ) -> ViewOutcome<R> {
        let Some(id) = id else {
            return ViewOutcome::NotFound;
        };

        match self.fetch(cookie, id).await {
            Fetched::Found(model) => ViewOutcome::view(view, model),
            Fetched::Missing => ViewOutcome::NotFound,
            Fetched::Failed => ViewOutcome::ServiceFailure,
        }
    }

    /// Lookups are loaded again on every render so the submitted values are
    /// pre-selected.
    async fn render_form(
        &self,
        view: &'static str,
        cookie: &ForwardedCookie,
        input: R::Input,
        model_state: ModelState,
    ) -> FormOutcome<R> {
        let lookups = R::load_lookups(&self.client, cookie, Some(&input)).await;
        ViewOutcome::form(view, Some(input), lookups, model_state)
    }

    /// Field rules and conversion errors are reported together.
    fn bind_model(input: &R::Input) -> Result<R, ModelState> {
        let mut model_state = ModelState::validate(input);
        match input.bind(&mut model_state) {
            Some(model) if model_state.is_valid() => Ok(model),
            _ => Err(model_state),
        }
    }

    async fn fetch(&self, cookie: &ForwardedCookie, id: EntityId) -> Fetched<R> {
        let response = self.client.get(&R::item_path(id), cookie).await;

        if matches!(&response, Ok(upstream) if upstream.status == StatusCode::NOT_FOUND) {
            return Fetched::Missing;
        }

        match Self::success_body::<R>(response) {
            Ok(Some(model)) => Fetched::Found(model),
            Ok(None) => Fetched::Missing,
            Err(()) => Fetched::Failed,
        }
    }

    /// Body of a 2xx response. Anything else is logged here and collapses to
    /// `Err(())`, which callers map to the service-failure outcome.
    fn success_body<T: serde::de::DeserializeOwned>(
        response: Result<UpstreamResponse, RelayError>,
    ) -> Result<Option<T>, ()> {
        let upstream = response.map_err(|_| ())?;

        if !upstream.is_success() {
            tracing::warn!(
                entity = R::COLLECTION,
                status = %upstream.status,
                "Resource API returned failure"
            );
            return Err(());
        }

        upstream.json::<T>().map_err(|e| {
            tracing::warn!(entity = R::COLLECTION, error = %e, "Resource API body rejected");
        })
    }

    fn succeeded(response: &Result<UpstreamResponse, RelayError>) -> bool {
        matches!(response, Ok(upstream) if upstream.is_success())
    }

    fn log_rejection(
        action: &str,
        id: Option<EntityId>,
        response: &Result<UpstreamResponse, RelayError>,
    ) {
        match response {
            Ok(upstream) => tracing::warn!(
                entity = R::COLLECTION,
                action,
                id,
                status = %upstream.status,
                "Resource API rejected mutation"
            ),
            Err(e) => tracing::warn!(
                entity = R::COLLECTION,
                action,
                id,
                error = %e,
                "Resource API mutation did not complete"
            ),
        }
    }
}
