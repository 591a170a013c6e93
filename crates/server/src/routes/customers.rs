use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post},
};
use db::{
    Page,
    models::customer::{CustomerStatus, CustomerType},
};
use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, de};
use services::services::{
    customers::{
        CreateCustomer, CustomerDto, DeleteCustomer, GetCustomerById, ListCustomers,
        PromoteCustomerToVip, UpdateCustomer,
    },
    mediator::Request,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/{id}/promote", post(promote_customer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Query string of `GET /customers`. A parameter sent with an empty value
/// (`?type=`) counts as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "empty_as_none")]
    pub customer_type: Option<CustomerType>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<CustomerStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page_number: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page_size: Option<u32>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

async fn dispatch<R: Request>(state: &AppState, request: R) -> Result<R::Response, ApiError> {
    Ok(state.dispatcher().dispatch(request).await?.into_result()?)
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = dispatch(
        &state,
        CreateCustomer {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
        },
    )
    .await?;

    let location = format!("/api/customers/{}", customer.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ResponseJson(customer),
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<CustomerDto>, ApiError> {
    let customer = dispatch(&state, GetCustomerById { id }).await?;
    Ok(ResponseJson(customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<ResponseJson<Page<CustomerDto>>, ApiError> {
    let request = ListCustomers {
        name: query.name,
        email: query.email,
        customer_type: query.customer_type,
        status: query.status,
        page_number: query.page_number.unwrap_or(1),
        page_size: query.page_size.unwrap_or(state.default_page_size()),
    };
    let page = dispatch(&state, request).await?;
    Ok(ResponseJson(page))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<ResponseJson<CustomerDto>, ApiError> {
    let customer = dispatch(
        &state,
        UpdateCustomer {
            id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
        },
    )
    .await?;
    Ok(ResponseJson(customer))
}

pub async fn promote_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<CustomerDto>, ApiError> {
    let customer = dispatch(&state, PromoteCustomerToVip { id }).await?;
    Ok(ResponseJson(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    dispatch(&state, DeleteCustomer { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
