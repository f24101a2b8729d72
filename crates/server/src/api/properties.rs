use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staybook_core::dates::{parse_calendar_date, StayRange};
use staybook_core::domain::account::AccountRole;
use staybook_core::domain::availability::{AvailabilityConflict, AvailabilityEntry};
use staybook_core::domain::property::PropertyId;
use staybook_core::pricing::StayQuote;

use super::{ApiError, ApiState, Caller};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub check_in: String,
    pub check_out: String,
    #[serde(default = "default_guests")]
    pub guests: u32,
}

fn default_guests() -> u32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote: StayQuote,
    pub available: bool,
    pub conflicts: Vec<AvailabilityConflict>,
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityUpdate {
    pub date: String,
    pub is_available: bool,
    #[serde(default)]
    pub price: Option<Decimal>,
}

pub async fn quote(
    caller: Caller,
    State(state): State<ApiState>,
    Path(property_id): Path<String>,
    params: Result<Query<QuoteParams>, QueryRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let Query(params) = params.map_err(|error| ApiError::from_query(error, caller.correlation_id()))?;
    let property_id = PropertyId(property_id);
    let stay = StayRange::parse(&params.check_in, &params.check_out)
        .map_err(|error| caller.fail(error.into()))?;

    let quote = state
        .service
        .quote_stay(&property_id, &stay, params.guests)
        .await
        .map_err(|error| caller.fail(error))?;
    let conflicts = state
        .service
        .check_availability(&property_id, &stay)
        .await
        .map_err(|error| caller.fail(error))?;

    Ok(Json(QuoteResponse { quote, available: conflicts.is_empty(), conflicts }))
}

pub async fn list_availability(
    caller: Caller,
    State(state): State<ApiState>,
    Path(property_id): Path<String>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<Vec<AvailabilityEntry>>, ApiError> {
    let Query(params) = params.map_err(|error| ApiError::from_query(error, caller.correlation_id()))?;
    let start = parse_calendar_date(&params.start).map_err(|error| caller.fail(error.into()))?;
    let end = parse_calendar_date(&params.end).map_err(|error| caller.fail(error.into()))?;

    let entries = state
        .service
        .availability_for_property(&PropertyId(property_id), start, end)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(entries))
}

pub async fn set_availability(
    caller: Caller,
    State(state): State<ApiState>,
    Path(property_id): Path<String>,
    body: Result<Json<AvailabilityUpdate>, JsonRejection>,
) -> Result<Json<AvailabilityEntry>, ApiError> {
    caller.require_role(&[AccountRole::Host, AccountRole::Admin])?;
    let Json(update) = body.map_err(|error| ApiError::from_json(error, caller.correlation_id()))?;
    let date = parse_calendar_date(&update.date).map_err(|error| caller.fail(error.into()))?;

    let entry = state
        .service
        .set_availability(
            &caller.context,
            &PropertyId(property_id),
            date,
            update.is_available,
            update.price,
        )
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(entry))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use staybook_db::DemoDataset;

    use crate::api::test_support::{app, decimal, json_request, send};

    #[tokio::test]
    async fn quote_prices_weekday_and_weekend_stays() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            json_request(
                "GET",
                "/properties/PR-LAKE-1/quote?checkIn=2026-01-05&checkOut=2026-01-07&guests=2",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&body["quote"]["total"]), Decimal::new(25500, 2));
        assert_eq!(body["available"], true);

        let (_, body) = send(
            &app,
            json_request(
                "GET",
                "/properties/PR-LAKE-1/quote?checkIn=2026-01-09&checkOut=2026-01-11",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(decimal(&body["quote"]["subtotal"]), Decimal::new(240, 0));
        assert_eq!(decimal(&body["quote"]["total"]), Decimal::new(29750, 2));
    }

    #[tokio::test]
    async fn quote_rejects_inverted_ranges_and_unknown_properties() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            json_request(
                "GET",
                "/properties/PR-LAKE-1/quote?checkIn=2026-01-07&checkOut=2026-01-05",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["correlationId"], "req-test");

        let (status, _) = send(
            &app,
            json_request(
                "GET",
                "/properties/PR-NOPE/quote?checkIn=2026-01-05&checkOut=2026-01-07",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&app, json_request("GET", "/properties/PR-LAKE-1/quote", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hosts_edit_their_own_calendar() {
        let (app, _) = app().await;
        let host = Some((DemoDataset::HOST_ID, "host"));

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/properties/PR-LAKE-1/availability",
                host,
                Some(json!({"date": "2026-04-01", "isAvailable": false, "price": "150.00"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAvailable"], false);

        let (status, body) = send(
            &app,
            json_request(
                "GET",
                "/properties/PR-LAKE-1/availability?start=2026-04-01&end=2026-04-03",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["date"], "2026-04-01");

        let (status, _) = send(
            &app,
            json_request(
                "PUT",
                "/properties/PR-LAKE-1/availability",
                Some((DemoDataset::OTHER_HOST_ID, "host")),
                Some(json!({"date": "2026-04-02", "isAvailable": false})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            json_request(
                "PUT",
                "/properties/PR-LAKE-1/availability",
                Some((DemoDataset::GUEST_ID, "guest")),
                Some(json!({"date": "2026-04-02", "isAvailable": false})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
