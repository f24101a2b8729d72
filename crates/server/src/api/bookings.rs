use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use staybook_core::domain::account::AccountRole;
use staybook_core::domain::booking::{Booking, BookingId, BookingStatus};
use staybook_db::{CreatedBooking, NewBooking};

use super::{ApiError, ApiState, Caller};

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

pub async fn create(
    caller: Caller,
    State(state): State<ApiState>,
    body: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedBooking>), ApiError> {
    let Json(request) = body.map_err(|error| ApiError::from_json(error, caller.correlation_id()))?;
    let created = state
        .service
        .create_booking(&caller.context, request)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn show(
    caller: Caller,
    State(state): State<ApiState>,
    Path(booking_id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .service
        .get_booking(&caller.context, &BookingId(booking_id))
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(booking))
}

pub async fn update_status(
    caller: Caller,
    State(state): State<ApiState>,
    Path(booking_id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<Booking>, ApiError> {
    caller.require_role(&[AccountRole::Host, AccountRole::Admin])?;
    let Json(change) = body.map_err(|error| ApiError::from_json(error, caller.correlation_id()))?;
    let target = change
        .status
        .parse::<BookingStatus>()
        .map_err(|error| caller.fail(error.into()))?;

    let booking = state
        .service
        .update_status(&caller.context, &BookingId(booking_id), target)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(booking))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use staybook_db::DemoDataset;

    use crate::api::test_support::{app, decimal, json_request, send};

    const GUEST: Option<(&str, &str)> = Some((DemoDataset::GUEST_ID, "guest"));
    const HOST: Option<(&str, &str)> = Some((DemoDataset::HOST_ID, "host"));

    fn weekday_request() -> Value {
        json!({
            "propertyId": DemoDataset::LAKESIDE_PROPERTY_ID,
            "checkIn": "2026-01-05",
            "checkOut": "2026-01-07",
            "guests": 2,
            "specialRequests": "crib please"
        })
    }

    #[tokio::test]
    async fn guests_create_and_read_bookings() {
        let (app, _) = app().await;

        let (status, body) =
            send(&app, json_request("POST", "/bookings", GUEST, Some(weekday_request()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["booking"]["status"], "pending");
        assert_eq!(decimal(&body["booking"]["pricing"]["total"]), Decimal::new(25500, 2));
        assert!(body.get("checkoutUrl").is_none());

        let booking_id = body["booking"]["id"].as_str().expect("booking id").to_owned();
        let (status, body) =
            send(&app, json_request("GET", &format!("/bookings/{booking_id}"), GUEST, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], booking_id.as_str());

        let (status, _) = send(
            &app,
            json_request(
                "GET",
                &format!("/bookings/{booking_id}"),
                Some((DemoDataset::OTHER_HOST_ID, "host")),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn create_reports_each_failure_class() {
        let (app, _) = app().await;

        let mut inverted = weekday_request();
        inverted["checkOut"] = json!("2026-01-04");
        let (status, _) = send(&app, json_request("POST", "/bookings", GUEST, Some(inverted))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/bookings",
                Some((DemoDataset::KYC_PENDING_GUEST_ID, "guest")),
                Some(weekday_request()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "KYC_NOT_VERIFIED");

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/bookings",
                Some((DemoDataset::NO_CARD_GUEST_ID, "guest")),
                Some(weekday_request()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PAYMENT_NOT_VERIFIED");

        let mut missing = weekday_request();
        missing["propertyId"] = json!("PR-NOPE");
        let (status, _) = send(&app, json_request("POST", "/bookings", GUEST, Some(missing))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            json_request("POST", "/bookings", GUEST, Some(json!({"propertyId": "PR-LAKE-1"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn hosts_confirm_and_cancel_through_status_patch() {
        let (app, _) = app().await;
        let (_, body) =
            send(&app, json_request("POST", "/bookings", GUEST, Some(weekday_request()))).await;
        let booking_id = body["booking"]["id"].as_str().expect("booking id").to_owned();
        let uri = format!("/bookings/{booking_id}/status");

        let (status, _) =
            send(&app, json_request("PATCH", &uri, GUEST, Some(json!({"status": "confirmed"}))))
                .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&app, json_request("PATCH", &uri, HOST, Some(json!({"status": "confirmed"}))))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "confirmed");

        let (status, _) =
            send(&app, json_request("POST", "/bookings", GUEST, Some(weekday_request()))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            send(&app, json_request("PATCH", &uri, HOST, Some(json!({"status": "archived"}))))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) =
            send(&app, json_request("PATCH", &uri, HOST, Some(json!({"status": "cancelled"}))))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");

        let (status, body) =
            send(&app, json_request("PATCH", &uri, HOST, Some(json!({"status": "confirmed"}))))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TRANSITION");
    }
}
