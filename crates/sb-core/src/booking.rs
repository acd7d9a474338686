//! # Booking
//!
//! Validates the booking form and records the appointment. Signed-in users
//! also get a confirmation notification.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Appointment, AppointmentRequest, AppointmentStatus, Identity, Notification};
use crate::traits::{paths, DocumentStore};

pub struct BookingService {
    store: Arc<dyn DocumentStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn book(
        &self,
        identity: Option<&Identity>,
        request: AppointmentRequest,
    ) -> Result<Appointment> {
        let request = validate(request)?;

        let mut appointment = Appointment {
            id: String::new(),
            request,
            status: AppointmentStatus::Pending,
            user_id: identity.map(|user| user.uid.clone()),
            created_at: Utc::now().timestamp_millis(),
        };

        let record = serde_json::to_value(&appointment).map_err(|err| {
            log::error!("encoding appointment failed: {err}");
            AppError::WriteFailure
        })?;
        appointment.id = self
            .store
            .push(paths::APPOINTMENTS, record)
            .await
            .map_err(|err| {
                log::error!("booking appointment failed: {err:#}");
                AppError::WriteFailure
            })?;
        log::info!(
            "appointment {} booked for {} on {} at {}",
            appointment.id,
            appointment.request.service,
            appointment.request.date,
            appointment.request.time
        );

        if let Some(user) = identity {
            self.notify(user, &appointment).await;
        }
        Ok(appointment)
    }

    /// Best effort: the booking already stands if this fails.
    async fn notify(&self, user: &Identity, appointment: &Appointment) {
        let notification = Notification {
            title: "Booking received".into(),
            message: format!(
                "Your {} on {} at {} is pending confirmation.",
                appointment.request.service, appointment.request.date, appointment.request.time
            ),
            read: false,
            timestamp: appointment.created_at,
        };
        let path = paths::notifications(&user.uid);
        let pushed = match serde_json::to_value(&notification) {
            Ok(record) => self.store.push(&path, record).await.map(|_| ()),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = pushed {
            log::warn!("notifying {} about appointment {} failed: {err:#}", user.uid, appointment.id);
        }
    }
}

fn validate(mut request: AppointmentRequest) -> Result<AppointmentRequest> {
    let required = [
        ("name", &mut request.name),
        ("email", &mut request.email),
        ("phone", &mut request.phone),
        ("service", &mut request.service),
        ("date", &mut request.date),
        ("time", &mut request.time),
    ];
    for (field, value) in required {
        *value = value.trim().to_string();
        if value.is_empty() {
            return Err(AppError::validation(format!("{field} is required")));
        }
    }
    if !request.email.contains('@') {
        return Err(AppError::validation("email is not valid"));
    }
    request.message = request
        .message
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty());
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockDocumentStore;

    fn request() -> AppointmentRequest {
        AppointmentRequest {
            name: " Ana ".into(),
            email: "ana@example.com".into(),
            phone: "555-0100".into(),
            service: "Swedish massage".into(),
            date: "2026-11-02".into(),
            time: "14:00".into(),
            message: Some("   ".into()),
        }
    }

    #[tokio::test]
    async fn guest_booking_writes_appointment_only() {
        let mut store = MockDocumentStore::new();
        store
            .expect_push()
            .withf(|path, value| {
                path == "appointments"
                    && value["name"] == "Ana"
                    && value["status"] == "pending"
                    && value.get("userId").is_none()
                    && value.get("message").is_none()
            })
            .times(1)
            .returning(|_, _| Ok("a1".into()));

        let service = BookingService::new(Arc::new(store));
        let appointment = service.book(None, request()).await.unwrap();
        assert_eq!(appointment.id, "a1");
        assert_eq!(appointment.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn signed_in_booking_notifies_user() {
        let mut store = MockDocumentStore::new();
        store
            .expect_push()
            .withf(|path, value| path == "appointments" && value["userId"] == "u1")
            .times(1)
            .returning(|_, _| Ok("a1".into()));
        store
            .expect_push()
            .withf(|path, value| path == "notifications/u1" && value["read"] == false)
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("quota exceeded")));

        let user = Identity {
            uid: "u1".into(),
            ..Default::default()
        };
        let service = BookingService::new(Arc::new(store));
        let appointment = service.book(Some(&user), request()).await.unwrap();
        assert_eq!(appointment.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_without_write() {
        let mut store = MockDocumentStore::new();
        store.expect_push().never();
        let service = BookingService::new(Arc::new(store));

        let mut no_phone = request();
        no_phone.phone = " ".into();
        assert_eq!(
            service.book(None, no_phone).await,
            Err(AppError::Validation("phone is required".into()))
        );

        let mut bad_email = request();
        bad_email.email = "ana.example.com".into();
        assert!(matches!(service.book(None, bad_email).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn store_failure_is_a_write_failure() {
        let mut store = MockDocumentStore::new();
        store
            .expect_push()
            .returning(|_, _| Err(anyhow::anyhow!("offline")));

        let service = BookingService::new(Arc::new(store));
        assert_eq!(service.book(None, request()).await, Err(AppError::WriteFailure));
    }
}
