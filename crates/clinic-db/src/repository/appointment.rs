//! # Appointment Repository
//!
//! Booking, listing, cancelling and rescheduling appointments.
//!
//! A booking identifies the customer by phone; an unknown phone creates a
//! bare customer profile in the same transaction as the appointment.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::customer::find_or_create_by_phone;
use clinic_core::AppointmentStatus;

/// Who the appointment is for.
#[derive(Debug, Clone)]
pub struct AppointmentContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// A booking request.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub details: String,
    pub doctor_id: Option<i64>,
    pub therapist_id: Option<i64>,
    pub created_by: Option<i64>,
}

/// An appointment with customer and staff names resolved.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: i64,
    pub customer_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(rename = "appointmentDate")]
    pub date: NaiveDate,
    #[serde(rename = "appointmentTime", serialize_with = "serialize_hhmm")]
    pub time: NaiveTime,
    pub details: String,
    pub status: AppointmentStatus,
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub therapist_id: Option<i64>,
    pub therapist_name: Option<String>,
}

fn serialize_hhmm<S: serde::Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format("%H:%M"))
}

/// Repository for appointments.
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: SqlitePool,
}

impl AppointmentRepository {
    /// Creates a new AppointmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AppointmentRepository { pool }
    }

    /// Books an appointment, creating the customer if the phone is new.
    ///
    /// ## Returns
    /// The new appointment id.
    pub async fn create(&self, contact: &AppointmentContact, appointment: &NewAppointment) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let customer_id =
            find_or_create_by_phone(&mut *tx, &contact.first_name, &contact.last_name, &contact.phone)
                .await?;

        debug!(customer_id, date = %appointment.date, time = %appointment.time, "Booking appointment");
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO appointments (
                customer_id, appointment_date, appointment_time, details,
                doctor_id, therapist_id, status, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(appointment.date)
        .bind(appointment.time)
        .bind(&appointment.details)
        .bind(appointment.doctor_id)
        .bind(appointment.therapist_id)
        .bind(AppointmentStatus::Scheduled)
        .bind(appointment.created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Scheduled appointments in date/time order, at most `limit`.
    pub async fn list_scheduled(&self, limit: i64) -> DbResult<Vec<AppointmentView>> {
        let appointments = sqlx::query_as::<_, AppointmentView>(
            r#"
            SELECT a.id, a.customer_id, c.first_name, c.last_name, c.phone,
                   a.appointment_date AS date, a.appointment_time AS time,
                   a.details, a.status,
                   a.doctor_id, dr.display_name AS doctor_name,
                   a.therapist_id, bt.display_name AS therapist_name
            FROM appointments a
            JOIN customers c ON c.id = a.customer_id
            LEFT JOIN users dr ON dr.id = a.doctor_id
            LEFT JOIN users bt ON bt.id = a.therapist_id
            WHERE a.status != 'Cancelled'
            ORDER BY a.appointment_date ASC, a.appointment_time ASC, a.id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    /// Cancels an appointment.
    pub async fn cancel(&self, id: i64) -> DbResult<()> {
        debug!(id, "Cancelling appointment");

        let result = sqlx::query("UPDATE appointments SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(AppointmentStatus::Cancelled)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }

    /// Moves an appointment to a new date and time.
    pub async fn reschedule(&self, id: i64, date: NaiveDate, time: NaiveTime) -> DbResult<()> {
        debug!(id, date = %date, time = %time, "Rescheduling appointment");

        let result = sqlx::query(
            "UPDATE appointments SET appointment_date = ?2, appointment_time = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(date)
        .bind(time)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Appointment", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
