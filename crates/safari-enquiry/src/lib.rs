//! Booking and contact enquiries: form validation, plain-text notification
//! composition, and the delivery seam.
//!
//! Delivery is fire-and-forget. A failed send is logged and reported back to
//! the caller; nothing is queued or retried.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use safari_catalog::{Catalog, SiteConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "safari-enquiry";

pub const MAX_TRAVELLERS: u32 = 20;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnquiryError {
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

/// Raw booking form. Every field is optional at this stage so that missing
/// input turns into a field error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub tour: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub travel_date: String,
    #[serde(default)]
    pub travellers: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidBooking {
    pub tour_slug: String,
    pub tour_title: String,
    pub unit_price: f64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub travel_date: NaiveDate,
    pub travellers: u32,
    pub message: Option<String>,
}

impl ValidBooking {
    pub fn estimated_total(&self) -> f64 {
        self.unit_price * f64::from(self.travellers)
    }
}

impl BookingRequest {
    /// Collects every problem with the form in one pass.
    pub fn validate(&self, catalog: &Catalog, today: NaiveDate) -> Result<ValidBooking, EnquiryError> {
        let mut errors = Vec::new();

        let tour = catalog.find_tour(self.tour.trim());
        if tour.is_none() {
            errors.push(FieldError::new("tour", "Please choose a tour from the catalog"));
        }
        let full_name = required(&self.full_name, "full_name", "Please tell us your name", &mut errors);
        let email = checked_email(&self.email, &mut errors);

        let travel_date = match NaiveDate::parse_from_str(self.travel_date.trim(), DATE_FORMAT) {
            Ok(date) if date < today => {
                errors.push(FieldError::new("travel_date", "Travel date cannot be in the past"));
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new("travel_date", "Use the YYYY-MM-DD format"));
                None
            }
        };

        let travellers = match self.travellers.trim().parse::<u32>() {
            Ok(n) if (1..=MAX_TRAVELLERS).contains(&n) => Some(n),
            _ => {
                errors.push(FieldError::new(
                    "travellers",
                    format!("Group size must be between 1 and {MAX_TRAVELLERS}"),
                ));
                None
            }
        };

        match (tour, full_name, email, travel_date, travellers) {
            (Some(tour), Some(full_name), Some(email), Some(travel_date), Some(travellers)) => {
                Ok(ValidBooking {
                    tour_slug: tour.slug.clone(),
                    tour_title: tour.title.clone(),
                    unit_price: tour.price,
                    full_name,
                    email,
                    phone: optional(&self.phone),
                    travel_date,
                    travellers,
                    message: optional(&self.message),
                })
            }
            _ => Err(EnquiryError::Invalid(errors)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidContact {
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<ValidContact, EnquiryError> {
        let mut errors = Vec::new();
        let full_name = required(&self.full_name, "full_name", "Please tell us your name", &mut errors);
        let email = checked_email(&self.email, &mut errors);
        let message = required(&self.message, "message", "Please write a message", &mut errors);

        match (full_name, email, message) {
            (Some(full_name), Some(email), Some(message)) => Ok(ValidContact {
                full_name,
                email,
                subject: optional(&self.subject).unwrap_or_else(|| "General enquiry".to_string()),
                message,
            }),
            _ => Err(EnquiryError::Invalid(errors)),
        }
    }
}

fn required(
    value: &str,
    field: &'static str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, message));
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn checked_email(value: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let email = value.trim();
    if is_plausible_email(email) {
        Some(email.to_string())
    } else {
        errors.push(FieldError::new("email", "Please enter a valid email address"));
        None
    }
}

/// `local@domain.tld` with no whitespace; deliverability is not checked.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub reference: Uuid,
    pub created_at: DateTime<Utc>,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Operator notification plus customer acknowledgement for one booking.
pub fn compose_booking_notifications(site: &SiteConfig, booking: &ValidBooking) -> Vec<Notification> {
    let reference = Uuid::new_v4();
    let created_at = Utc::now();
    let phone = booking.phone.as_deref().unwrap_or("not provided");
    let message = booking.message.as_deref().unwrap_or("(none)");

    let operator = Notification {
        reference,
        created_at,
        to: site.notification_recipient().to_string(),
        reply_to: Some(booking.email.clone()),
        subject: format!("New booking request: {} ({})", booking.tour_title, booking.travel_date),
        body: format!(
            "Reference: {reference}\n\
             Tour: {} ({})\n\
             Travel date: {}\n\
             Travellers: {}\n\
             Estimated total: USD {:.2}\n\
             Name: {}\n\
             Email: {}\n\
             Phone: {phone}\n\
             \n\
             Message:\n{message}\n",
            booking.tour_title,
            booking.tour_slug,
            booking.travel_date.format(DATE_FORMAT),
            booking.travellers,
            booking.estimated_total(),
            booking.full_name,
            booking.email,
        ),
    };

    let customer = Notification {
        reference,
        created_at,
        to: booking.email.clone(),
        reply_to: Some(site.contact_email.clone()),
        subject: format!("{}: we received your booking request", site.business_name),
        body: format!(
            "Hello {},\n\n\
             Thank you for choosing {}. We have received your request for {} \
             on {} for {} traveller(s) and will confirm availability shortly.\n\n\
             Your reference is {reference}.\n",
            booking.full_name,
            site.business_name,
            booking.tour_title,
            booking.travel_date.format(DATE_FORMAT),
            booking.travellers,
        ),
    };

    vec![operator, customer]
}

pub fn compose_contact_notification(site: &SiteConfig, contact: &ValidContact) -> Notification {
    let reference = Uuid::new_v4();
    Notification {
        reference,
        created_at: Utc::now(),
        to: site.notification_recipient().to_string(),
        reply_to: Some(contact.email.clone()),
        subject: format!("Website enquiry: {}", contact.subject),
        body: format!(
            "Reference: {reference}\nFrom: {} <{}>\n\n{}\n",
            contact.full_name, contact.email, contact.message
        ),
    }
}

/// Outbound delivery seam. The transport itself lives outside this crate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            reference = %notification.reference,
            to = %notification.to,
            subject = %notification.subject,
            "notification queued for delivery"
        );
        Ok(())
    }
}

/// Keeps every notification in memory; handy for previews and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("memory notifier lock poisoned"))?
            .push(notification.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub reference: Option<Uuid>,
    pub attempted: usize,
    pub failed: usize,
}

/// Sends each notification once. Failures are logged and counted, never retried.
pub async fn deliver(notifier: &dyn Notifier, notifications: &[Notification]) -> DeliveryReport {
    let reference = notifications.first().map(|n| n.reference);
    let span = info_span!("deliver", reference = ?reference, count = notifications.len());

    async {
        let mut failed = 0usize;
        for notification in notifications {
            if let Err(err) = notifier.send(notification).await {
                failed += 1;
                warn!(to = %notification.to, error = %err, "notification delivery failed");
            }
        }
        DeliveryReport {
            reference,
            attempted: notifications.len(),
            failed,
        }
    }
    .instrument(span)
    .await
}
