use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use retreat_calendar::{Event, ExpandOptions};

use crate::cache::ContentCache;
use crate::config::Settings;
use crate::content::{ContentSource, SanityContentSource};
use crate::mail::{HttpMailTransport, MailTransport};
use crate::payments::{PaymentProcessor, StripePayments};
use crate::verification::{HumanVerifier, RecaptchaVerifier};

/// External services the handlers talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentSource>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub mail: Arc<dyn MailTransport>,
    pub verifier: Arc<dyn HumanVerifier>,
}

/// Request-independent rules the handlers apply.
#[derive(Debug, Clone)]
pub struct SitePolicy {
    pub expand: ExpandOptions,
    pub currency: String,
    pub min_amount: u64,
    pub max_amount: u64,
    pub min_score: f64,
    pub operator_address: String,
    pub revalidate_secret: String,
}

impl SitePolicy {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            expand: settings.expand_options()?,
            currency: settings.payments.currency.clone(),
            min_amount: settings.payments.min_amount,
            max_amount: settings.payments.max_amount,
            min_score: settings.verification.min_score,
            operator_address: settings.mail.operator_address.clone(),
            revalidate_secret: settings.revalidation.secret.clone(),
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<SitePolicy>,
    pub content: Arc<dyn ContentSource>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub mail: Arc<dyn MailTransport>,
    pub verifier: Arc<dyn HumanVerifier>,
    /// The full event list.
    pub events: Arc<ContentCache<Arc<Vec<Event>>>>,
    /// Single events by slug. Only found events are kept, so unknown slugs cannot grow it.
    pub event_pages: Arc<ContentCache<Event>>,
}

impl AppState {
    pub fn new(policy: SitePolicy, cache_ttl: Duration, collaborators: Collaborators) -> Self {
        Self {
            policy: Arc::new(policy),
            content: collaborators.content,
            payments: collaborators.payments,
            mail: collaborators.mail,
            verifier: collaborators.verifier,
            events: Arc::new(ContentCache::new(cache_ttl)),
            event_pages: Arc::new(ContentCache::new(cache_ttl)),
        }
    }

    /// State wired to the real HTTP collaborators.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.content.timeout_secs);
        let collaborators = Collaborators {
            content: Arc::new(SanityContentSource::new(&settings.content)?),
            payments: Arc::new(StripePayments::new(&settings.payments, timeout)?),
            mail: Arc::new(HttpMailTransport::new(&settings.mail, timeout)?),
            verifier: Arc::new(RecaptchaVerifier::new(&settings.verification, timeout)?),
        };

        Ok(Self::new(
            SitePolicy::from_settings(settings)?,
            Duration::from_secs(settings.content.revalidate_secs),
            collaborators,
        ))
    }
}
