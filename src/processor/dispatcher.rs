use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channels::DeliveryChannel;
use crate::composer::{compose_sms, compose_voice_script, ResolvedLocation};
use crate::db::{ContactStore, EventStore};
use crate::error::DispatchError;
use crate::geocode::AddressResolver;
use crate::models::contact::ContactSnapshot;
use crate::models::dispatch::{
    AlertTrigger, Channel, DeliveryOutcome, DispatchOutcome, DispatchResult, RecipientReport,
};
use crate::models::sos_event::NewSosEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    ContactsResolving,
    ContactsEmpty,
    LocationResolving,
    Composing,
    Delivering,
    Recording,
    Completed,
    Failed,
}

struct Progress {
    dispatch_id: Uuid,
    state: DispatchState,
}

impl Progress {
    fn new() -> Self {
        Self {
            dispatch_id: Uuid::new_v4(),
            state: DispatchState::Idle,
        }
    }

    fn advance(&mut self, next: DispatchState) {
        debug!("dispatch {}: {:?} -> {:?}", self.dispatch_id, self.state, next);
        self.state = next;
    }
}

/// Drives one alert from contact lookup to the audit record.
pub struct Dispatcher {
    contacts: Arc<dyn ContactStore>,
    geocoder: Arc<dyn AddressResolver>,
    sms: Arc<dyn DeliveryChannel>,
    voice: Arc<dyn DeliveryChannel>,
    events: Arc<dyn EventStore>,
}

impl Dispatcher {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        geocoder: Arc<dyn AddressResolver>,
        sms: Arc<dyn DeliveryChannel>,
        voice: Arc<dyn DeliveryChannel>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            contacts,
            geocoder,
            sms,
            voice,
            events,
        }
    }

    fn channel_for(&self, channel: Channel) -> &Arc<dyn DeliveryChannel> {
        match channel {
            Channel::Sms => &self.sms,
            Channel::Call => &self.voice,
        }
    }

    /// Only a contact-store failure surfaces as an error. Delivery, geocoding
    /// and recording problems are folded into the returned outcome.
    pub async fn dispatch(&self, trigger: AlertTrigger) -> Result<DispatchOutcome, DispatchError> {
        let mut progress = Progress::new();
        info!(
            "Dispatch {} started: {} alert for user {} via {:?}",
            progress.dispatch_id, trigger.kind, trigger.user_id, trigger.channel
        );

        progress.advance(DispatchState::ContactsResolving);
        let contacts = match self.contacts.verified_contacts(trigger.user_id).await {
            Ok(contacts) => contacts,
            Err(e) => {
                progress.advance(DispatchState::Failed);
                error!("Dispatch {} could not load contacts: {:#}", progress.dispatch_id, e);
                return Err(DispatchError::ContactLookup(e));
            }
        };

        if contacts.is_empty() {
            progress.advance(DispatchState::ContactsEmpty);
            info!(
                "Dispatch {} refused: user {} has no verified emergency contacts",
                progress.dispatch_id, trigger.user_id
            );
            return Ok(DispatchOutcome::NoVerifiedContacts);
        }

        let location = match trigger.location {
            Some(coords) => {
                progress.advance(DispatchState::LocationResolving);
                let address = self.geocoder.resolve(coords).await;
                Some(ResolvedLocation { coords, address })
            }
            None => None,
        };

        progress.advance(DispatchState::Composing);
        let message = match trigger.channel {
            Channel::Sms => compose_sms(trigger.kind, &trigger.user_name, location.as_ref()),
            Channel::Call => {
                compose_voice_script(trigger.kind, &trigger.user_name, location.as_ref())
            }
        };

        progress.advance(DispatchState::Delivering);
        let phones: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
        let outcomes = self
            .channel_for(trigger.channel)
            .deliver(&phones, &message)
            .await;

        let recipients: Vec<RecipientReport> = contacts
            .iter()
            .zip(outcomes)
            .map(|(contact, outcome)| RecipientReport {
                name: contact.name.clone(),
                phone: contact.phone.clone(),
                outcome,
            })
            .collect();

        let contacts_attempted = recipients
            .iter()
            .filter(|r| r.outcome != DeliveryOutcome::Skipped)
            .count();
        let contacts_notified = recipients.iter().filter(|r| r.outcome.is_delivered()).count();

        progress.advance(DispatchState::Recording);
        let snapshot: Vec<ContactSnapshot> = contacts
            .iter()
            .zip(&recipients)
            .filter(|(_, r)| r.outcome != DeliveryOutcome::Skipped)
            .map(|(contact, r)| ContactSnapshot::of(contact, r.outcome.is_delivered()))
            .collect();

        let record = NewSosEvent {
            user_id: trigger.user_id,
            kind: trigger.kind,
            latitude: trigger.location.map(|c| c.latitude),
            longitude: trigger.location.map(|c| c.longitude),
            address: location.as_ref().map(|l| l.address.clone()),
            contacts_notified: contacts_notified as i32,
            contacts: snapshot,
        };
        let sos_event_id = match self.events.append(record).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(
                    "Dispatch {} delivered but could not be recorded: {:#}",
                    progress.dispatch_id, e
                );
                None
            }
        };

        progress.advance(DispatchState::Completed);
        info!(
            "Dispatch {} completed: {}/{} notified, event {:?}",
            progress.dispatch_id, contacts_notified, contacts_attempted, sos_event_id
        );

        let result = DispatchResult {
            success: contacts_notified > 0,
            channel: trigger.channel,
            contacts_notified,
            contacts_attempted,
            recipients,
            location_included: location.is_some(),
            address: location.map(|l| l.address),
            sos_event_id,
        };
        for failed in result.failures() {
            warn!(
                "Dispatch {}: not delivered to {} ({:?})",
                progress.dispatch_id, failed.name, failed.outcome
            );
        }
        Ok(DispatchOutcome::Dispatched(result))
    }
}
