//! Services module
//!
//! This module contains the engine's business logic services and the
//! boundary dispatch from inbound events to outbound decisions.

pub mod leaderboard;
pub mod moderation;
pub mod raid;
pub mod referral;

// Re-export commonly used services
pub use leaderboard::LeaderboardService;
pub use moderation::ModerationService;
pub use raid::{spawn_sweeper, Clock, RaidDetector, SystemClock};
pub use referral::ReferralService;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::settings::Settings;
use crate::models::decision::{Decision, EscalationAction, InboundEvent};
use crate::storage::EngineStore;
use crate::utils::errors::Result;
use crate::utils::logging::log_decision;

/// Service factory wiring every engine service over one store
#[derive(Clone)]
pub struct ServiceFactory<S> {
    pub moderation: ModerationService<S>,
    pub referral: ReferralService<S>,
    pub leaderboard: LeaderboardService<S>,
    pub raid: Arc<RaidDetector>,
    settings: Settings,
}

impl<S: EngineStore + Clone> ServiceFactory<S> {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(store: S, settings: Settings) -> Self {
        Self {
            moderation: ModerationService::new(store.clone(), settings.clone()),
            referral: ReferralService::new(store.clone(), settings.clone()),
            leaderboard: LeaderboardService::new(store),
            raid: Arc::new(RaidDetector::new()),
            settings,
        }
    }

    /// Start the periodic raid-map sweep configured in `raid.sweep_interval_seconds`
    pub fn spawn_raid_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(
            Arc::clone(&self.raid),
            std::time::Duration::from_secs(self.settings.raid.sweep_interval_seconds),
        )
    }

    /// Dispatch one inbound event to the owning service and collect the
    /// decisions the adapter must apply. The match is exhaustive: adding an
    /// inbound variant without handling it is a compile error, not a silently
    /// dropped message.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<Vec<Decision>> {
        let decisions = match event {
            InboundEvent::UserJoined { chat_id, user_id, at } => {
                let settings = self.moderation.chat_settings(chat_id).await?;
                match self.raid.check_raid(chat_id, user_id, at, &settings) {
                    Some(detection) => vec![Decision::RaidDetected {
                        chat_id: detection.chat_id,
                        user_ids: detection.user_ids,
                        action: detection.action,
                        duration_minutes: detection.duration_minutes,
                    }],
                    None => vec![],
                }
            }

            InboundEvent::WarnRequested { chat_id, user_id, issuer_id, reason } => {
                let outcome = self.moderation.warn(chat_id, user_id, issuer_id, reason).await?;
                match outcome.escalation {
                    Some(escalation) => match escalation.action {
                        EscalationAction::Mute { minutes } => vec![Decision::MuteUser {
                            chat_id,
                            user_id,
                            duration_minutes: minutes,
                        }],
                        EscalationAction::Ban => vec![Decision::BanUser { chat_id, user_id }],
                    },
                    None => vec![],
                }
            }

            InboundEvent::StartCommand { profile, arg } => {
                let outcome = self.referral.handle_start(profile, arg.as_deref()).await?;
                match outcome.attribution {
                    Some(attribution) => vec![Decision::ReferralAttributed {
                        referrer_id: attribution.referrer_id,
                        referred_id: attribution.referred_id,
                        event_id: attribution.event_id,
                    }],
                    None => vec![],
                }
            }

            InboundEvent::CreateEventRequested { host_id, title, description, group_link } => {
                let request = crate::models::event::CreateEventRequest {
                    title,
                    description,
                    group_link,
                    ..Default::default()
                };
                let event = self.referral.create_event(host_id, request).await?;
                vec![Decision::EventCreated {
                    event_id: event.id,
                    event_code: event.event_code,
                    host_id,
                }]
            }

            InboundEvent::LeaderboardRequested { scope, limit } => {
                let rows = self.leaderboard.leaderboard(scope, limit).await?;
                vec![Decision::LeaderboardRows { scope, rows }]
            }
        };

        for decision in &decisions {
            log_decision(decision);
        }
        Ok(decisions)
    }
}
