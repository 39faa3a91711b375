//! Activity DTOs: creation requests, detail views, summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Activity, ActivityFilter, ActivitySpec, ActivityState, ActivitySummary, LotteryMode,
    ParticipationRule, Prize, Winner, DEFAULT_THANK_YOU_SLOTS,
};

/// Prize definition in creation requests and activity views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrizeDto {
    /// Prize name; shared names pool their stock in batch draws.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Image URL for display.
    #[serde(default)]
    pub image_url: String,
    /// Total number of units.
    pub quantity: u32,
    /// Remaining stock. Defaults to `quantity` on creation and is
    /// capped by it.
    #[serde(default)]
    pub remaining: Option<u32>,
    /// Win probability in percent (0–100).
    pub probability: u32,
}

impl PrizeDto {
    /// Converts into the domain prize, normalizing the stock counter.
    #[must_use]
    pub fn into_domain(self) -> Prize {
        let remaining = self.remaining.unwrap_or(self.quantity).min(self.quantity);
        Prize {
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            quantity: self.quantity,
            remaining,
            probability: self.probability,
        }
    }
}

impl From<&Prize> for PrizeDto {
    fn from(prize: &Prize) -> Self {
        Self {
            name: prize.name.clone(),
            description: prize.description.clone(),
            image_url: prize.image_url.clone(),
            quantity: prize.quantity,
            remaining: Some(prize.remaining),
            probability: prize.probability,
        }
    }
}

/// A drawn winner in activity views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerDto {
    /// Winner identity (username or email).
    pub identifier: String,
    /// Awarded prize name.
    pub prize_name: String,
    /// Award timestamp.
    pub won_at: DateTime<Utc>,
}

impl From<Winner> for WinnerDto {
    fn from(winner: Winner) -> Self {
        Self {
            identifier: winner.identifier,
            prize_name: winner.prize_name,
            won_at: winner.won_at,
        }
    }
}

/// Request body for `POST /activities`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateActivityRequest {
    /// Unique activity name, used in URLs.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Participation window start. Defaults to the epoch (open
    /// immediately).
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Participation window end (inclusive). Omit to keep the window
    /// open until a manual draw.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Scheduled draw moment; defaults to `end_time` when that is set.
    #[serde(default)]
    pub draw_time: Option<DateTime<Utc>>,
    /// Prize allocation mode. Defaults to `scheduled`.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "scheduled")]
    pub mode: Option<LotteryMode>,
    /// Admission rule. Defaults to `none`.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "none")]
    pub rule: Option<ParticipationRule>,
    /// Prize table.
    #[serde(default)]
    pub prizes: Vec<PrizeDto>,
    /// Participant cap; unlimited when omitted.
    #[serde(default)]
    pub max_participants: Option<u32>,
    /// Whether one identity may hold several records.
    #[serde(default)]
    pub allow_duplicate: bool,
    /// Default post for comment-gated participation.
    #[serde(default)]
    pub target_post: Option<String>,
    /// Consolation slots shown on losing results.
    #[serde(default)]
    pub thank_you_slots: Option<u32>,
}

impl CreateActivityRequest {
    /// Splits the request into the activity name and its spec.
    #[must_use]
    pub fn into_spec(self) -> (String, ActivitySpec) {
        let spec = ActivitySpec {
            title: self.title,
            description: self.description,
            start_time: self.start_time.unwrap_or(DateTime::UNIX_EPOCH),
            end_time: self.end_time,
            draw_time: self.draw_time,
            mode: self.mode.unwrap_or(LotteryMode::Scheduled),
            rule: self.rule.unwrap_or(ParticipationRule::None),
            prizes: self.prizes.into_iter().map(PrizeDto::into_domain).collect(),
            max_participants: self.max_participants,
            allow_duplicate: self.allow_duplicate,
            target_post: self.target_post,
            thank_you_slots: self.thank_you_slots.unwrap_or(DEFAULT_THANK_YOU_SLOTS),
        };
        (self.name, spec)
    }
}

/// Full activity view for detail and creation responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityView {
    /// Activity name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Current lifecycle state.
    #[schema(value_type = String, example = "running")]
    pub state: ActivityState,
    /// Prize allocation mode.
    #[schema(value_type = String)]
    pub mode: LotteryMode,
    /// Admission rule.
    #[schema(value_type = String)]
    pub rule: ParticipationRule,
    /// Participation window start.
    pub start_time: DateTime<Utc>,
    /// Participation window end, when the activity has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Scheduled draw moment, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_time: Option<DateTime<Utc>>,
    /// Prize table with live stock counters.
    pub prizes: Vec<PrizeDto>,
    /// Participant cap, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    /// Whether duplicate participation is allowed.
    pub allow_duplicate: bool,
    /// Default post for comment-gated participation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_post: Option<String>,
    /// Consolation slots shown on losing results.
    pub thank_you_slots: u32,
    /// Number of committed participations.
    pub participant_count: u32,
    /// When the batch draw ran, once drawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawn_at: Option<DateTime<Utc>>,
    /// Winner list; present once the activity is drawn.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub winners: Vec<WinnerDto>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Activity> for ActivityView {
    fn from(activity: Activity) -> Self {
        Self {
            name: activity.name,
            title: activity.spec.title,
            description: activity.spec.description,
            state: activity.status.state,
            mode: activity.spec.mode,
            rule: activity.spec.rule,
            start_time: activity.spec.start_time,
            end_time: activity.spec.end_time,
            draw_time: activity.spec.draw_time,
            prizes: activity.spec.prizes.iter().map(PrizeDto::from).collect(),
            max_participants: activity.spec.max_participants,
            allow_duplicate: activity.spec.allow_duplicate,
            target_post: activity.spec.target_post,
            thank_you_slots: activity.spec.thank_you_slots,
            participant_count: activity.status.participant_count,
            drawn_at: activity.status.drawn_at,
            winners: activity
                .status
                .winners
                .into_iter()
                .map(WinnerDto::from)
                .collect(),
            created_at: activity.created_at,
        }
    }
}

/// Condensed activity row for list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivitySummaryDto {
    /// Activity name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Current lifecycle state.
    #[schema(value_type = String)]
    pub state: ActivityState,
    /// Prize allocation mode.
    #[schema(value_type = String)]
    pub mode: LotteryMode,
    /// Admission rule.
    #[schema(value_type = String)]
    pub rule: ParticipationRule,
    /// Number of committed participations.
    pub participant_count: u32,
    /// Participation window start.
    pub start_time: DateTime<Utc>,
    /// Participation window end, when the activity has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<ActivitySummary> for ActivitySummaryDto {
    fn from(summary: ActivitySummary) -> Self {
        Self {
            name: summary.name,
            title: summary.title,
            state: summary.state,
            mode: summary.mode,
            rule: summary.rule,
            participant_count: summary.participant_count,
            start_time: summary.start_time,
            end_time: summary.end_time,
            created_at: summary.created_at,
        }
    }
}

/// Response body for `GET /activities`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityListResponse {
    /// Page of activity summaries.
    pub data: Vec<ActivitySummaryDto>,
    /// Pagination metadata.
    pub pagination: super::PaginationMeta,
}

/// Response body for `POST /activities/{name}/draw`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawResponse {
    /// Activity name.
    pub activity: String,
    /// Number of winners awarded by the draw.
    pub winner_count: u32,
    /// When the draw ran.
    pub drawn_at: Option<DateTime<Utc>>,
}

/// Filter query parameters for `GET /activities`.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityFilterParams {
    /// Substring match against name and title.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Lifecycle state filter.
    #[serde(default)]
    pub state: Option<ActivityState>,
    /// Admission rule filter.
    #[serde(default)]
    pub rule: Option<ParticipationRule>,
}

impl ActivityFilterParams {
    /// Converts into the domain filter, dropping blank keywords.
    #[must_use]
    pub fn into_filter(self) -> ActivityFilter {
        ActivityFilter {
            keyword: self.keyword.filter(|k| !k.trim().is_empty()),
            state: self.state,
            rule: self.rule,
        }
    }
}
