//! Lottery activity model: immutable specification, mutable runtime status,
//! and the time-derived state machine.
//!
//! An activity's lifecycle state is never advanced by a background clock.
//! It is derived from the configured time window on every read via
//! [`Activity::refresh_state`] and written back so observers converge.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of losing slots rendered on a wheel-mode activity.
pub const DEFAULT_THANK_YOU_SLOTS: u32 = 2;

/// Lifecycle state of an activity.
///
/// `Pending → Running → Ended` follow from the activity's time window;
/// `Drawn` is entered exactly once by a batch draw and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    /// Before `start_time`.
    Pending,
    /// Within `[start_time, end_time]`; the only state accepting participants.
    Running,
    /// After `end_time`, before any draw ran.
    Ended,
    /// Batch draw completed. Terminal.
    Drawn,
}

/// How prizes are allocated to participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryMode {
    /// Winners decided in a single batch draw at draw time.
    Scheduled,
    /// Instant draw at participation time, rendered as a spinning wheel.
    Wheel,
    /// Instant draw at participation time.
    Draw,
}

impl LotteryMode {
    /// Whether participation in this mode runs an instant draw.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        matches!(self, Self::Wheel | Self::Draw)
    }
}

/// Who is admitted to an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRule {
    /// Anyone with an email address.
    None,
    /// Authenticated users only.
    Login,
    /// Callers who commented on the target content.
    Comment,
    /// Authenticated users who commented on the target content.
    LoginAndComment,
}

impl ParticipationRule {
    /// Whether this rule requires an authenticated principal.
    #[must_use]
    pub const fn requires_login(self) -> bool {
        matches!(self, Self::Login | Self::LoginAndComment)
    }

    /// Whether this rule requires a prior comment on the target content.
    #[must_use]
    pub const fn requires_comment(self) -> bool {
        matches!(self, Self::Comment | Self::LoginAndComment)
    }
}

/// A prize line configured on an activity.
///
/// `remaining` is live stock decremented by instant draws; batch draws
/// work from per-name counters seeded with `quantity` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// Display name. Doubles as the aggregation key in batch draws.
    pub name: String,
    /// Optional description shown to participants.
    #[serde(default)]
    pub description: String,
    /// Optional image URL for wheel rendering.
    #[serde(default)]
    pub image_url: String,
    /// Total units configured.
    pub quantity: u32,
    /// Units still available for instant draws.
    pub remaining: u32,
    /// Win probability in percent. Values are not clamped; the selector
    /// interprets them (see [`crate::domain::draw`]).
    pub probability: u32,
}

/// A recorded win, stored on the activity after a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    /// Winner identity: username for authenticated paths, email otherwise.
    pub identifier: String,
    /// Name of the prize won.
    pub prize_name: String,
    /// When the win was recorded.
    pub won_at: DateTime<Utc>,
}

/// Operator-authored configuration of an activity. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySpec {
    /// Human-readable title.
    pub title: String,
    /// Optional long description.
    #[serde(default)]
    pub description: String,
    /// Participation opens at this instant (Unix epoch when unset by the
    /// operator, i.e. "open since forever").
    pub start_time: DateTime<Utc>,
    /// Participation closes after this instant. `None` keeps the window
    /// open until a manual draw.
    pub end_time: Option<DateTime<Utc>>,
    /// Scheduled batch draw time. Falls back to `end_time`; with neither
    /// set the activity is drawn manually or not at all.
    pub draw_time: Option<DateTime<Utc>>,
    /// Prize allocation mode.
    pub mode: LotteryMode,
    /// Admission rule.
    pub rule: ParticipationRule,
    /// Configured prize lines, in declaration order.
    pub prizes: Vec<Prize>,
    /// Participant cap. `None` means unlimited.
    pub max_participants: Option<u32>,
    /// Whether the same identity may participate more than once.
    pub allow_duplicate: bool,
    /// Content reference for comment-gated admission.
    pub target_post: Option<String>,
    /// Losing slots rendered on wheel mode.
    pub thank_you_slots: u32,
}

impl ActivitySpec {
    /// Derives the time-based lifecycle state at `now`.
    ///
    /// `Pending` before `start_time`, `Running` within
    /// `[start_time, end_time]`, `Ended` strictly after `end_time`. An
    /// activity without an `end_time` never ends on its own. `Drawn` is
    /// never derived here; it is only entered by a batch draw.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> ActivityState {
        if now < self.start_time {
            ActivityState::Pending
        } else if self.end_time.is_some_and(|end| now > end) {
            ActivityState::Ended
        } else {
            ActivityState::Running
        }
    }

    /// The instant past which an automatic batch draw becomes due, if
    /// the activity has one at all.
    #[must_use]
    pub fn effective_draw_time(&self) -> Option<DateTime<Utc>> {
        self.draw_time.or(self.end_time)
    }
}

/// Mutable runtime status of an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStatus {
    /// Current lifecycle state (last written-back derivation).
    pub state: ActivityState,
    /// Number of successful participations recorded.
    pub participant_count: u32,
    /// When the batch draw ran, if it has.
    pub drawn_at: Option<DateTime<Utc>>,
    /// Batch draw results. Assigned once, atomically with `state = Drawn`.
    #[serde(default)]
    pub winners: Vec<Winner>,
}

impl Default for ActivityStatus {
    fn default() -> Self {
        Self {
            state: ActivityState::Pending,
            participant_count: 0,
            drawn_at: None,
            winners: Vec::new(),
        }
    }
}

/// A lottery activity: unique name, spec, and live status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity name. Primary key everywhere: store, events,
    /// WebSocket subscriptions, token derivation.
    pub name: String,
    /// Operator-authored configuration.
    pub spec: ActivitySpec,
    /// Runtime status.
    pub status: ActivityStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Creates a new activity in `Pending` status.
    #[must_use]
    pub fn new(name: String, spec: ActivitySpec) -> Self {
        Self {
            name,
            spec,
            status: ActivityStatus::default(),
            created_at: Utc::now(),
        }
    }

    /// Re-derives the lifecycle state at `now` and writes it back.
    ///
    /// Returns `Some((previous, current))` when the stored state changed,
    /// `None` otherwise. `Drawn` is terminal: once set, no derivation can
    /// leave it.
    pub fn refresh_state(&mut self, now: DateTime<Utc>) -> Option<(ActivityState, ActivityState)> {
        if self.status.state == ActivityState::Drawn {
            return None;
        }
        let derived = self.spec.state_at(now);
        if derived == self.status.state {
            return None;
        }
        let previous = self.status.state;
        self.status.state = derived;
        Some((previous, derived))
    }

    /// Whether an automatic batch draw is due at `now`.
    ///
    /// True when the activity is `Running` or `Ended` and `now` is past
    /// the effective draw time. Activities without a draw or end time
    /// are never auto-drawn. Call after [`Self::refresh_state`] so the
    /// decision uses the current state.
    #[must_use]
    pub fn auto_draw_due(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status.state,
            ActivityState::Running | ActivityState::Ended
        ) && self.spec.effective_draw_time().is_some_and(|due| now > due)
    }

    /// Whether the participant cap has been reached.
    #[must_use]
    pub fn capacity_reached(&self) -> bool {
        self.spec
            .max_participants
            .is_some_and(|max| self.status.participant_count >= max)
    }
}

/// Filter for activity list queries. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Case-insensitive substring match against name and title.
    pub keyword: Option<String>,
    /// Exact lifecycle state match.
    pub state: Option<ActivityState>,
    /// Exact admission rule match.
    pub rule: Option<ParticipationRule>,
}

impl ActivityFilter {
    /// Whether `activity` passes every set criterion.
    #[must_use]
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(keyword) = &self.keyword {
            let kw = keyword.to_lowercase();
            if !activity.name.to_lowercase().contains(&kw)
                && !activity.spec.title.to_lowercase().contains(&kw)
            {
                return false;
            }
        }
        if let Some(state) = self.state
            && activity.status.state != state
        {
            return false;
        }
        if let Some(rule) = self.rule
            && activity.spec.rule != rule
        {
            return false;
        }
        true
    }
}

/// Lightweight summary of an activity for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    /// Activity name.
    pub name: String,
    /// Activity title.
    pub title: String,
    /// Current lifecycle state.
    pub state: ActivityState,
    /// Prize allocation mode.
    pub mode: LotteryMode,
    /// Admission rule.
    pub rule: ParticipationRule,
    /// Number of recorded participations.
    pub participant_count: u32,
    /// Participation window start.
    pub start_time: DateTime<Utc>,
    /// Participation window end, if the activity has one.
    pub end_time: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Activity> for ActivitySummary {
    fn from(activity: &Activity) -> Self {
        Self {
            name: activity.name.clone(),
            title: activity.spec.title.clone(),
            state: activity.status.state,
            mode: activity.spec.mode,
            rule: activity.spec.rule,
            participant_count: activity.status.participant_count,
            start_time: activity.spec.start_time,
            end_time: activity.spec.end_time,
            created_at: activity.created_at,
        }
    }
}

// ── String Conversions ──────────────────────────────────────────────────

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Ended => "ended",
            Self::Drawn => "drawn",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ActivityState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "ended" => Ok(Self::Ended),
            "drawn" => Ok(Self::Drawn),
            other => Err(format!("unknown activity state: {other}")),
        }
    }
}

impl fmt::Display for LotteryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::Wheel => "wheel",
            Self::Draw => "draw",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LotteryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "wheel" => Ok(Self::Wheel),
            "draw" => Ok(Self::Draw),
            other => Err(format!("unknown lottery mode: {other}")),
        }
    }
}

impl fmt::Display for ParticipationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Comment => "comment",
            Self::LoginAndComment => "login_and_comment",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ParticipationRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "comment" => Ok(Self::Comment),
            "login_and_comment" => Ok(Self::LoginAndComment),
            other => Err(format!("unknown participation rule: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn spec_with_window(start: DateTime<Utc>, end: DateTime<Utc>) -> ActivitySpec {
        ActivitySpec {
            title: "Test Giveaway".to_string(),
            description: String::new(),
            start_time: start,
            end_time: Some(end),
            draw_time: None,
            mode: LotteryMode::Scheduled,
            rule: ParticipationRule::None,
            prizes: vec![],
            max_participants: None,
            allow_duplicate: false,
            target_post: None,
            thank_you_slots: DEFAULT_THANK_YOU_SLOTS,
        }
    }

    #[test]
    fn state_derivation_follows_time_window() {
        let now = Utc::now();
        let spec = spec_with_window(now, now + Duration::hours(1));

        assert_eq!(
            spec.state_at(now - Duration::seconds(1)),
            ActivityState::Pending
        );
        assert_eq!(spec.state_at(now), ActivityState::Running);
        // The window is inclusive of its end instant.
        assert_eq!(
            spec.state_at(now + Duration::hours(1)),
            ActivityState::Running
        );
        assert_eq!(
            spec.state_at(now + Duration::hours(1) + Duration::seconds(1)),
            ActivityState::Ended
        );
    }

    #[test]
    fn open_ended_activity_never_ends_or_draws() {
        let now = Utc::now();
        let mut spec = spec_with_window(now - Duration::hours(1), now);
        spec.end_time = None;

        assert_eq!(spec.state_at(now + Duration::days(365)), ActivityState::Running);
        assert_eq!(spec.effective_draw_time(), None);

        let mut activity = Activity::new("evergreen".to_string(), spec);
        activity.refresh_state(now);
        assert!(!activity.auto_draw_due(now + Duration::days(365)));
    }

    #[test]
    fn refresh_state_reports_transition_once() {
        let now = Utc::now();
        let spec = spec_with_window(now - Duration::hours(1), now + Duration::hours(1));
        let mut activity = Activity::new("summer".to_string(), spec);

        assert_eq!(
            activity.refresh_state(now),
            Some((ActivityState::Pending, ActivityState::Running))
        );
        // Second refresh at the same instant is a no-op.
        assert_eq!(activity.refresh_state(now), None);
        assert_eq!(activity.status.state, ActivityState::Running);
    }

    #[test]
    fn drawn_state_is_terminal() {
        let now = Utc::now();
        let spec = spec_with_window(now - Duration::hours(2), now - Duration::hours(1));
        let mut activity = Activity::new("done".to_string(), spec);
        activity.status.state = ActivityState::Drawn;

        assert_eq!(activity.refresh_state(now), None);
        assert_eq!(activity.status.state, ActivityState::Drawn);
    }

    #[test]
    fn auto_draw_falls_back_to_end_time() {
        let now = Utc::now();
        let spec = spec_with_window(now - Duration::hours(2), now - Duration::hours(1));
        let mut activity = Activity::new("ended".to_string(), spec);
        activity.refresh_state(now);

        assert_eq!(activity.status.state, ActivityState::Ended);
        assert!(activity.auto_draw_due(now));
    }

    #[test]
    fn auto_draw_honours_explicit_draw_time() {
        let now = Utc::now();
        let mut spec = spec_with_window(now - Duration::hours(1), now + Duration::hours(1));
        spec.draw_time = Some(now + Duration::minutes(30));
        let mut activity = Activity::new("midway".to_string(), spec);
        activity.refresh_state(now);

        assert!(!activity.auto_draw_due(now));
        // Due strictly after the draw moment, not at it.
        assert!(!activity.auto_draw_due(now + Duration::minutes(30)));
        assert!(activity.auto_draw_due(now + Duration::minutes(31)));
    }

    #[test]
    fn auto_draw_requires_running_or_ended() {
        let now = Utc::now();
        let mut spec = spec_with_window(now + Duration::hours(1), now + Duration::hours(2));
        // Misconfigured draw time before the window opens.
        spec.draw_time = Some(now - Duration::hours(1));
        let activity = Activity::new("early".to_string(), spec);

        assert_eq!(activity.status.state, ActivityState::Pending);
        assert!(!activity.auto_draw_due(now));
    }

    #[test]
    fn capacity_check() {
        let now = Utc::now();
        let mut spec = spec_with_window(now, now + Duration::hours(1));
        spec.max_participants = Some(2);
        let mut activity = Activity::new("small".to_string(), spec);

        assert!(!activity.capacity_reached());
        activity.status.participant_count = 2;
        assert!(activity.capacity_reached());

        activity.spec.max_participants = None;
        assert!(!activity.capacity_reached());
    }

    #[test]
    fn filter_matches_keyword_case_insensitively() {
        let now = Utc::now();
        let spec = spec_with_window(now, now + Duration::hours(1));
        let activity = Activity::new("summer-giveaway".to_string(), spec);

        let filter = ActivityFilter {
            keyword: Some("SUMMER".to_string()),
            ..ActivityFilter::default()
        };
        assert!(filter.matches(&activity));

        let filter = ActivityFilter {
            keyword: Some("winter".to_string()),
            ..ActivityFilter::default()
        };
        assert!(!filter.matches(&activity));
    }

    #[test]
    fn filter_matches_state_and_rule() {
        let now = Utc::now();
        let mut spec = spec_with_window(now - Duration::hours(1), now + Duration::hours(1));
        spec.rule = ParticipationRule::Login;
        let mut activity = Activity::new("gated".to_string(), spec);
        activity.refresh_state(now);

        let filter = ActivityFilter {
            state: Some(ActivityState::Running),
            rule: Some(ParticipationRule::Login),
            ..ActivityFilter::default()
        };
        assert!(filter.matches(&activity));

        let filter = ActivityFilter {
            state: Some(ActivityState::Drawn),
            ..ActivityFilter::default()
        };
        assert!(!filter.matches(&activity));
    }

    #[test]
    fn enum_round_trip_through_strings() {
        for state in [
            ActivityState::Pending,
            ActivityState::Running,
            ActivityState::Ended,
            ActivityState::Drawn,
        ] {
            let parsed: Result<ActivityState, _> = state.to_string().parse();
            assert_eq!(parsed, Ok(state));
        }
        assert_eq!("RUNNING".parse(), Ok(ActivityState::Running));
        assert_eq!(
            "login_and_comment".parse(),
            Ok(ParticipationRule::LoginAndComment)
        );
        assert_eq!("WHEEL".parse(), Ok(LotteryMode::Wheel));
        assert!("bogus".parse::<ActivityState>().is_err());
    }

    #[test]
    fn summary_reflects_activity() {
        let now = Utc::now();
        let spec = spec_with_window(now, now + Duration::hours(1));
        let mut activity = Activity::new("summary-test".to_string(), spec);
        activity.status.participant_count = 7;

        let summary = ActivitySummary::from(&activity);
        assert_eq!(summary.name, "summary-test");
        assert_eq!(summary.title, "Test Giveaway");
        assert_eq!(summary.participant_count, 7);
    }
}
