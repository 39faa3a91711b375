//! Activity lifecycle and participation orchestration.
//!
//! Admission checks and the participation commit run while holding the
//! activity's write lock together with the participant table guard, so
//! a commit is atomic with respect to concurrent attempts on the same
//! activity. Lifecycle states are derived from the clock on every read
//! path and written back before any decision is taken; a batch draw is
//! triggered lazily from detail reads once the draw moment has passed.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::domain::{
    self, Activity, ActivityFilter, ActivitySpec, ActivityState, ActivitySummary,
    CommentDirectory, EventBus, LotteryEvent, LotteryStore, Participant, ParticipantId,
    ParticipationRule, Principal, Winner,
};
use crate::error::LotteryError;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Validates an email address for the email-identified paths.
///
/// # Errors
///
/// Returns [`LotteryError::InvalidInput`] when the address is blank or
/// malformed.
pub fn validate_email(email: &str) -> Result<(), LotteryError> {
    if email.trim().is_empty() {
        return Err(LotteryError::InvalidInput(
            "email must not be empty".to_string(),
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(LotteryError::InvalidInput(format!(
            "malformed email address: {email}"
        )));
    }
    Ok(())
}

/// Participation status view resolved from a token.
///
/// Lookups never fail: an unknown token simply reports no
/// participation.
#[derive(Debug, Clone)]
pub struct ParticipationStatus {
    /// Whether a record exists for the token in this activity.
    pub participated: bool,
    /// The token echoed back when a record was found.
    pub token: Option<String>,
    /// Whether the record won, instantly or in the batch draw.
    pub is_winner: bool,
    /// Prize name when `is_winner` is set.
    pub prize_name: Option<String>,
}

impl ParticipationStatus {
    fn absent() -> Self {
        Self {
            participated: false,
            token: None,
            is_winner: false,
            prize_name: None,
        }
    }
}

/// Result of a comment pre-check against the directory.
#[derive(Debug, Clone, Copy)]
pub struct CommentCheck {
    /// Whether a matching comment exists on the post.
    pub has_commented: bool,
    /// Whether the check ran against an authenticated identity.
    pub logged_in: bool,
}

/// Comment requirement applied during admission.
enum CommentGate<'a> {
    /// No comment requirement on this path.
    Off,
    /// Authenticated path: the comment must carry the username.
    ByUsername {
        post: Option<&'a str>,
        username: &'a str,
    },
    /// Anonymous path: the comment must carry the email.
    ByEmail {
        post: Option<&'a str>,
        email: &'a str,
    },
}

/// Identity and requirements of one participation attempt.
struct ParticipationIntent<'a> {
    rule: ParticipationRule,
    email: &'a str,
    username: Option<&'a str>,
    display_name: Option<&'a str>,
    ip: &'a str,
    gate: CommentGate<'a>,
}

/// Central orchestration service for activities and participation.
#[derive(Debug)]
pub struct LotteryService {
    store: Arc<LotteryStore>,
    comments: Arc<CommentDirectory>,
    event_bus: EventBus,
    token_salt: String,
}

impl LotteryService {
    /// Creates the service over shared stores and the event bus.
    #[must_use]
    pub fn new(
        store: Arc<LotteryStore>,
        comments: Arc<CommentDirectory>,
        event_bus: EventBus,
        token_salt: String,
    ) -> Self {
        Self {
            store,
            comments,
            event_bus,
            token_salt,
        }
    }

    // ── Activity lifecycle ──────────────────────────────────────────────

    /// Creates and registers a new activity.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidInput`] when the name or title is
    /// blank, the window is inverted, or the name is already taken.
    pub async fn create_activity(
        &self,
        name: &str,
        spec: ActivitySpec,
    ) -> Result<Activity, LotteryError> {
        if name.trim().is_empty() {
            return Err(LotteryError::InvalidInput(
                "activity name must not be empty".to_string(),
            ));
        }
        if spec.title.trim().is_empty() {
            return Err(LotteryError::InvalidInput(
                "activity title must not be empty".to_string(),
            ));
        }
        if let Some(end) = spec.end_time
            && end <= spec.start_time
        {
            return Err(LotteryError::InvalidInput(
                "end_time must be after start_time".to_string(),
            ));
        }

        let activity = Activity::new(name.to_string(), spec);
        let view = activity.clone();
        self.store.insert_activity(activity).await?;

        let _ = self.event_bus.publish(LotteryEvent::ActivityCreated {
            activity: view.name.clone(),
            mode: view.spec.mode,
            rule: view.spec.rule,
            end_time: view.spec.end_time,
            timestamp: Utc::now(),
        });
        tracing::info!(
            activity = name,
            mode = %view.spec.mode,
            rule = %view.spec.rule,
            "activity created"
        );
        Ok(view)
    }

    /// Returns the current view of one activity.
    ///
    /// The lifecycle state is refreshed first; when the draw moment has
    /// passed the batch draw runs before the view is taken, so a reader
    /// never observes a stale pre-draw activity.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::NotFound`] for an unknown name, or the
    /// draw errors when a due batch draw cannot run.
    pub async fn get_activity(&self, name: &str) -> Result<Activity, LotteryError> {
        let entry = self.store.activity(name).await?;
        let mut activity = entry.write().await;
        let now = Utc::now();
        self.refresh_and_announce(&mut activity, now);

        let mut drawn = None;
        if activity.auto_draw_due(now) {
            drawn = Some(self.execute_batch_draw(&mut activity, now).await?);
        }
        let view = activity.clone();
        drop(activity);

        if let Some(winners) = drawn {
            self.announce_draw(name, &winners, now);
        }
        Ok(view)
    }

    /// Lists activity summaries, newest first, after refreshing states.
    ///
    /// Listing never triggers a draw; a due activity shows up as
    /// `ended` here until a detail read or a manual draw runs it.
    pub async fn list_activities(&self, filter: &ActivityFilter) -> Vec<ActivitySummary> {
        let entries = self.store.activity_entries().await;
        let now = Utc::now();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut activity = entry.write().await;
            self.refresh_and_announce(&mut activity, now);
            if filter.matches(&activity) {
                summaries.push(ActivitySummary::from(&*activity));
            }
        }
        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        summaries
    }

    /// Runs the batch draw for an activity on demand.
    ///
    /// Allowed while the activity is running or ended; drawing a running
    /// activity closes it early.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::AlreadyDrawn`] for a drawn activity,
    /// [`LotteryError::NotRunning`] for a pending one, and the draw
    /// errors when prizes or participants are missing.
    pub async fn draw(&self, name: &str) -> Result<Activity, LotteryError> {
        let entry = self.store.activity(name).await?;
        let mut activity = entry.write().await;
        let now = Utc::now();
        self.refresh_and_announce(&mut activity, now);

        let winners = match activity.status.state {
            ActivityState::Drawn => return Err(LotteryError::AlreadyDrawn),
            ActivityState::Pending => {
                return Err(LotteryError::NotRunning {
                    state: ActivityState::Pending,
                });
            }
            ActivityState::Running | ActivityState::Ended => {
                self.execute_batch_draw(&mut activity, now).await?
            }
        };
        let view = activity.clone();
        drop(activity);

        self.announce_draw(name, &winners, now);
        Ok(view)
    }

    /// Lists all participation records of one activity.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::NotFound`] for an unknown activity.
    pub async fn list_participants(&self, name: &str) -> Result<Vec<Participant>, LotteryError> {
        let _ = self.store.activity(name).await?;
        Ok(self.store.list_for_activity(name).await)
    }

    // ── Participation paths ─────────────────────────────────────────────

    /// Anonymous participation identified by a validated email address.
    ///
    /// # Errors
    ///
    /// Returns the admission errors: invalid email, rule or state
    /// mismatch, capacity, or duplicate participation.
    pub async fn participate_anonymous(
        &self,
        activity: &str,
        email: &str,
        display_name: Option<&str>,
        ip: &str,
    ) -> Result<Participant, LotteryError> {
        validate_email(email)?;
        self.admit_and_commit(
            activity,
            ParticipationIntent {
                rule: ParticipationRule::None,
                email,
                username: None,
                display_name,
                ip,
                gate: CommentGate::Off,
            },
        )
        .await
    }

    /// Participation by an authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::PrecheckFailed`] without a principal or
    /// when the account has no email, plus the admission errors.
    pub async fn participate_login(
        &self,
        activity: &str,
        principal: Option<&Principal>,
        ip: &str,
    ) -> Result<Participant, LotteryError> {
        let (username, email, display_name) = resolve_principal_email(principal)?;
        self.admit_and_commit(
            activity,
            ParticipationIntent {
                rule: ParticipationRule::Login,
                email,
                username: Some(username),
                display_name,
                ip,
                gate: CommentGate::Off,
            },
        )
        .await
    }

    /// Comment-gated participation by an authenticated principal.
    ///
    /// The comment on the target post must carry the principal's
    /// username.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::PrecheckFailed`] without a principal,
    /// account email, or matching comment, plus the admission errors.
    pub async fn participate_comment(
        &self,
        activity: &str,
        principal: Option<&Principal>,
        post: Option<&str>,
        ip: &str,
    ) -> Result<Participant, LotteryError> {
        let (username, email, display_name) = resolve_principal_email(principal)?;
        self.admit_and_commit(
            activity,
            ParticipationIntent {
                rule: ParticipationRule::Comment,
                email,
                username: Some(username),
                display_name,
                ip,
                gate: CommentGate::ByUsername { post, username },
            },
        )
        .await
    }

    /// Comment-gated participation identified by email.
    ///
    /// The comment on the target post must carry the email address; the
    /// record takes its display name from that comment.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::PrecheckFailed`] without a matching
    /// comment, plus the admission errors.
    pub async fn participate_comment_by_email(
        &self,
        activity: &str,
        email: &str,
        post: Option<&str>,
        ip: &str,
    ) -> Result<Participant, LotteryError> {
        validate_email(email)?;
        self.admit_and_commit(
            activity,
            ParticipationIntent {
                rule: ParticipationRule::Comment,
                email,
                username: None,
                display_name: None,
                ip,
                gate: CommentGate::ByEmail { post, email },
            },
        )
        .await
    }

    /// Participation requiring both a login and a comment by the
    /// principal's username.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::PrecheckFailed`] without a principal,
    /// account email, or matching comment, plus the admission errors.
    pub async fn participate_login_comment(
        &self,
        activity: &str,
        principal: Option<&Principal>,
        post: Option<&str>,
        ip: &str,
    ) -> Result<Participant, LotteryError> {
        let (username, email, display_name) = resolve_principal_email(principal)?;
        self.admit_and_commit(
            activity,
            ParticipationIntent {
                rule: ParticipationRule::LoginAndComment,
                email,
                username: Some(username),
                display_name,
                ip,
                gate: CommentGate::ByUsername { post, username },
            },
        )
        .await
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Resolves the participation status behind a token.
    ///
    /// Unknown or foreign tokens report no participation rather than an
    /// error. A plain record is also matched against the activity's
    /// batch winner list, so batch winners see their prize here.
    pub async fn participation_status(
        &self,
        activity_name: &str,
        token: &str,
    ) -> ParticipationStatus {
        if token.trim().is_empty() {
            return ParticipationStatus::absent();
        }
        let Some(record) = self.store.find_by_token(token).await else {
            return ParticipationStatus::absent();
        };
        if record.activity != activity_name {
            return ParticipationStatus::absent();
        }

        if record.is_winner {
            return ParticipationStatus {
                participated: true,
                token: Some(record.token),
                is_winner: true,
                prize_name: record.prize_name,
            };
        }

        let identifier = record.identifier().to_string();
        let batch_prize = match self.store.activity(activity_name).await {
            Ok(entry) => {
                let activity = entry.read().await;
                activity
                    .status
                    .winners
                    .iter()
                    .find(|winner| winner.identifier == identifier)
                    .map(|winner| winner.prize_name.clone())
            }
            Err(_) => None,
        };

        let is_winner = batch_prize.is_some();
        ParticipationStatus {
            participated: true,
            token: Some(record.token),
            is_winner,
            prize_name: batch_prize,
        }
    }

    /// Recomputes the token for an email and returns the matching
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidInput`] for a malformed email and
    /// [`LotteryError::NotFound`] when no record exists.
    pub async fn recover_token(
        &self,
        activity: &str,
        email: &str,
    ) -> Result<Participant, LotteryError> {
        validate_email(email)?;
        let token = domain::token::participation_token(activity, email, &self.token_salt);
        self.store
            .find_by_token(&token)
            .await
            .ok_or_else(|| LotteryError::NotFound(format!("no participation record for {email}")))
    }

    /// Checks whether an identity has commented on a post.
    ///
    /// An authenticated principal is matched by username; otherwise a
    /// provided email is matched case-insensitively.
    pub async fn check_comment(
        &self,
        post: &str,
        principal: Option<&Principal>,
        email: Option<&str>,
    ) -> CommentCheck {
        if let Some(principal) = principal {
            let found = self
                .comments
                .find_by_username(post, &principal.username)
                .await;
            return CommentCheck {
                has_commented: found.is_some(),
                logged_in: true,
            };
        }
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            let found = self.comments.find_by_email(post, email).await;
            return CommentCheck {
                has_commented: found.is_some(),
                logged_in: false,
            };
        }
        CommentCheck {
            has_commented: false,
            logged_in: false,
        }
    }

    /// All participation records owned by the principal.
    pub async fn my_participations(&self, principal: &Principal) -> Vec<Participant> {
        self.store.list_owned_by(principal).await
    }

    /// Winning records owned by the principal.
    ///
    /// Only records flagged by an instant draw count; batch winners are
    /// reported on the activity itself.
    pub async fn my_winnings(&self, principal: &Principal) -> Vec<Participant> {
        self.store
            .list_owned_by(principal)
            .await
            .into_iter()
            .filter(|record| record.is_winner)
            .collect()
    }

    // ── Admission and commit ────────────────────────────────────────────

    /// Runs the admission checks in order and commits the record.
    ///
    /// First failure wins: rule, lifecycle state, capacity, duplicate,
    /// then the comment gate. The instant draw and all mutations happen
    /// in one critical section without intervening awaits.
    async fn admit_and_commit(
        &self,
        activity_name: &str,
        intent: ParticipationIntent<'_>,
    ) -> Result<Participant, LotteryError> {
        let entry = self.store.activity(activity_name).await?;
        let mut activity = entry.write().await;
        let now = Utc::now();
        self.refresh_and_announce(&mut activity, now);

        if activity.spec.rule != intent.rule {
            return Err(LotteryError::RuleMismatch {
                required: activity.spec.rule,
            });
        }
        if activity.status.state != ActivityState::Running {
            return Err(LotteryError::NotRunning {
                state: activity.status.state,
            });
        }
        if activity.capacity_reached() {
            return Err(LotteryError::CapacityExceeded);
        }

        let token =
            domain::token::participation_token(activity_name, intent.email, &self.token_salt);

        let mut table = self.store.participants_write().await;
        if !activity.spec.allow_duplicate && table.iter().any(|record| record.token == token) {
            return Err(LotteryError::DuplicateParticipation);
        }

        let (comment_ref, comment_display) = match intent.gate {
            CommentGate::Off => (None, None),
            CommentGate::ByUsername { post, username } => {
                let post = resolve_target_post(&activity, post)?;
                let comment = self
                    .comments
                    .find_by_username(&post, username)
                    .await
                    .ok_or_else(|| {
                        LotteryError::PrecheckFailed(
                            "no comment by this account on the target post".to_string(),
                        )
                    })?;
                (Some(comment.id), None)
            }
            CommentGate::ByEmail { post, email } => {
                let post = resolve_target_post(&activity, post)?;
                let comment = self
                    .comments
                    .find_by_email(&post, email)
                    .await
                    .ok_or_else(|| {
                        LotteryError::PrecheckFailed(
                            "no comment by this email on the target post".to_string(),
                        )
                    })?;
                (Some(comment.id), comment.display_name)
            }
        };

        // Commit section: no awaits from here until the guards drop.
        let mut is_winner = false;
        let mut prize_name = None;
        if activity.spec.mode.is_instant() {
            let picked = {
                let mut rng = rand::thread_rng();
                domain::draw::weighted_pick(&activity.spec.prizes, |p| p.remaining, &mut rng)
            };
            if let Some(index) = picked
                && let Some(prize) = activity.spec.prizes.get_mut(index)
            {
                prize.remaining = prize.remaining.saturating_sub(1);
                is_winner = true;
                prize_name = Some(prize.name.clone());
            }
        }

        let display_name = comment_display.or_else(|| intent.display_name.map(str::to_string));
        let participant = Participant {
            id: ParticipantId::new(),
            activity: activity_name.to_string(),
            email: Some(intent.email.to_string()),
            username: intent.username.map(str::to_string),
            display_name,
            token: token.clone(),
            joined_at: now,
            ip: intent.ip.to_string(),
            is_winner,
            prize_name: prize_name.clone(),
            won_at: is_winner.then_some(now),
            comment_ref,
        };
        table.push(participant.clone());
        activity.status.participant_count = activity.status.participant_count.saturating_add(1);
        let participant_count = activity.status.participant_count;

        drop(table);
        drop(activity);

        let _ = self.event_bus.publish(LotteryEvent::ParticipantJoined {
            activity: activity_name.to_string(),
            token,
            participant_count,
            timestamp: now,
        });
        if let Some(prize) = &prize_name {
            let _ = self.event_bus.publish(LotteryEvent::PrizeAwarded {
                activity: activity_name.to_string(),
                identifier: participant.identifier().to_string(),
                prize_name: prize.clone(),
                timestamp: now,
            });
        }
        tracing::info!(
            activity = activity_name,
            participant_count,
            is_winner,
            "participation recorded"
        );
        Ok(participant)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Refreshes the derived state and announces a write-back.
    fn refresh_and_announce(&self, activity: &mut Activity, now: DateTime<Utc>) {
        if let Some((from, to)) = activity.refresh_state(now) {
            tracing::debug!(
                activity = activity.name.as_str(),
                %from,
                %to,
                "activity state advanced"
            );
            let _ = self.event_bus.publish(LotteryEvent::StateChanged {
                activity: activity.name.clone(),
                from,
                to,
                timestamp: now,
            });
        }
    }

    /// Runs the batch draw and moves the activity to its terminal state.
    ///
    /// The caller holds the activity write lock and publishes the draw
    /// events after releasing it.
    async fn execute_batch_draw(
        &self,
        activity: &mut Activity,
        now: DateTime<Utc>,
    ) -> Result<Vec<Winner>, LotteryError> {
        if activity.spec.prizes.is_empty() {
            return Err(LotteryError::NoPrizesConfigured);
        }
        let participants = self.store.list_for_activity(&activity.name).await;
        if participants.is_empty() {
            return Err(LotteryError::NoParticipants);
        }

        let winners = {
            let mut rng = rand::thread_rng();
            domain::draw::run_batch_draw(&participants, &activity.spec.prizes, now, &mut rng)
        };
        activity.status.state = ActivityState::Drawn;
        activity.status.drawn_at = Some(now);
        activity.status.winners = winners.clone();
        Ok(winners)
    }

    /// Publishes the terminal draw event.
    fn announce_draw(&self, activity_name: &str, winners: &[Winner], at: DateTime<Utc>) {
        let _ = self.event_bus.publish(LotteryEvent::ActivityDrawn {
            activity: activity_name.to_string(),
            winners: winners.to_vec(),
            timestamp: at,
        });
        tracing::info!(
            activity = activity_name,
            winner_count = winners.len(),
            "batch draw completed"
        );
    }
}

/// Extracts username, email and display name from a principal.
fn resolve_principal_email(
    principal: Option<&Principal>,
) -> Result<(&str, &str, Option<&str>), LotteryError> {
    let principal = principal
        .ok_or_else(|| LotteryError::PrecheckFailed("login required".to_string()))?;
    let email = principal
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            LotteryError::PrecheckFailed(
                "authenticated account has no email address".to_string(),
            )
        })?;
    Ok((
        principal.username.as_str(),
        email,
        principal.display_name.as_deref(),
    ))
}

/// Picks the post a comment must sit on: the explicit request value,
/// falling back to the activity's configured target.
fn resolve_target_post(
    activity: &Activity,
    explicit: Option<&str>,
) -> Result<String, LotteryError> {
    let configured = activity.spec.target_post.as_deref();
    explicit
        .filter(|post| !post.trim().is_empty())
        .or_else(|| configured.filter(|post| !post.trim().is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            LotteryError::InvalidInput(
                "activity has no target post for comment participation".to_string(),
            )
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{CommentAuthor, CommentRecord, LotteryMode, Prize, DEFAULT_THANK_YOU_SLOTS};

    fn make_service() -> (
        LotteryService,
        Arc<LotteryStore>,
        Arc<CommentDirectory>,
        EventBus,
    ) {
        let store = Arc::new(LotteryStore::new());
        let comments = Arc::new(CommentDirectory::new());
        let bus = EventBus::new(256);
        let service = LotteryService::new(
            Arc::clone(&store),
            Arc::clone(&comments),
            bus.clone(),
            "test-salt".to_string(),
        );
        (service, store, comments, bus)
    }

    fn open_spec(mode: LotteryMode, rule: ParticipationRule) -> ActivitySpec {
        let now = Utc::now();
        ActivitySpec {
            title: "Test activity".to_string(),
            description: String::new(),
            start_time: now - Duration::hours(1),
            end_time: Some(now + Duration::hours(1)),
            draw_time: None,
            mode,
            rule,
            prizes: Vec::new(),
            max_participants: None,
            allow_duplicate: false,
            target_post: None,
            thank_you_slots: DEFAULT_THANK_YOU_SLOTS,
        }
    }

    fn prize(name: &str, quantity: u32, probability: u32) -> Prize {
        Prize {
            name: name.to_string(),
            description: String::new(),
            image_url: String::new(),
            quantity,
            remaining: quantity,
            probability,
        }
    }

    fn comment(post: &str, author: CommentAuthor, display_name: Option<&str>) -> CommentRecord {
        CommentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            post: post.to_string(),
            author,
            display_name: display_name.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    fn drain_event_types(
        rx: &mut tokio::sync::broadcast::Receiver<LotteryEvent>,
    ) -> Vec<&'static str> {
        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.event_type_str());
        }
        types
    }

    #[tokio::test]
    async fn create_activity_validates_input_and_announces() {
        let (service, _, _, bus) = make_service();
        let mut rx = bus.subscribe();

        let blank = service
            .create_activity("  ", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await;
        assert!(matches!(blank, Err(LotteryError::InvalidInput(_))));

        let mut untitled = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        untitled.title = String::new();
        let no_title = service.create_activity("summer", untitled).await;
        assert!(matches!(no_title, Err(LotteryError::InvalidInput(_))));

        let mut inverted = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        inverted.end_time = Some(inverted.start_time);
        let bad_window = service.create_activity("summer", inverted).await;
        assert!(matches!(bad_window, Err(LotteryError::InvalidInput(_))));

        let created = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await;
        assert!(created.is_ok());

        let duplicate = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await;
        assert!(matches!(duplicate, Err(LotteryError::InvalidInput(_))));

        assert_eq!(drain_event_types(&mut rx), vec!["activity_created"]);
    }

    #[tokio::test]
    async fn anonymous_participation_records_a_token() {
        let (service, store, _, bus) = make_service();
        let mut rx = bus.subscribe();
        let Ok(_) = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };

        let Ok(record) = service
            .participate_anonymous("summer", "alice@example.com", Some("Alice"), "10.0.0.1")
            .await
        else {
            panic!("participation failed");
        };

        let expected =
            domain::token::participation_token("summer", "alice@example.com", "test-salt");
        assert_eq!(record.token, expected);
        assert_eq!(record.display_name.as_deref(), Some("Alice"));
        assert!(!record.is_winner);
        assert_eq!(store.len().await, 1);

        let Ok(activity) = service.get_activity("summer").await else {
            panic!("get failed");
        };
        assert_eq!(activity.status.participant_count, 1);

        let types = drain_event_types(&mut rx);
        assert!(types.contains(&"participant_joined"));
        assert!(!types.contains(&"prize_awarded"));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected_before_admission() {
        let (service, store, _, _) = make_service();
        let Ok(_) = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };

        let result = service
            .participate_anonymous("summer", "not-an-email", None, "")
            .await;
        assert!(matches!(result, Err(LotteryError::InvalidInput(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn rule_mismatch_reports_the_required_rule() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::Login))
            .await
        else {
            panic!("create failed");
        };

        let result = service
            .participate_anonymous("summer", "alice@example.com", None, "")
            .await;
        let Err(LotteryError::RuleMismatch { required }) = result else {
            panic!("expected rule mismatch, got {result:?}");
        };
        assert_eq!(required, ParticipationRule::Login);
    }

    #[tokio::test]
    async fn participation_outside_the_window_is_rejected() {
        let (service, _, _, _) = make_service();
        let now = Utc::now();

        let mut pending = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        pending.start_time = now + Duration::hours(1);
        pending.end_time = Some(now + Duration::hours(2));
        let Ok(_) = service.create_activity("upcoming", pending).await else {
            panic!("create failed");
        };
        let early = service
            .participate_anonymous("upcoming", "alice@example.com", None, "")
            .await;
        let Err(LotteryError::NotRunning { state }) = early else {
            panic!("expected not running, got {early:?}");
        };
        assert_eq!(state, ActivityState::Pending);

        let mut over = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        over.start_time = now - Duration::hours(2);
        over.end_time = Some(now - Duration::hours(1));
        let Ok(_) = service.create_activity("finished", over).await else {
            panic!("create failed");
        };
        let late = service
            .participate_anonymous("finished", "alice@example.com", None, "")
            .await;
        let Err(LotteryError::NotRunning { state }) = late else {
            panic!("expected not running, got {late:?}");
        };
        assert_eq!(state, ActivityState::Ended);
    }

    #[tokio::test]
    async fn capacity_limit_rejects_the_overflow_attempt() {
        let (service, _, _, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.max_participants = Some(1);
        let Ok(_) = service.create_activity("small", spec).await else {
            panic!("create failed");
        };

        assert!(service
            .participate_anonymous("small", "alice@example.com", None, "")
            .await
            .is_ok());
        let second = service
            .participate_anonymous("small", "bob@example.com", None, "")
            .await;
        assert!(matches!(second, Err(LotteryError::CapacityExceeded)));
    }

    #[tokio::test]
    async fn duplicate_tokens_are_rejected_unless_allowed() {
        let (service, store, _, _) = make_service();
        let Ok(_) = service
            .create_activity("strict", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };

        assert!(service
            .participate_anonymous("strict", "alice@example.com", None, "")
            .await
            .is_ok());
        let repeat = service
            .participate_anonymous("strict", "alice@example.com", None, "")
            .await;
        assert!(matches!(repeat, Err(LotteryError::DuplicateParticipation)));
        assert_eq!(store.len().await, 1);

        let mut open = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        open.allow_duplicate = true;
        let Ok(_) = service.create_activity("open", open).await else {
            panic!("create failed");
        };
        assert!(service
            .participate_anonymous("open", "alice@example.com", None, "")
            .await
            .is_ok());
        assert!(service
            .participate_anonymous("open", "alice@example.com", None, "")
            .await
            .is_ok());
        assert_eq!(store.list_for_activity("open").await.len(), 2);
    }

    #[tokio::test]
    async fn instant_draw_awards_until_stock_runs_out() {
        let (service, _, _, bus) = make_service();
        let mut spec = open_spec(LotteryMode::Draw, ParticipationRule::None);
        spec.prizes = vec![prize("sticker", 1, 100)];
        let Ok(_) = service.create_activity("instant", spec).await else {
            panic!("create failed");
        };
        let mut rx = bus.subscribe();

        let Ok(first) = service
            .participate_anonymous("instant", "alice@example.com", None, "")
            .await
        else {
            panic!("first participation failed");
        };
        assert!(first.is_winner);
        assert_eq!(first.prize_name.as_deref(), Some("sticker"));

        let Ok(second) = service
            .participate_anonymous("instant", "bob@example.com", None, "")
            .await
        else {
            panic!("second participation failed");
        };
        assert!(!second.is_winner);
        assert_eq!(second.prize_name, None);

        let Ok(activity) = service.get_activity("instant").await else {
            panic!("get failed");
        };
        let Some(remaining) = activity.spec.prizes.first().map(|p| p.remaining) else {
            panic!("prize missing");
        };
        assert_eq!(remaining, 0);

        let types = drain_event_types(&mut rx);
        assert_eq!(types.iter().filter(|t| **t == "prize_awarded").count(), 1);
    }

    #[tokio::test]
    async fn instant_mode_without_prizes_records_plainly() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity("wheel", open_spec(LotteryMode::Wheel, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };

        let Ok(record) = service
            .participate_anonymous("wheel", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };
        assert!(!record.is_winner);
    }

    #[tokio::test]
    async fn login_path_requires_a_principal_with_email() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity("members", open_spec(LotteryMode::Scheduled, ParticipationRule::Login))
            .await
        else {
            panic!("create failed");
        };

        let anonymous = service.participate_login("members", None, "").await;
        assert!(matches!(anonymous, Err(LotteryError::PrecheckFailed(_))));

        let no_email = Principal {
            username: "alice".to_string(),
            email: None,
            display_name: None,
        };
        let missing = service
            .participate_login("members", Some(&no_email), "")
            .await;
        assert!(matches!(missing, Err(LotteryError::PrecheckFailed(_))));

        let principal = Principal {
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            display_name: Some("Alice".to_string()),
        };
        let Ok(record) = service
            .participate_login("members", Some(&principal), "10.0.0.2")
            .await
        else {
            panic!("participation failed");
        };
        assert_eq!(record.username.as_deref(), Some("alice"));
        // The token is derived from the email even for logged-in users.
        let expected =
            domain::token::participation_token("members", "alice@example.com", "test-salt");
        assert_eq!(record.token, expected);
    }

    #[tokio::test]
    async fn comment_path_requires_a_comment_by_the_username() {
        let (service, _, comments, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::Comment);
        spec.target_post = Some("launch-post".to_string());
        let Ok(_) = service.create_activity("commented", spec).await else {
            panic!("create failed");
        };
        let principal = Principal {
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            display_name: None,
        };

        let before = service
            .participate_comment("commented", Some(&principal), None, "")
            .await;
        assert!(matches!(before, Err(LotteryError::PrecheckFailed(_))));

        comments
            .ingest(comment("launch-post", CommentAuthor::User("alice".to_string()), None))
            .await;
        let Ok(record) = service
            .participate_comment("commented", Some(&principal), None, "")
            .await
        else {
            panic!("participation failed");
        };
        assert!(record.comment_ref.is_some());
    }

    #[tokio::test]
    async fn comment_by_email_matches_case_insensitively() {
        let (service, _, comments, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::Comment);
        spec.target_post = Some("launch-post".to_string());
        let Ok(_) = service.create_activity("commented", spec).await else {
            panic!("create failed");
        };

        comments
            .ingest(comment(
                "launch-post",
                CommentAuthor::Email("Alice@Example.com".to_string()),
                Some("Alice the Brave"),
            ))
            .await;

        let Ok(record) = service
            .participate_comment_by_email("commented", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };
        // The record takes the display name from the matched comment.
        assert_eq!(record.display_name.as_deref(), Some("Alice the Brave"));
        assert!(record.comment_ref.is_some());
    }

    #[tokio::test]
    async fn comment_path_without_a_target_post_is_invalid() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity(
                "untargeted",
                open_spec(LotteryMode::Scheduled, ParticipationRule::Comment),
            )
            .await
        else {
            panic!("create failed");
        };

        let result = service
            .participate_comment_by_email("untargeted", "alice@example.com", None, "")
            .await;
        assert!(matches!(result, Err(LotteryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn explicit_post_overrides_the_configured_target() {
        let (service, _, comments, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::Comment);
        spec.target_post = Some("old-post".to_string());
        let Ok(_) = service.create_activity("moved", spec).await else {
            panic!("create failed");
        };

        comments
            .ingest(comment(
                "new-post",
                CommentAuthor::Email("alice@example.com".to_string()),
                None,
            ))
            .await;

        // No comment on the configured post, so the default target fails.
        let default_target = service
            .participate_comment_by_email("moved", "alice@example.com", None, "")
            .await;
        assert!(matches!(default_target, Err(LotteryError::PrecheckFailed(_))));

        let explicit = service
            .participate_comment_by_email("moved", "alice@example.com", Some("new-post"), "")
            .await;
        assert!(explicit.is_ok());
    }

    #[tokio::test]
    async fn duplicate_check_runs_before_the_comment_gate() {
        let (service, _, comments, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::Comment);
        spec.target_post = Some("launch-post".to_string());
        let Ok(_) = service.create_activity("ordered", spec).await else {
            panic!("create failed");
        };

        comments
            .ingest(comment(
                "launch-post",
                CommentAuthor::Email("alice@example.com".to_string()),
                None,
            ))
            .await;
        assert!(service
            .participate_comment_by_email("ordered", "alice@example.com", None, "")
            .await
            .is_ok());

        // Same identity against a post with no comment: both the duplicate
        // and the comment gate would fail, the duplicate must win.
        let result = service
            .participate_comment_by_email("ordered", "alice@example.com", Some("other-post"), "")
            .await;
        assert!(matches!(result, Err(LotteryError::DuplicateParticipation)));
    }

    #[tokio::test]
    async fn login_comment_path_checks_both_requirements() {
        let (service, _, comments, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::LoginAndComment);
        spec.target_post = Some("launch-post".to_string());
        let Ok(_) = service.create_activity("strict", spec).await else {
            panic!("create failed");
        };

        let anonymous = service
            .participate_login_comment("strict", None, None, "")
            .await;
        assert!(matches!(anonymous, Err(LotteryError::PrecheckFailed(_))));

        let principal = Principal {
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            display_name: None,
        };
        let uncommented = service
            .participate_login_comment("strict", Some(&principal), None, "")
            .await;
        assert!(matches!(uncommented, Err(LotteryError::PrecheckFailed(_))));

        comments
            .ingest(comment("launch-post", CommentAuthor::User("alice".to_string()), None))
            .await;
        assert!(service
            .participate_login_comment("strict", Some(&principal), None, "")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn status_reports_instant_wins_and_unknown_tokens() {
        let (service, _, _, _) = make_service();
        let mut spec = open_spec(LotteryMode::Draw, ParticipationRule::None);
        spec.prizes = vec![prize("sticker", 1, 100)];
        let Ok(_) = service.create_activity("instant", spec).await else {
            panic!("create failed");
        };
        let Ok(record) = service
            .participate_anonymous("instant", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };

        let status = service.participation_status("instant", &record.token).await;
        assert!(status.participated);
        assert!(status.is_winner);
        assert_eq!(status.prize_name.as_deref(), Some("sticker"));

        let blank = service.participation_status("instant", "  ").await;
        assert!(!blank.participated);

        let unknown = service.participation_status("instant", "no-such-token").await;
        assert!(!unknown.participated);

        // A token from another activity reports no participation here.
        let Ok(_) = service
            .create_activity("other", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };
        let foreign = service.participation_status("other", &record.token).await;
        assert!(!foreign.participated);
    }

    #[tokio::test]
    async fn status_sees_batch_draw_winners() {
        let (service, _, _, _) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.prizes = vec![prize("mug", 1, 100)];
        let Ok(_) = service.create_activity("raffle", spec).await else {
            panic!("create failed");
        };
        let Ok(record) = service
            .participate_anonymous("raffle", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };
        assert!(!record.is_winner);

        let Ok(_) = service.draw("raffle").await else {
            panic!("draw failed");
        };

        let status = service.participation_status("raffle", &record.token).await;
        assert!(status.participated);
        assert!(status.is_winner);
        assert_eq!(status.prize_name.as_deref(), Some("mug"));
    }

    #[tokio::test]
    async fn recover_token_finds_the_record_by_email() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };
        let Ok(record) = service
            .participate_anonymous("summer", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };

        let Ok(found) = service.recover_token("summer", "alice@example.com").await else {
            panic!("recover failed");
        };
        assert_eq!(found.token, record.token);

        let missing = service.recover_token("summer", "bob@example.com").await;
        assert!(matches!(missing, Err(LotteryError::NotFound(_))));
    }

    #[tokio::test]
    async fn manual_draw_runs_once_and_becomes_terminal() {
        let (service, _, _, bus) = make_service();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.prizes = vec![prize("mug", 1, 100)];
        let Ok(_) = service.create_activity("raffle", spec).await else {
            panic!("create failed");
        };
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            let Ok(_) = service.participate_anonymous("raffle", email, None, "").await else {
                panic!("participation failed");
            };
        }
        let mut rx = bus.subscribe();

        let Ok(drawn) = service.draw("raffle").await else {
            panic!("draw failed");
        };
        assert_eq!(drawn.status.state, ActivityState::Drawn);
        assert!(drawn.status.drawn_at.is_some());
        assert_eq!(drawn.status.winners.len(), 1);

        let again = service.draw("raffle").await;
        assert!(matches!(again, Err(LotteryError::AlreadyDrawn)));

        assert_eq!(drain_event_types(&mut rx), vec!["activity_drawn"]);
    }

    #[tokio::test]
    async fn manual_draw_rejects_missing_prizes_and_participants() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity("bare", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };
        let no_prizes = service.draw("bare").await;
        assert!(matches!(no_prizes, Err(LotteryError::NoPrizesConfigured)));

        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.prizes = vec![prize("mug", 1, 100)];
        let Ok(_) = service.create_activity("empty", spec).await else {
            panic!("create failed");
        };
        let no_participants = service.draw("empty").await;
        assert!(matches!(no_participants, Err(LotteryError::NoParticipants)));

        let mut pending = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        pending.start_time = Utc::now() + Duration::hours(1);
        pending.end_time = Some(Utc::now() + Duration::hours(2));
        pending.prizes = vec![prize("mug", 1, 100)];
        let Ok(_) = service.create_activity("early", pending).await else {
            panic!("create failed");
        };
        let too_early = service.draw("early").await;
        assert!(matches!(
            too_early,
            Err(LotteryError::NotRunning {
                state: ActivityState::Pending
            })
        ));
    }

    #[tokio::test]
    async fn detail_read_runs_a_due_draw_lazily() {
        let (service, _, _, _) = make_service();
        let now = Utc::now();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.start_time = now - Duration::hours(2);
        spec.end_time = Some(now + Duration::hours(1));
        spec.draw_time = Some(now - Duration::minutes(5));
        spec.prizes = vec![prize("mug", 2, 100)];
        let Ok(_) = service.create_activity("due", spec).await else {
            panic!("create failed");
        };

        // Due but with nobody in the pot: the read surfaces the failure
        // and the activity stays undrawn.
        let empty = service.get_activity("due").await;
        assert!(matches!(empty, Err(LotteryError::NoParticipants)));

        // Still running, so a participation can land after the failure.
        let Ok(_) = service
            .participate_anonymous("due", "alice@example.com", None, "")
            .await
        else {
            panic!("participation failed");
        };

        let Ok(drawn) = service.get_activity("due").await else {
            panic!("get failed");
        };
        assert_eq!(drawn.status.state, ActivityState::Drawn);
        assert_eq!(drawn.status.winners.len(), 1);
    }

    #[tokio::test]
    async fn listing_refreshes_states_but_never_draws() {
        let (service, _, _, _) = make_service();
        let now = Utc::now();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.start_time = now - Duration::hours(3);
        spec.end_time = Some(now - Duration::hours(1));
        spec.prizes = vec![prize("mug", 1, 100)];
        let Ok(_) = service.create_activity("over", spec).await else {
            panic!("create failed");
        };

        let summaries = service.list_activities(&ActivityFilter::default()).await;
        let Some(summary) = summaries.iter().find(|s| s.name == "over") else {
            panic!("summary missing");
        };
        assert_eq!(summary.state, ActivityState::Ended);
    }

    #[tokio::test]
    async fn listing_filters_and_sorts_newest_first() {
        let (service, _, _, _) = make_service();
        let Ok(_) = service
            .create_activity(
                "alpha-raffle",
                open_spec(LotteryMode::Scheduled, ParticipationRule::None),
            )
            .await
        else {
            panic!("create failed");
        };
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let Ok(_) = service
            .create_activity(
                "beta-giveaway",
                open_spec(LotteryMode::Wheel, ParticipationRule::Login),
            )
            .await
        else {
            panic!("create failed");
        };

        let all = service.list_activities(&ActivityFilter::default()).await;
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["beta-giveaway", "alpha-raffle"]);

        let filter = ActivityFilter {
            rule: Some(ParticipationRule::Login),
            ..ActivityFilter::default()
        };
        let filtered = service.list_activities(&filter).await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.first().map(|s| s.name.as_str()), Some("beta-giveaway"));

        let keyword = ActivityFilter {
            keyword: Some("raffle".to_string()),
            ..ActivityFilter::default()
        };
        let matched = service.list_activities(&keyword).await;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched.first().map(|s| s.name.as_str()), Some("alpha-raffle"));
    }

    #[tokio::test]
    async fn list_participants_requires_the_activity() {
        let (service, _, _, _) = make_service();
        let missing = service.list_participants("ghost").await;
        assert!(matches!(missing, Err(LotteryError::NotFound(_))));

        let Ok(_) = service
            .create_activity("summer", open_spec(LotteryMode::Scheduled, ParticipationRule::None))
            .await
        else {
            panic!("create failed");
        };
        let Ok(records) = service.list_participants("summer").await else {
            panic!("list failed");
        };
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn winnings_cover_only_instant_wins() {
        let (service, _, _, _) = make_service();
        let mut instant = open_spec(LotteryMode::Draw, ParticipationRule::Login);
        instant.prizes = vec![prize("sticker", 1, 100)];
        let Ok(_) = service.create_activity("instant", instant).await else {
            panic!("create failed");
        };
        let Ok(_) = service
            .create_activity("plain", open_spec(LotteryMode::Scheduled, ParticipationRule::Login))
            .await
        else {
            panic!("create failed");
        };

        let principal = Principal {
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            display_name: None,
        };
        let Ok(won) = service.participate_login("instant", Some(&principal), "").await else {
            panic!("participation failed");
        };
        assert!(won.is_winner);
        let Ok(_) = service.participate_login("plain", Some(&principal), "").await else {
            panic!("participation failed");
        };

        let participations = service.my_participations(&principal).await;
        assert_eq!(participations.len(), 2);
        let winnings = service.my_winnings(&principal).await;
        assert_eq!(winnings.len(), 1);
        assert_eq!(
            winnings.first().map(|record| record.activity.as_str()),
            Some("instant")
        );
    }

    #[tokio::test]
    async fn check_comment_matches_by_identity_kind() {
        let (service, _, comments, _) = make_service();
        comments
            .ingest(comment("post-1", CommentAuthor::User("alice".to_string()), None))
            .await;
        comments
            .ingest(comment(
                "post-1",
                CommentAuthor::Email("bob@example.com".to_string()),
                None,
            ))
            .await;

        let principal = Principal {
            username: "alice".to_string(),
            email: None,
            display_name: None,
        };
        let logged_in = service.check_comment("post-1", Some(&principal), None).await;
        assert!(logged_in.has_commented);
        assert!(logged_in.logged_in);

        let by_email = service
            .check_comment("post-1", None, Some("BOB@example.com"))
            .await;
        assert!(by_email.has_commented);
        assert!(!by_email.logged_in);

        let nobody = service.check_comment("post-1", None, None).await;
        assert!(!nobody.has_commented);
        assert!(!nobody.logged_in);
    }

    #[tokio::test]
    async fn state_write_back_announces_once() {
        let (service, _, _, bus) = make_service();
        let now = Utc::now();
        let mut spec = open_spec(LotteryMode::Scheduled, ParticipationRule::None);
        spec.start_time = now - Duration::hours(2);
        spec.end_time = Some(now - Duration::hours(1));
        // Draw moment still ahead, so the reads below observe the ended
        // state without tripping the auto draw.
        spec.draw_time = Some(now + Duration::hours(1));
        let Ok(_) = service.create_activity("over", spec).await else {
            panic!("create failed");
        };
        let mut rx = bus.subscribe();

        let Ok(first) = service.get_activity("over").await else {
            panic!("get failed");
        };
        assert_eq!(first.status.state, ActivityState::Ended);
        let Ok(second) = service.get_activity("over").await else {
            panic!("get failed");
        };
        assert_eq!(second.status.state, ActivityState::Ended);

        // Pending -> ended was written back on the first read only.
        let types = drain_event_types(&mut rx);
        assert_eq!(types, vec!["state_changed"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_participation_awards_a_single_prize() {
        let (service, store, _, _) = make_service();
        let mut spec = open_spec(LotteryMode::Draw, ParticipationRule::None);
        spec.prizes = vec![prize("golden-ticket", 1, 100)];
        let Ok(_) = service.create_activity("rush", spec).await else {
            panic!("create failed");
        };

        let service = Arc::new(service);
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let email = format!("user{i}@example.com");
                service.participate_anonymous("rush", &email, None, "").await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            let Ok(record) = result else {
                panic!("participation failed: {result:?}");
            };
            if record.is_winner {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.list_for_activity("rush").await.len(), 8);
        let Ok(activity) = service.get_activity("rush").await else {
            panic!("get failed");
        };
        assert_eq!(activity.status.participant_count, 8);
        let Some(remaining) = activity.spec.prizes.first().map(|p| p.remaining) else {
            panic!("prize missing");
        };
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn email_validation_accepts_common_shapes() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b-c@mail.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("plainaddress").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("@example.com").is_err());
    }
}
