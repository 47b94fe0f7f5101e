//! Tournament manager: request-level operations over the injected stores.
//!
//! Every write is read → pure transformation → conditional write. A lost
//! race re-reads and re-applies the transformation a bounded number of times;
//! registration instead runs matchmaking once more.

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::config::ManagerConfig;
use super::ingest::{self, GameResult, IngestOutcome};
use super::lifecycle::{self, CloseOutcome, JoinOutcome, WithdrawOutcome};
use super::matcher;
use super::models::{
    Tournament, TournamentId, TournamentStandings, TournamentStatus, TournamentSummary,
};
use crate::cohort::Cohort;
use crate::db::timeouts::with_timeout;
use crate::db::{PlayerStore, StoreError, TournamentStore};
use crate::errors::{TournamentError, TournamentResult};
use crate::player::{Platform, Player, PlayerId};
use crate::providers::{ChallengeRequest, ProviderError, ProviderRegistry, RetryPolicy, SearchWindow};

/// Where a registration landed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterOutcome {
    pub tournament: TournamentSummary,
    pub outcome: JoinOutcome,
    /// WAITING tournament created because this registration started one
    pub sibling: Option<TournamentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawReport {
    pub tournament: TournamentSummary,
    pub outcome: WithdrawOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub tournament: TournamentSummary,
    /// Platform-qualified game id, e.g. `lichess:abcdEFGH`
    pub game_id: String,
    pub result: GameResult,
    pub scores: IngestOutcome,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    tournaments: Arc<dyn TournamentStore>,
    players: Arc<dyn PlayerStore>,
    providers: ProviderRegistry,
    config: ManagerConfig,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(
        tournaments: Arc<dyn TournamentStore>,
        players: Arc<dyn PlayerStore>,
        providers: ProviderRegistry,
        config: ManagerConfig,
    ) -> Self {
        Self {
            tournaments,
            players,
            providers,
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.provider_attempts,
            initial_backoff: self.config.provider_backoff,
            timeout: self.config.provider_timeout,
        }
    }

    /// Bound a store call by the configured timeout
    async fn store<T, F>(&self, call: F) -> TournamentResult<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        Ok(with_timeout(self.config.store_timeout, call).await?)
    }

    async fn load(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.store(self.tournaments.get(id))
            .await?
            .ok_or(TournamentError::NotFound(id))
    }

    /// The player's WAITING or RUNNING tournament, if any
    async fn active_membership(&self, player: &PlayerId) -> TournamentResult<Option<Tournament>> {
        let tournaments = self.store(self.tournaments.find_by_member(player)).await?;
        Ok(tournaments.into_iter().find(|t| !t.is_closed()))
    }

    /// Register `player` in `cohort` and place them in a tournament
    ///
    /// # Arguments
    ///
    /// * `player` - Player with at least one linked platform handle
    /// * `cohort` - Rating band the player registers for
    ///
    /// # Returns
    ///
    /// The tournament the player landed in, whether the join started it, and
    /// the WAITING sibling opened when it did.
    ///
    /// # Errors
    ///
    /// - `DuplicateMembership` if the player is already in a WAITING or
    ///   RUNNING tournament
    /// - `CapacityExhausted` if no tournament in the band or its neighbours
    ///   has a free seat
    /// - `ConcurrencyConflict` if the placement lost two races in a row
    ///
    /// The player record is only written once a seat has been found.
    pub async fn register(
        &self,
        player: Player,
        cohort: Cohort,
    ) -> TournamentResult<RegisterOutcome> {
        let mut rematched = false;
        let mut saved = false;
        loop {
            if let Some(existing) = self.active_membership(&player.id).await? {
                return Err(TournamentError::DuplicateMembership {
                    player: player.id,
                    tournament: existing.id,
                });
            }

            let mut tournament = self.find_seat(&player.id, cohort).await?;
            let expected = tournament.version;
            let outcome = lifecycle::join(&mut tournament, player.id.clone(), Utc::now())?;

            if !saved {
                self.store(self.players.upsert(&player)).await?;
                saved = true;
            }
            if outcome.needs_sibling() {
                self.attach_challenge_links(&mut tournament).await;
            }

            match self
                .store(self.tournaments.compare_and_swap(&tournament, expected))
                .await
            {
                Ok(stored) => {
                    info!(
                        "Registered {} in tournament {} ({})",
                        player.id, stored.id, stored.name
                    );
                    let sibling = if outcome.needs_sibling() {
                        self.open_sibling(stored.cohort).await
                    } else {
                        None
                    };
                    return Ok(RegisterOutcome {
                        tournament: stored.summary(),
                        outcome,
                        sibling,
                    });
                }
                Err(TournamentError::ConcurrencyConflict(id)) if !rematched => {
                    warn!("Registration of {} lost the race for {id}, re-matching", player.id);
                    rematched = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// WAITING tournament for `player` in `cohort` or an adjacent band
    ///
    /// A cohort without any open tournament gets its first one here. A cohort
    /// whose tournaments are all running lost its sibling at start; it is
    /// reopened for later registrations while this one is still refused.
    async fn find_seat(&self, player: &PlayerId, cohort: Cohort) -> TournamentResult<Tournament> {
        let mut bootstrapped = false;
        loop {
            let mut candidates = Vec::new();
            for band in cohort.search_bands() {
                candidates.extend(
                    self.store(
                        self.tournaments
                            .find_by_cohort_and_status(band, TournamentStatus::Waiting),
                    )
                    .await?,
                );
            }

            let exhausted = match matcher::assign(player, cohort, &candidates) {
                Ok(found) => return Ok(found.clone()),
                Err(e) => e,
            };
            if bootstrapped || candidates.iter().any(|t| t.cohort == cohort) {
                return Err(exhausted);
            }

            let running = self
                .store(
                    self.tournaments
                        .find_by_cohort_and_status(cohort, TournamentStatus::Running),
                )
                .await?;
            if !running.is_empty() {
                warn!("No waiting tournament left in {cohort}, reopening one");
                self.open_sibling(cohort).await;
                return Err(exhausted);
            }

            // matched again so concurrent first registrations share the oldest
            info!("Opening the first tournament for {cohort}");
            self.create_sibling(cohort).await?;
            bootstrapped = true;
        }
    }

    /// Late join of a registered player into a specific tournament
    ///
    /// # Errors
    ///
    /// - `UnverifiedParticipant` if the player never registered
    /// - `DuplicateMembership` if they are in another open tournament
    /// - `InvalidState` if the tournament is closed
    pub async fn join_tournament(
        &self,
        id: TournamentId,
        player: &PlayerId,
    ) -> TournamentResult<RegisterOutcome> {
        if self.store(self.players.get(player)).await?.is_none() {
            return Err(TournamentError::UnverifiedParticipant(player.to_string()));
        }

        let (stored, outcome) = self
            .commit(id, Some(player), |t| {
                lifecycle::join(t, player.clone(), Utc::now())
            })
            .await?;
        let sibling = if outcome.needs_sibling() {
            self.open_sibling(stored.cohort).await
        } else {
            None
        };

        Ok(RegisterOutcome {
            tournament: stored.summary(),
            outcome,
            sibling,
        })
    }

    /// Explicitly start a WAITING tournament before it is full
    ///
    /// # Errors
    ///
    /// - `NotFound` if no tournament has this id
    /// - `InvalidState` unless the tournament is WAITING
    /// - `InsufficientPlayers` with fewer than four players
    pub async fn start(&self, id: TournamentId) -> TournamentResult<TournamentSummary> {
        let (stored, ()) = self
            .update(id, |t| lifecycle::start(t, Utc::now()))
            .await?;
        self.open_sibling(stored.cohort).await;
        Ok(stored.summary())
    }

    /// Withdraw `player` from their active tournament
    ///
    /// Withdrawing from a RUNNING tournament gives every remaining player one
    /// point and regenerates the pairings.
    ///
    /// # Errors
    ///
    /// - `UnknownMember` if the player is in no open tournament
    /// - `BelowMinimumRoster` if only two players would remain
    pub async fn withdraw(&self, player: &PlayerId) -> TournamentResult<WithdrawReport> {
        let tournament = self
            .active_membership(player)
            .await?
            .ok_or_else(|| TournamentError::UnknownMember(player.clone()))?;

        let (stored, outcome) = self
            .update(tournament.id, |t| lifecycle::withdraw(t, player))
            .await?;

        if let Some(err) = outcome.schedule_error() {
            warn!("Tournament {} can no longer be scheduled: {err}", stored.id);
        }
        Ok(WithdrawReport {
            tournament: stored.summary(),
            outcome,
        })
    }

    /// Look up a played game and apply its result
    ///
    /// # Arguments
    ///
    /// * `player_id` - Submitting player, who must have played the game
    /// * `game_url` - Lichess or Chess.com game URL
    ///
    /// # Errors
    ///
    /// - `Validation` for unsupported URLs and games that cannot be found
    /// - `UnverifiedParticipant` when a side is not a registered player
    /// - `ExternalProvider` once the platform lookup has exhausted its retries
    /// - `AlreadySubmitted` / `AlreadyRecorded` for repeated games and pairs
    pub async fn submit_game(
        &self,
        player_id: &PlayerId,
        game_url: &str,
    ) -> TournamentResult<SubmitOutcome> {
        let platform = Platform::from_game_url(game_url).ok_or_else(|| {
            TournamentError::Validation(format!("unsupported game URL: {game_url}"))
        })?;

        let player = self
            .store(self.players.get(player_id))
            .await?
            .ok_or_else(|| TournamentError::UnverifiedParticipant(player_id.to_string()))?;
        let handle = player.handle(platform).ok_or_else(|| {
            TournamentError::UnverifiedParticipant(format!(
                "{player_id} has no linked {platform} account"
            ))
        })?;

        let tournament = self
            .active_membership(player_id)
            .await?
            .ok_or_else(|| TournamentError::UnknownMember(player_id.clone()))?;
        if tournament.status() != TournamentStatus::Running {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Running,
                actual: tournament.status(),
            });
        }

        let provider = self.providers.result_provider(platform).ok_or_else(|| {
            ProviderError::Unavailable(format!("no result provider for {platform}"))
        })?;
        let window = SearchWindow::new(tournament.start_date(), tournament.end_date());

        let game = self
            .retry_policy()
            .run("game lookup", || provider.fetch_result(game_url, handle, &window))
            .await?
            .ok_or_else(|| {
                TournamentError::Validation(format!(
                    "game {game_url} was not found, is unfinished or was played outside the tournament window"
                ))
            })?;

        let white = self.resolve_handle(platform, &game.white).await?;
        let black = self.resolve_handle(platform, &game.black).await?;
        if &white != player_id && &black != player_id {
            return Err(TournamentError::UnverifiedParticipant(format!(
                "{player_id} did not play game {}",
                game.game_id
            )));
        }

        let result = GameResult {
            white,
            black,
            outcome: game.outcome,
        };
        let game_id = format!("{platform}:{}", game.game_id);

        let (stored, scores) = self
            .update(tournament.id, |t| ingest::ingest(t, &game_id, &result))
            .await?;
        info!(
            "Recorded {game_id} in tournament {}: {} vs {} ({:?})",
            stored.id, result.white, result.black, result.outcome
        );

        Ok(SubmitOutcome {
            tournament: stored.summary(),
            game_id,
            result,
            scores,
        })
    }

    async fn resolve_handle(&self, platform: Platform, handle: &str) -> TournamentResult<PlayerId> {
        self.store(self.players.find_by_platform_handle(platform, handle))
            .await?
            .map(|p| p.id)
            .ok_or_else(|| TournamentError::UnverifiedParticipant(format!("{platform}:{handle}")))
    }

    /// Close a tournament and record its winners
    ///
    /// # Returns
    ///
    /// The winners (empty when nobody scored) and the players who never
    /// completed a game.
    pub async fn close(&self, id: TournamentId) -> TournamentResult<CloseOutcome> {
        let (stored, outcome) = self.update(id, lifecycle::close).await?;
        if !outcome.inactive.is_empty() {
            info!(
                "Tournament {} closed with {} inactive players",
                stored.id,
                outcome.inactive.len()
            );
        }
        Ok(outcome)
    }

    pub async fn get(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.load(id).await
    }

    pub async fn standings(&self, id: TournamentId) -> TournamentResult<TournamentStandings> {
        Ok(self.load(id).await?.standings())
    }

    pub async fn list(
        &self,
        cohort: Option<Cohort>,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>> {
        let tournaments = self.store(self.tournaments.list(cohort, status)).await?;
        Ok(tournaments.iter().map(Tournament::summary).collect())
    }

    /// WAITING tournament with a free seat for `cohort`, created if missing
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lookup or the insert fails.
    pub async fn ensure_waiting(&self, cohort: Cohort) -> TournamentResult<Tournament> {
        let waiting = self
            .store(
                self.tournaments
                    .find_by_cohort_and_status(cohort, TournamentStatus::Waiting),
            )
            .await?;
        if let Some(open) = waiting.into_iter().find(|t| !t.is_full()) {
            return Ok(open);
        }
        self.create_sibling(cohort).await
    }

    /// New WAITING tournament after one started
    ///
    /// The start is already committed, so a failure here is only logged; the
    /// next registration that finds no seat in the cohort reopens it.
    async fn open_sibling(&self, cohort: Cohort) -> Option<TournamentId> {
        match self.create_sibling(cohort).await {
            Ok(sibling) => Some(sibling.id),
            Err(e) => {
                warn!("Could not open a waiting tournament for {cohort}: {e}");
                None
            }
        }
    }

    async fn create_sibling(&self, cohort: Cohort) -> TournamentResult<Tournament> {
        let sequence = self.store(self.tournaments.max_sequence(cohort)).await? + 1;
        let tournament = Tournament::new(cohort, sequence, self.config.capacity, self.config.automode)?;
        self.store(self.tournaments.insert(&tournament)).await?;
        info!("Created waiting tournament {} ({})", tournament.id, tournament.name);
        Ok(tournament)
    }

    /// Apply `apply` to tournament `id` and commit it, re-reading on conflict
    async fn update<T, F>(&self, id: TournamentId, apply: F) -> TournamentResult<(Tournament, T)>
    where
        F: FnMut(&mut Tournament) -> TournamentResult<T>,
    {
        self.commit(id, None, apply).await
    }

    /// Like [`Self::update`], and when `joining` is set, re-checks before every
    /// attempt that the player has not been placed elsewhere meanwhile
    async fn commit<T, F>(
        &self,
        id: TournamentId,
        joining: Option<&PlayerId>,
        mut apply: F,
    ) -> TournamentResult<(Tournament, T)>
    where
        F: FnMut(&mut Tournament) -> TournamentResult<T>,
    {
        let attempts = self.config.commit_attempts.max(1);
        let mut attempt = 1;

        loop {
            if let Some(player) = joining
                && let Some(existing) = self.active_membership(player).await?
            {
                return Err(TournamentError::DuplicateMembership {
                    player: player.clone(),
                    tournament: existing.id,
                });
            }

            let mut tournament = self.load(id).await?;
            let expected = tournament.version;
            let schedule_before = tournament.schedule().clone();

            let value = apply(&mut tournament)?;
            if tournament.schedule() != &schedule_before && !tournament.schedule().is_empty() {
                self.attach_challenge_links(&mut tournament).await;
            }

            match self
                .store(self.tournaments.compare_and_swap(&tournament, expected))
                .await
            {
                Ok(stored) => return Ok((stored, value)),
                Err(TournamentError::ConcurrencyConflict(_)) if attempt < attempts => {
                    attempt += 1;
                    debug!("Tournament {id} changed concurrently, retrying (attempt {attempt}/{attempts})");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fill in challenge links for an automode tournament's pairings
    ///
    /// Failures leave the affected pairings without a link.
    async fn attach_challenge_links(&self, tournament: &mut Tournament) {
        if !tournament.automode {
            return;
        }
        let Some(provider) = self.providers.challenge_provider() else {
            return;
        };
        let platform = provider.platform();
        let policy = self.retry_policy();
        let time_control = tournament.time_control();
        let tournament_name = tournament.name.clone();

        for pairing in tournament.schedule.pairings_mut() {
            if pairing.challenge_url.is_some() {
                continue;
            }
            let (white, black) = match (
                self.handle_of(&pairing.white, platform).await,
                self.handle_of(&pairing.black, platform).await,
            ) {
                (Some(w), Some(b)) => (w, b),
                _ => continue,
            };

            let request = ChallengeRequest {
                time_control,
                tournament_name: tournament_name.clone(),
                white_handle: white,
                black_handle: black,
            };
            match policy
                .run("challenge link", || provider.create_challenge(&request))
                .await
            {
                Ok(url) => pairing.challenge_url = url,
                Err(e) => warn!(
                    "No challenge link for {} vs {}: {e}",
                    pairing.white, pairing.black
                ),
            }
        }
    }

    async fn handle_of(&self, player: &PlayerId, platform: Platform) -> Option<String> {
        match self.store(self.players.get(player)).await {
            Ok(found) => found.and_then(|p| p.handle(platform).map(str::to_string)),
            Err(e) => {
                warn!("Could not load player {player}: {e}");
                None
            }
        }
    }
}
