//! Dashboard controller: session gating, per-period data slots, and the
//! single view to show.
//!
//! Each period owns a slot moving `Idle → Loading → {Loaded | Failed}`.
//! Fetches are split into a synchronous `begin` (returns a ticket), the
//! network call ([`FetchTicket::run`]), and a synchronous `complete`, so a
//! tab switch can happen while a request is outstanding. A completed fetch
//! always lands in the slot it was issued for; the view reads the slot(s)
//! of the tab active *now*.

use std::time::Duration;

use crate::session::{SessionInvalidator, SessionState};
use crate::spending::{AllSpending, RefreshOutcome, SpendingApi, SpendingError, SpendingSummary};
use crate::summary::SummaryCard;
use crate::types::{FilterTab, Period};

const SLOW_LOADING_AFTER: Duration = Duration::from_secs(3);

/// User-visible problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    SessionExpired,
    FetchFailed,
    RefreshFailed,
}

impl Banner {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => "Session expired. Please log out and sign in again.",
            Self::FetchFailed => "Failed to fetch spending data. Please try again.",
            Self::RefreshFailed => "Failed to refresh data. Please try again.",
        }
    }
}

/// Data slot for one period.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    #[default]
    Idle,
    Loading,
    Loaded(SpendingSummary),
    Failed(Banner),
}

/// Which request a ticket stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    One(Period),
    All,
}

impl Target {
    #[must_use]
    pub fn for_tab(tab: FilterTab) -> Self {
        tab.period().map_or(Self::All, Self::One)
    }

    fn periods(self) -> &'static [Period] {
        match self {
            Self::One(Period::Daily) => &[Period::Daily],
            Self::One(Period::Weekly) => &[Period::Weekly],
            Self::One(Period::Monthly) => &[Period::Monthly],
            Self::All => &Period::ALL,
        }
    }
}

/// Permission to issue one fetch, carrying the token it must use.
pub struct FetchTicket {
    target: Target,
    access_token: String,
}

impl std::fmt::Debug for FetchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTicket")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Fetched {
    One(SpendingSummary),
    All(AllSpending),
}

/// Result of running a [`FetchTicket`], to hand back to [`Dashboard::complete`].
#[derive(Debug)]
pub struct FetchOutcome {
    pub target: Target,
    pub result: Result<Fetched, SpendingError>,
}

impl FetchTicket {
    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    pub async fn run<A: SpendingApi>(self, api: &A) -> FetchOutcome {
        let result = match self.target {
            Target::One(period) => api
                .fetch(period, &self.access_token)
                .await
                .map(Fetched::One),
            Target::All => api.fetch_all(&self.access_token).await.map(Fetched::All),
        };
        FetchOutcome {
            target: self.target,
            result,
        }
    }
}

/// Permission to issue one refresh request.
pub struct RefreshTicket {
    access_token: String,
}

impl RefreshTicket {
    pub async fn run<A: SpendingApi>(self, api: &A) -> Result<RefreshOutcome, SpendingError> {
        api.refresh(&self.access_token).await
    }
}

/// What the caller must do next.
#[must_use]
#[derive(Debug)]
pub enum Effect {
    None,
    /// Discard the session (exactly once per session).
    Invalidate,
    Fetch(FetchTicket),
}

/// The one thing to render.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading,
    SignIn,
    Reauthenticate,
    Error(Banner),
    Summary {
        tab: FilterTab,
        user: String,
        cards: Vec<SummaryCard>,
    },
}

/// Message under the spinner; changes once loading gets slow.
#[must_use]
pub fn loading_message(elapsed: Duration) -> &'static str {
    if elapsed >= SLOW_LOADING_AFTER {
        "Uff! You did so many transactions. Don't worry, we'll fetch all of them—just wait please."
    } else {
        "Fetching the spendings, please wait..."
    }
}

#[derive(Debug, Default)]
struct Slots {
    daily: Slot,
    weekly: Slot,
    monthly: Slot,
}

impl Slots {
    fn get(&self, period: Period) -> &Slot {
        match period {
            Period::Daily => &self.daily,
            Period::Weekly => &self.weekly,
            Period::Monthly => &self.monthly,
        }
    }

    fn get_mut(&mut self, period: Period) -> &mut Slot {
        match period {
            Period::Daily => &mut self.daily,
            Period::Weekly => &mut self.weekly,
            Period::Monthly => &mut self.monthly,
        }
    }
}

#[derive(Debug)]
pub struct Dashboard {
    session: SessionState,
    active: FilterTab,
    slots: Slots,
    notice: Option<Banner>,
    invalidated: bool,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    /// Starts with the session still being resolved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: SessionState::Loading,
            active: FilterTab::default(),
            slots: Slots::default(),
            notice: None,
            invalidated: false,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionState) -> Self {
        self.set_session(session);
        self
    }

    /// Preselect a tab without loading it.
    #[must_use]
    pub fn with_tab(mut self, tab: FilterTab) -> Self {
        self.active = tab;
        self
    }

    pub fn set_session(&mut self, session: SessionState) {
        if session.is_authenticated() {
            self.invalidated = false;
        }
        self.session = session;
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn active_tab(&self) -> FilterTab {
        self.active
    }

    #[must_use]
    pub fn slot(&self, period: Period) -> &Slot {
        self.slots.get(period)
    }

    #[must_use]
    pub fn notice(&self) -> Option<Banner> {
        self.notice
    }

    /// Switch tabs and start loading the new tab.
    ///
    /// Requests already in flight for other tabs are left alone.
    pub fn select_tab(&mut self, tab: FilterTab) -> Effect {
        self.active = tab;
        match self.begin_fetch(Target::for_tab(tab)) {
            Some(ticket) => Effect::Fetch(ticket),
            None => Effect::None,
        }
    }

    /// Mark the target slot(s) loading and hand out a ticket.
    ///
    /// `None` unless the session is authenticated with a token.
    pub fn begin_fetch(&mut self, target: Target) -> Option<FetchTicket> {
        if self.invalidated {
            return None;
        }
        let access_token = self.session.access_token()?.to_owned();
        self.notice = None;
        for &period in target.periods() {
            *self.slots.get_mut(period) = Slot::Loading;
        }
        Some(FetchTicket {
            target,
            access_token,
        })
    }

    /// Store a fetch result in the slot(s) it was issued for.
    pub fn complete(&mut self, outcome: FetchOutcome) -> Effect {
        match outcome.result {
            Ok(Fetched::One(summary)) => {
                if let Target::One(period) = outcome.target {
                    *self.slots.get_mut(period) = Slot::Loaded(summary);
                }
                Effect::None
            }
            Ok(Fetched::All(all)) => {
                for (period, summary) in all.into_periods() {
                    *self.slots.get_mut(period) = Slot::Loaded(summary);
                }
                Effect::None
            }
            Err(SpendingError::Unauthorized) => {
                self.fail(outcome.target, Banner::SessionExpired);
                self.unauthorized()
            }
            Err(SpendingError::Transient(_)) => {
                self.fail(outcome.target, Banner::FetchFailed);
                Effect::None
            }
        }
    }

    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        if self.invalidated {
            return None;
        }
        let access_token = self.session.access_token()?.to_owned();
        self.notice = None;
        Some(RefreshTicket { access_token })
    }

    /// On a successful refresh, re-fetch whatever tab is active now.
    pub fn complete_refresh(&mut self, result: Result<RefreshOutcome, SpendingError>) -> Effect {
        match result {
            Ok(RefreshOutcome { success: true }) => self.select_tab(self.active),
            Ok(RefreshOutcome { success: false }) => Effect::None,
            Err(SpendingError::Unauthorized) => self.unauthorized(),
            Err(SpendingError::Transient(_)) => {
                self.notice = Some(Banner::RefreshFailed);
                Effect::None
            }
        }
    }

    fn fail(&mut self, target: Target, banner: Banner) {
        for &period in target.periods() {
            *self.slots.get_mut(period) = Slot::Failed(banner);
        }
    }

    fn unauthorized(&mut self) -> Effect {
        self.notice = Some(Banner::SessionExpired);
        if self.invalidated {
            return Effect::None;
        }
        self.invalidated = true;
        self.session = SessionState::Unauthenticated;
        Effect::Invalidate
    }

    /// Pick the single view for the current state.
    #[must_use]
    pub fn view(&self) -> View {
        let artifact = match &self.session {
            SessionState::Loading => return View::Loading,
            SessionState::Unauthenticated => return View::SignIn,
            SessionState::AuthenticatedWithoutToken(_) => return View::Reauthenticate,
            SessionState::Authenticated(artifact) => artifact,
        };

        let periods = Target::for_tab(self.active).periods();
        let slots = periods.iter().map(|&p| (p, self.slots.get(p)));

        if slots.clone().any(|(_, s)| matches!(s, Slot::Loading)) {
            return View::Loading;
        }
        if let Some(notice) = self.notice {
            return View::Error(notice);
        }
        if let Some(banner) = slots.clone().find_map(|(_, s)| match s {
            Slot::Failed(b) => Some(*b),
            _ => None,
        }) {
            return View::Error(banner);
        }

        let cards = slots
            .filter_map(|(period, slot)| match slot {
                Slot::Loaded(data) => Some(SummaryCard::build(period, data, self.active)),
                _ => None,
            })
            .collect();

        View::Summary {
            tab: self.active,
            user: artifact.identity.display_name().to_owned(),
            cards,
        }
    }

    /// Run effects to completion, one request at a time.
    pub async fn drive<A, I>(&mut self, mut effect: Effect, api: &A, invalidator: &I)
    where
        A: SpendingApi,
        I: SessionInvalidator + ?Sized,
    {
        loop {
            effect = match effect {
                Effect::None => return,
                Effect::Invalidate => {
                    invalidator.invalidate();
                    return;
                }
                Effect::Fetch(ticket) => {
                    let outcome = ticket.run(api).await;
                    self.complete(outcome)
                }
            };
        }
    }

    /// Select `tab` and wait for its data.
    pub async fn show_tab<A, I>(&mut self, tab: FilterTab, api: &A, invalidator: &I)
    where
        A: SpendingApi,
        I: SessionInvalidator + ?Sized,
    {
        let effect = self.select_tab(tab);
        self.drive(effect, api, invalidator).await;
    }

    /// Recompute server-side, then reload the active tab.
    pub async fn refresh<A, I>(&mut self, api: &A, invalidator: &I)
    where
        A: SpendingApi,
        I: SessionInvalidator + ?Sized,
    {
        let Some(ticket) = self.begin_refresh() else {
            return;
        };
        let result = ticket.run(api).await;
        let effect = self.complete_refresh(result);
        self.drive(effect, api, invalidator).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::session::{IdentityClaims, SessionArtifact, TokenPair};
    use crate::spending::Totals;

    fn summary(total: f64, previously: f64) -> SpendingSummary {
        SpendingSummary {
            summary: Totals { total, previously },
            details: Vec::new(),
        }
    }

    fn authenticated() -> SessionState {
        let mut identity = IdentityClaims::new("1089");
        identity.name = Some("Asha".into());
        SessionState::Authenticated(SessionArtifact::new(
            identity,
            TokenPair::new("at", None, 0),
        ))
    }

    /// Scripted API: queued responses per period, healthy totals otherwise.
    #[derive(Default)]
    struct FakeApi {
        scripted: Mutex<Vec<(Period, VecDeque<Result<SpendingSummary, SpendingError>>)>>,
        refresh: Mutex<VecDeque<Result<RefreshOutcome, SpendingError>>>,
        fetches: AtomicUsize,
        refreshes: AtomicUsize,
    }

    impl FakeApi {
        fn script(self, period: Period, result: Result<SpendingSummary, SpendingError>) -> Self {
            {
                let mut scripted = self.scripted.lock().unwrap();
                match scripted.iter_mut().find(|(p, _)| *p == period) {
                    Some((_, queue)) => queue.push_back(result),
                    None => scripted.push((period, VecDeque::from([result]))),
                }
            }
            self
        }

        fn script_refresh(self, result: Result<RefreshOutcome, SpendingError>) -> Self {
            self.refresh.lock().unwrap().push_back(result);
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn healthy(period: Period) -> SpendingSummary {
            match period {
                Period::Daily => summary(10.0, 5.0),
                Period::Weekly => summary(150.0, 100.0),
                Period::Monthly => summary(50.0, 100.0),
            }
        }
    }

    impl SpendingApi for FakeApi {
        async fn fetch(
            &self,
            period: Period,
            access_token: &str,
        ) -> Result<SpendingSummary, SpendingError> {
            assert_eq!(access_token, "at");
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut scripted = self.scripted.lock().unwrap();
                scripted
                    .iter_mut()
                    .find(|(p, _)| *p == period)
                    .and_then(|(_, q)| q.pop_front())
            };
            next.unwrap_or_else(|| Ok(Self::healthy(period)))
        }

        async fn refresh(&self, _access_token: &str) -> Result<RefreshOutcome, SpendingError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let next = self.refresh.lock().unwrap().pop_front();
            next.unwrap_or(Ok(RefreshOutcome { success: true }))
        }
    }

    #[derive(Default)]
    struct CountingInvalidator(AtomicUsize);

    impl SessionInvalidator for CountingInvalidator {
        fn invalidate(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingInvalidator {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn card_totals(view: &View) -> Vec<(Period, String)> {
        match view {
            View::Summary { cards, .. } => cards.iter().map(|c| (c.period, c.total.clone())).collect(),
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn session_states_gate_the_view() {
        assert_eq!(Dashboard::new().view(), View::Loading);
        assert_eq!(
            Dashboard::new().with_session(SessionState::Unauthenticated).view(),
            View::SignIn
        );
        let no_token = SessionState::AuthenticatedWithoutToken(IdentityClaims::new("1"));
        assert_eq!(Dashboard::new().with_session(no_token).view(), View::Reauthenticate);
    }

    #[test]
    fn no_fetch_without_token() {
        let mut dash = Dashboard::new().with_session(SessionState::Unauthenticated);
        assert!(matches!(dash.select_tab(FilterTab::Daily), Effect::None));
        assert!(dash.begin_refresh().is_none());

        let no_token = SessionState::AuthenticatedWithoutToken(IdentityClaims::new("1"));
        let mut dash = Dashboard::new().with_session(no_token);
        assert!(dash.begin_fetch(Target::One(Period::Daily)).is_none());
        assert_eq!(dash.slot(Period::Daily), &Slot::Idle);
    }

    #[tokio::test]
    async fn loads_active_tab() {
        let api = FakeApi::default();
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Weekly, &api, &inv).await;

        let view = dash.view();
        assert_eq!(card_totals(&view), vec![(Period::Weekly, "₹150.00".to_string())]);
        if let View::Summary { user, tab, .. } = view {
            assert_eq!(user, "Asha");
            assert_eq!(tab, FilterTab::Weekly);
        }
        assert_eq!(dash.slot(Period::Daily), &Slot::Idle);
    }

    #[tokio::test]
    async fn unauthorized_invalidates_once_and_stops() {
        let api = FakeApi::default().script(Period::Daily, Err(SpendingError::Unauthorized));
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Daily, &api, &inv).await;

        assert_eq!(inv.count(), 1);
        assert_eq!(api.fetches(), 1);
        assert_eq!(dash.session(), &SessionState::Unauthenticated);
        assert_eq!(dash.notice(), Some(Banner::SessionExpired));
        assert_eq!(dash.view(), View::SignIn);

        // Nothing else may be fetched in this cycle.
        dash.show_tab(FilterTab::Weekly, &api, &inv).await;
        dash.refresh(&api, &inv).await;
        assert_eq!(api.fetches(), 1);
        assert_eq!(inv.count(), 1);
    }

    #[test]
    fn second_unauthorized_does_not_invalidate_again() {
        let mut dash = Dashboard::new().with_session(authenticated());
        let Effect::Fetch(daily) = dash.select_tab(FilterTab::Daily) else {
            panic!("expected fetch");
        };
        let Effect::Fetch(weekly) = dash.select_tab(FilterTab::Weekly) else {
            panic!("expected fetch");
        };

        let first = dash.complete(FetchOutcome {
            target: daily.target(),
            result: Err(SpendingError::Unauthorized),
        });
        let second = dash.complete(FetchOutcome {
            target: weekly.target(),
            result: Err(SpendingError::Unauthorized),
        });
        assert!(matches!(first, Effect::Invalidate));
        assert!(matches!(second, Effect::None));
    }

    #[tokio::test]
    async fn server_error_shows_banner_and_retry_recovers() {
        let api = FakeApi::default()
            .script(Period::Weekly, Err(SpendingError::Transient("HTTP 500".into())));
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Weekly, &api, &inv).await;
        assert_eq!(dash.view(), View::Error(Banner::FetchFailed));
        assert_eq!(inv.count(), 0);
        assert!(dash.session().is_authenticated());

        dash.show_tab(FilterTab::Weekly, &api, &inv).await;
        assert_eq!(
            card_totals(&dash.view()),
            vec![(Period::Weekly, "₹150.00".to_string())]
        );
    }

    #[tokio::test]
    async fn late_result_lands_in_its_own_slot() {
        let api = FakeApi::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        let Effect::Fetch(daily) = dash.select_tab(FilterTab::Daily) else {
            panic!("expected fetch");
        };
        let daily_in_flight = daily.run(&api);

        let Effect::Fetch(weekly) = dash.select_tab(FilterTab::Weekly) else {
            panic!("expected fetch");
        };
        let outcome = weekly.run(&api).await;
        assert!(matches!(dash.complete(outcome), Effect::None));
        assert_eq!(dash.slot(Period::Daily), &Slot::Loading);

        let outcome = daily_in_flight.await;
        assert!(matches!(dash.complete(outcome), Effect::None));

        assert_eq!(dash.active_tab(), FilterTab::Weekly);
        assert_eq!(dash.slot(Period::Daily), &Slot::Loaded(summary(10.0, 5.0)));
        assert_eq!(
            card_totals(&dash.view()),
            vec![(Period::Weekly, "₹150.00".to_string())]
        );
    }

    #[tokio::test]
    async fn all_tab_fails_as_a_whole() {
        let api = FakeApi::default()
            .script(Period::Monthly, Err(SpendingError::Transient("HTTP 502".into())));
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::All, &api, &inv).await;

        assert_eq!(dash.view(), View::Error(Banner::FetchFailed));
        for period in Period::ALL {
            assert_eq!(dash.slot(period), &Slot::Failed(Banner::FetchFailed));
        }
        assert_eq!(inv.count(), 0);
    }

    #[tokio::test]
    async fn all_tab_shows_three_cards() {
        let api = FakeApi::default();
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::All, &api, &inv).await;

        let periods: Vec<Period> = card_totals(&dash.view()).into_iter().map(|(p, _)| p).collect();
        assert_eq!(periods, Period::ALL.to_vec());
    }

    #[tokio::test]
    async fn refresh_reloads_active_tab() {
        let api = FakeApi::default();
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Monthly, &api, &inv).await;
        dash.refresh(&api, &inv).await;

        assert_eq!(api.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(api.fetches(), 2);
        assert_eq!(
            card_totals(&dash.view()),
            vec![(Period::Monthly, "₹50.00".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_session() {
        let api =
            FakeApi::default().script_refresh(Err(SpendingError::Transient("timeout".into())));
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Daily, &api, &inv).await;
        dash.refresh(&api, &inv).await;

        assert_eq!(dash.view(), View::Error(Banner::RefreshFailed));
        assert_eq!(inv.count(), 0);
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test]
    async fn unsuccessful_refresh_does_not_refetch() {
        let api = FakeApi::default().script_refresh(Ok(RefreshOutcome { success: false }));
        let inv = CountingInvalidator::default();
        let mut dash = Dashboard::new().with_session(authenticated());

        dash.show_tab(FilterTab::Daily, &api, &inv).await;
        dash.refresh(&api, &inv).await;

        assert_eq!(api.fetches(), 1);
        assert!(matches!(dash.view(), View::Summary { .. }));
    }

    #[test]
    fn loading_message_escalates() {
        assert_eq!(
            loading_message(Duration::from_millis(500)),
            "Fetching the spendings, please wait..."
        );
        assert!(loading_message(Duration::from_secs(3)).starts_with("Uff!"));
    }
}
