//! View Controller - owns `ViewState` and runs the dashboard event loop
//!
//! Everything happens on one task: input events, the slider debounce timer,
//! animation ticks and fetch completions are multiplexed with `select!`.
//! In-flight fetches are futures polled by this same task, so responses are
//! applied in completion order.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::animation::AnimationDriver;
use crate::chart::{build_heatmap_spec, build_map_and_bar, ChartSink, ChartSpec, Container};
use crate::client::DataSource;
use crate::config::{Config, ResponseOrdering};
use crate::debounce::SliderDebounce;
use crate::error::FetchError;
use crate::log_fetch_error;
use crate::model::{Drilldown, HeatmapDataset, HeatmapGroup, MapResponse, Year};
use crate::state::{Snapshot, Status, Tab, ViewState};

/// User input understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SwitchTab(Tab),
    TogglePlay,
    Play,
    Pause,
    /// Raw slider value; clamped into the year range
    SliderMoved(i32),
    DrilldownChanged(Drilldown),
    HeatmapGroupChanged(HeatmapGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub tick: Duration,
    pub debounce: Duration,
    pub ordering: ResponseOrdering,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick: config.timing.tick(),
            debounce: config.timing.debounce(),
            ordering: config.responses.ordering,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Sender side held by the viewer / CLI
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<Event>,
    snapshots: watch::Receiver<Snapshot>,
}

impl ControllerHandle {
    /// Queue an event; false once the controller has shut down
    pub fn send(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

enum Completion {
    Map {
        token: u64,
        year: Year,
        drilldown: Drilldown,
        result: Result<MapResponse, FetchError>,
    },
    Heatmap {
        token: u64,
        group: HeatmapGroup,
        result: Result<HeatmapDataset, FetchError>,
    },
}

enum Step {
    Input(Event),
    Closed,
    DebounceElapsed,
    Tick,
    Completed(Completion),
}

pub struct Controller<D, S> {
    source: D,
    sink: S,
    settings: ControllerSettings,
    view: ViewState,
    slider: SliderDebounce,
    animation: AnimationDriver,
    status: Status,
    heatmap_requested: bool,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    next_token: u64,
    latest_map_token: u64,
    latest_heatmap_token: u64,
    events: mpsc::UnboundedReceiver<Event>,
    snapshots: watch::Sender<Snapshot>,
}

impl<D: DataSource, S: ChartSink> Controller<D, S> {
    pub fn new(settings: ControllerSettings, view: ViewState, source: D, sink: S) -> (Self, ControllerHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::initial(view));

        let controller = Self {
            source,
            sink,
            settings,
            view,
            slider: SliderDebounce::new(settings.debounce),
            animation: AnimationDriver::new(settings.tick),
            status: Status::Idle,
            heatmap_requested: false,
            in_flight: FuturesUnordered::new(),
            next_token: 0,
            latest_map_token: 0,
            latest_heatmap_token: 0,
            events: event_rx,
            snapshots: snapshot_tx,
        };
        let handle = ControllerHandle {
            events: event_tx,
            snapshots: snapshot_rx,
        };
        (controller, handle)
    }

    /// Run until every handle is dropped and all in-flight fetches settle
    pub async fn run(mut self) {
        tracing::info!(
            "Controller started: year={} drilldown={} tick={:?} debounce={:?} ordering={:?}",
            self.view.current_year,
            self.view.drilldown,
            self.settings.tick,
            self.settings.debounce,
            self.settings.ordering
        );

        // Initial load of the animation tab
        self.request_map(self.view.current_year, self.view.drilldown);
        self.publish();

        let mut accepting = true;
        loop {
            if !accepting && self.in_flight.is_empty() {
                break;
            }

            let deadline = self.slider.deadline();
            let step = tokio::select! {
                event = self.events.recv(), if accepting => match event {
                    Some(event) => Step::Input(event),
                    None => Step::Closed,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if accepting && deadline.is_some() => {
                    Step::DebounceElapsed
                }
                _ = self.animation.tick(), if accepting => Step::Tick,
                Some(done) = self.in_flight.next() => Step::Completed(done),
            };

            match step {
                Step::Input(event) => self.handle_event(event),
                Step::Closed => {
                    tracing::info!("All controller handles dropped, draining {} fetches", self.in_flight.len());
                    self.pause();
                    accepting = false;
                }
                Step::DebounceElapsed => self.flush_slider(),
                Step::Tick => self.on_tick(),
                Step::Completed(done) => self.apply(done),
            }
            self.publish();
        }

        tracing::info!("Controller stopped");
    }

    fn handle_event(&mut self, event: Event) {
        tracing::debug!("Event: {:?}", event);
        match event {
            Event::SwitchTab(tab) => {
                self.view.active_tab = tab;
                if tab == Tab::Heatmap && !self.heatmap_requested {
                    self.request_heatmap(self.view.heatmap_group);
                }
            }
            Event::TogglePlay => {
                if self.view.is_playing {
                    self.pause();
                } else {
                    self.play();
                }
            }
            Event::Play => self.play(),
            Event::Pause => self.pause(),
            Event::SliderMoved(raw) => {
                let year = Year::clamped(raw);
                self.view.current_year = year;
                self.slider.input(year, Instant::now());
            }
            Event::DrilldownChanged(drilldown) => {
                self.view.drilldown = drilldown;
                self.request_map(self.view.current_year, drilldown);
            }
            Event::HeatmapGroupChanged(group) => {
                self.view.heatmap_group = group;
                self.request_heatmap(group);
            }
        }
    }

    fn play(&mut self) {
        if !self.animation.start() {
            tracing::debug!("Play ignored: animation already running");
        }
        self.view.is_playing = true;
    }

    fn pause(&mut self) {
        self.animation.stop();
        self.view.is_playing = false;
    }

    fn on_tick(&mut self) {
        self.view.current_year = self.view.current_year.next_wrapping();
        tracing::debug!("Animation tick -> {}", self.view.current_year);
        self.request_map(self.view.current_year, self.view.drilldown);
    }

    fn flush_slider(&mut self) {
        if let Some(year) = self.slider.fire(Instant::now()) {
            let token = self.request_map(year, self.view.drilldown);
            self.slider.fetching(year, token);
        }
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn request_map(&mut self, year: Year, drilldown: Drilldown) -> u64 {
        let token = self.issue_token();
        self.latest_map_token = token;
        self.status = Status::Loading;

        let source = self.source.clone();
        self.in_flight.push(Box::pin(async move {
            let result = source.fetch_map_data(year, drilldown).await;
            Completion::Map {
                token,
                year,
                drilldown,
                result,
            }
        }));
        token
    }

    fn request_heatmap(&mut self, group: HeatmapGroup) -> u64 {
        let token = self.issue_token();
        self.latest_heatmap_token = token;
        self.heatmap_requested = true;
        self.status = Status::Loading;

        let source = self.source.clone();
        self.in_flight.push(Box::pin(async move {
            let result = source.fetch_heatmap_data(group).await;
            Completion::Heatmap { token, group, result }
        }));
        token
    }

    fn is_stale(&self, token: u64, latest: u64) -> bool {
        self.settings.ordering == ResponseOrdering::LatestRequest && token != latest
    }

    fn apply(&mut self, done: Completion) {
        match done {
            Completion::Map {
                token,
                year,
                drilldown,
                result,
            } => {
                self.slider.settle(token);
                if self.is_stale(token, self.latest_map_token) {
                    tracing::debug!("Discarding stale map response #{} ({} by {})", token, year, drilldown);
                    return;
                }
                match result.and_then(|r| checked("map-data", r, MapResponse::validate)) {
                    Ok(response) => {
                        let (map, bar) = build_map_and_bar(year, &response);
                        tracing::debug!(
                            "Rendering map #{}: {} points in {} traces, {} bars",
                            token,
                            map.point_count(),
                            map.traces.len(),
                            bar.bars.len()
                        );
                        self.sink.render(Container::Map, ChartSpec::Map(map));
                        self.sink.render(Container::Bar, ChartSpec::Bar(bar));
                        self.status = Status::Updated { at: chrono::Local::now() };
                    }
                    Err(err) => {
                        log_fetch_error!(err, "map-data", year = %year, drilldown = %drilldown);
                        self.status = Status::Failed { message: err.to_string() };
                    }
                }
            }
            Completion::Heatmap { token, group, result } => {
                if self.is_stale(token, self.latest_heatmap_token) {
                    tracing::debug!("Discarding stale heatmap response #{} ({})", token, group);
                    return;
                }
                match result.and_then(|r| checked("heatmap-data", r, HeatmapDataset::validate)) {
                    Ok(heatmap) => {
                        let spec = build_heatmap_spec(&heatmap);
                        tracing::debug!("Rendering heatmap #{}: {}x{}", token, spec.rows(), spec.columns());
                        self.sink.render(Container::Heatmap, ChartSpec::Heatmap(spec));
                        self.status = Status::Updated { at: chrono::Local::now() };
                    }
                    Err(err) => {
                        log_fetch_error!(err, "heatmap-data", group = %group);
                        self.status = Status::Failed { message: err.to_string() };
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(Snapshot {
            view: self.view,
            slider: self.slider.phase(),
            status: self.status.clone(),
            animation_running: self.animation.is_running(),
            in_flight: self.in_flight.len(),
        });
    }
}

/// Shape check for payloads from any `DataSource`; specs index the arrays directly
fn checked<T>(endpoint: &str, payload: T, validate: fn(&T) -> Result<(), String>) -> Result<T, FetchError> {
    validate(&payload).map_err(|reason| FetchError::Shape {
        url: endpoint.to_string(),
        reason,
    })?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PALETTE;
    use crate::debounce::SliderPhase;
    use crate::model::{BarData, MapData};
    use crate::state::{lock_board, BoardSink, ChartBoard, SharedBoard};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Map(i32, Drilldown),
        Heatmap(HeatmapGroup),
    }

    /// In-memory source: records calls, answers after a per-year delay
    #[derive(Clone, Default)]
    struct FakeSource {
        calls: Arc<Mutex<Vec<Call>>>,
        delays: Arc<Mutex<HashMap<i32, Duration>>>,
        broken: Arc<Mutex<bool>>,
        ragged: Arc<Mutex<bool>>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn map_calls(&self) -> Vec<i32> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Map(year, _) => Some(year),
                    Call::Heatmap(_) => None,
                })
                .collect()
        }

        fn delay_year(&self, year: i32, delay: Duration) {
            self.delays.lock().unwrap().insert(year, delay);
        }

        fn set_broken(&self, broken: bool) {
            *self.broken.lock().unwrap() = broken;
        }

        /// Answer with parallel arrays of unequal length
        fn set_ragged(&self, ragged: bool) {
            *self.ragged.lock().unwrap() = ragged;
        }

        fn malformed() -> FetchError {
            FetchError::Json {
                url: "http://stub/api".into(),
                source: serde_json::from_str::<MapResponse>("<html>").unwrap_err(),
            }
        }
    }

    fn sample_map(year: i32) -> MapResponse {
        let categories: Vec<String> = ["Stony", "Iron", "Stony"].iter().map(|s| s.to_string()).collect();
        MapResponse {
            map_data: MapData {
                category: categories.clone(),
                lat: vec![1.0, 2.0, 3.0],
                lon: vec![4.0, 5.0, 6.0],
                name: vec![format!("{}-a", year), format!("{}-b", year), format!("{}-c", year)],
                mass: vec![10.0, 20_000.0, 30.0],
                recclass: vec!["L5".into(), "IIAB".into(), "H4".into()],
                superclass: vec!["Chondrite".into(), "Magmatic".into(), "Chondrite".into()],
                megaclass: categories,
            },
            bar_data: BarData {
                categories: vec!["Stony".into(), "Iron".into()],
                counts: vec![2, 1],
            },
        }
    }

    impl DataSource for FakeSource {
        async fn fetch_map_data(&self, year: Year, drilldown: Drilldown) -> Result<MapResponse, FetchError> {
            self.calls.lock().unwrap().push(Call::Map(year.value(), drilldown));
            let delay = self.delays.lock().unwrap().get(&year.value()).copied();
            tokio::time::sleep(delay.unwrap_or(Duration::from_millis(10))).await;
            if *self.broken.lock().unwrap() {
                return Err(Self::malformed());
            }
            let mut response = sample_map(year.value());
            if *self.ragged.lock().unwrap() {
                response.map_data.lon.pop();
                response.map_data.mass.clear();
            }
            Ok(response)
        }

        async fn fetch_heatmap_data(&self, group: HeatmapGroup) -> Result<HeatmapDataset, FetchError> {
            self.calls.lock().unwrap().push(Call::Heatmap(group));
            tokio::time::sleep(Duration::from_millis(10)).await;
            if *self.broken.lock().unwrap() {
                return Err(Self::malformed());
            }
            Ok(HeatmapDataset {
                title: format!("Average Composition per {}", group.label()),
                x: vec!["Fe".into(), "Ni".into()],
                y: vec!["Iron".into()],
                z: vec![vec![88.0, 9.5]],
            })
        }
    }

    struct Harness {
        source: FakeSource,
        board: SharedBoard,
        handle: ControllerHandle,
        task: tokio::task::JoinHandle<()>,
    }

    fn start(settings: ControllerSettings, year: i32) -> Harness {
        let source = FakeSource::default();
        let board = ChartBoard::shared();
        let view = ViewState {
            current_year: Year::clamped(year),
            ..Default::default()
        };
        let sink = BoardSink::new(board.clone(), |_| {});
        let (controller, handle) = Controller::new(settings, view, source.clone(), sink);
        let task = tokio::spawn(controller.run());
        Harness {
            source,
            board,
            handle,
            task,
        }
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn map_title(board: &SharedBoard) -> Option<String> {
        lock_board(board).map.as_ref().map(|m| m.title.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_renders_map_and_bar() {
        let h = start(ControllerSettings::default(), 1850);
        wait(50).await;

        assert_eq!(h.source.calls(), vec![Call::Map(1850, Drilldown::Megaclass)]);
        let board = lock_board(&h.board);
        let map = board.map.as_ref().unwrap();
        let bar = board.bar.as_ref().unwrap();
        assert_eq!(map.title, "Meteorites in 1850");
        assert_eq!(map.point_count(), 3);
        assert_eq!(bar.total(), 3);
        assert_eq!(bar.bars[0].color, PALETTE[0]);
        assert_eq!(map.traces[1].color, bar.bars[1].color);
        drop(board);
        assert!(matches!(h.handle.snapshot().status, Status::Updated { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slider_burst_fetches_once_with_last_value() {
        let h = start(ControllerSettings::default(), 1850);
        wait(50).await;

        for year in [1900, 1910, 1920, 1930, 1940] {
            assert!(h.handle.send(Event::SliderMoved(year)));
            wait(40).await;
            // Label feedback is immediate
            assert_eq!(h.handle.snapshot().view.current_year.value(), year);
        }
        assert!(matches!(h.handle.snapshot().slider, SliderPhase::PendingDebounce { .. }));
        assert_eq!(h.source.map_calls(), vec![1850]);

        wait(200).await;
        assert_eq!(h.source.map_calls(), vec![1850, 1940]);
        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1940"));
        assert_eq!(h.handle.snapshot().slider, SliderPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slider_value_is_clamped() {
        let h = start(ControllerSettings::default(), 1850);
        h.handle.send(Event::SliderMoved(3000));
        wait(300).await;
        assert_eq!(h.source.map_calls(), vec![1850, 2013]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_ticks_and_wraps() {
        let h = start(ControllerSettings::default(), 2012);
        wait(50).await;
        h.handle.send(Event::TogglePlay);
        wait(10).await;
        assert!(h.handle.snapshot().view.is_playing);

        // Ticks at +800ms and +1600ms after play
        wait(1700).await;
        assert_eq!(h.source.map_calls(), vec![2012, 2013, 1850]);
        assert_eq!(h.handle.snapshot().view.current_year, Year::MIN);
        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1850"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_pause_play_runs_single_timer() {
        let h = start(ControllerSettings::default(), 1900);
        wait(50).await;

        h.handle.send(Event::Play);
        wait(100).await;
        h.handle.send(Event::Pause);
        wait(100).await;
        assert!(!h.handle.snapshot().animation_running);
        h.handle.send(Event::Play);
        h.handle.send(Event::Play);
        wait(10).await;

        // 4 periods later: exactly 4 ticks from one timer
        wait(4 * 800).await;
        assert_eq!(h.source.map_calls(), vec![1900, 1901, 1902, 1903, 1904]);
        assert!(h.handle.snapshot().animation_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_when_stopped_is_noop() {
        let h = start(ControllerSettings::default(), 1900);
        h.handle.send(Event::Pause);
        h.handle.send(Event::Pause);
        wait(2000).await;
        assert_eq!(h.source.map_calls(), vec![1900]);
        assert!(!h.handle.snapshot().view.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_in_flight_fetch() {
        let h = start(ControllerSettings::default(), 1900);
        h.source.delay_year(1901, Duration::from_millis(500));
        wait(50).await;

        h.handle.send(Event::Play);
        wait(850).await;
        h.handle.send(Event::Pause);
        wait(1000).await;

        assert_eq!(h.source.map_calls(), vec![1900, 1901]);
        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1901"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drilldown_change_refreshes_immediately() {
        let h = start(ControllerSettings::default(), 1850);
        wait(50).await;
        h.handle.send(Event::DrilldownChanged(Drilldown::Recclass));
        wait(1).await;

        assert_eq!(
            h.source.calls(),
            vec![Call::Map(1850, Drilldown::Megaclass), Call::Map(1850, Drilldown::Recclass)]
        );
        assert_eq!(h.handle.snapshot().view.drilldown, Drilldown::Recclass);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heatmap_fetched_lazily_once() {
        let h = start(ControllerSettings::default(), 1850);
        wait(50).await;
        assert!(lock_board(&h.board).heatmap.is_none());

        h.handle.send(Event::SwitchTab(Tab::Heatmap));
        wait(50).await;
        h.handle.send(Event::SwitchTab(Tab::Animation));
        h.handle.send(Event::SwitchTab(Tab::Heatmap));
        wait(50).await;

        let heatmaps: Vec<Call> = h
            .source
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Heatmap(_)))
            .collect();
        assert_eq!(heatmaps, vec![Call::Heatmap(HeatmapGroup::Megaclass)]);
        assert_eq!(h.handle.snapshot().view.active_tab, Tab::Heatmap);

        h.handle.send(Event::HeatmapGroupChanged(HeatmapGroup::Superclass));
        wait(50).await;
        let board = lock_board(&h.board);
        let heatmap = board.heatmap.as_ref().unwrap();
        assert_eq!(heatmap.title, "Average Composition per Superclass");
        assert_eq!(heatmap.value(0, 1), Some(9.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_response_keeps_previous_chart() {
        let h = start(ControllerSettings::default(), 1850);
        h.handle.send(Event::SwitchTab(Tab::Heatmap));
        wait(50).await;
        let revision = lock_board(&h.board).revision;

        h.source.set_broken(true);
        h.handle.send(Event::DrilldownChanged(Drilldown::Superclass));
        h.handle.send(Event::HeatmapGroupChanged(HeatmapGroup::Superclass));
        wait(50).await;

        let board = lock_board(&h.board);
        assert_eq!(board.revision, revision);
        assert_eq!(board.map.as_ref().unwrap().title, "Meteorites in 1850");
        assert_eq!(
            board.heatmap.as_ref().unwrap().title,
            "Average Composition per Megaclass"
        );
        drop(board);
        assert!(matches!(h.handle.snapshot().status, Status::Failed { .. }));
        assert!(!h.task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ragged_arrays_from_source_keep_previous_chart() {
        let h = start(ControllerSettings::default(), 1850);
        wait(50).await;
        let revision = lock_board(&h.board).revision;

        h.source.set_ragged(true);
        h.handle.send(Event::DrilldownChanged(Drilldown::Recclass));
        wait(50).await;

        assert_eq!(lock_board(&h.board).revision, revision);
        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1850"));
        match h.handle.snapshot().status {
            Status::Failed { message } => assert!(message.contains("map_data"), "{}", message),
            other => panic!("expected failure status, got {:?}", other),
        }
        assert!(!h.task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_last_write_wins() {
        let h = start(ControllerSettings::default(), 1850);
        h.source.delay_year(1900, Duration::from_millis(500));
        wait(50).await;

        h.handle.send(Event::SliderMoved(1900));
        wait(150).await;
        h.handle.send(Event::SliderMoved(1950));
        wait(1000).await;

        // 1950 lands first, then the slow 1900 response overwrites it
        assert_eq!(h.source.map_calls(), vec![1850, 1900, 1950]);
        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1900"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_request_discards_stale_response() {
        let settings = ControllerSettings {
            ordering: ResponseOrdering::LatestRequest,
            ..Default::default()
        };
        let h = start(settings, 1850);
        h.source.delay_year(1900, Duration::from_millis(500));
        wait(50).await;

        h.handle.send(Event::SliderMoved(1900));
        wait(150).await;
        h.handle.send(Event::SliderMoved(1950));
        wait(1000).await;

        assert_eq!(map_title(&h.board).as_deref(), Some("Meteorites in 1950"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_in_flight() {
        let h = start(ControllerSettings::default(), 1850);
        h.source.delay_year(1850, Duration::from_millis(300));
        let Harness { board, handle, task, .. } = h;
        drop(handle);

        task.await.unwrap();
        assert!(lock_board(&board).map.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_playing_reports_paused() {
        let h = start(ControllerSettings::default(), 1850);
        h.handle.send(Event::Play);
        wait(50).await;
        assert!(h.handle.snapshot().view.is_playing);

        let Harness { handle, task, .. } = h;
        let snapshots = handle.subscribe();
        drop(handle);
        task.await.unwrap();

        let last = snapshots.borrow().clone();
        assert!(!last.view.is_playing);
        assert!(!last.animation_running);
    }
}
