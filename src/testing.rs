//! In-memory fakes for the upstream seams, shared by unit tests

use crate::geocoding::Geocoder;
use crate::llm::{ChatMessage, ChatSession, ModelReply};
use crate::models::{Place, WeatherReading};
use crate::search::{SearchHit, SearchProvider};
use crate::time::FixedClock;
use crate::tools::{FunctionDeclaration, Toolbox};
use crate::{AgentError, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn paris() -> Place {
    Place::new(48.85, 2.35, "Paris").with_timezone("Europe/Paris")
}

/// 2024-07-01 12:00:00 UTC
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()))
}

pub fn toolbox_with(
    geocoder: Arc<FakeGeocoder>,
    weather: Arc<FakeWeather>,
    search: Arc<FakeSearch>,
) -> Toolbox {
    Toolbox::from_parts(geocoder, weather, search, fixed_clock(), 3)
}

pub struct FakeGeocoder {
    outcome: std::result::Result<Option<Place>, String>,
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn found(place: Place) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(Some(place)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn not_found() -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn resolve(&self, _place_name: &str) -> Result<Option<Place>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(AgentError::api)
    }
}

pub struct FakeWeather {
    reading: Option<WeatherReading>,
    calls: AtomicUsize,
    last_coordinates: Mutex<Option<(f64, f64)>>,
}

impl FakeWeather {
    pub fn reading(reading: WeatherReading) -> Arc<Self> {
        Arc::new(Self {
            reading: Some(reading),
            calls: AtomicUsize::new(0),
            last_coordinates: Mutex::new(None),
        })
    }

    /// Behaves like a forecast body without a `current` block
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            reading: None,
            calls: AtomicUsize::new(0),
            last_coordinates: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_coordinates(&self) -> Option<(f64, f64)> {
        *self.last_coordinates.lock().unwrap()
    }
}

#[async_trait]
impl crate::weather::CurrentWeatherSource for FakeWeather {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<Option<WeatherReading>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coordinates.lock().unwrap() = Some((latitude, longitude));
        Ok(self.reading.clone())
    }
}

pub struct FakeSearch {
    outcome: std::result::Result<Vec<SearchHit>, String>,
    last_request: Mutex<Option<(String, usize)>>,
}

impl FakeSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(hits),
            last_request: Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            last_request: Mutex::new(None),
        })
    }

    pub fn last_request(&self) -> Option<(String, usize)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        *self.last_request.lock().unwrap() = Some((query.to_string(), max_results));
        self.outcome.clone().map_err(AgentError::api)
    }
}

/// Chat session replaying canned model replies and recording what was sent
#[derive(Default)]
pub struct ScriptedSession {
    replies: VecDeque<Result<ModelReply>>,
    pub sent: Vec<ChatMessage>,
    pub declared_tools: Vec<String>,
    /// Checkpoints passed to `rollback`, in call order
    pub rollbacks: Vec<usize>,
}

impl ScriptedSession {
    pub fn new(replies: impl IntoIterator<Item = Result<ModelReply>>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ChatSession for ScriptedSession {
    fn set_tools(&mut self, declarations: Vec<FunctionDeclaration>) {
        self.declared_tools = declarations.into_iter().map(|d| d.name).collect();
    }

    async fn send(&mut self, message: ChatMessage) -> Result<ModelReply> {
        self.sent.push(message);
        self.replies
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::llm("script exhausted")))
    }

    fn checkpoint(&self) -> usize {
        self.sent.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        self.rollbacks.push(checkpoint);
    }
}
