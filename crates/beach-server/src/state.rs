use anyhow::Result;
use beach::adapters::{DataSources, GooglePlacesClient, NoaaTidesClient, NwsWeatherClient};
use beach::agent::BeachAgent;
use beach::intent::IntentClassifier;
use beach::providers::factory;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::configuration::{AppSettings, Settings};

/// Builds the agent for a new conversation
pub type AgentFactory = Arc<dyn Fn() -> Result<BeachAgent> + Send + Sync>;

/// How many conversations are kept and for how long they may sit idle
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

struct Session {
    agent: Arc<Mutex<BeachAgent>>,
    last_used: Instant,
}

/// Shared application state
///
/// Each conversation owns one agent behind its own lock, so turns within a
/// session run one at a time while different sessions proceed concurrently.
/// Idle conversations are dropped when a new one starts, and the oldest is
/// evicted once the registry is full.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<AppSettings>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    factory: AgentFactory,
    limits: SessionLimits,
}

impl AppState {
    pub fn new(app: AppSettings, factory: AgentFactory, limits: SessionLimits) -> Self {
        Self {
            app: Arc::new(app),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            factory,
            limits,
        }
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        let provider = factory::get_provider(settings.provider)?;

        let mut sources = DataSources::default()
            .with_tides(Arc::new(NoaaTidesClient::new(settings.noaa.into_config())?))
            .with_weather(Arc::new(NwsWeatherClient::new(settings.nws.into_config())?));
        match settings.places.into_config() {
            Some(places) => {
                sources = sources.with_places(Arc::new(GooglePlacesClient::new(places)?));
            }
            None => tracing::warn!("No Places API key configured, amenity search is disabled"),
        }

        let capacity = settings.agent.max_memory;
        let last_word_fallback = settings.agent.last_word_fallback;
        let factory: AgentFactory = Arc::new(move || {
            let classifier = IntentClassifier::default().with_last_word_fallback(last_word_fallback);
            Ok(BeachAgent::with_capacity(provider.clone(), sources.clone(), capacity)?
                .with_classifier(classifier))
        });

        Ok(Self::new(settings.app, factory, settings.sessions.limits()))
    }

    /// The conversation with the given id, created if it does not exist yet.
    /// Without an id a new conversation is started under a fresh uuid.
    pub async fn session(&self, id: Option<String>) -> Result<(String, Arc<Mutex<BeachAgent>>)> {
        let id = id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        if let Some(session) = sessions.get_mut(&id) {
            session.last_used = now;
            return Ok((id, session.agent.clone()));
        }

        self.evict(&mut sessions, now);
        let agent = Arc::new(Mutex::new((self.factory)()?));
        sessions.insert(
            id.clone(),
            Session {
                agent: agent.clone(),
                last_used: now,
            },
        );
        tracing::info!(session_id = %id, active = sessions.len(), "started conversation");
        Ok((id, agent))
    }

    /// Make room for one more conversation
    fn evict(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, session| now.duration_since(session.last_used) < self.limits.idle_timeout);

        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }

        if sessions.len() < before {
            tracing::debug!(evicted = before - sessions.len(), "dropped idle conversations");
        }
    }

    /// End a conversation. False when the session is unknown.
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "ended conversation");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
