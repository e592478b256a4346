//! Analytics event types, envelope schema, sinks and the injected handle.
//!
//! Core operations report what they did through [`Analytics::track`]. The
//! handle wraps each [`AnalyticsEvent`] in an [`EventEnvelope`] and passes it
//! to an [`AnalyticsSink`]. Dispatch is fire-and-forget: a disabled handle
//! drops events, and a failing sink is logged and otherwise ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ShelfConfig;
use crate::error::Result;
use crate::models::{Category, FilterSpec, Tool};

// ============================================================================
// Analytics Event (domain payloads)
// ============================================================================

/// Events emitted by the catalog, bookmark and search components.
///
/// Serialized as JSON with a `type` tag field, e.g.:
/// `{"type":"ToolSaved","tool_id":"vite","category":"frontend","is_free":true}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AnalyticsEvent {
    /// A tool was added to the bookmark set.
    ToolSaved {
        tool_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<Category>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_free: Option<bool>,
    },
    /// A tool was removed from the bookmark set.
    ToolUnsaved {
        tool_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<Category>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_free: Option<bool>,
    },
    /// Every bookmark was removed at once.
    BookmarksCleared { count: usize },
    /// Bookmark ids with no catalog entry were dropped.
    BookmarksPruned { count: usize },
    /// A free-text search ran.
    Search { query: String, result_count: usize },
    /// A filter specification with at least one active facet was applied.
    FilterApplied {
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<String>,
        categories: Vec<String>,
        tags: Vec<String>,
        free_only: bool,
        free_tier_only: bool,
        new_only: bool,
        featured_only: bool,
        sort_by: String,
        result_count: usize,
    },
    /// The recent-search list was emptied.
    RecentSearchesCleared { count: usize },
}

impl AnalyticsEvent {
    /// Bookmark toggle event, carrying category and pricing when the tool is known.
    pub fn bookmark(tool_id: &str, tool: Option<&Tool>, saved: bool) -> Self {
        let tool_id = tool_id.to_string();
        let category = tool.map(|t| t.category);
        let is_free = tool.map(|t| t.is_free);
        if saved {
            Self::ToolSaved {
                tool_id,
                category,
                is_free,
            }
        } else {
            Self::ToolUnsaved {
                tool_id,
                category,
                is_free,
            }
        }
    }

    /// Filter event describing every facet of `spec`.
    pub fn filter_applied(spec: &FilterSpec, result_count: usize) -> Self {
        Self::FilterApplied {
            query: spec.text_query().map(str::to_string),
            categories: spec.categories.iter().map(|c| c.to_string()).collect(),
            tags: spec.tags.iter().cloned().collect(),
            free_only: spec.free_only,
            free_tier_only: spec.free_tier_only,
            new_only: spec.new_only,
            featured_only: spec.featured_only,
            sort_by: spec.sort_by.to_string(),
            result_count,
        }
    }

    /// Event name as reported to the sink.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ToolSaved { .. } => "bookmark_add",
            Self::ToolUnsaved { .. } => "bookmark_remove",
            Self::BookmarksCleared { .. } => "bookmarks_clear",
            Self::BookmarksPruned { .. } => "bookmarks_prune",
            Self::Search { .. } => "search",
            Self::FilterApplied { .. } => "filter_apply",
            Self::RecentSearchesCleared { .. } => "recent_searches_clear",
        }
    }

    /// Flat parameter object of primitives.
    ///
    /// List-valued fields are comma-joined; the serde tag is dropped.
    pub fn params(&self) -> Map<String, JsonValue> {
        let mut map = match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };
        map.remove("type");
        for value in map.values_mut() {
            if let JsonValue::Array(items) = value {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                *value = JsonValue::String(joined);
            }
        }
        map
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned wrapper carrying delivery metadata around an [`AnalyticsEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Event name, see [`AnalyticsEvent::event_name`].
    pub event_name: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Browsing session the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Payload schema version.
    pub payload_version: u32,
    /// Domain-specific event data.
    pub payload: AnalyticsEvent,
}

impl EventEnvelope {
    /// Create an envelope with no session scope.
    pub fn new(event: AnalyticsEvent) -> Self {
        Self::with_session(event, None)
    }

    /// Create an envelope scoped to `session_id`.
    pub fn with_session(event: AnalyticsEvent, session_id: Option<String>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_name: event.event_name().to_string(),
            occurred_at: Utc::now(),
            session_id,
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for analytics events.
pub trait AnalyticsSink: Send + Sync {
    /// Deliver one event. Errors are reported but never fatal to the caller.
    fn record(&self, envelope: &EventEnvelope) -> Result<()>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn record(&self, _envelope: &EventEnvelope) -> Result<()> {
        Ok(())
    }
}

/// Sink that writes each event as one structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record(&self, envelope: &EventEnvelope) -> Result<()> {
        let params = serde_json::to_string(&envelope.payload.params())?;
        info!(
            subsystem = "analytics",
            event = %envelope.event_name,
            event_id = %envelope.event_id,
            session_id = envelope.session_id.as_deref().unwrap_or("-"),
            %params,
            "analytics event"
        );
        Ok(())
    }
}

/// Broadcast-based event bus distributing analytics events to subscribers.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Receivers
/// that fall behind get a `Lagged` error and miss events. Sending with no
/// subscribers silently drops the event.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to receive enveloped events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

impl AnalyticsSink for EventBus {
    fn record(&self, envelope: &EventEnvelope) -> Result<()> {
        debug!(
            event = %envelope.event_name,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope.clone());
        Ok(())
    }
}

// ============================================================================
// Analytics handle
// ============================================================================

/// Injected analytics handle.
///
/// Cheap to clone; every component that reports events holds one.
#[derive(Clone)]
pub struct Analytics {
    sink: Arc<dyn AnalyticsSink>,
    enabled: bool,
    session_id: Option<String>,
}

impl Analytics {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            sink,
            enabled: true,
            session_id: None,
        }
    }

    /// Handle honoring `config.analytics_enabled`.
    pub fn from_config(sink: Arc<dyn AnalyticsSink>, config: &ShelfConfig) -> Self {
        Self {
            enabled: config.analytics_enabled,
            ..Self::new(sink)
        }
    }

    /// Handle that drops every event.
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(NullSink),
            enabled: false,
            session_id: None,
        }
    }

    /// Attach a session id to every envelope produced by this handle.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report `event`. Never fails.
    pub fn track(&self, event: AnalyticsEvent) {
        if !self.enabled {
            return;
        }
        let envelope = EventEnvelope::with_session(event, self.session_id.clone());
        if let Err(e) = self.sink.record(&envelope) {
            warn!(
                event = %envelope.event_name,
                error = %e,
                "Analytics sink failed; event dropped"
            );
        }
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics")
            .field("enabled", &self.enabled)
            .field("session_id", &self.session_id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
