//! Subscription registry and change-detection fan-out
//!
//! The push transport is an external collaborator: it registers an outbound
//! channel per connection and feeds client messages in as `ClientEvent`s. The
//! hub keeps the per-connection state machine in one dispatch function and
//! diffs every published record against the last broadcast state to raise
//! price-change and volume-spike signals.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    constants::{PRICE_CHANGE_THRESHOLD_PCT, VOLUME_SPIKE_THRESHOLD_PCT},
    store::LastSeenStore,
    types::{TokenEvent, TokenRecord},
};

/// Messages a connected client can send
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Add token addresses to the connection's subscription set
    Subscribe { addresses: Vec<String> },
    /// Remove token addresses from the connection's subscription set
    Unsubscribe { addresses: Vec<String> },
    /// Terminal: discard the connection's subscription state
    Disconnect,
}

struct Connection {
    subscriptions: HashSet<String>,
    outbound: UnboundedSender<TokenEvent>,
}

/// Per-connection subscriptions plus the broadcast fan-out path.
///
/// Delivery is a non-blocking unbounded-channel send: one slow or vanished
/// consumer never delays other connections or the publisher. A disconnect
/// removes the subscription entry immediately; events already sent are not
/// recalled.
pub struct SubscriptionHub {
    connections: RwLock<HashMap<Uuid, Connection>>,
    last_seen: LastSeenStore,
}

impl SubscriptionHub {
    /// Creates a hub with no connections
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            last_seen: LastSeenStore::new(),
        }
    }

    /// Registers a new connection and returns its identifier.
    ///
    /// Events for subscribed tokens are delivered through `outbound`.
    pub async fn connect(&self, outbound: UnboundedSender<TokenEvent>) -> Uuid {
        let id = Uuid::new_v4();
        let mut connections = self.connections.write().await;
        connections.insert(
            id,
            Connection {
                subscriptions: HashSet::new(),
                outbound,
            },
        );
        info!(connection = %id, "client connected");
        id
    }

    /// Applies one client message to the connection's state.
    ///
    /// Subscribe and unsubscribe are idempotent; events for unknown
    /// connections are ignored.
    pub async fn dispatch(&self, id: Uuid, event: ClientEvent) {
        let mut connections = self.connections.write().await;

        match event {
            ClientEvent::Subscribe { addresses } => {
                if let Some(conn) = connections.get_mut(&id) {
                    debug!(connection = %id, count = addresses.len(), "subscribe");
                    conn.subscriptions.extend(addresses);
                }
            }
            ClientEvent::Unsubscribe { addresses } => {
                if let Some(conn) = connections.get_mut(&id) {
                    debug!(connection = %id, count = addresses.len(), "unsubscribe");
                    for address in &addresses {
                        conn.subscriptions.remove(address);
                    }
                }
            }
            ClientEvent::Disconnect => {
                connections.remove(&id);
                info!(connection = %id, "client disconnected");
            }
        }
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Publishes a fresh merged record to every interested connection.
    ///
    /// The first sighting of an address stores state and sends the raw update
    /// only; later sightings also raise threshold signals computed against
    /// the previous broadcast, then supersede it.
    pub async fn publish(&self, record: &TokenRecord) {
        let previous = self.last_seen.swap(record.clone()).await;

        let mut events = vec![TokenEvent::Update {
            address: record.address.clone(),
            data: record.clone(),
        }];

        if let Some(old) = previous {
            let price_change = price_change_pct(&old, record);
            if price_change.abs() > PRICE_CHANGE_THRESHOLD_PCT {
                events.push(TokenEvent::PriceChange {
                    address: record.address.clone(),
                    change: price_change,
                });
            }

            if volume_increase_pct(&old, record) > VOLUME_SPIKE_THRESHOLD_PCT {
                events.push(TokenEvent::VolumeSpike {
                    address: record.address.clone(),
                    volume: record.volume_sol,
                });
            }
        }

        let mut dead = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, conn) in connections.iter() {
                if !conn.subscriptions.contains(&record.address) {
                    continue;
                }
                for event in &events {
                    if conn.outbound.send(event.clone()).is_err() {
                        dead.push(*id);
                        break;
                    }
                }
            }
        }

        // Receivers that vanished without a disconnect message
        if !dead.is_empty() {
            let mut connections = self.connections.write().await;
            for id in dead {
                debug!(connection = %id, "dropping connection with closed channel");
                connections.remove(&id);
            }
        }
    }

    /// Publishes each record in turn
    pub async fn publish_all(&self, records: &[TokenRecord]) {
        for record in records {
            self.publish(record).await;
        }
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Price change percentage between consecutive observations (0 when the old
/// price is 0)
fn price_change_pct(old: &TokenRecord, new: &TokenRecord) -> f64 {
    if old.price_sol == 0.0 {
        return 0.0;
    }
    (new.price_sol - old.price_sol) / old.price_sol * 100.0
}

/// Volume increase percentage between consecutive observations (0 when the
/// old volume is 0)
fn volume_increase_pct(old: &TokenRecord, new: &TokenRecord) -> f64 {
    if old.volume_sol == 0.0 {
        return 0.0;
    }
    (new.volume_sol - old.volume_sol) / old.volume_sol * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::test_record;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn record(address: &str, price: f64, volume: f64) -> TokenRecord {
        let mut r = test_record(address, "dexscreener");
        r.price_sol = price;
        r.volume_sol = volume;
        r
    }

    fn drain(rx: &mut UnboundedReceiver<TokenEvent>) -> Vec<TokenEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn subscribed_connection(
        hub: &SubscriptionHub,
        address: &str,
    ) -> (Uuid, UnboundedReceiver<TokenEvent>) {
        let (tx, rx) = unbounded_channel();
        let id = hub.connect(tx).await;
        hub.dispatch(
            id,
            ClientEvent::Subscribe {
                addresses: vec![address.to_string()],
            },
        )
        .await;
        (id, rx)
    }

    #[tokio::test]
    async fn first_sighting_emits_update_only() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "update");
    }

    #[tokio::test]
    async fn six_percent_move_emits_price_change() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        drain(&mut rx);

        hub.publish(&record("addr1", 106.0, 1000.0)).await;

        let events = drain(&mut rx);
        let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["update", "price-change"]);
        match &events[1] {
            TokenEvent::PriceChange { change, .. } => assert!((change - 6.0).abs() < 1e-9),
            other => panic!("expected price-change, got {}", other),
        }
    }

    #[tokio::test]
    async fn three_percent_move_emits_update_only() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        drain(&mut rx);

        hub.publish(&record("addr1", 103.0, 1000.0)).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "update");
    }

    #[tokio::test]
    async fn negative_move_past_threshold_emits_price_change() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        drain(&mut rx);

        hub.publish(&record("addr1", 90.0, 1000.0)).await;

        let kinds: Vec<&str> = drain(&mut rx).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["update", "price-change"]);
    }

    #[tokio::test]
    async fn zero_base_price_never_signals_change() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 0.0, 1000.0)).await;
        drain(&mut rx);

        hub.publish(&record("addr1", 5.0, 1000.0)).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "update");
    }

    #[tokio::test]
    async fn volume_spike_fires_above_threshold_only() {
        let hub = SubscriptionHub::new();
        let (_id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        drain(&mut rx);

        // Exactly +50% is not a spike
        hub.publish(&record("addr1", 100.0, 1500.0)).await;
        let kinds: Vec<&str> = drain(&mut rx).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["update"]);

        hub.publish(&record("addr1", 100.0, 2300.0)).await;
        let kinds: Vec<&str> = drain(&mut rx).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["update", "volume-spike"]);
    }

    #[tokio::test]
    async fn unsubscribed_connections_receive_nothing() {
        let hub = SubscriptionHub::new();
        let (tx, mut rx) = unbounded_channel();
        hub.connect(tx).await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let hub = SubscriptionHub::new();
        let (id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.dispatch(
            id,
            ClientEvent::Unsubscribe {
                addresses: vec!["addr1".to_string()],
            },
        )
        .await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        assert!(drain(&mut rx).is_empty());

        // Unsubscribing again is a no-op
        hub.dispatch(
            id,
            ClientEvent::Unsubscribe {
                addresses: vec!["addr1".to_string()],
            },
        )
        .await;
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn disconnect_discards_subscription_state() {
        let hub = SubscriptionHub::new();
        let (id, mut rx) = subscribed_connection(&hub, "addr1").await;

        hub.dispatch(id, ClientEvent::Disconnect).await;
        assert_eq!(hub.connection_count().await, 0);

        hub.publish(&record("addr1", 100.0, 1000.0)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_block_other_connections() {
        let hub = SubscriptionHub::new();

        let (dead_id, dead_rx) = subscribed_connection(&hub, "addr1").await;
        drop(dead_rx);
        let (_live_id, mut live_rx) = subscribed_connection(&hub, "addr1").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;

        let events = drain(&mut live_rx);
        assert_eq!(events.len(), 1);

        // Vanished receiver was pruned
        let connections = hub.connections.read().await;
        assert!(!connections.contains_key(&dead_id));
    }

    #[tokio::test]
    async fn only_matching_subscribers_get_events() {
        let hub = SubscriptionHub::new();
        let (_a, mut rx_a) = subscribed_connection(&hub, "addr1").await;
        let (_b, mut rx_b) = subscribed_connection(&hub, "addr2").await;

        hub.publish(&record("addr1", 100.0, 1000.0)).await;

        assert_eq!(drain(&mut rx_a).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
    }
}
