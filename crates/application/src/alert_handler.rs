use std::sync::Arc;

use domain::alert::entity::AlertEvent;
use domain::alert::error::AlertError;
use domain::query::Query;
use domain::record::{ALERT_UUID, CollectedEvent, Record, now_millis};
use domain::rule::{Rule, parse_period};
use ports::secondary::alert_dispatcher::AlertDispatcher;
use ports::secondary::record_store::RecordStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TOPIC_PREFIX: &str = "vigil/alert";

/// Alert handler application service.
///
/// Stores every collected event as a record and checks each rule
/// against the accumulated store. Dedup and sustain state lives
/// entirely in the store as flagged records, so the handler itself is
/// stateless between events:
///
/// - one-shot rules fire once per matching record and remove it;
/// - recoverable rules fire on the first match, keep a single flagged
///   record pending, and fire a back-to-normal alert once a followup
///   record stops matching;
/// - period rules keep a flagged record pending and fire only if a
///   followup still matches after the period has elapsed since the
///   pending record's timestamp.
pub struct AlertHandler {
    rules: Vec<Rule>,
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    topic_prefix: String,
}

impl AlertHandler {
    pub fn new(
        rules: Vec<Rule>,
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Self {
        Self {
            rules,
            store,
            dispatcher,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }

    /// Override the topic prefix used for dispatched alerts.
    #[must_use]
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Process one collected event. Failures are logged, never
    /// propagated: a broken rule or store error must not take the
    /// handler down.
    pub fn handle_event(&self, event: &CollectedEvent) {
        if let Err(error) = self.evaluate(event) {
            tracing::error!(topic = %event.topic, %error, "cannot process alerting for event");
        }
    }

    fn evaluate(&self, event: &CollectedEvent) -> Result<(), AlertError> {
        let uuid = self.store.store(Record::from_event(event))?;
        for rule in &self.rules {
            let condition = Query::parse(&rule.condition)?;
            if rule.period.is_some() {
                self.check_period_rule(rule, &condition, &uuid)?;
            } else if rule.recoverable {
                self.check_recoverable_rule(rule, &condition, &uuid)?;
            } else {
                self.check_one_shot_rule(rule, &condition)?;
            }
        }
        self.store.eviction()
    }

    /// One-shot rule: every record matching the condition fires an
    /// alert and is removed.
    fn check_one_shot_rule(&self, rule: &Rule, condition: &Query) -> Result<(), AlertError> {
        for record in self.store.query(condition)? {
            self.post(&record, rule, false)?;
            if let Some(id) = record.uuid() {
                self.store.delete(&Query::term(ALERT_UUID, id))?;
            }
        }
        Ok(())
    }

    /// Period rule: a single pending record means the condition was
    /// already seen. If the incoming record still matches and the
    /// pending record is older than the period, the alert fires.
    /// Otherwise the condition lapsed and the pending state is dropped
    /// silently. With no pending record, a matching incoming record is
    /// flagged to start the period.
    fn check_period_rule(
        &self,
        rule: &Rule,
        condition: &Query,
        uuid: &str,
    ) -> Result<(), AlertError> {
        let threshold = now_millis() - parse_period(rule.period.as_deref())?;
        let new_record = Query::term(ALERT_UUID, uuid);
        let known = self
            .store
            .query(&condition.clone().and(Query::not(new_record.clone())))?;
        if known.len() == 1 {
            let recovered = self
                .store
                .query(&new_record.clone().and(Query::not(condition.clone())))?;
            if recovered.len() != 1
                && known[0].timestamp_millis().is_some_and(|ts| ts < threshold)
            {
                // held for the whole period
                self.post(&known[0], rule, false)?;
                self.store.delete(condition)?;
            }
            self.store.delete(&new_record)?;
        } else {
            let to_flag = self.store.query(&new_record.clone().and(condition.clone()))?;
            if to_flag.len() == 1 {
                self.store.flag(&new_record, &rule.name)?;
            }
        }
        Ok(())
    }

    /// Recoverable rule: the first matching record fires immediately
    /// and stays flagged. A later record that no longer matches fires
    /// a back-to-normal alert and clears the pending state.
    fn check_recoverable_rule(
        &self,
        rule: &Rule,
        condition: &Query,
        uuid: &str,
    ) -> Result<(), AlertError> {
        let new_record = Query::term(ALERT_UUID, uuid);
        let known = self
            .store
            .query(&condition.clone().and(Query::not(new_record.clone())))?;
        if known.len() == 1 {
            let recovered = self
                .store
                .query(&new_record.clone().and(Query::not(condition.clone())))?;
            if recovered.len() == 1 {
                self.post(&recovered[0], rule, true)?;
                self.store.delete(condition)?;
            }
            self.store.delete(&new_record)?;
        } else {
            let to_send = self.store.query(&new_record.clone().and(condition.clone()))?;
            if to_send.len() == 1 {
                self.store.flag(&new_record, &rule.name)?;
                self.post(&to_send[0], rule, false)?;
            }
        }
        Ok(())
    }

    fn post(&self, record: &Record, rule: &Rule, back_to_normal: bool) -> Result<(), AlertError> {
        self.dispatcher
            .post(&AlertEvent::from_record(record, rule, back_to_normal, &self.topic_prefix))
    }

    /// Async run loop: consumes collected events from the channel,
    /// processes each one, and drains on cancellation.
    pub async fn run(self, mut rx: mpsc::Receiver<CollectedEvent>, cancel_token: CancellationToken) {
        let mut count: u64 = 0;

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    // Drain remaining events before exiting
                    while let Ok(event) = rx.try_recv() {
                        count += 1;
                        self.handle_event(&event);
                    }
                    break;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(event) => {
                            count += 1;
                            self.handle_event(&event);
                        }
                        None => break, // channel closed
                    }
                }
            }
        }

        tracing::info!(total_events = count, "alert handler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::storage::MemoryRecordStore;
    use domain::alert::entity::{ALERT_BACK_TO_NORMAL, ALERT_LEVEL, ALERT_PATTERN};
    use domain::record::{ALERT_TIMESTAMP, FieldValue};
    use domain::rule::load;
    use ports::test_utils::RecordingDispatcher;
    use std::collections::BTreeMap;

    fn make_handler(
        rules: Vec<Rule>,
    ) -> (AlertHandler, Arc<MemoryRecordStore>, Arc<RecordingDispatcher>) {
        let store = Arc::new(MemoryRecordStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let handler = AlertHandler::new(
            rules,
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&dispatcher) as Arc<dyn AlertDispatcher>,
        );
        (handler, store, dispatcher)
    }

    fn event(field: &str, value: impl Into<FieldValue>) -> CollectedEvent {
        CollectedEvent::new("collected").with_property(field, value)
    }

    #[test]
    fn one_shot_recoverable_and_period_rules_share_one_store() {
        let mut configuration = BTreeMap::new();
        configuration.insert(
            "rule.first".to_string(),
            r#"{"condition":"message:*"}"#.to_string(),
        );
        configuration.insert(
            "rule.second".to_string(),
            r#"{"condition":"counter:[100 TO *]","recoverable":true}"#.to_string(),
        );
        configuration.insert(
            "rule.three".to_string(),
            r#"{"condition":"other:[100 TO *]","period":"5SECONDS"}"#.to_string(),
        );
        let (handler, store, dispatcher) = make_handler(load(&configuration));

        // one-shot
        handler.handle_event(&event("message", "first"));

        let posted = dispatcher.events();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].properties.get(ALERT_LEVEL),
            Some(&FieldValue::Str("WARN".to_string()))
        );
        assert!(posted[0].properties.timestamp_millis().unwrap() > 0);
        assert_eq!(
            posted[0].properties.get(ALERT_PATTERN),
            Some(&FieldValue::Str("message:*".to_string()))
        );
        assert_eq!(
            posted[0].properties.get("message"),
            Some(&FieldValue::Str("first".to_string()))
        );
        assert_eq!(store.list().unwrap().len(), 0);

        handler.handle_event(&event("foo", "bar"));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(store.list().unwrap().len(), 0);

        dispatcher.clear();

        // recoverable
        handler.handle_event(&event("counter", 50));
        assert_eq!(dispatcher.len(), 0);
        assert_eq!(store.list().unwrap().len(), 0);

        handler.handle_event(&event("counter", 110));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(store.list().unwrap().len(), 1);

        handler.handle_event(&event("counter", 120));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(store.list().unwrap().len(), 1);

        handler.handle_event(&event("counter", 10));
        let posted = dispatcher.events();
        assert_eq!(posted.len(), 2);
        assert_eq!(store.list().unwrap().len(), 0);
        assert_eq!(
            posted[1].properties.get(ALERT_BACK_TO_NORMAL),
            Some(&FieldValue::Bool(true))
        );

        dispatcher.clear();

        // period
        handler.handle_event(&event("other", 10));
        assert_eq!(dispatcher.len(), 0);
        assert_eq!(store.list().unwrap().len(), 0);

        let backdated = event("other", 110)
            .with_property(ALERT_TIMESTAMP, now_millis() - 5 * 60 * 1000);
        handler.handle_event(&backdated);
        handler.handle_event(&event("other", 120));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(store.list().unwrap().len(), 0);
    }

    #[test]
    fn one_shot_rule_fires_once_per_matching_record() {
        let (handler, store, dispatcher) =
            make_handler(vec![Rule::new("disk", "message:*").with_level("ERROR")]);

        handler.handle_event(&event("message", "disk full"));

        let posted = dispatcher.events();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].topic, "vigil/alert/ERROR");
        assert!(!posted[0].is_back_to_normal());
        assert_eq!(store.list().unwrap().len(), 0);

        // same event again fires again: no dedup for one-shot rules
        handler.handle_event(&event("message", "disk full"));
        assert_eq!(dispatcher.len(), 2);
    }

    #[test]
    fn recoverable_rule_fires_once_while_condition_holds() {
        let (handler, store, dispatcher) = make_handler(vec![
            Rule::new("overload", "counter:[100 TO *]").recoverable(),
        ]);

        handler.handle_event(&event("counter", 150));
        assert_eq!(dispatcher.len(), 1);

        // still matching: pending record suppresses re-fire
        handler.handle_event(&event("counter", 180));
        handler.handle_event(&event("counter", 200));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(store.list().unwrap().len(), 1);

        handler.handle_event(&event("counter", 20));
        let posted = dispatcher.events();
        assert_eq!(posted.len(), 2);
        assert!(posted[1].is_back_to_normal());
        assert_eq!(store.list().unwrap().len(), 0);
    }

    #[test]
    fn period_rule_stays_silent_until_period_elapsed() {
        let (handler, _store, dispatcher) = make_handler(vec![
            Rule::new("sustained", "load:[90 TO *]").with_period("5MINUTES"),
        ]);

        handler.handle_event(&event("load", 95));
        handler.handle_event(&event("load", 96));
        handler.handle_event(&event("load", 97));
        assert_eq!(dispatcher.len(), 0);
    }

    #[test]
    fn period_rule_fires_after_period_elapsed() {
        let (handler, store, dispatcher) = make_handler(vec![
            Rule::new("sustained", "load:[90 TO *]").with_period("5MINUTES"),
        ]);

        let backdated =
            event("load", 95).with_property(ALERT_TIMESTAMP, now_millis() - 6 * 60 * 1000);
        handler.handle_event(&backdated);
        assert_eq!(dispatcher.len(), 0);

        handler.handle_event(&event("load", 96));
        let posted = dispatcher.events();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].properties.get("load"),
            Some(&FieldValue::Int(95))
        );
        assert_eq!(store.list().unwrap().len(), 0);
    }

    #[test]
    fn period_rule_resets_when_condition_lapses() {
        let (handler, store, dispatcher) = make_handler(vec![
            Rule::new("sustained", "load:[90 TO *]").with_period("5MINUTES"),
        ]);

        let backdated =
            event("load", 95).with_property(ALERT_TIMESTAMP, now_millis() - 6 * 60 * 1000);
        handler.handle_event(&backdated);

        // condition no longer holds: pending state dropped, no alert
        handler.handle_event(&event("load", 10));
        assert_eq!(dispatcher.len(), 0);
        assert_eq!(store.list().unwrap().len(), 0);
    }

    #[test]
    fn broken_rule_does_not_stop_processing() {
        let (handler, store, dispatcher) = make_handler(vec![
            Rule::new("broken", "load:[90 TO"),
            Rule::new("ok", "message:*"),
        ]);

        handler.handle_event(&event("message", "hello"));

        // the malformed condition aborts this event's evaluation but
        // must not panic; the record stays until the next eviction
        assert_eq!(dispatcher.len(), 0);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn alert_topic_uses_configured_prefix() {
        let store = Arc::new(MemoryRecordStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let handler = AlertHandler::new(
            vec![Rule::new("any", "message:*").with_level("CRITICAL")],
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&dispatcher) as Arc<dyn AlertDispatcher>,
        )
        .with_topic_prefix("custom/alerts");

        handler.handle_event(&event("message", "x"));
        assert_eq!(dispatcher.events()[0].topic, "custom/alerts/CRITICAL");
    }

    #[tokio::test]
    async fn run_drains_on_cancellation() {
        let (handler, _store, dispatcher) = make_handler(vec![Rule::new("any", "message:*")]);
        let dispatcher_ref = Arc::clone(&dispatcher);

        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        tx.send(event("message", "queued")).await.unwrap();
        cancel.cancel();

        handler.run(rx, cancel).await;

        assert_eq!(dispatcher_ref.len(), 1);
    }

    #[tokio::test]
    async fn run_exits_on_channel_close() {
        let (handler, _store, _dispatcher) = make_handler(vec![]);

        let (tx, rx) = mpsc::channel::<CollectedEvent>(4);
        let cancel = CancellationToken::new();
        drop(tx);

        handler.run(rx, cancel).await;
    }
}
