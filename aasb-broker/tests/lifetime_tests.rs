/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use aasb_broker::prelude::*;
use aasb_test::prelude::*;

use crate::setup::adapters::*;
use crate::setup::messages::*;
use crate::setup::*;

mod setup;

#[derive(Default)]
struct NavigationHandler {
    handled: AtomicUsize,
}

#[aasb_test]
async fn test_weak_subscription_does_not_keep_owner_alive() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = Broker::default();
    let handler = Arc::new(NavigationHandler::default());
    broker.subscribe_weak(
        &handler,
        NAVIGATION,
        "start_navigation",
        |handler: &NavigationHandler, _: &Message| {
            handler.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    )?;

    broker
        .publish(Message::call(NAVIGATION, "start_navigation", json!({})))?
        .send();
    assert_eq!(handler.handled.load(Ordering::SeqCst), 1);
    assert_eq!(Arc::strong_count(&handler), 1);

    let observer: Weak<NavigationHandler> = Arc::downgrade(&handler);
    drop(handler);
    assert!(observer.upgrade().is_none());

    broker
        .publish(Message::call(NAVIGATION, "start_navigation", json!({})))?
        .send();
    assert_eq!(broker.stats().orphaned_deliveries(), 1);
    assert_eq!(broker.stats().dispatch_failures(), 0);
    Ok(())
}

#[aasb_test]
async fn test_dropped_adapter_is_never_called() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = Broker::default();
    let controller = PhoneCallController::new("abc-123");
    controller.clone().initialize(&broker)?;
    assert_eq!(broker.subscriber_count(PHONE, "create_call_id"), 1);

    drop(controller);

    // the subscription outlives the adapter; deliveries are skipped
    broker.notify(&Dial {
        call_id: "abc-123".to_string(),
        callee: "555-0100".to_string(),
    })?;
    let result = broker.request(&CreateCallId {}).await?;

    assert_eq!(result.invalid_reason(), Some(InvalidReason::TimedOut));
    assert_eq!(broker.stats().orphaned_deliveries(), 2);
    assert_eq!(broker.stats().dispatch_failures(), 0);
    Ok(())
}

#[aasb_test]
async fn test_adapter_outliving_broker_fails_cleanly() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = Broker::default();
    let controller = PhoneCallController::new("abc-123");
    controller.clone().initialize(&broker)?;

    drop(broker);

    let error = controller
        .call_state_changed("abc-123", "IDLE")
        .expect_err("publishing without a broker should fail");
    assert!(error.to_string().contains("broker"));
    Ok(())
}

#[aasb_test]
async fn test_broker_is_not_kept_alive_by_weak_handles() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = Broker::default();
    let weak = broker.downgrade();
    let controller = PhoneCallController::new("abc-123");
    controller.clone().initialize(&broker)?;
    assert!(weak.upgrade().is_some());

    drop(broker);
    assert!(weak.upgrade().is_none());
    assert!(WeakBroker::default().upgrade().is_none());
    Ok(())
}
