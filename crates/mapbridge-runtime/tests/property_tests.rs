//! Property tests over arbitrary connect/disconnect sequences

use std::sync::atomic::Ordering;

use mapbridge_harness::{ConnectFailure, MockSetup};
use mapbridge_runtime::{ConnectionState, SessionCoordinator};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Step {
    Connect,
    ConnectUnavailable,
    ConnectFault,
    Disconnect,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Connect),
        2 => Just(Step::ConnectUnavailable),
        1 => Just(Step::ConnectFault),
        3 => Just(Step::Disconnect),
    ]
}

fn run_steps(steps: &[Step]) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");

    runtime.block_on(async {
        let setup = MockSetup::new();
        let coordinator = SessionCoordinator::new(
            setup.device.device_id(),
            setup.device.session_factory(),
            setup.server.clone(),
            setup.sink.clone(),
        );

        for step in steps {
            match step {
                Step::Connect => {
                    let _ = coordinator.connect().await;
                }
                Step::ConnectUnavailable => {
                    setup.device.fail_next_connect(ConnectFailure::Unavailable);
                    let _ = coordinator.connect().await;
                }
                Step::ConnectFault => {
                    setup.device.fail_next_connect(ConnectFailure::Handshake);
                    let _ = coordinator.connect().await;
                }
                Step::Disconnect => {
                    prop_assert!(coordinator.disconnect().await.is_ok());
                }
            }

            let live = setup.device.stats().sessions_live.load(Ordering::SeqCst);
            let connected = coordinator.state().await == ConnectionState::Connected;
            prop_assert_eq!(live, u64::from(connected));
        }

        prop_assert!(setup.device.stats().max_sessions_live.load(Ordering::SeqCst) <= 1);
        prop_assert!(setup.server.stats().start_calls.load(Ordering::SeqCst) <= 1);

        coordinator.dispose().await;
        coordinator.dispose().await;
        prop_assert_eq!(setup.device.stats().sessions_live.load(Ordering::SeqCst), 0);
        prop_assert_eq!(coordinator.state().await, ConnectionState::Disposed);
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_at_most_one_outbound_session(steps in prop::collection::vec(step(), 1..24)) {
        run_steps(&steps)?;
    }
}
