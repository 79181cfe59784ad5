//! Properties over random operation sequences.

use std::collections::BTreeMap;

use proptest::prelude::*;

use learnchain_core::{Command, Event, PlatformError, SessionEngine, SessionId, SessionState};
use learnchain_testkit::fixtures::{
    engine_with_parties, fixture_policy, is_conserved, skill_draft, TestFixture, FIXTURE_START,
};
use learnchain_testkit::generators::{issuer, ops, ratings};

fn fresh_engine() -> SessionEngine {
    SessionEngine::new(issuer(), fixture_policy())
}

/// Full state fingerprint; equal before and after means nothing changed.
fn fingerprint(engine: &SessionEngine) -> String {
    format!("{:?}", engine)
}

fn average_after(ratings: &[u32]) -> (u32, u64) {
    let (mut engine, instructors, students) = engine_with_parties(ratings.len(), 10);
    let skill = engine
        .create_skill(instructors[0], skill_draft("Drawing", "Art", 10), FIXTURE_START)
        .unwrap()
        .output;
    for (student, rating) in students.iter().zip(ratings) {
        let session = engine.start_session(*student, skill, FIXTURE_START).unwrap().output;
        engine
            .complete_session(*student, session, 80, *rating, "", FIXTURE_START)
            .unwrap();
    }
    let skill = engine.skill(skill).unwrap();
    (skill.average_rating, skill.total_ratings)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_supply_conserved_and_failures_change_nothing(ops in ops(80)) {
        let mut engine = fresh_engine();
        for op in &ops {
            let before = fingerprint(&engine);
            let supply = engine.ledger().total_supply();

            match engine.execute(op.command(), FIXTURE_START) {
                Ok(Event::Minted { amount, .. }) => {
                    prop_assert_eq!(engine.ledger().total_supply(), supply + amount);
                }
                Ok(Event::SessionCompleted { reward, .. }) => {
                    prop_assert_eq!(engine.ledger().total_supply(), supply + reward);
                }
                Ok(_) => prop_assert_eq!(engine.ledger().total_supply(), supply),
                Err(_) => prop_assert_eq!(fingerprint(&engine), before),
            }
            prop_assert!(is_conserved(&engine));
        }
    }

    #[test]
    fn prop_sessions_settle_at_most_once(ops in ops(80)) {
        let mut engine = fresh_engine();
        let mut settlements: BTreeMap<SessionId, u32> = BTreeMap::new();

        for op in &ops {
            match engine.execute(op.command(), FIXTURE_START) {
                Ok(Event::SessionCompleted { session_id, .. })
                | Ok(Event::SessionCancelled { session_id, .. }) => {
                    *settlements.entry(session_id).or_default() += 1;
                }
                _ => {}
            }
        }
        prop_assert!(settlements.values().all(|&n| n == 1));

        let settled: Vec<_> = engine
            .sessions()
            .iter()
            .filter(|s| s.state.is_terminal())
            .map(|s| (s.id, s.student))
            .collect();
        prop_assert_eq!(settled.len(), settlements.len());

        for (session_id, student) in settled {
            let before = fingerprint(&engine);
            let again = engine.execute(
                Command::CompleteSession {
                    caller: student,
                    session_id,
                    assessment_score: 100,
                    rating: 500,
                    feedback: String::new(),
                },
                FIXTURE_START,
            );
            prop_assert!(
                matches!(again, Err(PlatformError::InvalidState { .. })),
                "second completion: {:?}",
                again
            );
            let cancel = engine.execute(
                Command::CancelSession { caller: student, session_id },
                FIXTURE_START,
            );
            prop_assert!(
                matches!(cancel, Err(PlatformError::InvalidState { .. })),
                "cancel after completion: {:?}",
                cancel
            );
            prop_assert_eq!(fingerprint(&engine), before);
        }
    }

    #[test]
    fn prop_start_then_cancel_restores_balance(
        price in 1u128..=1_000,
        extra in 0u128..=1_000,
        by_instructor in any::<bool>(),
    ) {
        let (mut engine, instructors, students) = engine_with_parties(1, price + extra);
        let (teacher, student) = (instructors[0], students[0]);
        let skill = engine
            .create_skill(teacher, skill_draft("Yoga", "Health", price), FIXTURE_START)
            .unwrap()
            .output;
        let before = engine.balance_of(&student);
        let supply = engine.ledger().total_supply();

        let session = engine.start_session(student, skill, FIXTURE_START).unwrap().output;
        prop_assert_eq!(engine.balance_of(&student), before - price);
        prop_assert_eq!(engine.total_escrowed(), price);

        let by = if by_instructor { teacher } else { student };
        let refund = engine.cancel_session(session, by, FIXTURE_START).unwrap().output;

        prop_assert_eq!(refund, price);
        prop_assert_eq!(engine.balance_of(&student), before);
        prop_assert_eq!(engine.balance_of(&teacher), 0);
        prop_assert_eq!(engine.total_escrowed(), 0);
        prop_assert_eq!(engine.ledger().total_supply(), supply);
        prop_assert_eq!(engine.session(session).unwrap().state, SessionState::Cancelled);
    }

    #[test]
    fn prop_average_rating_ignores_order(
        (submitted, shuffled) in ratings(12)
            .prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle()))
    ) {
        let sum: u64 = submitted.iter().map(|&r| u64::from(r)).sum();
        let expected = (sum / submitted.len() as u64) as u32;

        let (average, count) = average_after(&submitted);
        prop_assert_eq!(average, expected);
        prop_assert_eq!(count, submitted.len() as u64);
        prop_assert_eq!(average_after(&shuffled), (average, count));
    }
}

#[tokio::test]
async fn test_platform_conserves_through_lifecycle() -> anyhow::Result<()> {
    let fixture = TestFixture::new().await;
    let teacher = fixture.instructor("teacher").await;
    let student = fixture.student("student", 300).await;
    let skill = fixture.skill(teacher, 100).await;

    let first = fixture.platform.start_session(student, skill).await?;
    fixture.assert_conserved().await;
    let second = fixture.platform.start_session(student, skill).await?;
    fixture.clock.advance(60);
    fixture
        .platform
        .complete_session(student, first, 55, 320, "solid")
        .await?;
    fixture.platform.cancel_session(second, teacher).await?;
    fixture.assert_conserved().await;

    assert_eq!(fixture.platform.total_escrowed().await, 0);
    assert_eq!(fixture.platform.balance_of(&teacher).await, 100);
    // 300 - 100 paid + 1000 * 55 / 100 rewarded.
    assert_eq!(fixture.platform.balance_of(&student).await, 200 + 550);
    Ok(())
}
