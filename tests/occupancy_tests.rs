mod common;

use chrono::{Duration, Utc};
use labtrack::domain::{MachineState, Role};
use labtrack::services::{OccupancyError, UsageRequest};

use common::{seed_machine, seed_user, test_state};

const IP: &str = "10.0.0.5";

fn usage(project: &str, hours: f64) -> UsageRequest {
    UsageRequest::new(project, hours)
}

#[tokio::test]
async fn book_then_release_returns_machine_to_free_with_one_log() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    seed_machine(&state, IP).await;

    let machine = state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    assert!(machine.state.is_held_by(&alice.email));

    let summary = state.occupancy.release_primary(&alice, IP).await.unwrap();
    assert!(summary.machine_freed);
    assert!(!summary.log.is_contribution);
    assert_eq!(summary.log.identity, alice.email);
    assert_eq!(summary.log.project, "proj-x");
    assert!(summary.log.main_occupant.is_none());

    let machine = state.occupancy.machine_state(IP).await.unwrap();
    assert_eq!(machine.state, MachineState::Free);
    assert_eq!(state.store.usage_log_count().await.unwrap(), 1);
}

#[tokio::test]
async fn shared_machine_lifecycle() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    assert!(state.occupancy.contributions_for(IP).await.unwrap().is_empty());

    let contribution = state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();
    assert_eq!(contribution.main_occupant, alice.email);
    assert_eq!(contribution.contributor, bob.email);

    let summary = state.occupancy.release_primary(&alice, IP).await.unwrap();
    assert!(!summary.machine_freed);
    assert_eq!(state.store.usage_log_count().await.unwrap(), 1);

    let machine = state.occupancy.machine_state(IP).await.unwrap();
    let occupancy = machine.state.occupancy().expect("still occupied");
    assert_eq!(occupancy.occupant, alice.email);
    assert!(occupancy.main_released);
    let contributors = state.occupancy.contributions_for(IP).await.unwrap();
    assert_eq!(contributors.len(), 1);
    assert_eq!(contributors[0].contributor, bob.email);

    let summary = state
        .occupancy
        .release_contribution(&bob, IP)
        .await
        .unwrap();
    assert!(summary.machine_freed);
    assert!(summary.log.is_contribution);
    assert_eq!(summary.log.main_occupant.as_deref(), Some(alice.email.as_str()));

    let machine = state.occupancy.machine_state(IP).await.unwrap();
    assert_eq!(machine.state, MachineState::Free);

    let logs = state.store.usage_logs_for_ip(IP).await.unwrap();
    let identities: Vec<_> = logs.iter().map(|l| l.identity.as_str()).collect();
    assert_eq!(identities, ["alice@example.com", "bob@example.com"]);
    assert_eq!(state.store.usage_log_count().await.unwrap(), 2);
}

#[tokio::test]
async fn contributor_leaving_keeps_active_primary() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();

    let summary = state
        .occupancy
        .release_contribution(&bob, IP)
        .await
        .unwrap();
    assert!(!summary.machine_freed);

    let machine = state.occupancy.machine_state(IP).await.unwrap();
    assert!(machine.state.is_held_by(&alice.email));
}

#[tokio::test]
async fn contributing_to_free_machine_fails_without_writing() {
    let state = test_state().await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    let err = state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");

    let err = state
        .occupancy
        .self_contribute(&bob, "10.0.0.99", usage("proj-y", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");

    assert!(state.store.all_contributions().await.unwrap().is_empty());
    assert_eq!(
        state.occupancy.machine_state(IP).await.unwrap().state,
        MachineState::Free
    );
}

#[tokio::test]
async fn duplicate_self_contribution_is_rejected() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();

    let err = state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-z", 3.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Conflict(_)), "{err:?}");
    assert_eq!(state.occupancy.contributions_for(IP).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_contributions_by_same_identity_leave_one_row() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;
    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        state.occupancy.self_contribute(&bob, IP, usage("one", 1.0)),
        state.occupancy.self_contribute(&bob, IP, usage("two", 1.0)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, OccupancyError::Conflict(_)), "{err:?}");
        }
    }
    assert_eq!(state.occupancy.contributions_for(IP).await.unwrap().len(), 1);
}

#[tokio::test]
async fn occupant_cannot_contribute_to_own_machine() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    seed_machine(&state, IP).await;
    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();

    let err = state
        .occupancy
        .self_contribute(&alice, IP, usage("proj-x", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn booking_an_occupied_machine_conflicts() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    let err = state
        .occupancy
        .book(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Conflict(_)), "{err:?}");

    let machine = state.occupancy.machine_state(IP).await.unwrap();
    assert!(machine.state.is_held_by(&alice.email));

    let err = state
        .occupancy
        .book(&bob, "10.0.0.6", usage("proj-y", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn concurrent_bookings_have_a_single_winner() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;

    let (a, b) = tokio::join!(
        state.occupancy.book(&alice, IP, usage("proj-x", 1.0)),
        state.occupancy.book(&bob, IP, usage("proj-y", 1.0)),
    );

    assert_ne!(a.is_ok(), b.is_ok());
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(OccupancyError::Conflict(_))));
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let manager = seed_user(&state, "Maria", Role::Manager).await;
    seed_machine(&state, IP).await;

    let err = state
        .occupancy
        .add_machine(&manager, "999.1.1.1")
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");

    for request in [usage("proj", 0.0), usage("proj", -1.0), usage("   ", 1.0)] {
        let err = state
            .occupancy
            .book(&alice, IP, request)
            .await
            .unwrap_err();
        assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");
    }

    let err = state
        .occupancy
        .book(&alice, "10.0.0", usage("proj", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");

    assert_eq!(
        state.occupancy.machine_state(IP).await.unwrap().state,
        MachineState::Free
    );
    assert_eq!(state.occupancy.list_machines().await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_occupant_releases_the_primary_span() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;
    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();

    let err = state
        .occupancy
        .release_primary(&bob, IP)
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Forbidden(_)), "{err:?}");

    let err = state
        .occupancy
        .release_contribution(&bob, IP)
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");

    assert_eq!(state.store.usage_log_count().await.unwrap(), 0);
}

#[tokio::test]
async fn releasing_twice_writes_one_log() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;
    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();

    state.occupancy.release_primary(&alice, IP).await.unwrap();
    let err = state
        .occupancy
        .release_primary(&alice, IP)
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");
    assert_eq!(state.store.usage_log_count().await.unwrap(), 1);
}

#[tokio::test]
async fn role_rules_are_enforced() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    let assigner = seed_user(&state, "Ann", Role::Assigner).await;
    seed_machine(&state, IP).await;

    let err = state
        .occupancy
        .assign_free(&alice, IP, &bob.email, usage("proj", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Forbidden(_)), "{err:?}");

    let err = state
        .occupancy
        .add_machine(&alice, "10.0.0.7")
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Forbidden(_)), "{err:?}");

    let err = state
        .occupancy
        .remove_machine(&alice, IP)
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Forbidden(_)), "{err:?}");

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 1.0))
        .await
        .unwrap();
    let err = state
        .occupancy
        .self_contribute(&assigner, IP, usage("proj", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Forbidden(_)), "{err:?}");

    assert!(state.occupancy.contributions_for(IP).await.unwrap().is_empty());
}

#[tokio::test]
async fn assigner_books_and_attaches_on_behalf_of_users() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    let assigner = seed_user(&state, "Ann", Role::Assigner).await;
    let manager = seed_user(&state, "Maria", Role::Manager).await;
    seed_machine(&state, IP).await;

    let machine = state
        .occupancy
        .assign_free(&assigner, IP, "  ALICE@example.com ", usage("proj-x", 4.0))
        .await
        .unwrap();
    assert!(machine.state.is_held_by(&alice.email));

    let contribution = state
        .occupancy
        .assign_contributor(&assigner, IP, &bob.email, usage("proj-y", 1.5))
        .await
        .unwrap();
    assert_eq!(contribution.contributor, bob.email);
    assert_eq!(contribution.main_occupant, alice.email);

    let err = state
        .occupancy
        .assign_contributor(&assigner, IP, &manager.email, usage("proj", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");

    let err = state
        .occupancy
        .assign_contributor(&assigner, IP, "ghost@example.com", usage("proj", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn inventory_add_and_remove() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    let manager = seed_user(&state, "Maria", Role::Manager).await;

    let ip = state
        .occupancy
        .add_machine(&manager, " 10.0.0.5 ")
        .await
        .unwrap();
    assert_eq!(ip, IP);

    let err = state
        .occupancy
        .add_machine(&manager, IP)
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Conflict(_)), "{err:?}");

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();

    assert!(state.occupancy.remove_machine(&manager, IP).await.unwrap());
    assert!(matches!(
        state.occupancy.machine_state(IP).await,
        Err(OccupancyError::NotFound(_))
    ));
    assert!(state.store.all_contributions().await.unwrap().is_empty());
    assert_eq!(state.store.usage_log_count().await.unwrap(), 0);

    assert!(!state.occupancy.remove_machine(&manager, IP).await.unwrap());
}

#[tokio::test]
async fn overview_resolves_display_names() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let bob = seed_user(&state, "Bob", Role::User).await;
    seed_machine(&state, IP).await;
    seed_machine(&state, "10.0.0.6").await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state
        .occupancy
        .self_contribute(&bob, IP, usage("proj-y", 1.0))
        .await
        .unwrap();

    let machines = state.occupancy.list_machines().await.unwrap();
    assert_eq!(machines.len(), 2);

    let busy = machines.iter().find(|m| m.ip == IP).unwrap();
    assert_eq!(busy.occupant_name.as_deref(), Some("Alice"));
    assert_eq!(busy.contributors.len(), 1);
    assert_eq!(busy.contributors[0].name, "Bob");
    assert!(busy.has_contributor(&bob.email));

    let free = machines.iter().find(|m| m.ip == "10.0.0.6").unwrap();
    assert!(free.state.is_free());
    assert!(free.occupant_name.is_none());
    assert!(free.contributors.is_empty());
}

#[tokio::test]
async fn logs_are_filtered_by_start_time() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    seed_machine(&state, IP).await;

    state
        .occupancy
        .book(&alice, IP, usage("proj-x", 2.0))
        .await
        .unwrap();
    state.occupancy.release_primary(&alice, IP).await.unwrap();

    let now = Utc::now();
    let recent = state
        .occupancy
        .logs_between(now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].ip, IP);

    let yesterday = state
        .occupancy
        .logs_between(now - Duration::days(2), now - Duration::days(1))
        .await
        .unwrap();
    assert!(yesterday.is_empty());

    let err = state
        .occupancy
        .logs_between(now, now - Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, OccupancyError::Validation(_)), "{err:?}");
}
