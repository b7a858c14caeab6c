use vidjob_core::{update, Msg, SessionState};

#[test]
fn update_is_noop() {
    let state = SessionState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn tick_changes_nothing() {
    let mut state = SessionState::with_inputs("https://api.example.com", Default::default());
    state.consume_dirty();
    let (mut next, effects) = update(state.clone(), Msg::Tick);

    assert_eq!(state, next);
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}
