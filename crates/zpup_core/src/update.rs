use crate::{BatchPhase, BatchState, Effect, Msg, StopPolicy};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: BatchState, msg: Msg) -> (BatchState, Vec<Effect>) {
    let mut effects = match msg {
        Msg::ExpansionStarted => {
            if state.phase() == BatchPhase::Idle {
                state.begin_expansion();
            }
            Vec::new()
        }
        Msg::FilesExpanded { tasks, rejected } => {
            match state.phase() {
                BatchPhase::Idle | BatchPhase::Expanding => {}
                // A batch is expanded exactly once.
                _ => return (state, Vec::new()),
            }
            state.load(tasks, rejected);
            dispatch(&mut state)
        }
        Msg::TaskFinished { task_id, result } => {
            if !state.complete(task_id, result) {
                return (state, Vec::new());
            }
            dispatch(&mut state)
        }
        Msg::StopRequested(policy) => match state.phase() {
            BatchPhase::Done => return (state, Vec::new()),
            BatchPhase::Idle | BatchPhase::Expanding => {
                state.record_stop(policy);
                Vec::new()
            }
            BatchPhase::Dispatching | BatchPhase::Draining | BatchPhase::Cancelling => {
                let escalated = policy == StopPolicy::Immediate
                    && state.stop_policy() != Some(StopPolicy::Immediate);
                state.record_stop(policy);
                state.drop_pending();
                if escalated && state.in_flight_count() > 0 {
                    vec![Effect::AbortInFlight]
                } else {
                    Vec::new()
                }
            }
        },
    };

    if state.settle() {
        effects.push(Effect::Teardown);
    }

    (state, effects)
}

fn dispatch(state: &mut BatchState) -> Vec<Effect> {
    state
        .take_dispatchable()
        .into_iter()
        .map(Effect::Dispatch)
        .collect()
}
