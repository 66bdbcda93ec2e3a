use std::time::Duration;

use tactics_system_sequencer::{Completion, Continuation, Sequencer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Act(u8),
    Finish(u8),
    Wrap,
}

fn execute(log: &mut Vec<Step>, step: Step, continuation: &mut Continuation<Step>) -> Completion {
    log.push(step);
    match step {
        Step::Act(unit) => {
            continuation.then(Step::Finish(unit));
            Completion::After(Duration::from_millis(u64::from(unit) * 100))
        }
        Step::Finish(_) | Step::Wrap => Completion::Ready,
    }
}

#[test]
fn chained_actions_complete_before_the_next_one_starts() {
    let mut sequencer = Sequencer::default();
    sequencer.push(Step::Act(2));
    sequencer.push(Step::Act(1));
    sequencer.push(Step::Wrap);

    let mut log = Vec::new();
    let mut ticks = 0;
    while !sequencer.is_idle() {
        sequencer.run(Duration::from_millis(50), |step, continuation| {
            execute(&mut log, step, continuation)
        });
        ticks += 1;
    }

    assert_eq!(
        log,
        vec![
            Step::Act(2),
            Step::Finish(2),
            Step::Act(1),
            Step::Finish(1),
            Step::Wrap,
        ]
    );
    // 200 ms for the first move plus 100 ms for the second.
    assert_eq!(ticks, 6);
}

#[test]
fn zero_duration_waits_do_not_stall() {
    let mut sequencer = Sequencer::default();
    sequencer.push(Step::Act(0));
    sequencer.push(Step::Wrap);

    let mut log = Vec::new();
    sequencer.run(Duration::ZERO, |step, continuation| {
        execute(&mut log, step, continuation)
    });

    assert_eq!(log, vec![Step::Act(0), Step::Finish(0), Step::Wrap]);
    assert!(sequencer.is_idle());
}
